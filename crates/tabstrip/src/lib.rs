//! # Tabstrip
//!
//! Tabstrip is a **UI-agnostic tab collection**. It keeps the ordered list of
//! open views an application shows as tabs, decides which one is active, and
//! remembers what was closed. Rendering, routing and input handling belong to
//! the host.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Feature managers (features/)                               │
//! │  - Search, templates, bookmarks, statistics, batch, groups  │
//! │  - Read through the manager, write only via its operations  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Tab Manager (manager/)                                     │
//! │  - Sole owner of tabs, active id and closed history         │
//! │  - Validates, mutates, persists, then publishes one event   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - TabStorage: namespaced, versioned JSON records           │
//! │  - MemBackend (tests, ephemeral), FsBackend (files)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use tabstrip::config::TabManagerConfig;
//! use tabstrip::manager::{TabEventKind, TabManager};
//! use tabstrip::model::TabConfig;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let manager = TabManager::new(TabManagerConfig::default());
//! let added = Rc::new(Cell::new(0));
//! let counter = added.clone();
//! manager.on(TabEventKind::Add, move |_| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! });
//!
//! let users = manager.add_tab(&TabConfig::new("Users", "/admin/users")).unwrap();
//! manager.add_tab(&TabConfig::new("Settings", "/admin/settings")).unwrap();
//!
//! // The active tab cannot be closed; Users is not active any more.
//! assert!(manager.remove_tab(&users.id));
//! assert_eq!(manager.reopen_last_closed_tab().unwrap().id, users.id);
//! assert_eq!(added.get(), 3);
//! ```
//!
//! ## Single-Threaded by Design
//!
//! Everything runs on one thread. Shared state sits in `RefCell`s, handles are
//! `Rc`, and every operation takes `&self`, so event listeners can call back
//! into the manager that is notifying them.
//!
//! ## Error Model
//!
//! Core tab operations report refusal as `false`/`None` and never panic.
//! Feature managers whose failures carry information return
//! [`error::Result`]. Persistence failures are logged with `tracing` and
//! otherwise ignored; in-memory state stays authoritative.
//!
//! ## Module Overview
//!
//! - [`manager`]: The tab manager and its event taxonomy
//! - [`features`]: Search and the optional feature managers
//! - [`events`]: Generic typed event bus
//! - [`store`]: Persistence adapter and backends
//! - [`model`]: Core data types (`Tab`, `TabConfig`, `TabUpdate`, `HistoryEntry`)
//! - [`validation`]: Tab config validation and sanitizing
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod helpers;
pub mod manager;
pub mod model;
pub mod store;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod validation;

pub use config::TabManagerConfig;
pub use error::{Result, TabError};
pub use manager::{TabEvent, TabEventData, TabEventKind, TabManager};
pub use model::{Tab, TabConfig, TabId, TabStatus, TabUpdate};
