//! # Feature Managers
//!
//! Optional layers over a [`TabManager`](crate::manager::TabManager). None of
//! them touch the manager's state directly: they read through its getters and
//! change tabs only by calling its operations.
//!
//! | Module | Manager | Persisted | Events |
//! |--------|---------|-----------|--------|
//! | [`search`] | [`SearchEngine`](search::SearchEngine) | no | none |
//! | [`templates`] | [`TemplateManager`](templates::TemplateManager) | templates | [`TemplateEvent`](templates::TemplateEvent) |
//! | [`bookmarks`] | [`BookmarkManager`](bookmarks::BookmarkManager) | bookmarks | [`BookmarkEvent`](bookmarks::BookmarkEvent) |
//! | [`statistics`] | [`StatisticsManager`](statistics::StatisticsManager) | statistics | consumes `tab:activate`, `tab:remove` |
//! | [`batch`] | [`BatchManager`](batch::BatchManager) | no | [`BatchEvent`](batch::BatchEvent) |
//! | [`groups`] | [`GroupManager`](groups::GroupManager) | groups | none |
//!
//! Each persisted manager has a `for_manager` constructor that shares the tab
//! manager's storage namespace and honors its `persist` setting.

pub mod batch;
pub mod bookmarks;
pub mod groups;
pub mod search;
pub mod statistics;
pub mod templates;
