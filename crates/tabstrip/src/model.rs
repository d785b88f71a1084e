//! # Domain Model
//!
//! This module defines the plain data records the rest of the crate passes
//! around: [`Tab`], its creation input [`TabConfig`], partial edits
//! [`TabUpdate`], and closed-tab [`HistoryEntry`] snapshots.
//!
//! ## Value Semantics
//!
//! Every type here is `Clone` and owns all of its data. The
//! [`TabManager`](crate::manager::TabManager) hands out clones on every read,
//! so mutating a returned `Tab` can never reach back into manager state.
//! Cross references (active tab, history, groups) are plain [`TabId`] lookups.
//!
//! ## Wire Format
//!
//! Records serialize with camelCase keys and millisecond timestamps, matching
//! the layout hosts already keep in local storage:
//!
//! ```text
//! {"id":"…","title":"Users","path":"/admin/users","pinned":false,
//!  "closable":true,"status":"normal","createdAt":1700000000000,
//!  "lastAccessedAt":1700000000000,"visitCount":1}
//! ```

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::helpers;

/// Free-form metadata attached to a tab.
pub type TabMeta = serde_json::Map<String, serde_json::Value>;

/// Opaque tab identifier. Generated ids are UUID v4 strings, but callers may
/// supply their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new() -> Self {
        Self(helpers::generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank ids never refer to a tab.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TabId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Active,
    Loading,
    Error,
    #[default]
    Normal,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::Active => "active",
            TabStatus::Loading => "loading",
            TabStatus::Error => "error",
            TabStatus::Normal => "normal",
        }
    }
}

/// One open view in the managed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TabMeta>,
    pub pinned: bool,
    pub closable: bool,
    #[serde(default)]
    pub status: TabStatus,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub visit_count: u32,
}

impl Tab {
    /// Builds a fresh tab from an already sanitized config.
    pub(crate) fn from_config(config: TabConfig) -> Self {
        let now = helpers::now();
        Self {
            id: config.id.filter(TabId::is_valid).unwrap_or_default(),
            title: config.title,
            path: config.path,
            icon: config.icon,
            meta: config.meta,
            pinned: config.pinned,
            closable: config.closable.unwrap_or(true),
            status: TabStatus::Normal,
            created_at: now,
            last_accessed_at: now,
            visit_count: 1,
        }
    }

    /// The creation-relevant fields of this tab, without its id.
    pub fn to_config(&self) -> TabConfig {
        TabConfig {
            id: None,
            title: self.title.clone(),
            path: self.path.clone(),
            icon: self.icon.clone(),
            pinned: self.pinned,
            closable: Some(self.closable),
            meta: self.meta.clone(),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_accessed_at = helpers::now();
    }
}

/// Input for creating a tab.
///
/// `closable` stays optional so sanitizing can tell "not given" (closable)
/// apart from an explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    pub title: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TabMeta>,
}

impl TabConfig {
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<TabId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_meta(mut self, meta: TabMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn not_closable(mut self) -> Self {
        self.closable = Some(false);
        self
    }
}

/// A partial edit merged onto an existing tab.
///
/// There is deliberately no `id` or `closable` here: both are fixed at
/// creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TabStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TabMeta>,
}

impl TabUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn status(mut self, status: TabStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn meta(mut self, meta: TabMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the set fields onto `tab`. Returns true when `pinned` flipped.
    pub(crate) fn apply_to(&self, tab: &mut Tab) -> bool {
        if let Some(title) = &self.title {
            tab.title = title.clone();
        }
        if let Some(path) = &self.path {
            tab.path = path.clone();
        }
        if let Some(icon) = &self.icon {
            tab.icon = Some(icon.clone());
        }
        if let Some(status) = self.status {
            tab.status = status;
        }
        if let Some(meta) = &self.meta {
            tab.meta = Some(meta.clone());
        }
        let pin_changed = matches!(self.pinned, Some(p) if p != tab.pinned);
        if let Some(pinned) = self.pinned {
            tab.pinned = pinned;
        }
        tab.touch();
        pin_changed
    }
}

/// Snapshot of a closed tab.
///
/// `index` is the position the tab held when it was closed; bulk closes leave
/// it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub tab: Tab,
    #[serde(with = "ts_milliseconds")]
    pub closed_at: DateTime<Utc>,
    #[serde(default)]
    pub index: Option<usize>,
}

impl HistoryEntry {
    pub fn new(tab: Tab, index: Option<usize>) -> Self {
        Self {
            tab,
            closed_at: helpers::now(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_defaults() {
        let tab = Tab::from_config(TabConfig::new("Users", "/admin/users"));
        assert!(tab.id.is_valid());
        assert!(tab.closable);
        assert!(!tab.pinned);
        assert_eq!(tab.status, TabStatus::Normal);
        assert_eq!(tab.visit_count, 1);
        assert_eq!(tab.created_at, tab.last_accessed_at);
    }

    #[test]
    fn test_from_config_keeps_supplied_id() {
        let tab = Tab::from_config(TabConfig::new("A", "/a").with_id("home"));
        assert_eq!(tab.id.as_str(), "home");
    }

    #[test]
    fn test_from_config_replaces_blank_id() {
        let tab = Tab::from_config(TabConfig::new("A", "/a").with_id("  "));
        assert_ne!(tab.id.as_str().trim(), "");
    }

    #[test]
    fn test_serializes_camel_case_with_millis() {
        let tab = Tab::from_config(TabConfig::new("A", "/a").not_closable());
        let json = serde_json::to_value(&tab).unwrap();
        assert_eq!(json["closable"], false);
        assert_eq!(json["status"], "normal");
        assert_eq!(json["visitCount"], 1);
        assert_eq!(
            json["createdAt"].as_i64().unwrap(),
            tab.created_at.timestamp_millis()
        );
        assert!(json.get("icon").is_none());
    }

    #[test]
    fn test_tab_round_trips_through_json() {
        let mut meta = TabMeta::new();
        meta.insert("role".into(), serde_json::json!("admin"));
        let tab = Tab::from_config(
            TabConfig::new("Users", "/admin/users")
                .with_icon("user")
                .with_meta(meta)
                .pinned(),
        );
        let json = serde_json::to_string(&tab).unwrap();
        let back: Tab = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tab);
    }

    #[test]
    fn test_update_reports_pin_change_only_on_flip() {
        let mut tab = Tab::from_config(TabConfig::new("A", "/a"));
        assert!(!TabUpdate::new().pinned(false).apply_to(&mut tab));
        assert!(TabUpdate::new().pinned(true).apply_to(&mut tab));
        assert!(tab.pinned);
    }

    #[test]
    fn test_update_merges_fields() {
        let mut tab = Tab::from_config(TabConfig::new("A", "/a"));
        TabUpdate::new()
            .title("B")
            .status(TabStatus::Loading)
            .apply_to(&mut tab);
        assert_eq!(tab.title, "B");
        assert_eq!(tab.path, "/a");
        assert_eq!(tab.status, TabStatus::Loading);
    }

    #[test]
    fn test_to_config_drops_id() {
        let tab = Tab::from_config(TabConfig::new("A", "/a").with_id("x"));
        let config = tab.to_config();
        assert!(config.id.is_none());
        assert_eq!(config.closable, Some(true));
    }
}
