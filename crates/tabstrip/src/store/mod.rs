//! # Storage Layer
//!
//! [`TabStorage`] is the persistence adapter: typed save/load pairs for each
//! persisted domain, written as JSON through a raw [`StorageBackend`].
//!
//! ## Domains
//!
//! | Domain | Key | Shape |
//! |--------|-----|-------|
//! | Tab state | `{ns}-tabs` | `{tabs, activeTabId, timestamp, version}` |
//! | History | `{ns}-history` | `{closedTabs, timestamp, version}` |
//! | Groups | `{ns}-groups` | `{groups, timestamp, version}` |
//! | Templates | `{ns}-templates` | `{templates, timestamp, version}` |
//! | Statistics | `{ns}-statistics` | `{statistics, timestamp, version}` |
//! | Bookmarks | `{ns}-bookmarks` | `{bookmarks, timestamp, version}` |
//!
//! Every save stamps the record with [`STORAGE_VERSION`] and the current time.
//!
//! ## Failure Model
//!
//! - **Saves** return `Result`. Callers in this crate log and drop the error:
//!   persistence is a best-effort side effect, in-memory state stays correct.
//! - **Loads** never fail. Absent, unreadable or malformed data yields the
//!   empty value for that domain and a log line.
//! - **Version mismatch** is logged and the data is returned as-is. There is
//!   no migration step.
//!
//! ## Implementations
//!
//! - [`mem_backend::MemBackend`]: in-memory, for tests and ephemeral hosts.
//! - [`fs_backend::FsBackend`]: one JSON file per key in a directory.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{Result, TabError};
use crate::features::bookmarks::Bookmark;
use crate::features::groups::TabGroup;
use crate::features::statistics::PathStats;
use crate::features::templates::TabTemplate;
use crate::helpers;
use crate::model::{HistoryEntry, Tab, TabId};

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::StorageBackend;

pub const STORAGE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Tabs,
    History,
    Groups,
    Templates,
    Statistics,
    Bookmarks,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Tabs,
        Domain::History,
        Domain::Groups,
        Domain::Templates,
        Domain::Statistics,
        Domain::Bookmarks,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            Domain::Tabs => "tabs",
            Domain::History => "history",
            Domain::Groups => "groups",
            Domain::Templates => "templates",
            Domain::Statistics => "statistics",
            Domain::Bookmarks => "bookmarks",
        }
    }
}

/// Persisted tab state as loaded back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsRecord {
    pub tabs: Vec<Tab>,
    pub active_tab_id: Option<TabId>,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabsPayload<'a> {
    tabs: &'a [Tab],
    active_tab_id: Option<&'a TabId>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPayload {
    closed_tabs: Vec<HistoryEntry>,
}

#[derive(Serialize, Deserialize)]
struct GroupsPayload {
    groups: Vec<TabGroup>,
}

#[derive(Serialize, Deserialize)]
struct TemplatesPayload {
    templates: Vec<TabTemplate>,
}

#[derive(Serialize, Deserialize)]
struct StatisticsPayload {
    statistics: BTreeMap<String, PathStats>,
}

#[derive(Serialize, Deserialize)]
struct BookmarksPayload {
    bookmarks: Vec<Bookmark>,
}

/// Namespaced, typed persistence over a shared backend.
///
/// Cloning is cheap and clones write to the same backend and namespace, which
/// is how feature managers share the tab manager's storage.
#[derive(Clone)]
pub struct TabStorage {
    backend: Rc<dyn StorageBackend>,
    namespace: String,
}

impl TabStorage {
    pub fn new(backend: Rc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Rc::new(mem_backend::MemBackend::new()), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self, domain: Domain) -> String {
        format!("{}-{}", self.namespace, domain.suffix())
    }

    // --- Tab state ---

    pub fn save_tabs(&self, tabs: &[Tab], active_tab_id: Option<&TabId>) -> Result<()> {
        self.save_record(
            Domain::Tabs,
            &TabsPayload {
                tabs,
                active_tab_id,
            },
        )
    }

    pub fn load_tabs(&self) -> Option<TabsRecord> {
        self.load_record(Domain::Tabs)
    }

    // --- Closed history ---

    pub fn save_history(&self, closed_tabs: &[HistoryEntry]) -> Result<()> {
        self.save_record(
            Domain::History,
            &HistoryPayload {
                closed_tabs: closed_tabs.to_vec(),
            },
        )
    }

    pub fn load_history(&self) -> Vec<HistoryEntry> {
        self.load_record::<HistoryPayload>(Domain::History)
            .map(|p| p.closed_tabs)
            .unwrap_or_default()
    }

    // --- Feature domains ---

    pub fn save_groups(&self, groups: &[TabGroup]) -> Result<()> {
        self.save_record(
            Domain::Groups,
            &GroupsPayload {
                groups: groups.to_vec(),
            },
        )
    }

    pub fn load_groups(&self) -> Vec<TabGroup> {
        self.load_record::<GroupsPayload>(Domain::Groups)
            .map(|p| p.groups)
            .unwrap_or_default()
    }

    pub fn save_templates(&self, templates: &[TabTemplate]) -> Result<()> {
        self.save_record(
            Domain::Templates,
            &TemplatesPayload {
                templates: templates.to_vec(),
            },
        )
    }

    pub fn load_templates(&self) -> Vec<TabTemplate> {
        self.load_record::<TemplatesPayload>(Domain::Templates)
            .map(|p| p.templates)
            .unwrap_or_default()
    }

    pub fn save_statistics(&self, statistics: &BTreeMap<String, PathStats>) -> Result<()> {
        self.save_record(
            Domain::Statistics,
            &StatisticsPayload {
                statistics: statistics.clone(),
            },
        )
    }

    pub fn load_statistics(&self) -> BTreeMap<String, PathStats> {
        self.load_record::<StatisticsPayload>(Domain::Statistics)
            .map(|p| p.statistics)
            .unwrap_or_default()
    }

    pub fn save_bookmarks(&self, bookmarks: &[Bookmark]) -> Result<()> {
        self.save_record(
            Domain::Bookmarks,
            &BookmarksPayload {
                bookmarks: bookmarks.to_vec(),
            },
        )
    }

    pub fn load_bookmarks(&self) -> Vec<Bookmark> {
        self.load_record::<BookmarksPayload>(Domain::Bookmarks)
            .map(|p| p.bookmarks)
            .unwrap_or_default()
    }

    /// Removes every domain under this namespace.
    pub fn clear(&self) -> Result<()> {
        for domain in Domain::ALL {
            self.backend.remove(&self.key(domain))?;
        }
        Ok(())
    }

    // --- Codec ---

    /// Serializes `record`, stamps it with version and timestamp, and writes
    /// it under the domain key.
    pub fn save_record<T: Serialize>(&self, domain: Domain, record: &T) -> Result<()> {
        let mut value = serde_json::to_value(record)?;
        let Value::Object(map) = &mut value else {
            return Err(TabError::Store(format!(
                "{} record must serialize to a JSON object",
                domain.suffix()
            )));
        };
        map.insert(
            "timestamp".to_string(),
            Value::from(helpers::now().timestamp_millis()),
        );
        map.insert("version".to_string(), Value::from(STORAGE_VERSION));

        let raw = serde_json::to_string(&value)?;
        self.backend.write(&self.key(domain), &raw)
    }

    /// Reads and decodes the domain record. Never fails: anything unusable
    /// comes back as `None`.
    pub fn load_record<T: DeserializeOwned>(&self, domain: Domain) -> Option<T> {
        let key = self.key(domain);
        let raw = match self.backend.read(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("failed to read {}: {}", key, err);
                return None;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("discarding malformed {}: {}", key, err);
                return None;
            }
        };

        let version = value.get("version").and_then(Value::as_str);
        if version != Some(STORAGE_VERSION) {
            tracing::warn!(
                "{} was stored with version {:?}, expected {}; loading without migration",
                key,
                version,
                STORAGE_VERSION
            );
        }

        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("discarding unreadable {}: {}", key, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mem_backend::MemBackend;
    use super::*;
    use crate::model::TabConfig;

    fn storage() -> (Rc<MemBackend>, TabStorage) {
        let backend = Rc::new(MemBackend::new());
        let storage = TabStorage::new(backend.clone(), "test");
        (backend, storage)
    }

    fn tab(title: &str, path: &str) -> Tab {
        Tab::from_config(TabConfig::new(title, path))
    }

    #[test]
    fn test_tabs_round_trip() {
        let (_, storage) = storage();
        let tabs = vec![tab("A", "/a"), tab("B", "/b")];
        storage.save_tabs(&tabs, Some(&tabs[1].id)).unwrap();

        let record = storage.load_tabs().unwrap();
        assert_eq!(record.tabs, tabs);
        assert_eq!(record.active_tab_id, Some(tabs[1].id.clone()));
        assert_eq!(record.version.as_deref(), Some(STORAGE_VERSION));
    }

    #[test]
    fn test_load_absent_is_empty() {
        let (_, storage) = storage();
        assert!(storage.load_tabs().is_none());
        assert!(storage.load_history().is_empty());
        assert!(storage.load_templates().is_empty());
        assert!(storage.load_statistics().is_empty());
    }

    #[test]
    fn test_load_malformed_is_empty() {
        let (backend, storage) = storage();
        backend.insert_raw("test-tabs", "{not json");
        backend.insert_raw("test-history", r#"{"closedTabs": 42}"#);
        assert!(storage.load_tabs().is_none());
        assert!(storage.load_history().is_empty());
    }

    #[test]
    fn test_version_mismatch_still_loads() {
        let (backend, storage) = storage();
        backend.insert_raw(
            "test-tabs",
            r#"{"tabs": [], "activeTabId": null, "timestamp": 0, "version": "0.1.0"}"#,
        );
        let record = storage.load_tabs().unwrap();
        assert!(record.tabs.is_empty());
        assert_eq!(record.version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn test_history_round_trip() {
        let (backend, storage) = storage();
        let entries = vec![HistoryEntry::new(tab("A", "/a"), Some(2))];
        storage.save_history(&entries).unwrap();
        assert_eq!(storage.load_history(), entries);

        let raw: Value = serde_json::from_str(&backend.read("test-history").unwrap().unwrap())
            .unwrap();
        assert!(raw["closedTabs"].is_array());
        assert!(raw["timestamp"].is_i64());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let backend = Rc::new(MemBackend::new());
        let a = TabStorage::new(backend.clone(), "a");
        let b = TabStorage::new(backend.clone(), "b");
        a.save_tabs(&[tab("A", "/a")], None).unwrap();
        assert!(b.load_tabs().is_none());
        assert_eq!(a.load_tabs().unwrap().tabs.len(), 1);
    }

    #[test]
    fn test_clear_removes_all_domains() {
        let (backend, storage) = storage();
        storage.save_tabs(&[], None).unwrap();
        storage.save_history(&[]).unwrap();
        storage.save_groups(&[]).unwrap();
        storage.save_templates(&[]).unwrap();
        storage.save_statistics(&BTreeMap::new()).unwrap();
        storage.save_bookmarks(&[]).unwrap();
        assert_eq!(backend.len(), 6);

        storage.clear().unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_write_error_surfaces() {
        let (backend, storage) = storage();
        backend.set_simulate_write_error(true);
        assert!(matches!(
            storage.save_tabs(&[], None),
            Err(TabError::Store(_))
        ));
    }
}
