//! # Bookmarks
//!
//! Named, categorized shortcuts to paths. A bookmark exists whether or not a
//! tab for its path is open. Bookmarks are keyed by path: adding a path that
//! is already bookmarked counts as an access of the existing bookmark.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::error::{Result, TabError};
use crate::events::{Event, EventBus};
use crate::helpers;
use crate::manager::TabManager;
use crate::model::{Tab, TabConfig, TabId, TabMeta};
use crate::store::TabStorage;
use crate::validation;

pub const DEFAULT_CATEGORY: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub path: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TabMeta>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u32,
}

impl Bookmark {
    fn touch(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = helpers::now();
    }

    fn to_tab_config(&self) -> TabConfig {
        TabConfig {
            id: None,
            title: self.title.clone(),
            path: self.path.clone(),
            icon: self.icon.clone(),
            pinned: false,
            closable: None,
            meta: self.meta.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkUpdate {
    pub title: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookmarkEventKind {
    Added,
    Updated,
    Removed,
    Opened,
    Imported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkEvent {
    Added { bookmark: Bookmark },
    Updated { bookmark: Bookmark },
    Removed { bookmark: Bookmark },
    Opened { bookmark: Bookmark, tab_id: TabId },
    Imported { count: usize },
}

impl Event for BookmarkEvent {
    type Kind = BookmarkEventKind;

    fn kind(&self) -> BookmarkEventKind {
        match self {
            BookmarkEvent::Added { .. } => BookmarkEventKind::Added,
            BookmarkEvent::Updated { .. } => BookmarkEventKind::Updated,
            BookmarkEvent::Removed { .. } => BookmarkEventKind::Removed,
            BookmarkEvent::Opened { .. } => BookmarkEventKind::Opened,
            BookmarkEvent::Imported { .. } => BookmarkEventKind::Imported,
        }
    }
}

fn clean_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

fn not_found(id: &str) -> TabError {
    TabError::NotFound {
        kind: "bookmark",
        id: id.to_string(),
    }
}

pub struct BookmarkManager {
    storage: TabStorage,
    persist: bool,
    bookmarks: RefCell<Vec<Bookmark>>,
    bus: EventBus<BookmarkEvent>,
}

impl BookmarkManager {
    pub fn new(storage: TabStorage, persist: bool) -> Self {
        let bookmarks = if persist {
            storage.load_bookmarks()
        } else {
            Vec::new()
        };
        Self {
            storage,
            persist,
            bookmarks: RefCell::new(bookmarks),
            bus: EventBus::new(),
        }
    }

    pub fn for_manager(manager: &TabManager) -> Self {
        Self::new(manager.storage().clone(), manager.config().persist)
    }

    pub fn events(&self) -> &EventBus<BookmarkEvent> {
        &self.bus
    }

    fn persist(&self) {
        if !self.persist {
            return;
        }
        if let Err(err) = self.storage.save_bookmarks(&self.bookmarks.borrow()) {
            tracing::warn!("failed to persist bookmarks: {}", err);
        }
    }

    /// Bookmarks `path`, or records an access if it is already bookmarked.
    pub fn add_bookmark(&self, title: &str, path: &str, category: Option<&str>) -> Result<Bookmark> {
        self.add(TabConfig::new(title, path), category)
    }

    /// Bookmarks an open tab, copying its title, path, icon and meta.
    pub fn bookmark_tab(
        &self,
        manager: &TabManager,
        tab_id: &TabId,
        category: Option<&str>,
    ) -> Result<Bookmark> {
        let tab: Tab = manager
            .get_tab(tab_id)
            .ok_or_else(|| TabError::TabNotFound(tab_id.clone()))?;
        let mut config = tab.to_config();
        config.closable = None;
        config.pinned = false;
        self.add(config, category)
    }

    fn add(&self, config: TabConfig, category: Option<&str>) -> Result<Bookmark> {
        let result = validation::validate(&config);
        if !result.valid {
            return Err(TabError::Validation(result.errors));
        }
        let config = validation::sanitize(&config);

        let existing = {
            let mut bookmarks = self.bookmarks.borrow_mut();
            bookmarks
                .iter_mut()
                .find(|b| b.path == config.path)
                .map(|bookmark| {
                    bookmark.touch();
                    bookmark.clone()
                })
        };
        if let Some(bookmark) = existing {
            self.persist();
            self.bus.publish(&BookmarkEvent::Updated {
                bookmark: bookmark.clone(),
            });
            return Ok(bookmark);
        }

        let now = helpers::now();
        let bookmark = Bookmark {
            id: helpers::generate_id(),
            title: config.title,
            path: config.path,
            category: clean_category(category),
            icon: config.icon,
            meta: config.meta,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        };
        self.bookmarks.borrow_mut().push(bookmark.clone());
        self.persist();
        self.bus.publish(&BookmarkEvent::Added {
            bookmark: bookmark.clone(),
        });
        Ok(bookmark)
    }

    pub fn update_bookmark(&self, id: &str, update: &BookmarkUpdate) -> Result<Bookmark> {
        let bookmark = {
            let mut bookmarks = self.bookmarks.borrow_mut();
            let bookmark = bookmarks
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| not_found(id))?;
            if let Some(title) = &update.title {
                let title = title.trim();
                if title.is_empty() {
                    return Err(TabError::Validation(vec![
                        validation::ValidationError::MissingTitle,
                    ]));
                }
                bookmark.title = title.to_string();
            }
            if let Some(category) = &update.category {
                bookmark.category = clean_category(Some(category));
            }
            if let Some(icon) = &update.icon {
                bookmark.icon = Some(icon.trim().to_string()).filter(|i| !i.is_empty());
            }
            bookmark.clone()
        };

        self.persist();
        self.bus.publish(&BookmarkEvent::Updated {
            bookmark: bookmark.clone(),
        });
        Ok(bookmark)
    }

    pub fn remove_bookmark(&self, id: &str) -> bool {
        let removed = {
            let mut bookmarks = self.bookmarks.borrow_mut();
            match bookmarks.iter().position(|b| b.id == id) {
                Some(index) => bookmarks.remove(index),
                None => return false,
            }
        };
        self.persist();
        self.bus.publish(&BookmarkEvent::Removed { bookmark: removed });
        true
    }

    /// Opens the bookmark: activates the tab already showing its path, or
    /// adds one. `None` when the manager refuses the tab.
    pub fn open_bookmark(&self, manager: &TabManager, id: &str) -> Result<Option<Tab>> {
        let config = self
            .get_bookmark(id)
            .map(|b| b.to_tab_config())
            .ok_or_else(|| not_found(id))?;

        let Some(tab) = manager.add_tab(&config) else {
            return Ok(None);
        };

        let bookmark = {
            let mut bookmarks = self.bookmarks.borrow_mut();
            bookmarks.iter_mut().find(|b| b.id == id).map(|bookmark| {
                bookmark.touch();
                bookmark.clone()
            })
        };
        if let Some(bookmark) = bookmark {
            self.persist();
            self.bus.publish(&BookmarkEvent::Opened {
                bookmark,
                tab_id: tab.id.clone(),
            });
        }
        Ok(Some(tab))
    }

    pub fn get_bookmark(&self, id: &str) -> Option<Bookmark> {
        self.bookmarks.borrow().iter().find(|b| b.id == id).cloned()
    }

    pub fn find_by_path(&self, path: &str) -> Option<Bookmark> {
        let path = path.trim();
        self.bookmarks
            .borrow()
            .iter()
            .find(|b| b.path == path)
            .cloned()
    }

    pub fn is_bookmarked(&self, path: &str) -> bool {
        self.find_by_path(path).is_some()
    }

    pub fn get_all_bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.borrow().clone()
    }

    pub fn get_by_category(&self, category: &str) -> Vec<Bookmark> {
        self.bookmarks
            .borrow()
            .iter()
            .filter(|b| b.category == category)
            .cloned()
            .collect()
    }

    /// Distinct categories in use, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.bookmarks
            .borrow()
            .iter()
            .map(|b| b.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Case-insensitive match on title, path or category.
    pub fn search(&self, keyword: &str) -> Vec<Bookmark> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Vec::new();
        }
        self.bookmarks
            .borrow()
            .iter()
            .filter(|b| {
                [&b.title, &b.path, &b.category]
                    .iter()
                    .any(|field| helpers::find_case_insensitive(field, keyword).is_some())
            })
            .cloned()
            .collect()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.bookmarks.borrow())?)
    }

    /// Imports bookmarks from JSON. Paths already bookmarked are skipped;
    /// every imported bookmark gets a fresh id. Returns the number imported.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let incoming: Vec<Bookmark> = serde_json::from_str(json)?;

        let count = {
            let mut bookmarks = self.bookmarks.borrow_mut();
            let mut count = 0;
            for mut bookmark in incoming {
                let path = bookmark.path.trim().to_string();
                if path.is_empty() || bookmark.title.trim().is_empty() {
                    tracing::debug!("skipping incomplete bookmark {:?}", bookmark.id);
                    continue;
                }
                if bookmarks.iter().any(|b| b.path == path) {
                    continue;
                }
                bookmark.id = helpers::generate_id();
                bookmark.path = path;
                bookmark.category = clean_category(Some(&bookmark.category));
                bookmarks.push(bookmark);
                count += 1;
            }
            count
        };

        if count > 0 {
            self.persist();
        }
        self.bus.publish(&BookmarkEvent::Imported { count });
        Ok(count)
    }
}
