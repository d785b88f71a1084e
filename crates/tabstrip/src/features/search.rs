//! # Search
//!
//! Keyword search over the tabs a [`TabManager`] holds. The engine only reads
//! from the manager; its own state is the recent-search history.
//!
//! ## Scoring
//!
//! Each searched field scores on its own:
//!
//! | Match | Score |
//! |-------|-------|
//! | Whole field equals keyword | 100 |
//! | Field starts with keyword | 80 |
//! | Field contains keyword | 60 |
//!
//! Field scores are weighted (title ×2, path ×1, meta ×0.5), summed, and capped
//! at 100. Meta is matched against its JSON serialization. A tab with a zero
//! total is not a result.
//!
//! ## History
//!
//! Every search with a non-blank keyword records `(keyword, timestamp,
//! result count)` in a 20-entry most-recent-first list. Repeating a keyword
//! moves it to the front instead of adding a second entry.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use crate::helpers;
use crate::manager::TabManager;
use crate::model::{Tab, TabStatus};

pub const SEARCH_HISTORY_CAPACITY: usize = 20;
pub const HIGHLIGHT_OPEN: &str = "<mark>";
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

const EXACT_SCORE: f64 = 100.0;
const PREFIX_SCORE: f64 = 80.0;
const SUBSTRING_SCORE: f64 = 60.0;
const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Path,
    Meta,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Path => "path",
            SearchField::Meta => "meta",
        }
    }

    fn weight(&self) -> f64 {
        match self {
            SearchField::Title => 2.0,
            SearchField::Path => 1.0,
            SearchField::Meta => 0.5,
        }
    }

    fn text(&self, tab: &Tab) -> Option<String> {
        match self {
            SearchField::Title => Some(tab.title.clone()),
            SearchField::Path => Some(tab.path.clone()),
            SearchField::Meta => tab
                .meta
                .as_ref()
                .and_then(|meta| serde_json::to_string(meta).ok()),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Relevance,
    Title,
    LastAccessed,
    VisitCount,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub fields: Vec<SearchField>,
    pub case_sensitive: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fields: vec![SearchField::Title, SearchField::Path],
            case_sensitive: false,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: None,
        }
    }
}

/// Filters applied before keyword scoring in
/// [`SearchEngine::advanced_search`]. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedSearchOptions {
    pub keyword: Option<String>,
    pub search: SearchOptions,
    pub status: Option<TabStatus>,
    pub pinned: Option<bool>,
    pub min_visit_count: Option<u32>,
    pub accessed_after: Option<DateTime<Utc>>,
    pub accessed_before: Option<DateTime<Utc>>,
}

impl AdvancedSearchOptions {
    fn admits(&self, tab: &Tab) -> bool {
        self.status.map_or(true, |s| tab.status == s)
            && self.pinned.map_or(true, |p| tab.pinned == p)
            && self.min_visit_count.map_or(true, |n| tab.visit_count >= n)
            && self.accessed_after.map_or(true, |t| tab.last_accessed_at >= t)
            && self.accessed_before.map_or(true, |t| tab.last_accessed_at <= t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub tab: Tab,
    pub score: f64,
    pub matched_fields: Vec<SearchField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub keyword: String,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub result_count: usize,
}

#[derive(Debug, Default)]
pub struct SearchEngine {
    history: RefCell<VecDeque<SearchHistoryEntry>>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores every tab against `keyword`. A blank keyword returns nothing
    /// and is not recorded.
    pub fn search(
        &self,
        manager: &TabManager,
        keyword: &str,
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Vec::new();
        }

        let results = score_tabs(manager.get_all_tabs(), keyword, options);
        let results = finish(results, options);
        self.record(keyword, results.len());
        results
    }

    /// Filters first, then scores. Without a keyword every admitted tab is a
    /// result with the maximum score.
    pub fn advanced_search(
        &self,
        manager: &TabManager,
        options: &AdvancedSearchOptions,
    ) -> Vec<SearchResult> {
        let tabs: Vec<Tab> = manager
            .get_all_tabs()
            .into_iter()
            .filter(|tab| options.admits(tab))
            .collect();

        let keyword = options.keyword.as_deref().map(str::trim).unwrap_or("");
        if keyword.is_empty() {
            let results = tabs
                .into_iter()
                .map(|tab| SearchResult {
                    tab,
                    score: MAX_SCORE,
                    matched_fields: Vec::new(),
                })
                .collect();
            return finish(results, &options.search);
        }

        let results = finish(score_tabs(tabs, keyword, &options.search), &options.search);
        self.record(keyword, results.len());
        results
    }

    /// Recent searches, most recent first.
    pub fn search_history(&self) -> Vec<SearchHistoryEntry> {
        self.history.borrow().iter().cloned().collect()
    }

    pub fn clear_search_history(&self) {
        self.history.borrow_mut().clear();
    }

    /// Completions for `prefix`: matching history keywords first, then
    /// matching tab titles, without duplicates.
    pub fn suggestions(&self, manager: &TabManager, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        let mut out: Vec<String> = Vec::new();

        let history = self
            .history
            .borrow()
            .iter()
            .map(|entry| entry.keyword.clone())
            .collect::<Vec<_>>();
        let titles = manager.get_all_tabs().into_iter().map(|tab| tab.title);

        for candidate in history.into_iter().chain(titles) {
            if out.len() >= limit {
                break;
            }
            if candidate.to_lowercase().starts_with(&prefix) && !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    fn record(&self, keyword: &str, result_count: usize) {
        let mut history = self.history.borrow_mut();
        history.retain(|entry| entry.keyword != keyword);
        history.push_front(SearchHistoryEntry {
            keyword: keyword.to_string(),
            timestamp: helpers::now(),
            result_count,
        });
        history.truncate(SEARCH_HISTORY_CAPACITY);
    }
}

fn field_score(text: &str, keyword: &str) -> f64 {
    if text == keyword {
        EXACT_SCORE
    } else if text.starts_with(keyword) {
        PREFIX_SCORE
    } else if text.contains(keyword) {
        SUBSTRING_SCORE
    } else {
        0.0
    }
}

fn score_tab(tab: &Tab, keyword: &str, options: &SearchOptions) -> Option<SearchResult> {
    let keyword = if options.case_sensitive {
        keyword.to_string()
    } else {
        keyword.to_lowercase()
    };

    let mut total = 0.0;
    let mut matched_fields = Vec::new();
    for field in &options.fields {
        let Some(text) = field.text(tab) else {
            continue;
        };
        let text = if options.case_sensitive {
            text
        } else {
            text.to_lowercase()
        };
        let score = field_score(&text, &keyword);
        if score > 0.0 {
            total += score * field.weight();
            matched_fields.push(*field);
        }
    }

    if matched_fields.is_empty() {
        return None;
    }
    Some(SearchResult {
        tab: tab.clone(),
        score: total.min(MAX_SCORE),
        matched_fields,
    })
}

fn score_tabs(tabs: Vec<Tab>, keyword: &str, options: &SearchOptions) -> Vec<SearchResult> {
    tabs.iter()
        .filter_map(|tab| score_tab(tab, keyword, options))
        .collect()
}

fn compare(a: &SearchResult, b: &SearchResult, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Relevance => a.score.total_cmp(&b.score),
        SortBy::Title => a.tab.title.cmp(&b.tab.title),
        SortBy::LastAccessed => a.tab.last_accessed_at.cmp(&b.tab.last_accessed_at),
        SortBy::VisitCount => a.tab.visit_count.cmp(&b.tab.visit_count),
        SortBy::CreatedAt => a.tab.created_at.cmp(&b.tab.created_at),
    }
}

/// Sorts (stable, so ties keep tab order) and applies the limit.
fn finish(mut results: Vec<SearchResult>, options: &SearchOptions) -> Vec<SearchResult> {
    results.sort_by(|a, b| {
        let ord = compare(a, b, options.sort_by);
        match options.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    if let Some(limit) = options.limit {
        results.truncate(limit);
    }
    results
}

/// Wraps the first case-insensitive occurrence of `keyword` in `<mark>` tags.
///
/// ```
/// use tabstrip::features::search::highlight_text;
///
/// assert_eq!(highlight_text("Open Users", "users"), "Open <mark>Users</mark>");
/// assert_eq!(highlight_text("Settings", "users"), "Settings");
/// ```
pub fn highlight_text(text: &str, keyword: &str) -> String {
    highlight_text_with(text, keyword, HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE)
}

pub fn highlight_text_with(text: &str, keyword: &str, open: &str, close: &str) -> String {
    match helpers::find_case_insensitive(text, keyword.trim()) {
        Some((start, end)) => format!(
            "{}{}{}{}{}",
            &text[..start],
            open,
            &text[start..end],
            close,
            &text[end..]
        ),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TabManagerConfig;
    use crate::model::{TabConfig, TabMeta, TabUpdate};

    fn manager() -> TabManager {
        let manager = TabManager::new(TabManagerConfig::default());
        manager
            .add_tab(&TabConfig::new("用户管理", "/admin/users"))
            .unwrap();
        manager
            .add_tab(&TabConfig::new("系统设置", "/admin/settings"))
            .unwrap();
        manager
    }

    #[test]
    fn test_search_matches_title() {
        let engine = SearchEngine::new();
        let results = engine.search(&manager(), "用户", &SearchOptions::default());
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.0);
        assert!(results[0].matched_fields.contains(&SearchField::Title));
        assert_eq!(results[0].tab.path, "/admin/users");
    }

    #[test]
    fn test_blank_keyword_returns_nothing_and_records_nothing() {
        let engine = SearchEngine::new();
        assert!(engine.search(&manager(), "", &SearchOptions::default()).is_empty());
        assert!(engine.search(&manager(), "   ", &SearchOptions::default()).is_empty());
        assert!(engine.search_history().is_empty());
    }

    #[test]
    fn test_scores_are_weighted_and_capped() {
        let manager = manager();
        let engine = SearchEngine::new();
        // "/admin" prefixes both paths: 80 × 1.
        let results = engine.search(&manager, "/admin", &SearchOptions::default());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 80.0));
        assert!(results.iter().all(|r| r.matched_fields == vec![SearchField::Path]));

        // Exact title match: 100 × 2, capped.
        let results = engine.search(&manager, "系统设置", &SearchOptions::default());
        assert_eq!(results[0].score, 100.0);

        // Substring in the path only: 60 × 1.
        let results = engine.search(&manager, "settings", &SearchOptions::default());
        assert_eq!(results[0].score, 60.0);
    }

    #[test]
    fn test_meta_field_is_opt_in() {
        let manager = TabManager::new(TabManagerConfig::default());
        let mut meta = TabMeta::new();
        meta.insert("owner".into(), "alice".into());
        manager
            .add_tab(&TabConfig::new("Report", "/r").with_meta(meta))
            .unwrap();

        let engine = SearchEngine::new();
        assert!(engine
            .search(&manager, "alice", &SearchOptions::default())
            .is_empty());

        let options = SearchOptions {
            fields: vec![SearchField::Title, SearchField::Meta],
            ..Default::default()
        };
        let results = engine.search(&manager, "alice", &options);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 30.0);
        assert_eq!(results[0].matched_fields, vec![SearchField::Meta]);
    }

    #[test]
    fn test_case_sensitivity() {
        let manager = TabManager::new(TabManagerConfig::default());
        manager.add_tab(&TabConfig::new("Users", "/users")).unwrap();
        let engine = SearchEngine::new();

        let insensitive = engine.search(&manager, "USERS", &SearchOptions::default());
        assert_eq!(insensitive.len(), 1);

        let options = SearchOptions {
            case_sensitive: true,
            ..Default::default()
        };
        assert!(engine.search(&manager, "USERS", &options).is_empty());
    }

    #[test]
    fn test_sorting_and_limit() {
        let manager = TabManager::new(TabManagerConfig::default());
        for title in ["Charlie", "alpha", "Bravo"] {
            manager
                .add_tab(&TabConfig::new(title, format!("/x/{}", title)))
                .unwrap();
        }
        let engine = SearchEngine::new();
        let options = SearchOptions {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
            limit: Some(2),
            ..Default::default()
        };
        let results = engine.search(&manager, "/x", &options);
        let titles: Vec<_> = results.iter().map(|r| r.tab.title.as_str()).collect();
        assert_eq!(titles, vec!["Bravo", "Charlie"]);
    }

    #[test]
    fn test_history_is_mru_and_deduplicated() {
        let manager = manager();
        let engine = SearchEngine::new();
        engine.search(&manager, "用户", &SearchOptions::default());
        engine.search(&manager, "admin", &SearchOptions::default());
        engine.search(&manager, "用户", &SearchOptions::default());

        let history = engine.search_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].keyword, "用户");
        assert_eq!(history[0].result_count, 1);
        assert_eq!(history[1].keyword, "admin");
        assert_eq!(history[1].result_count, 2);

        for n in 0..30 {
            engine.search(&manager, &format!("k{}", n), &SearchOptions::default());
        }
        assert_eq!(engine.search_history().len(), SEARCH_HISTORY_CAPACITY);
        engine.clear_search_history();
        assert!(engine.search_history().is_empty());
    }

    #[test]
    fn test_advanced_search_filters() {
        let manager = manager();
        let users = manager.find_tab_by_path("/admin/users").unwrap();
        manager.pin_tab(&users.id);
        let settings = manager.find_tab_by_path("/admin/settings").unwrap();
        manager.update_tab(&settings.id, &TabUpdate::new().status(TabStatus::Error));

        let engine = SearchEngine::new();
        let pinned = engine.advanced_search(
            &manager,
            &AdvancedSearchOptions {
                pinned: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].tab.id, users.id);
        assert_eq!(pinned[0].score, 100.0);

        let errored = engine.advanced_search(
            &manager,
            &AdvancedSearchOptions {
                keyword: Some("admin".into()),
                status: Some(TabStatus::Error),
                ..Default::default()
            },
        );
        assert_eq!(errored.len(), 1);
        assert_eq!(errored[0].tab.id, settings.id);

        let frequent = engine.advanced_search(
            &manager,
            &AdvancedSearchOptions {
                min_visit_count: Some(50),
                ..Default::default()
            },
        );
        assert!(frequent.is_empty());
    }

    #[test]
    fn test_suggestions_prefer_history() {
        let manager = TabManager::new(TabManagerConfig::default());
        manager.add_tab(&TabConfig::new("Users", "/users")).unwrap();
        manager.add_tab(&TabConfig::new("Uploads", "/uploads")).unwrap();
        let engine = SearchEngine::new();
        engine.search(&manager, "user roles", &SearchOptions::default());

        let suggestions = engine.suggestions(&manager, "u", 10);
        assert_eq!(suggestions, vec!["user roles", "Users", "Uploads"]);
        assert_eq!(engine.suggestions(&manager, "u", 1).len(), 1);
    }

    #[test]
    fn test_highlight() {
        let highlighted = highlight_text("用户管理系统", "用户");
        assert!(highlighted.contains("<mark>用户</mark>"));
        assert_eq!(highlight_text("系统设置", "用户"), "系统设置");
        assert_eq!(highlight_text("Anything", ""), "Anything");
        assert_eq!(
            highlight_text_with("Admin Users", "users", "[", "]"),
            "Admin [Users]"
        );
    }
}
