//! # Statistics
//!
//! Per-path visit counts and dwell time.
//!
//! [`StatisticsManager::attach`] subscribes to the manager's `tab:activate`
//! and `tab:remove` events. There is at most one open session: activating a
//! tab closes the current session (adding its duration to that path) and
//! opens a new one. Removing the tab a session belongs to closes it.
//!
//! Visits are counted when a session starts, durations when it ends, and the
//! average is `total / visits`.

use chrono::serde::ts_milliseconds_option;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::Result;
use crate::events::ListenerId;
use crate::helpers;
use crate::manager::{TabEventData, TabEventKind, TabManager};
use crate::model::{Tab, TabId};
use crate::store::TabStorage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStats {
    pub path: String,
    pub title: String,
    pub visit_count: u32,
    pub total_duration_ms: u64,
    pub average_duration_ms: u64,
    #[serde(default, with = "ts_milliseconds_option")]
    pub last_visited_at: Option<DateTime<Utc>>,
}

impl PathStats {
    fn new(path: &str, title: &str) -> Self {
        Self {
            path: path.to_string(),
            title: title.to_string(),
            visit_count: 0,
            total_duration_ms: 0,
            average_duration_ms: 0,
            last_visited_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsTotals {
    pub paths: usize,
    pub visits: u64,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct Session {
    tab_id: TabId,
    path: String,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StatsState {
    stats: BTreeMap<String, PathStats>,
    session: Option<Session>,
}

impl StatsState {
    fn end_session(&mut self, at: DateTime<Utc>) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        let elapsed = (at - session.started_at).num_milliseconds().max(0) as u64;
        if let Some(stats) = self.stats.get_mut(&session.path) {
            stats.total_duration_ms = stats.total_duration_ms.saturating_add(elapsed);
            if stats.visit_count > 0 {
                stats.average_duration_ms = stats.total_duration_ms / u64::from(stats.visit_count);
            }
        }
        true
    }

    fn start_session(&mut self, tab: &Tab, at: DateTime<Utc>) {
        self.end_session(at);
        let stats = self
            .stats
            .entry(tab.path.clone())
            .or_insert_with(|| PathStats::new(&tab.path, &tab.title));
        stats.title = tab.title.clone();
        stats.visit_count = stats.visit_count.saturating_add(1);
        stats.last_visited_at = Some(at);
        self.session = Some(Session {
            tab_id: tab.id.clone(),
            path: tab.path.clone(),
            started_at: at,
        });
    }
}

/// Shared between the manager handle and its event listeners.
struct StatsInner {
    storage: TabStorage,
    persist: bool,
    state: RefCell<StatsState>,
}

impl StatsInner {
    fn persist(&self) {
        if !self.persist {
            return;
        }
        if let Err(err) = self.storage.save_statistics(&self.state.borrow().stats) {
            tracing::warn!("failed to persist statistics: {}", err);
        }
    }

    fn on_activate(&self, tab: &Tab) {
        self.state.borrow_mut().start_session(tab, helpers::now());
        self.persist();
    }

    fn on_remove(&self, tab: &Tab) {
        let ended = {
            let mut state = self.state.borrow_mut();
            let owns_session = state
                .session
                .as_ref()
                .map_or(false, |session| session.tab_id == tab.id);
            owns_session && state.end_session(helpers::now())
        };
        if ended {
            self.persist();
        }
    }
}

pub struct StatisticsManager {
    inner: Rc<StatsInner>,
    listeners: RefCell<Vec<(TabEventKind, ListenerId)>>,
}

impl StatisticsManager {
    pub fn new(storage: TabStorage, persist: bool) -> Self {
        let stats = if persist {
            storage.load_statistics()
        } else {
            BTreeMap::new()
        };
        Self {
            inner: Rc::new(StatsInner {
                storage,
                persist,
                state: RefCell::new(StatsState {
                    stats,
                    session: None,
                }),
            }),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn for_manager(manager: &TabManager) -> Self {
        Self::new(manager.storage().clone(), manager.config().persist)
    }

    /// Starts tracking `manager`. The currently active tab, if any, opens the
    /// first session.
    ///
    /// While attached, further calls register nothing and return the
    /// existing listener ids.
    pub fn attach(&self, manager: &TabManager) -> Vec<ListenerId> {
        {
            let listeners = self.listeners.borrow();
            if !listeners.is_empty() {
                return listeners.iter().map(|(_, id)| *id).collect();
            }
        }

        let inner = Rc::clone(&self.inner);
        let on_activate = manager.on(TabEventKind::Activate, move |event| {
            if let TabEventData::Activate { tab, .. } = &event.data {
                inner.on_activate(tab);
            }
            Ok(())
        });

        let inner = Rc::clone(&self.inner);
        let on_remove = manager.on(TabEventKind::Remove, move |event| {
            if let TabEventData::Remove { tab, .. } = &event.data {
                inner.on_remove(tab);
            }
            Ok(())
        });

        let mut listeners = self.listeners.borrow_mut();
        listeners.push((TabEventKind::Activate, on_activate));
        listeners.push((TabEventKind::Remove, on_remove));

        if let Some(active) = manager.get_active_tab() {
            if self.inner.state.borrow().session.is_none() {
                self.inner.on_activate(&active);
            }
        }
        vec![on_activate, on_remove]
    }

    /// Stops tracking and closes the open session.
    pub fn detach(&self, manager: &TabManager) {
        for (kind, id) in self.listeners.borrow_mut().drain(..) {
            manager.unsubscribe(kind, id);
        }
        self.end_session_at(helpers::now());
    }

    pub fn start_session_at(&self, tab: &Tab, at: DateTime<Utc>) {
        self.inner.state.borrow_mut().start_session(tab, at);
        self.inner.persist();
    }

    /// Closes the open session at `at`. Returns false when none was open.
    pub fn end_session_at(&self, at: DateTime<Utc>) -> bool {
        let ended = self.inner.state.borrow_mut().end_session(at);
        if ended {
            self.inner.persist();
        }
        ended
    }

    pub fn has_session(&self) -> bool {
        self.inner.state.borrow().session.is_some()
    }

    pub fn get(&self, path: &str) -> Option<PathStats> {
        self.inner.state.borrow().stats.get(path).cloned()
    }

    /// Every tracked path, ordered by path.
    pub fn all(&self) -> Vec<PathStats> {
        self.inner.state.borrow().stats.values().cloned().collect()
    }

    pub fn top_by_visits(&self, n: usize) -> Vec<PathStats> {
        let mut stats = self.all();
        stats.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
        stats.truncate(n);
        stats
    }

    pub fn top_by_duration(&self, n: usize) -> Vec<PathStats> {
        let mut stats = self.all();
        stats.sort_by(|a, b| b.total_duration_ms.cmp(&a.total_duration_ms));
        stats.truncate(n);
        stats
    }

    pub fn totals(&self) -> StatsTotals {
        let state = self.inner.state.borrow();
        StatsTotals {
            paths: state.stats.len(),
            visits: state.stats.values().map(|s| u64::from(s.visit_count)).sum(),
            total_duration_ms: state.stats.values().map(|s| s.total_duration_ms).sum(),
        }
    }

    /// Drops all statistics and the open session.
    pub fn reset(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.stats.clear();
            state.session = None;
        }
        self.inner.persist();
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.all())?)
    }

    pub fn export_csv(&self) -> String {
        let mut out =
            String::from("path,title,visitCount,totalDurationMs,averageDurationMs,lastVisitedAt\n");
        for stats in self.all() {
            let last = stats
                .last_visited_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default();
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                csv_field(&stats.path),
                csv_field(&stats.title),
                stats.visit_count,
                stats.total_duration_ms,
                stats.average_duration_ms,
                last
            ));
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
