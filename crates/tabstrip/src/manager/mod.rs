//! # Tab Manager
//!
//! [`TabManager`] is the single authoritative model of open tabs. It owns the
//! ordered tab sequence, the active tab pointer, and the closed-tab history,
//! and it is the only writer of all three.
//!
//! ## Operation Contract
//!
//! Every mutating operation:
//! 1. Validates its input. On failure it returns `false`/`None` and changes
//!    nothing.
//! 2. Mutates in-memory state.
//! 3. Persists the affected domains (best effort, failures are logged).
//! 4. Publishes exactly one [`TabEvent`].
//!
//! ## Invariants
//!
//! - **Pinned prefix**: all pinned tabs precede all unpinned tabs.
//! - **Active pointer**: `active_tab_id` is `None` or the id of a present tab.
//! - **Unique ids**: no two tabs share an id.
//! - **Protected active tab**: the active tab is never closed by
//!   [`remove_tab`](TabManager::remove_tab) or the bulk closes. Callers
//!   activate something else first.
//!
//! ## Reads Are Copies
//!
//! Every getter returns owned clones. Nothing outside the manager can reach
//! its internal `Vec<Tab>`.
//!
//! ## Re-entrancy
//!
//! All methods take `&self`; state lives in a `RefCell` whose borrow is
//! released before any event is published. A listener holding an
//! `Rc<TabManager>` (or a `Weak`) may call back into the manager while it is
//! being notified.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::config::TabManagerConfig;
use crate::events::{EventBus, Listener, ListenerId, ListenerResult};
use crate::model::{HistoryEntry, Tab, TabConfig, TabId, TabUpdate};
use crate::store::{StorageBackend, TabStorage, TabsRecord};
use crate::validation;

pub mod bulk;
pub mod events;
pub mod history;

pub use events::{TabEvent, TabEventData, TabEventKind};
pub use history::{ClosedHistory, HISTORY_CAPACITY};

#[derive(Debug, Default)]
struct ManagerState {
    tabs: Vec<Tab>,
    active_tab_id: Option<TabId>,
    history: ClosedHistory,
}

impl ManagerState {
    fn position(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.id == id)
    }

    fn pinned_count(&self) -> usize {
        self.tabs.iter().take_while(|t| t.pinned).count()
    }

    fn is_active(&self, id: &TabId) -> bool {
        self.active_tab_id.as_ref() == Some(id)
    }

    /// Closable under policy: not flagged unclosable and not the active tab.
    fn can_close(&self, tab: &Tab) -> bool {
        tab.closable && !self.is_active(&tab.id)
    }

    /// Stable partition: pinned first, relative order kept on both sides.
    fn repartition(&mut self) {
        let (mut pinned, unpinned): (Vec<Tab>, Vec<Tab>) =
            std::mem::take(&mut self.tabs).into_iter().partition(|t| t.pinned);
        pinned.extend(unpinned);
        self.tabs = pinned;
    }

    fn apply_record(&mut self, record: TabsRecord) {
        let mut seen = HashSet::new();
        self.tabs = record
            .tabs
            .into_iter()
            .filter(|t| t.id.is_valid() && seen.insert(t.id.clone()))
            .collect();
        self.repartition();
        self.active_tab_id = record
            .active_tab_id
            .filter(|id| self.tabs.iter().any(|t| &t.id == id));
    }
}

pub struct TabManager {
    config: TabManagerConfig,
    state: RefCell<ManagerState>,
    bus: EventBus<TabEvent>,
    storage: TabStorage,
}

impl TabManager {
    /// Manager backed by in-memory storage.
    pub fn new(config: TabManagerConfig) -> Self {
        let storage = TabStorage::in_memory(config.persist_key.clone());
        Self::with_storage(config, storage)
    }

    pub fn with_backend(config: TabManagerConfig, backend: Rc<dyn StorageBackend>) -> Self {
        let storage = TabStorage::new(backend, config.persist_key.clone());
        Self::with_storage(config, storage)
    }

    /// Builds the manager, restoring persisted state when there is any and
    /// otherwise opening the configured default tabs.
    pub fn with_storage(config: TabManagerConfig, storage: TabStorage) -> Self {
        let manager = Self {
            config,
            state: RefCell::new(ManagerState::default()),
            bus: EventBus::new(),
            storage,
        };

        if !manager.restore() {
            for tab in manager.config.default_tabs().to_vec() {
                if manager.add_tab(&tab).is_none() {
                    tracing::warn!("skipping default tab {:?}", tab.path);
                }
            }
        }
        manager
    }

    pub fn config(&self) -> &TabManagerConfig {
        &self.config
    }

    pub fn storage(&self) -> &TabStorage {
        &self.storage
    }

    // --- Events ---

    pub fn events(&self) -> &EventBus<TabEvent> {
        &self.bus
    }

    pub fn subscribe(&self, kind: TabEventKind, listener: Listener<TabEvent>) -> ListenerId {
        self.bus.subscribe(kind, listener)
    }

    pub fn on<F>(&self, kind: TabEventKind, f: F) -> ListenerId
    where
        F: Fn(&TabEvent) -> ListenerResult + 'static,
    {
        self.bus.on(kind, f)
    }

    pub fn subscribe_once<F>(&self, kind: TabEventKind, f: F) -> ListenerId
    where
        F: Fn(&TabEvent) -> ListenerResult + 'static,
    {
        self.bus.once(kind, f)
    }

    pub fn unsubscribe(&self, kind: TabEventKind, id: ListenerId) -> bool {
        self.bus.unsubscribe(kind, id)
    }

    fn emit(&self, data: TabEventData) {
        self.bus.publish(&TabEvent::new(data));
    }

    // --- Persistence ---

    fn persist_tabs(&self) {
        if !self.config.persist {
            return;
        }
        let state = self.state.borrow();
        if let Err(err) = self
            .storage
            .save_tabs(&state.tabs, state.active_tab_id.as_ref())
        {
            tracing::warn!("failed to persist tabs: {}", err);
        }
    }

    fn persist_history(&self) {
        if !self.config.persist {
            return;
        }
        let entries = self.state.borrow().history.entries();
        if let Err(err) = self.storage.save_history(&entries) {
            tracing::warn!("failed to persist closed history: {}", err);
        }
    }

    /// Replaces in-memory state with what storage holds. Returns false (and
    /// leaves state alone) when persistence is off or nothing was stored.
    pub fn restore(&self) -> bool {
        if !self.config.persist {
            return false;
        }
        let Some(record) = self.storage.load_tabs() else {
            return false;
        };
        let history = self.storage.load_history();

        let tabs = {
            let mut state = self.state.borrow_mut();
            state.apply_record(record);
            state.history = ClosedHistory::from_entries(history);
            state.tabs.clone()
        };
        tracing::debug!("restored {} tabs", tabs.len());
        self.emit(TabEventData::Restored { tabs });
        true
    }

    // --- Mutations ---

    /// Opens a tab.
    ///
    /// Returns the existing tab (activated) when one already has the same
    /// path, and `None` when the config is invalid or the manager is full.
    pub fn add_tab(&self, config: &TabConfig) -> Option<Tab> {
        let result = validation::validate(config);
        if !result.valid {
            tracing::debug!("rejected tab config: {:?}", result.errors);
            return None;
        }
        let config = validation::sanitize(config);

        if let Some(existing) = self.find_tab_by_path(&config.path) {
            self.activate_tab(&existing.id);
            return self.get_tab(&existing.id).or(Some(existing));
        }

        let count = self.get_tabs_count();
        if count >= self.config.max_tabs {
            tracing::debug!("tab limit {} reached", self.config.max_tabs);
            self.emit(TabEventData::LimitReached {
                count,
                limit: self.config.max_tabs,
            });
            return None;
        }

        let tab = {
            let mut state = self.state.borrow_mut();
            let mut tab = Tab::from_config(config);
            if state.position(&tab.id).is_some() {
                tab.id = TabId::new();
            }
            let index = if tab.pinned {
                state.pinned_count()
            } else {
                state.tabs.len()
            };
            state.tabs.insert(index, tab.clone());
            tab
        };

        self.persist_tabs();
        self.emit(TabEventData::Add { tab: tab.clone() });

        if self.config.auto_activate {
            self.activate_tab(&tab.id);
        }
        self.get_tab(&tab.id).or(Some(tab))
    }

    /// Closes one tab. Fails for unknown ids, unclosable tabs, and the
    /// active tab.
    pub fn remove_tab(&self, id: &TabId) -> bool {
        if !id.is_valid() {
            return false;
        }

        let (tab, index) = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.position(id) else {
                return false;
            };
            if !state.can_close(&state.tabs[index]) {
                tracing::debug!("tab {} is not closable", id);
                return false;
            }
            let tab = state.tabs.remove(index);
            state
                .history
                .push(HistoryEntry::new(tab.clone(), Some(index)));
            (tab, index)
        };

        self.persist_tabs();
        self.persist_history();
        self.emit(TabEventData::Remove { tab, index });
        self.ensure_active(index);
        true
    }

    pub fn update_tab(&self, id: &TabId, updates: &TabUpdate) -> bool {
        if !id.is_valid() {
            return false;
        }

        let tab = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.position(id) else {
                return false;
            };
            let mut tab = state.tabs[index].clone();
            let pin_changed = updates.apply_to(&mut tab);
            let result = validation::validate(&tab.to_config());
            if !result.valid {
                tracing::debug!("rejected update for tab {}: {:?}", id, result.errors);
                return false;
            }
            state.tabs[index] = tab.clone();
            if pin_changed {
                state.repartition();
            }
            tab
        };

        self.persist_tabs();
        self.emit(TabEventData::Update {
            tab,
            changes: updates.clone(),
        });
        true
    }

    pub fn activate_tab(&self, id: &TabId) -> bool {
        if !id.is_valid() {
            return false;
        }

        let (tab, previous) = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.position(id) else {
                return false;
            };
            let previous = state
                .active_tab_id
                .as_ref()
                .filter(|active| *active != id)
                .and_then(|active| state.tabs.iter().find(|t| &t.id == active))
                .cloned();

            let tab = &mut state.tabs[index];
            tab.visit_count = tab.visit_count.saturating_add(1);
            tab.touch();
            let tab = tab.clone();
            state.active_tab_id = Some(id.clone());
            (tab, previous)
        };

        self.persist_tabs();
        self.emit(TabEventData::Activate { tab, previous });
        true
    }

    pub fn pin_tab(&self, id: &TabId) -> bool {
        self.set_pinned(id, true)
    }

    pub fn unpin_tab(&self, id: &TabId) -> bool {
        self.set_pinned(id, false)
    }

    fn set_pinned(&self, id: &TabId, pinned: bool) -> bool {
        let tab = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.position(id) else {
                return false;
            };
            if state.tabs[index].pinned == pinned {
                return false;
            }
            state.tabs[index].pinned = pinned;
            let tab = state.tabs[index].clone();
            state.repartition();
            tab
        };

        self.persist_tabs();
        self.emit(if pinned {
            TabEventData::Pin { tab }
        } else {
            TabEventData::Unpin { tab }
        });
        true
    }

    /// Moves the tab at `from_index` to `to_index` (remove, then insert).
    ///
    /// Pinned tabs stay inside the pinned prefix and unpinned tabs inside the
    /// unpinned suffix; a move across that boundary fails.
    pub fn reorder_tabs(&self, from_index: usize, to_index: usize) -> bool {
        let tab_id = {
            let mut state = self.state.borrow_mut();
            let len = state.tabs.len();
            if from_index >= len || to_index >= len || from_index == to_index {
                return false;
            }
            let pinned_count = state.pinned_count();
            let crosses = if state.tabs[from_index].pinned {
                to_index >= pinned_count
            } else {
                to_index < pinned_count
            };
            if crosses {
                tracing::debug!(
                    "reorder {} -> {} crosses the pinned boundary",
                    from_index,
                    to_index
                );
                return false;
            }
            let tab = state.tabs.remove(from_index);
            let tab_id = tab.id.clone();
            state.tabs.insert(to_index, tab);
            tab_id
        };

        self.persist_tabs();
        self.emit(TabEventData::Reorder {
            tab_id,
            from_index,
            to_index,
        });
        true
    }

    /// Re-establishes the active pointer after removals: if the active tab is
    /// gone, activate the tab nearest `index`, or clear the pointer when no
    /// tabs remain.
    fn ensure_active(&self, index: usize) {
        let fallback = {
            let mut state = self.state.borrow_mut();
            let dangling = match &state.active_tab_id {
                Some(active) => state.position(active).is_none(),
                None => false,
            };
            if !dangling {
                return;
            }
            if state.tabs.is_empty() {
                state.active_tab_id = None;
                None
            } else {
                let at = index.min(state.tabs.len() - 1);
                Some(state.tabs[at].id.clone())
            }
        };

        match fallback {
            Some(id) => {
                self.activate_tab(&id);
            }
            None => self.persist_tabs(),
        }
    }

    // --- Closed history ---

    /// Closed tabs, most recent first.
    pub fn get_closed_history(&self) -> Vec<HistoryEntry> {
        self.state.borrow().history.entries()
    }

    /// Pops the most recently closed tab and opens it again through
    /// [`add_tab`](Self::add_tab).
    ///
    /// Entries that no longer pass validation are dropped and the next one is
    /// tried. If the add is refused at capacity the entry goes back on the
    /// stack.
    pub fn reopen_last_closed_tab(&self) -> Option<Tab> {
        loop {
            let entry = self.state.borrow_mut().history.pop()?;

            let mut config = entry.tab.to_config();
            config.id = Some(entry.tab.id.clone());

            let result = validation::validate(&config);
            if !result.valid {
                tracing::warn!(
                    "dropping closed tab {} from history: {:?}",
                    entry.tab.id,
                    result.errors
                );
                self.persist_history();
                continue;
            }

            return match self.add_tab(&config) {
                Some(tab) => {
                    self.persist_history();
                    Some(tab)
                }
                None => {
                    self.state.borrow_mut().history.push(entry);
                    None
                }
            };
        }
    }

    pub fn clear_history(&self) {
        self.state.borrow_mut().history.clear();
        self.persist_history();
    }

    /// Drops listeners and all in-memory state. Persisted data is left as is.
    pub fn destroy(&self) {
        self.bus.clear();
        let mut state = self.state.borrow_mut();
        state.tabs.clear();
        state.active_tab_id = None;
        state.history.clear();
    }

    // --- Reads ---

    pub fn get_tab(&self, id: &TabId) -> Option<Tab> {
        self.state
            .borrow()
            .tabs
            .iter()
            .find(|t| &t.id == id)
            .cloned()
    }

    pub fn get_all_tabs(&self) -> Vec<Tab> {
        self.state.borrow().tabs.clone()
    }

    pub fn get_pinned_tabs(&self) -> Vec<Tab> {
        self.state
            .borrow()
            .tabs
            .iter()
            .filter(|t| t.pinned)
            .cloned()
            .collect()
    }

    pub fn get_active_tab(&self) -> Option<Tab> {
        let state = self.state.borrow();
        let active = state.active_tab_id.as_ref()?;
        state.tabs.iter().find(|t| &t.id == active).cloned()
    }

    pub fn get_active_tab_id(&self) -> Option<TabId> {
        self.state.borrow().active_tab_id.clone()
    }

    pub fn get_tab_index(&self, id: &TabId) -> Option<usize> {
        self.state.borrow().position(id)
    }

    pub fn find_tab_by_path(&self, path: &str) -> Option<Tab> {
        let path = path.trim();
        self.state
            .borrow()
            .tabs
            .iter()
            .find(|t| t.path == path)
            .cloned()
    }

    pub fn has_duplicate_tab(&self, path: &str) -> bool {
        self.find_tab_by_path(path).is_some()
    }

    pub fn can_add_tab(&self) -> bool {
        self.get_tabs_count() < self.config.max_tabs
    }

    pub fn get_tabs_count(&self) -> usize {
        self.state.borrow().tabs.len()
    }

    // --- Navigation ---

    pub fn activate_tab_by_index(&self, index: usize) -> bool {
        let id = self.state.borrow().tabs.get(index).map(|t| t.id.clone());
        match id {
            Some(id) => self.activate_tab(&id),
            None => false,
        }
    }

    /// Activates the tab after the active one, wrapping around.
    pub fn activate_next_tab(&self) -> bool {
        self.activate_relative(1)
    }

    /// Activates the tab before the active one, wrapping around.
    pub fn activate_previous_tab(&self) -> bool {
        self.activate_relative(-1)
    }

    fn activate_relative(&self, step: isize) -> bool {
        let target = {
            let state = self.state.borrow();
            let len = state.tabs.len();
            if len == 0 {
                return false;
            }
            let current = state
                .active_tab_id
                .as_ref()
                .and_then(|id| state.position(id));
            let next = match current {
                Some(i) => (i as isize + step).rem_euclid(len as isize) as usize,
                None => 0,
            };
            state.tabs[next].id.clone()
        };
        self.activate_tab(&target)
    }
}
