//! # Batch Operations
//!
//! A selection of tab ids plus a batch-mode flag. Nothing here is persisted.
//!
//! Bulk actions run one tab at a time through the regular [`TabManager`]
//! operations, so every per-tab rule still applies: the active tab and
//! unclosable tabs are skipped by close, and already pinned tabs by pin. A
//! refused tab does not stop the batch; [`BatchOutcome`] reports how many
//! were attempted and how many succeeded.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::events::{Event, EventBus};
use crate::manager::TabManager;
use crate::model::TabId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Close,
    Pin,
    Unpin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchEventKind {
    ModeChanged,
    SelectionChanged,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    ModeChanged { enabled: bool },
    SelectionChanged { count: usize },
    Completed { action: BatchAction, outcome: BatchOutcome },
}

impl Event for BatchEvent {
    type Kind = BatchEventKind;

    fn kind(&self) -> BatchEventKind {
        match self {
            BatchEvent::ModeChanged { .. } => BatchEventKind::ModeChanged,
            BatchEvent::SelectionChanged { .. } => BatchEventKind::SelectionChanged,
            BatchEvent::Completed { .. } => BatchEventKind::Completed,
        }
    }
}

#[derive(Debug, Default)]
struct BatchState {
    enabled: bool,
    selected: HashSet<TabId>,
}

#[derive(Default)]
pub struct BatchManager {
    state: RefCell<BatchState>,
    bus: EventBus<BatchEvent>,
}

impl BatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &EventBus<BatchEvent> {
        &self.bus
    }

    fn selection_changed(&self) {
        let count = self.state.borrow().selected.len();
        self.bus.publish(&BatchEvent::SelectionChanged { count });
    }

    // --- Mode ---

    pub fn is_batch_mode(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn enter_batch_mode(&self) -> bool {
        if self.is_batch_mode() {
            return false;
        }
        self.state.borrow_mut().enabled = true;
        self.bus.publish(&BatchEvent::ModeChanged { enabled: true });
        true
    }

    /// Leaves batch mode and drops the selection.
    pub fn exit_batch_mode(&self) -> bool {
        if !self.is_batch_mode() {
            return false;
        }
        {
            let mut state = self.state.borrow_mut();
            state.enabled = false;
            state.selected.clear();
        }
        self.bus.publish(&BatchEvent::ModeChanged { enabled: false });
        true
    }

    /// Flips batch mode and returns the new state.
    pub fn toggle_batch_mode(&self) -> bool {
        if self.is_batch_mode() {
            self.exit_batch_mode();
            false
        } else {
            self.enter_batch_mode();
            true
        }
    }

    // --- Selection ---

    pub fn is_selected(&self, id: &TabId) -> bool {
        self.state.borrow().selected.contains(id)
    }

    /// Selected ids that still name a tab.
    pub fn selected_count(&self, manager: &TabManager) -> usize {
        let state = self.state.borrow();
        state
            .selected
            .iter()
            .filter(|id| manager.get_tab_index(id).is_some())
            .count()
    }

    /// Selected ids that still name a tab, in tab order.
    pub fn selected_ids(&self, manager: &TabManager) -> Vec<TabId> {
        let state = self.state.borrow();
        manager
            .get_all_tabs()
            .into_iter()
            .map(|tab| tab.id)
            .filter(|id| state.selected.contains(id))
            .collect()
    }

    pub fn select(&self, id: &TabId) -> bool {
        let added = self.state.borrow_mut().selected.insert(id.clone());
        if added {
            self.selection_changed();
        }
        added
    }

    pub fn deselect(&self, id: &TabId) -> bool {
        let removed = self.state.borrow_mut().selected.remove(id);
        if removed {
            self.selection_changed();
        }
        removed
    }

    /// Flips one id. Returns whether it is selected afterwards.
    pub fn toggle(&self, id: &TabId) -> bool {
        if self.is_selected(id) {
            self.deselect(id);
            false
        } else {
            self.select(id);
            true
        }
    }

    pub fn select_all(&self, manager: &TabManager) -> usize {
        let ids: HashSet<TabId> = manager.get_all_tabs().into_iter().map(|t| t.id).collect();
        self.replace_selection(ids)
    }

    /// Selects exactly the tabs that were not selected.
    pub fn invert_selection(&self, manager: &TabManager) -> usize {
        let ids: HashSet<TabId> = {
            let state = self.state.borrow();
            manager
                .get_all_tabs()
                .into_iter()
                .map(|t| t.id)
                .filter(|id| !state.selected.contains(id))
                .collect()
        };
        self.replace_selection(ids)
    }

    /// Adds the tabs between two positions, inclusive and in either order.
    pub fn select_range(&self, manager: &TabManager, from_index: usize, to_index: usize) -> usize {
        let (lo, hi) = if from_index <= to_index {
            (from_index, to_index)
        } else {
            (to_index, from_index)
        };
        let tabs = manager.get_all_tabs();
        if lo >= tabs.len() {
            return 0;
        }
        let hi = hi.min(tabs.len() - 1);

        let added = {
            let mut state = self.state.borrow_mut();
            tabs[lo..=hi]
                .iter()
                .filter(|tab| state.selected.insert(tab.id.clone()))
                .count()
        };
        if added > 0 {
            self.selection_changed();
        }
        added
    }

    pub fn clear_selection(&self) {
        let had_any = {
            let mut state = self.state.borrow_mut();
            let had_any = !state.selected.is_empty();
            state.selected.clear();
            had_any
        };
        if had_any {
            self.selection_changed();
        }
    }

    /// Drops ids of tabs closed outside the batch manager. Returns how many
    /// were dropped.
    pub fn prune(&self, manager: &TabManager) -> usize {
        let dropped = {
            let mut state = self.state.borrow_mut();
            let before = state.selected.len();
            state
                .selected
                .retain(|id| manager.get_tab_index(id).is_some());
            before - state.selected.len()
        };
        if dropped > 0 {
            self.selection_changed();
        }
        dropped
    }

    fn replace_selection(&self, ids: HashSet<TabId>) -> usize {
        let count = ids.len();
        self.state.borrow_mut().selected = ids;
        self.selection_changed();
        count
    }

    // --- Actions ---

    /// Closes each selected tab. Closed tabs leave the selection.
    pub fn close_selected(&self, manager: &TabManager) -> BatchOutcome {
        self.run(manager, BatchAction::Close, |id| manager.remove_tab(id))
    }

    pub fn pin_selected(&self, manager: &TabManager) -> BatchOutcome {
        self.run(manager, BatchAction::Pin, |id| manager.pin_tab(id))
    }

    pub fn unpin_selected(&self, manager: &TabManager) -> BatchOutcome {
        self.run(manager, BatchAction::Unpin, |id| manager.unpin_tab(id))
    }

    fn run<F>(&self, manager: &TabManager, action: BatchAction, apply: F) -> BatchOutcome
    where
        F: Fn(&TabId) -> bool,
    {
        let ids = self.selected_ids(manager);
        let mut outcome = BatchOutcome {
            attempted: ids.len(),
            succeeded: 0,
        };
        for id in &ids {
            if apply(id) {
                outcome.succeeded += 1;
            } else {
                tracing::debug!("batch {:?} skipped tab {}", action, id);
            }
        }

        if action == BatchAction::Close {
            let mut state = self.state.borrow_mut();
            state
                .selected
                .retain(|id| manager.get_tab_index(id).is_some());
        }

        self.bus.publish(&BatchEvent::Completed { action, outcome });
        outcome
    }
}
