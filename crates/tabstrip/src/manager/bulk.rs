//! Bulk close operations.
//!
//! All four share one policy: only tabs that are closable and not active are
//! closed, everything else is kept in place. Each returns the number of tabs
//! actually closed and publishes its event only when that number is nonzero.
//! Closed tabs enter history without a position.

use super::{TabEventData, TabManager};
use crate::model::{HistoryEntry, Tab, TabId};

impl TabManager {
    /// Closes every closable tab except `id` (and the active tab).
    pub fn close_other_tabs(&self, id: &TabId) -> usize {
        if self.get_tab_index(id).is_none() {
            return 0;
        }
        let closed = self.close_where(|_, tab| &tab.id != id);
        self.finish_bulk(closed, |closed, kept| TabEventData::CloseOthers { closed, kept }, id)
    }

    /// Closes the closable tabs left of `id`.
    pub fn close_tabs_to_left(&self, id: &TabId) -> usize {
        let Some(index) = self.get_tab_index(id) else {
            return 0;
        };
        let closed = self.close_where(|i, _| i < index);
        self.finish_bulk(closed, |closed, kept| TabEventData::CloseLeft { closed, kept }, id)
    }

    /// Closes the closable tabs right of `id`.
    pub fn close_tabs_to_right(&self, id: &TabId) -> usize {
        let Some(index) = self.get_tab_index(id) else {
            return 0;
        };
        let closed = self.close_where(|i, _| i > index);
        self.finish_bulk(closed, |closed, kept| TabEventData::CloseRight { closed, kept }, id)
    }

    /// Closes every closable tab. The active tab and unclosable tabs remain.
    pub fn close_all_tabs(&self) -> usize {
        let closed = self.close_where(|_, _| true);
        let count = closed.len();
        if count == 0 {
            return 0;
        }
        self.persist_tabs();
        self.persist_history();
        self.emit(TabEventData::CloseAll { closed });
        self.ensure_active(0);
        count
    }

    /// Removes the tabs `select` picks that policy allows closing, pushing
    /// each onto history. Returns them in their original order.
    fn close_where<F>(&self, select: F) -> Vec<Tab>
    where
        F: Fn(usize, &Tab) -> bool,
    {
        let mut state = self.state.borrow_mut();
        let tabs = std::mem::take(&mut state.tabs);
        let mut closed = Vec::new();
        let mut kept = Vec::with_capacity(tabs.len());

        for (index, tab) in tabs.into_iter().enumerate() {
            if select(index, &tab) && state.can_close(&tab) {
                closed.push(tab);
            } else {
                kept.push(tab);
            }
        }
        state.tabs = kept;
        for tab in &closed {
            state.history.push(HistoryEntry::new(tab.clone(), None));
        }
        closed
    }

    fn finish_bulk<F>(&self, closed: Vec<Tab>, event: F, reference: &TabId) -> usize
    where
        F: FnOnce(Vec<Tab>, Option<Tab>) -> TabEventData,
    {
        let count = closed.len();
        if count == 0 {
            return 0;
        }
        tracing::debug!("bulk close removed {} tabs", count);
        self.persist_tabs();
        self.persist_history();
        let kept = self.get_tab(reference);
        self.emit(event(closed, kept));
        count
    }
}
