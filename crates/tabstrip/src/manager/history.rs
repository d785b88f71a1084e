use std::collections::VecDeque;

use crate::model::HistoryEntry;

pub const HISTORY_CAPACITY: usize = 20;

/// Bounded stack of closed tabs, most recent first.
///
/// Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct ClosedHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for ClosedHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ClosedHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuilds a history from entries ordered most recent first, keeping
    /// only the newest `HISTORY_CAPACITY`.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut history = Self::default();
        history.entries = entries.into_iter().take(history.capacity).collect();
        history
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_front()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Tab, TabConfig};

    fn entry(n: usize) -> HistoryEntry {
        let tab = Tab::from_config(TabConfig::new(format!("Tab {}", n), format!("/t/{}", n)));
        HistoryEntry::new(tab, Some(n))
    }

    #[test]
    fn test_pop_is_lifo() {
        let mut history = ClosedHistory::default();
        history.push(entry(1));
        history.push(entry(2));
        assert_eq!(history.pop().unwrap().tab.title, "Tab 2");
        assert_eq!(history.pop().unwrap().tab.title, "Tab 1");
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_evicts_oldest_past_capacity() {
        let mut history = ClosedHistory::default();
        for n in 0..25 {
            history.push(entry(n));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let entries = history.entries();
        assert_eq!(entries[0].tab.title, "Tab 24");
        assert_eq!(entries[HISTORY_CAPACITY - 1].tab.title, "Tab 5");
    }

    #[test]
    fn test_from_entries_truncates() {
        let entries: Vec<_> = (0..30).map(entry).collect();
        let history = ClosedHistory::from_entries(entries);
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.entries()[0].tab.title, "Tab 0");
    }
}
