//! The closed set of events a [`TabManager`](super::TabManager) publishes.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::events::Event;
use crate::helpers;
use crate::model::{Tab, TabId, TabUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabEventKind {
    Add,
    Remove,
    Update,
    Activate,
    Pin,
    Unpin,
    Reorder,
    CloseOthers,
    CloseAll,
    CloseLeft,
    CloseRight,
    LimitReached,
    Restored,
}

impl TabEventKind {
    pub const ALL: [TabEventKind; 13] = [
        TabEventKind::Add,
        TabEventKind::Remove,
        TabEventKind::Update,
        TabEventKind::Activate,
        TabEventKind::Pin,
        TabEventKind::Unpin,
        TabEventKind::Reorder,
        TabEventKind::CloseOthers,
        TabEventKind::CloseAll,
        TabEventKind::CloseLeft,
        TabEventKind::CloseRight,
        TabEventKind::LimitReached,
        TabEventKind::Restored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TabEventKind::Add => "tab:add",
            TabEventKind::Remove => "tab:remove",
            TabEventKind::Update => "tab:update",
            TabEventKind::Activate => "tab:activate",
            TabEventKind::Pin => "tab:pin",
            TabEventKind::Unpin => "tab:unpin",
            TabEventKind::Reorder => "tab:reorder",
            TabEventKind::CloseOthers => "tab:close-others",
            TabEventKind::CloseAll => "tab:close-all",
            TabEventKind::CloseLeft => "tab:close-left",
            TabEventKind::CloseRight => "tab:close-right",
            TabEventKind::LimitReached => "tabs:limit-reached",
            TabEventKind::Restored => "tabs:restored",
        }
    }
}

impl fmt::Display for TabEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabEventData {
    Add {
        tab: Tab,
    },
    Remove {
        tab: Tab,
        index: usize,
    },
    Update {
        tab: Tab,
        changes: TabUpdate,
    },
    Activate {
        tab: Tab,
        previous: Option<Tab>,
    },
    Pin {
        tab: Tab,
    },
    Unpin {
        tab: Tab,
    },
    Reorder {
        tab_id: TabId,
        from_index: usize,
        to_index: usize,
    },
    CloseOthers {
        closed: Vec<Tab>,
        kept: Option<Tab>,
    },
    CloseAll {
        closed: Vec<Tab>,
    },
    CloseLeft {
        closed: Vec<Tab>,
        kept: Option<Tab>,
    },
    CloseRight {
        closed: Vec<Tab>,
        kept: Option<Tab>,
    },
    LimitReached {
        count: usize,
        limit: usize,
    },
    Restored {
        tabs: Vec<Tab>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabEvent {
    pub timestamp: DateTime<Utc>,
    pub data: TabEventData,
}

impl TabEvent {
    pub fn new(data: TabEventData) -> Self {
        Self {
            timestamp: helpers::now(),
            data,
        }
    }

    /// The tabs a bulk close removed, if this is a bulk close.
    pub fn closed_tabs(&self) -> Option<&[Tab]> {
        match &self.data {
            TabEventData::CloseOthers { closed, .. }
            | TabEventData::CloseAll { closed }
            | TabEventData::CloseLeft { closed, .. }
            | TabEventData::CloseRight { closed, .. } => Some(closed.as_slice()),
            _ => None,
        }
    }
}

impl Event for TabEvent {
    type Kind = TabEventKind;

    fn kind(&self) -> TabEventKind {
        match &self.data {
            TabEventData::Add { .. } => TabEventKind::Add,
            TabEventData::Remove { .. } => TabEventKind::Remove,
            TabEventData::Update { .. } => TabEventKind::Update,
            TabEventData::Activate { .. } => TabEventKind::Activate,
            TabEventData::Pin { .. } => TabEventKind::Pin,
            TabEventData::Unpin { .. } => TabEventKind::Unpin,
            TabEventData::Reorder { .. } => TabEventKind::Reorder,
            TabEventData::CloseOthers { .. } => TabEventKind::CloseOthers,
            TabEventData::CloseAll { .. } => TabEventKind::CloseAll,
            TabEventData::CloseLeft { .. } => TabEventKind::CloseLeft,
            TabEventData::CloseRight { .. } => TabEventKind::CloseRight,
            TabEventData::LimitReached { .. } => TabEventKind::LimitReached,
            TabEventData::Restored { .. } => TabEventKind::Restored,
        }
    }
}
