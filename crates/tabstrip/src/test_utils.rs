use std::cell::RefCell;
use std::rc::Rc;

use crate::config::TabManagerConfig;
use crate::manager::{TabEvent, TabEventKind, TabManager};
use crate::model::TabConfig;
use crate::store::mem_backend::MemBackend;
use crate::store::StorageBackend;

/// A manager over an in-memory backend the test can inspect, reload from, or
/// make fail.
pub struct ManagerFixture {
    pub manager: TabManager,
    pub backend: Rc<MemBackend>,
    pub config: TabManagerConfig,
}

impl Default for ManagerFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerFixture {
    pub fn new() -> Self {
        Self::with_config(TabManagerConfig::default())
    }

    pub fn with_config(config: TabManagerConfig) -> Self {
        let backend = Rc::new(MemBackend::new());
        let manager = TabManager::with_backend(config.clone(), backend.clone());
        Self {
            manager,
            backend,
            config,
        }
    }

    /// Adds `count` tabs titled `Tab 1..=count` at `/tab/1..=count`.
    pub fn with_tabs(self, count: usize) -> Self {
        for i in 0..count {
            let config = TabConfig::new(format!("Tab {}", i + 1), format!("/tab/{}", i + 1));
            self.manager.add_tab(&config).expect("fixture tab rejected");
        }
        self
    }

    pub fn with_pinned_tab(self, title: &str) -> Self {
        let config = TabConfig::new(title, format!("/pinned/{}", title.to_lowercase())).pinned();
        self.manager.add_tab(&config).expect("fixture tab rejected");
        self
    }

    /// A second manager over the same backend and config, as after a restart.
    pub fn reload(&self) -> TabManager {
        let backend: Rc<dyn StorageBackend> = self.backend.clone();
        TabManager::with_backend(self.config.clone(), backend)
    }
}

/// Records every event the manager publishes, in order.
pub fn collect_events(manager: &TabManager) -> Rc<RefCell<Vec<TabEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in TabEventKind::ALL {
        let sink = events.clone();
        manager.on(kind, move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
    }
    events
}
