use std::cell::RefCell;
use std::rc::Rc;

use tabstrip::config::TabManagerConfig;
use tabstrip::events::Event;
use tabstrip::features::search::{highlight_text, SearchEngine, SearchField, SearchOptions};
use tabstrip::manager::{TabEvent, TabEventKind, TabManager, HISTORY_CAPACITY};
use tabstrip::model::{TabConfig, TabId};
use tabstrip::store::TabStorage;

fn config(max_tabs: usize) -> TabManagerConfig {
    TabManagerConfig {
        max_tabs,
        ..Default::default()
    }
}

fn open(manager: &TabManager, n: usize) -> TabId {
    manager
        .add_tab(&TabConfig::new(format!("Tab {}", n), format!("/tab/{}", n)))
        .unwrap()
        .id
}

fn assert_invariants(manager: &TabManager) {
    let tabs = manager.get_all_tabs();
    let pinned = tabs.iter().take_while(|t| t.pinned).count();
    assert!(tabs[pinned..].iter().all(|t| !t.pinned), "pinned prefix broken");
    if let Some(active) = manager.get_active_tab_id() {
        assert!(tabs.iter().any(|t| t.id == active), "dangling active id");
    }
}

#[test]
fn test_invariants_hold_across_operations() {
    let manager = TabManager::new(config(10));
    let ids: Vec<_> = (0..6).map(|n| open(&manager, n)).collect();
    assert_invariants(&manager);

    manager.pin_tab(&ids[4]);
    manager.pin_tab(&ids[1]);
    assert_invariants(&manager);
    manager.reorder_tabs(3, 5);
    manager.unpin_tab(&ids[4]);
    assert_invariants(&manager);
    manager.close_tabs_to_right(&ids[1]);
    assert_invariants(&manager);
    manager.close_all_tabs();
    assert_invariants(&manager);
    manager.reopen_last_closed_tab();
    assert_invariants(&manager);
}

#[test]
fn test_add_is_idempotent_by_path() {
    let manager = TabManager::new(config(10));
    let first = manager.add_tab(&TabConfig::new("A", "/a")).unwrap();
    let second = manager.add_tab(&TabConfig::new("A", "/a")).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(manager.get_tabs_count(), 1);
}

#[test]
fn test_save_then_load_round_trips() {
    let storage = TabStorage::in_memory("roundtrip");
    let manager = TabManager::new(config(10));
    let a = open(&manager, 1);
    open(&manager, 2);
    manager.pin_tab(&a);

    let tabs = manager.get_all_tabs();
    let active = manager.get_active_tab_id();
    storage.save_tabs(&tabs, active.as_ref()).unwrap();

    let record = storage.load_tabs().unwrap();
    assert_eq!(record.tabs, tabs);
    assert_eq!(record.active_tab_id, active);
}

#[test]
fn test_capacity_fires_limit_once() {
    let manager = TabManager::new(config(3));
    let limits = Rc::new(RefCell::new(Vec::<TabEvent>::new()));
    let sink = limits.clone();
    manager.on(TabEventKind::LimitReached, move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });

    for n in 0..3 {
        open(&manager, n);
    }
    assert!(manager
        .add_tab(&TabConfig::new("Overflow", "/overflow"))
        .is_none());
    assert_eq!(manager.get_tabs_count(), 3);
    assert_eq!(limits.borrow().len(), 1);
    assert_eq!(limits.borrow()[0].kind(), TabEventKind::LimitReached);
}

#[test]
fn test_active_tab_is_protected() {
    let manager = TabManager::new(config(10));
    open(&manager, 1);
    open(&manager, 2);
    let active = manager.get_active_tab_id().unwrap();
    assert!(!manager.remove_tab(&active));
    assert_eq!(manager.get_tabs_count(), 2);
}

#[test]
fn test_close_all_without_active_empties_collection() {
    let manager = TabManager::new(TabManagerConfig {
        auto_activate: false,
        ..Default::default()
    });
    for n in 0..4 {
        open(&manager, n);
    }
    assert!(manager.get_active_tab_id().is_none());
    assert_eq!(manager.close_all_tabs(), 4);
    assert_eq!(manager.get_tabs_count(), 0);
}

#[test]
fn test_pinned_tab_cannot_leave_prefix() {
    let manager = TabManager::new(config(10));
    let ids: Vec<_> = (0..4).map(|n| open(&manager, n)).collect();
    manager.pin_tab(&ids[0]);
    manager.pin_tab(&ids[1]);
    let before = manager.get_all_tabs();

    for to in 2..4 {
        assert!(!manager.reorder_tabs(0, to));
        assert!(!manager.reorder_tabs(1, to));
    }
    assert_eq!(manager.get_all_tabs(), before);
}

#[test]
fn test_history_keeps_newest_twenty() {
    let manager = TabManager::new(config(30));
    let ids: Vec<_> = (0..26).map(|n| open(&manager, n)).collect();
    // Tab 25 is active; close the other 25 one by one.
    for id in &ids[..25] {
        assert!(manager.remove_tab(id));
    }

    let history = manager.get_closed_history();
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert_eq!(history[0].tab.id, ids[24]);
    assert_eq!(history[HISTORY_CAPACITY - 1].tab.id, ids[5]);
}

#[test]
fn test_search_and_highlight_scenario() {
    let manager = TabManager::new(config(10));
    manager
        .add_tab(&TabConfig::new("用户管理", "/admin/users"))
        .unwrap();
    manager
        .add_tab(&TabConfig::new("系统设置", "/admin/settings"))
        .unwrap();

    let engine = SearchEngine::new();
    let results = engine.search(&manager, "用户", &SearchOptions::default());
    assert_eq!(results.len(), 1);
    assert!(results[0].score > 0.0);
    assert!(results[0].matched_fields.contains(&SearchField::Title));

    assert!(engine.search(&manager, "", &SearchOptions::default()).is_empty());
    assert_eq!(engine.search_history().len(), 1);

    assert!(highlight_text("用户管理系统", "用户").contains("<mark>用户</mark>"));
    assert_eq!(highlight_text("系统设置", "用户"), "系统设置");
}
