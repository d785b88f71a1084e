//! # Groups
//!
//! Named, optionally colored sets of tabs. A tab belongs to at most one
//! group; adding it to another group moves it. Groups reference tabs by id,
//! so [`GroupManager::prune`] drops ids of tabs that have since closed.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::{Result, TabError};
use crate::helpers;
use crate::manager::TabManager;
use crate::model::TabId;
use crate::store::TabStorage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub tab_ids: Vec<TabId>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

fn require_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TabError::InvalidInput("group name is required".to_string()));
    }
    Ok(name.to_string())
}

fn not_found(id: &str) -> TabError {
    TabError::NotFound {
        kind: "group",
        id: id.to_string(),
    }
}

pub struct GroupManager {
    storage: TabStorage,
    persist: bool,
    groups: RefCell<Vec<TabGroup>>,
}

impl GroupManager {
    pub fn new(storage: TabStorage, persist: bool) -> Self {
        let groups = if persist {
            storage.load_groups()
        } else {
            Vec::new()
        };
        Self {
            storage,
            persist,
            groups: RefCell::new(groups),
        }
    }

    pub fn for_manager(manager: &TabManager) -> Self {
        Self::new(manager.storage().clone(), manager.config().persist)
    }

    fn persist(&self) {
        if !self.persist {
            return;
        }
        if let Err(err) = self.storage.save_groups(&self.groups.borrow()) {
            tracing::warn!("failed to persist groups: {}", err);
        }
    }

    /// Applies `f` to the group with `id` and persists. False when there is
    /// no such group.
    fn modify<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut TabGroup),
    {
        let found = {
            let mut groups = self.groups.borrow_mut();
            match groups.iter_mut().find(|g| g.id == id) {
                Some(group) => {
                    f(group);
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        found
    }

    pub fn create_group(&self, name: &str, color: Option<&str>) -> Result<TabGroup> {
        let group = TabGroup {
            id: helpers::generate_id(),
            name: require_name(name)?,
            color: color.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
            tab_ids: Vec::new(),
            collapsed: false,
            created_at: helpers::now(),
        };
        self.groups.borrow_mut().push(group.clone());
        self.persist();
        Ok(group)
    }

    pub fn rename_group(&self, id: &str, name: &str) -> Result<()> {
        let name = require_name(name)?;
        if self.modify(id, |group| group.name = name) {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub fn set_group_color(&self, id: &str, color: Option<&str>) -> bool {
        let color = color.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
        self.modify(id, |group| group.color = color)
    }

    /// Deletes the group. Its tabs stay open.
    pub fn delete_group(&self, id: &str) -> bool {
        let removed = {
            let mut groups = self.groups.borrow_mut();
            let before = groups.len();
            groups.retain(|g| g.id != id);
            groups.len() != before
        };
        if removed {
            self.persist();
        }
        removed
    }

    /// Flips the collapsed flag, returning the new value.
    pub fn toggle_collapsed(&self, id: &str) -> Option<bool> {
        let mut collapsed = None;
        self.modify(id, |group| {
            group.collapsed = !group.collapsed;
            collapsed = Some(group.collapsed);
        });
        collapsed
    }

    /// Puts an open tab in the group, taking it out of any other group.
    pub fn add_tab_to_group(&self, manager: &TabManager, group_id: &str, tab_id: &TabId) -> Result<()> {
        if manager.get_tab_index(tab_id).is_none() {
            return Err(TabError::TabNotFound(tab_id.clone()));
        }
        {
            let mut groups = self.groups.borrow_mut();
            if !groups.iter().any(|g| g.id == group_id) {
                return Err(not_found(group_id));
            }
            for group in groups.iter_mut() {
                if group.id == group_id {
                    if !group.tab_ids.contains(tab_id) {
                        group.tab_ids.push(tab_id.clone());
                    }
                } else {
                    group.tab_ids.retain(|id| id != tab_id);
                }
            }
        }
        self.persist();
        Ok(())
    }

    pub fn remove_tab_from_group(&self, group_id: &str, tab_id: &TabId) -> bool {
        let removed = {
            let mut groups = self.groups.borrow_mut();
            match groups.iter_mut().find(|g| g.id == group_id) {
                Some(group) => {
                    let before = group.tab_ids.len();
                    group.tab_ids.retain(|id| id != tab_id);
                    group.tab_ids.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.persist();
        }
        removed
    }

    pub fn group_for_tab(&self, tab_id: &TabId) -> Option<TabGroup> {
        self.groups
            .borrow()
            .iter()
            .find(|g| g.tab_ids.contains(tab_id))
            .cloned()
    }

    pub fn get_group(&self, id: &str) -> Option<TabGroup> {
        self.groups.borrow().iter().find(|g| g.id == id).cloned()
    }

    pub fn get_all_groups(&self) -> Vec<TabGroup> {
        self.groups.borrow().clone()
    }

    /// Drops ids of tabs the manager no longer holds. Returns how many were
    /// dropped.
    pub fn prune(&self, manager: &TabManager) -> usize {
        let dropped = {
            let mut groups = self.groups.borrow_mut();
            let mut dropped = 0;
            for group in groups.iter_mut() {
                let before = group.tab_ids.len();
                group
                    .tab_ids
                    .retain(|id| manager.get_tab_index(id).is_some());
                dropped += before - group.tab_ids.len();
            }
            dropped
        };
        if dropped > 0 {
            tracing::debug!("pruned {} closed tabs from groups", dropped);
            self.persist();
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TabManagerConfig;
    use crate::model::TabConfig;

    fn setup() -> (TabManager, GroupManager, Vec<TabId>) {
        let manager = TabManager::new(TabManagerConfig::default());
        let ids = (0..3)
            .map(|n| {
                manager
                    .add_tab(&TabConfig::new(format!("T{}", n), format!("/{}", n)))
                    .unwrap()
                    .id
            })
            .collect();
        let groups = GroupManager::for_manager(&manager);
        (manager, groups, ids)
    }

    #[test]
    fn test_create_rename_color() {
        let (_, groups, _) = setup();
        let group = groups.create_group(" Work ", Some("blue")).unwrap();
        assert_eq!(group.name, "Work");
        assert_eq!(group.color.as_deref(), Some("blue"));
        assert!(matches!(
            groups.create_group("", None),
            Err(TabError::InvalidInput(_))
        ));

        groups.rename_group(&group.id, "Play").unwrap();
        assert!(groups.set_group_color(&group.id, None));
        let group = groups.get_group(&group.id).unwrap();
        assert_eq!(group.name, "Play");
        assert!(group.color.is_none());
        assert!(matches!(
            groups.rename_group("missing", "x"),
            Err(TabError::NotFound { .. })
        ));
    }

    #[test]
    fn test_tab_belongs_to_one_group() {
        let (manager, groups, ids) = setup();
        let a = groups.create_group("A", None).unwrap();
        let b = groups.create_group("B", None).unwrap();

        groups.add_tab_to_group(&manager, &a.id, &ids[0]).unwrap();
        groups.add_tab_to_group(&manager, &a.id, &ids[0]).unwrap();
        assert_eq!(groups.get_group(&a.id).unwrap().tab_ids.len(), 1);

        groups.add_tab_to_group(&manager, &b.id, &ids[0]).unwrap();
        assert!(groups.get_group(&a.id).unwrap().tab_ids.is_empty());
        assert_eq!(groups.group_for_tab(&ids[0]).unwrap().id, b.id);

        assert!(matches!(
            groups.add_tab_to_group(&manager, &b.id, &TabId::from("nope")),
            Err(TabError::TabNotFound(_))
        ));
        assert!(matches!(
            groups.add_tab_to_group(&manager, "nope", &ids[1]),
            Err(TabError::NotFound { .. })
        ));

        assert!(groups.remove_tab_from_group(&b.id, &ids[0]));
        assert!(!groups.remove_tab_from_group(&b.id, &ids[0]));
        assert!(groups.group_for_tab(&ids[0]).is_none());
    }

    #[test]
    fn test_collapse_delete_prune() {
        let (manager, groups, ids) = setup();
        let group = groups.create_group("G", None).unwrap();
        assert_eq!(groups.toggle_collapsed(&group.id), Some(true));
        assert_eq!(groups.toggle_collapsed(&group.id), Some(false));
        assert_eq!(groups.toggle_collapsed("missing"), None);

        groups.add_tab_to_group(&manager, &group.id, &ids[0]).unwrap();
        groups.add_tab_to_group(&manager, &group.id, &ids[1]).unwrap();
        assert!(manager.remove_tab(&ids[0]));
        assert_eq!(groups.prune(&manager), 1);
        assert_eq!(groups.get_group(&group.id).unwrap().tab_ids, vec![ids[1].clone()]);

        assert!(groups.delete_group(&group.id));
        assert!(!groups.delete_group(&group.id));
        assert_eq!(manager.get_tabs_count(), 2);
    }

    #[test]
    fn test_groups_persist() {
        let (manager, groups, ids) = setup();
        let group = groups.create_group("Kept", Some("red")).unwrap();
        groups.add_tab_to_group(&manager, &group.id, &ids[2]).unwrap();

        let reloaded = GroupManager::for_manager(&manager);
        assert_eq!(reloaded.get_all_groups(), groups.get_all_groups());
    }
}
