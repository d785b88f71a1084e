//! # Templates
//!
//! A template is a named, reusable list of tab configs. Templates are owned
//! by [`TemplateManager`] and persisted in the templates domain; they hold
//! copies of tab fields and never refer to live tabs.
//!
//! Applying a template goes through [`TabManager::add_tab`], so it is subject
//! to the same validation, duplicate detection and capacity limit as any
//! other add.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::{Result, TabError};
use crate::events::{Event, EventBus};
use crate::helpers;
use crate::manager::TabManager;
use crate::model::TabConfig;
use crate::store::TabStorage;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tabs: Vec<TabConfig>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tabs: Option<Vec<TabConfig>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateEventKind {
    Created,
    Updated,
    Deleted,
    Applied,
    Imported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateEvent {
    Created { template: TabTemplate },
    Updated { template: TabTemplate },
    Deleted { template: TabTemplate },
    Applied { template: TabTemplate, opened: usize },
    Imported { template: TabTemplate },
}

impl Event for TemplateEvent {
    type Kind = TemplateEventKind;

    fn kind(&self) -> TemplateEventKind {
        match self {
            TemplateEvent::Created { .. } => TemplateEventKind::Created,
            TemplateEvent::Updated { .. } => TemplateEventKind::Updated,
            TemplateEvent::Deleted { .. } => TemplateEventKind::Deleted,
            TemplateEvent::Applied { .. } => TemplateEventKind::Applied,
            TemplateEvent::Imported { .. } => TemplateEventKind::Imported,
        }
    }
}

fn require_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TabError::Template("template name is required".to_string()));
    }
    Ok(name.to_string())
}

/// Validates and sanitizes every config; the first invalid one fails the
/// whole list.
fn clean_configs(configs: &[TabConfig]) -> Result<Vec<TabConfig>> {
    configs
        .iter()
        .map(|config| {
            let result = validation::validate(config);
            if !result.valid {
                return Err(TabError::Validation(result.errors));
            }
            let mut config = validation::sanitize(config);
            config.id = None;
            Ok(config)
        })
        .collect()
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

pub struct TemplateManager {
    storage: TabStorage,
    persist: bool,
    templates: RefCell<Vec<TabTemplate>>,
    bus: EventBus<TemplateEvent>,
}

impl TemplateManager {
    pub fn new(storage: TabStorage, persist: bool) -> Self {
        let templates = if persist {
            storage.load_templates()
        } else {
            Vec::new()
        };
        Self {
            storage,
            persist,
            templates: RefCell::new(templates),
            bus: EventBus::new(),
        }
    }

    /// Shares the manager's storage namespace and persistence setting.
    pub fn for_manager(manager: &TabManager) -> Self {
        Self::new(manager.storage().clone(), manager.config().persist)
    }

    pub fn events(&self) -> &EventBus<TemplateEvent> {
        &self.bus
    }

    fn persist(&self) {
        if !self.persist {
            return;
        }
        if let Err(err) = self.storage.save_templates(&self.templates.borrow()) {
            tracing::warn!("failed to persist templates: {}", err);
        }
    }

    fn insert(&self, template: TabTemplate) {
        self.templates.borrow_mut().push(template);
        self.persist();
    }

    /// Captures the manager's current tabs, in order, as a new template.
    pub fn save_as_template(
        &self,
        manager: &TabManager,
        name: &str,
        description: Option<&str>,
    ) -> Result<TabTemplate> {
        let configs: Vec<TabConfig> = manager
            .get_all_tabs()
            .iter()
            .map(|tab| tab.to_config())
            .collect();
        self.create_template(name, description, &configs)
    }

    pub fn create_template(
        &self,
        name: &str,
        description: Option<&str>,
        configs: &[TabConfig],
    ) -> Result<TabTemplate> {
        let now = helpers::now();
        let template = TabTemplate {
            id: helpers::generate_id(),
            name: require_name(name)?,
            description: clean_description(description),
            tabs: clean_configs(configs)?,
            created_at: now,
            updated_at: now,
        };

        self.insert(template.clone());
        tracing::debug!("created template {} ({} tabs)", template.name, template.tabs.len());
        self.bus.publish(&TemplateEvent::Created {
            template: template.clone(),
        });
        Ok(template)
    }

    pub fn update_template(&self, id: &str, update: &TemplateUpdate) -> Result<TabTemplate> {
        let name = update.name.as_deref().map(require_name).transpose()?;
        let tabs = update.tabs.as_deref().map(clean_configs).transpose()?;

        let template = {
            let mut templates = self.templates.borrow_mut();
            let template = templates
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| TabError::NotFound {
                    kind: "template",
                    id: id.to_string(),
                })?;
            if let Some(name) = name {
                template.name = name;
            }
            if let Some(description) = &update.description {
                template.description = clean_description(Some(description));
            }
            if let Some(tabs) = tabs {
                template.tabs = tabs;
            }
            template.updated_at = helpers::now();
            template.clone()
        };

        self.persist();
        self.bus.publish(&TemplateEvent::Updated {
            template: template.clone(),
        });
        Ok(template)
    }

    pub fn delete_template(&self, id: &str) -> bool {
        let removed = {
            let mut templates = self.templates.borrow_mut();
            match templates.iter().position(|t| t.id == id) {
                Some(index) => templates.remove(index),
                None => return false,
            }
        };
        self.persist();
        self.bus.publish(&TemplateEvent::Deleted { template: removed });
        true
    }

    pub fn get_template(&self, id: &str) -> Option<TabTemplate> {
        self.templates.borrow().iter().find(|t| t.id == id).cloned()
    }

    pub fn get_all_templates(&self) -> Vec<TabTemplate> {
        self.templates.borrow().clone()
    }

    /// Opens the template's tabs in `manager`, optionally closing what can be
    /// closed first. Returns how many tabs the manager accepted.
    pub fn load_template(
        &self,
        manager: &TabManager,
        id: &str,
        clear_existing: bool,
    ) -> Result<usize> {
        let template = self.get_template(id).ok_or_else(|| TabError::NotFound {
            kind: "template",
            id: id.to_string(),
        })?;

        if clear_existing {
            manager.close_all_tabs();
        }

        let opened = template
            .tabs
            .iter()
            .filter(|config| manager.add_tab(config).is_some())
            .count();
        if opened < template.tabs.len() {
            tracing::debug!(
                "template {} opened {} of {} tabs",
                template.name,
                opened,
                template.tabs.len()
            );
        }

        self.bus.publish(&TemplateEvent::Applied { template, opened });
        Ok(opened)
    }

    pub fn export_template(&self, id: &str) -> Result<String> {
        let template = self.get_template(id).ok_or_else(|| TabError::NotFound {
            kind: "template",
            id: id.to_string(),
        })?;
        Ok(serde_json::to_string_pretty(&template)?)
    }

    /// Imports a template from JSON. The import always gets a fresh id and
    /// timestamps, so it never collides with its source.
    pub fn import_template(&self, json: &str) -> Result<TabTemplate> {
        let mut template: TabTemplate = serde_json::from_str(json)?;
        let now = helpers::now();
        template.id = helpers::generate_id();
        template.name = require_name(&template.name)?;
        template.tabs = clean_configs(&template.tabs)?;
        template.created_at = now;
        template.updated_at = now;

        self.insert(template.clone());
        self.bus.publish(&TemplateEvent::Imported {
            template: template.clone(),
        });
        Ok(template)
    }
}
