//! # Configuration
//!
//! Tab manager configuration is managed by [`confique`], which handles layered
//! loading from TOML files, environment variables, and compiled defaults.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `TABSTRIP_MAX_TABS`, `TABSTRIP_PERSIST`, etc.
//! 2. **Config file**: a `tabstrip.toml` passed to [`TabManagerConfig::load`].
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! Code that builds a config in-process overrides fields with struct-update
//! syntax over [`Default`]:
//!
//! ```
//! use tabstrip::config::TabManagerConfig;
//!
//! let config = TabManagerConfig {
//!     max_tabs: 3,
//!     persist: false,
//!     ..Default::default()
//! };
//! assert!(config.auto_activate);
//! ```
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `max_tabs` | `10` | Cap on the number of open tabs |
//! | `persist` | `true` | Gates all storage I/O |
//! | `persist_key` | `"tabstrip"` | Storage namespace |
//! | `auto_activate` | `true` | Newly added tabs become active |
//! | `default_tabs` | none | Seed tabs used when nothing was restored |

use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::model::TabConfig;

pub const DEFAULT_MAX_TABS: usize = 10;
pub const DEFAULT_PERSIST_KEY: &str = "tabstrip";

/// Configuration for a [`TabManager`](crate::manager::TabManager).
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TabManagerConfig {
    /// Maximum number of tabs that may be open at once.
    #[config(default = 10, env = "TABSTRIP_MAX_TABS")]
    pub max_tabs: usize,

    /// Whether tab state is saved to and restored from storage.
    #[config(default = true, env = "TABSTRIP_PERSIST")]
    pub persist: bool,

    /// Namespace for every storage key.
    #[config(default = "tabstrip", env = "TABSTRIP_PERSIST_KEY")]
    pub persist_key: String,

    /// Activate tabs as soon as they are added.
    #[config(default = true, env = "TABSTRIP_AUTO_ACTIVATE")]
    pub auto_activate: bool,

    /// Tabs to open when nothing was restored from storage.
    pub default_tabs: Option<Vec<TabConfig>>,
}

impl Default for TabManagerConfig {
    fn default() -> Self {
        Self {
            max_tabs: DEFAULT_MAX_TABS,
            persist: true,
            persist_key: DEFAULT_PERSIST_KEY.to_string(),
            auto_activate: true,
            default_tabs: None,
        }
    }
}

impl TabManagerConfig {
    /// Loads configuration from the environment and a TOML file, falling back
    /// to compiled defaults. A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::builder().env().file(path.as_ref()).load()?;
        Ok(config)
    }

    /// Seed tabs, empty when none are configured.
    pub fn default_tabs(&self) -> &[TabConfig] {
        self.default_tabs.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TabManagerConfig::default();
        assert_eq!(config.max_tabs, 10);
        assert!(config.persist);
        assert_eq!(config.persist_key, "tabstrip");
        assert!(config.auto_activate);
        assert!(config.default_tabs().is_empty());
    }

    #[test]
    fn test_parse_from_toml() {
        let raw = r#"
            max_tabs = 4
            persist = false
            persist_key = "admin"
            auto_activate = false

            [[default_tabs]]
            title = "Home"
            path = "/"
            closable = false
        "#;
        let config: TabManagerConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.max_tabs, 4);
        assert!(!config.persist);
        assert_eq!(config.persist_key, "admin");
        assert_eq!(config.default_tabs().len(), 1);
        assert_eq!(config.default_tabs()[0].closable, Some(false));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TabManagerConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_tabs, TabManagerConfig::default().max_tabs);
        assert_eq!(config.persist_key, DEFAULT_PERSIST_KEY);
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabstrip.toml");
        std::fs::write(&path, "max_tabs = 25\n").unwrap();
        let config = TabManagerConfig::load(&path).unwrap();
        assert_eq!(config.max_tabs, 25);
        assert!(config.auto_activate);
    }
}
