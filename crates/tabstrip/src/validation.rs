//! Tab config validation and sanitizing.
//!
//! Rules:
//! - `title` and `path` are required and must not be blank
//! - `title` is at most [`MAX_TITLE_LEN`] characters
//! - `path` is at most [`MAX_PATH_LEN`] characters
//!
//! Lengths count Unicode scalar values, not bytes.

use thiserror::Error;

use crate::model::TabConfig;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_PATH_LEN: usize = 500;

/// Error type for tab config validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,

    #[error("path is required")]
    MissingPath,

    #[error("title is {len} characters, the limit is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("path is {len} characters, the limit is {max}")]
    PathTooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validates a tab config, collecting every problem rather than stopping at
/// the first.
///
/// # Examples
/// ```
/// use tabstrip::model::TabConfig;
/// use tabstrip::validation::validate;
///
/// assert!(validate(&TabConfig::new("Users", "/admin/users")).valid);
/// assert!(!validate(&TabConfig::new("", "/admin/users")).valid);
/// ```
pub fn validate(config: &TabConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.title.trim().is_empty() {
        errors.push(ValidationError::MissingTitle);
    } else {
        let len = config.title.chars().count();
        if len > MAX_TITLE_LEN {
            errors.push(ValidationError::TitleTooLong {
                len,
                max: MAX_TITLE_LEN,
            });
        }
    }

    if config.path.trim().is_empty() {
        errors.push(ValidationError::MissingPath);
    } else {
        let len = config.path.chars().count();
        if len > MAX_PATH_LEN {
            errors.push(ValidationError::PathTooLong {
                len,
                max: MAX_PATH_LEN,
            });
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

/// Normalizes a tab config: trims strings, drops blank icons, and resolves
/// `closable` (closable unless explicitly `false`).
pub fn sanitize(config: &TabConfig) -> TabConfig {
    TabConfig {
        id: config.id.clone(),
        title: config.title.trim().to_string(),
        path: config.path.trim().to_string(),
        icon: config
            .icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .map(str::to_string),
        pinned: config.pinned,
        closable: Some(config.closable != Some(false)),
        meta: config.meta.clone(),
    }
}
