use thiserror::Error;

use crate::model::TabId;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid tab config: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, TabError>;
