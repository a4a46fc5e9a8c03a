//! Error types for the prefab registry.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefabError {
    #[error("Invalid display name: {0:?}")]
    InvalidDisplayName(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// The originating call site could not be determined. Retrying cannot fix this.
    #[error("Call site could not be resolved: {0}")]
    CallSiteUnresolved(String),

    #[error("Object already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid identity token: {0}")]
    InvalidToken(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type used throughout the registry.
pub type Result<T> = std::result::Result<T, PrefabError>;
