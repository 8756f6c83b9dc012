//! Error types for LearnPortal Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The session does not carry enough identity to build a tenant context.
    #[error("Tenant context not found in session: missing {0}")]
    MissingSessionData(String),

    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
