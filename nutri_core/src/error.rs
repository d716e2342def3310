//! Error types for the nutri_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nutri_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before reaching a calculator or the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Actor is not allowed to perform the mutation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness violation (food name, username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record is still referenced and cannot be deleted
    #[error("In use: {0}")]
    InUse(String),

    /// User must finish onboarding first
    #[error("Profile incomplete: {0}")]
    ProfileIncomplete(String),
}
