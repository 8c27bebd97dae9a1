/// Error types for palette-recall
///
/// This module defines all possible errors that can occur in the application.
/// Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Main error type for palette-recall operations
#[derive(Error, Debug)]
pub enum PaletteError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A candidate source failed while the palette was collecting commands
    #[error("Aggregation failed: {0}")]
    AggregationFailed(String),

    /// Command id is not known to any source
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// The command ran and reported an error
    #[error("Command '{label}' resulted in an error: {message}")]
    CommandFailed { label: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for palette-recall operations
pub type Result<T> = std::result::Result<T, PaletteError>;

/// Convert PaletteError to a user-friendly error message
impl PaletteError {
    pub fn user_message(&self) -> String {
        match self {
            PaletteError::Database(e) => {
                format!("Database error occurred. Please try again. Details: {}", e)
            }
            PaletteError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            PaletteError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            PaletteError::AggregationFailed(reason) => {
                format!("Could not collect commands: {}", reason)
            }
            PaletteError::CommandNotFound(id) => {
                format!("Command '{}' is not registered", id)
            }
            PaletteError::CommandFailed { label, message } => {
                format!("Command '{}' resulted in an error: {}", label, message)
            }
            PaletteError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
            PaletteError::Generic(msg) => msg.clone(),
        }
    }
}
