//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.
//!
//! Every variant is fatal for a run. Content conflicts found while reconciling
//! are not errors; they are reported as [`crate::context::Diagnostic`]s.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors (unreadable input, unwritable output).
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Malformed JSON in the input document or a registry file.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// Input that is valid JSON but not the expected shape.
    #[from(ignore)]
    #[display("Invalid Input: {_0}")]
    InvalidInput(String),

    /// A shared schema or parameter was requested that the catalog does not define.
    #[from(ignore)]
    #[display("Unknown Component: {_0}")]
    UnknownComponent(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
