//! Template engine error types

use thiserror::Error;

/// Template errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Template not found
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template rendering error
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Embedded template is not valid UTF-8
    #[error("Invalid template encoding: {0}")]
    InvalidEncoding(String),
}
