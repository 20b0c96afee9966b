//! Error types for fragweb-dom

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Selector syntax error in '{selector}': {message}")]
    SelectorSyntax { selector: String, message: String },
}

/// Result type with DomError
pub type DomResult<T> = Result<T, DomError>;
