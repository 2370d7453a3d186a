//! Error types for boardshelf.
//!
//! Library crates use [`BoardshelfError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all boardshelf operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardshelfError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a rulebook.
    #[error("network error: {0}")]
    Network(String),

    /// Rulebook parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Content generation error (bridge, backend, or response decoding).
    #[error("generation error: {0}")]
    Generation(String),

    /// Taxonomy classification error.
    #[error("classification error: {0}")]
    Classification(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Request or data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A catalog entry or family does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A family batch is already running for this family.
    #[error("family {0} is already being processed")]
    Locked(String),

    /// HTML-to-text conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BoardshelfError>;

impl BoardshelfError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a not-found error for the given record kind.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BoardshelfError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = BoardshelfError::validation("entity_id must not be empty");
        assert!(err.to_string().contains("entity_id"));
    }

    #[test]
    fn not_found_names_the_record_kind() {
        let err = BoardshelfError::not_found("family", "fam-1");
        assert_eq!(err.to_string(), "family not found: fam-1");

        let err = BoardshelfError::Locked("fam-1".into());
        assert_eq!(err.to_string(), "family fam-1 is already being processed");
    }
}
