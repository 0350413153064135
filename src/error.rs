//! Central error types for jpragma.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic
//! `Display` and `From` implementations.
//!
//! The taxonomy separates faults that are fatal for a compilation unit
//! (`Parse`, `InternalInconsistency`, `UnsupportedConstruct`,
//! `InvalidDirective`) from `NameNotResolvable`, which is raised during
//! identifier classification and always recovered inside the translation
//! visitor: an unresolvable name is a type name, a package segment, or a
//! symbol inherited from outside the unit, and its tokens are left alone.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum JpError {
    /// IO operation failed (without path context - prefer IoWithPath when path is available)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO operation failed with path context for better error messages
    #[error("IO error at {path}: {error}")]
    IoWithPath {
        error: std::io::Error,
        path: PathBuf,
    },

    /// The unit could not be parsed, or the syntax tree disagrees with the
    /// class map built from it. Fatal for the current unit.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An identifier does not denote a capturable variable. Internal to
    /// name resolution; recovered by the visitor, never crosses the API.
    #[error("name not resolvable: {0}")]
    NameNotResolvable(String),

    /// Overlapping edits, class-stack underflow, or a subtree shape the
    /// grammar asserts cannot occur. Fatal for the current unit.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// A well-formed host-language construct the translator has no case
    /// for inside a region (e.g. a lambda body). Fatal for the unit.
    #[error("unsupported construct at line {line}: {what}")]
    UnsupportedConstruct { line: usize, what: String },

    /// A malformed pragma clause or an illegal directive nesting.
    #[error("invalid directive at line {line}: {message}")]
    InvalidDirective { line: usize, message: String },
}

/// Convenience type alias for Results using JpError.
pub type Result<T> = std::result::Result<T, JpError>;

impl JpError {
    /// Create an IO error with path context.
    ///
    /// Use this when reading/writing files to provide actionable error
    /// messages that include the file path that failed.
    #[inline]
    pub fn io_with_path(error: std::io::Error, path: impl AsRef<Path>) -> Self {
        JpError::IoWithPath {
            error,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a parse error anchored at a 1-based source line.
    #[inline]
    pub fn parse_at(line: usize, message: impl Into<String>) -> Self {
        JpError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an internal-inconsistency fault.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        JpError::InternalInconsistency(message.into())
    }

    /// Create an invalid-directive error anchored at a 1-based source line.
    #[inline]
    pub fn directive_at(line: usize, message: impl Into<String>) -> Self {
        JpError::InvalidDirective {
            line,
            message: message.into(),
        }
    }

    /// Whether this error aborts translation of the current unit.
    ///
    /// `NameNotResolvable` is the only non-fatal variant; everything else
    /// makes the unit's output unusable.
    pub fn is_unit_fatal(&self) -> bool {
        !matches!(self, JpError::NameNotResolvable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let err = JpError::parse_at(12, "unbalanced braces");
        assert_eq!(err.to_string(), "parse error at line 12: unbalanced braces");

        let err = JpError::UnsupportedConstruct {
            line: 3,
            what: "lambda expression".to_string(),
        };
        assert!(err.to_string().contains("line 3"));
        assert!(err.to_string().contains("lambda expression"));
    }

    #[test]
    fn test_fatality_partition() {
        assert!(!JpError::NameNotResolvable("x".into()).is_unit_fatal());
        assert!(JpError::internal("edit overlap").is_unit_fatal());
        assert!(JpError::directive_at(1, "orphan section").is_unit_fatal());
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = JpError::io_with_path(io, "/tmp/Main.java");
        assert!(err.to_string().contains("/tmp/Main.java"));
    }
}
