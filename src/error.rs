//! Custom error types for the scan engine.
//!
//! This module defines the primary error type, `ScanError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different failure classes of scan
//! construction and execution.
//!
//! ## Error Hierarchy
//!
//! `ScanError` is an enum that consolidates the failure classes:
//!
//! - **`Syntax`**: The flat argument list could not be partitioned or
//!   converted for the requested command — a non-axis first argument, a
//!   fixed-arity group with the wrong parameter count, or a duplicate axis.
//!   Carries the command's usage string and is always raised before any
//!   hardware interaction.
//! - **`MalformedRegion`**: A region descriptor element is neither a number
//!   nor a three-element numeric list. Raised during normalization, naming
//!   the offending value and its position.
//! - **`Config`**: Wraps errors from the `config` crate, typically file
//!   parsing or format issues in the settings file.
//! - **`Engine`**: A failure reported by the underlying scan engine or an
//!   axis, propagated to the caller only after position restoration has
//!   completed. An operator-requested halt is *not* an error and never
//!   appears here; it is reported through the scan outcome instead.
//! - **`Restore`**: One or more axes could not be driven back to their
//!   pre-scan positions. Aggregates per-axis messages so a partial
//!   restoration failure never hides the rest.
//!
//! By using `#[from]`, `ScanError` can be seamlessly created from underlying
//! error types, simplifying error handling throughout the crate with the
//! `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, ScanError>;

/// Failure classes of scan construction and execution.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The argument list does not fit the command's grammar.
    #[error("{message}\nUsage: {usage}")]
    Syntax {
        /// What was wrong with the argument list.
        message: String,
        /// The command's usage string, filled in by the command layer.
        usage: String,
    },

    /// A region descriptor element was neither a number nor a
    /// three-element numeric list.
    #[error("malformed region element at position {position}: {value}")]
    MalformedRegion {
        /// Display form of the offending value.
        value: String,
        /// Zero-based position of the element within its region tuple.
        position: usize,
    },

    /// Configuration error from the settings loader.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Failure from the scan engine or an axis, surfaced after cleanup.
    #[error("scan failed: {0:#}")]
    Engine(#[from] anyhow::Error),

    /// One or more axes could not be restored to their pre-scan positions.
    #[error("failed to restore {} axis position(s) after scan: {}", .0.len(), .0.join("; "))]
    Restore(Vec<String>),
}

impl ScanError {
    /// Builds a syntax error whose usage string is filled in later by the
    /// command layer (see [`ScanError::with_usage`]).
    pub fn syntax(message: impl Into<String>) -> Self {
        ScanError::Syntax {
            message: message.into(),
            usage: String::new(),
        }
    }

    /// Attaches the command's usage string to a syntax error that does not
    /// carry one yet. Other variants pass through unchanged.
    pub fn with_usage(self, usage: &str) -> Self {
        match self {
            ScanError::Syntax { message, usage: u } if u.is_empty() => ScanError::Syntax {
                message,
                usage: usage.to_string(),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_includes_usage() {
        let err = ScanError::syntax("first argument to scan command must be an axis")
            .with_usage("scan axis start stop step");
        let text = err.to_string();
        assert!(text.contains("must be an axis"));
        assert!(text.contains("Usage: scan axis start stop step"));
    }

    #[test]
    fn test_with_usage_does_not_overwrite() {
        let err = ScanError::syntax("bad").with_usage("first").with_usage("second");
        assert!(err.to_string().contains("first"));
        assert!(!err.to_string().contains("second"));
    }

    #[test]
    fn test_malformed_region_display() {
        let err = ScanError::MalformedRegion {
            value: "\"x\"".to_string(),
            position: 2,
        };
        assert_eq!(
            err.to_string(),
            "malformed region element at position 2: \"x\""
        );
    }

    #[test]
    fn test_restore_error_aggregates() {
        let err = ScanError::Restore(vec!["sx: timed out".into(), "sy: refused".into()]);
        let text = err.to_string();
        assert!(text.contains("2 axis position(s)"));
        assert!(text.contains("sx: timed out"));
        assert!(text.contains("sy: refused"));
    }
}
