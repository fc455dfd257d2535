//! Error types for parser construction and typed extraction
//!
//! Parsing a token list never fails. Errors only surface when a parser is
//! built with an unusable separator, or when a parsed mapping is deserialized
//! into a Rust type that does not fit it.

use std::fmt;
use thiserror::Error;

/// Main error type for key-value parsing operations
#[derive(Debug, Error)]
pub enum KvError {
    /// The separator pattern could not be compiled
    #[error("Invalid separator pattern '{pattern}': {source}")]
    InvalidSeparator {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The separator matches the empty string and would split between every character
    #[error("Separator '{pattern}' matches the empty string")]
    EmptySeparator { pattern: String },

    /// Serde deserialization error
    #[error("Deserialize error: {0}")]
    Deserialize(String),
}

impl KvError {
    /// Returns true if this error was raised while building a parser
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            KvError::InvalidSeparator { .. } | KvError::EmptySeparator { .. }
        )
    }
}

impl serde::de::Error for KvError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        KvError::Deserialize(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;

    #[test]
    fn test_invalid_separator_display() {
        let source = regex::Regex::new("[").unwrap_err();
        let error = KvError::InvalidSeparator {
            pattern: "[".to_string(),
            source,
        };

        let message = error.to_string();
        assert!(message.starts_with("Invalid separator pattern '['"));
        assert!(error.is_config_error());
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_empty_separator_display() {
        let error = KvError::EmptySeparator {
            pattern: "\\s*".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Separator '\\s*' matches the empty string"
        );
        assert!(error.is_config_error());
    }

    #[test]
    fn test_custom_deserialize_error() {
        let error = KvError::custom("expected u16");
        assert_eq!(error.to_string(), "Deserialize error: expected u16");
        assert!(!error.is_config_error());
    }
}
