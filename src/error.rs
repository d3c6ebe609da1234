//! Error types for the range engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Sample source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Label resolution error
    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience result alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a sample source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source was used after `close`
    #[error("Source already closed")]
    Closed,

    /// The underlying reader failed
    #[error("Read failed: {0}")]
    Read(String),
}

/// Errors produced while resolving a fingerprint into labels
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// The fingerprint string is not valid label syntax
    #[error("Invalid fingerprint {fingerprint:?}: {reason}")]
    InvalidFingerprint {
        /// The offending fingerprint
        fingerprint: String,
        /// What made it invalid
        reason: String,
    },

    /// The same label name appeared twice
    #[error("Duplicate label {name:?} in fingerprint")]
    DuplicateLabel {
        /// The duplicated label name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(SourceError::Closed);
        assert_eq!(err.to_string(), "Source error: Source already closed");

        let err = Error::from(LabelError::DuplicateLabel {
            name: "job".to_string(),
        });
        assert!(err.to_string().contains("Duplicate label"));
    }

    #[test]
    fn test_label_error_carries_fingerprint() {
        let err = LabelError::InvalidFingerprint {
            fingerprint: "garbage".to_string(),
            reason: "missing braces".to_string(),
        };
        assert!(err.to_string().contains("garbage"));
        assert!(err.to_string().contains("missing braces"));
    }
}
