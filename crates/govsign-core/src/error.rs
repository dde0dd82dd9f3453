//! # Error Types
//!
//! Errors raised while constructing core values. Everything here is an
//! input error: a bad filename, a digest of the wrong length, a timestamp
//! that is not UTC.

use thiserror::Error;

/// Errors from constructing or parsing core values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The document filename cannot be stored at the root of a container.
    #[error("invalid document name {name:?}: {reason}")]
    InvalidDocumentName {
        /// The rejected filename.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The declared MIME type is not of the form `type/subtype`.
    #[error("invalid media type: {0:?}")]
    InvalidMediaType(String),

    /// A digest value has the wrong length for its algorithm.
    #[error("{algorithm} digest must be {expected} bytes, got {actual}")]
    DigestLength {
        /// Algorithm name.
        algorithm: &'static str,
        /// Expected output length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Unknown digest algorithm name or object identifier.
    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    /// Hex decoding failed.
    #[error("hex decode error: {0}")]
    Hex(String),

    /// Timestamp parsing failed or was not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_length_display() {
        let err = CoreError::DigestLength {
            algorithm: "sha256",
            expected: 32,
            actual: 31,
        };
        let msg = err.to_string();
        assert!(msg.contains("sha256"));
        assert!(msg.contains("32"));
        assert!(msg.contains("31"));
    }

    #[test]
    fn invalid_document_name_display() {
        let err = CoreError::InvalidDocumentName {
            name: "META-INF/x".to_string(),
            reason: "reserved prefix".to_string(),
        };
        assert!(err.to_string().contains("reserved prefix"));
    }
}
