//! Error types for the Time-Stamp Protocol codec and client.

use thiserror::Error;

use crate::asn1::Asn1Error;
use crate::response::PkiStatus;

/// Errors from building, sending, or decoding RFC 3161 messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The bytes are not a DER SEQUENCE, or the structure inside is wrong.
    #[error("malformed timestamp response: {0}")]
    MalformedTimestampResponse(String),

    /// The outer DER length disagrees with the number of bytes received.
    #[error("truncated timestamp response: declared {declared} bytes, received {received}")]
    TruncatedResponse { declared: usize, received: usize },

    /// The TSA answered with a non-granting PKIStatus.
    #[error("timestamp request rejected with status {status}: {text}")]
    Rejected { status: PkiStatus, text: String },

    /// The request could not be built or parsed.
    #[error("invalid timestamp request: {0}")]
    InvalidRequest(String),

    /// The connection failed or broke before a full reply arrived.
    #[error("TSA transport error at {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The TSA answered with a non-success HTTP status.
    #[error("TSA at {endpoint} answered HTTP {status}")]
    HttpStatus { endpoint: String, status: u16 },

    /// The TSA did not answer within the configured timeout.
    #[error("TSA request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl TimestampError {
    /// Transient failures a caller may retry with the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport { .. })
    }
}

impl From<Asn1Error> for TimestampError {
    fn from(err: Asn1Error) -> Self {
        Self::MalformedTimestampResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TimestampError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(TimestampError::Transport {
            endpoint: "http://tsa".to_string(),
            reason: "connection refused".to_string()
        }
        .is_retryable());
        assert!(!TimestampError::HttpStatus {
            endpoint: "http://tsa".to_string(),
            status: 503
        }
        .is_retryable());
        assert!(!TimestampError::MalformedTimestampResponse("x".to_string()).is_retryable());
        assert!(!TimestampError::TruncatedResponse {
            declared: 10,
            received: 4
        }
        .is_retryable());
    }

    #[test]
    fn truncated_display_names_both_lengths() {
        let msg = TimestampError::TruncatedResponse {
            declared: 300,
            received: 120,
        }
        .to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("120"));
    }

    #[test]
    fn asn1_errors_become_malformed() {
        let err: TimestampError = Asn1Error::IndefiniteLength.into();
        assert!(matches!(err, TimestampError::MalformedTimestampResponse(_)));
    }
}
