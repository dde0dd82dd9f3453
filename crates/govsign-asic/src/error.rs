//! # Container Error Types
//!
//! Structural failures that abort a container operation. Content-level
//! problems found during verification (a tampered document, an expired
//! certificate, a corrupt timestamp) are never errors: they are reported
//! as `valid = false` verdicts in a [`VerificationResult`](crate::VerificationResult).

use std::time::Duration;

use govsign_crypto::CryptoError;
use thiserror::Error;

/// Errors from packing, appending, signing, or reading a container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// A container cannot be created around zero bytes of content.
    #[error("document is empty")]
    EmptyDocument,

    /// The caller claimed a sequence number other than the next free one.
    #[error("sequence conflict: container expects sequence {expected}, envelope claims {got}")]
    SequenceConflict {
        /// The next free sequence number in the container.
        expected: u32,
        /// The sequence number the caller supplied.
        got: u32,
    },

    /// The archive cannot be read as an ASiC-E container at all.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// An envelope draft does not describe the document it is being added to.
    #[error("envelope does not match the container document: {0}")]
    EnvelopeMismatch(String),

    /// The external signer failed. Never retried internally.
    #[error("signing failed: {0}")]
    Sign(#[from] CryptoError),

    /// The signing task ended without producing a result.
    #[error("external signer unavailable: {0}")]
    SignerUnavailable(String),

    /// A suspension point exceeded its caller-supplied deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Which step timed out.
        operation: &'static str,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// Envelope or manifest JSON could not be produced.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ContainerError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<zip::result::ZipError> for ContainerError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::MalformedContainer(err.to_string())
    }
}
