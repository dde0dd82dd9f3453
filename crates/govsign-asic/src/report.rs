//! Verification report types.
//!
//! Closed types throughout: a verdict carries a [`VerdictCode`] as well as
//! a human-readable message, so callers branch on the code and show the
//! message.

use govsign_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Why a signature verdict came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictCode {
    Valid,
    /// The document digest no longer matches the one the signer recorded.
    IntegrityMismatch,
    /// The signature does not verify against the live document digest.
    SignatureInvalid,
    /// The envelope or its signature bytes cannot be decoded.
    SignatureMalformed,
    /// The certificate key algorithm differs from the envelope's.
    AlgorithmMismatch,
    /// No verifier is registered for the algorithm.
    UnsupportedAlgorithm,
    CertificateUnreadable,
    CertificateExpired,
    CertificateNotYetValid,
    /// The timestamp token is corrupt or covers something else.
    TimestampInvalid,
    /// The envelope's sequence number is out of place.
    SequenceMismatch,
}

impl VerdictCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::IntegrityMismatch => "INTEGRITY_MISMATCH",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::SignatureMalformed => "SIGNATURE_MALFORMED",
            Self::AlgorithmMismatch => "ALGORITHM_MISMATCH",
            Self::UnsupportedAlgorithm => "UNSUPPORTED_ALGORITHM",
            Self::CertificateUnreadable => "CERTIFICATE_UNREADABLE",
            Self::CertificateExpired => "CERTIFICATE_EXPIRED",
            Self::CertificateNotYetValid => "CERTIFICATE_NOT_YET_VALID",
            Self::TimestampInvalid => "TIMESTAMP_INVALID",
            Self::SequenceMismatch => "SEQUENCE_MISMATCH",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl std::fmt::Display for VerdictCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What could be established about an envelope's timestamp token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampStatus {
    /// The envelope carries no token.
    Absent,
    /// The token decodes and its TSTInfo imprint covers the timestamped
    /// subject. The TSA's own signature is not checked.
    ImprintVerified,
    /// The token decodes but carries no readable TSTInfo.
    Opaque,
    /// The token is corrupt or its imprint does not match.
    Invalid,
}

/// The outcome for one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureVerdict {
    pub sequence: u32,
    pub valid: bool,
    pub code: VerdictCode,
    pub message: String,
    /// Archive entry the envelope was read from.
    pub signature_path: String,
    /// Certificate subject DN.
    pub signer_name: Option<String>,
    pub certificate_issuer: Option<String>,
    pub certificate_not_before: Option<Timestamp>,
    pub certificate_not_after: Option<Timestamp>,
    pub signature_algorithm: Option<String>,
    pub created_at: Option<Timestamp>,
    /// TSTInfo genTime, when readable.
    pub timestamp: Option<Timestamp>,
    pub timestamp_status: TimestampStatus,
}

/// The outcome for a whole container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Every verdict is valid and there is at least one signature.
    pub valid: bool,
    pub message: String,
    pub document_name: String,
    pub document_size: usize,
    pub media_type: String,
    pub signature_count: usize,
    /// Verdicts in ascending sequence order.
    pub signatures: Vec<SignatureVerdict>,
}

impl VerificationResult {
    /// Verdicts that are not valid.
    pub fn failures(&self) -> impl Iterator<Item = &SignatureVerdict> {
        self.signatures.iter().filter(|v| !v.valid)
    }
}
