//! # Cryptographic Error Types
//!
//! Structured errors for signing, verification, key management, and
//! certificate handling in `govsign-crypto`.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The verify primitive itself failed (not a "false" result).
    #[error("verification error: {0}")]
    VerificationFailed(String),

    /// Signature bytes have the wrong length for the algorithm.
    #[error("invalid {algorithm} signature length: expected {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Public key bytes cannot be decoded for the algorithm.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Private key material is malformed.
    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    /// No key is registered under the handle.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key exists but is disabled for signing.
    #[error("key is disabled: {0}")]
    KeyDisabled(String),

    /// The key's algorithm differs from the one requested.
    #[error("algorithm mismatch: key is {key}, requested {requested}")]
    AlgorithmMismatch { key: String, requested: String },

    /// No backend is available for the algorithm.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// X.509 certificate parsing or encoding failed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}

impl From<govsign_core::CoreError> for CryptoError {
    fn from(err: govsign_core::CoreError) -> Self {
        Self::HexDecode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_length_display() {
        let err = CryptoError::InvalidSignatureLength {
            algorithm: "Ed25519",
            expected: 64,
            actual: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("64 bytes"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn algorithm_mismatch_display() {
        let err = CryptoError::AlgorithmMismatch {
            key: "Ed25519".to_string(),
            requested: "ML-DSA-65".to_string(),
        };
        assert!(err.to_string().contains("ML-DSA-65"));
    }

    #[test]
    fn core_error_converts() {
        let err: CryptoError = govsign_core::CoreError::Hex("odd".to_string()).into();
        assert!(matches!(err, CryptoError::HexDecode(_)));
    }
}
