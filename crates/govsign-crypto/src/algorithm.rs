//! # Signature Algorithms
//!
//! The closed set of algorithm names an envelope may carry. Ed25519 has a
//! software backend in this crate. The ML-DSA parameter sets (FIPS 204)
//! are recognised by name and SPKI object identifier so certificates and
//! envelopes from post-quantum signers can be parsed and reported on; they
//! verify only when a backend is registered in the
//! [`VerifierRegistry`](crate::VerifierRegistry).

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;

/// A signature algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureAlgorithm {
    /// Ed25519 (RFC 8032).
    Ed25519,
    /// ML-DSA-44 (FIPS 204, category 2).
    MlDsa44,
    /// ML-DSA-65 (FIPS 204, category 3).
    MlDsa65,
    /// ML-DSA-87 (FIPS 204, category 5).
    MlDsa87,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 4] =
        [Self::Ed25519, Self::MlDsa44, Self::MlDsa65, Self::MlDsa87];

    /// Canonical name as written into envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::MlDsa44 => "ML-DSA-44",
            Self::MlDsa65 => "ML-DSA-65",
            Self::MlDsa87 => "ML-DSA-87",
        }
    }

    /// SubjectPublicKeyInfo algorithm object identifier.
    pub fn oid(&self) -> &'static str {
        match self {
            Self::Ed25519 => "1.3.101.112",
            Self::MlDsa44 => "2.16.840.1.101.3.4.3.17",
            Self::MlDsa65 => "2.16.840.1.101.3.4.3.18",
            Self::MlDsa87 => "2.16.840.1.101.3.4.3.19",
        }
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == oid)
    }

    /// Signature length in bytes.
    pub fn signature_len(&self) -> usize {
        match self {
            Self::Ed25519 => 64,
            Self::MlDsa44 => 2420,
            Self::MlDsa65 => 3309,
            Self::MlDsa87 => 4627,
        }
    }

    /// Public key length in bytes.
    pub fn public_key_len(&self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::MlDsa44 => 1312,
            Self::MlDsa65 => 1952,
            Self::MlDsa87 => 2592,
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    /// Case-insensitive; hyphens and underscores are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "ed25519" => Ok(Self::Ed25519),
            "mldsa44" | "dilithium2" => Ok(Self::MlDsa44),
            "mldsa65" | "dilithium3" => Ok(Self::MlDsa65),
            "mldsa87" | "dilithium5" => Ok(Self::MlDsa87),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl Serialize for SignatureAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SignatureAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
