//! # Content Digest: the HashBinder
//!
//! Defines [`Digest`] and [`DigestAlgorithm`]. A digest is the canonical
//! fingerprint of one document version: computing it twice over the same
//! bytes yields the same value, and any single-bit change in the input
//! changes it. Tamper detection in the container verifier rests entirely
//! on this property.
//!
//! SHA-256 is the default. SHA-384 and SHA-512 are available for signers
//! and timestamp authorities that require them; the algorithm tag travels
//! with the digest so lengths are never assumed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::error::CoreError;
use crate::hex;

/// The hash algorithm used to produce a [`Digest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256, 32-byte output. The default.
    Sha256,
    /// SHA-384, 48-byte output.
    Sha384,
    /// SHA-512, 64-byte output.
    Sha512,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Dotted-decimal NIST object identifier (RFC 5758 / RFC 5754).
    pub fn oid(&self) -> &'static str {
        match self {
            Self::Sha256 => "2.16.840.1.101.3.4.2.1",
            Self::Sha384 => "2.16.840.1.101.3.4.2.2",
            Self::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Look up an algorithm by its dotted-decimal object identifier.
    pub fn from_oid(oid: &str) -> Option<Self> {
        [Self::Sha256, Self::Sha384, Self::Sha512]
            .into_iter()
            .find(|alg| alg.oid() == oid)
    }

    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Digest {
        let bytes = match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        };
        Digest {
            algorithm: *self,
            bytes,
        }
    }
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CoreError;

    /// Accepts `sha256`, `SHA-256`, `sha-256` and the same forms for 384/512.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(CoreError::UnknownDigestAlgorithm(s.to_string())),
        }
    }
}

/// A digest value together with the algorithm that produced it.
///
/// The byte length always equals `algorithm.output_len()`; the constructors
/// enforce this.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// Wrap raw digest bytes, checking the length against the algorithm.
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: Vec<u8>) -> Result<Self, CoreError> {
        if bytes.len() != algorithm.output_len() {
            return Err(CoreError::DigestLength {
                algorithm: algorithm.as_str(),
                expected: algorithm.output_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { algorithm, bytes })
    }

    /// Parse a hex-encoded digest for the given algorithm.
    pub fn from_hex(algorithm: DigestAlgorithm, hex: &str) -> Result<Self, CoreError> {
        Self::from_bytes(algorithm, hex::decode(hex)?)
    }

    /// The algorithm that produced this digest.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Constant-time comparison of two digests.
    ///
    /// Digests of different algorithms never match.
    pub fn matches(&self, other: &Digest) -> bool {
        self.algorithm == other.algorithm && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({}:{}...)", self.algorithm, hex::prefix(&self.bytes))
    }
}

/// Compute the SHA-256 digest of document content.
///
/// This is the HashBinder contract: pure, deterministic, no failure mode.
pub fn digest(data: &[u8]) -> Digest {
    sha256_digest(data)
}

/// Compute a SHA-256 digest.
pub fn sha256_digest(data: &[u8]) -> Digest {
    DigestAlgorithm::Sha256.digest(data)
}
