//! # Signature Envelope
//!
//! One signer's contribution to a container, stored as
//! `META-INF/signature-NNN.json`. An envelope records what was signed
//! (document name, digest algorithm, digest), who signed it (certificate
//! DER), the signature itself, and an optional RFC 3161 token.
//!
//! ## Security Invariant
//!
//! Envelopes are immutable once sealed. The JSON bytes produced at seal
//! time, or read from an archive, are kept alongside the parsed fields and
//! written back verbatim on every append, so a countersignature can never
//! re-encode (and thereby alter) an earlier signer's entry.

use govsign_core::{Digest, DigestAlgorithm, Timestamp};
use govsign_crypto::SignatureAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

/// What an envelope's timestamp token was requested over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampScope {
    /// The signature bytes. Proves the signature existed at genTime.
    #[default]
    Signature,
    /// The document bytes. Proves the content existed at genTime.
    Content,
}

impl TimestampScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Content => "content",
        }
    }

    /// The bytes a token with this scope must cover.
    pub fn subject<'a>(&self, signature: &'a [u8], document: &'a [u8]) -> &'a [u8] {
        match self {
            Self::Signature => signature,
            Self::Content => document,
        }
    }
}

impl std::fmt::Display for TimestampScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimestampScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signature" => Ok(Self::Signature),
            "content" | "document" => Ok(Self::Content),
            other => Err(format!("unknown timestamp scope: {other:?}")),
        }
    }
}

/// Everything a caller supplies to add a signature to a container.
///
/// The sequence number and document name are assigned by the packer.
#[derive(Debug, Clone)]
pub struct EnvelopeDraft {
    /// Sequence the caller believes is next. `None` accepts whatever the
    /// packer assigns; `Some(n)` fails with `SequenceConflict` if stale.
    pub sequence: Option<u32>,
    pub signer_certificate_der: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    /// Raw signature over `document_digest.as_bytes()`.
    pub signature: Vec<u8>,
    pub document_digest: Digest,
    pub timestamp_token: Option<Vec<u8>>,
    pub timestamp_scope: TimestampScope,
    pub message: String,
    pub created_at: Timestamp,
}

/// A sealed signature envelope.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEnvelope {
    sequence: u32,
    document_name: String,
    digest_algorithm: DigestAlgorithm,
    document_digest: String,
    signature_algorithm: SignatureAlgorithm,
    #[serde(with = "serde_bytes_base64")]
    signer_certificate_der: Vec<u8>,
    #[serde(with = "serde_bytes_base64")]
    signature_bytes: Vec<u8>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_opt_bytes_base64"
    )]
    timestamp_token: Option<Vec<u8>>,
    timestamp_scope: TimestampScope,
    #[serde(default)]
    message: String,
    created_at: Timestamp,
    #[serde(skip)]
    encoded: Vec<u8>,
}

impl SignatureEnvelope {
    /// Seal `draft` as envelope `sequence` over `document_name`.
    pub(crate) fn seal(
        draft: EnvelopeDraft,
        sequence: u32,
        document_name: &str,
    ) -> Result<Self, ContainerError> {
        let mut envelope = Self {
            sequence,
            document_name: document_name.to_string(),
            digest_algorithm: draft.document_digest.algorithm(),
            document_digest: draft.document_digest.to_hex(),
            signature_algorithm: draft.signature_algorithm,
            signer_certificate_der: draft.signer_certificate_der,
            signature_bytes: draft.signature,
            timestamp_token: draft.timestamp_token,
            timestamp_scope: draft.timestamp_scope,
            message: draft.message,
            created_at: draft.created_at,
            encoded: Vec::new(),
        };
        envelope.encoded = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| ContainerError::Serialization(e.to_string()))?;
        Ok(envelope)
    }

    /// Parse an envelope entry, keeping its bytes for verbatim re-emission.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut envelope: Self = serde_json::from_slice(bytes)?;
        envelope.encoded = bytes.to_vec();
        Ok(envelope)
    }

    /// The entry bytes as stored in the archive.
    pub fn as_json(&self) -> &[u8] {
        &self.encoded
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// The recorded document digest. Fails if the stored hex is not a
    /// digest of the recorded algorithm.
    pub fn document_digest(&self) -> Result<Digest, govsign_core::CoreError> {
        Digest::from_hex(self.digest_algorithm, &self.document_digest)
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn signer_certificate_der(&self) -> &[u8] {
        &self.signer_certificate_der
    }

    pub fn signature_bytes(&self) -> &[u8] {
        &self.signature_bytes
    }

    pub fn timestamp_token(&self) -> Option<&[u8]> {
        self.timestamp_token.as_deref()
    }

    pub fn timestamp_scope(&self) -> TimestampScope {
        self.timestamp_scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

impl std::fmt::Debug for SignatureEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEnvelope")
            .field("sequence", &self.sequence)
            .field("document_name", &self.document_name)
            .field("document_digest", &self.document_digest)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("has_timestamp", &self.timestamp_token.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Base64 serialization for certificate and signature bytes.
mod serde_bytes_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

mod serde_opt_bytes_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
