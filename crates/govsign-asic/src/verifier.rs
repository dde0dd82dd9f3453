//! # Container Verifier
//!
//! Re-derives the validity of every envelope from the archive alone. For
//! each envelope, in sequence order:
//!
//! 1. The recorded document digest is compared with a digest of the live
//!    document bytes. A difference means the content changed after signing.
//! 2. The signer certificate is parsed and its key algorithm checked
//!    against the envelope, then the signature is verified over the live
//!    digest with the certificate's public key.
//! 3. The certificate validity window is checked at the reference time.
//! 4. A timestamp token, when present, must decode, and when its TSTInfo is
//!    readable its message imprint must cover the timestamped subject.
//!
//! ## Security Invariant
//!
//! Nothing inside the archive is trusted to describe its own validity.
//! The digest every signature is checked against is recomputed from the
//! document bytes, never taken from an envelope. Tampered or corrupt
//! content never aborts verification: it yields a `valid = false` verdict.
//! Only an archive that cannot be read as a container at all is an error.

use std::collections::HashMap;

use govsign_core::{Digest, DigestAlgorithm, Document, Timestamp};
use govsign_crypto::{CryptoError, SignerCertificate, ValidityStatus, VerifierRegistry};
use govsign_tsp::TimestampToken;

use crate::container::{signature_entry_name, Container, ContainerParts};
use crate::envelope::SignatureEnvelope;
use crate::error::ContainerError;
use crate::report::{SignatureVerdict, TimestampStatus, VerdictCode, VerificationResult};

/// An envelope entry as the verifier sees it.
struct EntryView {
    name: String,
    sequence: u32,
    envelope: Result<SignatureEnvelope, String>,
}

/// Verifies containers against a registry of signature backends.
#[derive(Debug, Clone, Default)]
pub struct ContainerVerifier {
    registry: VerifierRegistry,
    reference_time: Option<Timestamp>,
}

impl ContainerVerifier {
    pub fn new(registry: VerifierRegistry) -> Self {
        Self {
            registry,
            reference_time: None,
        }
    }

    /// Evaluate certificate validity at `at` instead of the current time.
    pub fn at(mut self, at: Timestamp) -> Self {
        self.reference_time = Some(at);
        self
    }

    /// Verify archive bytes.
    ///
    /// Errors only with `MalformedContainer`, when the archive structure
    /// cannot be read. Corrupt envelopes become failed verdicts.
    pub fn verify_bytes(&self, bytes: &[u8]) -> Result<VerificationResult, ContainerError> {
        let parts = ContainerParts::read(bytes)?;
        let entries = parts
            .signatures
            .into_iter()
            .map(|entry| EntryView {
                envelope: SignatureEnvelope::from_json(&entry.bytes).map_err(|e| e.to_string()),
                name: entry.name,
                sequence: entry.sequence,
            })
            .collect();
        Ok(self.verify_entries(&parts.document, entries))
    }

    /// Verify a decoded container.
    pub fn verify(&self, container: &Container) -> VerificationResult {
        let entries = container
            .envelopes()
            .iter()
            .map(|envelope| EntryView {
                name: signature_entry_name(envelope.sequence()),
                sequence: envelope.sequence(),
                envelope: Ok(envelope.clone()),
            })
            .collect();
        self.verify_entries(container.document(), entries)
    }

    fn verify_entries(&self, document: &Document, entries: Vec<EntryView>) -> VerificationResult {
        let at = self.reference_time.unwrap_or_else(Timestamp::now);
        let mut live = LiveDigests::new(document);

        let signatures: Vec<SignatureVerdict> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.judge(document, &mut live, index as u32 + 1, entry, at))
            .collect();

        let signature_count = signatures.len();
        let failed = signatures.iter().filter(|v| !v.valid).count();
        let valid = signature_count >= 1 && failed == 0 && signature_count == entries.len();
        let message = if signature_count == 0 {
            "container carries no signatures".to_string()
        } else if failed == 0 {
            format!("all {signature_count} signature(s) valid")
        } else {
            format!("{failed} of {signature_count} signature(s) failed verification")
        };

        tracing::info!(
            document = %document.name(),
            valid,
            signature_count,
            failed,
            "verified container"
        );
        VerificationResult {
            valid,
            message,
            document_name: document.name().to_string(),
            document_size: document.len(),
            media_type: document.media_type().to_string(),
            signature_count,
            signatures,
        }
    }

    fn judge(
        &self,
        document: &Document,
        live: &mut LiveDigests<'_>,
        position: u32,
        entry: &EntryView,
        at: Timestamp,
    ) -> SignatureVerdict {
        let mut verdict = SignatureVerdict {
            sequence: entry.sequence,
            valid: false,
            code: VerdictCode::Valid,
            message: String::new(),
            signature_path: entry.name.clone(),
            signer_name: None,
            certificate_issuer: None,
            certificate_not_before: None,
            certificate_not_after: None,
            signature_algorithm: None,
            created_at: None,
            timestamp: None,
            timestamp_status: TimestampStatus::Absent,
        };

        let envelope = match &entry.envelope {
            Ok(envelope) => envelope,
            Err(reason) => {
                return fail(
                    verdict,
                    VerdictCode::SignatureMalformed,
                    format!("SIGNATURE MALFORMED: envelope cannot be decoded: {reason}"),
                )
            }
        };
        verdict.sequence = envelope.sequence();
        verdict.signature_algorithm = Some(envelope.signature_algorithm().to_string());
        verdict.created_at = Some(envelope.created_at());

        let certificate = SignerCertificate::from_der(envelope.signer_certificate_der());
        if let Ok(cert) = &certificate {
            verdict.signer_name = Some(cert.subject().to_string());
            verdict.certificate_issuer = Some(cert.issuer().to_string());
            verdict.certificate_not_before = Some(cert.not_before());
            verdict.certificate_not_after = Some(cert.not_after());
        }

        if envelope.sequence() != entry.sequence || entry.sequence != position {
            return fail(
                verdict,
                VerdictCode::SequenceMismatch,
                format!(
                    "SEQUENCE MISMATCH: {} records sequence {} at position {position}",
                    entry.name,
                    envelope.sequence()
                ),
            );
        }

        // Integrity.
        let recorded = match envelope.document_digest() {
            Ok(d) => d,
            Err(e) => {
                return fail(
                    verdict,
                    VerdictCode::SignatureMalformed,
                    format!("SIGNATURE MALFORMED: recorded document digest unreadable: {e}"),
                )
            }
        };
        let live_digest = live.get(recorded.algorithm());
        if !live_digest.matches(&recorded) {
            return fail(
                verdict,
                VerdictCode::IntegrityMismatch,
                format!(
                    "INTEGRITY FAILURE: document digest mismatch (signed {recorded}, found {live_digest})"
                ),
            );
        }
        if envelope.document_name() != document.name() {
            return fail(
                verdict,
                VerdictCode::IntegrityMismatch,
                format!(
                    "INTEGRITY FAILURE: document name mismatch (signed {:?}, found {:?})",
                    envelope.document_name(),
                    document.name()
                ),
            );
        }

        // Signature.
        let cert = match certificate {
            Ok(cert) => cert,
            Err(e) => {
                return fail(
                    verdict,
                    VerdictCode::CertificateUnreadable,
                    format!("CERTIFICATE UNREADABLE: {e}"),
                )
            }
        };
        let algorithm = envelope.signature_algorithm();
        match cert.key_algorithm() {
            Some(key_algorithm) if key_algorithm == algorithm => {}
            Some(key_algorithm) => {
                return fail(
                    verdict,
                    VerdictCode::AlgorithmMismatch,
                    format!(
                        "ALGORITHM MISMATCH: certificate key is {key_algorithm}, envelope declares {algorithm}"
                    ),
                )
            }
            None => {
                return fail(
                    verdict,
                    VerdictCode::UnsupportedAlgorithm,
                    format!(
                        "UNSUPPORTED ALGORITHM: certificate key algorithm {} is not a known signature algorithm",
                        cert.key_algorithm_oid()
                    ),
                )
            }
        }
        match self.registry.verify(
            algorithm,
            cert.public_key(),
            live_digest.as_bytes(),
            envelope.signature_bytes(),
        ) {
            Ok(true) => {}
            Ok(false) => {
                return fail(
                    verdict,
                    VerdictCode::SignatureInvalid,
                    "INTEGRITY FAILURE: signature mismatch, signature does not verify against the document digest"
                        .to_string(),
                )
            }
            Err(CryptoError::UnsupportedAlgorithm(name)) => {
                return fail(
                    verdict,
                    VerdictCode::UnsupportedAlgorithm,
                    format!("UNSUPPORTED ALGORITHM: no verifier registered for {name}"),
                )
            }
            Err(e) => {
                return fail(
                    verdict,
                    VerdictCode::SignatureMalformed,
                    format!("SIGNATURE MALFORMED: {e}"),
                )
            }
        }

        // Certificate validity.
        match cert.validity_at(at) {
            ValidityStatus::Valid => {}
            ValidityStatus::Expired => {
                return fail(
                    verdict,
                    VerdictCode::CertificateExpired,
                    format!(
                        "CERTIFICATE EXPIRED: not valid after {} (checked at {at})",
                        cert.not_after()
                    ),
                )
            }
            ValidityStatus::NotYetValid => {
                return fail(
                    verdict,
                    VerdictCode::CertificateNotYetValid,
                    format!(
                        "CERTIFICATE NOT YET VALID: not valid before {} (checked at {at})",
                        cert.not_before()
                    ),
                )
            }
        }

        // Timestamp.
        if let Some(token) = envelope.timestamp_token() {
            let token = match TimestampToken::decode(token) {
                Ok(token) => token,
                Err(e) => {
                    verdict.timestamp_status = TimestampStatus::Invalid;
                    return fail(
                        verdict,
                        VerdictCode::TimestampInvalid,
                        format!("TIMESTAMP INVALID: token cannot be decoded: {e}"),
                    );
                }
            };
            match token.tst_info() {
                None => verdict.timestamp_status = TimestampStatus::Opaque,
                Some(info) => {
                    let scope = envelope.timestamp_scope();
                    let subject = scope.subject(envelope.signature_bytes(), document.bytes());
                    if !info.message_imprint.covers(subject) {
                        verdict.timestamp_status = TimestampStatus::Invalid;
                        return fail(
                            verdict,
                            VerdictCode::TimestampInvalid,
                            format!("TIMESTAMP INVALID: message imprint mismatch for {scope} scope"),
                        );
                    }
                    verdict.timestamp_status = TimestampStatus::ImprintVerified;
                    verdict.timestamp = Some(info.gen_time);
                }
            }
        }

        verdict.valid = true;
        verdict.message = match verdict.timestamp {
            Some(gen_time) => format!("signature valid, timestamped {gen_time}"),
            None => "signature valid".to_string(),
        };
        verdict
    }
}

fn fail(mut verdict: SignatureVerdict, code: VerdictCode, message: String) -> SignatureVerdict {
    tracing::warn!(
        sequence = verdict.sequence,
        path = %verdict.signature_path,
        code = %code,
        "{message}"
    );
    verdict.valid = false;
    verdict.code = code;
    verdict.message = message;
    verdict
}

/// Digests of the live document, computed once per algorithm.
struct LiveDigests<'a> {
    document: &'a Document,
    cache: HashMap<DigestAlgorithm, Digest>,
}

impl<'a> LiveDigests<'a> {
    fn new(document: &'a Document) -> Self {
        Self {
            document,
            cache: HashMap::new(),
        }
    }

    fn get(&mut self, algorithm: DigestAlgorithm) -> Digest {
        self.cache
            .entry(algorithm)
            .or_insert_with(|| self.document.digest(algorithm))
            .clone()
    }
}

/// Verify archive bytes with the default (Ed25519) registry at the current
/// time.
pub fn verify_container(bytes: &[u8]) -> Result<VerificationResult, ContainerError> {
    ContainerVerifier::default().verify_bytes(bytes)
}
