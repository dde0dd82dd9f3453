//! # Container Packer
//!
//! Builds a container around a document and its first envelope, and
//! appends further envelopes. Both operations are pure: no network I/O,
//! no persistence, and the input container is never modified.
//!
//! ## Security Invariant
//!
//! Sequence numbers are assigned here and nowhere else: the first envelope
//! is 1, and each append takes `len + 1`. A caller that claims a sequence
//! number (because it holds a lease on the container as it last saw it) is
//! refused with `SequenceConflict` when that view is stale, so two
//! countersigners racing on the same container cannot both land as
//! sequence 2.

use govsign_core::Document;

use crate::container::Container;
use crate::envelope::{EnvelopeDraft, SignatureEnvelope};
use crate::error::ContainerError;
use crate::manifest::Manifest;

/// Create a container holding `document` and its first envelope.
pub fn pack(document: Document, draft: EnvelopeDraft) -> Result<Container, ContainerError> {
    if document.is_empty() {
        return Err(ContainerError::EmptyDocument);
    }
    check_sequence(1, draft.sequence)?;
    check_digest(&document, &draft)?;

    let manifest = Manifest::for_document(&document)?;
    let envelope = SignatureEnvelope::seal(draft, 1, document.name())?;
    tracing::info!(
        document = %document.name(),
        size = document.len(),
        signature_algorithm = %envelope.signature_algorithm(),
        "packed new container"
    );
    Ok(Container::assemble(document, manifest, vec![envelope], Vec::new()))
}

/// Return a new container with `draft` appended as the next envelope.
///
/// Document bytes, the manifest, earlier envelope entries, and unknown
/// `META-INF/` entries are carried over byte-for-byte.
pub fn append(container: &Container, draft: EnvelopeDraft) -> Result<Container, ContainerError> {
    let sequence = container.next_sequence();
    check_sequence(sequence, draft.sequence)?;
    check_digest(container.document(), &draft)?;

    let envelope = SignatureEnvelope::seal(draft, sequence, container.document().name())?;
    let mut envelopes = container.envelopes().to_vec();
    envelopes.push(envelope);

    tracing::info!(
        document = %container.document().name(),
        sequence,
        "appended envelope to container"
    );
    Ok(Container::assemble(
        container.document().clone(),
        container.manifest().clone(),
        envelopes,
        container.extra_entries().to_vec(),
    ))
}

fn check_sequence(expected: u32, claimed: Option<u32>) -> Result<(), ContainerError> {
    match claimed {
        Some(got) if got != expected => {
            tracing::warn!(expected, got, "rejected envelope with stale sequence number");
            Err(ContainerError::SequenceConflict { expected, got })
        }
        _ => Ok(()),
    }
}

fn check_digest(document: &Document, draft: &EnvelopeDraft) -> Result<(), ContainerError> {
    let live = document.digest(draft.document_digest.algorithm());
    if !live.matches(&draft.document_digest) {
        return Err(ContainerError::EnvelopeMismatch(format!(
            "draft digest {} does not match document {:?} ({live})",
            draft.document_digest,
            document.name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::TimestampScope;
    use govsign_core::{DigestAlgorithm, Timestamp};
    use govsign_crypto::SignatureAlgorithm;

    fn draft_for(document: &Document, sequence: Option<u32>) -> EnvelopeDraft {
        EnvelopeDraft {
            sequence,
            signer_certificate_der: vec![0x30, 0x00],
            signature_algorithm: SignatureAlgorithm::Ed25519,
            signature: vec![1; 64],
            document_digest: document.digest(DigestAlgorithm::Sha256),
            timestamp_token: None,
            timestamp_scope: TimestampScope::Signature,
            message: "ok".to_string(),
            created_at: Timestamp::parse("2026-06-01T09:00:00Z").unwrap(),
        }
    }

    fn doc() -> Document {
        Document::new("contract.pdf", b"ORIGINAL CONTRACT CONTENT".to_vec()).unwrap()
    }

    #[test]
    fn pack_assigns_sequence_one() {
        let d = doc();
        let c = pack(d.clone(), draft_for(&d, None)).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.envelopes()[0].sequence(), 1);
        assert_eq!(c.envelopes()[0].document_name(), "contract.pdf");
    }

    #[test]
    fn pack_rejects_empty_document() {
        let d = Document::new("empty.txt", Vec::new()).unwrap();
        assert_eq!(
            pack(d.clone(), draft_for(&d, None)).unwrap_err(),
            ContainerError::EmptyDocument
        );
    }

    #[test]
    fn pack_rejects_claimed_sequence_other_than_one() {
        let d = doc();
        assert_eq!(
            pack(d.clone(), draft_for(&d, Some(2))).unwrap_err(),
            ContainerError::SequenceConflict { expected: 1, got: 2 }
        );
    }

    #[test]
    fn append_leaves_input_untouched() {
        let d = doc();
        let first = pack(d.clone(), draft_for(&d, None)).unwrap();
        let before = first.to_bytes().unwrap();
        let second = append(&first, draft_for(&d, Some(2))).unwrap();

        assert_eq!(first.to_bytes().unwrap(), before);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second.envelopes()[0].as_json(), first.envelopes()[0].as_json());
        assert_eq!(second.envelopes()[1].sequence(), 2);
    }

    #[test]
    fn duplicate_sequence_claim_conflicts() {
        let d = doc();
        let first = pack(d.clone(), draft_for(&d, None)).unwrap();
        let second = append(&first, draft_for(&d, Some(2))).unwrap();
        assert_eq!(
            append(&second, draft_for(&d, Some(2))).unwrap_err(),
            ContainerError::SequenceConflict { expected: 3, got: 2 }
        );
    }

    #[test]
    fn racing_appends_conflict_once_serialized() {
        let d = doc();
        let base = pack(d.clone(), draft_for(&d, None)).unwrap();

        // Each append yields its own value; the base is never shared state.
        let winner = append(&base, draft_for(&d, Some(2))).unwrap();
        let loser = append(&base, draft_for(&d, Some(2))).unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(loser.len(), 2);

        // Under the caller's lease the loser is replayed on the stored winner.
        assert_eq!(
            append(&winner, draft_for(&d, Some(2))).unwrap_err(),
            ContainerError::SequenceConflict { expected: 3, got: 2 }
        );
    }

    #[test]
    fn draft_for_other_content_is_refused() {
        let d = doc();
        let other = Document::new("contract.pdf", b"something else".to_vec()).unwrap();
        assert!(matches!(
            pack(d, draft_for(&other, None)),
            Err(ContainerError::EnvelopeMismatch(_))
        ));
    }

    #[test]
    fn append_survives_archive_round_trip() {
        let d = doc();
        let first = pack(d.clone(), draft_for(&d, None)).unwrap();
        let reread = Container::from_bytes(&first.to_bytes().unwrap()).unwrap();
        let second = append(&reread, draft_for(&d, None)).unwrap();
        let bytes = second.to_bytes().unwrap();
        let decoded = Container::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.document().bytes(), b"ORIGINAL CONTRACT CONTENT");
    }
}
