//! # ASiC-E Container
//!
//! A ZIP archive with this layout:
//!
//! ```text
//! mimetype                      STORED, "application/vnd.etsi.asic-e+zip"
//! <document name>               the signed bytes, verbatim
//! META-INF/manifest.json        document name and MIME type
//! META-INF/signature-001.json   first signer
//! META-INF/signature-002.json   first countersigner, ...
//! ```
//!
//! Other `META-INF/` entries are carried through unchanged.
//!
//! Reading happens in two stages. [`ContainerParts::read`] checks the
//! archive structure and leaves signature entries undecoded, which is what
//! the verifier needs to report a corrupt envelope as a failed verdict.
//! [`Container::from_bytes`] additionally decodes every envelope and
//! refuses anything inconsistent, which is what the packer needs before
//! appending.

use std::io::{Cursor, Read, Write};

use govsign_core::Document;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::envelope::SignatureEnvelope;
use crate::error::ContainerError;
use crate::manifest::Manifest;

/// Content of the `mimetype` entry.
pub const MIMETYPE: &str = "application/vnd.etsi.asic-e+zip";
pub const MIMETYPE_ENTRY: &str = "mimetype";
pub const MANIFEST_ENTRY: &str = "META-INF/manifest.json";
const META_INF: &str = "META-INF/";
const SIGNATURE_PREFIX: &str = "META-INF/signature-";
const SIGNATURE_SUFFIX: &str = ".json";

/// Upper bound on any single decompressed entry.
const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Archive entry name for envelope `sequence`.
pub fn signature_entry_name(sequence: u32) -> String {
    format!("{SIGNATURE_PREFIX}{sequence:03}{SIGNATURE_SUFFIX}")
}

fn parse_signature_entry_name(name: &str) -> Option<u32> {
    let digits = name
        .strip_prefix(SIGNATURE_PREFIX)?
        .strip_suffix(SIGNATURE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn malformed(reason: impl Into<String>) -> ContainerError {
    ContainerError::MalformedContainer(reason.into())
}

/// A signature entry as stored, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub name: String,
    /// Sequence number taken from the entry name.
    pub sequence: u32,
    pub bytes: Vec<u8>,
}

/// A structurally valid archive whose envelopes have not been decoded.
#[derive(Debug, Clone)]
pub struct ContainerParts {
    pub document: Document,
    pub manifest: Manifest,
    /// Ordered by entry-name sequence. Entries sharing a number are all
    /// kept so the verifier can judge each one.
    pub signatures: Vec<SignatureEntry>,
    pub extra_entries: Vec<(String, Vec<u8>)>,
}

impl ContainerParts {
    /// Read the archive structure.
    ///
    /// Fails with `MalformedContainer` when the bytes are not a ZIP, the
    /// `mimetype` entry is missing, misplaced, compressed, or wrong, the
    /// manifest is missing or unreadable, or there is not exactly one
    /// document at the root matching the manifest.
    pub fn read(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        if archive.is_empty() {
            return Err(malformed("archive has no entries"));
        }

        let mut document: Option<(String, Vec<u8>)> = None;
        let mut manifest: Option<Manifest> = None;
        let mut signatures = Vec::new();
        let mut extra_entries = Vec::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            if index == 0 {
                if name != MIMETYPE_ENTRY {
                    return Err(malformed(format!(
                        "mimetype must be the first entry, found {name:?}"
                    )));
                }
                if file.compression() != CompressionMethod::Stored {
                    return Err(malformed("mimetype entry must be STORED"));
                }
            }
            if file.is_dir() {
                continue;
            }
            if file.size() > MAX_ENTRY_BYTES {
                return Err(malformed(format!("entry {name:?} exceeds size limit")));
            }
            let mut data = Vec::new();
            (&mut file)
                .take(MAX_ENTRY_BYTES + 1)
                .read_to_end(&mut data)
                .map_err(|e| malformed(format!("reading {name:?}: {e}")))?;
            if data.len() as u64 > MAX_ENTRY_BYTES {
                return Err(malformed(format!("entry {name:?} exceeds size limit")));
            }

            if index == 0 {
                if data != MIMETYPE.as_bytes() {
                    return Err(malformed(format!(
                        "mimetype is {:?}, expected {MIMETYPE:?}",
                        String::from_utf8_lossy(&data)
                    )));
                }
            } else if name == MIMETYPE_ENTRY {
                return Err(malformed("duplicate mimetype entry"));
            } else if name == MANIFEST_ENTRY {
                manifest = Some(Manifest::from_json(&data)?);
            } else if let Some(sequence) = parse_signature_entry_name(&name) {
                signatures.push(SignatureEntry {
                    name,
                    sequence,
                    bytes: data,
                });
            } else if name.starts_with(META_INF) {
                extra_entries.push((name, data));
            } else if name.contains('/') {
                return Err(malformed(format!("unexpected entry {name:?} outside META-INF")));
            } else if let Some((existing, _)) = &document {
                return Err(malformed(format!(
                    "more than one document at the root: {existing:?} and {name:?}"
                )));
            } else {
                document = Some((name, data));
            }
        }

        let manifest = manifest.ok_or_else(|| malformed(format!("missing {MANIFEST_ENTRY}")))?;
        let (name, data) = document.ok_or_else(|| malformed("no document at the archive root"))?;
        if manifest.document_name() != name {
            return Err(malformed(format!(
                "manifest names {:?} but the archive holds {name:?}",
                manifest.document_name()
            )));
        }
        let document = Document::new(name, data)
            .and_then(|d| d.with_media_type(manifest.media_type()))
            .map_err(|e| malformed(e.to_string()))?;

        // Stable: entries sharing a number keep archive order.
        signatures.sort_by_key(|s| s.sequence);

        tracing::debug!(
            document = %document.name(),
            signatures = signatures.len(),
            extra_entries = extra_entries.len(),
            "read container archive"
        );
        Ok(Self {
            document,
            manifest,
            signatures,
            extra_entries,
        })
    }
}

/// A decoded container: one document and its envelopes in sequence order.
///
/// Containers are values. Appending produces a new `Container`; the
/// original is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    document: Document,
    manifest: Manifest,
    envelopes: Vec<SignatureEnvelope>,
    extra_entries: Vec<(String, Vec<u8>)>,
}

impl Container {
    pub(crate) fn assemble(
        document: Document,
        manifest: Manifest,
        envelopes: Vec<SignatureEnvelope>,
        extra_entries: Vec<(String, Vec<u8>)>,
    ) -> Self {
        Self {
            document,
            manifest,
            envelopes,
            extra_entries,
        }
    }

    /// Decode a container for further appending.
    ///
    /// Every envelope must decode, sit in an entry named for its own
    /// sequence number, and the sequence numbers must be exactly `1..=N`
    /// with `N >= 1`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let parts = ContainerParts::read(bytes)?;
        if parts.signatures.is_empty() {
            return Err(malformed("container carries no signatures"));
        }
        if let Some(pair) = parts
            .signatures
            .windows(2)
            .find(|w| w[0].sequence == w[1].sequence)
        {
            return Err(malformed(format!(
                "{} and {} share sequence number {}",
                pair[0].name, pair[1].name, pair[0].sequence
            )));
        }
        let mut envelopes = Vec::with_capacity(parts.signatures.len());
        for (index, entry) in parts.signatures.iter().enumerate() {
            let envelope = SignatureEnvelope::from_json(&entry.bytes)
                .map_err(|e| malformed(format!("{}: {e}", entry.name)))?;
            let position = index as u32 + 1;
            if envelope.sequence() != entry.sequence || entry.sequence != position {
                return Err(malformed(format!(
                    "{} records sequence {} at position {position}",
                    entry.name,
                    envelope.sequence()
                )));
            }
            envelopes.push(envelope);
        }
        Ok(Self::assemble(
            parts.document,
            parts.manifest,
            envelopes,
            parts.extra_entries,
        ))
    }

    /// Serialize to ASiC-E ZIP bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        let io_err = |e: std::io::Error| ContainerError::Serialization(e.to_string());
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer.start_file(MIMETYPE_ENTRY, entry_options(CompressionMethod::Stored))?;
        writer.write_all(MIMETYPE.as_bytes()).map_err(io_err)?;

        writer.start_file(self.document.name(), entry_options(CompressionMethod::Deflated))?;
        writer.write_all(self.document.bytes()).map_err(io_err)?;

        writer.start_file(MANIFEST_ENTRY, entry_options(CompressionMethod::Deflated))?;
        writer.write_all(self.manifest.as_json()).map_err(io_err)?;

        for envelope in &self.envelopes {
            writer.start_file(
                signature_entry_name(envelope.sequence()),
                entry_options(CompressionMethod::Deflated),
            )?;
            writer.write_all(envelope.as_json()).map_err(io_err)?;
        }
        for (name, data) in &self.extra_entries {
            writer.start_file(name.as_str(), entry_options(CompressionMethod::Deflated))?;
            writer.write_all(data).map_err(io_err)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Envelopes in ascending sequence order.
    pub fn envelopes(&self) -> &[SignatureEnvelope] {
        &self.envelopes
    }

    pub fn envelope(&self, sequence: u32) -> Option<&SignatureEnvelope> {
        self.envelopes.iter().find(|e| e.sequence() == sequence)
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// The sequence number the next appended envelope will receive.
    pub fn next_sequence(&self) -> u32 {
        self.envelopes.len() as u32 + 1
    }

    /// `META-INF/` entries this crate does not interpret.
    pub fn extra_entries(&self) -> &[(String, Vec<u8>)] {
        &self.extra_entries
    }
}

// Fixed modification time keeps archives byte-for-byte reproducible.
fn entry_options(method: CompressionMethod) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(zip::DateTime::default())
}

/// Rebuild `archive` with entry `name` replaced by `data` (or appended when
/// absent). Entry order and compression are otherwise preserved.
#[cfg(test)]
pub(crate) fn rewrite_entry(archive: &[u8], name: &str, data: &[u8]) -> Vec<u8> {
    let mut reader = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut replaced = false;
    for i in 0..reader.len() {
        let mut file = reader.by_index(i).unwrap();
        let entry_name = file.name().to_string();
        let method = file.compression();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        if entry_name == name {
            content = data.to_vec();
            replaced = true;
        }
        writer.start_file(entry_name, entry_options(method)).unwrap();
        writer.write_all(&content).unwrap();
    }
    if !replaced {
        writer
            .start_file(name, entry_options(CompressionMethod::Deflated))
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeDraft, TimestampScope};
    use govsign_core::{sha256_digest, Timestamp};
    use govsign_crypto::SignatureAlgorithm;

    fn sample() -> Container {
        let document = Document::new("memo.txt", b"memo body".to_vec()).unwrap();
        let manifest = Manifest::for_document(&document).unwrap();
        let draft = EnvelopeDraft {
            sequence: None,
            signer_certificate_der: vec![1, 2, 3],
            signature_algorithm: SignatureAlgorithm::Ed25519,
            signature: vec![9; 64],
            document_digest: sha256_digest(b"memo body"),
            timestamp_token: None,
            timestamp_scope: TimestampScope::Signature,
            message: String::new(),
            created_at: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
        };
        let envelope = SignatureEnvelope::seal(draft, 1, "memo.txt").unwrap();
        Container::assemble(document, manifest, vec![envelope], Vec::new())
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn entry_names_are_zero_padded() {
        assert_eq!(signature_entry_name(1), "META-INF/signature-001.json");
        assert_eq!(signature_entry_name(1234), "META-INF/signature-1234.json");
        assert_eq!(parse_signature_entry_name("META-INF/signature-007.json"), Some(7));
        assert_eq!(parse_signature_entry_name("META-INF/signature-.json"), None);
        assert_eq!(parse_signature_entry_name("META-INF/signature-x1.json"), None);
        assert_eq!(parse_signature_entry_name("META-INF/signatures.xml"), None);
    }

    #[test]
    fn layout_puts_stored_mimetype_first() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(
            entry_names(&bytes),
            vec![
                "mimetype",
                "memo.txt",
                "META-INF/manifest.json",
                "META-INF/signature-001.json"
            ]
        );
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut mimetype = archive.by_index(0).unwrap();
        assert_eq!(mimetype.compression(), CompressionMethod::Stored);
        let mut content = String::new();
        mimetype.read_to_string(&mut content).unwrap();
        assert_eq!(content, MIMETYPE);
    }

    #[test]
    fn serialization_is_deterministic() {
        let c = sample();
        assert_eq!(c.to_bytes().unwrap(), c.to_bytes().unwrap());
    }

    #[test]
    fn decode_round_trip_preserves_everything() {
        let original = sample();
        let decoded = Container::from_bytes(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.next_sequence(), 2);
        assert_eq!(decoded.document().media_type(), "text/plain");
    }

    #[test]
    fn unknown_meta_inf_entries_survive() {
        let bytes = rewrite_entry(&sample().to_bytes().unwrap(), "META-INF/evidence.xml", b"<e/>");
        let decoded = Container::from_bytes(&bytes).unwrap();
        assert_eq!(
            decoded.extra_entries(),
            &[("META-INF/evidence.xml".to_string(), b"<e/>".to_vec())]
        );
        let again = Container::from_bytes(&decoded.to_bytes().unwrap()).unwrap();
        assert_eq!(again.extra_entries(), decoded.extra_entries());
    }

    #[test]
    fn not_a_zip_is_malformed() {
        assert!(matches!(
            Container::from_bytes(b"plainly not an archive"),
            Err(ContainerError::MalformedContainer(_))
        ));
    }

    #[test]
    fn wrong_mimetype_is_malformed() {
        let bytes = rewrite_entry(&sample().to_bytes().unwrap(), MIMETYPE_ENTRY, b"application/zip");
        let err = ContainerParts::read(&bytes).unwrap_err();
        assert!(err.to_string().contains("mimetype"));
    }

    #[test]
    fn mimetype_not_first_is_malformed() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("memo.txt", entry_options(CompressionMethod::Deflated))
            .unwrap();
        writer.write_all(b"memo").unwrap();
        writer
            .start_file(MIMETYPE_ENTRY, entry_options(CompressionMethod::Stored))
            .unwrap();
        writer.write_all(MIMETYPE.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let err = ContainerParts::read(&bytes).unwrap_err();
        assert!(err.to_string().contains("first entry"));
    }

    #[test]
    fn second_document_is_malformed() {
        let bytes = rewrite_entry(&sample().to_bytes().unwrap(), "other.txt", b"sneaky");
        assert!(ContainerParts::read(&bytes)
            .unwrap_err()
            .to_string()
            .contains("more than one document"));
    }

    #[test]
    fn corrupt_envelope_is_lenient_in_parts_but_strict_in_container() {
        let bytes = rewrite_entry(
            &sample().to_bytes().unwrap(),
            "META-INF/signature-001.json",
            b"{ broken",
        );
        let parts = ContainerParts::read(&bytes).unwrap();
        assert_eq!(parts.signatures.len(), 1);
        assert!(matches!(
            Container::from_bytes(&bytes),
            Err(ContainerError::MalformedContainer(_))
        ));
    }

    #[test]
    fn duplicate_sequence_is_kept_in_parts_but_refused_for_appending() {
        let original = sample().to_bytes().unwrap();
        let envelope = sample().envelopes()[0].as_json().to_vec();
        let bytes = rewrite_entry(&original, "META-INF/signature-1.json", &envelope);

        let parts = ContainerParts::read(&bytes).unwrap();
        let names: Vec<&str> = parts.signatures.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["META-INF/signature-001.json", "META-INF/signature-1.json"]);

        let err = Container::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ContainerError::MalformedContainer(_)));
        assert!(err.to_string().contains("share sequence number 1"));
    }

    #[test]
    fn misnumbered_envelope_is_rejected() {
        let original = sample().to_bytes().unwrap();
        let envelope = sample().envelopes()[0].as_json().to_vec();
        let bytes = rewrite_entry(&original, "META-INF/signature-002.json", &envelope);
        assert!(Container::from_bytes(&bytes)
            .unwrap_err()
            .to_string()
            .contains("records sequence 1 at position 2"));
    }
}
