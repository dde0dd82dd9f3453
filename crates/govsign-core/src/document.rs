//! # Document
//!
//! The unit being signed: a filename, a declared MIME type, and the raw
//! bytes. A `Document` never changes after construction. Its filename is
//! used verbatim as the root entry name inside a container, so names that
//! could collide with container metadata or escape the archive root are
//! refused up front.

use crate::digest::{Digest, DigestAlgorithm};
use crate::error::CoreError;

/// MIME type used when none is declared and the extension is unknown.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// An immutable document: filename, MIME type, and content bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl Document {
    /// Create a document, guessing the MIME type from the filename extension.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let name = name.into();
        validate_name(&name)?;
        let media_type = media_type_for(&name).to_string();
        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }

    /// Replace the MIME type. The value must look like `type/subtype`.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Result<Self, CoreError> {
        let media_type = media_type.into();
        let valid = match media_type.split_once('/') {
            Some((ty, sub)) => {
                !ty.is_empty()
                    && !sub.is_empty()
                    && !media_type.chars().any(|c| c.is_whitespace() || c.is_control())
            }
            None => false,
        };
        if !valid {
            return Err(CoreError::InvalidMediaType(media_type));
        }
        self.media_type = media_type;
        Ok(self)
    }

    /// Filename as stored at the container root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Document content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the document, returning its content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Digest of the content under `algorithm`.
    pub fn digest(&self, algorithm: DigestAlgorithm) -> Digest {
        algorithm.digest(&self.bytes)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    let reject = |reason: &str| {
        Err(CoreError::InvalidDocumentName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.is_empty() {
        return reject("empty");
    }
    if name == "." || name == ".." {
        return reject("relative path component");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("must not contain path separators");
    }
    if name.chars().any(char::is_control) {
        return reject("must not contain control characters");
    }
    if name == "mimetype" {
        return reject("collides with the container mimetype entry");
    }
    if name.eq_ignore_ascii_case("META-INF") {
        return reject("collides with the container metadata directory");
    }
    Ok(())
}

/// Guess a MIME type from a filename extension.
pub fn media_type_for(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_MEDIA_TYPE,
    };
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_guesses_media_type() {
        let doc = Document::new("contract.pdf", b"%PDF-1.7".to_vec()).unwrap();
        assert_eq!(doc.name(), "contract.pdf");
        assert_eq!(doc.media_type(), "application/pdf");
        assert_eq!(doc.len(), 8);
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(media_type_for("blob.bin"), DEFAULT_MEDIA_TYPE);
        assert_eq!(media_type_for("README"), DEFAULT_MEDIA_TYPE);
        assert_eq!(media_type_for("NOTES.TXT"), "text/plain");
    }

    #[test]
    fn reserved_names_rejected() {
        for bad in ["", ".", "..", "mimetype", "META-INF", "a/b.pdf", "a\\b.pdf", "x\n.pdf"] {
            assert!(Document::new(bad, vec![1]).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn with_media_type_validates() {
        let doc = Document::new("c.bin", vec![]).unwrap();
        assert!(doc.clone().with_media_type("text/plain").is_ok());
        assert!(doc.clone().with_media_type("textplain").is_err());
        assert!(doc.clone().with_media_type("text/").is_err());
        assert!(doc.with_media_type("text/ plain").is_err());
    }

    #[test]
    fn empty_document_is_representable() {
        let doc = Document::new("empty.txt", Vec::new()).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn digest_tracks_content() {
        let a = Document::new("c.txt", b"ORIGINAL CONTRACT CONTENT".to_vec()).unwrap();
        let b = Document::new("c.txt", b"TAMPERED CONTRACT CONTENT".to_vec()).unwrap();
        assert!(!a
            .digest(DigestAlgorithm::Sha256)
            .matches(&b.digest(DigestAlgorithm::Sha256)));
    }

    #[test]
    fn debug_omits_content() {
        let doc = Document::new("c.txt", b"confidential terms".to_vec()).unwrap();
        assert!(!format!("{doc:?}").contains("confidential"));
    }
}
