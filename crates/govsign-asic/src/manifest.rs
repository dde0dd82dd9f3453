//! Container manifest (`META-INF/manifest.json`): the name and MIME type
//! of the single document at the archive root.

use govsign_core::Document;
use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

/// Parsed manifest plus the bytes it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    document_name: String,
    media_type: String,
    #[serde(skip)]
    encoded: Vec<u8>,
}

impl Manifest {
    pub fn for_document(document: &Document) -> Result<Self, ContainerError> {
        let mut manifest = Self {
            document_name: document.name().to_string(),
            media_type: document.media_type().to_string(),
            encoded: Vec::new(),
        };
        manifest.encoded = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| ContainerError::Serialization(e.to_string()))?;
        Ok(manifest)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| ContainerError::MalformedContainer(format!("manifest: {e}")))?;
        manifest.encoded = bytes.to_vec();
        Ok(manifest)
    }

    pub fn as_json(&self) -> &[u8] {
        &self.encoded
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}
