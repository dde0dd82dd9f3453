//! # Inspect Subcommand
//!
//! Lists what a container holds without judging it: the document, each
//! signature entry as recorded, and any extra `META-INF/` entries. Works on
//! containers whose envelopes no longer decode, which `verify` would only
//! report as failures.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use govsign_asic::{ContainerParts, SignatureEnvelope};
use govsign_core::DigestAlgorithm;
use govsign_crypto::SignerCertificate;

/// Arguments for the `govsign inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Container to inspect.
    pub container: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write the signed document to this path.
    #[arg(long)]
    pub extract: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub document_name: String,
    pub media_type: String,
    pub document_size: usize,
    pub document_sha256: String,
    pub signatures: Vec<EntrySummary>,
    pub extra_entries: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub entry: String,
    pub sequence: u32,
    /// Set when the envelope JSON does not decode.
    pub error: Option<String>,
    pub signer: Option<String>,
    pub signature_algorithm: Option<String>,
    pub digest_algorithm: Option<String>,
    pub created_at: Option<String>,
    pub timestamped: bool,
    pub message: Option<String>,
}

impl EntrySummary {
    fn from_entry(name: &str, sequence: u32, bytes: &[u8]) -> Self {
        let mut summary = Self {
            entry: name.to_string(),
            sequence,
            error: None,
            signer: None,
            signature_algorithm: None,
            digest_algorithm: None,
            created_at: None,
            timestamped: false,
            message: None,
        };
        match SignatureEnvelope::from_json(bytes) {
            Ok(envelope) => {
                summary.signer = SignerCertificate::from_der(envelope.signer_certificate_der())
                    .ok()
                    .map(|cert| cert.subject().to_string());
                summary.signature_algorithm = Some(envelope.signature_algorithm().to_string());
                summary.digest_algorithm = Some(envelope.digest_algorithm().to_string());
                summary.created_at = Some(envelope.created_at().to_string());
                summary.timestamped = envelope.timestamp_token().is_some();
                summary.message = Some(envelope.message().to_string()).filter(|m| !m.is_empty());
            }
            Err(e) => summary.error = Some(e.to_string()),
        }
        summary
    }
}

/// Summarise a container read from `bytes`.
pub fn summarize(bytes: &[u8]) -> Result<(ContainerSummary, ContainerParts)> {
    let parts = ContainerParts::read(bytes)?;
    let summary = ContainerSummary {
        document_name: parts.document.name().to_string(),
        media_type: parts.document.media_type().to_string(),
        document_size: parts.document.len(),
        document_sha256: parts.document.digest(DigestAlgorithm::Sha256).to_hex(),
        signatures: parts
            .signatures
            .iter()
            .map(|e| EntrySummary::from_entry(&e.name, e.sequence, &e.bytes))
            .collect(),
        extra_entries: parts.extra_entries.iter().map(|(name, _)| name.clone()).collect(),
    };
    Ok((summary, parts))
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let bytes = crate::read_input(&args.container)?;
    let (summary, parts) = summarize(&bytes)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Document: {}", summary.document_name);
        println!("  Media type: {}", summary.media_type);
        println!("  Size:       {} bytes", summary.document_size);
        println!("  SHA-256:    {}", summary.document_sha256);
        println!("Signatures: {}", summary.signatures.len());
        for sig in &summary.signatures {
            match &sig.error {
                Some(e) => println!("  [{}] {} (undecodable: {e})", sig.sequence, sig.entry),
                None => println!(
                    "  [{}] {} by {} at {}{}",
                    sig.sequence,
                    sig.signature_algorithm.as_deref().unwrap_or("?"),
                    sig.signer.as_deref().unwrap_or("<unreadable certificate>"),
                    sig.created_at.as_deref().unwrap_or("?"),
                    if sig.timestamped { ", timestamped" } else { "" }
                ),
            }
            if let Some(message) = &sig.message {
                println!("      \"{message}\"");
            }
        }
        for name in &summary.extra_entries {
            println!("Extra entry: {name}");
        }
    }

    if let Some(path) = &args.extract {
        crate::write_output(path, parts.document.bytes())?;
        tracing::info!(path = %path.display(), "extracted document");
    }
    Ok(0)
}
