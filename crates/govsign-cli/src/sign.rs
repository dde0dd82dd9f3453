//! # Sign and Countersign Subcommands
//!
//! `sign` wraps a document into a new container with signature 1.
//! `countersign` reads a container and writes a new one with the next
//! signature appended; the input file is only replaced when `--out` names
//! the same path.
//!
//! Signing runs the async flow from `govsign-asic` on a current-thread
//! runtime. Deadlines and the digest algorithm come from `GOVSIGN_*`
//! environment variables (see [`SigningConfig::from_env`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use govsign_asic::{
    Container, ContainerSigner, SignerIdentity, SigningConfig, SigningOutcome, TimestampOutcome,
    TimestampScope,
};
use govsign_core::Document;
use govsign_crypto::KeyProvider;
use govsign_tsp::{HttpTsaClient, StubTimestampAuthority, TimestampAuthority, TsaConfig};

use crate::keys::load_signer;

/// Signer key, message, and timestamp options shared by sign and countersign.
#[derive(Args, Debug, Clone)]
pub struct SignerArgs {
    /// Hex seed file written by `govsign keygen`.
    #[arg(long)]
    pub key: PathBuf,

    /// DER certificate for the key.
    #[arg(long)]
    pub cert: PathBuf,

    /// Free-text message recorded in the envelope.
    #[arg(long, default_value = "")]
    pub message: String,

    /// RFC 3161 TSA endpoint to timestamp the signature with.
    #[arg(long, conflicts_with_all = ["tsa_env", "stub_tsa"])]
    pub tsa_url: Option<url::Url>,

    /// Read the TSA endpoint and credentials from `GOVSIGN_TSA_*`.
    #[arg(long, conflicts_with = "stub_tsa")]
    pub tsa_env: bool,

    /// Timestamp with the built-in development authority. Its tokens are
    /// not trustworthy.
    #[arg(long)]
    pub stub_tsa: bool,

    /// What the timestamp covers: `signature` or `content`.
    #[arg(long)]
    pub timestamp_scope: Option<TimestampScope>,
}

/// Arguments for the `govsign sign` subcommand.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Document to sign.
    pub document: PathBuf,

    /// Container to write.
    #[arg(long, short)]
    pub out: PathBuf,

    /// Declared MIME type. Guessed from the file extension when omitted.
    #[arg(long)]
    pub media_type: Option<String>,

    #[command(flatten)]
    pub signer: SignerArgs,
}

/// Arguments for the `govsign countersign` subcommand.
#[derive(Args, Debug)]
pub struct CountersignArgs {
    /// Existing container.
    pub container: PathBuf,

    /// Container to write. May be the input path.
    #[arg(long, short)]
    pub out: PathBuf,

    #[command(flatten)]
    pub signer: SignerArgs,
}

/// Execute the sign subcommand.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let bytes = crate::read_input(&args.document)?;
    let name = args
        .document
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", args.document.display()))?;
    let mut document = Document::new(name, bytes)?;
    if let Some(media_type) = &args.media_type {
        document = document.with_media_type(media_type.as_str())?;
    }

    let (signer, identity) = build_signer(&args.signer)?;
    let outcome = runtime()?
        .block_on(signer.sign(document, &identity, &args.signer.message))
        .context("signing failed")?;

    finish(&outcome, &args.out)
}

/// Execute the countersign subcommand.
pub fn run_countersign(args: &CountersignArgs) -> Result<u8> {
    let bytes = crate::read_input(&args.container)?;
    let container = Container::from_bytes(&bytes)
        .with_context(|| format!("cannot countersign {}", args.container.display()))?;

    let (signer, identity) = build_signer(&args.signer)?;
    let outcome = runtime()?
        .block_on(signer.countersign(&container, &identity, &args.signer.message))
        .context("countersigning failed")?;

    finish(&outcome, &args.out)
}

fn build_signer(args: &SignerArgs) -> Result<(ContainerSigner, SignerIdentity)> {
    let (provider, identity) = load_signer(&args.key, &args.cert)?;
    let mut config = SigningConfig::from_env()?;
    if let Some(scope) = args.timestamp_scope {
        config.timestamp_scope = scope;
    }

    let keys: Arc<dyn KeyProvider> = Arc::new(provider);
    let mut signer = ContainerSigner::new(keys, config);
    if let Some(tsa) = timestamp_authority(args)? {
        signer = signer.with_timestamp_authority(tsa);
    }
    Ok((signer, identity))
}

fn timestamp_authority(args: &SignerArgs) -> Result<Option<Arc<dyn TimestampAuthority>>> {
    if args.stub_tsa {
        tracing::warn!("using the development timestamp authority");
        return Ok(Some(Arc::new(StubTimestampAuthority::new())));
    }
    let config = match (&args.tsa_url, args.tsa_env) {
        (Some(url), _) => TsaConfig::new(url.clone()),
        (None, true) => TsaConfig::from_env()?,
        (None, false) => return Ok(None),
    };
    let client = HttpTsaClient::new(config).context("failed to build TSA client")?;
    Ok(Some(Arc::new(client)))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn finish(outcome: &SigningOutcome, out: &Path) -> Result<u8> {
    let bytes = outcome.container.to_bytes()?;
    crate::write_output(out, &bytes)?;

    println!(
        "OK: {} signed as signature {} ({} total)",
        outcome.container.document().name(),
        outcome.sequence,
        outcome.container.len()
    );
    println!("  Container: {}", out.display());
    match &outcome.timestamp {
        TimestampOutcome::NotRequested => {}
        TimestampOutcome::Stamped { gen_time: Some(at) } => println!("  Timestamp: {at}"),
        TimestampOutcome::Stamped { gen_time: None } => {
            println!("  Timestamp: present (no readable genTime)")
        }
        TimestampOutcome::Failed(e) => {
            tracing::warn!(error = %e, "signature sealed without a timestamp");
            println!("  Timestamp: FAILED ({e})");
        }
    }
    Ok(0)
}
