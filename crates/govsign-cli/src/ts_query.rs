//! # ts-query Subcommand
//!
//! Writes a DER-encoded RFC 3161 TimeStampReq, the same artifact
//! `openssl ts -query` produces, so requests can be inspected or sent to a
//! TSA with other tools.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use govsign_core::{Digest, DigestAlgorithm};
use govsign_tsp::{Oid, TimeStampReq};

/// Arguments for the `govsign ts-query` subcommand.
#[derive(Args, Debug)]
pub struct TsQueryArgs {
    /// File whose contents are hashed into the message imprint.
    #[arg(long, required_unless_present = "digest", conflicts_with = "digest")]
    pub data: Option<PathBuf>,

    /// Precomputed hex digest to use as the message imprint.
    #[arg(long)]
    pub digest: Option<String>,

    /// Hash algorithm for the imprint.
    #[arg(long, default_value = "sha256")]
    pub hash: DigestAlgorithm,

    /// Omit the nonce.
    #[arg(long)]
    pub no_nonce: bool,

    /// Ask the TSA to include its certificate (`certReq`).
    #[arg(long)]
    pub cert: bool,

    /// Requested TSA policy OID.
    #[arg(long)]
    pub policy: Option<Oid>,

    /// Where to write the DER request.
    #[arg(long, short)]
    pub out: PathBuf,
}

/// Build the request described by `args`.
pub fn build_request(args: &TsQueryArgs) -> Result<TimeStampReq> {
    let digest = match (&args.data, &args.digest) {
        (Some(path), _) => args.hash.digest(&crate::read_input(path)?),
        (None, Some(hex)) => Digest::from_hex(args.hash, hex.trim())
            .with_context(|| format!("--digest is not a {} digest", args.hash))?,
        (None, None) => bail!("either --data or --digest is required"),
    };

    let mut request = TimeStampReq::new(digest).with_cert_req(args.cert);
    if !args.no_nonce {
        request = request.with_random_nonce();
    }
    if let Some(policy) = &args.policy {
        request = request.with_policy(policy.clone());
    }
    Ok(request)
}

/// Execute the ts-query subcommand.
pub fn run_ts_query(args: &TsQueryArgs) -> Result<u8> {
    let request = build_request(args)?;
    let der = request.to_der()?;
    crate::write_output(&args.out, &der)?;

    tracing::debug!(bytes = der.len(), "encoded timestamp request");
    println!("OK: wrote timestamp request to {}", args.out.display());
    println!("  Imprint: {}", request.message_imprint().digest());
    if let Some(nonce) = request.nonce() {
        println!("  Nonce:   {nonce:#018x}");
    }
    Ok(0)
}
