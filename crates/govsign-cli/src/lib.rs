//! # govsign-cli: CLI Tool for govsign
//!
//! Provides the `govsign` command-line interface over the container,
//! crypto, and timestamp crates.
//!
//! ## Subcommands
//!
//! - `govsign keygen`: Ed25519 signer key plus a self-signed certificate.
//! - `govsign sign`: Sign a document into a new ASiC-E container.
//! - `govsign countersign`: Add the next signature to an existing container.
//! - `govsign verify`: Verify every signature, as text or `--json`.
//! - `govsign inspect`: Show a container's contents without judging them.
//! - `govsign ts-query`: Write a DER TimeStampReq, like `openssl ts -query`.
//!
//! ## Exit Codes
//!
//! `0` on success (and for `verify`, a valid container), `2` when `verify`
//! finds the container invalid, `1` on any error.
//!
//! ```bash
//! govsign keygen --out alice --subject "CN=Alice,O=Ministry of Finance"
//! govsign sign contract.pdf --key alice.key --cert alice.crt --out contract.asice
//! govsign countersign contract.asice --key bob.key --cert bob.crt --out contract.asice
//! govsign verify contract.asice --json
//! ```

pub mod inspect;
pub mod keys;
pub mod sign;
pub mod ts_query;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a whole input file, naming it in the error.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Write an output file, creating parent directories as needed.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
