//! # Verify Subcommand
//!
//! Re-derives the validity of every signature in a container. Exit code
//! `0` when the container is valid, `2` when it is not, `1` when the file
//! is not a readable container at all.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use govsign_asic::{ContainerVerifier, TimestampStatus, VerificationResult};
use govsign_core::Timestamp;

/// Exit code for a container that reads but does not verify.
pub const EXIT_INVALID: u8 = 2;

/// Arguments for the `govsign verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Container to verify.
    pub container: PathBuf,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Judge certificate validity at this RFC 3339 instant instead of now.
    #[arg(long)]
    pub at: Option<String>,
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let bytes = crate::read_input(&args.container)?;
    let mut verifier = ContainerVerifier::default();
    if let Some(at) = &args.at {
        let at = Timestamp::parse(at).with_context(|| format!("invalid --at value {at:?}"))?;
        verifier = verifier.at(at);
    }

    let result = verifier
        .verify_bytes(&bytes)
        .with_context(|| format!("cannot verify {}", args.container.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_report(&result));
    }

    if result.valid {
        Ok(0)
    } else {
        for failure in result.failures() {
            tracing::warn!(
                sequence = failure.sequence,
                code = %failure.code,
                "signature failed verification"
            );
        }
        Ok(EXIT_INVALID)
    }
}

/// Human-readable report, one block per signature.
pub fn render_report(result: &VerificationResult) -> String {
    let mut out = String::new();
    let verdict = if result.valid { "VALID" } else { "INVALID" };
    let _ = writeln!(out, "{verdict}: {}", result.message);
    let _ = writeln!(
        out,
        "Document: {} ({} bytes, {})",
        result.document_name, result.document_size, result.media_type
    );
    let _ = writeln!(out, "Signatures: {}", result.signature_count);

    for sig in &result.signatures {
        let mark = if sig.valid { "OK  " } else { "FAIL" };
        let _ = writeln!(out, "  [{}] {mark} {}", sig.sequence, sig.code);
        if let Some(name) = &sig.signer_name {
            let _ = writeln!(out, "      Signer:    {name}");
        }
        if let Some(issuer) = &sig.certificate_issuer {
            let _ = writeln!(out, "      Issuer:    {issuer}");
        }
        if let Some(created) = &sig.created_at {
            let _ = writeln!(out, "      Signed at: {created}");
        }
        let timestamp = match (sig.timestamp_status, &sig.timestamp) {
            (TimestampStatus::Absent, _) => None,
            (TimestampStatus::ImprintVerified, Some(at)) => Some(format!("{at} (imprint verified)")),
            (TimestampStatus::ImprintVerified, None) => Some("imprint verified".to_string()),
            (TimestampStatus::Opaque, _) => Some("present, not readable".to_string()),
            (TimestampStatus::Invalid, _) => Some("INVALID".to_string()),
        };
        if let Some(timestamp) = timestamp {
            let _ = writeln!(out, "      Timestamp: {timestamp}");
        }
        if !sig.valid {
            let _ = writeln!(out, "      Reason:    {}", sig.message);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{run_keygen, KeyFiles, KeygenArgs};
    use crate::sign::{run_sign, SignArgs, SignerArgs};

    fn signed_container(dir: &std::path::Path, content: &[u8]) -> PathBuf {
        let prefix = dir.join("alice");
        run_keygen(&KeygenArgs {
            out: prefix.clone(),
            subject: "CN=Alice".to_string(),
            valid_days: 30,
            force: false,
        })
        .unwrap();
        let files = KeyFiles::for_prefix(&prefix);

        let doc = dir.join("contract.txt");
        std::fs::write(&doc, content).unwrap();
        let out = dir.join("contract.asice");
        run_sign(&SignArgs {
            document: doc,
            out: out.clone(),
            media_type: None,
            signer: SignerArgs {
                key: files.key,
                cert: files.certificate,
                message: String::new(),
                tsa_url: None,
                tsa_env: false,
                stub_tsa: true,
                timestamp_scope: None,
            },
        })
        .unwrap();
        out
    }

    fn verify_args(container: PathBuf) -> VerifyArgs {
        VerifyArgs {
            container,
            json: false,
            at: None,
        }
    }

    #[test]
    fn valid_container_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = signed_container(dir.path(), b"ORIGINAL CONTRACT CONTENT");
        assert_eq!(run_verify(&verify_args(path)).unwrap(), 0);
    }

    #[test]
    fn certificate_judged_at_reference_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = signed_container(dir.path(), b"memo");
        let mut args = verify_args(path);
        args.at = Some("2199-01-01T00:00:00Z".to_string());
        args.json = true;
        assert_eq!(run_verify(&args).unwrap(), EXIT_INVALID);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.asice");
        std::fs::write(&path, b"PK but not really").unwrap();
        assert!(run_verify(&verify_args(path)).is_err());
    }

    #[test]
    fn bad_reference_time_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = signed_container(dir.path(), b"memo");
        let mut args = verify_args(path);
        args.at = Some("yesterday".to_string());
        let err = run_verify(&args).unwrap_err();
        assert!(err.to_string().contains("invalid --at value"));
    }

    #[test]
    fn report_lists_each_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = signed_container(dir.path(), b"memo");
        let result = ContainerVerifier::default()
            .verify_bytes(&std::fs::read(path).unwrap())
            .unwrap();

        let report = render_report(&result);
        assert!(report.starts_with("VALID: "));
        assert!(report.contains("Document: contract.txt (4 bytes, text/plain)"));
        assert!(report.contains("[1] OK   VALID"));
        assert!(report.contains("Signer:    "));
        assert!(report.contains("(imprint verified)"));
        assert!(!report.contains("Reason:"));
    }
}
