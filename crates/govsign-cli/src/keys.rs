//! # Keygen Subcommand
//!
//! Generates an Ed25519 signer key and a self-signed certificate for it,
//! and loads them back for `sign` and `countersign`.
//!
//! For `--out alice` three files are written:
//!
//! - `alice.key`: hex-encoded 32-byte seed (mode 0600 on Unix).
//! - `alice.pub`: hex-encoded public key.
//! - `alice.crt`: DER X.509 certificate embedded into every envelope.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use govsign_asic::SignerIdentity;
use govsign_core::{hex, Timestamp};
use govsign_crypto::{
    issue_self_signed, Ed25519KeyPair, SignatureAlgorithm, SignerCertificate, SoftwareKeyProvider,
};

const SECS_PER_DAY: i64 = 86_400;

/// Arguments for the `govsign keygen` subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output path prefix. `.key`, `.pub` and `.crt` are appended.
    #[arg(long)]
    pub out: PathBuf,

    /// Certificate subject as an RFC 4514 name.
    #[arg(long, default_value = "CN=govsign signer")]
    pub subject: String,

    /// Certificate lifetime in days, starting now.
    #[arg(long, default_value_t = 365)]
    pub valid_days: u32,

    /// Overwrite existing files.
    #[arg(long)]
    pub force: bool,
}

/// Paths of the three files belonging to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub key: PathBuf,
    pub public: PathBuf,
    pub certificate: PathBuf,
}

impl KeyFiles {
    pub fn for_prefix(prefix: &Path) -> Self {
        let with_ext = |ext: &str| {
            let mut name = prefix.as_os_str().to_owned();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        };
        Self {
            key: with_ext("key"),
            public: with_ext("pub"),
            certificate: with_ext("crt"),
        }
    }
}

/// Execute the keygen subcommand.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let files = KeyFiles::for_prefix(&args.out);
    if !args.force {
        for path in [&files.key, &files.public, &files.certificate] {
            if path.exists() {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
        }
    }
    if args.valid_days == 0 {
        bail!("--valid-days must be at least 1");
    }

    let key = Ed25519KeyPair::generate();
    let not_before = Timestamp::now();
    let not_after =
        Timestamp::from_epoch_secs(not_before.epoch_secs() + i64::from(args.valid_days) * SECS_PER_DAY)
            .context("certificate expiry out of range")?;
    let certificate = issue_self_signed(&key, &args.subject, not_before, not_after)
        .with_context(|| format!("failed to issue certificate for {:?}", args.subject))?;

    let seed_hex = Zeroizing::new(hex::encode(key.to_seed().as_slice()));
    write_secret(&files.key, seed_hex.as_bytes())?;
    crate::write_output(&files.public, key.public_key().to_hex().as_bytes())?;
    crate::write_output(&files.certificate, &certificate)?;

    tracing::info!(
        public_key = %key.public_key(),
        subject = %args.subject,
        "generated signer key"
    );
    println!("OK: generated Ed25519 key {}", key.public_key().to_hex());
    println!("  Key:         {}", files.key.display());
    println!("  Public key:  {}", files.public.display());
    println!("  Certificate: {}", files.certificate.display());
    println!("  Valid until: {not_after}");
    Ok(0)
}

/// Load a signer key and certificate into a software provider.
///
/// Fails when the certificate does not certify the key.
pub fn load_signer(key_path: &Path, cert_path: &Path) -> Result<(SoftwareKeyProvider, SignerIdentity)> {
    let raw = Zeroizing::new(
        std::fs::read_to_string(key_path)
            .with_context(|| format!("failed to read key file {}", key_path.display()))?,
    );
    let mut provider = SoftwareKeyProvider::new();
    let key_id = provider
        .import_hex_seed(SignatureAlgorithm::Ed25519, raw.trim())
        .with_context(|| format!("invalid key file {}", key_path.display()))?;

    let certificate_der = crate::read_input(cert_path)?;
    let certificate = SignerCertificate::from_der(&certificate_der)
        .with_context(|| format!("invalid certificate {}", cert_path.display()))?;
    if hex::encode(certificate.public_key()) != key_id {
        bail!(
            "certificate {} does not certify the key in {}",
            cert_path.display(),
            key_path.display()
        );
    }

    let identity = SignerIdentity {
        key_id,
        certificate_der,
        algorithm: SignatureAlgorithm::Ed25519,
    };
    Ok((provider, identity))
}

fn write_secret(path: &Path, bytes: &[u8]) -> Result<()> {
    crate::write_output(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keygen_args(out: PathBuf) -> KeygenArgs {
        KeygenArgs {
            out,
            subject: "CN=Alice,O=Ministry of Finance".to_string(),
            valid_days: 30,
            force: false,
        }
    }

    #[test]
    fn key_files_append_extensions() {
        let files = KeyFiles::for_prefix(Path::new("/keys/alice.v2"));
        assert_eq!(files.key, PathBuf::from("/keys/alice.v2.key"));
        assert_eq!(files.public, PathBuf::from("/keys/alice.v2.pub"));
        assert_eq!(files.certificate, PathBuf::from("/keys/alice.v2.crt"));
    }

    #[test]
    fn keygen_writes_loadable_key() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("alice");
        assert_eq!(run_keygen(&keygen_args(prefix.clone())).unwrap(), 0);

        let files = KeyFiles::for_prefix(&prefix);
        let (_, identity) = load_signer(&files.key, &files.certificate).unwrap();
        let public_hex = std::fs::read_to_string(&files.public).unwrap();
        assert_eq!(identity.key_id, public_hex);
        assert_eq!(identity.algorithm, SignatureAlgorithm::Ed25519);

        let cert = SignerCertificate::from_der(&identity.certificate_der).unwrap();
        assert!(cert.subject().contains("CN=Alice"));
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("alice");
        run_keygen(&keygen_args(prefix.clone())).unwrap();
        let mode = std::fs::metadata(KeyFiles::for_prefix(&prefix).key)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn keygen_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("alice");
        run_keygen(&keygen_args(prefix.clone())).unwrap();

        let err = run_keygen(&keygen_args(prefix.clone())).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let mut forced = keygen_args(prefix);
        forced.force = true;
        assert_eq!(run_keygen(&forced).unwrap(), 0);
    }

    #[test]
    fn keygen_rejects_zero_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = keygen_args(dir.path().join("alice"));
        args.valid_days = 0;
        assert!(run_keygen(&args).is_err());
    }

    #[test]
    fn load_signer_rejects_foreign_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let alice = dir.path().join("alice");
        let bob = dir.path().join("bob");
        run_keygen(&keygen_args(alice.clone())).unwrap();
        run_keygen(&keygen_args(bob.clone())).unwrap();

        let err = load_signer(
            &KeyFiles::for_prefix(&alice).key,
            &KeyFiles::for_prefix(&bob).certificate,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not certify"));
    }

    #[test]
    fn load_signer_rejects_garbage_key() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("alice");
        run_keygen(&keygen_args(prefix.clone())).unwrap();
        let files = KeyFiles::for_prefix(&prefix);
        std::fs::write(&files.key, "not hex at all").unwrap();
        assert!(load_signer(&files.key, &files.certificate).is_err());
    }
}
