//! # govsign-crypto: Signature Capabilities
//!
//! The signature primitives the container layer treats as black boxes:
//!
//! - [`KeyProvider`]: `external_sign(keyHandle, digest, algorithm)`.
//! - [`VerifierRegistry`] / [`SignatureVerifier`]: `external_verify`.
//! - [`SignerCertificate`]: the facts a verifier reads from a signer's
//!   X.509 certificate.
//!
//! Ed25519 is implemented in-process. Post-quantum algorithms are named in
//! [`SignatureAlgorithm`] and plug in through the same traits.
//!
//! ## Crate Policy
//!
//! - Depends only on `govsign-core` internally.
//! - Private key material never appears in `Debug` output and is zeroized
//!   on drop.

pub mod algorithm;
pub mod certificate;
pub mod ed25519;
pub mod error;
pub mod provider;
pub mod verifier;

pub use algorithm::SignatureAlgorithm;
pub use certificate::{issue_certificate, issue_self_signed, SignerCertificate, ValidityStatus};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use provider::{KeyMetadata, KeyProvider, SoftwareKeyProvider};
pub use verifier::{Ed25519Verifier, SignatureVerifier, VerifierRegistry};
