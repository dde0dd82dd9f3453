//! # govsign-asic: Multi-Party Signature Containers
//!
//! The container and protocol layer of govsign:
//!
//! - **Envelope** ([`envelope`]): one signer's contribution, immutable once
//!   sealed.
//! - **Container** ([`container`]): the ASiC-E ZIP layout, read and
//!   written.
//! - **Packer** ([`packer`]): `pack` and `append`, which assign sequence
//!   numbers and never modify their input.
//! - **Signer** ([`signer`]): the async signing flow over a
//!   [`KeyProvider`](govsign_crypto::KeyProvider) and an optional
//!   [`TimestampAuthority`](govsign_tsp::TimestampAuthority).
//! - **Verifier** ([`verifier`]): independent re-derivation of every
//!   envelope's validity into a [`VerificationResult`].
//!
//! ## What Is Signed
//!
//! Every envelope signs the raw bytes of the document digest, computed
//! with the digest algorithm recorded in that envelope. Timestamps are
//! requested over the signature bytes by default, or over the document
//! bytes when the envelope records `content` scope.

pub mod config;
pub mod container;
pub mod envelope;
pub mod error;
pub mod manifest;
pub mod packer;
pub mod report;
pub mod signer;
pub mod verifier;

pub use config::{ConfigError, SigningConfig};
pub use container::{signature_entry_name, Container, ContainerParts, SignatureEntry, MIMETYPE};
pub use envelope::{EnvelopeDraft, SignatureEnvelope, TimestampScope};
pub use error::ContainerError;
pub use manifest::Manifest;
pub use packer::{append, pack};
pub use report::{SignatureVerdict, TimestampStatus, VerdictCode, VerificationResult};
pub use signer::{ContainerSigner, SignerIdentity, SigningOutcome, TimestampOutcome};
pub use verifier::{verify_container, ContainerVerifier};
