//! # govsign-core: Foundational Types
//!
//! The leaf crate of the govsign workspace. It defines the values every
//! other crate passes around:
//!
//! - [`Document`]: an immutable byte sequence with its filename and
//!   declared MIME type.
//! - [`Digest`] / [`DigestAlgorithm`]: the HashBinder. A digest is bound to
//!   exactly one document version; any change to the bytes changes it.
//! - [`Timestamp`]: UTC-only, seconds precision.
//! - [`CoreError`]: structured errors for the above.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `govsign-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod document;
pub mod error;
pub mod hex;
pub mod temporal;

pub use digest::{digest, sha256_digest, Digest, DigestAlgorithm};
pub use document::{media_type_for, Document, DEFAULT_MEDIA_TYPE};
pub use error::CoreError;
pub use temporal::Timestamp;
