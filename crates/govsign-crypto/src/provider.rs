//! # Key Provider Abstraction
//!
//! The `external_sign` capability. A [`KeyProvider`] holds private keys
//! behind opaque handles and signs digests with them; callers never see
//! key bytes.
//!
//! - [`SoftwareKeyProvider`]: in-process Ed25519 keys, for development,
//!   tests, and the CLI.
//!
//! Hardware or remote backends implement the same trait.
//!
//! ## Security Invariants
//!
//! - Key material is zeroized on drop.
//! - `KeyProvider` is `Send + Sync` so it can be shared across async tasks.
//! - Signing input is a [`Digest`], never raw document bytes. The digest's
//!   bytes are the exact message handed to the signature primitive.

use std::collections::HashMap;

use govsign_core::{hex, Digest};
use zeroize::Zeroizing;

use crate::algorithm::SignatureAlgorithm;
use crate::ed25519::Ed25519KeyPair;
use crate::error::CryptoError;

/// Metadata about a managed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Opaque key handle.
    pub key_id: String,
    pub algorithm: SignatureAlgorithm,
    /// Whether the key may still sign.
    pub enabled: bool,
}

/// Signing backend.
///
/// `sign` failures (unknown handle, disabled key, algorithm mismatch) are
/// fatal to the calling operation and are not retried by callers.
pub trait KeyProvider: Send + Sync {
    /// Sign `digest` with the identified key using `algorithm`.
    fn sign(
        &self,
        key_id: &str,
        digest: &Digest,
        algorithm: SignatureAlgorithm,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Public key bytes for the identified key.
    fn public_key(&self, key_id: &str) -> Result<Vec<u8>, CryptoError>;

    fn key_metadata(&self, key_id: &str) -> Result<KeyMetadata, CryptoError>;

    fn list_keys(&self) -> Vec<String>;

    /// Name used in diagnostics.
    fn provider_name(&self) -> &str;
}

struct SoftwareKeyEntry {
    key: Ed25519KeyPair,
    enabled: bool,
}

/// In-process Ed25519 key provider.
///
/// Key handles are the hex-encoded public key.
pub struct SoftwareKeyProvider {
    keys: HashMap<String, SoftwareKeyEntry>,
}

impl SoftwareKeyProvider {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Generate a fresh key and return its handle.
    pub fn generate_key(&mut self, algorithm: SignatureAlgorithm) -> Result<String, CryptoError> {
        match algorithm {
            SignatureAlgorithm::Ed25519 => Ok(self.insert(Ed25519KeyPair::generate())),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Import a key from its seed and return its handle.
    pub fn import_key(
        &mut self,
        algorithm: SignatureAlgorithm,
        seed: &[u8],
    ) -> Result<String, CryptoError> {
        match algorithm {
            SignatureAlgorithm::Ed25519 => Ok(self.insert(Ed25519KeyPair::from_seed_slice(seed)?)),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Import a key from a hex-encoded seed, as stored in key files.
    pub fn import_hex_seed(
        &mut self,
        algorithm: SignatureAlgorithm,
        seed_hex: &str,
    ) -> Result<String, CryptoError> {
        let seed = Zeroizing::new(hex::decode(seed_hex)?);
        self.import_key(algorithm, &seed)
    }

    /// Prevent further signing with the key.
    pub fn disable_key(&mut self, key_id: &str) -> Result<(), CryptoError> {
        let entry = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| CryptoError::KeyNotFound(key_id.to_string()))?;
        entry.enabled = false;
        Ok(())
    }

    fn insert(&mut self, key: Ed25519KeyPair) -> String {
        let key_id = key.public_key().to_hex();
        self.keys
            .insert(key_id.clone(), SoftwareKeyEntry { key, enabled: true });
        key_id
    }

    fn entry(&self, key_id: &str) -> Result<&SoftwareKeyEntry, CryptoError> {
        self.keys
            .get(key_id)
            .ok_or_else(|| CryptoError::KeyNotFound(key_id.to_string()))
    }
}

impl Default for SoftwareKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SoftwareKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareKeyProvider")
            .field("key_ids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KeyProvider for SoftwareKeyProvider {
    fn sign(
        &self,
        key_id: &str,
        digest: &Digest,
        algorithm: SignatureAlgorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        let entry = self.entry(key_id)?;
        if !entry.enabled {
            return Err(CryptoError::KeyDisabled(key_id.to_string()));
        }
        if algorithm != SignatureAlgorithm::Ed25519 {
            return Err(CryptoError::AlgorithmMismatch {
                key: SignatureAlgorithm::Ed25519.to_string(),
                requested: algorithm.to_string(),
            });
        }
        tracing::debug!(key_id, digest = %digest, "software provider signing");
        Ok(entry.key.sign(digest.as_bytes()).as_bytes().to_vec())
    }

    fn public_key(&self, key_id: &str) -> Result<Vec<u8>, CryptoError> {
        Ok(self.entry(key_id)?.key.public_key().as_bytes().to_vec())
    }

    fn key_metadata(&self, key_id: &str) -> Result<KeyMetadata, CryptoError> {
        let entry = self.entry(key_id)?;
        Ok(KeyMetadata {
            key_id: key_id.to_string(),
            algorithm: SignatureAlgorithm::Ed25519,
            enabled: entry.enabled,
        })
    }

    fn list_keys(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn provider_name(&self) -> &str {
        "software"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519::{Ed25519PublicKey, Ed25519Signature};
    use govsign_core::digest;

    #[test]
    fn generate_sign_verify() {
        let mut provider = SoftwareKeyProvider::new();
        let id = provider.generate_key(SignatureAlgorithm::Ed25519).unwrap();
        let d = digest(b"ORIGINAL CONTRACT CONTENT");
        let sig = provider.sign(&id, &d, SignatureAlgorithm::Ed25519).unwrap();
        let pk = Ed25519PublicKey::from_slice(&provider.public_key(&id).unwrap()).unwrap();
        let sig = Ed25519Signature::from_slice(&sig).unwrap();
        assert!(pk.verify(d.as_bytes(), &sig).unwrap());
    }

    #[test]
    fn handle_is_public_key_hex() {
        let mut provider = SoftwareKeyProvider::new();
        let id = provider.import_key(SignatureAlgorithm::Ed25519, &[3u8; 32]).unwrap();
        assert_eq!(id, Ed25519KeyPair::from_seed(&[3u8; 32]).public_key().to_hex());
    }

    #[test]
    fn unknown_key_is_not_found() {
        let provider = SoftwareKeyProvider::new();
        let err = provider
            .sign("missing", &digest(b"x"), SignatureAlgorithm::Ed25519)
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyNotFound(_)));
    }

    #[test]
    fn algorithm_mismatch_rejected() {
        let mut provider = SoftwareKeyProvider::new();
        let id = provider.generate_key(SignatureAlgorithm::Ed25519).unwrap();
        let err = provider
            .sign(&id, &digest(b"x"), SignatureAlgorithm::MlDsa65)
            .unwrap_err();
        assert!(matches!(err, CryptoError::AlgorithmMismatch { .. }));
    }

    #[test]
    fn ml_dsa_generation_unsupported() {
        let mut provider = SoftwareKeyProvider::new();
        assert!(matches!(
            provider.generate_key(SignatureAlgorithm::MlDsa44),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn disabled_key_cannot_sign() {
        let mut provider = SoftwareKeyProvider::new();
        let id = provider.generate_key(SignatureAlgorithm::Ed25519).unwrap();
        provider.disable_key(&id).unwrap();
        assert!(!provider.key_metadata(&id).unwrap().enabled);
        assert!(matches!(
            provider.sign(&id, &digest(b"x"), SignatureAlgorithm::Ed25519),
            Err(CryptoError::KeyDisabled(_))
        ));
    }

    #[test]
    fn hex_seed_import() {
        let mut provider = SoftwareKeyProvider::new();
        let seed_hex = "11".repeat(32);
        let id = provider
            .import_hex_seed(SignatureAlgorithm::Ed25519, &seed_hex)
            .unwrap();
        assert_eq!(provider.list_keys(), vec![id]);
        assert!(provider
            .import_hex_seed(SignatureAlgorithm::Ed25519, "zz")
            .is_err());
    }

    #[test]
    fn trait_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn KeyProvider>();
        let _boxed: Box<dyn KeyProvider> = Box::new(SoftwareKeyProvider::new());
    }

    #[test]
    fn debug_lists_handles_only() {
        let mut provider = SoftwareKeyProvider::new();
        provider.import_key(SignatureAlgorithm::Ed25519, &[9u8; 32]).unwrap();
        let dbg = format!("{provider:?}");
        assert!(dbg.contains("key_ids"));
        assert!(!dbg.contains(&"09".repeat(32)));
    }
}
