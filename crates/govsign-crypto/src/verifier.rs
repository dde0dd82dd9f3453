//! # Signature Verifiers
//!
//! The `external_verify` capability. A [`SignatureVerifier`] checks one
//! signature against a public key; the [`VerifierRegistry`] dispatches by
//! [`SignatureAlgorithm`] so post-quantum backends can be plugged in
//! without touching the container verifier.
//!
//! The result distinguishes three outcomes:
//! - `Ok(true)`: the signature verifies.
//! - `Ok(false)`: well-formed inputs, signature does not verify.
//! - `Err(_)`: malformed key or signature, or no backend for the algorithm.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::algorithm::SignatureAlgorithm;
use crate::ed25519::{Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;

/// Verifies signatures for one algorithm.
pub trait SignatureVerifier: Send + Sync {
    fn algorithm(&self) -> SignatureAlgorithm;

    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError>;
}

/// Ed25519 verifier backed by `ed25519-dalek`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let pk = Ed25519PublicKey::from_slice(public_key)?;
        let sig = Ed25519Signature::from_slice(signature)?;
        pk.verify(message, &sig)
    }
}

/// Verifier lookup by algorithm.
#[derive(Clone)]
pub struct VerifierRegistry {
    verifiers: BTreeMap<SignatureAlgorithm, Arc<dyn SignatureVerifier>>,
}

impl VerifierRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            verifiers: BTreeMap::new(),
        }
    }

    /// Register a verifier, replacing any existing one for its algorithm.
    pub fn register(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifiers.insert(verifier.algorithm(), verifier);
        self
    }

    pub fn supports(&self, algorithm: SignatureAlgorithm) -> bool {
        self.verifiers.contains_key(&algorithm)
    }

    pub fn algorithms(&self) -> Vec<SignatureAlgorithm> {
        self.verifiers.keys().copied().collect()
    }

    /// Verify with the backend registered for `algorithm`.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let verifier = self
            .verifiers
            .get(&algorithm)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(algorithm.to_string()))?;
        verifier.verify(public_key, message, signature)
    }
}

impl Default for VerifierRegistry {
    /// Ed25519 only.
    fn default() -> Self {
        Self::empty().register(Arc::new(Ed25519Verifier))
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierRegistry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519::Ed25519KeyPair;

    struct AlwaysTrue(SignatureAlgorithm);

    impl SignatureVerifier for AlwaysTrue {
        fn algorithm(&self) -> SignatureAlgorithm {
            self.0
        }
        fn verify(&self, _: &[u8], _: &[u8], _: &[u8]) -> Result<bool, CryptoError> {
            Ok(true)
        }
    }

    #[test]
    fn default_registry_verifies_ed25519() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign(b"m");
        let reg = VerifierRegistry::default();
        assert!(reg
            .verify(
                SignatureAlgorithm::Ed25519,
                kp.public_key().as_bytes(),
                b"m",
                sig.as_bytes()
            )
            .unwrap());
        assert!(!reg
            .verify(
                SignatureAlgorithm::Ed25519,
                kp.public_key().as_bytes(),
                b"n",
                sig.as_bytes()
            )
            .unwrap());
    }

    #[test]
    fn truncated_signature_is_error_not_false() {
        let kp = Ed25519KeyPair::generate();
        let reg = VerifierRegistry::default();
        let err = reg
            .verify(SignatureAlgorithm::Ed25519, kp.public_key().as_bytes(), b"m", &[0u8; 10])
            .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSignatureLength { .. }));
    }

    #[test]
    fn missing_backend_is_unsupported() {
        let reg = VerifierRegistry::default();
        assert!(!reg.supports(SignatureAlgorithm::MlDsa65));
        assert!(matches!(
            reg.verify(SignatureAlgorithm::MlDsa65, &[], &[], &[]),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn custom_backend_can_be_registered() {
        let reg = VerifierRegistry::default().register(Arc::new(AlwaysTrue(SignatureAlgorithm::MlDsa44)));
        assert_eq!(
            reg.algorithms(),
            vec![SignatureAlgorithm::Ed25519, SignatureAlgorithm::MlDsa44]
        );
        assert!(reg
            .verify(SignatureAlgorithm::MlDsa44, &[], &[], &[])
            .unwrap());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::ed25519::Ed25519KeyPair;
    use proptest::prelude::*;

    proptest! {
        /// A signature verifies for exactly the message it was made over.
        #[test]
        fn signature_binds_message(
            seed in any::<[u8; 32]>(),
            message in prop::collection::vec(any::<u8>(), 0..128),
            flip in any::<prop::sample::Index>(),
        ) {
            let kp = Ed25519KeyPair::from_seed(&seed);
            let sig = kp.sign(&message);
            let reg = VerifierRegistry::default();
            let pk = kp.public_key();

            let ok = reg
                .verify(SignatureAlgorithm::Ed25519, pk.as_bytes(), &message, sig.as_bytes())
                .unwrap();
            prop_assert!(ok);

            if !message.is_empty() {
                let mut altered = message.clone();
                let i = flip.index(altered.len());
                altered[i] ^= 0x01;
                let ok = reg
                    .verify(SignatureAlgorithm::Ed25519, pk.as_bytes(), &altered, sig.as_bytes())
                    .unwrap();
                prop_assert!(!ok);
            }
        }
    }
}
