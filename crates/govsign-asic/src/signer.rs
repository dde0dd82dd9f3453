//! # Signing Flow
//!
//! Drives one signer's contribution end to end: digest the document, call
//! the external signer, optionally obtain a timestamp, and hand the
//! resulting envelope to the packer.
//!
//! The external sign call runs on the blocking pool (providers may talk to
//! an HSM over a synchronous API) under `SigningConfig::sign_timeout`. A
//! sign failure or timeout fails the whole call and no envelope is
//! produced. A timestamp failure does not: the envelope is sealed without
//! a token and [`TimestampOutcome::Failed`] says why.

use std::sync::Arc;

use govsign_core::{Digest, Document, Timestamp};
use govsign_crypto::{KeyProvider, SignatureAlgorithm};
use govsign_tsp::{request_token, TimeStampReq, TimestampAuthority, TimestampError};

use crate::config::SigningConfig;
use crate::container::Container;
use crate::envelope::EnvelopeDraft;
use crate::error::ContainerError;
use crate::packer::{append, pack};

/// Who is signing: a key handle at the provider, the certificate binding
/// that key to a person, and the algorithm to sign with.
#[derive(Debug, Clone)]
pub struct SignerIdentity {
    pub key_id: String,
    pub certificate_der: Vec<u8>,
    pub algorithm: SignatureAlgorithm,
}

/// What happened to the timestamp request for a new envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampOutcome {
    /// No timestamp authority is configured.
    NotRequested,
    /// The envelope carries a token. `gen_time` is read from its TSTInfo.
    Stamped { gen_time: Option<Timestamp> },
    /// The envelope was sealed without a token.
    Failed(TimestampError),
}

impl TimestampOutcome {
    pub fn is_stamped(&self) -> bool {
        matches!(self, Self::Stamped { .. })
    }
}

/// A new container and what went into its newest envelope.
#[derive(Debug, Clone)]
pub struct SigningOutcome {
    pub container: Container,
    pub sequence: u32,
    pub timestamp: TimestampOutcome,
}

/// Signs documents into containers and countersigns existing ones.
pub struct ContainerSigner {
    keys: Arc<dyn KeyProvider>,
    tsa: Option<Arc<dyn TimestampAuthority>>,
    config: SigningConfig,
}

impl ContainerSigner {
    pub fn new(keys: Arc<dyn KeyProvider>, config: SigningConfig) -> Self {
        Self {
            keys,
            tsa: None,
            config,
        }
    }

    /// Request a timestamp for every envelope from `tsa`.
    pub fn with_timestamp_authority(mut self, tsa: Arc<dyn TimestampAuthority>) -> Self {
        self.tsa = Some(tsa);
        self
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Sign `document` as the first party, producing a new container.
    pub async fn sign(
        &self,
        document: Document,
        signer: &SignerIdentity,
        message: &str,
    ) -> Result<SigningOutcome, ContainerError> {
        if document.is_empty() {
            return Err(ContainerError::EmptyDocument);
        }
        let (draft, timestamp) = self.prepare(&document, signer, message, 1).await?;
        let container = pack(document, draft)?;
        Ok(SigningOutcome {
            container,
            sequence: 1,
            timestamp,
        })
    }

    /// Countersign the document in `container`, producing a new container
    /// with one more envelope. `container` itself is left as it was.
    pub async fn countersign(
        &self,
        container: &Container,
        signer: &SignerIdentity,
        message: &str,
    ) -> Result<SigningOutcome, ContainerError> {
        let sequence = container.next_sequence();
        let (draft, timestamp) = self
            .prepare(container.document(), signer, message, sequence)
            .await?;
        let container = append(container, draft)?;
        Ok(SigningOutcome {
            container,
            sequence,
            timestamp,
        })
    }

    async fn prepare(
        &self,
        document: &Document,
        signer: &SignerIdentity,
        message: &str,
        sequence: u32,
    ) -> Result<(EnvelopeDraft, TimestampOutcome), ContainerError> {
        let digest = document.digest(self.config.digest_algorithm);
        let signature = self
            .external_sign(&signer.key_id, &digest, signer.algorithm)
            .await?;
        let (timestamp_token, outcome) = self.stamp(document, &signature).await;

        let draft = EnvelopeDraft {
            sequence: Some(sequence),
            signer_certificate_der: signer.certificate_der.clone(),
            signature_algorithm: signer.algorithm,
            signature,
            document_digest: digest,
            timestamp_token,
            timestamp_scope: self.config.timestamp_scope,
            message: message.to_string(),
            created_at: Timestamp::now(),
        };
        Ok((draft, outcome))
    }

    async fn external_sign(
        &self,
        key_id: &str,
        digest: &Digest,
        algorithm: SignatureAlgorithm,
    ) -> Result<Vec<u8>, ContainerError> {
        let keys = Arc::clone(&self.keys);
        let key_id = key_id.to_string();
        let digest = digest.clone();
        let task = tokio::task::spawn_blocking(move || keys.sign(&key_id, &digest, algorithm));

        match tokio::time::timeout(self.config.sign_timeout, task).await {
            Err(_) => {
                tracing::warn!(after = ?self.config.sign_timeout, "external sign call timed out");
                Err(ContainerError::Timeout {
                    operation: "sign",
                    after: self.config.sign_timeout,
                })
            }
            Ok(Err(join)) => Err(ContainerError::SignerUnavailable(join.to_string())),
            Ok(Ok(result)) => {
                let signature = result?;
                tracing::info!(
                    provider = self.keys.provider_name(),
                    algorithm = %algorithm,
                    bytes = signature.len(),
                    "document digest signed"
                );
                Ok(signature)
            }
        }
    }

    async fn stamp(
        &self,
        document: &Document,
        signature: &[u8],
    ) -> (Option<Vec<u8>>, TimestampOutcome) {
        let Some(tsa) = &self.tsa else {
            return (None, TimestampOutcome::NotRequested);
        };
        let scope = self.config.timestamp_scope;
        let subject = scope.subject(signature, document.bytes());
        let request = TimeStampReq::new(self.config.digest_algorithm.digest(subject))
            .with_cert_req(true)
            .with_random_nonce();

        let result = match tokio::time::timeout(
            self.config.timestamp_timeout,
            request_token(tsa.as_ref(), &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TimestampError::Timeout(self.config.timestamp_timeout)),
        };

        match result {
            Ok(token) => {
                let gen_time = token.tst_info().map(|info| info.gen_time);
                tracing::info!(
                    authority = tsa.authority_name(),
                    scope = %scope,
                    gen_time = ?gen_time,
                    "timestamp obtained"
                );
                (Some(token.into_bytes()), TimestampOutcome::Stamped { gen_time })
            }
            Err(e) => {
                tracing::warn!(
                    authority = tsa.authority_name(),
                    retryable = e.is_retryable(),
                    "timestamp unavailable, sealing envelope without token: {e}"
                );
                (None, TimestampOutcome::Failed(e))
            }
        }
    }
}

impl std::fmt::Debug for ContainerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSigner")
            .field("provider", &self.keys.provider_name())
            .field("tsa", &self.tsa.as_ref().map(|t| t.authority_name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}
