// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DSSE signers: a local key file or a remote KMS.
//!
//! Exactly one signer is configured at startup. The file signer holds an
//! Ed25519 key parsed from PKCS#8 PEM; the KMS signer defers the actual
//! signing operation to a Vault transit key and never sees key material.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::{Signer as _, SigningKey};
use serde::Deserialize;
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use provenant_core::intoto::{pae, Envelope, INTOTO_PAYLOAD_TYPE};

/// Reference scheme for transit-backed KMS keys.
pub const KMS_SCHEME: &str = "hashivault://";

#[derive(Debug, Error)]
pub enum SignError {
    #[error("failed to read signing key {path}: {source}")]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse signing key {path}: {reason}")]
    ParseKey { path: PathBuf, reason: String },
    #[error("kms request failed: {0}")]
    Kms(#[from] reqwest::Error),
    #[error("kms returned an unusable signature: {0:?}")]
    KmsResponse(String),
}

#[derive(Debug, Error)]
pub enum SignerConfigError {
    #[error("no signer configured: set a kms reference or a key path")]
    NoSigner,
    #[error("ambiguous signer: kms reference and key path are mutually exclusive")]
    AmbiguousSigner,
    #[error("unsupported kms reference {0:?}, expected hashivault://<key>")]
    UnsupportedKms(String),
    #[error("{0} must be set for a kms signer")]
    MissingEnv(&'static str),
    #[error(transparent)]
    Key(#[from] SignError),
}

/// Signs a serialized statement into a DSSE envelope.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, payload: &[u8]) -> Result<Envelope, SignError>;
}

/// Resolve exactly one signer from the configured options.
pub fn from_options(
    kms_reference: Option<&str>,
    key_path: Option<&Path>,
) -> Result<Box<dyn Signer>, SignerConfigError> {
    match (kms_reference, key_path) {
        (Some(_), Some(_)) => Err(SignerConfigError::AmbiguousSigner),
        (Some(reference), None) => Ok(Box::new(KmsSigner::from_reference(reference)?)),
        (None, Some(path)) => Ok(Box::new(FileSigner::load(path)?)),
        (None, None) => Err(SignerConfigError::NoSigner),
    }
}

/// Ed25519 signer over a PKCS#8 PEM key file.
#[derive(Debug)]
pub struct FileSigner {
    key: SigningKey,
    keyid: String,
}

impl FileSigner {
    pub fn load(path: &Path) -> Result<Self, SignError> {
        let pem = std::fs::read_to_string(path)
            .map_err(|source| SignError::ReadKey { path: path.to_path_buf(), source })?;
        let key = SigningKey::from_pkcs8_pem(&pem).map_err(|err| SignError::ParseKey {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let keyid = hex::encode(Sha256::digest(key.verifying_key().as_bytes()));
        Ok(Self { key, keyid })
    }

    /// Hex sha256 of the verifying key; stable across restarts.
    pub fn keyid(&self) -> &str {
        &self.keyid
    }
}

#[async_trait]
impl Signer for FileSigner {
    async fn sign(&self, payload: &[u8]) -> Result<Envelope, SignError> {
        let signature = self.key.sign(&pae(INTOTO_PAYLOAD_TYPE, payload));
        Ok(Envelope::new(payload, self.keyid.clone(), &signature.to_bytes()))
    }
}

#[derive(Debug, Deserialize)]
struct VaultSignData {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct VaultSignResponse {
    data: VaultSignData,
}

/// Remote signer backed by a Vault transit key (`hashivault://<key>`).
///
/// Vault address and token come from `VAULT_ADDR` / `VAULT_TOKEN`, the
/// same environment the vault CLI reads.
pub struct KmsSigner {
    http: reqwest::Client,
    sign_url: String,
    token: String,
    keyid: String,
}

impl KmsSigner {
    pub fn from_reference(reference: &str) -> Result<Self, SignerConfigError> {
        let key = reference
            .strip_prefix(KMS_SCHEME)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SignerConfigError::UnsupportedKms(reference.to_string()))?;
        let address = std::env::var("VAULT_ADDR")
            .map_err(|_| SignerConfigError::MissingEnv("VAULT_ADDR"))?;
        let token = std::env::var("VAULT_TOKEN")
            .map_err(|_| SignerConfigError::MissingEnv("VAULT_TOKEN"))?;

        Ok(Self {
            http: reqwest::Client::new(),
            sign_url: format!("{}/v1/transit/sign/{key}", address.trim_end_matches('/')),
            token,
            keyid: reference.to_string(),
        })
    }
}

#[async_trait]
impl Signer for KmsSigner {
    async fn sign(&self, payload: &[u8]) -> Result<Envelope, SignError> {
        let body =
            serde_json::json!({ "input": BASE64.encode(pae(INTOTO_PAYLOAD_TYPE, payload)) });
        let response: VaultSignResponse = self
            .http
            .post(&self.sign_url)
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Transit signatures come back as `vault:v<N>:<base64>`.
        let encoded = response
            .data
            .signature
            .rsplit(':')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| SignError::KmsResponse(response.data.signature.clone()))?;
        let raw = BASE64
            .decode(encoded)
            .map_err(|_| SignError::KmsResponse(response.data.signature.clone()))?;
        Ok(Envelope::new(payload, self.keyid.clone(), &raw))
    }
}

#[cfg(test)]
#[path = "signer_tests.rs"]
mod tests;
