// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal OCI distribution client for attestation publication.
//!
//! Speaks just enough of the distribution API for the two operations the
//! emitter needs: resolving a manifest digest, and attaching a DSSE
//! envelope as a layer of the attestation manifest tagged
//! `<algo>-<hex>.att` next to the subject image.

use std::collections::BTreeMap;

use reqwest::header;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;
use tracing::debug;

use provenant_core::{Digest, DigestError, Envelope};

pub const DSSE_LAYER_MEDIA_TYPE: &str = "application/vnd.dsse.envelope.v1+json";
const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
const CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";
const RESOLVE_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.list.v2+json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid image reference {0:?}, expected <registry>/<repository>")]
    InvalidReference(String),
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("manifest for {reference} not found")]
    ManifestNotFound { reference: String },
    #[error("unexpected registry response {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
    #[error("invalid digest from registry: {0}")]
    BadDigest(#[from] DigestError),
    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

/// `host/repository` split of an artifact `ref`.
#[derive(Debug, PartialEq, Eq)]
struct Reference<'a> {
    registry: &'a str,
    repository: &'a str,
}

fn parse_reference(reference: &str) -> Result<Reference<'_>, RegistryError> {
    let (registry, repository) = reference
        .split_once('/')
        .ok_or_else(|| RegistryError::InvalidReference(reference.to_string()))?;
    if registry.is_empty() || repository.is_empty() {
        return Err(RegistryError::InvalidReference(reference.to_string()));
    }
    Ok(Reference { registry, repository })
}

/// Tag under which attestations for `digest` live, next to the image.
pub fn attestation_tag(digest: &Digest) -> String {
    format!("{}-{}.att", digest.algorithm, digest.hex)
}

fn sha256_digest(bytes: &[u8]) -> Digest {
    Digest { algorithm: "sha256".to_string(), hex: hex::encode(Sha256::digest(bytes)) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Descriptor {
    #[serde(rename = "mediaType")]
    media_type: String,
    digest: String,
    size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    #[serde(rename = "mediaType")]
    media_type: String,
    config: Descriptor,
    layers: Vec<Descriptor>,
}

fn empty_attestation_manifest() -> Manifest {
    Manifest {
        schema_version: 2,
        media_type: MANIFEST_MEDIA_TYPE.to_string(),
        config: Descriptor {
            media_type: CONFIG_MEDIA_TYPE.to_string(),
            digest: String::new(),
            size: 0,
            annotations: None,
        },
        layers: Vec::new(),
    }
}

/// Anonymous client against the OCI distribution API.
#[derive(Debug, Clone, Default)]
pub struct RegistryClient {
    http: reqwest::Client,
}

impl RegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn url(&self, reference: &Reference<'_>, path: &str) -> String {
        format!("https://{}/v2/{}/{path}", reference.registry, reference.repository)
    }

    /// Resolve the authoritative manifest digest for `reference@digest`.
    pub async fn resolve_digest(
        &self,
        reference: &str,
        digest: &Digest,
    ) -> Result<Digest, RegistryError> {
        let parsed = parse_reference(reference)?;
        let url = self.url(&parsed, &format!("manifests/{digest}"));
        let response =
            self.http.get(&url).header(header::ACCEPT, RESOLVE_ACCEPT).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                Err(RegistryError::ManifestNotFound { reference: format!("{reference}@{digest}") })
            }
            status if status.is_success() => {
                if let Some(value) = response
                    .headers()
                    .get("Docker-Content-Digest")
                    .and_then(|value| value.to_str().ok())
                {
                    return Ok(value.parse()?);
                }
                // Registries are allowed to omit the header; the digest of
                // the manifest body is the same value.
                let body = response.bytes().await?;
                Ok(sha256_digest(&body))
            }
            status => Err(RegistryError::UnexpectedStatus { status, url }),
        }
    }

    /// Attach `envelope` as an attestation layer for `image`.
    ///
    /// Duplicate payloads are detected against the existing attestation
    /// manifest, which makes republishing a no-op.
    pub async fn publish(
        &self,
        reference: &str,
        image: &Digest,
        envelope: &Envelope,
    ) -> Result<(), RegistryError> {
        let parsed = parse_reference(reference)?;
        let payload = serde_json::to_vec(envelope)?;
        let payload_digest = sha256_digest(&payload);
        let tag = attestation_tag(image);

        let mut manifest = match self.fetch_manifest(&parsed, &tag).await? {
            Some(existing) => {
                if existing.layers.iter().any(|layer| layer.digest == payload_digest.to_string()) {
                    debug!(%tag, "attestation layer already present, skipping publish");
                    return Ok(());
                }
                existing
            }
            None => empty_attestation_manifest(),
        };

        let config_bytes = b"{}".to_vec();
        let config_digest = sha256_digest(&config_bytes);
        self.upload_blob(&parsed, &config_bytes, &config_digest).await?;
        self.upload_blob(&parsed, &payload, &payload_digest).await?;

        manifest.config = Descriptor {
            media_type: CONFIG_MEDIA_TYPE.to_string(),
            digest: config_digest.to_string(),
            size: config_bytes.len() as u64,
            annotations: None,
        };
        manifest.layers.push(Descriptor {
            media_type: DSSE_LAYER_MEDIA_TYPE.to_string(),
            digest: payload_digest.to_string(),
            size: payload.len() as u64,
            annotations: None,
        });

        self.put_manifest(&parsed, &tag, &manifest).await
    }

    async fn fetch_manifest(
        &self,
        reference: &Reference<'_>,
        tag: &str,
    ) -> Result<Option<Manifest>, RegistryError> {
        let url = self.url(reference, &format!("manifests/{tag}"));
        let response =
            self.http.get(&url).header(header::ACCEPT, MANIFEST_MEDIA_TYPE).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(RegistryError::UnexpectedStatus { status, url }),
        }
    }

    async fn upload_blob(
        &self,
        reference: &Reference<'_>,
        bytes: &[u8],
        digest: &Digest,
    ) -> Result<(), RegistryError> {
        let head_url = self.url(reference, &format!("blobs/{digest}"));
        if self.http.head(&head_url).send().await?.status().is_success() {
            return Ok(());
        }

        let start_url = self.url(reference, "blobs/uploads/");
        let response = self.http.post(&start_url).send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::UnexpectedStatus {
                status: response.status(),
                url: start_url,
            });
        }
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RegistryError::UnexpectedStatus {
                status: response.status(),
                url: start_url.clone(),
            })?;
        let location = if location.starts_with("http") {
            location
        } else {
            format!("https://{}{location}", reference.registry)
        };

        let separator = if location.contains('?') { '&' } else { '?' };
        let put_url = format!("{location}{separator}digest={digest}");
        let response = self
            .http
            .put(&put_url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RegistryError::UnexpectedStatus { status: response.status(), url: put_url });
        }
        Ok(())
    }

    async fn put_manifest(
        &self,
        reference: &Reference<'_>,
        tag: &str,
        manifest: &Manifest,
    ) -> Result<(), RegistryError> {
        let url = self.url(reference, &format!("manifests/{tag}"));
        let response = self
            .http
            .put(&url)
            .header(header::CONTENT_TYPE, MANIFEST_MEDIA_TYPE)
            .body(serde_json::to_vec(manifest)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RegistryError::UnexpectedStatus { status: response.status(), url });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
