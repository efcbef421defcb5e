// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attestation assembly, signing, and publication.
//!
//! Every step is linear and any failure aborts the emission. Publication is
//! the only side effect and is idempotent, so no cleanup runs on failure.

pub mod registry;
pub mod signer;

use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use provenant_core::{Artifact, DigestError, Predicate, Statement};

use registry::{RegistryClient, RegistryError};
use signer::{SignError, Signer};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("no digest entry in any terminated container message")]
    DigestNotFound,
    #[error("invalid digest in termination message: {0}")]
    InvalidDigest(#[from] DigestError),
    #[error("failed to serialize statement: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("signing failed: {0}")]
    Sign(#[from] SignError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// One `{key, value}` entry of a container's termination message.
#[derive(Debug, Deserialize)]
struct TerminationEntry {
    key: String,
    value: String,
}

/// The first `digest` entry across the pod's terminated container messages.
///
/// Containers report their outputs as a JSON list of key/value pairs in the
/// termination message; messages that are absent or not that shape are
/// skipped.
pub fn find_image_digest(pod: &Pod) -> Result<String, EmitError> {
    let statuses = pod.status.as_ref().and_then(|status| status.container_statuses.as_ref());
    for status in statuses.into_iter().flatten() {
        let Some(message) = status
            .state
            .as_ref()
            .and_then(|state| state.terminated.as_ref())
            .and_then(|terminated| terminated.message.as_ref())
        else {
            continue;
        };
        let Ok(entries) = serde_json::from_str::<Vec<TerminationEntry>>(message) else {
            continue;
        };
        if let Some(entry) = entries.into_iter().find(|entry| entry.key == "digest") {
            return Ok(entry.value);
        }
    }
    Err(EmitError::DigestNotFound)
}

/// Signs and publishes provenance statements for finished artifact pods.
pub struct Emitter {
    signer: Box<dyn Signer>,
    registry: RegistryClient,
}

impl Emitter {
    pub fn new(signer: Box<dyn Signer>, registry: RegistryClient) -> Self {
        Self { signer, registry }
    }

    /// Bind `predicate` to the artifact image `pod` produced, sign, publish.
    pub async fn emit(
        &self,
        mut predicate: Predicate,
        artifact: &Artifact,
        pod: &Pod,
    ) -> Result<(), EmitError> {
        let reported = find_image_digest(pod)?.parse()?;
        // The registry's answer is authoritative over the reported digest:
        // between the container writing its message and us reading it, a
        // tag could have moved.
        let resolved = self.registry.resolve_digest(&artifact.reference, &reported).await?;

        predicate.materials.insert(artifact.name.clone(), resolved.digest_set());
        let statement = Statement::provenance(&artifact.name, &resolved, predicate);
        let payload = serde_json::to_vec(&statement)?;
        let envelope = self.signer.sign(&payload).await?;

        self.registry.publish(&artifact.reference, &resolved, &envelope).await?;
        info!(artifact = %artifact.name, digest = %resolved, "attestation published");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
