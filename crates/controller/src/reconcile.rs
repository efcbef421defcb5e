// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod reconciliation: readiness, the claim lock, and attestation hand-off.
//!
//! Reconciles are at-least-once; the annotation written *before* emission
//! turns them into at-most-once emission attempts per pod. A crash between
//! claim and publish fails closed (operator retry), never double-publishes.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, PostParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use provenant_core::{Artifact, Clock, Config, PodKey, Predicate};

use crate::attest::{EmitError, Emitter};
use crate::cache::EventCache;

/// Label a pod carries to opt into attestation for a named artifact.
pub const ARTIFACT_LABEL: &str = "provenant.io/artifact";
/// Annotation written before emission; the claim that makes emission
/// at-most-once per pod.
pub const ATTESTED_ANNOTATION: &str = "provenant.io/attested";
/// The only phase in which a pod's termination message (and so its
/// artifact digest) is readable.
pub const TERMINAL_PHASE: &str = "Succeeded";

const RETRY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("attestation failed: {0}")]
    Emit(#[from] EmitError),
}

/// Shared state for reconcile calls.
pub struct Context<C: Clock> {
    pub client: Client,
    pub cache: Arc<EventCache<C>>,
    pub config: Config,
    pub emitter: Emitter,
}

/// The artifact this pod opted into, if the pod is ready for emission.
///
/// Ready means: artifact label matches a configured artifact, the pod has
/// not already been claimed, and it reached the terminal phase.
pub fn ready_artifact<'a>(pod: &Pod, config: &'a Config) -> Option<&'a Artifact> {
    let label = pod.labels().get(ARTIFACT_LABEL)?;
    let artifact = config.artifact_for(label)?;
    if pod.annotations().get(ATTESTED_ANNOTATION).map(String::as_str) == Some("true") {
        return None;
    }
    let phase = pod.status.as_ref().and_then(|status| status.phase.as_deref());
    (phase == Some(TERMINAL_PHASE)).then_some(artifact)
}

/// Write the claim annotation. `Ok(false)` means another reconciler won.
///
/// The replace carries the resource version the pod was observed at, so a
/// concurrent claim (or any other write) turns into a conflict instead of
/// silently overwriting.
async fn claim(api: &Api<Pod>, pod: &Pod) -> Result<bool, kube::Error> {
    let mut claimed = pod.clone();
    claimed.annotations_mut().insert(ATTESTED_ANNOTATION.to_string(), "true".to_string());
    match api.replace(&claimed.name_any(), &PostParams::default(), &claimed).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(response)) if response.code == 409 => Ok(false),
        Err(err) => Err(err),
    }
}

async fn reconcile<C: Clock>(pod: Arc<Pod>, ctx: Arc<Context<C>>) -> Result<Action, ReconcileError> {
    let Some(artifact) = ready_artifact(&pod, &ctx.config) else {
        return Ok(Action::await_change());
    };

    let key = PodKey::new(pod.name_any(), pod.namespace().unwrap_or_default());
    let api: Api<Pod> = Api::namespaced(ctx.client.clone(), &key.namespace);
    if !claim(&api, &pod).await? {
        debug!(pod = %key, "claim lost, another reconciler is attesting this pod");
        return Ok(Action::await_change());
    }

    // Snapshot before emitting; telemetry arriving from here on is
    // intentionally not part of this attestation.
    let snapshot = ctx.cache.get(&key).unwrap_or_else(|| Predicate::new(key.clone()));
    info!(pod = %key, artifact = %artifact.name, "emitting attestation");
    ctx.emitter.emit(snapshot, artifact, &pod).await?;
    ctx.cache.delete(&key);
    Ok(Action::await_change())
}

fn error_policy<C: Clock>(pod: Arc<Pod>, err: &ReconcileError, _ctx: Arc<Context<C>>) -> Action {
    warn!(pod = %pod.name_any(), %err, "reconcile failed, requeueing");
    Action::requeue(RETRY_INTERVAL)
}

/// Run the pod controller until the lifecycle token cancels.
pub async fn run<C>(ctx: Context<C>, shutdown: CancellationToken) -> Result<(), ReconcileError>
where
    C: Clock + 'static,
{
    let pods: Api<Pod> = Api::all(ctx.client.clone());
    let controller = Controller::new(pods, watcher::Config::default().labels(ARTIFACT_LABEL))
        .run(reconcile, error_policy, Arc::new(ctx))
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(pod = %object.name, "reconciled"),
                Err(err) => warn!(%err, "controller error"),
            }
        });

    tokio::select! {
        _ = shutdown.cancelled() => {
            debug!("reconciler shutting down");
            Ok(())
        }
        _ = controller => Ok(()),
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
