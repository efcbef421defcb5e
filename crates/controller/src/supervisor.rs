// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of the event cache and the reconciler under one lifecycle token.
//!
//! Either child finishing, nominally or not, cancels the token; the other
//! child drains, and the first error wins.

use std::sync::Arc;

use futures_util::Stream;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use provenant_core::{Clock, Event};

use crate::cache::CacheError;
use crate::reconcile::{self, Context, ReconcileError};
use crate::sensor::SensorError;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("task failed: {0}")]
    Join(#[from] JoinError),
}

fn flatten_cache(
    result: Result<Result<(), CacheError>, JoinError>,
) -> Result<(), SupervisorError> {
    result.map_err(SupervisorError::Join)?.map_err(SupervisorError::Cache)
}

fn flatten_reconcile(
    result: Result<Result<(), ReconcileError>, JoinError>,
) -> Result<(), SupervisorError> {
    result.map_err(SupervisorError::Join)?.map_err(SupervisorError::Reconcile)
}

/// Run event ingestion and pod reconciliation until either finishes or the
/// token cancels.
pub async fn run<C, S>(
    events: S,
    ctx: Context<C>,
    shutdown: CancellationToken,
) -> Result<(), SupervisorError>
where
    C: Clock + Send + Sync + 'static,
    S: Stream<Item = Result<Event, SensorError>> + Unpin + Send + 'static,
{
    let cache = Arc::clone(&ctx.cache);

    let mut cache_task = tokio::spawn({
        let token = shutdown.clone();
        async move { cache.run(events, token).await }
    });
    let mut reconcile_task = tokio::spawn({
        let token = shutdown.clone();
        async move { reconcile::run(ctx, token).await }
    });

    tokio::select! {
        result = &mut cache_task => {
            debug!("event cache finished first, draining reconciler");
            shutdown.cancel();
            let first = flatten_cache(result);
            let second = flatten_reconcile(reconcile_task.await);
            first.and(second)
        }
        result = &mut reconcile_task => {
            debug!("reconciler finished first, draining event cache");
            shutdown.cancel();
            let first = flatten_reconcile(result);
            let second = flatten_cache(cache_task.await);
            first.and(second)
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
