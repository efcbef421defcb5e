// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed, time-bounded aggregation of sensor events into per-pod predicates.
//!
//! The cache exists so telemetry arriving before a pod reaches its terminal
//! phase is not lost while reconciliation catches up. Entries that never
//! reconcile (pods outside any artifact, failed builds) are evicted by age.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use provenant_core::{Clock, Event, PodKey, Predicate, SystemClock};

use crate::sensor::SensorError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("sensor stream ended unexpectedly")]
    StreamClosed,
    #[error("sensor stream failed: {0}")]
    Stream(#[from] SensorError),
}

/// Entry lifetime and sweep cadence.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_age: Duration,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age: Duration::from_secs(3600), sweep_interval: Duration::from_secs(60) }
    }
}

struct Entry {
    created_at: Instant,
    predicate: Predicate,
}

/// In-memory predicate store keyed by pod identity.
///
/// One mutex guards the map and every predicate in it: folding is O(1) and
/// there is a single ingest producer, so per-entry locking buys nothing.
/// Readers get clones, never references into the map.
pub struct EventCache<C: Clock = SystemClock> {
    entries: Mutex<HashMap<PodKey, Entry>>,
    config: CacheConfig,
    clock: C,
}

impl EventCache<SystemClock> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> EventCache<C> {
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self { entries: Mutex::new(HashMap::new()), config, clock }
    }

    /// Ingest the event stream until it terminates, sweeping expired
    /// entries on the configured cadence.
    ///
    /// Cancellation returns cleanly; the stream ending or failing is fatal
    /// and surfaces as the returned error.
    pub async fn run<S>(&self, mut events: S, shutdown: CancellationToken) -> Result<(), CacheError>
    where
        S: Stream<Item = Result<Event, SensorError>> + Unpin,
    {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("event cache shutting down");
                    return Ok(());
                }
                _ = sweep.tick() => self.sweep(),
                event = events.next() => match event {
                    None => return Err(CacheError::StreamClosed),
                    Some(Err(err)) => return Err(CacheError::Stream(err)),
                    Some(Ok(event)) => self.ingest(event),
                },
            }
        }
    }

    /// Fold one event into its pod's predicate, creating the entry on
    /// first sight. Malformed events are logged and dropped.
    fn ingest(&self, event: Event) {
        let pod = match event.pod() {
            Ok(Some(pod)) => pod.clone(),
            Ok(None) => {
                trace!(kind = event.kind(), "skipping event without pod identity");
                return;
            }
            Err(err) => {
                warn!(kind = event.kind(), %err, "dropping malformed event");
                return;
            }
        };

        let mut entries = self.entries.lock();
        let created_at = self.clock.now();
        let entry = entries
            .entry(pod.clone())
            .or_insert_with(|| Entry { created_at, predicate: Predicate::new(pod.clone()) });
        if let Err(err) = entry.predicate.fold(&event) {
            warn!(%pod, %err, "dropping malformed event");
        }
    }

    /// Snapshot of the current aggregate for `pod`, if present.
    ///
    /// The clone is deep enough that callers read without holding the lock
    /// and later folds never show through.
    pub fn get(&self, pod: &PodKey) -> Option<Predicate> {
        self.entries.lock().get(pod).map(|entry| entry.predicate.clone())
    }

    /// Remove the entry for `pod`. Idempotent.
    pub fn delete(&self, pod: &PodKey) {
        self.entries.lock().remove(pod);
    }

    fn sweep(&self) {
        let now = self.clock.now();
        let max_age = self.config.max_age;
        self.entries.lock().retain(|pod, entry| {
            let expired = now.duration_since(entry.created_at) > max_age;
            if expired {
                debug!(%pod, "evicting expired predicate");
            }
            !expired
        });
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
