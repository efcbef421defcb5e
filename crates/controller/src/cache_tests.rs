// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use futures_util::stream;
use provenant_core::{FakeClock, KprobeArg, Process};
use std::sync::Arc;

fn exec(pod: &str, namespace: &str, binary: &str) -> Event {
    Event::ProcessExec {
        process: Some(Process {
            binary: binary.to_string(),
            arguments: "-c ls".to_string(),
            pod: Some(PodKey::new(pod, namespace)),
            start_time: None,
        }),
        parent: None,
    }
}

fn write_kprobe(pod: &str, namespace: &str, path: &str) -> Event {
    Event::ProcessKprobe {
        process: Some(Process {
            binary: "/bin/sh".to_string(),
            arguments: String::new(),
            pod: Some(PodKey::new(pod, namespace)),
            start_time: None,
        }),
        function_name: "__x64_sys_write".to_string(),
        args: vec![KprobeArg::File { path: path.to_string() }],
    }
}

fn cache() -> EventCache {
    EventCache::new(CacheConfig::default())
}

#[tokio::test]
async fn run_ingests_until_the_stream_closes() {
    let cache = cache();
    let events = stream::iter(vec![
        Ok(exec("a", "default", "/bin/sh")),
        Ok(write_kprobe("b", "default", "/out")),
        Ok(write_kprobe("b", "default", "/out")),
        Ok(write_kprobe("b", "default", "/out")),
    ]);

    let err = cache.run(events, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CacheError::StreamClosed));

    let a = cache.get(&PodKey::new("a", "default")).unwrap();
    assert_eq!(a.processes_executed.get("/bin/sh"), Some(&1));
    assert_eq!(a.commands_executed["/bin/sh"].get("-c ls"), Some(&1));

    let b = cache.get(&PodKey::new("b", "default")).unwrap();
    assert_eq!(b.files_written.get("/out"), Some(&3));
}

#[tokio::test]
async fn run_returns_cleanly_on_cancellation() {
    let cache = Arc::new(cache());
    let token = CancellationToken::new();
    token.cancel();
    cache.run(stream::pending::<Result<Event, SensorError>>(), token).await.unwrap();
}

#[tokio::test]
async fn receive_errors_are_fatal_but_keep_prior_events() {
    let cache = cache();
    let events = stream::iter(vec![
        Ok(exec("a", "default", "/bin/sh")),
        Err(SensorError::Receive(tonic::Status::unavailable("sensor went away"))),
    ]);

    let err = cache.run(events, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CacheError::Stream(SensorError::Receive(_))));
    assert!(cache.get(&PodKey::new("a", "default")).is_some());
}

#[tokio::test]
async fn malformed_events_are_dropped_and_ingestion_continues() {
    let cache = cache();
    let events = stream::iter(vec![
        Ok(Event::ProcessExec { process: None, parent: None }),
        Ok(exec("a", "default", "/bin/sh")),
    ]);

    let err = cache.run(events, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CacheError::StreamClosed));
    let a = cache.get(&PodKey::new("a", "default")).unwrap();
    assert_eq!(a.processes_executed.get("/bin/sh"), Some(&1));
}

#[test]
fn events_without_pod_identity_create_no_entry() {
    let cache = cache();
    cache.ingest(Event::ProcessExec {
        process: Some(Process {
            binary: "/sbin/init".to_string(),
            arguments: String::new(),
            pod: None,
            start_time: None,
        }),
        parent: None,
    });
    cache.ingest(Event::ProcessTracepoint { process: None });
    assert!(cache.entries.lock().is_empty());
}

#[test]
fn pods_with_the_same_name_in_different_namespaces_stay_distinct() {
    let cache = cache();
    cache.ingest(exec("build", "ci", "/bin/sh"));
    cache.ingest(exec("build", "staging", "/usr/bin/make"));

    let ci = cache.get(&PodKey::new("build", "ci")).unwrap();
    let staging = cache.get(&PodKey::new("build", "staging")).unwrap();
    assert!(ci.processes_executed.contains_key("/bin/sh"));
    assert!(!ci.processes_executed.contains_key("/usr/bin/make"));
    assert!(staging.processes_executed.contains_key("/usr/bin/make"));
}

#[test]
fn get_returns_a_snapshot_not_a_view() {
    let cache = cache();
    cache.ingest(exec("a", "default", "/bin/sh"));
    let snapshot = cache.get(&PodKey::new("a", "default")).unwrap();

    cache.ingest(exec("a", "default", "/bin/sh"));
    assert_eq!(snapshot.processes_executed.get("/bin/sh"), Some(&1));
    let live = cache.get(&PodKey::new("a", "default")).unwrap();
    assert_eq!(live.processes_executed.get("/bin/sh"), Some(&2));
}

#[test]
fn delete_is_idempotent() {
    let cache = cache();
    cache.ingest(exec("a", "default", "/bin/sh"));
    let key = PodKey::new("a", "default");
    cache.delete(&key);
    assert!(cache.get(&key).is_none());
    cache.delete(&key);
}

#[test]
fn sweep_evicts_only_entries_past_max_age() {
    let clock = FakeClock::new();
    let cache = EventCache::with_clock(
        CacheConfig { max_age: Duration::from_secs(10), sweep_interval: Duration::from_secs(5) },
        clock.clone(),
    );

    cache.ingest(exec("old", "default", "/bin/sh"));
    clock.advance(Duration::from_secs(8));
    cache.ingest(exec("young", "default", "/bin/sh"));
    clock.advance(Duration::from_secs(4));

    cache.sweep();
    assert!(cache.get(&PodKey::new("old", "default")).is_none());
    assert!(cache.get(&PodKey::new("young", "default")).is_some());
}

#[test]
fn entry_age_is_stamped_at_creation_not_on_later_folds() {
    let clock = FakeClock::new();
    let cache = EventCache::with_clock(
        CacheConfig { max_age: Duration::from_secs(10), sweep_interval: Duration::from_secs(5) },
        clock.clone(),
    );

    cache.ingest(exec("a", "default", "/bin/sh"));
    clock.advance(Duration::from_secs(11));
    // A late fold does not refresh the TTL.
    cache.ingest(exec("a", "default", "/bin/sh"));
    cache.sweep();
    assert!(cache.get(&PodKey::new("a", "default")).is_none());
}

#[tokio::test(start_paused = true)]
async fn the_run_loop_sweeps_on_its_cadence() {
    let clock = FakeClock::new();
    let cache = Arc::new(EventCache::with_clock(
        CacheConfig {
            max_age: Duration::from_millis(10),
            sweep_interval: Duration::from_millis(5),
        },
        clock.clone(),
    ));
    cache.ingest(exec("a", "default", "/bin/sh"));

    let token = CancellationToken::new();
    let task = tokio::spawn({
        let cache = Arc::clone(&cache);
        let token = token.clone();
        async move { cache.run(stream::pending::<Result<Event, SensorError>>(), token).await }
    });

    clock.advance(Duration::from_millis(20));
    // Paused time auto-advances; this lets the sweep tick fire.
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(cache.get(&PodKey::new("a", "default")).is_none());
    token.cancel();
    task.await.unwrap().unwrap();
}
