// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-pod provenance predicate and the event folding rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::{Event, KprobeArg, MalformedEvent, PodKey};

/// One observed mount syscall, source and target as passed to the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemMount {
    pub source: String,
    pub destination: String,
}

/// One observed TCP connect attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpConnection {
    pub socket_address: String,
    pub socket_port: u32,
    pub destination_address: String,
    pub destination_port: u32,
}

/// Aggregated runtime observations for one pod.
///
/// This is the predicate body of the emitted in-toto statement. Maps are
/// ordered so the signed serialization is deterministic. Counts only ever
/// grow while the aggregate is live; emission works on a clone, never on
/// the live value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub pod: PodKey,

    /// Binary path to invocation count.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub processes_executed: BTreeMap<String, u64>,

    /// Binary path to argv string to count. Two-level so repeated identical
    /// invocations deduplicate while distinct argument lists stay visible.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands_executed: BTreeMap<String, BTreeMap<String, u64>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files_written: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files_read: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files_opened: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filesystems_mounted: Vec<FilesystemMount>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tcp_connections: Vec<TcpConnection>,

    /// Requested uid to count of setuid calls.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uids_set: BTreeMap<u32, u64>,

    /// Artifact name to digest set; filled at emission time, not while
    /// events are folding.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub materials: BTreeMap<String, BTreeMap<String, String>>,
}

impl Predicate {
    pub fn new(pod: PodKey) -> Self {
        Self { pod, ..Self::default() }
    }

    /// Fold one event into the aggregate.
    ///
    /// Dispatch is by event kind, then by kernel function name for kprobes.
    /// Events the table has no row for, and kprobe arguments that are
    /// missing or of the wrong kind, are dropped without touching any
    /// counter.
    pub fn fold(&mut self, event: &Event) -> Result<(), MalformedEvent> {
        match event {
            Event::ProcessExec { process, .. } => {
                let process =
                    process.as_ref().ok_or(MalformedEvent { kind: event.kind() })?;
                *self.processes_executed.entry(process.binary.clone()).or_default() += 1;
                *self
                    .commands_executed
                    .entry(process.binary.clone())
                    .or_default()
                    .entry(process.arguments.clone())
                    .or_default() += 1;
                Ok(())
            }
            // Exits carry no provenance; the process context is still
            // required so a malformed stream is noticed.
            Event::ProcessExit { process, .. } => {
                process.as_ref().ok_or(MalformedEvent { kind: event.kind() })?;
                Ok(())
            }
            Event::ProcessKprobe { process, function_name, args } => {
                process.as_ref().ok_or(MalformedEvent { kind: event.kind() })?;
                self.fold_kprobe(function_name, args);
                Ok(())
            }
            Event::ProcessTracepoint { .. } | Event::ProcessDns { .. } => Ok(()),
        }
    }

    fn fold_kprobe(&mut self, function_name: &str, args: &[KprobeArg]) {
        match function_name {
            "__x64_sys_write" => {
                if let Some(path) = args.first().and_then(KprobeArg::file_path) {
                    *self.files_written.entry(path.to_string()).or_default() += 1;
                }
            }
            "__x64_sys_read" => {
                if let Some(path) = args.first().and_then(KprobeArg::file_path) {
                    *self.files_read.entry(path.to_string()).or_default() += 1;
                }
            }
            // fd_install reports the installed file in its second argument.
            "fd_install" => {
                if let Some(path) = args.get(1).and_then(KprobeArg::file_path) {
                    *self.files_opened.entry(path.to_string()).or_default() += 1;
                }
            }
            "__x64_sys_mount" => {
                let source = args.first().and_then(KprobeArg::string_value);
                let destination = args.get(1).and_then(KprobeArg::string_value);
                if let (Some(source), Some(destination)) = (source, destination) {
                    self.filesystems_mounted.push(FilesystemMount {
                        source: source.to_string(),
                        destination: destination.to_string(),
                    });
                }
            }
            "__x64_sys_setuid" => {
                if let Some(uid) =
                    args.first().and_then(KprobeArg::int_value).and_then(|v| u32::try_from(v).ok())
                {
                    *self.uids_set.entry(uid).or_default() += 1;
                }
            }
            "tcp_connect" => {
                if let Some(sock) = args.first().and_then(KprobeArg::sock) {
                    self.tcp_connections.push(TcpConnection {
                        socket_address: sock.saddr.clone(),
                        socket_port: sock.sport,
                        destination_address: sock.daddr.clone(),
                        destination_port: sock.dport,
                    });
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
