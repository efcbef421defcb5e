// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry event types delivered by the runtime sensor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of the pod a telemetry event was attributed to.
///
/// Pod names collide across namespaces, so correlation always uses the pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PodKey {
    pub name: String,
    pub namespace: String,
}

impl PodKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: namespace.into() }
    }
}

impl std::fmt::Display for PodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Process context attached to sensor events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub binary: String,
    #[serde(default)]
    pub arguments: String,
    /// Absent for host processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<PodKey>,
    /// Process start time, seconds since the epoch as reported by the sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
}

/// Socket 4-tuple reported for connect attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockInfo {
    pub saddr: String,
    pub daddr: String,
    pub sport: u32,
    pub dport: u32,
}

/// One typed kprobe argument.
///
/// The sensor only decodes argument kinds it has type information for;
/// everything else arrives as `Unknown` and is ignored by the folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KprobeArg {
    File { path: String },
    Str { value: String },
    Int { value: i64 },
    Sock { value: SockInfo },
    Unknown,
}

impl KprobeArg {
    pub fn file_path(&self) -> Option<&str> {
        match self {
            KprobeArg::File { path } => Some(path),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match self {
            KprobeArg::Str { value } => Some(value),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match self {
            KprobeArg::Int { value } => Some(*value),
            _ => None,
        }
    }

    pub fn sock(&self) -> Option<&SockInfo> {
        match self {
            KprobeArg::Sock { value } => Some(value),
            _ => None,
        }
    }
}

/// An event whose kind requires process context but arrived without it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("process field is not set on {kind} event")]
pub struct MalformedEvent {
    pub kind: &'static str,
}

/// Events that feed the per-pod provenance predicate.
///
/// Serializes with `{"type": "process:exec", ...fields}` format, matching
/// the sensor's JSON export of the same records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "process:exec")]
    ProcessExec {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process: Option<Process>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<Process>,
    },

    #[serde(rename = "process:exit")]
    ProcessExit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process: Option<Process>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<Process>,
    },

    #[serde(rename = "process:kprobe")]
    ProcessKprobe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process: Option<Process>,
        function_name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<KprobeArg>,
    },

    /// Carried on the wire but never folded.
    #[serde(rename = "process:tracepoint")]
    ProcessTracepoint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process: Option<Process>,
    },

    /// Carried on the wire but never folded.
    #[serde(rename = "process:dns")]
    ProcessDns {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process: Option<Process>,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ProcessExec { .. } => "process:exec",
            Event::ProcessExit { .. } => "process:exit",
            Event::ProcessKprobe { .. } => "process:kprobe",
            Event::ProcessTracepoint { .. } => "process:tracepoint",
            Event::ProcessDns { .. } => "process:dns",
        }
    }

    /// Pod identity for cache correlation.
    ///
    /// Ignored kinds resolve to `Ok(None)`. Kinds the folder consumes fail
    /// with [`MalformedEvent`] when the process context is missing; a
    /// present process without pod attribution (a host process) is
    /// `Ok(None)`.
    pub fn pod(&self) -> Result<Option<&PodKey>, MalformedEvent> {
        match self {
            Event::ProcessExec { process, .. }
            | Event::ProcessExit { process, .. }
            | Event::ProcessKprobe { process, .. } => {
                let process = process.as_ref().ok_or(MalformedEvent { kind: self.kind() })?;
                Ok(process.pod.as_ref())
            }
            Event::ProcessTracepoint { .. } | Event::ProcessDns { .. } => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
