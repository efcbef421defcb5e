// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the runtime sensor's event stream.
//!
//! Dials the sensor endpoint (plaintext or mutual TLS), opens the filtered
//! `GetEvents` subscription, and yields domain events. The client never
//! retries: a terminated stream is a fatal condition the supervisor turns
//! into process shutdown and an orchestrated restart.

pub mod proto;

use std::path::PathBuf;

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Identity};
use tracing::info;

use provenant_core::{Event, KprobeArg, PodFilter, PodKey, Process, SockInfo};

use proto::sensor_events_client::SensorEventsClient;

/// Sensor service port, shared by the default cluster-local endpoints.
const DEFAULT_PORT: u16 = 54321;
const DEFAULT_NAMESPACE: &str = "kube-system";

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("invalid sensor endpoint {endpoint:?}: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("failed to read TLS material from {path}: {source}")]
    TlsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to sensor: {0}")]
    Connect(#[source] tonic::transport::Error),
    #[error("event subscription failed: {0}")]
    Subscribe(#[source] tonic::Status),
    #[error("event stream error: {0}")]
    Receive(#[source] tonic::Status),
}

/// Client TLS material for the sensor connection.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub endpoint: String,
    pub tls: Option<TlsPaths>,
    pub filter: PodFilter,
}

impl SensorConfig {
    /// Endpoint resolution: an explicit endpoint wins; otherwise the
    /// well-known cluster-local service name, in `namespace` when given.
    pub fn endpoint_for(endpoint: Option<String>, namespace: Option<String>) -> String {
        match endpoint {
            Some(endpoint) => endpoint,
            None => format!(
                "http://tetragon.{}.svc.cluster.local:{DEFAULT_PORT}",
                namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
            ),
        }
    }
}

/// A connected sensor client, ready to open one subscription.
pub struct SensorClient {
    client: SensorEventsClient<Channel>,
    filter: PodFilter,
}

impl SensorClient {
    /// Dial the sensor endpoint, with TLS when cert and key are configured.
    pub async fn connect(config: &SensorConfig) -> Result<Self, SensorError> {
        let mut endpoint = Endpoint::from_shared(config.endpoint.clone()).map_err(|source| {
            SensorError::Endpoint { endpoint: config.endpoint.clone(), source }
        })?;

        match &config.tls {
            Some(tls) => {
                let cert = std::fs::read(&tls.cert)
                    .map_err(|source| SensorError::TlsRead { path: tls.cert.clone(), source })?;
                let key = std::fs::read(&tls.key)
                    .map_err(|source| SensorError::TlsRead { path: tls.key.clone(), source })?;
                endpoint = endpoint
                    .tls_config(ClientTlsConfig::new().identity(Identity::from_pem(cert, key)))
                    .map_err(SensorError::Connect)?;
                info!(endpoint = %config.endpoint, "connecting to sensor with TLS enabled");
            }
            None => {
                info!(endpoint = %config.endpoint, "connecting to sensor with TLS disabled");
            }
        }

        let channel = endpoint.connect().await.map_err(SensorError::Connect)?;
        info!("connected to sensor");
        Ok(Self { client: SensorEventsClient::new(channel), filter: config.filter.clone() })
    }

    /// Open the filtered subscription.
    ///
    /// Responses without an event payload are skipped; receive errors
    /// terminate the stream with the underlying cause.
    pub async fn subscribe(
        mut self,
    ) -> Result<impl Stream<Item = Result<Event, SensorError>> + Unpin + Send, SensorError> {
        let request = proto::GetEventsRequest {
            allow_list: vec![proto::Filter {
                namespace: self.filter.namespaces.clone(),
                binary_regex: self.filter.binary_regex.clone(),
            }],
        };

        let stream = self
            .client
            .get_events(request)
            .await
            .map_err(SensorError::Subscribe)?
            .into_inner();

        Ok(stream.filter_map(|item| {
            futures_util::future::ready(match item {
                Ok(response) => response.event.map(|event| Ok(convert_event(event))),
                Err(status) => Some(Err(SensorError::Receive(status))),
            })
        }))
    }
}

fn convert_event(event: proto::get_events_response::Event) -> Event {
    use proto::get_events_response::Event as Wire;
    match event {
        Wire::ProcessExec(exec) => Event::ProcessExec {
            process: exec.process.map(convert_process),
            parent: exec.parent.map(convert_process),
        },
        Wire::ProcessExit(exit) => Event::ProcessExit {
            process: exit.process.map(convert_process),
            parent: exit.parent.map(convert_process),
        },
        Wire::ProcessKprobe(kprobe) => Event::ProcessKprobe {
            process: kprobe.process.map(convert_process),
            function_name: kprobe.function_name,
            args: kprobe.args.into_iter().map(convert_arg).collect(),
        },
        Wire::ProcessTracepoint(tracepoint) => {
            Event::ProcessTracepoint { process: tracepoint.process.map(convert_process) }
        }
        Wire::ProcessDns(dns) => {
            Event::ProcessDns { process: dns.process.map(convert_process) }
        }
    }
}

fn convert_process(process: proto::Process) -> Process {
    Process {
        binary: process.binary,
        arguments: process.arguments,
        pod: process.pod.map(|pod| PodKey::new(pod.name, pod.namespace)),
        start_time: process.start_time.map(|t| t.seconds),
    }
}

fn convert_arg(argument: proto::KprobeArgument) -> KprobeArg {
    use proto::kprobe_argument::Arg;
    match argument.arg {
        Some(Arg::FileArg(file)) => KprobeArg::File { path: file.path },
        Some(Arg::StringArg(value)) => KprobeArg::Str { value },
        Some(Arg::IntArg(value)) => KprobeArg::Int { value },
        Some(Arg::SockArg(sock)) => KprobeArg::Sock {
            value: SockInfo {
                saddr: sock.saddr,
                daddr: sock.daddr,
                sport: sock.sport,
                dport: sock.dport,
            },
        },
        None => KprobeArg::Unknown,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
