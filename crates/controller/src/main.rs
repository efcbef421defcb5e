// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! provenantd: the provenant attestation controller.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use provenant_controller::{attest, cache, reconcile, sensor, supervisor};
use provenant_core::Config;

/// A controller that turns runtime telemetry about artifact-producing pods
/// into signed, published provenance attestations.
#[derive(Debug, Parser)]
#[command(name = "provenantd", version, about)]
struct Args {
    /// Path to the controller config file.
    #[arg(long, default_value = "/etc/provenant/config.yaml")]
    config: PathBuf,

    /// Client TLS certificate for the sensor connection.
    #[arg(long, requires = "tls_key_path")]
    tls_cert_path: Option<PathBuf>,

    /// Client TLS private key for the sensor connection.
    #[arg(long, requires = "tls_cert_path")]
    tls_key_path: Option<PathBuf>,

    /// KMS reference for the attestation signer (hashivault://<key>).
    #[arg(long)]
    signer_kms_ref: Option<String>,

    /// Local PKCS#8 private key for the attestation signer.
    #[arg(long)]
    signer_key_path: Option<PathBuf>,

    /// Sensor gRPC endpoint; defaults to the cluster-local sensor service.
    #[arg(long)]
    sensor_endpoint: Option<String>,

    /// Namespace the sensor is deployed in, used to derive the default
    /// endpoint when none is given.
    #[arg(long)]
    sensor_namespace: Option<String>,

    /// Log filter, in tracing env-filter syntax.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&args.log_level)).init();

    match run(args).await {
        Ok(()) => {
            info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(&args.config).context("loading config")?;
    let signer = attest::signer::from_options(
        args.signer_kms_ref.as_deref(),
        args.signer_key_path.as_deref(),
    )
    .context("configuring signer")?;
    let emitter = attest::Emitter::new(signer, attest::registry::RegistryClient::new());

    let tls = match (args.tls_cert_path, args.tls_key_path) {
        (Some(cert), Some(key)) => Some(sensor::TlsPaths { cert, key }),
        _ => None,
    };
    let sensor_config = sensor::SensorConfig {
        endpoint: sensor::SensorConfig::endpoint_for(args.sensor_endpoint, args.sensor_namespace),
        tls,
        filter: config.pod_filter.clone(),
    };

    let client = kube::Client::try_default().await.context("building kubernetes client")?;
    let events = sensor::SensorClient::connect(&sensor_config)
        .await
        .context("connecting to sensor")?
        .subscribe()
        .await
        .context("subscribing to sensor events")?;

    let cache = Arc::new(cache::EventCache::new(cache::CacheConfig::default()));
    let ctx = reconcile::Context { client, cache, config, emitter };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    info!("starting provenant controller");
    supervisor::run(events, ctx, shutdown).await?;
    Ok(())
}

/// Cancel the lifecycle token on the first termination signal; force-exit
/// after three more.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut interrupt, mut terminate) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(interrupt), Ok(terminate)) => (interrupt, terminate),
                _ => {
                    error!("failed to install signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        info!("received termination signal, shutting down gracefully");
        shutdown.cancel();

        for remaining in (1..=3).rev() {
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = terminate.recv() => {}
            }
            warn!(remaining = remaining - 1, "shutdown already in progress");
        }
        error!("received repeated termination signals, forcing exit");
        std::process::exit(1);
    });
}
