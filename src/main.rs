//! # EATR Controller
//!
//! A cluster-scoped control loop that maintains short-lived Amazon ECR
//! image-pull credentials across tenant namespaces.
//!
//! ## Overview
//!
//! 1. **Watching namespaces** - discovers which namespaces opt into which
//!    registries via labels matching the registry-identifier pattern.
//! 2. **Exchanging AWS credentials** - long-lived credentials held in a
//!    single host namespace are exchanged for short-lived ECR tokens.
//! 3. **Materializing pull secrets** - a `kubernetes.io/dockerconfigjson`
//!    secret is created or updated per (namespace, registry) pair.
//! 4. **Prometheus metrics** - exposes counters for monitoring.

use std::sync::Arc;

use anyhow::{Context, Result};
use eatr_controller::config::Config;
use eatr_controller::controller::{NamespaceEventSource, Reconciler, ReconcilerConfig, WorkQueue};
use eatr_controller::controller::events::LiveNamespaceEventSource;
use eatr_controller::ecr::EcrTokenClient;
use eatr_controller::k8s::LiveClusterAccessor;
use eatr_controller::observability::metrics;
use eatr_controller::server;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal startup error");
        std::process::exit(2);
    }
}

async fn run() -> Result<()> {
    let config = Config::load().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("eatr_controller={}", config.tracing_level()).into()),
        )
        .init();

    info!("starting eatr controller");

    metrics::register_metrics().context("failed to register prometheus metrics")?;

    let client = build_kube_client(&config).await?;

    let stop = CancellationToken::new();
    let queue = Arc::new(WorkQueue::new());

    let accessor = Arc::new(LiveClusterAccessor::new(client.clone()));
    let token_client = Arc::new(EcrTokenClient::new());
    let reconciler_config = ReconcilerConfig {
        host_namespace: config.host_namespace.clone(),
        aws_credentials_secret_prefix: config.aws_credentials_secret_prefix.clone(),
        auth_token_renewal_interval: config.auth_token_renewal_interval,
    };
    let reconciler = Arc::new(Reconciler::new(
        accessor,
        token_client,
        Arc::clone(&queue),
        reconciler_config,
    ));

    let event_source = Arc::new(LiveNamespaceEventSource::spawn(
        client,
        Arc::clone(&queue),
        config.informers_resync_interval,
        stop.clone(),
    ));

    let reconciler_task = {
        let reconciler = Arc::clone(&reconciler);
        let stop = stop.clone();
        let event_source = Arc::clone(&event_source);
        tokio::spawn(async move { reconciler.run(move || event_source.has_synced(), stop).await })
    };

    let server_task = {
        let stop = stop.clone();
        let port = config.port;
        tokio::spawn(async move {
            if let Err(err) = server::run(port, stop).await {
                error!(error = ?err, "http server error");
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping");
    stop.cancel();

    let _ = reconciler_task.await;
    let _ = server_task.await;

    tokio::time::sleep(config.shutdown_grace_period).await;
    info!("eatr controller stopped");

    Ok(())
}

async fn build_kube_client(config: &Config) -> Result<kube::Client> {
    let kube_config = if let Some(path) = &config.config_file_path {
        let kubeconfig = kube::config::Kubeconfig::read_from(path)
            .with_context(|| format!("failed to read kubeconfig at {path}"))?;
        kube::Config::from_custom_kubeconfig(kubeconfig, &Default::default())
            .await
            .context("failed to build client config from kubeconfig")?
    } else {
        kube::Config::infer()
            .await
            .context("failed to infer kubernetes client config")?
    };

    kube::Client::try_from(kube_config).context("failed to construct kubernetes client")
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
