//! # Metrics
//!
//! Prometheus metrics for the controller.
//!
//! ## Metrics exposed
//!
//! - `secrets_created_total` - total pull secrets created, labeled namespace/name
//! - `secret_renewals_total` - total sentinel-keyed renewal passes completed

use std::sync::LazyLock;

use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec, Registry};

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static SECRETS_CREATED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secrets_created_total",
            "Total number of pull secrets created",
        ),
        &["namespace", "name"],
    )
    .expect("failed to create SECRETS_CREATED_TOTAL metric - this should never happen")
});

static SECRET_RENEWALS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_renewals_total",
        "Total number of completed renewal passes over all candidate namespaces",
    )
    .expect("failed to create SECRET_RENEWALS_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SECRETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_RENEWALS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_secrets_created(namespace: &str, name: &str) {
    SECRETS_CREATED_TOTAL
        .with_label_values(&[namespace, name])
        .inc();
}

pub fn increment_secret_renewals() {
    SECRET_RENEWALS_TOTAL.inc();
}

/// Renders the registered metric families in Prometheus text exposition
/// format, for the `/metrics` HTTP handler.
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}
