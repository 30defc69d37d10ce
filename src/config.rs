//! # Configuration
//!
//! Startup flags for the controller, matching the ambient-stack style of
//! the rest of the binary: a `clap` derive struct, Kubernetes-style duration
//! strings, and a `load()` step that runs additional validation `clap`
//! itself can't express.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

/// EATR controller configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "eatr-controller", about = "ECR image-pull credential controller", long_about = None)]
pub struct Config {
    /// How often the renewal ticker re-materializes pull secrets for every
    /// candidate namespace. Kubernetes-style duration (e.g. "6h"). Must be
    /// less than 12h, since ECR authorization tokens are valid for 12h.
    #[arg(long, default_value = "6h", value_parser = parse_kubernetes_duration)]
    pub auth_token_renewal_interval: Duration,

    /// Prefix of the AWS-credentials secret name in the host namespace; the
    /// full name is `{prefix}-{registry identifier}`.
    #[arg(long, default_value = "eatr-aws-credentials")]
    pub aws_credentials_secret_prefix: String,

    /// Namespace holding the long-lived AWS credentials secrets.
    #[arg(long, default_value = "ci-cd")]
    pub host_namespace: String,

    /// Resync interval for the namespace informer. Kubernetes-style duration.
    #[arg(long, default_value = "5m", value_parser = parse_kubernetes_duration)]
    pub informers_resync_interval: Duration,

    /// Path to the kubeconfig file. Defaults to the in-cluster config when
    /// unset and `KUBECONFIG` is also unset.
    #[arg(long, env = "KUBECONFIG")]
    pub config_file_path: Option<String>,

    /// Verbosity level: 0 maps to INFO, 6 and above to DEBUG.
    #[arg(long, default_value_t = 0)]
    pub logging_verbosity_level: u8,

    /// Port the HTTP server (`/metrics`, `/debug/pprof/*`) listens on.
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// How long to wait after a shutdown signal before exiting, to let
    /// in-flight work finish. Kubernetes-style duration.
    #[arg(long, default_value = "3s", value_parser = parse_kubernetes_duration)]
    pub shutdown_grace_period: Duration,
}

impl Config {
    /// Parses CLI flags/environment, then applies cross-field validation
    /// `clap` can't express on its own.
    pub fn load() -> Result<Self> {
        let config = Self::parse();
        if config.auth_token_renewal_interval >= Duration::from_secs(12 * 3600) {
            bail!(
                "auth-token-renewal-interval must be less than 12h, got {:?}",
                config.auth_token_renewal_interval
            );
        }
        Ok(config)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        if self.logging_verbosity_level >= 6 {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Parses a Kubernetes-style duration string: `<number><unit>` where unit is
/// one of `s`, `m`, `h`, `d`.
fn parse_kubernetes_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration string cannot be empty".to_string());
    }

    let unit = trimmed
        .chars()
        .last()
        .ok_or_else(|| "duration string cannot be empty".to_string())?;
    let number_str = &trimmed[..trimmed.len() - unit.len_utf8()];
    let number: u64 = number_str.parse().map_err(|_| {
        format!("invalid duration '{trimmed}': expected <number><unit> (e.g. '1m', '5m', '1h')")
    })?;
    if number == 0 {
        return Err(format!(
            "invalid duration '{trimmed}': number must be greater than 0"
        ));
    }

    let seconds = match unit.to_ascii_lowercase() {
        's' => number,
        'm' => number * 60,
        'h' => number * 3600,
        'd' => number * 86400,
        other => {
            return Err(format!(
                "invalid duration unit '{other}' in '{trimmed}': expected s, m, h, or d"
            ))
        }
    };

    Ok(Duration::from_secs(seconds))
}
