//! # Reconciler core
//!
//! Consumes work queue keys, computes candidate (namespace, registry) pairs,
//! fetches ECR tokens, and materializes per-namespace pull secrets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::queue::{WorkQueue, ALL_NAMESPACES_KEY};
use crate::ecr::RegistryTokenClient;
use crate::k8s::{is_candidate, matching_registry_labels, AccessorError, ClusterAccessor};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cluster access failed: {0}")]
    Accessor(#[from] AccessorError),
    #[error("ecr request failed: {0}")]
    Ecr(#[from] crate::ecr::EcrError),
    #[error("aws credentials secret {secret} is missing required field {field}")]
    MalformedCredentials { secret: String, field: &'static str },
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub host_namespace: String,
    pub aws_credentials_secret_prefix: String,
    pub auth_token_renewal_interval: std::time::Duration,
}

pub struct Reconciler {
    accessor: Arc<dyn ClusterAccessor>,
    token_client: Arc<dyn RegistryTokenClient>,
    queue: Arc<WorkQueue>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        accessor: Arc<dyn ClusterAccessor>,
        token_client: Arc<dyn RegistryTokenClient>,
        queue: Arc<WorkQueue>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            accessor,
            token_client,
            queue,
            config,
        }
    }

    /// Waits for the event source to report synced, then runs the worker and
    /// the renewal ticker until `stop` is cancelled.
    pub async fn run(self: Arc<Self>, synced: impl Fn() -> bool, stop: CancellationToken) {
        while !synced() {
            if stop.is_cancelled() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        info!("namespace informer synced, starting reconciler");

        let worker = {
            let reconciler = Arc::clone(&self);
            tokio::spawn(async move { reconciler.worker_loop().await })
        };

        let ticker = {
            let queue = Arc::clone(&self.queue);
            let interval = self.config.auth_token_renewal_interval;
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // first tick fires immediately; skip it, `run` enqueues on sync instead
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => return,
                        _ = ticker.tick() => queue.add(ALL_NAMESPACES_KEY).await,
                    }
                }
            })
        };

        self.queue.add(ALL_NAMESPACES_KEY).await;

        stop.cancelled().await;
        self.queue.shutdown().await;
        let _ = worker.await;
        ticker.abort();
    }

    async fn worker_loop(self: Arc<Self>) {
        while let Some(key) = self.queue.get().await {
            if let Err(err) = self.renew(&key).await {
                warn!(key = %key, error = %err, "renewal failed, will retry on next trigger");
            }
            self.queue.done(&key).await;
        }
    }

    /// Implements the renewal algorithm for a single queue key: resolve
    /// candidate namespaces, collect their distinct registries, fetch a
    /// token per registry, and write a pull secret per (namespace, registry)
    /// pair. Public so integration tests can drive it directly against
    /// fakes without running the worker loop.
    pub async fn renew(&self, key: &str) -> Result<(), ReconcileError> {
        let candidates = self.candidate_namespaces(key).await?;
        if candidates.is_empty() {
            debug!(key, "no candidate namespaces, nothing to do");
            return Ok(());
        }

        let registries = distinct_registries(&candidates);

        let mut tokens = BTreeMap::new();
        for registry in &registries {
            match self.fetch_token_for_registry(registry).await? {
                Some(auth) => {
                    tokens.insert(registry.clone(), auth);
                }
                None => {
                    warn!(registry, "no aws credentials for registry, skipping");
                }
            }
        }

        for namespace in &candidates {
            let namespace_name = namespace.name_any();
            for registry in matching_registry_labels(namespace) {
                let Some(auth) = tokens.get(registry) else {
                    continue;
                };
                self.materialize_pull_secret(&namespace_name, registry, auth)
                    .await?;
            }
        }

        if key == ALL_NAMESPACES_KEY {
            metrics::increment_secret_renewals();
        }

        Ok(())
    }

    async fn candidate_namespaces(&self, key: &str) -> Result<Vec<Namespace>, ReconcileError> {
        if key == ALL_NAMESPACES_KEY {
            let all = self.accessor.get_namespaces().await?;
            return Ok(all.into_iter().filter(is_candidate).collect());
        }

        match self.accessor.get_namespace(key).await {
            Ok(namespace) if is_candidate(&namespace) => Ok(vec![namespace]),
            Ok(_) => Ok(Vec::new()),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch_token_for_registry(
        &self,
        registry: &str,
    ) -> Result<Option<crate::ecr::AuthData>, ReconcileError> {
        let secret_name = format!(
            "{}-{registry}",
            self.config.aws_credentials_secret_prefix
        );
        let credentials_secret = match self
            .accessor
            .get_secret(&self.config.host_namespace, &secret_name)
            .await
        {
            Ok(secret) => secret,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let region = secret_data_str(&credentials_secret, "aws_region").ok_or(
            ReconcileError::MalformedCredentials {
                secret: secret_name.clone(),
                field: "aws_region",
            },
        )?;
        let access_key_id = secret_data_str(&credentials_secret, "aws_access_key_id").ok_or(
            ReconcileError::MalformedCredentials {
                secret: secret_name.clone(),
                field: "aws_access_key_id",
            },
        )?;
        let secret_access_key = secret_data_str(&credentials_secret, "aws_secret_access_key")
            .ok_or(ReconcileError::MalformedCredentials {
                secret: secret_name,
                field: "aws_secret_access_key",
            })?;

        let auth = self
            .token_client
            .get_auth_token(&region, &access_key_id, &secret_access_key)
            .await?;
        Ok(Some(auth))
    }

    async fn materialize_pull_secret(
        &self,
        namespace: &str,
        registry: &str,
        auth: &crate::ecr::AuthData,
    ) -> Result<(), ReconcileError> {
        let payload = dockerconfigjson(&auth.proxy_endpoint, &auth.authorization_token);

        match self.accessor.get_secret(namespace, registry).await {
            Ok(mut existing) => {
                existing.data = Some(payload);
                self.accessor.update_secret(namespace, existing).await?;
                metrics::increment_secrets_created(namespace, registry);
                debug!(namespace, registry, "updated pull secret");
            }
            Err(err) if err.is_not_found() => {
                let secret = pull_secret(namespace, registry, payload);
                self.accessor.create_secret(namespace, secret).await?;
                metrics::increment_secrets_created(namespace, registry);
                info!(namespace, registry, "created pull secret");
            }
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }
}

fn distinct_registries(namespaces: &[Namespace]) -> BTreeSet<String> {
    namespaces
        .iter()
        .flat_map(|ns| matching_registry_labels(ns).map(str::to_string))
        .collect()
}

fn secret_data_str(secret: &Secret, key: &str) -> Option<String> {
    let bytes = secret.data.as_ref()?.get(key)?;
    String::from_utf8(bytes.0.clone()).ok()
}

fn dockerconfigjson(
    proxy_endpoint: &str,
    authorization_token: &str,
) -> BTreeMap<String, ByteString> {
    let json = serde_json::json!({
        "auths": {
            proxy_endpoint: { "auth": authorization_token },
        }
    });
    let mut data = BTreeMap::new();
    data.insert(
        ".dockerconfigjson".to_string(),
        ByteString(json.to_string().into_bytes()),
    );
    data
}

fn pull_secret(namespace: &str, name: &str, data: BTreeMap<String, ByteString>) -> Secret {
    Secret {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/dockerconfigjson".to_string()),
        data: Some(data),
        ..Default::default()
    }
}
