//! # Cluster Object Accessor
//!
//! Typed operations over the orchestrator API the reconciler needs:
//! namespace listing/lookup and secret get/create/update. Both the live,
//! `kube`-backed implementation and the in-memory fake used by tests
//! implement the same trait and the same `NotFound` error-kind
//! distinguishability, so reconciler logic is exercised identically either
//! way.

mod client;
pub mod fakes;

pub use client::LiveClusterAccessor;
pub use fakes::FakeClusterAccessor;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },
    #[error("kubernetes api error: {0}")]
    Api(#[from] kube::Error),
}

impl AccessorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AccessorError::NotFound { .. })
    }
}

/// Capability over the orchestrator API. Every method returns owned, deep
/// copies so callers may mutate freely before handing objects back to
/// `create_secret`/`update_secret`.
#[async_trait]
pub trait ClusterAccessor: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, AccessorError>;
    async fn get_namespaces(&self) -> Result<Vec<Namespace>, AccessorError>;
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, AccessorError>;
    async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, AccessorError>;
    async fn update_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, AccessorError>;
}

/// A namespace is a reconciliation candidate iff it is `Active` and carries
/// at least one label matching the registry pattern with value `"true"`.
pub fn is_candidate(namespace: &Namespace) -> bool {
    let active = namespace
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        == Some("Active");
    active && matching_registry_labels(namespace).next().is_some()
}

/// Distinct label keys on `namespace` that match the registry pattern with
/// value exactly `"true"`. Any other value (including `"false"` or absent)
/// disables that registry for this namespace.
pub fn matching_registry_labels(namespace: &Namespace) -> impl Iterator<Item = &str> {
    namespace
        .metadata
        .labels
        .iter()
        .flatten()
        .filter(|(key, value)| value.as_str() == "true" && crate::ecr::registry_pattern::is_registry_label(key))
        .map(|(key, _)| key.as_str())
}
