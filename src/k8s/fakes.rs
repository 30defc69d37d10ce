use std::collections::HashMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use tokio::sync::RwLock;

use super::{AccessorError, ClusterAccessor};

/// In-memory [`ClusterAccessor`] used by tests. Reproduces the same
/// `NotFound` error-kind distinguishability as the live implementation so
/// reconciler tests exercise identical control flow.
#[derive(Debug, Default)]
pub struct FakeClusterAccessor {
    namespaces: RwLock<HashMap<String, Namespace>>,
    // keyed by (namespace, secret name)
    secrets: RwLock<HashMap<(String, String), Secret>>,
}

impl FakeClusterAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_namespace(&self, namespace: Namespace) {
        let name = namespace
            .metadata
            .name
            .clone()
            .expect("seeded namespace must have a name");
        self.namespaces.write().await.insert(name, namespace);
    }

    pub async fn seed_secret(&self, namespace: &str, secret: Secret) {
        let name = secret
            .metadata
            .name
            .clone()
            .expect("seeded secret must have a name");
        self.secrets
            .write()
            .await
            .insert((namespace.to_string(), name), secret);
    }

    /// Read back a secret directly, bypassing the accessor trait, for test
    /// assertions on the final on-cluster state.
    pub async fn peek_secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn secret_count(&self) -> usize {
        self.secrets.read().await.len()
    }
}

#[async_trait]
impl ClusterAccessor for FakeClusterAccessor {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, AccessorError> {
        self.namespaces
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AccessorError::NotFound {
                kind: "namespace",
                name: name.to_string(),
            })
    }

    async fn get_namespaces(&self) -> Result<Vec<Namespace>, AccessorError> {
        Ok(self.namespaces.read().await.values().cloned().collect())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, AccessorError> {
        self.secrets
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| AccessorError::NotFound {
                kind: "secret",
                name: name.to_string(),
            })
    }

    async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, AccessorError> {
        let name = secret
            .metadata
            .name
            .clone()
            .expect("secret to create must have a name");
        self.secrets
            .write()
            .await
            .insert((namespace.to_string(), name), secret.clone());
        Ok(secret)
    }

    async fn update_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, AccessorError> {
        let name = secret
            .metadata
            .name
            .clone()
            .expect("secret to update must have a name");
        let key = (namespace.to_string(), name);
        let mut secrets = self.secrets.write().await;
        if !secrets.contains_key(&key) {
            return Err(AccessorError::NotFound {
                kind: "secret",
                name: key.1,
            });
        }
        secrets.insert(key, secret.clone());
        Ok(secret)
    }
}
