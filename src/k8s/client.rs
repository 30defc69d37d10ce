use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, PostParams};
use kube::error::ErrorResponse;

use super::{AccessorError, ClusterAccessor};

/// Live accessor backed by the Kubernetes API via `kube`.
#[derive(Debug, Clone)]
pub struct LiveClusterAccessor {
    client: kube::Client,
}

impl LiveClusterAccessor {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Classifies a `kube::Error` into `NotFound` where the API reported a 404,
/// leaving every other error as a generic, surfaced `Api` error.
fn classify(kind: &'static str, name: impl Into<String>, err: kube::Error) -> AccessorError {
    match err {
        kube::Error::Api(ErrorResponse { code: 404, .. }) => AccessorError::NotFound {
            kind,
            name: name.into(),
        },
        other => AccessorError::Api(other),
    }
}

#[async_trait]
impl ClusterAccessor for LiveClusterAccessor {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, AccessorError> {
        self.namespaces()
            .get(name)
            .await
            .map_err(|e| classify("namespace", name, e))
    }

    async fn get_namespaces(&self) -> Result<Vec<Namespace>, AccessorError> {
        let list = self
            .namespaces()
            .list(&Default::default())
            .await
            .map_err(AccessorError::Api)?;
        Ok(list.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, AccessorError> {
        self.secrets(namespace)
            .get(name)
            .await
            .map_err(|e| classify("secret", name, e))
    }

    async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, AccessorError> {
        self.secrets(namespace)
            .create(&PostParams::default(), &secret)
            .await
            .map_err(AccessorError::Api)
    }

    async fn update_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, AccessorError> {
        let name = secret
            .metadata
            .name
            .clone()
            .ok_or_else(|| AccessorError::NotFound {
                kind: "secret",
                name: "<unnamed>".to_string(),
            })?;
        self.secrets(namespace)
            .replace(&name, &PostParams::default(), &secret)
            .await
            .map_err(AccessorError::Api)
    }
}
