use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{AuthData, EcrError, RegistryTokenClient};

/// Deterministic stand-in for [`EcrTokenClient`](super::EcrTokenClient) used
/// by reconciler tests. Seeded per-region so different registries can return
/// distinguishable tokens, and records every call it received for assertions.
#[derive(Debug, Default)]
pub struct FakeRegistryTokenClient {
    tokens: Mutex<HashMap<String, AuthData>>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeRegistryTokenClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a canned response for a given region.
    pub async fn seed(&self, region: &str, proxy_endpoint: &str, authorization_token: &str) {
        self.tokens.lock().await.insert(
            region.to_string(),
            AuthData {
                proxy_endpoint: proxy_endpoint.to_string(),
                authorization_token: authorization_token.to_string(),
                expires_at: Utc::now() + chrono::Duration::hours(12),
            },
        );
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl RegistryTokenClient for FakeRegistryTokenClient {
    async fn get_auth_token(
        &self,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<AuthData, EcrError> {
        self.calls.lock().await.push((
            region.to_string(),
            access_key_id.to_string(),
            secret_access_key.to_string(),
        ));

        self.tokens
            .lock()
            .await
            .get(region)
            .cloned()
            .ok_or_else(|| EcrError::NoAuthorizationData {
                region: region.to_string(),
            })
    }
}
