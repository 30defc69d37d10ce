use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use chrono::{TimeZone, Utc};
use tracing::debug;

use super::{AuthData, EcrError, RegistryTokenClient};

/// Live registry token client backed by `aws-sdk-ecr`.
///
/// Each call builds a one-shot session from the caller-supplied static
/// credentials, ignoring any ambient credential provider chain (instance
/// profile, env vars, `~/.aws/credentials`), per the contract in spec §4.1.
#[derive(Debug, Default)]
pub struct EcrTokenClient;

impl EcrTokenClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RegistryTokenClient for EcrTokenClient {
    async fn get_auth_token(
        &self,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<AuthData, EcrError> {
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "eatr");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;

        let client = aws_sdk_ecr::Client::new(&sdk_config);

        debug!(region, "requesting ecr authorization token");

        let response = client
            .get_authorization_token()
            .send()
            .await
            .map_err(|err| EcrError::Request(Box::new(err)))?;

        let entry = response
            .authorization_data()
            .first()
            .ok_or_else(|| EcrError::NoAuthorizationData {
                region: region.to_string(),
            })?;

        let proxy_endpoint = entry
            .proxy_endpoint()
            .ok_or(EcrError::IncompleteAuthorizationData {
                field: "proxy_endpoint",
            })?
            .to_string();
        let authorization_token =
            entry
                .authorization_token()
                .ok_or(EcrError::IncompleteAuthorizationData {
                    field: "authorization_token",
                })?
                .to_string();
        let expires_at = entry
            .expires_at()
            .map(|dt| Utc.timestamp_opt(dt.secs(), 0).single().unwrap_or_else(Utc::now))
            .unwrap_or_else(Utc::now);

        Ok(AuthData {
            proxy_endpoint,
            authorization_token,
            expires_at,
        })
    }
}
