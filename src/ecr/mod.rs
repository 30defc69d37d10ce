//! # ECR Registry Token Client
//!
//! Wraps the single AWS ECR operation the controller needs
//! (`GetAuthorizationToken`) behind a small trait so the reconciler can be
//! tested against a fake without ever talking to AWS, and owns the registry
//! identifier regex shared by the reconciler.

mod client;
mod fakes;
pub mod registry_pattern;

pub use client::EcrTokenClient;
pub use fakes::FakeRegistryTokenClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// An authorization record returned by the registry's token endpoint.
///
/// Treated as opaque by the rest of the controller except for
/// `proxy_endpoint` and `authorization_token`, which are embedded verbatim
/// into the pull-secret payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthData {
    pub proxy_endpoint: String,
    pub authorization_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum EcrError {
    #[error("no authorization data returned for region {region}")]
    NoAuthorizationData { region: String },
    #[error("authorization data missing a required field: {field}")]
    IncompleteAuthorizationData { field: &'static str },
    #[error("ecr request failed: {0}")]
    Request(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Capability exposing a single call that, given a region and static AWS
/// credentials, returns a fresh registry authorization record.
#[async_trait]
pub trait RegistryTokenClient: Send + Sync {
    async fn get_auth_token(
        &self,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<AuthData, EcrError>;
}
