//! Credential fetching against the ECR authorization token API.
//!
//! One fetch issues a single GetAuthorizationToken call and decodes every
//! returned record into a [`Credential`]. Nothing is cached and nothing is
//! retried here; the renewal loop's next cycle is the retry policy.

use async_trait::async_trait;
use aws_config::imds::region::ImdsRegionProvider;
use aws_config::meta::region::ProvideRegion;
use aws_config::{BehaviorVersion, Region};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::AgentError;

/// One issued authorization for a single registry endpoint.
///
/// Created fresh each fetch, used for one login, then dropped. Never
/// persisted and never reused across cycles.
#[derive(Clone, Serialize)]
pub struct Credential {
    /// Decoded username.
    pub principal: String,

    /// Decoded password. Redacted from `Debug` output and never logged.
    pub secret: String,

    /// Proxy endpoint this credential authenticates against.
    pub endpoint: String,

    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,

    /// Opaque token exactly as issued.
    pub raw_token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of credential batches.
///
/// The renewal loop is written against this seam so tests can drive it
/// without the remote service.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch a fresh batch, one entry per registry. May be empty.
    async fn fetch(&self) -> Result<Vec<Credential>, AgentError>;
}

/// Fetcher backed by the ECR API.
pub struct EcrFetcher {
    client: aws_sdk_ecr::Client,
    registry_ids: Vec<String>,
}

impl EcrFetcher {
    /// Resolve the region and build a client for it.
    pub async fn connect(config: &Config) -> Result<Self, AgentError> {
        let region = resolve_region(config.region.clone()).await?;
        debug!(region = %region, "Resolved region");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        Ok(Self {
            client: aws_sdk_ecr::Client::new(&sdk_config),
            registry_ids: config.registries.clone(),
        })
    }
}

#[async_trait]
impl CredentialSource for EcrFetcher {
    async fn fetch(&self) -> Result<Vec<Credential>, AgentError> {
        // registry_ids is deprecated upstream but remains the only way to
        // scope the token request to specific registries.
        #[allow(deprecated)]
        let response = self
            .client
            .get_authorization_token()
            .set_registry_ids((!self.registry_ids.is_empty()).then(|| self.registry_ids.clone()))
            .send()
            .await
            .map_err(|e| AgentError::Remote(Box::new(e)))?;

        let records = response.authorization_data();
        let mut batch = Vec::with_capacity(records.len());

        for record in records {
            let endpoint = record
                .proxy_endpoint()
                .ok_or_else(|| malformed("unknown", "record is missing the proxy endpoint"))?
                .to_string();

            let raw_token = record
                .authorization_token()
                .ok_or_else(|| malformed(&endpoint, "record is missing the authorization token"))?
                .to_string();

            let (principal, secret) = decode_authorization_token(&raw_token)
                .map_err(|reason| AgentError::MalformedToken {
                    registry: endpoint.clone(),
                    reason,
                })?;

            let expires_at = record
                .expires_at()
                .and_then(to_utc)
                .ok_or_else(|| malformed(&endpoint, "record is missing a decodable expiry"))?;

            batch.push(Credential {
                principal,
                secret,
                endpoint,
                expires_at,
                raw_token,
            });
        }

        Ok(batch)
    }
}

/// Decode an opaque authorization token into `(principal, secret)`.
///
/// The token is base64 over a UTF-8 `user:password` string. The split is on
/// the first colon only; the password may itself contain colons.
pub fn decode_authorization_token(raw: &str) -> Result<(String, String), String> {
    let bytes = BASE64
        .decode(raw)
        .map_err(|e| format!("invalid base64: {e}"))?;

    let decoded = String::from_utf8(bytes).map_err(|_| "token is not valid UTF-8".to_string())?;

    let (principal, secret) = decoded
        .split_once(':')
        .ok_or_else(|| "expected `user:password` with a colon separator".to_string())?;

    Ok((principal.to_string(), secret.to_string()))
}

/// An explicit override wins; otherwise ask the instance metadata service
/// which region this host runs in.
async fn resolve_region(override_region: Option<String>) -> Result<Region, AgentError> {
    if let Some(region) = override_region {
        return Ok(Region::new(region));
    }

    let imds = ImdsRegionProvider::builder().build();
    imds.region().await.ok_or(AgentError::RegionResolution)
}

fn to_utc(timestamp: &aws_sdk_ecr::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn malformed(registry: &str, reason: &str) -> AgentError {
    AgentError::MalformedToken {
        registry: registry.to_string(),
        reason: reason.to_string(),
    }
}

/// Fixed-batch source for tests and development.
pub struct StaticSource {
    batch: Vec<Credential>,
    fail: bool,
}

impl StaticSource {
    /// Create a source that returns the same batch on every fetch.
    pub fn new(batch: Vec<Credential>) -> Self {
        Self { batch, fail: false }
    }

    /// Create a source that fails every fetch.
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            batch: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CredentialSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<Credential>, AgentError> {
        if self.fail {
            return Err(AgentError::MalformedToken {
                registry: "mock".to_string(),
                reason: "source configured to fail".to_string(),
            });
        }
        Ok(self.batch.clone())
    }
}
