//! Configuration for the agent.

use std::path::PathBuf;

use anyhow::Result;

/// Default safety margin before the earliest credential expiry.
pub const DEFAULT_MARGIN_SECS: u64 = 3600;

/// Agent configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit region override. When absent the region comes from the
    /// instance metadata service.
    pub region: Option<String>,

    /// Registry IDs to scope the token request to. Empty means every
    /// registry visible to the caller's identity.
    pub registries: Vec<String>,

    /// Custom format file for one-shot output.
    pub template: Option<PathBuf>,

    /// Container runtime binary invoked for `login`.
    pub docker_path: PathBuf,

    /// Seconds subtracted from the earliest expiry when scheduling the
    /// next renewal.
    pub margin_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("AWS_REGION").ok().filter(|s| !s.is_empty());

        let registries = std::env::var("REGISTRIES")
            .map(|s| parse_registries(&s))
            .unwrap_or_default();

        let template = std::env::var("TEMPLATE").ok().map(PathBuf::from);

        let docker_path = std::env::var("ECR_AGENT_DOCKER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/usr/bin/docker"));

        let margin_secs = std::env::var("ECR_AGENT_MARGIN_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MARGIN_SECS);

        Ok(Self {
            region,
            registries,
            template,
            docker_path,
            margin_secs,
        })
    }
}

/// Parse a comma-separated registry ID list. Entries are trimmed and
/// empty entries dropped, so `REGISTRIES=""` still means "all registries".
pub fn parse_registries(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
