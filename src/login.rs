//! Container runtime login invocation.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::AgentError;
use crate::fetcher::Credential;

/// Runtime that can store a credential in its authentication state.
#[async_trait]
pub trait LoginRuntime: Send + Sync {
    /// Authenticate the runtime against the credential's endpoint.
    ///
    /// Fire-and-forget apart from error propagation; a failed invocation is
    /// fatal to the caller.
    async fn login(&self, credential: &Credential) -> Result<(), AgentError>;
}

/// Logs in by invoking the docker CLI.
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.docker_path.clone(),
        }
    }
}

#[async_trait]
impl LoginRuntime for DockerCli {
    async fn login(&self, credential: &Credential) -> Result<(), AgentError> {
        debug!(endpoint = %credential.endpoint, "Invoking runtime login");

        // The secret travels as argv only; it must not reach any log record.
        let output = Command::new(&self.binary)
            .arg("login")
            .arg("-u")
            .arg(&credential.principal)
            .arg("-p")
            .arg(&credential.secret)
            .arg("-e")
            .arg("none")
            .arg(&credential.endpoint)
            .output()
            .await
            .map_err(|e| AgentError::Login {
                endpoint: credential.endpoint.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            };
            return Err(AgentError::Login {
                endpoint: credential.endpoint.clone(),
                reason,
            });
        }

        Ok(())
    }
}

/// Recording runtime for tests: captures login order, optionally fails.
pub struct RecordingRuntime {
    endpoints: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self {
            endpoints: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Create a runtime that fails every login.
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            endpoints: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Endpoints logged in so far, in invocation order.
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoginRuntime for RecordingRuntime {
    async fn login(&self, credential: &Credential) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::Login {
                endpoint: credential.endpoint.clone(),
                reason: "runtime configured to fail".to_string(),
            });
        }
        self.endpoints
            .lock()
            .unwrap()
            .push(credential.endpoint.clone());
        Ok(())
    }
}
