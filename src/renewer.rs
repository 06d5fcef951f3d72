//! Renewal loop that keeps the container runtime authenticated.
//!
//! Single state repeated forever: fetch a fresh batch, log each credential
//! in, signal readiness, then sleep until a safety margin before the
//! earliest expiry. Any fetch or login failure aborts the loop; there is no
//! partial-credential state worth continuing with, so resilience is left to
//! the process supervisor restarting the agent.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::fetcher::CredentialSource;
use crate::login::LoginRuntime;
use crate::notify::ReadinessNotifier;

/// Drives the fetch -> login -> notify -> sleep cycle.
pub struct Renewer {
    source: Arc<dyn CredentialSource>,
    runtime: Arc<dyn LoginRuntime>,
    notifier: Arc<dyn ReadinessNotifier>,
    margin: Duration,
}

impl Renewer {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        runtime: Arc<dyn LoginRuntime>,
        notifier: Arc<dyn ReadinessNotifier>,
        margin: Duration,
    ) -> Self {
        Self {
            source,
            runtime,
            notifier,
            margin,
        }
    }

    /// Run one renewal cycle and return the earliest expiry in the batch.
    ///
    /// Credentials are logged in strictly in the order the source returned
    /// them. An empty batch is fatal: with nothing to renew there is also
    /// nothing to schedule the next wake from.
    pub async fn renew_once(&self) -> Result<DateTime<Utc>, AgentError> {
        let batch = self.source.fetch().await?;
        if batch.is_empty() {
            return Err(AgentError::EmptyBatch);
        }

        let total = batch.len();
        let mut min_expiry = batch[0].expires_at;

        for (index, credential) in batch.iter().enumerate() {
            info!(
                credential = index + 1,
                total,
                endpoint = %credential.endpoint,
                expires_at = %credential.expires_at,
                "Obtained registry credentials"
            );

            self.runtime.login(credential).await?;

            if credential.expires_at < min_expiry {
                min_expiry = credential.expires_at;
            }
        }

        Ok(min_expiry)
    }

    /// Run renewal cycles until a fatal error or until `shutdown` flips.
    ///
    /// The shutdown receiver is checked during the inter-cycle sleep, so a
    /// hosting environment can stop the loop without killing the process
    /// mid-login.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), AgentError> {
        info!(
            margin_secs = self.margin.as_secs(),
            "Starting credential renewal loop"
        );

        loop {
            info!("Renewing registry credentials");
            let min_expiry = self.renew_once().await?;

            if let Err(e) = self.notifier.notify_ready() {
                warn!(error = %e, "Readiness notification failed");
            }

            let now = Utc::now();
            let sleep = sleep_duration(min_expiry, now, self.margin);
            let wake_at =
                now + chrono::Duration::from_std(sleep).unwrap_or_else(|_| chrono::Duration::zero());
            info!(
                earliest_expiry = %min_expiry,
                next_login = %wake_at,
                "Scheduled next login"
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Renewal loop shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Time to sleep before the next cycle: the earliest expiry minus the
/// safety margin. Clamped at zero, so a credential expiring within the
/// margin triggers an immediate re-login rather than a negative sleep.
fn sleep_duration(min_expiry: DateTime<Utc>, now: DateTime<Utc>, margin: Duration) -> Duration {
    let until_expiry = (min_expiry - now).to_std().unwrap_or(Duration::ZERO);
    until_expiry.saturating_sub(margin)
}
