//! Readiness signaling to the supervising process manager.
//!
//! The renewal loop reports "ready" once per successful cycle. Delivery is
//! best-effort: running without a supervisor is not an error, and a failed
//! notification is logged by the caller and dropped, never propagated.

use std::sync::atomic::{AtomicUsize, Ordering};

use sd_notify::NotifyState;
use thiserror::Error;

/// Failed readiness notification. Warned about, never fatal.
#[derive(Debug, Error)]
#[error("sd_notify failed: {0}")]
pub struct NotifyError(#[from] std::io::Error);

/// Supervisor readiness channel.
pub trait ReadinessNotifier: Send + Sync {
    /// Signal that a renewal cycle completed successfully.
    fn notify_ready(&self) -> Result<(), NotifyError>;
}

/// Notifier backed by the systemd notification socket.
///
/// Sends READY=1 and unsets NOTIFY_SOCKET afterwards, so only the first
/// cycle's signal actually reaches systemd. With no socket in the
/// environment the call is a no-op success.
#[derive(Debug, Default)]
pub struct SystemdNotifier;

impl ReadinessNotifier for SystemdNotifier {
    fn notify_ready(&self) -> Result<(), NotifyError> {
        sd_notify::notify(true, &[NotifyState::Ready])?;
        Ok(())
    }
}

/// Counting notifier for tests.
#[derive(Debug, Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ready signals received.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ReadinessNotifier for CountingNotifier {
    fn notify_ready(&self) -> Result<(), NotifyError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test environments have no NOTIFY_SOCKET, which is exactly the
    // "no supervisor configured" case.
    #[test]
    fn notify_without_supervisor_is_success() {
        assert!(SystemdNotifier.notify_ready().is_ok());
    }

    #[test]
    fn counting_notifier_counts() {
        let notifier = CountingNotifier::new();
        assert_eq!(notifier.count(), 0);
        notifier.notify_ready().unwrap();
        notifier.notify_ready().unwrap();
        assert_eq!(notifier.count(), 2);
    }
}
