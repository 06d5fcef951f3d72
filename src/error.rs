//! Error taxonomy for the agent.
//!
//! Every variant here is fatal: the process exits non-zero and the
//! supervising process manager decides whether to restart it. A partly
//! renewed credential batch is treated the same as total failure, so
//! nothing below carries retry state. Readiness-notification failures are
//! the one non-fatal case and live in [`crate::notify`] instead.

use aws_sdk_ecr::error::SdkError;
use aws_sdk_ecr::operation::get_authorization_token::GetAuthorizationTokenError;
use thiserror::Error;

/// Fatal agent errors.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No explicit region and the instance metadata service had none.
    #[error("unable to resolve an AWS region: set AWS_REGION or run on a host with instance metadata")]
    RegionResolution,

    /// The authorization token request failed in transport or at the service.
    #[error("authorization token request failed: {0}")]
    Remote(#[source] Box<SdkError<GetAuthorizationTokenError>>),

    /// A returned credential record could not be decoded.
    #[error("malformed authorization token for {registry}: {reason}")]
    MalformedToken { registry: String, reason: String },

    /// The container runtime rejected or failed the login invocation.
    #[error("runtime login failed for {endpoint}: {reason}")]
    Login { endpoint: String, reason: String },

    /// The token response held zero credentials. Fatal so the renewal loop
    /// never sleeps with nothing scheduled.
    #[error("authorization token response contained no credentials; check REGISTRIES and registry permissions")]
    EmptyBatch,
}
