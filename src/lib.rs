//! ECR credential agent.
//!
//! Obtains short-lived registry credentials from ECR and hands them to a
//! local container runtime: one-shot mode prints login commands, renewal
//! mode stays in the foreground and re-authenticates before each credential
//! set expires.
//!
//! ## Modules
//!
//! - `fetcher`: token fetching and decoding against the ECR API
//! - `login`: container runtime login invocation
//! - `renewer`: the renewal scheduler loop
//! - `notify`: systemd readiness signaling
//! - `output`: one-shot command rendering

pub mod config;
pub mod error;
pub mod fetcher;
pub mod login;
pub mod notify;
pub mod output;
pub mod renewer;

pub use config::Config;
pub use error::AgentError;
pub use fetcher::{Credential, CredentialSource, EcrFetcher};
pub use login::{DockerCli, LoginRuntime};
pub use notify::{ReadinessNotifier, SystemdNotifier};
pub use renewer::Renewer;
