//! Text generation through hosted agents.
//!
//! The report pipeline only sees [`GenerationCapability`]; the Azure agent
//! service is one implementation of it, provisioned lazily by
//! [`CapabilityProvider`].

pub mod azure;
pub mod capability;
pub mod credential;
pub mod instructions;
pub mod policy;
pub mod provider;

pub use azure::{AzureAgentsClient, AzureAgentsFactory};
pub use capability::{CapabilityFactory, GenerationCapability, RunHandle, RunState, RunStatus};
pub use credential::{ClientCredentials, ClientCredentialsToken, StaticToken, TokenSource};
pub use instructions::{AgentProfile, ENGLISH_REPORT, HTML_MAKER, MALAY_REPORT};
pub use policy::{generate, GenerationPolicy};
pub use provider::{CapabilityProvider, ProviderStatus};

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service unavailable: {0}")]
    Unavailable(String),
    #[error("failed to submit run: {0}")]
    Submit(String),
    #[error("generation service refused the credentials: {0}")]
    Unauthorized(String),
    #[error("generation service rejected the request: {0}")]
    Rejected(String),
    #[error("failed to poll run: {0}")]
    Poll(String),
    #[error("run ended with status {status}: {message}")]
    RunFailed { status: RunStatus, message: String },
    #[error("failed to fetch run result: {0}")]
    Fetch(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Errors worth another attempt under the retry policy. Only network
    /// failures and 5xx/408/429 answers map to `Submit`/`Poll`.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Submit(_) | Self::Poll(_))
    }

    /// The credentials behind the capability are no longer accepted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
