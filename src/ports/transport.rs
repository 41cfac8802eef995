//! Transport port: trait for carrying one protocol exchange.

use std::time::Duration;

use crate::domain::{PsiRequest, PsiResponse};

use super::RegistryError;

/// Error type for a failed exchange.
///
/// `Rejected` is a definitive answer from the far side (most commonly an
/// unknown disease) and must not be retried or degraded around; the
/// other variants describe the channel failing and leave room for a
/// caller to fall back to cached results.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Screening exchange timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network failure during screening exchange: {0}")]
    Network(String),

    #[error("Malformed response from screening endpoint: {0}")]
    InvalidResponse(String),

    #[error("Screening endpoint rejected the request: {0}")]
    Rejected(#[from] RegistryError),
}

/// Trait for the single request/response round trip of the protocol.
///
/// One call is one complete exchange; implementations hold no session
/// state between calls and must bound how long a call can block,
/// surfacing expiry as [`TransportError::Timeout`].
pub trait PsiTransport: Send + Sync {
    /// Deliver a request and return the endpoint's response.
    ///
    /// # Errors
    /// Returns a [`TransportError`] describing the failure; the request
    /// is never silently retried.
    fn exchange(&self, request: &PsiRequest) -> Result<PsiResponse, TransportError>;
}
