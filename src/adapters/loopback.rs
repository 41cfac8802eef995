//! Loopback transport adapter.
//!
//! Runs the responder in-process while still round-tripping both
//! messages through the JSON wire encoding, so an exchange here parses
//! exactly what a remote endpoint would emit. Used by single-node
//! deployments and as the reference transport in tests.

use crate::application::PsiResponder;
use crate::domain::{PsiRequest, PsiResponse};
use crate::ports::{DiseaseRegistry, PsiTransport, TransportError};
use crate::GenoscreenError;

/// Transport adapter that short-circuits to a local responder.
pub struct LoopbackTransport<R>
where
    R: DiseaseRegistry,
{
    responder: PsiResponder<R>,
}

impl<R> LoopbackTransport<R>
where
    R: DiseaseRegistry,
{
    #[must_use]
    pub fn new(responder: PsiResponder<R>) -> Self {
        Self { responder }
    }
}

impl<R> PsiTransport for LoopbackTransport<R>
where
    R: DiseaseRegistry,
{
    fn exchange(&self, request: &PsiRequest) -> Result<PsiResponse, TransportError> {
        let outgoing = serde_json::to_string(request)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let decoded: PsiRequest = serde_json::from_str(&outgoing)
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let response = match self.responder.handle(&decoded) {
            Ok(response) => response,
            Err(GenoscreenError::Registry(cause)) => return Err(TransportError::Rejected(cause)),
            Err(other) => return Err(TransportError::Network(other.to_string())),
        };

        let incoming = serde_json::to_string(&response)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        serde_json::from_str(&incoming)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}
