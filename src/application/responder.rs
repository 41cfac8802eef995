//! Responder service: the registry side of a screening exchange.

use std::sync::Arc;

use crate::domain::{self, GroupParameters, PsiRequest, PsiResponse};
use crate::ports::DiseaseRegistry;
use crate::GenoscreenError;

/// Service answering blinded screening requests against registered
/// disease panels.
///
/// Holds no state between requests. Every exchange draws a fresh
/// blinding secret inside the domain layer and that secret is gone
/// before the response leaves this service, so two exchanges cannot be
/// correlated through it and nothing accumulates for an attacker to
/// steal.
pub struct PsiResponder<R>
where
    R: DiseaseRegistry,
{
    registry: Arc<R>,
    params: Arc<GroupParameters>,
}

impl<R> PsiResponder<R>
where
    R: DiseaseRegistry,
{
    /// Create a new responder over a registry.
    pub fn new(registry: Arc<R>, params: Arc<GroupParameters>) -> Self {
        Self { registry, params }
    }

    /// Answer one screening request.
    ///
    /// The panel lookup comes first: an unknown disease is rejected
    /// before any randomness is drawn.
    ///
    /// # Errors
    /// Returns error if the disease is not registered or the random
    /// source fails.
    pub fn handle(&self, request: &PsiRequest) -> Result<PsiResponse, GenoscreenError> {
        let panel = self.registry.markers(&request.disease_id)?;
        let response =
            domain::respond(&panel, &request.blinded_patient_markers, &self.params)?;

        tracing::debug!(
            "Answered screening exchange for disease {}: {} panel markers, {} patient elements",
            request.disease_id,
            response.blinded_disease_markers.len(),
            response.double_blinded_patient_markers.len()
        );
        Ok(response)
    }
}
