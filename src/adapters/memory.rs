//! In-memory registry adapter.
//!
//! Keeps disease panels resident in the process. Suits the responder in
//! single-node deployments and all of the test wiring; swapping in a
//! database-backed registry is a matter of implementing the same port.
//!
//! # Lock Behavior
//!
//! The panel map sits behind an `RwLock`. A poisoned lock (from a panic
//! in another thread) will cause panic rather than serve partial data.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::MarkerId;
use crate::ports::{DiseaseRegistry, RegistryError};

struct DiseaseEntry {
    markers: Vec<MarkerId>,
    calibration: Option<f64>,
}

/// Registry adapter backed by a process-local map.
pub struct InMemoryRegistry {
    diseases: RwLock<HashMap<String, DiseaseEntry>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            diseases: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a disease panel.
    ///
    /// The calibration constant is validated here, at the point it is
    /// set: reads never see an out-of-range value. A panel may be
    /// registered without a constant, in which case screenings against
    /// it score on the fallback scale.
    ///
    /// # Errors
    /// Rejects constants outside `(0, 100]`, including non-finite ones.
    pub fn register_disease(
        &self,
        disease_id: &str,
        markers: Vec<MarkerId>,
        calibration: Option<f64>,
    ) -> Result<(), RegistryError> {
        if let Some(constant) = calibration {
            if !constant.is_finite() || constant <= 0.0 || constant > 100.0 {
                return Err(RegistryError::InvalidCalibration {
                    disease: disease_id.to_string(),
                    constant,
                });
            }
        }

        let mut diseases = self.diseases.write().expect("Lock failed");
        diseases.insert(
            disease_id.to_string(),
            DiseaseEntry {
                markers,
                calibration,
            },
        );
        Ok(())
    }

    /// Registered disease count.
    #[must_use]
    pub fn disease_count(&self) -> usize {
        self.diseases.read().expect("Lock failed").len()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DiseaseRegistry for InMemoryRegistry {
    fn markers(&self, disease_id: &str) -> Result<Vec<MarkerId>, RegistryError> {
        let diseases = self.diseases.read().expect("Lock failed");
        diseases
            .get(disease_id)
            .map(|entry| entry.markers.clone())
            .ok_or_else(|| RegistryError::DiseaseNotFound(disease_id.to_string()))
    }

    fn calibration_constant(&self, disease_id: &str) -> Result<f64, RegistryError> {
        let diseases = self.diseases.read().expect("Lock failed");
        let entry = diseases
            .get(disease_id)
            .ok_or_else(|| RegistryError::DiseaseNotFound(disease_id.to_string()))?;
        entry
            .calibration
            .ok_or_else(|| RegistryError::CalibrationUnavailable(disease_id.to_string()))
    }
}
