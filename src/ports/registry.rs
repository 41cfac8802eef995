//! Registry port: trait for disease panel and calibration lookups.

use crate::domain::MarkerId;

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown disease: {0}")]
    DiseaseNotFound(String),

    #[error("No calibration constant registered for disease {0}")]
    CalibrationUnavailable(String),

    #[error("Calibration constant {constant} for disease {disease} is outside (0, 100]")]
    InvalidCalibration { disease: String, constant: f64 },

    #[error("Registry backend error: {0}")]
    Backend(String),
}

/// Trait for the responder-side disease registry.
///
/// Panels are the sensitive half of the responder's data; only the
/// responding service itself ever reads markers. Implementations must
/// reject calibration constants outside `(0, 100]` when panels are
/// registered, so values read back here are always usable as is.
pub trait DiseaseRegistry: Send + Sync {
    /// Canonical marker panel for a disease.
    ///
    /// # Errors
    /// [`RegistryError::DiseaseNotFound`] for unregistered ids.
    fn markers(&self, disease_id: &str) -> Result<Vec<MarkerId>, RegistryError>;

    /// Calibration constant for a disease.
    ///
    /// # Errors
    /// [`RegistryError::DiseaseNotFound`] for unregistered ids,
    /// [`RegistryError::CalibrationUnavailable`] when the disease exists
    /// but carries no constant.
    fn calibration_constant(&self, disease_id: &str) -> Result<f64, RegistryError>;
}

/// Trait for the client-side view of calibration data.
///
/// Screening clients score locally and need the constant, but must never
/// be handed panel contents. Every [`DiseaseRegistry`] provides this view
/// for free, which is what in-process wiring uses.
pub trait CalibrationSource: Send + Sync {
    /// Calibration constant for a disease.
    ///
    /// # Errors
    /// Same contract as [`DiseaseRegistry::calibration_constant`].
    fn calibration_constant(&self, disease_id: &str) -> Result<f64, RegistryError>;
}

impl<R: DiseaseRegistry> CalibrationSource for R {
    fn calibration_constant(&self, disease_id: &str) -> Result<f64, RegistryError> {
        DiseaseRegistry::calibration_constant(self, disease_id)
    }
}
