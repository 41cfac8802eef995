//! Store port: trait for persisting completed screenings.

use crate::domain::Screening;

/// Trait for local screening persistence.
///
/// Only finished records pass through here. Protocol intermediates
/// (secrets, blinded elements) have no representation in this interface
/// and must never grow one.
pub trait ScreeningStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a completed screening.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    fn save(&self, screening: &Screening) -> Result<(), Self::Error>;

    /// Load the most recent screenings (up to `limit`), newest first.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    fn load_recent(&self, limit: usize) -> Result<Vec<Screening>, Self::Error>;

    /// Total count of stored screenings.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    fn count(&self) -> Result<usize, Self::Error>;
}
