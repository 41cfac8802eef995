//! Ports layer: trait definitions for external operations.
//!
//! Following hexagonal architecture, these traits define the boundaries
//! between the application and external systems (registry, network
//! transport, storage).

mod registry;
mod store;
mod transport;

pub use registry::{CalibrationSource, DiseaseRegistry, RegistryError};
pub use store::ScreeningStore;
pub use transport::{PsiTransport, TransportError};
