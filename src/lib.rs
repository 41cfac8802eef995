//! # Genoscreen
//!
//! Privacy-preserving genetic screening over a commutative-blinding
//! private set intersection.
//!
//! A patient learns how many of their genetic markers overlap with a
//! registry's panel for a disease, without either side disclosing its
//! marker list. Both sides hash markers into a fixed prime-order setting
//! and blind them under one-time secret exponents; because modular
//! exponentiation commutes, shared markers collide after both blinds are
//! applied and the client reads the intersection off by exact equality.
//! The matched count is then scored against a per-disease calibration
//! constant.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Group parameters, the blinding protocol, risk scoring
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (in-memory registry, loopback
//!   transport, SQLite)
//! - `application`: Use cases orchestrating domain and ports

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use domain::{MarkerId, RiskLevel, RiskScore, Screening, ScreeningOutcome};

/// Result type for Genoscreen operations
pub type Result<T> = std::result::Result<T, GenoscreenError>;

/// Main error type for Genoscreen
#[derive(Debug, thiserror::Error)]
pub enum GenoscreenError {
    #[error("Protocol failure: {0}")]
    Protocol(#[from] domain::ProtocolError),

    #[error("Invalid marker: {0}")]
    Marker(#[from] domain::MarkerError),

    #[error("Registry operation failed: {0}")]
    Registry(#[from] ports::RegistryError),

    #[error("Screening exchange failed: {0}")]
    Transport(#[from] ports::TransportError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StoreError),

    #[error("Invalid input: {0}")]
    Validation(String),
}
