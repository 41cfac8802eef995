//! Domain layer: group arithmetic, the blinding protocol and risk scoring.
//!
//! Everything in here is synchronous, deterministic apart from secret
//! draws, and free of I/O. Ports and adapters wrap it for the outside
//! world.

pub mod arith;
mod marker;
mod params;
mod psi;
mod scoring;
mod screening;

pub use marker::{canonicalize_markers, marker_fingerprint, MarkerError, MarkerId};
pub use params::{GroupParameters, ParamsError};
pub use psi::{
    respond, BlindedElement, ClientSession, DoubleBlindedElement, MatchResult, ProtocolError,
    PsiRequest, PsiResponse,
};
pub use scoring::{risk_score, CalibrationBasis, RiskLevel, RiskScore, FALLBACK_CALIBRATION};
pub use screening::{Screening, ScreeningOutcome, StalenessInfo};
