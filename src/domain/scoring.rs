//! Risk scoring over a recovered intersection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scale applied when no calibration constant can be retrieved.
pub const FALLBACK_CALIBRATION: f64 = 100.0;

/// Which scale produced a score.
///
/// Fallback scores are real percentages but on an uncalibrated scale;
/// downstream consumers must be able to tell them apart from calibrated
/// ones, so the basis travels with the number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CalibrationBasis {
    Calibrated { constant: f64 },
    Fallback,
}

/// A risk percentage in `[0, 100]` and the scale it was computed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub percentage: f64,
    pub basis: CalibrationBasis,
}

/// Score an intersection against a disease panel.
///
/// Computes `match_count / total_markers` scaled by the calibration
/// constant, clamped into `[0, 100]`. A panel of zero markers scores
/// zero. Passing `None` applies [`FALLBACK_CALIBRATION`] and tags the
/// result accordingly; it never silently substitutes for a protocol
/// failure, which callers surface as errors instead.
#[must_use]
pub fn risk_score(match_count: usize, total_markers: usize, calibration: Option<f64>) -> RiskScore {
    let (constant, basis) = match calibration {
        Some(k) => (k, CalibrationBasis::Calibrated { constant: k }),
        None => (FALLBACK_CALIBRATION, CalibrationBasis::Fallback),
    };

    let percentage = if total_markers == 0 {
        0.0
    } else {
        let ratio = match_count as f64 / total_markers as f64;
        (ratio * constant).clamp(0.0, 100.0)
    };

    RiskScore { percentage, basis }
}

/// Coarse risk band derived from a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Band for a percentage: below 30 is low, below 70 moderate,
    /// everything else high.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < 30.0 {
            RiskLevel::Low
        } else if percentage < 70.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    /// Human-readable guidance for the band.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low risk - no significant marker overlap",
            RiskLevel::Moderate => "Moderate risk - follow-up testing recommended",
            RiskLevel::High => "High risk - genetic counseling advised",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Moderate => write!(f, "MODERATE"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_calibrated_scale() {
        let score = risk_score(2, 4, Some(60.0));
        assert!((score.percentage - 30.0).abs() < EPSILON);
        assert_eq!(score.basis, CalibrationBasis::Calibrated { constant: 60.0 });
        assert_eq!(RiskLevel::from_percentage(score.percentage), RiskLevel::Moderate);
    }

    #[test]
    fn test_zero_matches_score_zero() {
        let score = risk_score(0, 5, Some(85.0));
        assert!(score.percentage.abs() < EPSILON);
        assert_eq!(RiskLevel::from_percentage(score.percentage), RiskLevel::Low);
    }

    #[test]
    fn test_empty_panel_scores_zero() {
        let score = risk_score(0, 0, Some(75.0));
        assert!(score.percentage.abs() < EPSILON);
    }

    #[test]
    fn test_full_overlap_at_full_scale() {
        let score = risk_score(4, 4, Some(100.0));
        assert!((score.percentage - 100.0).abs() < EPSILON);
        assert_eq!(RiskLevel::from_percentage(score.percentage), RiskLevel::High);
    }

    #[test]
    fn test_fallback_basis_is_tagged() {
        let score = risk_score(3, 4, None);
        assert!((score.percentage - 75.0).abs() < EPSILON);
        assert_eq!(score.basis, CalibrationBasis::Fallback);
    }

    #[test]
    fn test_score_is_clamped() {
        // More matches than panel markers cannot happen in a well-formed
        // run, but the bound holds regardless of the inputs.
        let score = risk_score(5, 4, Some(100.0));
        assert!((score.percentage - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_percentage(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_percentage(29.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_percentage(30.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_percentage(69.9), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_percentage(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_percentage(100.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_display() {
        assert_eq!(RiskLevel::Low.to_string(), "LOW");
        assert_eq!(RiskLevel::Moderate.to_string(), "MODERATE");
        assert_eq!(RiskLevel::High.to_string(), "HIGH");
    }
}
