//! Screening records and outcome envelopes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use super::marker::MarkerId;
use super::psi::MatchResult;
use super::scoring::{RiskLevel, RiskScore};

/// One completed screening: intersection, score and band for a subject
/// against a disease panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    pub id: String,
    pub subject_id: String,
    pub disease_id: String,
    pub match_count: usize,
    pub matched_markers: BTreeSet<MarkerId>,
    pub risk: RiskScore,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl Screening {
    /// Assemble a record from a recovered intersection and its score.
    #[must_use]
    pub fn new(subject_id: &str, disease_id: &str, matches: MatchResult, risk: RiskScore) -> Self {
        Self {
            id: uuid_v4(),
            subject_id: subject_id.to_string(),
            disease_id: disease_id.to_string(),
            match_count: matches.match_count,
            matched_markers: matches.matched_markers,
            risk_level: RiskLevel::from_percentage(risk.percentage),
            risk,
            created_at: Utc::now(),
        }
    }
}

/// When a cached intersection was originally computed and how old it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessInfo {
    pub computed_at: DateTime<Utc>,
    pub age_seconds: i64,
}

impl StalenessInfo {
    #[must_use]
    pub fn at(computed_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            computed_at,
            age_seconds: (now - computed_at).num_seconds().max(0),
        }
    }
}

/// How a screening result was obtained.
///
/// A degraded run served from cache is never passed off as fresh; the
/// staleness rides along so callers can decide whether the answer is
/// still acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScreeningOutcome {
    /// Computed from a live protocol exchange.
    Fresh(Screening),
    /// Rebuilt from a previously computed intersection after the live
    /// exchange failed.
    Cached {
        screening: Screening,
        staleness: StalenessInfo,
    },
}

impl ScreeningOutcome {
    #[must_use]
    pub fn screening(&self) -> &Screening {
        match self {
            ScreeningOutcome::Fresh(screening)
            | ScreeningOutcome::Cached { screening, .. } => screening,
        }
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, ScreeningOutcome::Fresh(_))
    }

    #[must_use]
    pub fn staleness(&self) -> Option<&StalenessInfo> {
        match self {
            ScreeningOutcome::Fresh(_) => None,
            ScreeningOutcome::Cached { staleness, .. } => Some(staleness),
        }
    }
}

/// Generate a v4 UUID string without external dependencies.
fn uuid_v4() -> String {
    let mut rng = rand_chacha::ChaCha20Rng::from_entropy();
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);

    // Version 4, RFC 4122 variant.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
