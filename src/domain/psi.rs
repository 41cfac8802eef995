//! The two-message commutative-blinding intersection protocol.
//!
//! One round trip per screening. The client hashes its markers into the
//! group and raises them to a one-time secret `a`; the responding side
//! raises its own panel and the client's elements to a one-time secret
//! `b`. Because exponentiation commutes, a marker held by both parties
//! ends up as the same group element on both paths, and the client can
//! read off the intersection by exact equality without either side ever
//! seeing the other's raw symbols.
//!
//! Neither secret leaves its owning side. `a` lives inside
//! [`ClientSession`] for a single run; `b` is a local of [`respond`] and
//! is gone when the response is built.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::arith::{hash_to_group, mod_pow, random_secret};
use super::marker::MarkerId;
use super::params::GroupParameters;

/// Error type for protocol-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("No markers supplied; nothing to intersect")]
    EmptyMarkerList,

    #[error("OS random source unavailable: {0}")]
    RandomSourceUnavailable(String),
}

fn serialize_decimal<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_str_radix(10))
}

fn deserialize_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    let text = String::deserialize(deserializer)?;
    BigUint::parse_bytes(text.as_bytes(), 10)
        .ok_or_else(|| serde::de::Error::custom(format!("not a decimal integer: {text:?}")))
}

/// A group element blinded under one secret.
///
/// On the wire this is a decimal string, since the values exceed every
/// native integer width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlindedElement(BigUint);

impl BlindedElement {
    pub(crate) fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Raise this element under a further secret.
    pub(crate) fn reblind(&self, secret: &BigUint, modulus: &BigUint) -> DoubleBlindedElement {
        DoubleBlindedElement(mod_pow(&self.0, secret, modulus))
    }
}

impl Serialize for BlindedElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_decimal(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for BlindedElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_decimal(deserializer).map(Self)
    }
}

/// A group element blinded under both parties' secrets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoubleBlindedElement(BigUint);

impl Serialize for DoubleBlindedElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_decimal(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for DoubleBlindedElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_decimal(deserializer).map(Self)
    }
}

/// First protocol message: the client's blinded markers.
///
/// Carries no subject identity; the responding side sees only opaque
/// group elements and the disease being screened for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsiRequest {
    pub blinded_patient_markers: Vec<BlindedElement>,
    pub disease_id: String,
}

/// Second protocol message: the responder's view of both sets.
///
/// `double_blinded_patient_markers` preserves the index order of the
/// request so the client can map matches back to its own symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsiResponse {
    pub blinded_disease_markers: Vec<BlindedElement>,
    pub double_blinded_patient_markers: Vec<DoubleBlindedElement>,
}

/// Intersection as recovered by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_count: usize,
    pub matched_markers: BTreeSet<MarkerId>,
}

fn blind_marker(marker: &MarkerId, secret: &BigUint, params: &GroupParameters) -> BlindedElement {
    let element = hash_to_group(marker.as_str(), params.q());
    BlindedElement::new(mod_pow(&element, secret, params.p()))
}

/// Client half of a single protocol run.
///
/// Holds the one-time secret `a` between the two messages. The session is
/// consumed by [`finalize`](Self::finalize), so a secret cannot outlive
/// its run or be replayed into another exchange.
pub struct ClientSession {
    secret: BigUint,
    markers: Vec<MarkerId>,
    params: Arc<GroupParameters>,
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("secret", &"<redacted>")
            .field("markers", &self.markers.len())
            .finish()
    }
}

impl ClientSession {
    /// Start a run: draw a fresh secret and blind the marker list.
    ///
    /// Returns the session together with the blinded elements, in the
    /// same order as `markers`.
    ///
    /// # Errors
    /// Rejects an empty marker list before any randomness is drawn, and
    /// surfaces a random source failure as is.
    pub fn initiate(
        markers: Vec<MarkerId>,
        params: Arc<GroupParameters>,
    ) -> Result<(Self, Vec<BlindedElement>), ProtocolError> {
        if markers.is_empty() {
            return Err(ProtocolError::EmptyMarkerList);
        }
        let secret = random_secret(params.q())?;
        let blinded = markers
            .iter()
            .map(|marker| blind_marker(marker, &secret, &params))
            .collect();
        Ok((
            Self {
                secret,
                markers,
                params,
            },
            blinded,
        ))
    }

    /// Close the run: recover the intersection from the response.
    ///
    /// Raises the responder's panel under the session secret and compares
    /// against the returned double-blinded elements by position. Matched
    /// symbols are the client's own; nothing about unmatched panel
    /// entries is learned. Empty response sequences simply produce zero
    /// matches.
    ///
    /// Assumes the response preserves request index order; entries beyond
    /// the original list length are ignored.
    #[must_use]
    pub fn finalize(self, response: &PsiResponse) -> MatchResult {
        let finalized: HashSet<DoubleBlindedElement> = response
            .blinded_disease_markers
            .iter()
            .map(|element| element.reblind(&self.secret, self.params.p()))
            .collect();

        let mut matched_markers = BTreeSet::new();
        for (marker, double_blinded) in self
            .markers
            .iter()
            .zip(&response.double_blinded_patient_markers)
        {
            if finalized.contains(double_blinded) {
                matched_markers.insert(marker.clone());
            }
        }

        MatchResult {
            match_count: matched_markers.len(),
            matched_markers,
        }
    }
}

/// Responder half of a protocol run.
///
/// Draws the one-time secret `b`, blinds the panel under it and raises
/// every incoming element under the same `b`, preserving request order.
/// `b` never leaves this call; once the response is assembled there is
/// nothing left to correlate one exchange with the next.
///
/// # Errors
/// Surfaces a random source failure as is.
pub fn respond(
    panel: &[MarkerId],
    blinded_patient_markers: &[BlindedElement],
    params: &GroupParameters,
) -> Result<PsiResponse, ProtocolError> {
    let secret = random_secret(params.q())?;

    let blinded_disease_markers = panel
        .iter()
        .map(|marker| blind_marker(marker, &secret, params))
        .collect();
    let double_blinded_patient_markers = blinded_patient_markers
        .iter()
        .map(|element| element.reblind(&secret, params.p()))
        .collect();

    Ok(PsiResponse {
        blinded_disease_markers,
        double_blinded_patient_markers,
    })
}
