//! Screening service: orchestrates the client side of a screening.
//!
//! This service coordinates:
//! - Marker canonicalization
//! - The blinding exchange over a transport
//! - Intersection recovery and risk scoring
//! - Storage persistence and the degraded-mode result cache

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::domain::{
    canonicalize_markers, marker_fingerprint, risk_score, ClientSession, GroupParameters,
    MatchResult, PsiRequest, RiskScore, Screening, ScreeningOutcome, StalenessInfo,
};
use crate::ports::{CalibrationSource, PsiTransport, ScreeningStore, TransportError};
use crate::GenoscreenError;

/// One previously computed intersection, kept for transport outages.
///
/// Only the recovered result is cached; secrets and transcript elements
/// are gone by the time an entry is written.
struct CachedMatch {
    result: MatchResult,
    total_markers: usize,
    fingerprint: String,
    computed_at: DateTime<Utc>,
}

/// Service for running screenings against a remote (or loopback)
/// responder.
///
/// # Secret Hygiene
///
/// The blinding secret for a run lives inside the domain session between
/// the two protocol messages and nowhere else. The service never stores
/// it, logs it, or carries it across runs; a second screening for the
/// same subject draws a fresh one.
pub struct ScreeningService<T, C, S>
where
    T: PsiTransport,
    C: CalibrationSource,
    S: ScreeningStore,
{
    transport: Arc<T>,
    calibration: Arc<C>,
    store: Arc<S>,
    params: Arc<GroupParameters>,
    cache: Mutex<HashMap<(String, String), CachedMatch>>,
}

impl<T, C, S> ScreeningService<T, C, S>
where
    T: PsiTransport,
    C: CalibrationSource,
    S: ScreeningStore,
    S::Error: Into<crate::adapters::StoreError>,
{
    /// Create a new screening service.
    pub fn new(
        transport: Arc<T>,
        calibration: Arc<C>,
        store: Arc<S>,
        params: Arc<GroupParameters>,
    ) -> Self {
        Self {
            transport,
            calibration,
            store,
            params,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Run one screening for a subject against a disease.
    ///
    /// Performs the full pipeline:
    /// 1. Canonicalize the raw marker symbols
    /// 2. Blind them and drive the two-message exchange
    /// 3. Recover the intersection and score it
    /// 4. Persist the record and refresh the degraded-mode cache
    ///
    /// A failed exchange is answered from the cache when a result for
    /// the same subject, disease and marker list exists; the outcome is
    /// then tagged [`ScreeningOutcome::Cached`] with its staleness. With
    /// nothing cached the failure propagates; a protocol failure is
    /// never converted into a zero-risk answer.
    ///
    /// # Errors
    /// Returns error on invalid input, an unknown disease, or a failed
    /// exchange with no usable cache entry.
    pub fn run_screening<M: AsRef<str>>(
        &self,
        subject_id: &str,
        disease_id: &str,
        raw_markers: &[M],
    ) -> Result<ScreeningOutcome, GenoscreenError> {
        if subject_id.trim().is_empty() {
            return Err(GenoscreenError::Validation(
                "Subject id must not be empty".to_string(),
            ));
        }

        let markers = canonicalize_markers(raw_markers)?;
        let marker_count = markers.len();
        let fingerprint = marker_fingerprint(&markers);

        let (session, blinded) =
            ClientSession::initiate(markers, Arc::clone(&self.params))?;
        let request = PsiRequest {
            blinded_patient_markers: blinded,
            disease_id: disease_id.to_string(),
        };

        let response = match self.transport.exchange(&request) {
            Ok(response) => response,
            Err(TransportError::Rejected(cause)) => {
                return Err(GenoscreenError::Registry(cause));
            }
            Err(cause) => {
                tracing::warn!("Screening exchange failed: {}, checking cache", cause);
                return self.cached_outcome(subject_id, disease_id, &fingerprint, cause);
            }
        };

        if response.double_blinded_patient_markers.len() != marker_count {
            let cause = TransportError::InvalidResponse(format!(
                "expected {} double-blinded elements, got {}",
                marker_count,
                response.double_blinded_patient_markers.len()
            ));
            tracing::warn!("Screening exchange failed: {}, checking cache", cause);
            return self.cached_outcome(subject_id, disease_id, &fingerprint, cause);
        }

        let total_markers = response.blinded_disease_markers.len();
        let matches = session.finalize(&response);
        let risk = self.score(disease_id, matches.match_count, total_markers);

        let screening = Screening::new(subject_id, disease_id, matches.clone(), risk);
        if let Err(e) = self.store.save(&screening) {
            tracing::warn!("Failed to save screening: {:?}", e);
        }
        self.remember(subject_id, disease_id, &fingerprint, matches, total_markers);

        tracing::info!(
            "Screening complete for disease {}: {}/{} markers matched, risk {:.1}% ({})",
            disease_id,
            screening.match_count,
            total_markers,
            screening.risk.percentage,
            screening.risk_level
        );
        Ok(ScreeningOutcome::Fresh(screening))
    }

    /// Get recent screenings from storage.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    pub fn recent_screenings(&self, limit: usize) -> Result<Vec<Screening>, GenoscreenError> {
        self.store
            .load_recent(limit)
            .map_err(|e| GenoscreenError::Storage(e.into()))
    }

    /// Get the total screening count.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    pub fn screening_count(&self) -> Result<usize, GenoscreenError> {
        self.store
            .count()
            .map_err(|e| GenoscreenError::Storage(e.into()))
    }

    /// Score an intersection, degrading to the fallback scale when the
    /// calibration constant cannot be retrieved.
    fn score(&self, disease_id: &str, match_count: usize, total_markers: usize) -> RiskScore {
        match self.calibration.calibration_constant(disease_id) {
            Ok(constant) => risk_score(match_count, total_markers, Some(constant)),
            Err(cause) => {
                tracing::warn!(
                    "Calibration constant unavailable for disease {}: {}, using fallback scale",
                    disease_id,
                    cause
                );
                risk_score(match_count, total_markers, None)
            }
        }
    }

    fn remember(
        &self,
        subject_id: &str,
        disease_id: &str,
        fingerprint: &str,
        result: MatchResult,
        total_markers: usize,
    ) {
        let mut cache = self.cache.lock().expect("Lock failed");
        cache.insert(
            (subject_id.to_string(), disease_id.to_string()),
            CachedMatch {
                result,
                total_markers,
                fingerprint: fingerprint.to_string(),
                computed_at: Utc::now(),
            },
        );
    }

    /// Serve a screening from the cache after a failed exchange.
    ///
    /// The entry must cover the same subject, disease and exact marker
    /// list (by fingerprint); anything else re-raises the transport
    /// failure. The risk score is recomputed so a constant published
    /// since the original run still takes effect.
    fn cached_outcome(
        &self,
        subject_id: &str,
        disease_id: &str,
        fingerprint: &str,
        cause: TransportError,
    ) -> Result<ScreeningOutcome, GenoscreenError> {
        let cache = self.cache.lock().expect("Lock failed");
        let key = (subject_id.to_string(), disease_id.to_string());

        match cache.get(&key) {
            Some(cached) if cached.fingerprint == fingerprint => {
                let staleness = StalenessInfo::at(cached.computed_at, Utc::now());
                let risk = self.score(disease_id, cached.result.match_count, cached.total_markers);
                let screening =
                    Screening::new(subject_id, disease_id, cached.result.clone(), risk);

                tracing::warn!(
                    "Serving cached screening for disease {} ({}s old) after transport failure",
                    disease_id,
                    staleness.age_seconds
                );
                Ok(ScreeningOutcome::Cached {
                    screening,
                    staleness,
                })
            }
            _ => Err(cause.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::adapters::{InMemoryRegistry, LoopbackTransport, SqliteScreeningStore, StoreError};
    use crate::application::PsiResponder;
    use crate::domain::{CalibrationBasis, MarkerId, ProtocolError, PsiResponse, RiskLevel};
    use crate::ports::RegistryError;

    const DISEASE: &str = "hereditary-breast-cancer";
    const EPSILON: f64 = 1e-9;

    struct FailingTransport;

    impl PsiTransport for FailingTransport {
        fn exchange(&self, _request: &PsiRequest) -> Result<PsiResponse, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }
    }

    struct SwitchableTransport<T> {
        inner: T,
        healthy: AtomicBool,
    }

    impl<T> SwitchableTransport<T> {
        fn new(inner: T) -> Self {
            Self {
                inner,
                healthy: AtomicBool::new(true),
            }
        }

        fn break_link(&self) {
            self.healthy.store(false, Ordering::SeqCst);
        }
    }

    impl<T: PsiTransport> PsiTransport for SwitchableTransport<T> {
        fn exchange(&self, request: &PsiRequest) -> Result<PsiResponse, TransportError> {
            if self.healthy.load(Ordering::SeqCst) {
                self.inner.exchange(request)
            } else {
                Err(TransportError::Timeout(Duration::from_secs(5)))
            }
        }
    }

    struct FailingStore;

    impl ScreeningStore for FailingStore {
        type Error = StoreError;

        fn save(&self, _screening: &Screening) -> Result<(), StoreError> {
            Err(StoreError::Serialization("disk full".to_string()))
        }

        fn load_recent(&self, _limit: usize) -> Result<Vec<Screening>, StoreError> {
            Ok(Vec::new())
        }

        fn count(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    fn panel_registry(calibration: Option<f64>) -> Arc<InMemoryRegistry> {
        let registry = InMemoryRegistry::new();
        registry
            .register_disease(
                DISEASE,
                canonicalize_markers(&["BRCA1", "TP53", "ERBB2"]).expect("valid symbols"),
                calibration,
            )
            .expect("Should register");
        Arc::new(registry)
    }

    fn loopback(registry: &Arc<InMemoryRegistry>) -> LoopbackTransport<InMemoryRegistry> {
        LoopbackTransport::new(PsiResponder::new(
            Arc::clone(registry),
            GroupParameters::standard(),
        ))
    }

    fn live_service(
        registry: Arc<InMemoryRegistry>,
    ) -> ScreeningService<LoopbackTransport<InMemoryRegistry>, InMemoryRegistry, SqliteScreeningStore>
    {
        let transport = Arc::new(loopback(&registry));
        let store = Arc::new(SqliteScreeningStore::in_memory().expect("Should create db"));
        ScreeningService::new(transport, registry, store, GroupParameters::standard())
    }

    fn marker(symbol: &str) -> MarkerId {
        MarkerId::new(symbol).expect("valid symbol")
    }

    #[test]
    fn test_end_to_end_screening() {
        let service = live_service(panel_registry(Some(75.0)));

        let outcome = service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should screen");

        assert!(outcome.is_fresh());
        let screening = outcome.screening();
        assert_eq!(screening.match_count, 2);
        assert!(screening.matched_markers.contains(&marker("BRCA1")));
        assert!(screening.matched_markers.contains(&marker("TP53")));
        assert!(!screening.matched_markers.contains(&marker("BRCA2")));
        assert!((screening.risk.percentage - 50.0).abs() < EPSILON);
        assert_eq!(screening.risk_level, RiskLevel::Moderate);

        assert_eq!(service.screening_count().expect("Should count"), 1);
        let recent = service.recent_screenings(10).expect("Should load");
        assert_eq!(recent[0].subject_id, "subject-001");
    }

    #[test]
    fn test_results_stable_while_transcripts_vary() {
        let service = live_service(panel_registry(Some(75.0)));

        let first = service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should screen");
        let second = service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should screen");

        assert_eq!(
            first.screening().matched_markers,
            second.screening().matched_markers
        );
        assert_eq!(first.screening().match_count, second.screening().match_count);
        assert!(
            (first.screening().risk.percentage - second.screening().risk.percentage).abs()
                < EPSILON
        );
    }

    #[test]
    fn test_unknown_disease_propagates() {
        let service = live_service(panel_registry(Some(75.0)));

        let result = service.run_screening("subject-001", "no-such-disease", &["BRCA1"]);
        assert!(matches!(
            result,
            Err(GenoscreenError::Registry(RegistryError::DiseaseNotFound(_)))
        ));
    }

    #[test]
    fn test_missing_calibration_uses_fallback_scale() {
        let service = live_service(panel_registry(None));

        let outcome = service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should screen");

        let screening = outcome.screening();
        assert_eq!(screening.risk.basis, CalibrationBasis::Fallback);
        assert!((screening.risk.percentage - 200.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_transport_failure_without_cache_is_an_error() {
        let registry = panel_registry(Some(75.0));
        let store = Arc::new(SqliteScreeningStore::in_memory().expect("Should create db"));
        let service = ScreeningService::new(
            Arc::new(FailingTransport),
            registry,
            store,
            GroupParameters::standard(),
        );

        let result = service.run_screening("subject-001", DISEASE, &["BRCA1"]);
        assert!(matches!(
            result,
            Err(GenoscreenError::Transport(TransportError::Network(_)))
        ));
    }

    #[test]
    fn test_transport_failure_serves_cached_result() {
        let registry = panel_registry(Some(75.0));
        let transport = Arc::new(SwitchableTransport::new(loopback(&registry)));
        let store = Arc::new(SqliteScreeningStore::in_memory().expect("Should create db"));
        let service = ScreeningService::new(
            Arc::clone(&transport),
            registry,
            store,
            GroupParameters::standard(),
        );

        let fresh = service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should screen");
        assert!(fresh.is_fresh());

        transport.break_link();
        let degraded = service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should fall back to cache");

        assert!(!degraded.is_fresh());
        assert_eq!(degraded.screening().match_count, 2);
        assert_eq!(
            degraded.screening().matched_markers,
            fresh.screening().matched_markers
        );
        let staleness = degraded.staleness().expect("cached outcome carries staleness");
        assert!(staleness.age_seconds >= 0);

        // Only the fresh run was persisted.
        assert_eq!(service.screening_count().expect("Should count"), 1);
    }

    #[test]
    fn test_cache_requires_matching_marker_list() {
        let registry = panel_registry(Some(75.0));
        let transport = Arc::new(SwitchableTransport::new(loopback(&registry)));
        let store = Arc::new(SqliteScreeningStore::in_memory().expect("Should create db"));
        let service = ScreeningService::new(
            Arc::clone(&transport),
            registry,
            store,
            GroupParameters::standard(),
        );

        service
            .run_screening("subject-001", DISEASE, &["BRCA1", "BRCA2", "TP53"])
            .expect("Should screen");

        transport.break_link();
        let result = service.run_screening("subject-001", DISEASE, &["BRCA1", "TP53"]);
        assert!(matches!(
            result,
            Err(GenoscreenError::Transport(TransportError::Timeout(_)))
        ));
    }

    #[test]
    fn test_store_failure_does_not_fail_screening() {
        let registry = panel_registry(Some(75.0));
        let transport = Arc::new(loopback(&registry));
        let service = ScreeningService::new(
            transport,
            registry,
            Arc::new(FailingStore),
            GroupParameters::standard(),
        );

        let outcome = service
            .run_screening("subject-001", DISEASE, &["BRCA1"])
            .expect("Should screen despite store failure");
        assert!(outcome.is_fresh());
    }

    #[test]
    fn test_empty_marker_list_is_rejected() {
        let service = live_service(panel_registry(Some(75.0)));
        let no_markers: [&str; 0] = [];

        let result = service.run_screening("subject-001", DISEASE, &no_markers);
        assert!(matches!(
            result,
            Err(GenoscreenError::Protocol(ProtocolError::EmptyMarkerList))
        ));
    }

    #[test]
    fn test_invalid_marker_symbol_is_rejected() {
        let service = live_service(panel_registry(Some(75.0)));

        let result = service.run_screening("subject-001", DISEASE, &["BRCA1", "not a gene!"]);
        assert!(matches!(result, Err(GenoscreenError::Marker(_))));
    }

    #[test]
    fn test_blank_subject_is_rejected() {
        let service = live_service(panel_registry(Some(75.0)));

        let result = service.run_screening("   ", DISEASE, &["BRCA1"]);
        assert!(matches!(result, Err(GenoscreenError::Validation(_))));
    }
}
