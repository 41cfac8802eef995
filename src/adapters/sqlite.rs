//! SQLite adapter: implementation of the screening store.
//!
//! Persists completed screening records locally. Only finished results
//! land here; blinding secrets and wire elements never touch storage.
//!
//! # Mutex Behavior
//!
//! The database connection is protected by `Mutex`. A poisoned mutex
//! (from panic in another thread) will cause panic. This fail-fast
//! behavior is intentional for data integrity in healthcare
//! applications.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::domain::{CalibrationBasis, MarkerId, RiskLevel, RiskScore, Screening};
use crate::ports::ScreeningStore;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// SQLite screening store adapter.
pub struct SqliteScreeningStore {
    conn: Mutex<Connection>,
}

impl SqliteScreeningStore {
    /// Open (or create) a store at the given database path.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    /// Returns error if the database cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS screenings (
                id TEXT PRIMARY KEY,
                subject_id TEXT NOT NULL,
                disease_id TEXT NOT NULL,
                match_count INTEGER NOT NULL,
                matched_markers TEXT NOT NULL,
                risk_percentage REAL NOT NULL,
                calibration_constant REAL,
                risk_level TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_screenings_created
                ON screenings(created_at DESC);
            ",
        )?;

        Ok(())
    }

    fn risk_level_to_string(level: RiskLevel) -> &'static str {
        match level {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }

    fn string_to_risk_level(s: &str) -> RiskLevel {
        match s.to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "high" => RiskLevel::High,
            _ => RiskLevel::Moderate,
        }
    }
}

impl ScreeningStore for SqliteScreeningStore {
    type Error = StoreError;

    fn save(&self, screening: &Screening) -> Result<(), Self::Error> {
        let markers_json = serde_json::to_string(&screening.matched_markers)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let calibration = match screening.risk.basis {
            CalibrationBasis::Calibrated { constant } => Some(constant),
            CalibrationBasis::Fallback => None,
        };

        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            r"
            INSERT INTO screenings (
                id, subject_id, disease_id, match_count, matched_markers,
                risk_percentage, calibration_constant, risk_level, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                screening.id,
                screening.subject_id,
                screening.disease_id,
                screening.match_count as i64,
                markers_json,
                screening.risk.percentage,
                calibration,
                Self::risk_level_to_string(screening.risk_level),
                screening.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!("Saved screening {} to storage", screening.id);
        Ok(())
    }

    fn load_recent(&self, limit: usize) -> Result<Vec<Screening>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt = conn.prepare(
            r"
            SELECT id, subject_id, disease_id, match_count, matched_markers,
                   risk_percentage, calibration_constant, risk_level, created_at
            FROM screenings
            ORDER BY created_at DESC
            LIMIT ?1
            ",
        )?;

        let screenings = stmt
            .query_map(params![limit as i64], |row| {
                let id: String = row.get(0)?;
                let subject_id: String = row.get(1)?;
                let disease_id: String = row.get(2)?;
                let match_count: i64 = row.get(3)?;
                let markers_json: String = row.get(4)?;
                let risk_percentage: f64 = row.get(5)?;
                let calibration: Option<f64> = row.get(6)?;
                let risk_level_str: String = row.get(7)?;
                let created_at_str: String = row.get(8)?;

                let matched_markers: BTreeSet<MarkerId> = serde_json::from_str(&markers_json)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;

                let basis = match calibration {
                    Some(constant) => CalibrationBasis::Calibrated { constant },
                    None => CalibrationBasis::Fallback,
                };

                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now());

                Ok(Screening {
                    id,
                    subject_id,
                    disease_id,
                    match_count: match_count as usize,
                    matched_markers,
                    risk: RiskScore {
                        percentage: risk_percentage,
                        basis,
                    },
                    risk_level: Self::string_to_risk_level(&risk_level_str),
                    created_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(screenings)
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM screenings", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
