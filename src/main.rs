//! Genoscreen: privacy-preserving genetic screening demo.
//!
//! Wires the in-memory registry, the loopback transport and the SQLite
//! store together and runs one screening end to end. Both protocol roles
//! live in this process, but every message still crosses the JSON wire
//! encoding, so the transcript is exactly what a remote deployment would
//! carry.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use genoscreen::adapters::sanitize::SanitizingMakeWriter;
use genoscreen::adapters::{InMemoryRegistry, LoopbackTransport, SqliteScreeningStore};
use genoscreen::application::{PsiResponder, ScreeningService};
use genoscreen::domain::{canonicalize_markers, GroupParameters};

fn main() -> Result<()> {
    // Initialize logging.
    //
    // Default behavior:
    // - interactive TTY: log to stdout
    // - non-interactive: also stdout (so `docker logs` works); set
    //   GENOSCREEN_LOG_MODE=file to log to GENOSCREEN_LOG_FILE instead.
    let log_mode =
        std::env::var("GENOSCREEN_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => !std::io::stdout().is_terminal() && std::env::var("GENOSCREEN_LOG_FILE").is_ok(),
    };

    let (writer, _guard) = if use_file {
        let log_file = std::env::var("GENOSCREEN_LOG_FILE")
            .unwrap_or_else(|_| "genoscreen.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Genoscreen...");

    let params = GroupParameters::standard();

    // Registry side: panels a hospital would hold.
    let registry = Arc::new(InMemoryRegistry::new());
    registry.register_disease(
        "hereditary-breast-cancer",
        canonicalize_markers(&["BRCA1", "BRCA2", "TP53", "PALB2", "CHEK2"])
            .context("Invalid panel symbol")?,
        Some(75.0),
    )?;
    registry.register_disease(
        "lynch-syndrome",
        canonicalize_markers(&["MLH1", "MSH2", "MSH6", "PMS2"])
            .context("Invalid panel symbol")?,
        Some(60.0),
    )?;

    let responder = PsiResponder::new(Arc::clone(&registry), Arc::clone(&params));
    let transport = Arc::new(LoopbackTransport::new(responder));

    let db_path =
        std::env::var("GENOSCREEN_DB_PATH").unwrap_or_else(|_| "genoscreen.db".to_string());
    let store = Arc::new(SqliteScreeningStore::new(&db_path).context("Failed to open store")?);

    let service = ScreeningService::new(transport, registry, store, params);

    let outcome = service.run_screening(
        "demo-subject",
        "hereditary-breast-cancer",
        &["BRCA1", "TP53", "APOE"],
    )?;
    let screening = outcome.screening();

    println!("Screening {}", screening.id);
    println!("  disease:  {}", screening.disease_id);
    println!("  matched:  {} marker(s)", screening.match_count);
    println!(
        "  risk:     {:.1}% ({})",
        screening.risk.percentage, screening.risk_level
    );
    println!("  guidance: {}", screening.risk_level.description());
    if let Some(staleness) = outcome.staleness() {
        println!(
            "  NOTE: served from cache, computed {}s ago",
            staleness.age_seconds
        );
    }

    let total = service.screening_count()?;
    tracing::info!("{} screening(s) on record at {}", total, db_path);

    tracing::info!("Genoscreen shutdown complete.");
    Ok(())
}
