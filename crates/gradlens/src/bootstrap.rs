use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive;
/// the `debug` flag forces debug-level output. Falls back to `"info"` if the
/// level string is not recognised.
pub fn setup_logging(log_level: &str, debug: bool) -> anyhow::Result<()> {
    let normalised = if debug {
        "debug"
    } else {
        match log_level.to_uppercase().as_str() {
            "DEBUG" | "CRITICAL" => "debug",
            "INFO" => "info",
            "WARNING" => "warn",
            "ERROR" => "error",
            _ => "info",
        }
    };

    let filter = EnvFilter::try_new(normalised).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer().with_target(false).with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Attempt to locate a workbook snapshot directory.
///
/// Checks the following paths in order and returns the first that exists:
/// 1. `./data/`
/// 2. `~/Downloads/gradlens-export/`
///
/// Returns `None` when neither path exists.
pub fn discover_data_path() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from("data")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Downloads").join("gradlens-export"));
    }
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
