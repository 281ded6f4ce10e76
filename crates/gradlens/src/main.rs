mod bootstrap;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gradlens_core::settings::{parse_month_list, MonthRange, RosterConfig, Settings};
use gradlens_core::schema::SchemaConfig;
use gradlens_data::analysis::{analyze_workbook, AnalysisOptions};
use gradlens_data::cohort::CohortPolicy;
use gradlens_report::markdown::{render_report, write_report};

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(&settings.log_level, settings.debug)?;

    tracing::info!("gradlens v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("View: {}", settings.view);

    let options = build_options(&settings)?;
    let result = analyze_workbook(&options)?;

    tracing::info!(
        "Analysed {} students ({} graduates, {} active) in {:.3}s",
        result.metadata.students_joined,
        result.metadata.graduates,
        result.metadata.active_students,
        result.metadata.load_time_seconds + result.metadata.transform_time_seconds,
    );

    let report = render_report(&result);
    match &settings.report_file {
        Some(path) => {
            write_report(path, &report)?;
            println!("Report written to {}", path.display());
        }
        None => print!("{report}"),
    }

    Ok(())
}

/// Translate CLI settings into pipeline options.
fn build_options(settings: &Settings) -> Result<AnalysisOptions> {
    let policy = CohortPolicy::from_view(&settings.view)
        .with_context(|| format!("unknown view: {}", settings.view))?;

    let rosters = match &settings.roster_file {
        Some(path) => RosterConfig::load_from(path)
            .with_context(|| format!("loading rosters from {}", path.display()))?,
        None => {
            if policy == CohortPolicy::NamedRoster {
                bail!("--view roster requires --roster-file");
            }
            RosterConfig::default()
        }
    };

    let schemas = match &settings.schema_file {
        Some(path) => SchemaConfig::load_from(path)
            .with_context(|| format!("loading schemas from {}", path.display()))?,
        None => SchemaConfig::default(),
    };

    let enrollment_window = match (&settings.enroll_from, &settings.enroll_to) {
        (Some(from), Some(to)) => Some(MonthRange::parse(&format!("{from}:{to}"))?),
        (None, None) => None,
        _ => bail!("--enroll-from and --enroll-to must be given together"),
    };

    let months = match &settings.months {
        Some(list) => parse_month_list(list)?,
        None => Vec::new(),
    };

    let compare = match (&settings.compare_a, &settings.compare_b) {
        (Some(a), Some(b)) => Some((MonthRange::parse(a)?, MonthRange::parse(b)?)),
        (None, None) => None,
        _ => bail!("--compare-a and --compare-b must be given together"),
    };

    // Prefer an explicit path, then local discovery, then the default export
    // location inside the data layer.
    let data_path = settings.data_path.clone().or_else(|| {
        bootstrap::discover_data_path().map(|p| p.to_string_lossy().to_string())
    });

    Ok(AnalysisOptions {
        data_path,
        policy,
        rosters,
        schemas,
        enrollment_window,
        months,
        compare,
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
