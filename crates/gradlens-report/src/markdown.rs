//! Markdown rendering of analysis results.
//!
//! Renders cohort tables, group statistics, correlation summaries and the
//! data-completeness notes as a single report document. The analysis core
//! has no dependency on this layer; it only hands over result values.

use std::fmt::Write as _;
use std::path::Path;

use gradlens_core::error::Result;
use gradlens_core::formatting::{display_cell, format_mean, format_std};
use gradlens_core::models::{GraduationStatus, LifecycleRecord};
use gradlens_core::stats::{CorrelationReport, GroupSummary};
use gradlens_data::analysis::AnalysisResult;
use gradlens_data::cohort::MonthTotal;
use tracing::info;

// ── Section renderers ─────────────────────────────────────────────────────────

/// Render the per-cohort average table (the monthly trend view).
pub fn render_cohort_table(summaries: &[GroupSummary]) -> String {
    let mut out = String::new();
    out.push_str("| Cohort | Graduates | Average posts |\n");
    out.push_str("|--------|-----------|---------------|\n");
    if summaries.is_empty() {
        out.push_str("| - | 0 | - |\n");
        return out;
    }
    for s in summaries {
        let _ = writeln!(
            out,
            "| {} | {} | **{}** |",
            s.key,
            s.count,
            format_mean(s.mean)
        );
    }
    out
}

/// Render a full statistics table (count, mean, sum, std dev, min, max).
pub fn render_stats_table(summaries: &[GroupSummary]) -> String {
    let mut out = String::new();
    out.push_str("| Group | Count | Mean | Sum | Std dev | Min | Max |\n");
    out.push_str("|-------|-------|------|-----|---------|-----|-----|\n");
    for s in summaries {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            s.key,
            s.count,
            format_mean(s.mean),
            s.sum,
            format_std(s.std_dev),
            s.min,
            s.max
        );
    }
    out
}

/// Render the correlation summary table.
///
/// Reports with too few aligned groups render as `insufficient data`, never
/// as a number.
pub fn render_correlations(reports: &[CorrelationReport]) -> String {
    let mut out = String::new();
    out.push_str("| Comparison | Coefficient | Aligned groups |\n");
    out.push_str("|------------|-------------|----------------|\n");
    for report in reports {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            report.label, report.outcome, report.aligned_groups
        );
    }
    out
}

/// Render the relative-month view rows.
pub fn render_month_totals(totals: &[MonthTotal]) -> String {
    let mut out = String::new();
    out.push_str("| Month | Cohort size | Total posts | Per-student average |\n");
    out.push_str("|-------|-------------|-------------|---------------------|\n");
    for row in totals {
        let _ = writeln!(
            out,
            "| {} | {} | {} | **{}** |",
            row.month,
            row.cohort_size,
            row.total,
            format_mean(row.mean)
        );
    }
    out
}

/// Render the per-student lifecycle listing.
pub fn render_lifecycle_listing(records: &[LifecycleRecord]) -> String {
    let mut out = String::new();
    out.push_str("| No. | Name | Manager | Status | Graduation month | Lifecycle posts |\n");
    out.push_str("|-----|------|---------|--------|------------------|------------------|\n");
    for rec in records {
        let status = match rec.status {
            GraduationStatus::Graduated => "graduated",
            GraduationStatus::Active => "active",
        };
        let month = rec
            .graduation_month
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            rec.identity.id,
            rec.identity.raw_name,
            if rec.manager.is_empty() { "-" } else { rec.manager.as_str() },
            status,
            month,
            display_cell(rec.lifecycle_post_total)
        );
    }
    out
}

/// Render the data-completeness notes from the run metadata.
///
/// Every exclusion the pipeline applied is disclosed here so readers can
/// judge coverage.
pub fn render_data_notes(result: &AnalysisResult) -> String {
    let meta = &result.metadata;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "- Records loaded: {} enrollments, {} activity rows; {} students joined",
        meta.enrollments_loaded, meta.activities_loaded, meta.students_joined
    );
    let _ = writeln!(
        out,
        "- Unresolved: {} enrollment-only, {} activity-only students",
        meta.unresolved_enrollments, meta.unresolved_activities
    );
    let _ = writeln!(
        out,
        "- Graduates: {} counted, {} excluded for missing lifecycle data, {} without a graduation month",
        meta.graduates, meta.excluded_no_lifecycle_data, meta.graduates_without_month
    );
    let _ = writeln!(out, "- Active students: {}", meta.active_students);
    if meta.unmatched_roster_entries > 0 {
        let _ = writeln!(
            out,
            "- Unmatched roster entries: {}",
            meta.unmatched_roster_entries
        );
    }
    let _ = writeln!(out, "- Generated: {}", meta.generated_at);
    out
}

// ── Document assembly ─────────────────────────────────────────────────────────

/// Assemble the full Markdown report.
pub fn render_report(result: &AnalysisResult) -> String {
    let mut out = String::from("# Graduate lifecycle report\n\n");

    if !result.cohort_summaries.is_empty() {
        out.push_str("## Cohort averages\n\n");
        out.push_str(&render_cohort_table(&result.cohort_summaries));
        out.push('\n');
        out.push_str("### Cohort statistics\n\n");
        out.push_str(&render_stats_table(&result.cohort_summaries));
        out.push('\n');
    }

    if !result.month_totals.is_empty() {
        out.push_str("## Monthly activity (enrollment-window cohort)\n\n");
        out.push_str(&render_month_totals(&result.month_totals));
        out.push('\n');
    }

    if !result.manager_summaries.is_empty() {
        out.push_str("## Manager statistics\n\n");
        out.push_str(&render_stats_table(&result.manager_summaries));
        out.push('\n');
    }

    if !result.correlations.is_empty() {
        out.push_str("## Correlations\n\n");
        out.push_str(&render_correlations(&result.correlations));
        out.push('\n');
    }

    out.push_str("## Students\n\n");
    out.push_str(&render_lifecycle_listing(&result.lifecycle));
    out.push('\n');

    out.push_str("## Data notes\n\n");
    out.push_str(&render_data_notes(result));

    out
}

/// Write the report to `path`, creating parent directories if needed.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Write to a temp file then rename for atomicity.
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    info!("Report written to {}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
