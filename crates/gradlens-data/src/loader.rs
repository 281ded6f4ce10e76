//! Typed record loading from raw sheet grids.
//!
//! Converts positional cell grids into [`EnrollmentRecord`] and
//! [`ActivityRecord`] sequences using the declarative sheet schemas. Rows
//! whose primary-key cell is blank or non-numeric are skipped; every numeric
//! cell goes through the shared sentinel-aware conversion.

use gradlens_core::cells::{CellValue, DateCell};
use gradlens_core::error::{AnalyticsError, Result};
use gradlens_core::models::{
    ActivityRecord, EnrollmentRecord, StudentIdentity, MONTHLY_WINDOW,
};
use gradlens_core::schema::{fields, Grid, SheetSchema};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Header pattern for the sixth-session date column, whose position drifts
/// between workbook revisions.
const SIXTH_SESSION_HEADER: &str = r"(?i)(sixth|6th).{0,24}(session|date)|6回目";

// ── Enrollments ───────────────────────────────────────────────────────────────

/// Load enrollment records from the session-tracking grid.
///
/// The sixth-session column is taken from the schema when configured and
/// discovered from the header row otherwise; when neither yields a column,
/// records carry no explicit completion date and the fallback inference rule
/// decides graduation.
pub fn load_enrollments(grid: &Grid, schema: &SheetSchema) -> Result<Vec<EnrollmentRecord>> {
    schema.validate(grid)?;

    let no_col = schema.column(fields::NO)?;
    let name_col = schema.column(fields::NAME)?;
    let manager_col = schema.column(fields::MANAGER)?;
    let first_col = schema.column(fields::FIRST_SESSION)?;

    let sixth_col = schema.column_opt(fields::SIXTH_SESSION).or_else(|| {
        let pattern = Regex::new(SIXTH_SESSION_HEADER).expect("valid header pattern");
        schema.find_header_column(grid, &pattern)
    });
    if sixth_col.is_none() {
        warn!(
            "Sheet \"{}\": sixth-session column not found; graduation will be \
             inferred from terminal-month activity only",
            schema.sheet
        );
    }

    let mut records = Vec::new();
    for row in grid.iter().skip(schema.first_data_row) {
        let Some(id) = primary_key(row, no_col) else {
            continue;
        };

        let raw_name = text_cell(row, name_col).unwrap_or_default();
        let manager = text_cell(row, manager_col).unwrap_or_default();
        let enrollment_date = row.get(first_col).and_then(DateCell::parse);
        let sixth_session_date = sixth_col
            .and_then(|col| row.get(col))
            .and_then(DateCell::parse);

        if let (Some(enrolled), Some(sixth)) = (enrollment_date, sixth_session_date) {
            if sixth < enrolled {
                warn!(
                    "Student {}: sixth session {} precedes enrollment {}",
                    id, sixth, enrolled
                );
            }
        }

        records.push(EnrollmentRecord {
            identity: StudentIdentity::new(id, raw_name),
            enrollment_date,
            sixth_session_date,
            manager,
        });
    }

    debug!(
        "Loaded {} enrollment records from sheet \"{}\"",
        records.len(),
        schema.sheet
    );
    Ok(records)
}

// ── Activities ────────────────────────────────────────────────────────────────

/// Load activity records from the monthly-posts grid.
///
/// The month window spans `MONTHLY_WINDOW` consecutive columns starting at
/// the configured `month0` column; the whole window is bounds-checked up
/// front.
pub fn load_activities(grid: &Grid, schema: &SheetSchema) -> Result<Vec<ActivityRecord>> {
    schema.validate(grid)?;

    let no_col = schema.column(fields::NO)?;
    let name_col = schema.column(fields::NAME)?;
    let month0 = schema.column(fields::MONTH0)?;

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let last_month_col = month0 + MONTHLY_WINDOW - 1;
    if last_month_col >= width {
        return Err(AnalyticsError::SchemaMismatch {
            sheet: schema.sheet.clone(),
            field: format!("month{}", MONTHLY_WINDOW - 1),
            column: last_month_col,
            width,
        });
    }

    let mut records = Vec::new();
    for row in grid.iter().skip(schema.first_data_row) {
        let Some(id) = primary_key(row, no_col) else {
            continue;
        };

        let raw_name = text_cell(row, name_col).unwrap_or_default();
        let monthly_posts: [Option<i64>; MONTHLY_WINDOW] =
            std::array::from_fn(|i| row.get(month0 + i).and_then(CellValue::to_count));

        records.push(ActivityRecord {
            identity: StudentIdentity::new(id, raw_name),
            monthly_posts,
        });
    }

    debug!(
        "Loaded {} activity records from sheet \"{}\"",
        records.len(),
        schema.sheet
    );
    Ok(records)
}

// ── Cell helpers ──────────────────────────────────────────────────────────────

/// Extract the primary key from a row, skipping blank or non-numeric cells.
fn primary_key(row: &[Value], col: usize) -> Option<u32> {
    let id = row.get(col).and_then(CellValue::to_count)?;
    u32::try_from(id).ok()
}

fn text_cell(row: &[Value], col: usize) -> Option<String> {
    row.get(col).and_then(CellValue::to_text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
