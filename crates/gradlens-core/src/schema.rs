use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cells::CellValue;
use crate::error::{AnalyticsError, Result};

/// A raw sheet as handed over by the workbook adapter: rows of untyped cells,
/// addressed by zero-based row/column. Rows may be ragged.
pub type Grid = Vec<Vec<serde_json::Value>>;

/// Field names used by the built-in sheet descriptors.
pub mod fields {
    /// Primary-key column ("no.").
    pub const NO: &str = "no";
    pub const NAME: &str = "name";
    pub const MANAGER: &str = "manager";
    /// First regular-session date.
    pub const FIRST_SESSION: &str = "first_session";
    /// Explicit sixth-session completion date.
    pub const SIXTH_SESSION: &str = "sixth_session";
    /// First column of the month-0..=6 activity window.
    pub const MONTH0: &str = "month0";
}

// ── SheetSchema ───────────────────────────────────────────────────────────────

/// Declarative description of one sheet's layout: where the header and data
/// rows start and which column each field lives in.
///
/// Schema drift across source-file revisions is a configuration change, not a
/// code change; descriptors are serde-loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSchema {
    /// Sheet name as exported (file stem of the snapshot file).
    pub sheet: String,
    /// Zero-based row index of the header row.
    pub header_row: usize,
    /// Zero-based row index of the first data row.
    pub first_data_row: usize,
    /// Field name → zero-based column index.
    pub columns: BTreeMap<String, usize>,
}

impl SheetSchema {
    /// Descriptor for the session-tracking sheet as laid out in the source
    /// workbook.
    pub fn session_tracking() -> Self {
        let columns = BTreeMap::from([
            (fields::NO.to_string(), 0),
            (fields::NAME.to_string(), 7),
            (fields::MANAGER.to_string(), 19),
            (fields::FIRST_SESSION.to_string(), 22),
        ]);
        Self {
            sheet: "session_tracking".to_string(),
            header_row: 9,
            first_data_row: 10,
            columns,
        }
    }

    /// Descriptor for the monthly-posts sheet as laid out in the source
    /// workbook.
    pub fn monthly_posts() -> Self {
        let columns = BTreeMap::from([
            (fields::NO.to_string(), 0),
            (fields::NAME.to_string(), 4),
            (fields::MONTH0.to_string(), 15),
        ]);
        Self {
            sheet: "monthly_posts".to_string(),
            header_row: 10,
            first_data_row: 11,
            columns,
        }
    }

    /// The configured column index for `field`.
    pub fn column(&self, field: &str) -> Result<usize> {
        self.columns
            .get(field)
            .copied()
            .ok_or_else(|| AnalyticsError::UnknownField {
                sheet: self.sheet.clone(),
                field: field.to_string(),
            })
    }

    /// The configured column index for `field`, when present.
    pub fn column_opt(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    /// Check every configured column index against the grid's width.
    ///
    /// Fails with [`AnalyticsError::SchemaMismatch`] before any record is
    /// built, since a misconfigured column would silently misalign every
    /// downstream field.
    pub fn validate(&self, grid: &[Vec<serde_json::Value>]) -> Result<()> {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for (field, &column) in &self.columns {
            if column >= width {
                return Err(AnalyticsError::SchemaMismatch {
                    sheet: self.sheet.clone(),
                    field: field.clone(),
                    column,
                    width,
                });
            }
        }
        Ok(())
    }

    /// Scan the header row for the first cell whose text matches `pattern`.
    ///
    /// Used for columns whose position drifts between workbook revisions
    /// (the sixth-session date column in the source data).
    pub fn find_header_column(&self, grid: &[Vec<serde_json::Value>], pattern: &Regex) -> Option<usize> {
        let header = grid.get(self.header_row)?;
        header
            .iter()
            .position(|cell| CellValue::to_text(cell).is_some_and(|text| pattern.is_match(&text)))
    }
}

// ── SchemaConfig ──────────────────────────────────────────────────────────────

/// The pair of sheet descriptors consumed by the loader, overridable from a
/// JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub session_tracking: SheetSchema,
    pub monthly_posts: SheetSchema,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            session_tracking: SheetSchema::session_tracking(),
            monthly_posts: SheetSchema::monthly_posts(),
        }
    }
}

impl SchemaConfig {
    /// Load a schema override from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalyticsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the config to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
