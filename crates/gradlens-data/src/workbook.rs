//! Workbook snapshot discovery and loading.
//!
//! A snapshot is a directory of `<sheet>.json` files, one per workbook sheet,
//! each holding a JSON array of row arrays of untyped cells. This is the
//! external-collaborator boundary: the rest of the pipeline only ever sees
//! 2-D grids and is independent of the original storage format.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gradlens_core::error::Result;
use gradlens_core::schema::Grid;
use tracing::{debug, warn};

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all `.json` sheet files recursively under `data_path`, sorted by path.
pub fn find_sheet_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "json")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Resolve the snapshot directory: use `data_path` when given, otherwise the
/// default export location under the user's home directory.
pub fn resolve_data_path(data_path: Option<&str>) -> PathBuf {
    if let Some(p) = data_path {
        return PathBuf::from(p);
    }

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join("Downloads").join("gradlens-export")
}

// ── Workbook ──────────────────────────────────────────────────────────────────

/// An in-memory workbook snapshot: sheet name → raw cell grid.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, Grid>,
}

impl Workbook {
    /// Load every sheet file under `data_path`.
    ///
    /// The file stem becomes the sheet name. Unreadable or malformed files
    /// are skipped with a warning so one broken export does not take down the
    /// whole snapshot.
    pub fn load(data_path: &Path) -> Result<Self> {
        let files = find_sheet_files(data_path);
        if files.is_empty() {
            warn!("No sheet files found in {}", data_path.display());
        }

        let mut sheets = BTreeMap::new();
        for file_path in &files {
            let Some(name) = file_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = match std::fs::read_to_string(file_path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Failed to read sheet {}: {}", file_path.display(), e);
                    continue;
                }
            };

            let grid = match parse_sheet(&content) {
                Some(grid) => grid,
                None => {
                    warn!(
                        "Sheet {} is not a JSON array of rows; skipping",
                        file_path.display()
                    );
                    continue;
                }
            };

            debug!(
                "Loaded sheet \"{}\" ({} rows) from {}",
                name,
                grid.len(),
                file_path.display()
            );
            sheets.insert(name.to_string(), grid);
        }

        Ok(Self { sheets })
    }

    /// Look up a sheet by name.
    pub fn sheet(&self, name: &str) -> Result<&Grid> {
        self.sheets
            .get(name)
            .ok_or_else(|| gradlens_core::error::AnalyticsError::SheetNotFound(name.to_string()))
    }

    /// Names of all loaded sheets, sorted.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Parse one sheet file's content into a grid.
///
/// The top level must be an array; non-array rows are dropped with a warning.
fn parse_sheet(content: &str) -> Option<Grid> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    let rows = value.as_array()?;

    let mut grid: Grid = Vec::with_capacity(rows.len());
    for row in rows {
        match row.as_array() {
            Some(cells) => grid.push(cells.clone()),
            None => {
                warn!("Dropping non-array row in sheet data");
            }
        }
    }
    Some(grid)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_sheet(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    // ── find_sheet_files ─────────────────────────────────────────────────────

    #[test]
    fn test_find_sheet_files_sorted() {
        let dir = TempDir::new().unwrap();
        write_sheet(dir.path(), "monthly_posts.json", "[]");
        write_sheet(dir.path(), "session_tracking.json", "[]");
        write_sheet(dir.path(), "notes.txt", "ignored");

        let files = find_sheet_files(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["monthly_posts.json", "session_tracking.json"]);
    }

    #[test]
    fn test_find_sheet_files_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("archive");
        std::fs::create_dir_all(&sub).unwrap();
        write_sheet(dir.path(), "a.json", "[]");
        write_sheet(&sub, "b.json", "[]");

        assert_eq!(find_sheet_files(dir.path()).len(), 2);
    }

    #[test]
    fn test_find_sheet_files_nonexistent_path() {
        let files = find_sheet_files(Path::new("/tmp/does-not-exist-gradlens-test"));
        assert!(files.is_empty());
    }

    // ── Workbook::load ───────────────────────────────────────────────────────

    #[test]
    fn test_load_basic_workbook() {
        let dir = TempDir::new().unwrap();
        let grid = json!([["no.", "name"], [1, "tanaka"], [2, "suzuki"]]);
        write_sheet(dir.path(), "session_tracking.json", &grid.to_string());

        let workbook = Workbook::load(dir.path()).unwrap();
        let sheet = workbook.sheet("session_tracking").unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet[1][1], json!("tanaka"));
    }

    #[test]
    fn test_load_skips_malformed_files() {
        let dir = TempDir::new().unwrap();
        write_sheet(dir.path(), "broken.json", "{not valid json{{");
        write_sheet(dir.path(), "good.json", "[[1]]");

        let workbook = Workbook::load(dir.path()).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["good"]);
    }

    #[test]
    fn test_load_skips_non_array_top_level() {
        let dir = TempDir::new().unwrap();
        write_sheet(dir.path(), "object.json", r#"{"rows": []}"#);

        let workbook = Workbook::load(dir.path()).unwrap();
        assert!(workbook.is_empty());
    }

    #[test]
    fn test_load_drops_non_array_rows() {
        let dir = TempDir::new().unwrap();
        write_sheet(dir.path(), "ragged.json", r#"[[1, 2], "stray", [3]]"#);

        let workbook = Workbook::load(dir.path()).unwrap();
        let sheet = workbook.sheet("ragged").unwrap();
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_load_empty_directory() {
        let dir = TempDir::new().unwrap();
        let workbook = Workbook::load(dir.path()).unwrap();
        assert!(workbook.is_empty());
    }

    #[test]
    fn test_sheet_not_found() {
        let workbook = Workbook::default();
        let err = workbook.sheet("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    // ── resolve_data_path ────────────────────────────────────────────────────

    #[test]
    fn test_resolve_data_path_explicit() {
        let path = resolve_data_path(Some("/tmp/export"));
        assert_eq!(path, PathBuf::from("/tmp/export"));
    }

    #[test]
    fn test_resolve_data_path_default_under_home() {
        let path = resolve_data_path(None);
        assert!(path.ends_with("Downloads/gradlens-export"));
    }
}
