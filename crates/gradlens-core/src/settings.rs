use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::models::YearMonth;

// ── Settings (CLI) ────────────────────────────────────────────────────────────

/// Graduation lifecycle analytics for coaching-program tracking workbooks
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gradlens",
    about = "Graduation lifecycle analytics for coaching-program tracking workbooks",
    version
)]
pub struct Settings {
    /// Directory containing the workbook snapshot (one JSON file per sheet)
    #[arg(long)]
    pub data_path: Option<String>,

    /// Cohort policy
    #[arg(long, default_value = "monthly", value_parser = ["monthly", "roster", "window"])]
    pub view: String,

    /// Roster config file (cohort label -> student names), for --view roster
    #[arg(long)]
    pub roster_file: Option<PathBuf>,

    /// Sheet schema override file
    #[arg(long)]
    pub schema_file: Option<PathBuf>,

    /// Markdown report output path (stdout when omitted)
    #[arg(long)]
    pub report_file: Option<PathBuf>,

    /// First enrollment month included in the window view (YYYY-MM)
    #[arg(long)]
    pub enroll_from: Option<String>,

    /// Last enrollment month included in the window view (YYYY-MM)
    #[arg(long)]
    pub enroll_to: Option<String>,

    /// Calendar months reported by the window view (comma-separated YYYY-MM)
    #[arg(long)]
    pub months: Option<String>,

    /// First graduation-month range for the manager comparison (YYYY-MM:YYYY-MM)
    #[arg(long)]
    pub compare_a: Option<String>,

    /// Second graduation-month range for the manager comparison (YYYY-MM:YYYY-MM)
    #[arg(long)]
    pub compare_b: Option<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── MonthRange ────────────────────────────────────────────────────────────────

/// An inclusive range of calendar months, parsed from `YYYY-MM:YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl MonthRange {
    pub fn parse(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| AnalyticsError::Config(format!("invalid month range: {s}")))?;
        let start = YearMonth::parse(start.trim())?;
        let end = YearMonth::parse(end.trim())?;
        if end < start {
            return Err(AnalyticsError::Config(format!(
                "month range end precedes start: {s}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ym: YearMonth) -> bool {
        self.start <= ym && ym <= self.end
    }

    /// Every month in the range, in order.
    pub fn months(&self) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            months.push(current);
            current = current.plus_months(1);
        }
        months
    }
}

/// Parse a comma-separated list of `YYYY-MM` values.
pub fn parse_month_list(s: &str) -> Result<Vec<YearMonth>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(YearMonth::parse)
        .collect()
}

// ── RosterConfig ──────────────────────────────────────────────────────────────

/// Externally curated cohort rosters: cohort label → list of student names.
///
/// Labels iterate in lexicographic order, so roster matching is deterministic
/// across runs.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct RosterConfig {
    #[serde(default)]
    pub cohorts: BTreeMap<String, Vec<String>>,
}

impl RosterConfig {
    /// Load rosters from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalyticsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomically write rosters to `path`, creating parent directories if
    /// needed.
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

    /// Total number of roster entries across all cohorts.
    pub fn entry_count(&self) -> usize {
        self.cohorts.values().map(Vec::len).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── MonthRange ───────────────────────────────────────────────────────────

    #[test]
    fn test_month_range_parse() {
        let range = MonthRange::parse("2025-08:2025-10").unwrap();
        assert_eq!(range.start, YearMonth::new(2025, 8));
        assert_eq!(range.end, YearMonth::new(2025, 10));
    }

    #[test]
    fn test_month_range_rejects_reversed() {
        assert!(MonthRange::parse("2025-10:2025-08").is_err());
    }

    #[test]
    fn test_month_range_rejects_malformed() {
        assert!(MonthRange::parse("2025-08").is_err());
        assert!(MonthRange::parse("2025-08..2025-10").is_err());
    }

    #[test]
    fn test_month_range_contains() {
        let range = MonthRange::parse("2025-11:2026-01").unwrap();
        assert!(range.contains(YearMonth::new(2025, 11)));
        assert!(range.contains(YearMonth::new(2025, 12)));
        assert!(range.contains(YearMonth::new(2026, 1)));
        assert!(!range.contains(YearMonth::new(2025, 10)));
        assert!(!range.contains(YearMonth::new(2026, 2)));
    }

    #[test]
    fn test_month_range_months_spans_year_boundary() {
        let range = MonthRange::parse("2025-11:2026-01").unwrap();
        let months: Vec<String> = range.months().iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2025-11", "2025-12", "2026-01"]);
    }

    #[test]
    fn test_parse_month_list() {
        let months = parse_month_list("2025-11, 2025-12,2026-01").unwrap();
        assert_eq!(months.len(), 3);
        assert_eq!(months[2], YearMonth::new(2026, 1));
    }

    #[test]
    fn test_parse_month_list_rejects_garbage() {
        assert!(parse_month_list("2025-11,nope").is_err());
    }

    // ── RosterConfig ─────────────────────────────────────────────────────────

    #[test]
    fn test_roster_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rosters").join("q4.json");

        let config = RosterConfig {
            cohorts: BTreeMap::from([
                (
                    "2025-11".to_string(),
                    vec!["hirayama mika".to_string(), "shimura manabu".to_string()],
                ),
                ("2025-12".to_string(), vec!["nagai keiko".to_string()]),
            ]),
        };
        config.save_to(&path).unwrap();

        let loaded = RosterConfig::load_from(&path).unwrap();
        assert_eq!(loaded.entry_count(), 3);
        assert_eq!(loaded.cohorts["2025-12"], vec!["nagai keiko"]);
    }

    #[test]
    fn test_roster_config_missing_file() {
        let err = RosterConfig::load_from(Path::new("/no/such/rosters.json")).unwrap_err();
        assert!(matches!(err, AnalyticsError::FileRead { .. }));
    }

    #[test]
    fn test_roster_config_empty_default() {
        let config = RosterConfig::default();
        assert_eq!(config.entry_count(), 0);
    }

    // ── Settings ─────────────────────────────────────────────────────────────

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::parse_from(["gradlens"]);
        assert_eq!(settings.view, "monthly");
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.data_path.is_none());
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_view_parser_rejects_unknown() {
        let result = Settings::try_parse_from(["gradlens", "--view", "hourly"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_full_invocation() {
        let settings = Settings::parse_from([
            "gradlens",
            "--data-path",
            "/tmp/export",
            "--view",
            "roster",
            "--roster-file",
            "/tmp/rosters.json",
            "--compare-a",
            "2025-08:2025-10",
            "--compare-b",
            "2025-11:2026-01",
        ]);
        assert_eq!(settings.view, "roster");
        assert_eq!(settings.data_path.as_deref(), Some("/tmp/export"));
        assert_eq!(settings.compare_a.as_deref(), Some("2025-08:2025-10"));
    }
}
