use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalyticsError;

/// Number of tracked activity periods per student: months 0 through 6
/// relative to enrollment. Every computation that touches monthly activity
/// uses this constant.
pub const MONTHLY_WINDOW: usize = 7;

// ── YearMonth ─────────────────────────────────────────────────────────────────

/// A calendar year-month, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based calendar month (1–12).
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The year-month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a `YYYY-MM` string.
    pub fn parse(s: &str) -> Result<Self, AnalyticsError> {
        let invalid = || AnalyticsError::YearMonthParse(s.to_string());
        let (year_str, month_str) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year_str.parse().map_err(|_| invalid())?;
        let month: u32 = month_str.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }

    /// The year-month `delta` calendar months after (or before, when
    /// negative) this one.
    pub fn plus_months(self, delta: i32) -> Self {
        let total = self.year * 12 + self.month as i32 - 1 + delta;
        Self {
            year: total.div_euclid(12),
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    /// Signed number of calendar months from `earlier` to `self`.
    pub fn months_since(self, earlier: YearMonth) -> i32 {
        (self.year - earlier.year) * 12 + self.month as i32 - earlier.month as i32
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ── Name normalisation ────────────────────────────────────────────────────────

/// Normalise a student name for matching: strip surrounding whitespace,
/// collapse full-width spaces to ASCII spaces, and lowercase.
pub fn normalize_student_name(name: &str) -> String {
    name.trim().replace('\u{3000}', " ").to_lowercase()
}

// ── StudentIdentity ───────────────────────────────────────────────────────────

/// A student's identity as it appears in one source row.
///
/// Created once per row at load time; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentIdentity {
    /// Stable integer key shared across source sheets.
    pub id: u32,
    /// The name exactly as entered in the source cell.
    pub raw_name: String,
    /// Whitespace/width/case-normalised form used for matching.
    pub normalized_name: String,
}

impl StudentIdentity {
    pub fn new(id: u32, raw_name: impl Into<String>) -> Self {
        let raw_name = raw_name.into();
        let normalized_name = normalize_student_name(&raw_name);
        Self {
            id,
            raw_name,
            normalized_name,
        }
    }
}

// ── EnrollmentRecord ──────────────────────────────────────────────────────────

/// One student's row from the session-tracking sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub identity: StudentIdentity,
    /// Date of the first regular coaching session, when recorded.
    pub enrollment_date: Option<NaiveDate>,
    /// Date the sixth (final) session took place. Presence is the
    /// authoritative graduation signal.
    pub sixth_session_date: Option<NaiveDate>,
    /// Assigned manager label; empty when the cell is blank.
    pub manager: String,
}

// ── ActivityRecord ────────────────────────────────────────────────────────────

/// One student's row from the monthly-posts sheet.
///
/// `monthly_posts[i]` is the post count for month `i` relative to enrollment;
/// `None` means the source cell held a sentinel placeholder, which is distinct
/// from a recorded zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub identity: StudentIdentity,
    pub monthly_posts: [Option<i64>; MONTHLY_WINDOW],
}

impl ActivityRecord {
    /// Sum of the defined monthly values across the whole window.
    ///
    /// Absent months contribute 0 to the total.
    pub fn lifecycle_total(&self) -> i64 {
        self.monthly_posts.iter().flatten().sum()
    }

    /// Whether any month in the window carries a real value.
    ///
    /// A row with no defined month anywhere indicates absence of lifecycle
    /// data rather than zero activity.
    pub fn has_lifecycle_data(&self) -> bool {
        self.monthly_posts.iter().any(Option::is_some)
    }

    /// The value at window index `idx`, or `None` when out of range or
    /// sentinel.
    pub fn month_value(&self, idx: usize) -> Option<i64> {
        self.monthly_posts.get(idx).copied().flatten()
    }
}

// ── GraduationStatus ──────────────────────────────────────────────────────────

/// Whether a student has completed the coaching lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraduationStatus {
    /// Still inside the program window.
    Active,
    /// Completed the program (terminal state).
    Graduated,
}

// ── LifecycleRecord ───────────────────────────────────────────────────────────

/// The derived per-student lifecycle view: the transient join of enrollment
/// and activity data. Computed fresh per analysis run, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub identity: StudentIdentity,
    /// Manager label carried over from the enrollment record.
    pub manager: String,
    pub status: GraduationStatus,
    /// Month of graduation: the sixth-session month when explicit, an
    /// enrollment-based estimate otherwise, or `None` when neither signal
    /// exists.
    pub graduation_month: Option<YearMonth>,
    /// Sum of defined monthly values across the window. `Some` only for
    /// graduates with at least one non-sentinel month.
    pub lifecycle_post_total: Option<i64>,
    /// Grouping key assigned by the selected cohort policy.
    pub cohort_key: Option<String>,
}

impl LifecycleRecord {
    /// Whether this record belongs to the graduate population used for
    /// statistics: graduated, with real lifecycle data.
    pub fn is_countable_graduate(&self) -> bool {
        self.status == GraduationStatus::Graduated && self.lifecycle_post_total.is_some()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── YearMonth ────────────────────────────────────────────────────────────

    #[test]
    fn test_year_month_display() {
        assert_eq!(YearMonth::new(2025, 6).to_string(), "2025-06");
        assert_eq!(YearMonth::new(2026, 12).to_string(), "2026-12");
    }

    #[test]
    fn test_year_month_parse_roundtrip() {
        let ym = YearMonth::parse("2025-11").unwrap();
        assert_eq!(ym, YearMonth::new(2025, 11));
        assert_eq!(YearMonth::parse(&ym.to_string()).unwrap(), ym);
    }

    #[test]
    fn test_year_month_parse_rejects_bad_input() {
        assert!(YearMonth::parse("2025").is_err());
        assert!(YearMonth::parse("2025-13").is_err());
        assert!(YearMonth::parse("2025-00").is_err());
        assert!(YearMonth::parse("garbage").is_err());
    }

    #[test]
    fn test_year_month_plus_months_within_year() {
        assert_eq!(
            YearMonth::new(2025, 3).plus_months(2),
            YearMonth::new(2025, 5)
        );
    }

    #[test]
    fn test_year_month_plus_months_crosses_year() {
        // Enrollment June 2025 + 6 months = December 2025.
        assert_eq!(
            YearMonth::new(2025, 6).plus_months(6),
            YearMonth::new(2025, 12)
        );
        assert_eq!(
            YearMonth::new(2025, 11).plus_months(3),
            YearMonth::new(2026, 2)
        );
    }

    #[test]
    fn test_year_month_plus_months_negative() {
        assert_eq!(
            YearMonth::new(2026, 1).plus_months(-2),
            YearMonth::new(2025, 11)
        );
    }

    #[test]
    fn test_year_month_months_since() {
        let start = YearMonth::new(2025, 9);
        assert_eq!(YearMonth::new(2025, 11).months_since(start), 2);
        assert_eq!(YearMonth::new(2026, 1).months_since(start), 4);
        assert_eq!(YearMonth::new(2025, 8).months_since(start), -1);
    }

    #[test]
    fn test_year_month_ordering() {
        assert!(YearMonth::new(2025, 12) < YearMonth::new(2026, 1));
        assert!(YearMonth::new(2025, 3) < YearMonth::new(2025, 4));
    }

    #[test]
    fn test_year_month_from_date() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(YearMonth::from_date(d), YearMonth::new(2025, 6));
    }

    // ── normalize_student_name ───────────────────────────────────────────────

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_student_name("  Yamada Taro "), "yamada taro");
    }

    #[test]
    fn test_normalize_collapses_full_width_space() {
        assert_eq!(normalize_student_name("やまだ\u{3000}たろう"), "やまだ たろう");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_student_name("   "), "");
    }

    // ── ActivityRecord ───────────────────────────────────────────────────────

    fn activity(posts: [Option<i64>; MONTHLY_WINDOW]) -> ActivityRecord {
        ActivityRecord {
            identity: StudentIdentity::new(1, "test"),
            monthly_posts: posts,
        }
    }

    #[test]
    fn test_lifecycle_total_treats_absent_as_zero() {
        let rec = activity([Some(2), Some(5), None, Some(4), Some(0), None, Some(7)]);
        assert_eq!(rec.lifecycle_total(), 18);
    }

    #[test]
    fn test_lifecycle_total_all_absent_is_zero() {
        let rec = activity([None; MONTHLY_WINDOW]);
        assert_eq!(rec.lifecycle_total(), 0);
        assert!(!rec.has_lifecycle_data());
    }

    #[test]
    fn test_has_lifecycle_data_with_single_zero() {
        // A recorded zero is data; a sentinel is not.
        let rec = activity([None, None, Some(0), None, None, None, None]);
        assert!(rec.has_lifecycle_data());
    }

    #[test]
    fn test_month_value_out_of_range() {
        let rec = activity([Some(1); MONTHLY_WINDOW]);
        assert_eq!(rec.month_value(6), Some(1));
        assert_eq!(rec.month_value(7), None);
    }

    // ── StudentIdentity ──────────────────────────────────────────────────────

    #[test]
    fn test_identity_normalizes_on_construction() {
        let id = StudentIdentity::new(42, " Suzuki\u{3000}Hanako ");
        assert_eq!(id.raw_name, " Suzuki\u{3000}Hanako ");
        assert_eq!(id.normalized_name, "suzuki hanako");
    }

    // ── LifecycleRecord ──────────────────────────────────────────────────────

    #[test]
    fn test_countable_graduate_requires_total() {
        let base = LifecycleRecord {
            identity: StudentIdentity::new(1, "a"),
            manager: String::new(),
            status: GraduationStatus::Graduated,
            graduation_month: None,
            lifecycle_post_total: Some(10),
            cohort_key: None,
        };
        assert!(base.is_countable_graduate());

        let no_data = LifecycleRecord {
            lifecycle_post_total: None,
            ..base.clone()
        };
        assert!(!no_data.is_countable_graduate());

        let active = LifecycleRecord {
            status: GraduationStatus::Active,
            ..base
        };
        assert!(!active.is_countable_graduate());
    }

    // ── GraduationStatus serde ───────────────────────────────────────────────

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&GraduationStatus::Graduated).unwrap();
        assert_eq!(json, r#""graduated""#);
        let back: GraduationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GraduationStatus::Graduated);
    }
}
