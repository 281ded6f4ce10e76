//! Graduation inference.
//!
//! Determines each joined student's lifecycle state: Active (initial) or
//! Graduated (terminal), plus a graduation month for graduates. The explicit
//! sixth-session date is authoritative; the terminal-month fallback exists
//! because historical records predate consistent completion-date logging but
//! still carry a full activity window.

use gradlens_core::models::{
    GraduationStatus, LifecycleRecord, YearMonth, MONTHLY_WINDOW,
};
use tracing::debug;

use crate::resolver::JoinedStudent;

/// Window index of the terminal month.
const TERMINAL_MONTH: usize = MONTHLY_WINDOW - 1;

// ── Inference ─────────────────────────────────────────────────────────────────

/// The outcome of graduation inference for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraduationOutcome {
    pub status: GraduationStatus,
    pub graduation_month: Option<YearMonth>,
}

/// Evaluate the transition rules for one joined student. First matching rule
/// wins:
///
/// 1. Explicit sixth-session date → Graduated in that date's month.
/// 2. Terminal-month activity value present → Graduated; the month is
///    estimated as enrollment month + 6, or left unset when the enrollment
///    date is also absent.
/// 3. Otherwise → Active.
pub fn infer_graduation(student: &JoinedStudent) -> GraduationOutcome {
    if let Some(sixth) = student.enrollment.sixth_session_date {
        return GraduationOutcome {
            status: GraduationStatus::Graduated,
            graduation_month: Some(YearMonth::from_date(sixth)),
        };
    }

    if student.activity.month_value(TERMINAL_MONTH).is_some() {
        let estimated = student
            .enrollment
            .enrollment_date
            .map(|d| YearMonth::from_date(d).plus_months(TERMINAL_MONTH as i32));
        return GraduationOutcome {
            status: GraduationStatus::Graduated,
            graduation_month: estimated,
        };
    }

    GraduationOutcome {
        status: GraduationStatus::Active,
        graduation_month: None,
    }
}

// ── Lifecycle construction ────────────────────────────────────────────────────

/// The derived lifecycle records plus the exclusion tally.
#[derive(Debug, Clone)]
pub struct LifecycleSet {
    pub records: Vec<LifecycleRecord>,
    /// Graduates dropped because no month in their window carried real data
    /// (absence of lifecycle data, not zero activity).
    pub excluded_no_data: usize,
}

impl LifecycleSet {
    /// Graduates that count toward population statistics.
    pub fn countable_graduates(&self) -> impl Iterator<Item = &LifecycleRecord> {
        self.records.iter().filter(|r| r.is_countable_graduate())
    }

    pub fn graduate_count(&self) -> usize {
        self.countable_graduates().count()
    }

    pub fn active_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == GraduationStatus::Active)
            .count()
    }
}

/// Build lifecycle records for every joined student.
///
/// Graduates with an empty activity window are excluded entirely and tallied;
/// active students are kept (with no lifecycle total) so listings remain
/// complete.
pub fn build_lifecycle(students: &[JoinedStudent]) -> LifecycleSet {
    let mut records = Vec::with_capacity(students.len());
    let mut excluded_no_data = 0usize;

    for student in students {
        let outcome = infer_graduation(student);

        if outcome.status == GraduationStatus::Graduated && !student.activity.has_lifecycle_data()
        {
            excluded_no_data += 1;
            continue;
        }

        let lifecycle_post_total = if outcome.status == GraduationStatus::Graduated {
            Some(student.activity.lifecycle_total())
        } else {
            None
        };

        records.push(LifecycleRecord {
            identity: student.activity.identity.clone(),
            manager: student.enrollment.manager.clone(),
            status: outcome.status,
            graduation_month: outcome.graduation_month,
            lifecycle_post_total,
            cohort_key: None,
        });
    }

    debug!(
        "Lifecycle inference: {} records ({} graduates, {} active, {} excluded for missing data)",
        records.len(),
        records.iter().filter(|r| r.is_countable_graduate()).count(),
        records
            .iter()
            .filter(|r| r.status == GraduationStatus::Active)
            .count(),
        excluded_no_data
    );

    LifecycleSet {
        records,
        excluded_no_data,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gradlens_core::models::{ActivityRecord, EnrollmentRecord, StudentIdentity};

    fn student(
        enrollment_date: Option<&str>,
        sixth_session_date: Option<&str>,
        posts: [Option<i64>; MONTHLY_WINDOW],
    ) -> JoinedStudent {
        let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        JoinedStudent {
            enrollment: EnrollmentRecord {
                identity: StudentIdentity::new(1, "test student"),
                enrollment_date: enrollment_date.map(parse),
                sixth_session_date: sixth_session_date.map(parse),
                manager: "Tommy".to_string(),
            },
            activity: ActivityRecord {
                identity: StudentIdentity::new(1, "test student"),
                monthly_posts: posts,
            },
        }
    }

    // ── infer_graduation ─────────────────────────────────────────────────────

    #[test]
    fn test_explicit_sixth_session_wins() {
        let s = student(
            Some("2025-06-01"),
            Some("2025-11-20"),
            [None; MONTHLY_WINDOW],
        );
        let outcome = infer_graduation(&s);
        assert_eq!(outcome.status, GraduationStatus::Graduated);
        assert_eq!(outcome.graduation_month, Some(YearMonth::new(2025, 11)));
    }

    #[test]
    fn test_explicit_date_overrides_estimate() {
        // The sixth session happened 5 months in, not 6: the explicit date
        // still wins over the enrollment+6 estimate.
        let s = student(
            Some("2025-06-01"),
            Some("2025-11-20"),
            [Some(1), None, None, None, None, None, Some(3)],
        );
        let outcome = infer_graduation(&s);
        assert_eq!(outcome.graduation_month, Some(YearMonth::new(2025, 11)));
    }

    #[test]
    fn test_terminal_month_fallback_estimates_month() {
        // Enrolled 2025-06-01, posts [2, 5, ー, 4, 0, ー, 7],
        // no explicit completion date.
        let s = student(
            Some("2025-06-01"),
            None,
            [Some(2), Some(5), None, Some(4), Some(0), None, Some(7)],
        );
        let outcome = infer_graduation(&s);
        assert_eq!(outcome.status, GraduationStatus::Graduated);
        assert_eq!(outcome.graduation_month, Some(YearMonth::new(2025, 12)));
    }

    #[test]
    fn test_terminal_month_zero_counts_as_data() {
        // A recorded zero in month 6 is proof of a completed window.
        let s = student(
            Some("2025-03-15"),
            None,
            [None, None, None, None, None, None, Some(0)],
        );
        let outcome = infer_graduation(&s);
        assert_eq!(outcome.status, GraduationStatus::Graduated);
        assert_eq!(outcome.graduation_month, Some(YearMonth::new(2025, 9)));
    }

    #[test]
    fn test_fallback_without_enrollment_date_leaves_month_unset() {
        let s = student(None, None, [None, None, None, None, None, None, Some(4)]);
        let outcome = infer_graduation(&s);
        assert_eq!(outcome.status, GraduationStatus::Graduated);
        assert_eq!(outcome.graduation_month, None);
    }

    #[test]
    fn test_no_signal_is_active() {
        let s = student(
            Some("2025-10-01"),
            None,
            [Some(3), Some(8), None, None, None, None, None],
        );
        let outcome = infer_graduation(&s);
        assert_eq!(outcome.status, GraduationStatus::Active);
        assert_eq!(outcome.graduation_month, None);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let s = student(
            Some("2025-06-01"),
            None,
            [Some(2), Some(5), None, Some(4), Some(0), None, Some(7)],
        );
        assert_eq!(infer_graduation(&s), infer_graduation(&s));
    }

    // ── build_lifecycle ──────────────────────────────────────────────────────

    #[test]
    fn test_build_lifecycle_fallback_graduate() {
        let set = build_lifecycle(&[student(
            Some("2025-06-01"),
            None,
            [Some(2), Some(5), None, Some(4), Some(0), None, Some(7)],
        )]);

        assert_eq!(set.records.len(), 1);
        let rec = &set.records[0];
        assert_eq!(rec.status, GraduationStatus::Graduated);
        assert_eq!(rec.lifecycle_post_total, Some(18));
        assert_eq!(rec.graduation_month, Some(YearMonth::new(2025, 12)));
        assert_eq!(rec.manager, "Tommy");
        assert_eq!(set.excluded_no_data, 0);
        assert_eq!(set.graduate_count(), 1);
    }

    #[test]
    fn test_build_lifecycle_excludes_empty_window_graduates() {
        // Explicit completion date but an all-sentinel window: excluded from
        // graduate populations entirely, tallied.
        let set = build_lifecycle(&[student(
            Some("2025-06-01"),
            Some("2025-12-01"),
            [None; MONTHLY_WINDOW],
        )]);
        assert!(set.records.is_empty());
        assert_eq!(set.excluded_no_data, 1);
        assert_eq!(set.graduate_count(), 0);
    }

    #[test]
    fn test_build_lifecycle_keeps_active_students() {
        let set = build_lifecycle(&[student(
            Some("2025-10-01"),
            None,
            [Some(3), None, None, None, None, None, None],
        )]);
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.records[0].status, GraduationStatus::Active);
        assert_eq!(set.records[0].lifecycle_post_total, None);
        assert_eq!(set.active_count(), 1);
        assert_eq!(set.graduate_count(), 0);
    }

    #[test]
    fn test_build_lifecycle_mixed_population() {
        let set = build_lifecycle(&[
            // Graduate with explicit date.
            student(
                Some("2025-05-01"),
                Some("2025-11-10"),
                [Some(10), Some(5), None, None, None, None, None],
            ),
            // Graduate via fallback.
            student(
                Some("2025-04-01"),
                None,
                [Some(1), Some(1), Some(1), Some(1), Some(1), Some(1), Some(1)],
            ),
            // Active.
            student(Some("2025-12-01"), None, [Some(2), None, None, None, None, None, None]),
            // Graduate with no data: excluded.
            student(Some("2025-01-01"), Some("2025-07-01"), [None; MONTHLY_WINDOW]),
        ]);

        assert_eq!(set.records.len(), 3);
        assert_eq!(set.graduate_count(), 2);
        assert_eq!(set.active_count(), 1);
        assert_eq!(set.excluded_no_data, 1);

        let totals: Vec<Option<i64>> = set
            .countable_graduates()
            .map(|r| r.lifecycle_post_total)
            .collect();
        assert_eq!(totals, vec![Some(15), Some(7)]);
    }
}
