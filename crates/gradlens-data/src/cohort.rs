//! Cohort assignment and lifecycle aggregation.
//!
//! Buckets graduated students into cohorts under one of three policies and
//! produces the grouped totals consumed by the statistics engine. The
//! lifecycle total itself is computed once at inference time, so totals are
//! identical under every aggregation view.

use std::collections::BTreeMap;

use gradlens_core::models::{LifecycleRecord, YearMonth};
use gradlens_core::settings::{MonthRange, RosterConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolver::{match_roster, JoinedStudent, NameMatcher};

// ── CohortPolicy ──────────────────────────────────────────────────────────────

/// How graduated students are grouped for aggregate comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortPolicy {
    /// Group by graduation calendar month (`YYYY-MM`).
    CalendarMonth,
    /// Group by externally curated roster label.
    NamedRoster,
    /// Report per-calendar-month activity for an enrollment-window cohort.
    RelativeMonth,
}

impl CohortPolicy {
    /// Map the CLI view selector to a policy.
    pub fn from_view(view: &str) -> Option<Self> {
        match view {
            "monthly" => Some(Self::CalendarMonth),
            "roster" => Some(Self::NamedRoster),
            "window" => Some(Self::RelativeMonth),
            _ => None,
        }
    }
}

// ── Calendar-month cohorts ────────────────────────────────────────────────────

/// Assign each countable graduate its graduation month as the cohort key.
///
/// Returns the number of graduates left unassigned because their graduation
/// month could not be determined (excluded from month-keyed reporting while
/// still counting in unconstrained totals).
pub fn assign_calendar_cohorts(records: &mut [LifecycleRecord]) -> usize {
    let mut without_month = 0usize;
    for record in records.iter_mut().filter(|r| r.is_countable_graduate()) {
        match record.graduation_month {
            Some(month) => record.cohort_key = Some(month.to_string()),
            None => without_month += 1,
        }
    }
    without_month
}

// ── Named-roster cohorts ──────────────────────────────────────────────────────

/// Tally of a roster-cohort assignment run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RosterAssignment {
    pub assigned: usize,
    /// Roster entries that matched no graduate.
    pub unmatched_roster_entries: usize,
}

/// Assign cohort keys from curated rosters via fuzzy name matching.
///
/// Roster labels are processed in lexicographic order and every roster entry
/// draws from a single shared candidate pool, so a graduate can be claimed by
/// at most one cohort.
pub fn assign_roster_cohorts(
    records: &mut [LifecycleRecord],
    rosters: &RosterConfig,
    matcher: &dyn NameMatcher,
) -> RosterAssignment {
    // Flatten (label, name) pairs in label order so one match_roster call
    // provides global deduplication.
    let flat: Vec<(&str, &str)> = rosters
        .cohorts
        .iter()
        .flat_map(|(label, names)| names.iter().map(move |n| (label.as_str(), n.as_str())))
        .collect();
    let roster_names: Vec<String> = flat.iter().map(|(_, name)| name.to_string()).collect();

    let candidate_indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_countable_graduate())
        .map(|(i, _)| i)
        .collect();
    let candidate_names: Vec<String> = candidate_indices
        .iter()
        .map(|&i| records[i].identity.raw_name.clone())
        .collect();

    let outcome = match_roster(&roster_names, &candidate_names, matcher);

    for &(roster_idx, candidate_idx) in &outcome.pairs {
        let (label, _) = flat[roster_idx];
        let record_idx = candidate_indices[candidate_idx];
        records[record_idx].cohort_key = Some(label.to_string());
    }

    debug!(
        "Roster assignment: {} matched, {} roster entries unmatched",
        outcome.pairs.len(),
        outcome.unmatched
    );

    RosterAssignment {
        assigned: outcome.pairs.len(),
        unmatched_roster_entries: outcome.unmatched,
    }
}

// ── Grouped totals ────────────────────────────────────────────────────────────

/// Lifecycle totals of countable graduates grouped by cohort key.
pub fn group_totals_by_cohort(records: &[LifecycleRecord]) -> BTreeMap<String, Vec<i64>> {
    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_countable_graduate()) {
        if let (Some(key), Some(total)) = (&record.cohort_key, record.lifecycle_post_total) {
            groups.entry(key.clone()).or_default().push(total);
        }
    }
    groups
}

/// Lifecycle totals of countable graduates grouped by manager.
///
/// Records with an empty manager label are left out of the grouping.
pub fn group_totals_by_manager(records: &[LifecycleRecord]) -> BTreeMap<String, Vec<i64>> {
    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_countable_graduate()) {
        if record.manager.is_empty() {
            continue;
        }
        if let Some(total) = record.lifecycle_post_total {
            groups
                .entry(record.manager.clone())
                .or_default()
                .push(total);
        }
    }
    groups
}

/// Lifecycle totals grouped by manager, restricted to graduates whose
/// graduation month falls in `window`.
pub fn manager_totals_in_window(
    records: &[LifecycleRecord],
    window: MonthRange,
) -> BTreeMap<String, Vec<i64>> {
    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_countable_graduate()) {
        if record.manager.is_empty() {
            continue;
        }
        let Some(month) = record.graduation_month else {
            continue;
        };
        if !window.contains(month) {
            continue;
        }
        if let Some(total) = record.lifecycle_post_total {
            groups
                .entry(record.manager.clone())
                .or_default()
                .push(total);
        }
    }
    groups
}

// ── Relative-month view ───────────────────────────────────────────────────────

/// Aggregate posting for one calendar month across an enrollment-window
/// cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: YearMonth,
    /// Students in the enrollment window (the averaging population, including
    /// zero contributors).
    pub cohort_size: usize,
    pub total: i64,
    pub mean: f64,
}

/// Compute per-calendar-month posting totals for students who enrolled at
/// varying times.
///
/// A student contributes the activity value at window index
/// `(M − enrollment month)` when that offset falls within the tracked window;
/// otherwise the contribution is 0 (not yet enrolled, or already past the
/// window).
pub fn calendar_month_totals(
    students: &[JoinedStudent],
    enrollment_window: MonthRange,
    months: &[YearMonth],
) -> Vec<MonthTotal> {
    let cohort: Vec<(&JoinedStudent, YearMonth)> = students
        .iter()
        .filter_map(|s| {
            let date = s.enrollment.enrollment_date?;
            let ym = YearMonth::from_date(date);
            enrollment_window.contains(ym).then_some((s, ym))
        })
        .collect();

    let cohort_size = cohort.len();
    months
        .iter()
        .map(|&month| {
            let total: i64 = cohort
                .iter()
                .map(|(student, enrolled)| {
                    let offset = month.months_since(*enrolled);
                    if !(0..gradlens_core::models::MONTHLY_WINDOW as i32).contains(&offset) {
                        return 0;
                    }
                    student.activity.month_value(offset as usize).unwrap_or(0)
                })
                .sum();
            let mean = if cohort_size > 0 {
                total as f64 / cohort_size as f64
            } else {
                0.0
            };
            MonthTotal {
                month,
                cohort_size,
                total,
                mean,
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
