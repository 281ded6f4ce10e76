//! Main analysis pipeline for gradlens.
//!
//! Orchestrates workbook loading, identity resolution, graduation inference,
//! cohort assignment and group statistics, returning an [`AnalysisResult`]
//! ready for the reporting layer.

use chrono::Utc;
use gradlens_core::error::{AnalyticsError, Result};
use gradlens_core::models::{LifecycleRecord, YearMonth};
use gradlens_core::schema::SchemaConfig;
use gradlens_core::settings::{MonthRange, RosterConfig};
use gradlens_core::stats::{
    correlate_summaries, summarize_groups, CorrelationReport, GroupSummary,
};

use crate::cohort::{
    assign_calendar_cohorts, assign_roster_cohorts, calendar_month_totals,
    group_totals_by_cohort, group_totals_by_manager, manager_totals_in_window, CohortPolicy,
    MonthTotal,
};
use crate::inference::build_lifecycle;
use crate::loader::{load_activities, load_enrollments};
use crate::resolver::{join_by_id, SubstringMatcher};
use crate::workbook::{resolve_data_path, Workbook};

// ── Options ───────────────────────────────────────────────────────────────────

/// Everything the pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Snapshot directory; defaults to the standard export location.
    pub data_path: Option<String>,
    pub policy: CohortPolicy,
    /// Curated rosters, consumed by the named-roster policy.
    pub rosters: RosterConfig,
    pub schemas: SchemaConfig,
    /// Enrollment window for the relative-month view.
    pub enrollment_window: Option<MonthRange>,
    /// Calendar months reported by the relative-month view. When empty, the
    /// enrollment window's own months are used.
    pub months: Vec<YearMonth>,
    /// Two graduation-month windows for the per-manager trend comparison.
    pub compare: Option<(MonthRange, MonthRange)>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            data_path: None,
            policy: CohortPolicy::CalendarMonth,
            rosters: RosterConfig::default(),
            schemas: SchemaConfig::default(),
            enrollment_window: None,
            months: Vec::new(),
            compare: None,
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Run metadata, including every exclusion tally the reporting layer needs to
/// disclose data completeness.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub enrollments_loaded: usize,
    pub activities_loaded: usize,
    pub students_joined: usize,
    /// Enrollment records with no activity counterpart.
    pub unresolved_enrollments: usize,
    /// Activity records with no enrollment counterpart.
    pub unresolved_activities: usize,
    /// Graduates dropped for having no lifecycle data at all.
    pub excluded_no_lifecycle_data: usize,
    pub graduates: usize,
    pub active_students: usize,
    /// Graduates left out of month-keyed cohorts for lack of a graduation
    /// month.
    pub graduates_without_month: usize,
    /// Roster entries that matched no graduate (named-roster policy only).
    pub unmatched_roster_entries: usize,
    /// Wall-clock seconds spent loading the snapshot.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent joining, inferring and aggregating.
    pub transform_time_seconds: f64,
}

/// The complete output of [`analyze_workbook`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Per-student lifecycle records (graduates and active students).
    pub lifecycle: Vec<LifecycleRecord>,
    /// Per-cohort statistics, ordered by cohort key.
    pub cohort_summaries: Vec<GroupSummary>,
    /// Per-manager statistics over all countable graduates, ordered by mean
    /// descending.
    pub manager_summaries: Vec<GroupSummary>,
    /// Relative-month view rows (empty unless that policy is selected).
    pub month_totals: Vec<MonthTotal>,
    /// Cross-window correlation reports (empty without a comparison request).
    pub correlations: Vec<CorrelationReport>,
    pub metadata: AnalysisMetadata,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

fn range_label(range: MonthRange) -> String {
    format!("{}..{}", range.start, range.end)
}

/// Run the full analysis pipeline.
///
/// 1. Load the workbook snapshot and both source sheets.
/// 2. Join the two record sets on the shared id.
/// 3. Infer graduation status and month per student.
/// 4. Assign cohorts per the selected policy and summarise groups.
/// 5. Optionally correlate per-manager averages across two windows.
pub fn analyze_workbook(options: &AnalysisOptions) -> Result<AnalysisResult> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let path = resolve_data_path(options.data_path.as_deref());
    let workbook = Workbook::load(&path)?;

    let session_grid = workbook.sheet(&options.schemas.session_tracking.sheet)?;
    let monthly_grid = workbook.sheet(&options.schemas.monthly_posts.sheet)?;

    let enrollments = load_enrollments(session_grid, &options.schemas.session_tracking)?;
    let activities = load_activities(monthly_grid, &options.schemas.monthly_posts)?;
    let enrollments_loaded = enrollments.len();
    let activities_loaded = activities.len();
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Join ──────────────────────────────────────────────────────────
    let transform_start = std::time::Instant::now();
    let join = join_by_id(enrollments, activities);
    let students_joined = join.students.len();

    // ── Step 3: Infer ─────────────────────────────────────────────────────────
    let mut lifecycle_set = build_lifecycle(&join.students);
    let graduates = lifecycle_set.graduate_count();
    let active_students = lifecycle_set.active_count();

    // ── Step 4: Cohorts ───────────────────────────────────────────────────────
    let mut graduates_without_month = 0usize;
    let mut unmatched_roster_entries = 0usize;
    let mut month_totals = Vec::new();

    match options.policy {
        CohortPolicy::CalendarMonth => {
            graduates_without_month = assign_calendar_cohorts(&mut lifecycle_set.records);
        }
        CohortPolicy::NamedRoster => {
            let assignment = assign_roster_cohorts(
                &mut lifecycle_set.records,
                &options.rosters,
                &SubstringMatcher::default(),
            );
            unmatched_roster_entries = assignment.unmatched_roster_entries;
        }
        CohortPolicy::RelativeMonth => {
            let window = options.enrollment_window.ok_or_else(|| {
                AnalyticsError::Config(
                    "the window view requires an enrollment window (--enroll-from/--enroll-to)"
                        .to_string(),
                )
            })?;
            let months = if options.months.is_empty() {
                window.months()
            } else {
                options.months.clone()
            };
            month_totals = calendar_month_totals(&join.students, window, &months);
        }
    }

    let mut cohort_summaries = summarize_groups(&group_totals_by_cohort(&lifecycle_set.records));
    // Cohort tables read chronologically (or by roster label), not by rank.
    cohort_summaries.sort_by(|a, b| a.key.cmp(&b.key));

    let manager_summaries =
        summarize_groups(&group_totals_by_manager(&lifecycle_set.records));

    // ── Step 5: Correlations ──────────────────────────────────────────────────
    let mut correlations = Vec::new();
    if let Some((window_a, window_b)) = options.compare {
        let summaries_a =
            summarize_groups(&manager_totals_in_window(&lifecycle_set.records, window_a));
        let summaries_b =
            summarize_groups(&manager_totals_in_window(&lifecycle_set.records, window_b));

        correlations.push(correlate_summaries(
            format!("all-time vs {}", range_label(window_a)),
            &manager_summaries,
            &summaries_a,
        ));
        correlations.push(correlate_summaries(
            format!("all-time vs {}", range_label(window_b)),
            &manager_summaries,
            &summaries_b,
        ));
        correlations.push(correlate_summaries(
            format!("{} vs {}", range_label(window_a), range_label(window_b)),
            &summaries_a,
            &summaries_b,
        ));
    }
    let transform_time = transform_start.elapsed().as_secs_f64();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        enrollments_loaded,
        activities_loaded,
        students_joined,
        unresolved_enrollments: join.unresolved_enrollments,
        unresolved_activities: join.unresolved_activities,
        excluded_no_lifecycle_data: lifecycle_set.excluded_no_data,
        graduates,
        active_students,
        graduates_without_month,
        unmatched_roster_entries,
        load_time_seconds: load_time,
        transform_time_seconds: transform_time,
    };

    Ok(AnalysisResult {
        lifecycle: lifecycle_set.records,
        cohort_summaries,
        manager_summaries,
        month_totals,
        correlations,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
