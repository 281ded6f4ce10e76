//! Identity resolution across the two source sheets.
//!
//! The primary join path is the shared integer id. The secondary path
//! associates students with externally curated rosters by fuzzy name
//! matching, with the matching strategy kept pluggable so stricter rules can
//! be substituted without touching the join orchestration.

use std::collections::{HashMap, HashSet};

use gradlens_core::models::{normalize_student_name, ActivityRecord, EnrollmentRecord};
use tracing::{debug, warn};

// ── Primary join ──────────────────────────────────────────────────────────────

/// An enrollment record and its activity counterpart, joined by id.
#[derive(Debug, Clone)]
pub struct JoinedStudent {
    pub enrollment: EnrollmentRecord,
    pub activity: ActivityRecord,
}

/// Result of the id join, including the records left unresolved on each side.
///
/// Unresolved records are a filtering outcome, not an error: they are counted
/// here so the reporting layer can disclose data completeness.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub students: Vec<JoinedStudent>,
    pub unresolved_enrollments: usize,
    pub unresolved_activities: usize,
}

/// Inner-join enrollments and activities on the shared integer id.
///
/// Exactly one enrollment and at most one activity record may share an id;
/// duplicates keep the first occurrence. Output preserves the activity
/// sheet's row order.
pub fn join_by_id(
    enrollments: Vec<EnrollmentRecord>,
    activities: Vec<ActivityRecord>,
) -> JoinOutcome {
    let mut by_id: HashMap<u32, EnrollmentRecord> = HashMap::with_capacity(enrollments.len());
    for enrollment in enrollments {
        let id = enrollment.identity.id;
        match by_id.entry(id) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(enrollment);
            }
            std::collections::hash_map::Entry::Occupied(_) => {
                warn!("Duplicate enrollment id {}; keeping the first record", id);
            }
        }
    }

    let mut students = Vec::new();
    let mut unresolved_activities = 0usize;
    let mut seen_activity_ids: HashSet<u32> = HashSet::new();

    for activity in activities {
        let id = activity.identity.id;
        if !seen_activity_ids.insert(id) {
            warn!("Duplicate activity id {}; keeping the first record", id);
            continue;
        }
        match by_id.remove(&id) {
            Some(enrollment) => students.push(JoinedStudent {
                enrollment,
                activity,
            }),
            None => unresolved_activities += 1,
        }
    }

    let unresolved_enrollments = by_id.len();
    debug!(
        "Joined {} students ({} enrollments and {} activities unresolved)",
        students.len(),
        unresolved_enrollments,
        unresolved_activities
    );

    JoinOutcome {
        students,
        unresolved_enrollments,
        unresolved_activities,
    }
}

// ── Name matching strategies ──────────────────────────────────────────────────

/// A strategy for deciding whether a roster name refers to a candidate name.
///
/// Both inputs are already normalised (trimmed, width-collapsed, lowercased).
pub trait NameMatcher {
    fn matches(&self, roster_name: &str, candidate_name: &str) -> bool;
}

/// Strict equality on normalised names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl NameMatcher for ExactMatcher {
    fn matches(&self, roster_name: &str, candidate_name: &str) -> bool {
        !roster_name.is_empty() && roster_name == candidate_name
    }
}

/// Equality, or either-direction substring containment at a minimum length.
///
/// This is deliberately loose and can over-match short names; see the crate
/// documentation for the known limitation.
#[derive(Debug, Clone, Copy)]
pub struct SubstringMatcher {
    /// Minimum character count for the contained name.
    pub min_len: usize,
}

impl Default for SubstringMatcher {
    fn default() -> Self {
        Self { min_len: 3 }
    }
}

impl NameMatcher for SubstringMatcher {
    fn matches(&self, roster_name: &str, candidate_name: &str) -> bool {
        if roster_name.is_empty() || candidate_name.is_empty() {
            return false;
        }
        if roster_name == candidate_name {
            return true;
        }
        // Character count, not byte length: the data is largely CJK.
        (roster_name.chars().count() >= self.min_len && candidate_name.contains(roster_name))
            || (candidate_name.chars().count() >= self.min_len
                && roster_name.contains(candidate_name))
    }
}

// ── Roster matching ───────────────────────────────────────────────────────────

/// Result of matching a roster of names against a candidate pool.
#[derive(Debug, Clone)]
pub struct RosterMatchOutcome {
    /// `(roster index, candidate index)` pairs, in roster order.
    pub pairs: Vec<(usize, usize)>,
    /// Roster entries that matched no candidate.
    pub unmatched: usize,
}

/// Match roster names against a candidate pool, first-match-wins.
///
/// A candidate matched to one roster entry is removed from the pool, so no
/// candidate is double-counted across the remaining roster names. Roster
/// entries that match nothing are tallied, never raised.
pub fn match_roster(
    roster_names: &[String],
    candidate_names: &[String],
    matcher: &dyn NameMatcher,
) -> RosterMatchOutcome {
    let normalized_candidates: Vec<String> = candidate_names
        .iter()
        .map(|name| normalize_student_name(name))
        .collect();

    let mut used: HashSet<usize> = HashSet::new();
    let mut pairs = Vec::new();
    let mut unmatched = 0usize;

    for (roster_idx, roster_name) in roster_names.iter().enumerate() {
        let roster_norm = normalize_student_name(roster_name);
        let hit = normalized_candidates
            .iter()
            .enumerate()
            .find(|&(candidate_idx, candidate)| {
                !used.contains(&candidate_idx) && matcher.matches(&roster_norm, candidate)
            });

        match hit {
            Some((candidate_idx, _)) => {
                used.insert(candidate_idx);
                pairs.push((roster_idx, candidate_idx));
            }
            None => unmatched += 1,
        }
    }

    RosterMatchOutcome { pairs, unmatched }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
