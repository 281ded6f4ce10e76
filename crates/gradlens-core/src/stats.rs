use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── GroupSummary ──────────────────────────────────────────────────────────────

/// Descriptive statistics for one group of lifecycle post totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Grouping key (cohort label, manager name, ...).
    pub key: String,
    pub count: usize,
    pub mean: f64,
    pub sum: i64,
    /// Sample standard deviation. Undefined (absent, not zero) for
    /// single-member groups.
    pub std_dev: Option<f64>,
    pub min: i64,
    pub max: i64,
}

/// Summarise one group of totals.
///
/// Returns `None` for an empty group: a zero-member aggregate is "not
/// computable", never a fabricated row of zeros.
pub fn summarize(key: impl Into<String>, values: &[i64]) -> Option<GroupSummary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let sum: i64 = values.iter().sum();
    let mean = sum as f64 / count as f64;

    let std_dev = if count >= 2 {
        let var = values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / (count as f64 - 1.0);
        Some(var.sqrt())
    } else {
        None
    };

    let mut min = values[0];
    let mut max = values[0];
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }

    Some(GroupSummary {
        key: key.into(),
        count,
        mean,
        sum,
        std_dev,
        min,
        max,
    })
}

/// Summarise every group in `groups`, ordered by mean descending (ties broken
/// by key so the output is deterministic).
pub fn summarize_groups(groups: &BTreeMap<String, Vec<i64>>) -> Vec<GroupSummary> {
    let mut summaries: Vec<GroupSummary> = groups
        .iter()
        .filter_map(|(key, values)| summarize(key.clone(), values))
        .collect();
    summaries.sort_by(|a, b| {
        b.mean
            .partial_cmp(&a.mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    summaries
}

// ── Correlation ───────────────────────────────────────────────────────────────

/// Outcome of a pairwise correlation between two group-level series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correlation {
    /// Pearson correlation coefficient over the aligned series.
    Coefficient(f64),
    /// Fewer than 2 aligned keys, or a degenerate (zero-variance) series:
    /// reported explicitly, never emitted as a number.
    InsufficientData,
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correlation::Coefficient(r) => write!(f, "{:.3}", r),
            Correlation::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

/// A labelled correlation between two summaries over the same dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// Human-readable comparison label, e.g. `"all-time vs 2025-Q4"`.
    pub label: String,
    /// Number of keys present in both summaries.
    pub aligned_groups: usize,
    pub outcome: Correlation,
}

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns `None` when fewer than 2 points are given or either series has
/// zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    let den = (den_x * den_y).sqrt();
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Correlate two group summaries keyed by the same dimension.
///
/// The series are restricted to keys present in both summaries; the
/// coefficient is computed over the aligned means.
pub fn correlate_summaries(
    label: impl Into<String>,
    a: &[GroupSummary],
    b: &[GroupSummary],
) -> CorrelationReport {
    let b_by_key: BTreeMap<&str, f64> = b.iter().map(|s| (s.key.as_str(), s.mean)).collect();

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for summary in a {
        if let Some(&other_mean) = b_by_key.get(summary.key.as_str()) {
            xs.push(summary.mean);
            ys.push(other_mean);
        }
    }

    let outcome = match pearson(&xs, &ys) {
        Some(r) => Correlation::Coefficient(r),
        None => Correlation::InsufficientData,
    };

    CorrelationReport {
        label: label.into(),
        aligned_groups: xs.len(),
        outcome,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
