//! # Ranker
//! Deterministic total order over scored results: score descending, then
//! nearer deadline, then instrument id. Optional minimum-score threshold and
//! top-N truncation. Expired-deadline results only survive when nothing
//! better exists, so a stale catalog still produces output.

use std::cmp::Ordering;

use crate::scoring::ScoredResult;

/// Ranking knobs; both optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankOptions {
    /// Drop results scoring strictly below this value.
    pub min_score: Option<f32>,
    /// Keep at most this many results, applied after sorting.
    pub limit: Option<usize>,
}

/// Order scored results into a reproducible ranking.
pub fn rank(mut results: Vec<ScoredResult>, options: RankOptions) -> Vec<ScoredResult> {
    // Expired deadlines leave the ranking unless every candidate is expired.
    if results.iter().any(|r| !r.deadline_passed) {
        results.retain(|r| !r.deadline_passed);
    }

    if let Some(threshold) = options.min_score {
        results.retain(|r| r.score >= threshold);
    }

    results.sort_by(compare);

    if let Some(limit) = options.limit {
        results.truncate(limit);
    }
    results
}

/// Score descending; on ties the nearer deadline wins and no-deadline sorts
/// last; id ascending guarantees totality.
fn compare(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.instrument_id.cmp(&b.instrument_id))
}
