//! Per-sentence conflict resolution.
//!
//! Candidates are ranked by `(priority asc, confidence desc, length desc)`
//! and swept greedily: a candidate is accepted iff its range does not
//! intersect any accepted range. The sort is stable, so ties keep the
//! registry's concatenation order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chimei_shared::SpanCandidate;

/// Ranking used to decide which of two conflicting candidates wins.
/// `Less` means `a` is considered first.
pub fn precedence(a: &SpanCandidate, b: &SpanCandidate) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| b.char_len().cmp(&a.char_len()))
}

/// Resolve one sentence's candidates into a non-overlapping set, ordered by
/// start offset.
pub fn resolve(mut candidates: Vec<SpanCandidate>) -> Vec<SpanCandidate> {
    candidates.sort_by(precedence);

    // start -> end of accepted, pairwise disjoint ranges
    let mut accepted_ranges: BTreeMap<usize, usize> = BTreeMap::new();
    let mut accepted = Vec::new();

    for candidate in candidates {
        if intersects_any(&accepted_ranges, candidate.start, candidate.end) {
            continue;
        }
        accepted_ranges.insert(candidate.start, candidate.end);
        accepted.push(candidate);
    }

    accepted.sort_by_key(|c| c.start);
    debug_assert!(
        is_overlap_free(&accepted),
        "resolver produced overlapping spans: {accepted:?}"
    );
    accepted
}

/// Whether `[start, end)` intersects one of the disjoint `ranges`.
///
/// Only the accepted range with the greatest start below `end` can
/// intersect; any earlier one ends at or before that range starts.
fn intersects_any(ranges: &BTreeMap<usize, usize>, start: usize, end: usize) -> bool {
    ranges
        .range(..end)
        .next_back()
        .is_some_and(|(_, &accepted_end)| accepted_end > start)
}

/// True when no two spans intersect. Spans may be in any order.
pub fn is_overlap_free(spans: &[SpanCandidate]) -> bool {
    let mut ranges: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
    ranges.sort_unstable();
    ranges.windows(2).all(|w| w[0].1 <= w[1].0)
}
