use super::Sample;

/// Index of the last sample recorded at or before `elapsed_seconds`.
///
/// Samples must be sorted by timestamp. With duplicate timestamps the latest
/// matching index wins, so replay always moves as far forward as it can.
/// Returns `None` when every sample is later than `elapsed_seconds` (or there
/// are no samples at all).
pub fn last_sample_at_or_before(samples: &[Sample], elapsed_seconds: f64) -> Option<usize> {
    last_at_or_before(samples, elapsed_seconds, |s| s.timestamp_seconds)
}

/// Predicate boundary search over any slice sorted by `key`, O(log n).
pub fn last_at_or_before<T>(items: &[T], target: f64, key: impl Fn(&T) -> f64) -> Option<usize> {
    // number of items whose key is <= target; the predicate is true for a prefix
    let mut lo = 0;
    let mut hi = items.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if key(&items[mid]) <= target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo.checked_sub(1)
}

/// Forward linear scan, O(n). Baseline for the boundary search benchmark.
pub fn last_sample_linear(samples: &[Sample], elapsed_seconds: f64) -> Option<usize> {
    samples
        .iter()
        .position(|s| s.timestamp_seconds > elapsed_seconds)
        .unwrap_or(samples.len())
        .checked_sub(1)
}
