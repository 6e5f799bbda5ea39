// Zero-fill: turn the store's sparse per-bucket averages into one bucket per step.
// Pure functions only; callers bound the range (MetricsRequest::validate, MetricsService::compute).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Bucket, Granularity};

/// Buckets between the bucket containing `start` and the one containing `end`, inclusive.
/// Zero when `start > end`.
pub fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>, granularity: Granularity) -> u64 {
    if start > end {
        return 0;
    }
    let first = granularity.floor(start);
    let last = granularity.floor(end);
    let span = (last - first).num_seconds();
    let step = granularity.step().num_seconds();
    (span / step) as u64 + 1
}

/// Dense, ascending sequence covering every bucket in `[start, end]`.
/// Sparse entries are matched by exact label; gaps become `{label, 0.0}`.
pub fn fill(
    sparse: &[Bucket],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: Granularity,
) -> Vec<Bucket> {
    if start > end {
        return Vec::new();
    }
    let by_label: HashMap<&str, f64> = sparse
        .iter()
        .map(|b| (b.label.as_str(), b.average))
        .collect();

    let step = granularity.step();
    let last = granularity.floor(end);
    let mut current = granularity.floor(start);
    let mut out = Vec::with_capacity(bucket_count(start, end, granularity) as usize);

    loop {
        let label = granularity.label(current);
        let average = by_label.get(label.as_str()).copied().unwrap_or(0.0);
        out.push(Bucket { label, average });

        match current.checked_add_signed(step) {
            Some(next) if next <= last => current = next,
            _ => break,
        }
    }
    out
}
