//! Numeric column statistics.

use crate::error::{PrunerError, Result};
use crate::types::NumericSummary;
use polars::prelude::*;
use std::collections::HashMap;
use std::collections::HashSet;

/// Values further than this many population standard deviations from the
/// mean are reported as outliers. A fixed policy, not a statistical test.
pub const OUTLIER_Z_SCORE: f64 = 3.0;

/// Summarize the non-missing values of a numeric column.
///
/// Returns `None` for an empty slice.
pub(crate) fn summarize(name: &str, values: &[f64]) -> Result<Option<NumericSummary>> {
    if values.is_empty() {
        return Ok(None);
    }

    let series = Series::new(name.into(), values);
    let ca = series.f64()?;
    let missing = |stat: &str| PrunerError::Internal(format!("no {stat} for column '{name}'"));

    let min = ca.min().ok_or_else(|| missing("minimum"))?;
    let max = ca.max().ok_or_else(|| missing("maximum"))?;
    let mean = ca.mean().ok_or_else(|| missing("mean"))?;
    let median = ca.median().ok_or_else(|| missing("median"))?;
    let std_dev = ca.std(0).ok_or_else(|| missing("standard deviation"))?;

    Ok(Some(NumericSummary {
        min,
        max,
        mean,
        median,
        mode: mode(values).ok_or_else(|| missing("mode"))?,
        std_dev,
        outliers: if min == max {
            // zero variance
            Vec::new()
        } else {
            outliers(values, mean, std_dev)
        },
    }))
}

/// Most frequent value, the first encountered among equally frequent ones.
pub(crate) fn mode(values: &[f64]) -> Option<f64> {
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (position, value) in values.iter().enumerate() {
        counts.entry(bits(*value)).or_insert((position, 0)).1 += 1;
    }
    counts
        .into_values()
        .max_by(|(pos_a, count_a), (pos_b, count_b)| {
            count_a.cmp(count_b).then(pos_b.cmp(pos_a))
        })
        .map(|(position, _)| values[position])
}

/// Distinct values with `|v - mean| > OUTLIER_Z_SCORE * std_dev`, in order of
/// first appearance.
pub(crate) fn outliers(values: &[f64], mean: f64, std_dev: f64) -> Vec<f64> {
    let threshold = OUTLIER_Z_SCORE * std_dev;
    let mut seen = HashSet::new();
    values
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() > threshold)
        .filter(|v| seen.insert(bits(*v)))
        .collect()
}

/// Number of distinct values, treating `-0.0` and `0.0` as equal.
pub(crate) fn distinct_count(values: &[f64]) -> usize {
    values.iter().map(|v| bits(*v)).collect::<HashSet<_>>().len()
}

fn bits(value: f64) -> u64 {
    // +0.0 folds -0.0 into 0.0
    (value + 0.0).to_bits()
}
