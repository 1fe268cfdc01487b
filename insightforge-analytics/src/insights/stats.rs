//! Aggregations over the activity column.

use crate::data::{ACTIVITY_COLUMN, Dataset, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Activity rate of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRate {
    pub key: String,
    /// Mean activity in percent.
    pub rate: f64,
    pub count: usize,
}

/// A group whose rate sits outside the band around the cross-group mean.
#[derive(Debug, Clone, PartialEq)]
pub enum Outlier {
    High(GroupRate),
    Low(GroupRate),
}

/// Numeric activity per row; `None` for cells that are not numeric.
///
/// Returns `None` when the column is absent or carries no numeric cell.
pub fn activity_values(dataset: &Dataset) -> Option<Vec<Option<f64>>> {
    let values: Vec<Option<f64>> = dataset
        .column(ACTIVITY_COLUMN)?
        .map(Value::as_f64)
        .collect();
    values.iter().any(Option::is_some).then_some(values)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Overall activity rate in percent.
pub fn overall_rate(activity: &[Option<f64>]) -> Option<f64> {
    let numeric: Vec<f64> = activity.iter().flatten().copied().collect();
    mean(&numeric).map(|m| m * 100.0)
}

/// Sum of activity and of its complement.
pub fn volumes(activity: &[Option<f64>]) -> (f64, f64) {
    activity
        .iter()
        .flatten()
        .fold((0.0, 0.0), |(active, inactive), v| (active + v, inactive + (1.0 - v)))
}

/// Number of distinct values in a column, if present.
pub fn unique_count(dataset: &Dataset, column: &str) -> Option<usize> {
    let distinct: BTreeSet<String> = dataset.column(column)?.map(Value::to_string).collect();
    Some(distinct.len())
}

/// Per-group activity rate, sorted by rate descending.
///
/// Rows whose activity is not numeric are ignored. Ties keep key order.
pub fn group_rates(
    dataset: &Dataset,
    group_column: &str,
    activity: &[Option<f64>],
) -> Option<Vec<GroupRate>> {
    let keys = dataset.column(group_column)?;
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (key, value) in keys.zip(activity) {
        if let Some(v) = value {
            let entry = groups.entry(key.to_string()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }

    let mut rates: Vec<GroupRate> = groups
        .into_iter()
        .map(|(key, (sum, count))| GroupRate {
            key,
            rate: sum / count as f64 * 100.0,
            count,
        })
        .collect();
    rates.sort_by(|a, b| b.rate.total_cmp(&a.rate));
    Some(rates)
}

/// Groups strictly beyond `mean ± multiplier × std` of the group rates.
///
/// Fewer than two groups, or identical rates, yield no outliers.
pub fn outliers(rates: &[GroupRate], multiplier: f64) -> Vec<Outlier> {
    let values: Vec<f64> = rates.iter().map(|g| g.rate).collect();
    let (Some(m), Some(std)) = (mean(&values), sample_std(&values)) else {
        return Vec::new();
    };
    if std == 0.0 {
        return Vec::new();
    }
    let high = m + multiplier * std;
    let low = m - multiplier * std;

    let mut found: Vec<Outlier> = rates
        .iter()
        .filter(|g| g.rate > high)
        .cloned()
        .map(Outlier::High)
        .collect();
    found.extend(rates.iter().filter(|g| g.rate < low).cloned().map(Outlier::Low));
    found
}
