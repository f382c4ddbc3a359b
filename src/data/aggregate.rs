//! Grouped statistics over a row sequence.
//!
//! Everything here is a pure function of its inputs. Results are rebuilt on
//! every call; nothing is cached between recomputes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::model::{Row, RowId, Schema, Value};

/// Multiplier applied to the IQR to place the outlier fences.
pub const FENCE_FACTOR: f64 = 1.5;

/// Five-number summary plus fences and outliers for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Unclamped `q1 - 1.5 * IQR`, used only to classify outliers.
    pub lower_fence: f64,
    /// Unclamped `q3 + 1.5 * IQR`, used only to classify outliers.
    pub upper_fence: f64,
    /// Smallest actual value at or above the lower fence.
    pub lower_whisker: f64,
    /// Largest actual value at or below the upper fence.
    pub upper_whisker: f64,
    /// Values strictly outside the fences, ascending.
    pub outliers: Vec<f64>,
}

/// Derived statistic for one group of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub key: Value,
    /// Rows in the group, in input order.
    pub members: Vec<RowId>,
    pub count: usize,
    /// Mean of the value column; `None` when the group has no numeric values.
    pub mean: Option<f64>,
    pub spread: Option<BoxStats>,
}

impl AggregateRecord {
    /// The number a bar chart plots: the mean when there is one, else the count.
    pub fn measure(&self) -> f64 {
        self.mean.unwrap_or(self.count as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Order in which group keys first appear.
    #[default]
    FirstSeen,
    ValueDescending,
    ValueAscending,
    KeyAscending,
}

// ---------------------------------------------------------------------------
// Quantiles
// ---------------------------------------------------------------------------

/// Linear-interpolation quantile of an ascending slice.
///
/// `index = q * (n - 1)`; the result interpolates between the two sorted
/// values bracketing that index.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Box-plot statistics of `values`, ignoring non-finite entries.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25)?;
    let median = quantile(&sorted, 0.5)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower_fence = q1 - FENCE_FACTOR * iqr;
    let upper_fence = q3 + FENCE_FACTOR * iqr;

    // The quartiles always lie inside the fences, so both searches hit.
    let lower_whisker = sorted
        .iter()
        .copied()
        .find(|v| *v >= lower_fence)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= upper_fence)
        .unwrap_or(q3);

    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < lower_fence || *v > upper_fence)
        .collect();

    Some(BoxStats {
        q1,
        median,
        q3,
        iqr,
        lower_fence,
        upper_fence,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partition `rows` by the value of column `group_idx`, in first-seen order.
fn partition<'a>(rows: &[&'a Row], group_idx: usize) -> Vec<(Value, Vec<&'a Row>)> {
    let mut slots: HashMap<Value, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<&'a Row>)> = Vec::new();
    for &row in rows {
        let key = row.at(group_idx).cloned().unwrap_or(Value::Missing);
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }
    groups
}

fn numeric_values(rows: &[&Row], value_idx: usize) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.at(value_idx).and_then(|v| v.as_f64()))
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn record(key: Value, rows: &[&Row]) -> AggregateRecord {
    AggregateRecord {
        key,
        members: rows.iter().map(|r| r.id).collect(),
        count: rows.len(),
        mean: None,
        spread: None,
    }
}

/// Row count per distinct value of `group_key`.
pub fn group_count(schema: &Schema, rows: &[&Row], group_key: &str) -> Vec<AggregateRecord> {
    let Some(group_idx) = schema.index_of(group_key) else {
        return Vec::new();
    };
    partition(rows, group_idx)
        .into_iter()
        .map(|(key, members)| record(key, &members))
        .collect()
}

/// Mean of `value_key` per distinct value of `group_key`.
///
/// Missing and non-numeric values are left out of the mean; a group with no
/// numeric values still gets a record, with `mean == None`.
pub fn group_mean(
    schema: &Schema,
    rows: &[&Row],
    group_key: &str,
    value_key: &str,
) -> Vec<AggregateRecord> {
    let (Some(group_idx), Some(value_idx)) = (schema.index_of(group_key), schema.index_of(value_key))
    else {
        return Vec::new();
    };
    partition(rows, group_idx)
        .into_iter()
        .map(|(key, members)| {
            let values = numeric_values(&members, value_idx);
            AggregateRecord {
                mean: mean(&values),
                ..record(key, &members)
            }
        })
        .collect()
}

/// Box-plot statistics of `value_key` per distinct value of `group_key`.
///
/// Groups without a single numeric value are omitted.
pub fn box_plot_stats(
    schema: &Schema,
    rows: &[&Row],
    group_key: &str,
    value_key: &str,
) -> Vec<AggregateRecord> {
    let (Some(group_idx), Some(value_idx)) = (schema.index_of(group_key), schema.index_of(value_key))
    else {
        return Vec::new();
    };
    partition(rows, group_idx)
        .into_iter()
        .filter_map(|(key, members)| {
            let values = numeric_values(&members, value_idx);
            let spread = box_stats(&values)?;
            Some(AggregateRecord {
                mean: mean(&values),
                spread: Some(spread),
                ..record(key, &members)
            })
        })
        .collect()
}

/// Reorder records for display. `FirstSeen` leaves them untouched.
pub fn sort_records(records: &mut [AggregateRecord], order: SortOrder) {
    match order {
        SortOrder::FirstSeen => {}
        SortOrder::ValueDescending => {
            records.sort_by(|a, b| b.measure().total_cmp(&a.measure()))
        }
        SortOrder::ValueAscending => {
            records.sort_by(|a, b| a.measure().total_cmp(&b.measure()))
        }
        SortOrder::KeyAscending => records.sort_by(|a, b| a.key.cmp(&b.key)),
    }
}
