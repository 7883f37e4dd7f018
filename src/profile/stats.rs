// src/profile/stats.rs
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::table::{parse_number, Cell, Table};

/// Bins used for numeric histograms.
pub const HISTOGRAM_BINS: usize = 10;

/// Broad shape of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// Every present value parses as a finite number.
    Numeric,
    Text,
    /// No values at all.
    Empty,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextSummary {
    pub min_len: usize,
    pub max_len: usize,
    pub mean_len: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub count: usize,
    pub missing: usize,
    pub distinct: usize,
    pub numeric: Option<NumericSummary>,
    pub text: Option<TextSummary>,
    pub histogram: Option<Vec<HistogramBin>>,
    pub top_values: Option<Vec<ValueCount>>,
    pub words: Option<Vec<ValueCount>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationEntry {
    pub left: String,
    pub right: String,
    pub pearson: f64,
}

/// Profile a single column. `minimal` drops the histogram; word counts are
/// filled in by the caller, which owns that option.
pub fn profile_column(
    name: &str,
    cells: &[&Cell],
    minimal: bool,
    top_limit: usize,
) -> ColumnProfile {
    let values: Vec<&str> = cells.iter().filter_map(|c| c.as_deref()).collect();
    let count = values.len();
    let missing = cells.len() - count;
    let distinct = values.iter().collect::<HashSet<_>>().len();

    let numbers: Vec<f64> = values.iter().filter_map(|v| parse_number(v)).collect();
    let kind = if count == 0 {
        ColumnKind::Empty
    } else if numbers.len() == count {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    };

    let numeric = match kind {
        ColumnKind::Numeric => numeric_summary(&numbers),
        _ => None,
    };
    let text = match kind {
        ColumnKind::Text => Some(text_summary(&values)),
        _ => None,
    };
    let hist = match (&numeric, minimal) {
        (Some(_), false) => Some(histogram(&numbers, HISTOGRAM_BINS)),
        _ => None,
    };
    let top = if count > 0 {
        Some(top_values(&values, top_limit))
    } else {
        None
    };

    ColumnProfile {
        name: name.to_string(),
        kind,
        count,
        missing,
        distinct,
        numeric,
        text,
        histogram: hist,
        top_values: top,
        words: None,
    }
}

/// Classic descriptive statistics over a sample: quartiles via sorted-index
/// lookup, median averaging the middle pair, population standard deviation.
pub fn numeric_summary(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    Some(NumericSummary {
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median: median_sorted(&sorted),
        q1: sorted[n / 4],
        q3: sorted[(3 * n) / 4],
        std_dev: variance.sqrt(),
    })
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

fn text_summary(values: &[&str]) -> TextSummary {
    let lengths: Vec<usize> = values.iter().map(|v| v.chars().count()).collect();
    let total: usize = lengths.iter().sum();
    TextSummary {
        min_len: lengths.iter().copied().min().unwrap_or(0),
        max_len: lengths.iter().copied().max().unwrap_or(0),
        mean_len: if lengths.is_empty() {
            0.0
        } else {
            total as f64 / lengths.len() as f64
        },
    }
}

/// Equal-width histogram over the sample range. A constant sample collapses
/// to a single bin; the maximum lands in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0_usize; bins];
    for &v in values {
        let mut idx = ((v - min) / width) as usize;
        if idx >= bins {
            idx = bins - 1;
        }
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Most frequent values, count-descending with an alphabetical tie-break.
pub fn top_values(values: &[&str], limit: usize) -> Vec<ValueCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut ranked: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ranked.truncate(limit);
    ranked
}

/// Number of rows that exactly duplicate an earlier row.
pub fn duplicate_row_count(table: &Table) -> usize {
    let mut seen: HashSet<&[Cell]> = HashSet::new();
    table
        .rows()
        .iter()
        .filter(|row| !seen.insert(row.as_slice()))
        .count()
}

/// Pearson correlation for already-aligned samples. `None` when degenerate:
/// fewer than two points or zero variance on either side.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / n_f;
    let mean_y = ys[..n].iter().sum::<f64>() / n_f;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pairwise Pearson over the numeric columns, pairing only rows where both
/// sides are present.
pub fn correlation_matrix(table: &Table) -> Vec<CorrelationEntry> {
    let numeric_flags = table.numeric_columns();
    let mut columns: Vec<(usize, Vec<Option<f64>>)> = Vec::new();
    for (idx, is_numeric) in numeric_flags.iter().enumerate() {
        if !is_numeric {
            continue;
        }
        let parsed = table
            .column(idx)
            .map(|cell| cell.as_deref().and_then(parse_number))
            .collect();
        columns.push((idx, parsed));
    }

    let mut entries = Vec::new();
    for a in 0..columns.len() {
        for b in (a + 1)..columns.len() {
            let (ia, xs_all) = &columns[a];
            let (ib, ys_all) = &columns[b];
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for (x, y) in xs_all.iter().zip(ys_all.iter()) {
                if let (Some(x), Some(y)) = (x, y) {
                    xs.push(*x);
                    ys.push(*y);
                }
            }
            if let Some(r) = pearson(&xs, &ys) {
                entries.push(CorrelationEntry {
                    left: table.columns()[*ia].clone(),
                    right: table.columns()[*ib].clone(),
                    pearson: r,
                });
            }
        }
    }
    entries
}
