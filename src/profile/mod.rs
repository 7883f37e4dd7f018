// src/profile/mod.rs
pub mod stats;
pub mod words;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::ingest::{self, FileKind, SourceFile};
use crate::table::{Cell, Table};

use stats::{ColumnKind, ColumnProfile, CorrelationEntry, ValueCount};

/// Upload cap: larger files are rejected before any parsing happens.
pub const MAX_PROFILE_BYTES: u64 = 10 * 1024 * 1024;
/// Frequent-value lists per column keep at most this many entries.
const TOP_VALUES_LIMIT: usize = 10;
/// Word-frequency lists per text column keep at most this many entries.
const TOP_WORDS_LIMIT: usize = 50;

/// Report toggles. Correlation analysis is wired up but stays off unless
/// asked for.
#[derive(Debug, Clone, Copy)]
pub struct ProfileOptions {
    /// Skip the expensive extras: histograms, word counts, duplicate scan.
    pub minimal: bool,
    /// Collect word frequencies for text columns.
    pub word_cloud: bool,
    /// Compute pairwise Pearson correlations between numeric columns.
    pub correlations: bool,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        ProfileOptions {
            minimal: false,
            word_cloud: true,
            correlations: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub missing_pct: f64,
    pub duplicate_rows: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub overview: Overview,
    pub columns: Vec<ColumnProfile>,
    pub correlations: Option<Vec<CorrelationEntry>>,
}

/// Validate extension and size before any bytes are parsed. Only `.csv` and
/// `.xlsx` uploads are profiled.
pub fn check_upload(name: &str, size: u64) -> Result<FileKind> {
    let kind = match FileKind::from_name(name) {
        Some(kind @ (FileKind::Csv | FileKind::Xlsx)) => kind,
        Some(other) => bail!(
            "{name}: .{} uploads are not profiled (allowed: .csv, .xlsx)",
            other.as_str()
        ),
        None => bail!("{name}: unsupported file type (allowed: .csv, .xlsx)"),
    };
    if size > MAX_PROFILE_BYTES {
        bail!(
            "{name}: file is {size} bytes, over the {MAX_PROFILE_BYTES} byte (10 MiB) limit"
        );
    }
    Ok(kind)
}

/// Profile one upload end to end. The gate runs first; nothing is parsed for
/// a file that fails it.
#[tracing::instrument(level = "info", skip(bytes, options), fields(file = %name, size = bytes.len()))]
pub fn profile_bytes(name: &str, bytes: &[u8], options: &ProfileOptions) -> Result<ProfileReport> {
    check_upload(name, bytes.len() as u64)?;
    let file = SourceFile::new(name, bytes.to_vec());
    let table = ingest::read_table(&file)?;
    info!(
        rows = table.height(),
        columns = table.width(),
        "parsed for profiling"
    );
    Ok(build_report(name, &table, options))
}

/// Assemble the report from an already-parsed table.
pub fn build_report(source: &str, table: &Table, options: &ProfileOptions) -> ProfileReport {
    let total_cells = table.height() * table.width();
    let missing_cells = table
        .rows()
        .iter()
        .flatten()
        .filter(|cell| cell.is_none())
        .count();
    let missing_pct = if total_cells == 0 {
        0.0
    } else {
        100.0 * missing_cells as f64 / total_cells as f64
    };

    let duplicate_rows = if options.minimal {
        None
    } else {
        Some(stats::duplicate_row_count(table))
    };

    let mut columns = Vec::with_capacity(table.width());
    for (idx, name) in table.columns().iter().enumerate() {
        let cells: Vec<&Cell> = table.column(idx).collect();
        let mut profile = stats::profile_column(name, &cells, options.minimal, TOP_VALUES_LIMIT);
        if options.word_cloud && !options.minimal && profile.kind == ColumnKind::Text {
            let values: Vec<&str> = cells.iter().filter_map(|c| c.as_deref()).collect();
            profile.words = Some(
                words::top_words(&values, TOP_WORDS_LIMIT)
                    .into_iter()
                    .map(|(value, count)| ValueCount { value, count })
                    .collect(),
            );
        }
        columns.push(profile);
    }

    let correlations = if options.correlations {
        let entries = stats::correlation_matrix(table);
        debug!(pairs = entries.len(), "computed correlations");
        Some(entries)
    } else {
        None
    };

    ProfileReport {
        source: source.to_string(),
        generated_at: Utc::now(),
        overview: Overview {
            rows: table.height(),
            columns: table.width(),
            missing_cells,
            missing_pct,
            duplicate_rows,
        },
        columns,
        correlations,
    }
}
