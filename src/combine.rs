// src/combine.rs
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::ingest::{self, SourceFile};
use crate::table::{Cell, Table};

/// Name of the provenance column stamped onto every ingested table.
pub const SOURCE_COLUMN: &str = "source_file";

/// Row count per originating file, in source-name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source_file: String,
    pub row_count: usize,
}

/// Per-file result: the normalized, tagged table, or the error that stopped
/// it. Errors are carried as display strings so the outcome stays plain data.
#[derive(Debug)]
pub struct FileResult {
    pub name: String,
    pub result: Result<Table, String>,
}

/// Everything one combine pass produces.
#[derive(Debug, Default)]
pub struct CombineOutcome {
    pub files: Vec<FileResult>,
    pub combined: Option<Table>,
    pub summary: Vec<SourceSummary>,
}

impl CombineOutcome {
    /// Successfully ingested `(name, table)` pairs, upload order preserved.
    pub fn tables(&self) -> Vec<(&str, &Table)> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().ok().map(|t| (f.name.as_str(), t)))
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }
}

/// Run the full pipeline over the current uploads, in order: parse, repair
/// headers, stamp the provenance column, then stack and summarize. Every call
/// recomputes from scratch. A file that fails to parse is recorded next to
/// the others and skipped; one bad upload never aborts the batch.
#[tracing::instrument(level = "info", skip(files), fields(count = files.len()))]
pub fn combine_files(files: &[SourceFile]) -> CombineOutcome {
    let mut outcome = CombineOutcome::default();

    for file in files {
        match ingest::read_table(file) {
            Ok(mut table) => {
                table.set_column(SOURCE_COLUMN, &file.name);
                info!(
                    file = %file.name,
                    rows = table.height(),
                    columns = table.width(),
                    "ingested"
                );
                outcome.files.push(FileResult {
                    name: file.name.clone(),
                    result: Ok(table),
                });
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(file = %file.name, error = %message, "ingest failed");
                outcome.files.push(FileResult {
                    name: file.name.clone(),
                    result: Err(message),
                });
            }
        }
    }

    let combined = {
        let tables: Vec<&Table> = outcome
            .files
            .iter()
            .filter_map(|f| f.result.as_ref().ok())
            .collect();
        if tables.is_empty() {
            None
        } else {
            Some(concat_tables(&tables))
        }
    };

    if let Some(combined) = combined {
        outcome.summary = summarize(&combined);
        outcome.combined = Some(combined);
    }

    outcome
}

/// Stack tables row-wise. Columns align by name; the union keeps
/// first-appearance order, and sources missing a column contribute empty
/// cells there. Duplicate names inside one source map by first occurrence.
pub fn concat_tables(tables: &[&Table]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for table in tables {
        for column in table.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for table in tables {
        let mapping: Vec<Option<usize>> =
            columns.iter().map(|c| table.column_index(c)).collect();
        for row in table.rows() {
            rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i].clone()))
                    .collect(),
            );
        }
    }

    Table::new(columns, rows)
}

/// Count combined rows per source, ordered by source name.
pub fn summarize(combined: &Table) -> Vec<SourceSummary> {
    let idx = match combined.column_index(SOURCE_COLUMN) {
        Some(idx) => idx,
        None => return Vec::new(),
    };

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in combined.rows() {
        let source = row[idx].clone().unwrap_or_default();
        *counts.entry(source).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(source_file, row_count)| SourceSummary {
            source_file,
            row_count,
        })
        .collect()
}
