// src/table/header.rs
use tracing::{debug, warn};

use super::{Cell, Label, ParsedTable, Table};

/// Turn raw parser output into a normalized `Table`.
///
/// Sources without a real header row come back with positional numeric
/// labels. When every label is positional, the first row that actually holds
/// data is promoted to be the header and that row plus everything above it is
/// dropped. Labels are then cleaned: stringified, trimmed, embedded line
/// breaks collapsed to single spaces.
pub fn repair(parsed: ParsedTable) -> Table {
    let ParsedTable { labels, mut rows } = parsed;

    let raw_labels: Vec<String> = if !labels.is_empty() && labels.iter().all(Label::is_index) {
        match first_populated_row(&rows) {
            Some(idx) => {
                debug!(promoted_row = idx, "promoting data row to header");
                let header_row: Vec<Cell> = rows.drain(..=idx).last().unwrap_or_default();
                header_row
                    .into_iter()
                    .map(|cell| cell.unwrap_or_default())
                    .collect()
            }
            None => {
                warn!("no populated row to promote; keeping positional labels");
                labels.iter().map(Label::to_text).collect()
            }
        }
    } else {
        labels.iter().map(Label::to_text).collect()
    };

    let columns = raw_labels.iter().map(|l| clean_label(l)).collect();
    Table::new(columns, rows)
}

fn first_populated_row(rows: &[Vec<Cell>]) -> Option<usize> {
    rows.iter()
        .position(|row| row.iter().any(|cell| cell.is_some()))
}

/// Trim and collapse line breaks so labels survive as sheet headers.
fn clean_label(raw: &str) -> String {
    raw.replace("\r\n", " ")
        .replace('\n', " ")
        .replace('\r', " ")
        .trim()
        .to_string()
}
