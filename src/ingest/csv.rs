// src/ingest/csv.rs
use anyhow::{bail, Result};
use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::table::{Cell, Label, ParsedTable};

use super::encoding::decode_text;

/// Delimiters tried during detection. Order is the tie-break preference.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Lines sampled when scoring candidate delimiters.
const SNIFF_LINES: usize = 10;

/// Pick the most plausible delimiter by scoring each candidate over the
/// leading lines: a high, consistent per-line count beats a sporadic one.
/// Falls back to a comma when nothing scores.
pub fn detect_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    if lines.is_empty() {
        return b',';
    }

    let mut best = (b',', 0.0_f64);
    for &candidate in &DELIMITER_CANDIDATES {
        let counts: Vec<f64> = lines
            .iter()
            .map(|line| line.bytes().filter(|&b| b == candidate).count() as f64)
            .collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        if mean == 0.0 {
            continue;
        }
        let variance =
            counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        let score = mean / (1.0 + variance.sqrt());
        if score > best.1 {
            best = (candidate, score);
        }
    }
    best.0
}

/// Parse CSV bytes into a labelled table.
///
/// The first record supplies the header (the reader already drops fully blank
/// lines). Data records shorter than the header are padded with missing
/// cells; records wider than the header, and records the reader cannot parse,
/// are skipped and counted, in line with tolerant bad-line handling. Empty
/// fields become missing cells.
pub fn parse_csv(name: &str, raw: &[u8]) -> Result<ParsedTable> {
    let (text, encoding) = decode_text(raw);
    let delimiter = detect_delimiter(&text);
    debug!(
        file = name,
        encoding = encoding.name(),
        delimiter = %(delimiter as char),
        "decoded csv"
    );

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // header and data widths are reconciled below
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut labels: Option<Vec<Label>> = None;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut skipped = 0_usize;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!(file = name, record = idx, %err, "skipping unreadable record");
                skipped += 1;
                continue;
            }
        };

        let width = match labels.as_ref() {
            Some(header) => header.len(),
            None => {
                // first record is the header; the reader already drops
                // fully blank lines ahead of it
                labels = Some(
                    record
                        .iter()
                        .map(|field| Label::Name(field.to_string()))
                        .collect(),
                );
                continue;
            }
        };

        if record.len() > width {
            warn!(
                file = name,
                record = idx,
                fields = record.len(),
                expected = width,
                "skipping over-wide record"
            );
            skipped += 1;
            continue;
        }
        let mut row: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        row.resize(width, None);
        rows.push(row);
    }

    if skipped > 0 {
        warn!(file = name, skipped, "csv records were skipped");
    }

    match labels {
        Some(labels) => Ok(ParsedTable { labels, rows }),
        None => bail!("{name}: no parsable rows found"),
    }
}
