// src/ingest/excel.rs
use std::io::{Cursor, Read, Seek};

use anyhow::{bail, Context, Result};
use calamine::{Data, Range, Reader, Xls, Xlsx};
use tracing::debug;

use crate::table::{Cell, Label, ParsedTable};

/// Read the first worksheet of a modern workbook.
pub fn parse_xlsx(name: &str, raw: &[u8]) -> Result<ParsedTable> {
    let mut workbook = Xlsx::new(Cursor::new(raw.to_vec()))
        .with_context(|| format!("{name}: not a valid xlsx workbook"))?;
    let range = first_range(&mut workbook, name)?;
    range_to_table(name, range)
}

/// Read the first worksheet of a legacy BIFF workbook.
pub fn parse_xls(name: &str, raw: &[u8]) -> Result<ParsedTable> {
    let mut workbook = Xls::new(Cursor::new(raw.to_vec()))
        .with_context(|| format!("{name}: not a valid xls workbook"))?;
    let range = first_range(&mut workbook, name)?;
    range_to_table(name, range)
}

fn first_range<RS, R>(workbook: &mut R, name: &str) -> Result<Range<Data>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::error::Error + Send + Sync + 'static,
{
    match workbook.worksheet_range_at(0) {
        Some(range) => range.with_context(|| format!("{name}: failed to read first worksheet")),
        None => bail!("{name}: workbook has no worksheets"),
    }
}

fn range_to_table(name: &str, range: Range<Data>) -> Result<ParsedTable> {
    let mut rows_iter = range.rows();
    let first = match rows_iter.next() {
        Some(row) => row,
        None => bail!("{name}: first worksheet is empty"),
    };

    let labels: Vec<Label> = first.iter().map(label_from_cell).collect();
    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    debug!(
        file = name,
        columns = labels.len(),
        rows = rows.len(),
        "read worksheet range"
    );
    Ok(ParsedTable { labels, rows })
}

/// Header cells keep their type: whole-number cells become positional labels,
/// which is what later arms the promoted-header path in repair.
fn label_from_cell(cell: &Data) -> Label {
    match cell {
        Data::Int(i) => Label::Index(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Label::Index(*f as i64),
        Data::Empty => Label::Name(String::new()),
        other => Label::Name(display_string(other)),
    }
}

fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        other => Some(display_string(other)),
    }
}

fn display_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sample_workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                match value.parse::<f64>() {
                    Ok(n) => sheet.write_number(r as u32, c as u16, n).unwrap(),
                    Err(_) => sheet.write_string(r as u32, c as u16, *value).unwrap(),
                };
            }
        }
        workbook.save_to_buffer().expect("serialize workbook")
    }

    #[test]
    fn string_header_and_typed_cells() -> Result<()> {
        let bytes = sample_workbook(&[
            &["name", "qty", "price"],
            &["apple", "3", "1.5"],
            &["pear", "", "2"],
        ]);
        let parsed = parse_xlsx("t.xlsx", &bytes)?;
        assert_eq!(
            parsed.labels,
            vec![
                Label::Name("name".into()),
                Label::Name("qty".into()),
                Label::Name("price".into())
            ]
        );
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0][1], Some("3".to_string()));
        assert_eq!(parsed.rows[0][2], Some("1.5".to_string()));
        assert_eq!(parsed.rows[1][1], None); // empty cell is missing
        Ok(())
    }

    #[test]
    fn numeric_first_row_yields_positional_labels() -> Result<()> {
        let bytes = sample_workbook(&[&["1", "2", "3"], &["a", "b", "c"], &["d", "e", "f"]]);
        let parsed = parse_xlsx("t.xlsx", &bytes)?;
        assert_eq!(
            parsed.labels,
            vec![Label::Index(1), Label::Index(2), Label::Index(3)]
        );
        assert_eq!(parsed.rows.len(), 2);
        Ok(())
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(parse_xlsx("t.xlsx", b"definitely not a zip container").is_err());
        assert!(parse_xls("t.xls", b"definitely not a workbook").is_err());
    }
}
