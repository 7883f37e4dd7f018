// src/ingest/html.rs
use anyhow::{anyhow, bail, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::table::{Cell, Label, ParsedTable};

use super::encoding::decode_text;

/// Parse the first `<table>` element in an HTML document.
///
/// This is the fallback for "spreadsheets" that are really HTML exports. A
/// `<th>` row supplies named labels; without one, labels are positional
/// indices and header repair decides what to promote later.
pub fn parse_html_table(name: &str, raw: &[u8]) -> Result<ParsedTable> {
    let (text, _) = decode_text(raw);
    let document = Html::parse_document(&text);

    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;
    let th_sel = selector("th")?;

    let table = match document.select(&table_sel).next() {
        Some(table) => table,
        None => bail!("{name}: no <table> element found"),
    };

    let mut header: Option<Vec<Label>> = None;
    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for (idx, tr) in table.select(&row_sel).enumerate() {
        let cells: Vec<Cell> = tr.select(&cell_sel).map(cell_text).collect();
        if cells.is_empty() {
            continue;
        }
        if idx == 0 && tr.select(&th_sel).next().is_some() {
            header = Some(
                cells
                    .into_iter()
                    .map(|cell| Label::Name(cell.unwrap_or_default()))
                    .collect(),
            );
            continue;
        }
        rows.push(cells);
    }

    if header.is_none() && rows.is_empty() {
        bail!("{name}: table has no rows");
    }

    // widths vary in the wild; align everything to the widest row
    let width = header
        .as_ref()
        .map(Vec::len)
        .into_iter()
        .chain(rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);

    let labels = match header {
        Some(mut labels) => {
            labels.resize(width, Label::Name(String::new()));
            labels
        }
        None => (0..width as i64).map(Label::Index).collect(),
    };

    for row in &mut rows {
        row.resize(width, None);
    }

    debug!(file = name, columns = width, rows = rows.len(), "extracted html table");
    Ok(ParsedTable { labels, rows })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector {css:?}: {err:?}"))
}

/// Concatenated, whitespace-collapsed text of one cell; empty becomes missing.
fn cell_text(cell: ElementRef) -> Cell {
    let joined = cell.text().collect::<Vec<_>>().join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn th_row_becomes_named_labels() -> Result<()> {
        let html = br#"<html><body><table>
            <tr><th>Name</th><th>Qty</th></tr>
            <tr><td>apple</td><td>3</td></tr>
            <tr><td>pear</td><td>1</td></tr>
        </table></body></html>"#;
        let parsed = parse_html_table("report.xls", html)?;
        assert_eq!(
            parsed.labels,
            vec![Label::Name("Name".into()), Label::Name("Qty".into())]
        );
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0][0], Some("apple".to_string()));
        Ok(())
    }

    #[test]
    fn td_only_table_gets_positional_labels() -> Result<()> {
        let html = br#"<table>
            <tr><td>name</td><td>qty</td></tr>
            <tr><td>apple</td><td>3</td></tr>
        </table>"#;
        let parsed = parse_html_table("report.xls", html)?;
        assert_eq!(parsed.labels, vec![Label::Index(0), Label::Index(1)]);
        // both rows stay: promotion is header repair's call, not ours
        assert_eq!(parsed.rows.len(), 2);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_padded() -> Result<()> {
        let html = br#"<table>
            <tr><th>a</th><th>b</th></tr>
            <tr><td>1</td><td>2</td><td>3</td></tr>
            <tr><td>4</td></tr>
        </table>"#;
        let parsed = parse_html_table("x.xls", html)?;
        assert_eq!(parsed.labels.len(), 3);
        assert_eq!(parsed.rows[0].len(), 3);
        assert_eq!(parsed.rows[1], vec![Some("4".into()), None, None]);
        Ok(())
    }

    #[test]
    fn nested_markup_and_blanks() -> Result<()> {
        let html = br#"<table>
            <tr><th>col</th><th>note</th></tr>
            <tr><td><b>bold</b> text</td><td>  </td></tr>
        </table>"#;
        let parsed = parse_html_table("x.xls", html)?;
        assert_eq!(parsed.rows[0][0], Some("bold text".to_string()));
        assert_eq!(parsed.rows[0][1], None);
        Ok(())
    }

    #[test]
    fn missing_table_is_an_error() {
        let html = b"<html><body><p>no tables here</p></body></html>";
        assert!(parse_html_table("x.xls", html).is_err());
    }
}
