// src/ingest/mod.rs
pub mod csv;
pub mod encoding;
pub mod excel;
pub mod html;

use std::path::Path;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::table::{header, ParsedTable, Table};

/// One uploaded file, fully buffered in memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        SourceFile {
            name: name.into(),
            bytes,
        }
    }
}

/// Supported upload formats, keyed off the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xls,
    Xlsx,
}

impl FileKind {
    /// Extension match, ASCII case-insensitive.
    pub fn from_name(name: &str) -> Option<FileKind> {
        let ext = Path::new(name).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(FileKind::Csv),
            "xls" => Some(FileKind::Xls),
            "xlsx" => Some(FileKind::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Xls => "xls",
            FileKind::Xlsx => "xlsx",
        }
    }
}

/// Parse one upload into a normalized table: detect the format, run that
/// format's parser, then repair headers.
///
/// Legacy `.xls` uploads run through an ordered list of attempts, because the
/// extension is routinely a lie: a real BIFF read first, then HTML table
/// extraction for exports saved with a spreadsheet extension. First success
/// wins; a file that defeats every attempt gets an error naming each failure.
#[tracing::instrument(level = "debug", skip(file), fields(file = %file.name))]
pub fn read_table(file: &SourceFile) -> Result<Table> {
    let kind = match FileKind::from_name(&file.name) {
        Some(kind) => kind,
        None => bail!(
            "{}: unsupported file type (expected .csv, .xls or .xlsx)",
            file.name
        ),
    };

    let parsed = match kind {
        FileKind::Csv => csv::parse_csv(&file.name, &file.bytes)?,
        FileKind::Xlsx => excel::parse_xlsx(&file.name, &file.bytes)?,
        FileKind::Xls => parse_legacy_spreadsheet(file)?,
    };

    Ok(header::repair(parsed))
}

fn parse_legacy_spreadsheet(file: &SourceFile) -> Result<ParsedTable> {
    let attempts: [(&str, fn(&str, &[u8]) -> Result<ParsedTable>); 2] = [
        ("xls workbook", excel::parse_xls),
        ("html table", html::parse_html_table),
    ];

    let mut failures: Vec<String> = Vec::new();
    for (parser, attempt) in attempts {
        match attempt(&file.name, &file.bytes) {
            Ok(parsed) => {
                debug!(file = %file.name, parser, "legacy spreadsheet parsed");
                return Ok(parsed);
            }
            Err(err) => {
                warn!(file = %file.name, parser, error = %format!("{err:#}"), "parse attempt failed");
                failures.push(format!("{parser}: {err:#}"));
            }
        }
    }

    bail!(
        "{}: every parser failed ({})",
        file.name,
        failures.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        // Initialize tracing for tests, if not already done globally
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,sheetstack::ingest=debug")),
            )
            .with_test_writer() // Redirect logs to the test output
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber); // Use `let _ =` to ignore errors if already set
    }

    #[test]
    fn file_kind_from_name() {
        assert_eq!(FileKind::from_name("a.csv"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_name("b.XLSX"), Some(FileKind::Xlsx));
        assert_eq!(FileKind::from_name("dir/c.Xls"), Some(FileKind::Xls));
        assert_eq!(FileKind::from_name("notes.txt"), None);
        assert_eq!(FileKind::from_name("no_extension"), None);
    }

    #[test]
    fn csv_reads_end_to_end() -> Result<()> {
        let file = SourceFile::new("fruit.csv", b"name,qty\napple,3\npear,1\n".to_vec());
        let table = read_table(&file)?;
        assert_eq!(table.columns(), &["name".to_string(), "qty".to_string()]);
        assert_eq!(table.height(), 2);
        Ok(())
    }

    #[test]
    fn unsupported_extension_names_the_file() {
        let file = SourceFile::new("notes.txt", b"hello".to_vec());
        let err = read_table(&file).unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn mislabeled_html_falls_back_to_table_extraction() -> Result<()> {
        init_test_logging();
        let html = br#"<html><table>
            <tr><th>region</th><th>total</th></tr>
            <tr><td>north</td><td>10</td></tr>
            <tr><td>south</td><td>12</td></tr>
        </table></html>"#;
        let file = SourceFile::new("export.xls", html.to_vec());
        let table = read_table(&file)?;
        assert_eq!(table.columns(), &["region".to_string(), "total".to_string()]);
        assert_eq!(table.height(), 2);
        Ok(())
    }

    #[test]
    fn hopeless_xls_reports_every_attempt() {
        init_test_logging();
        let file = SourceFile::new("junk.xls", b"not a workbook, not html".to_vec());
        let err = read_table(&file).unwrap_err().to_string();
        assert!(err.contains("xls workbook"), "got: {err}");
        assert!(err.contains("html table"), "got: {err}");
    }

    #[test]
    fn html_without_header_promotes_first_data_row() -> Result<()> {
        // td-only tables have positional labels; repair promotes row one
        let html = br#"<table>
            <tr><td>name</td><td>qty</td></tr>
            <tr><td>apple</td><td>3</td></tr>
            <tr><td>pear</td><td>1</td></tr>
        </table>"#;
        let file = SourceFile::new("export.xls", html.to_vec());
        let table = read_table(&file)?;
        assert_eq!(table.columns(), &["name".to_string(), "qty".to_string()]);
        assert_eq!(table.height(), 2);
        Ok(())
    }
}
