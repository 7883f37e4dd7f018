// src/export.rs
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

use crate::combine::{SourceSummary, SOURCE_COLUMN};
use crate::table::{parse_number, Table};

pub const SHEET_COMBINED: &str = "Combined_Data";
pub const SHEET_SUMMARY: &str = "File_Summary";
pub const DEFAULT_OUTPUT_NAME: &str = "combined_output.xlsx";
/// Content type of the artifact this module produces.
pub const XLSX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel's hard per-sheet row limit, header included.
const EXCEL_MAX_ROWS: usize = 1_048_576;
/// Excel's sheet name length limit.
const SHEET_NAME_MAX: usize = 31;
/// Characters Excel refuses inside sheet names.
const SHEET_NAME_ILLEGAL: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Assemble the multi-sheet artifact in memory: the stacked data first, the
/// per-source summary second, then one sheet per input file in upload order.
#[tracing::instrument(level = "info", skip_all, fields(files = tables.len()))]
pub fn build_workbook(
    tables: &[(&str, &Table)],
    combined: &Table,
    summary: &[SourceSummary],
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut used_names: HashSet<String> = HashSet::new();
    used_names.insert(SHEET_COMBINED.to_lowercase());
    used_names.insert(SHEET_SUMMARY.to_lowercase());

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_COMBINED)?;
    write_table(sheet, combined, &header_format)
        .with_context(|| format!("writing sheet {SHEET_COMBINED}"))?;

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_SUMMARY)?;
    write_summary(sheet, summary, &header_format).context("writing summary sheet")?;

    for (name, table) in tables {
        let title = unique_sheet_name(&mut used_names, name);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&title)?;
        write_table(sheet, table, &header_format)
            .with_context(|| format!("writing sheet {title} for {name}"))?;
    }

    let bytes = workbook.save_to_buffer().context("serializing workbook")?;
    info!(
        sheets = tables.len() + 2,
        bytes = bytes.len(),
        "workbook assembled"
    );
    Ok(bytes)
}

fn write_table(sheet: &mut Worksheet, table: &Table, header_format: &Format) -> Result<()> {
    if table.height() + 1 > EXCEL_MAX_ROWS {
        bail!(
            "table has {} rows; a sheet holds at most {} plus the header",
            table.height(),
            EXCEL_MAX_ROWS - 1
        );
    }

    for (c, name) in table.columns().iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, name.as_str(), header_format)?;
    }

    let numeric = table.numeric_columns();
    for (r, row) in table.rows().iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let value = match cell {
                Some(value) => value,
                None => continue, // missing cells stay blank
            };
            if numeric[c] {
                match parse_number(value) {
                    Some(number) => sheet.write_number(excel_row, c as u16, number)?,
                    None => sheet.write_string(excel_row, c as u16, value.as_str())?,
                };
            } else {
                sheet.write_string(excel_row, c as u16, value.as_str())?;
            }
        }
    }
    Ok(())
}

fn write_summary(
    sheet: &mut Worksheet,
    summary: &[SourceSummary],
    header_format: &Format,
) -> Result<()> {
    sheet.write_string_with_format(0, 0, SOURCE_COLUMN, header_format)?;
    sheet.write_string_with_format(0, 1, "Row_Count", header_format)?;
    for (i, entry) in summary.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, entry.source_file.as_str())?;
        sheet.write_number(row, 1, entry.row_count as f64)?;
    }
    Ok(())
}

/// Replace characters Excel rejects, trim, and cap the length.
fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if SHEET_NAME_ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "Sheet".to_string();
    }
    truncate_chars(cleaned, SHEET_NAME_MAX)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Sanitized sheet title with `_2`, `_3`… counters on collision, fitted
/// inside the length cap. Excel compares sheet names case-insensitively, so
/// reservations do too.
fn unique_sheet_name(used: &mut HashSet<String>, raw: &str) -> String {
    let base = sanitize_sheet_name(raw);
    if used.insert(base.to_lowercase()) {
        return base;
    }
    let mut counter = 2_usize;
    loop {
        let suffix = format!("_{counter}");
        let stem = truncate_chars(&base, SHEET_NAME_MAX.saturating_sub(suffix.chars().count()));
        let candidate = format!("{stem}{suffix}");
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Resolve the artifact file name: default when absent or blank, and
/// guarantee the `.xlsx` suffix, checked case-insensitively.
pub fn resolve_output_name(requested: Option<&str>) -> String {
    let trimmed = requested.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return DEFAULT_OUTPUT_NAME.to_string();
    }
    if trimmed.to_ascii_lowercase().ends_with(".xlsx") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.xlsx")
    }
}

/// Write the artifact through a sibling `.tmp` file renamed into place, so an
/// interrupted run never leaves a half-written workbook under the final name.
pub fn write_workbook(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = match path.file_name() {
        Some(name) => path.with_file_name(format!("{}.tmp", name.to_string_lossy())),
        None => bail!("invalid output path `{}`", path.display()),
    };
    fs::write(&tmp_path, bytes)
        .with_context(|| format!("could not write temporary file `{}`", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to rename `{}` to `{}`",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::combine_files;
    use crate::ingest::SourceFile;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn reopen(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        Xlsx::new(Cursor::new(bytes)).expect("reopen workbook")
    }

    fn outcome_workbook(files: Vec<SourceFile>) -> Vec<u8> {
        let outcome = combine_files(&files);
        let combined = outcome.combined.as_ref().expect("combined table");
        build_workbook(&outcome.tables(), combined, &outcome.summary).expect("workbook")
    }

    #[test]
    fn workbook_has_combined_summary_and_per_file_sheets() {
        let bytes = outcome_workbook(vec![
            SourceFile::new("a.csv", b"x,y\n1,2\n3,4\n5,6\n".to_vec()),
            SourceFile::new("b.csv", b"x,y\n7,8\n9,10\n".to_vec()),
        ]);
        let workbook = reopen(bytes);
        let names = workbook.sheet_names().to_vec();
        assert_eq!(
            names,
            vec![
                SHEET_COMBINED.to_string(),
                SHEET_SUMMARY.to_string(),
                "a.csv".to_string(),
                "b.csv".to_string()
            ]
        );
    }

    #[test]
    fn combined_sheet_holds_every_row_and_numbers_stay_numeric() {
        let bytes = outcome_workbook(vec![
            SourceFile::new("a.csv", b"x,label\n1,one\n2,two\n".to_vec()),
            SourceFile::new("b.csv", b"x,label\n3,three\n".to_vec()),
        ]);
        let mut workbook = reopen(bytes);
        let range = workbook
            .worksheet_range_at(0)
            .expect("combined sheet")
            .expect("readable range");

        // header plus three data rows
        assert_eq!(range.rows().count(), 4);
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("x".into())));
        // the all-numeric column round-trips as numbers
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
        assert_eq!(range.get_value((3, 0)), Some(&Data::Float(3.0)));
        assert_eq!(
            range.get_value((1, 1)),
            Some(&Data::String("one".into()))
        );
    }

    #[test]
    fn summary_sheet_lists_counts_as_numbers() {
        let bytes = outcome_workbook(vec![
            SourceFile::new("a.csv", b"x\n1\n2\n3\n".to_vec()),
            SourceFile::new("b.csv", b"x\n4\n5\n".to_vec()),
        ]);
        let mut workbook = reopen(bytes);
        let range = workbook
            .worksheet_range_at(1)
            .expect("summary sheet")
            .expect("readable range");

        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String(SOURCE_COLUMN.into()))
        );
        assert_eq!(
            range.get_value((0, 1)),
            Some(&Data::String("Row_Count".into()))
        );
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("a.csv".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(3.0)));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Float(2.0)));
    }

    #[test]
    fn long_sheet_names_truncate_and_collisions_get_counters() {
        let long_a = format!("{}_one.csv", "x".repeat(40));
        let long_b = format!("{}_two.csv", "x".repeat(40));
        let bytes = outcome_workbook(vec![
            SourceFile::new(long_a, b"a\n1\n".to_vec()),
            SourceFile::new(long_b, b"a\n1\n".to_vec()),
        ]);
        let workbook = reopen(bytes);
        let names = workbook.sheet_names().to_vec();

        assert_eq!(names.len(), 4);
        let first = &names[2];
        let second = &names[3];
        assert_eq!(first.chars().count(), 31);
        assert_eq!(first.as_str(), "x".repeat(31));
        assert!(second.ends_with("_2"), "got: {second}");
        assert_eq!(second.chars().count(), 31);
    }

    #[test]
    fn sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize_sheet_name("a[b]c:d*e?f/g\\h"), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_sheet_name("   "), "Sheet");
        assert_eq!(sanitize_sheet_name("plain.csv"), "plain.csv");
    }

    #[test]
    fn write_workbook_moves_into_place_and_cleans_up() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.xlsx");
        let bytes = outcome_workbook(vec![SourceFile::new("a.csv", b"x\n1\n".to_vec())]);
        write_workbook(&path, &bytes)?;

        assert_eq!(fs::read(&path)?, bytes);
        let tmp_leftovers = fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().map(|e| e == "tmp").unwrap_or(false))
            .count();
        assert_eq!(tmp_leftovers, 0);
        Ok(())
    }

    #[test]
    fn output_name_resolution() {
        assert_eq!(resolve_output_name(None), DEFAULT_OUTPUT_NAME);
        assert_eq!(resolve_output_name(Some("")), DEFAULT_OUTPUT_NAME);
        assert_eq!(resolve_output_name(Some("  ")), DEFAULT_OUTPUT_NAME);
        assert_eq!(resolve_output_name(Some("report")), "report.xlsx");
        assert_eq!(resolve_output_name(Some("report.xlsx")), "report.xlsx");
        assert_eq!(resolve_output_name(Some("report.XLSX")), "report.XLSX");
        assert_eq!(
            resolve_output_name(Some(" quarterly totals ")),
            "quarterly totals.xlsx"
        );
    }
}
