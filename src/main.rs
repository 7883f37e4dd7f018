use anyhow::{bail, Context, Result};
use glob::glob;
use prettytable::{format, Cell as DisplayCell, Row, Table as DisplayTable};
use sheetstack::{
    combine::{self, CombineOutcome},
    export,
    ingest::SourceFile,
    profile,
    table::Table,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Rows shown in each terminal preview.
const PREVIEW_ROWS: usize = 5;

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr) // keep stdout clean for the previews
        .init();

    // ─── 2) parse args ───────────────────────────────────────────────
    let mut output: Option<String> = None;
    let mut patterns: Vec<String> = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => match args.next() {
                Some(name) => output = Some(name),
                None => bail!("{arg} needs a file name"),
            },
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            _ => patterns.push(arg),
        }
    }
    if patterns.is_empty() {
        print_usage();
        bail!("no input files given");
    }

    // ─── 3) read inputs ──────────────────────────────────────────────
    let paths = expand_patterns(&patterns)?;
    let mut files: Vec<SourceFile> = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        match fs::read(path) {
            Ok(bytes) => {
                if bytes.len() as u64 > profile::MAX_PROFILE_BYTES {
                    warn!(file = %name, bytes = bytes.len(), "large input; combining anyway");
                }
                files.push(SourceFile::new(name, bytes));
            }
            Err(err) => {
                warn!(file = %path.display(), %err, "skipping unreadable input");
            }
        }
    }
    if files.is_empty() {
        bail!("none of the inputs could be read");
    }
    info!(files = files.len(), "combining");

    // ─── 4) combine ──────────────────────────────────────────────────
    let outcome = combine::combine_files(&files);
    report_outcome(&outcome);

    // ─── 5) export ───────────────────────────────────────────────────
    let combined = match &outcome.combined {
        Some(combined) => combined,
        None => bail!("no file could be combined"),
    };
    let bytes = export::build_workbook(&outcome.tables(), combined, &outcome.summary)?;
    let out_name = export::resolve_output_name(output.as_deref());
    export::write_workbook(Path::new(&out_name), &bytes)?;
    info!(
        path = %out_name,
        bytes = bytes.len(),
        mime = export::XLSX_MIME,
        "artifact written"
    );
    println!(
        "\nwrote {out_name} ({} sheets, {} bytes)",
        outcome.tables().len() + 2,
        bytes.len()
    );
    Ok(())
}

fn print_usage() {
    println!("usage: sheetstack [-o OUTPUT.xlsx] FILE...");
    println!();
    println!("Combines .csv/.xls/.xlsx files into one workbook:");
    println!("  Combined_Data   every row from every file, tagged with its source");
    println!("  File_Summary    row counts per file");
    println!("  plus one sheet per input file");
    println!();
    println!("Glob patterns are expanded, so `sheetstack data/*.csv` works anywhere.");
}

/// Expand glob patterns for shells that do not; plain paths pass through.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.chars().any(|c| matches!(c, '*' | '?' | '[')) {
            let mut matched = false;
            let entries =
                glob(pattern).with_context(|| format!("bad glob pattern {pattern:?}"))?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        matched = true;
                        paths.push(path);
                    }
                    Err(err) => warn!(%err, "glob entry skipped"),
                }
            }
            if !matched {
                warn!(pattern = %pattern, "glob matched nothing");
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

fn report_outcome(outcome: &CombineOutcome) {
    for file in &outcome.files {
        println!("\n--- {} ---", file.name);
        match &file.result {
            Ok(table) => {
                print_table(table, PREVIEW_ROWS);
                println!("{} rows x {} columns", table.height(), table.width());
            }
            Err(err) => println!("failed: {err}"),
        }
    }

    if let Some(combined) = &outcome.combined {
        println!("\n--- Combined ({} files) ---", outcome.tables().len());
        print_table(combined, PREVIEW_ROWS);
        println!("{} rows x {} columns", combined.height(), combined.width());

        println!("\n--- Rows per file ---");
        let mut table = DisplayTable::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.add_row(Row::new(vec![
            DisplayCell::new(combine::SOURCE_COLUMN).style_spec("bFg"),
            DisplayCell::new("Row_Count").style_spec("bFg"),
        ]));
        for entry in &outcome.summary {
            table.add_row(Row::new(vec![
                DisplayCell::new(&entry.source_file),
                DisplayCell::new(&entry.row_count.to_string()).style_spec("r"),
            ]));
        }
        table.printstd();
    }
}

/// Render the first rows of a table with box characters.
fn print_table(table: &Table, limit: usize) {
    let preview = table.head(limit);
    let mut display = DisplayTable::new();
    display.set_format(*format::consts::FORMAT_BOX_CHARS);
    display.add_row(Row::new(
        preview
            .columns()
            .iter()
            .map(|c| DisplayCell::new(c).style_spec("bFg"))
            .collect(),
    ));
    for row in preview.rows() {
        display.add_row(Row::new(
            row.iter()
                .map(|cell| DisplayCell::new(cell.as_deref().unwrap_or("")))
                .collect(),
        ));
    }
    display.printstd();
    if table.height() > limit {
        println!("… {} more rows", table.height() - limit);
    }
}
