use anyhow::{bail, Context, Result};
use prettytable::{format, Cell, Row, Table};
use sheetstack::profile::stats::{ColumnKind, ColumnProfile};
use sheetstack::profile::{self, ProfileOptions, ProfileReport};
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

/// Histogram bars never grow past this many characters.
const BAR_WIDTH: usize = 40;
/// Word rows shown per text column in the terminal rendering.
const WORDS_SHOWN: usize = 15;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr) // keep stdout for the report
        .init();

    let mut options = ProfileOptions::default();
    let mut as_json = false;
    let mut input: Option<String> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--minimal" => options.minimal = true,
            "--no-wordcloud" => options.word_cloud = false,
            "--correlations" => options.correlations = true,
            "--json" => as_json = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            _ if arg.starts_with('-') => bail!("unknown flag {arg}; try --help"),
            _ => match input {
                None => input = Some(arg),
                Some(_) => bail!("exactly one input file expected, got a second: {arg}"),
            },
        }
    }
    let input = match input {
        Some(input) => input,
        None => {
            print_usage();
            bail!("no input file given");
        }
    };

    let path = Path::new(&input);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| input.clone());

    // gate on metadata so an oversize file is never even read
    let metadata =
        fs::metadata(path).with_context(|| format!("reading metadata for {input}"))?;
    profile::check_upload(&name, metadata.len())?;

    let bytes = fs::read(path).with_context(|| format!("reading {input}"))?;
    let report = profile::profile_bytes(&name, &bytes, &options)?;

    if as_json {
        let rendered =
            serde_json::to_string_pretty(&report).context("serializing report to json")?;
        println!("{rendered}");
    } else {
        render(&report);
    }

    tracing::info!(file = %name, "profile finished");
    Ok(())
}

fn print_usage() {
    println!("usage: profile_report [--minimal] [--no-wordcloud] [--correlations] [--json] FILE");
    println!();
    println!("Profiles a single .csv or .xlsx file (up to 10 MiB):");
    println!("  --minimal        skip histograms, word counts and the duplicate scan");
    println!("  --no-wordcloud   skip word counts only");
    println!("  --correlations   add pairwise Pearson correlations");
    println!("  --json           emit the full report as JSON");
}

fn render(report: &ProfileReport) {
    println!("\n--- Profile: {} ---", report.source);

    let mut overview = Table::new();
    overview.set_format(*format::consts::FORMAT_BOX_CHARS);
    overview.add_row(Row::new(vec![
        Cell::new("Metric").style_spec("bFg"),
        Cell::new("Value").style_spec("bFg"),
    ]));
    overview.add_row(metric_row("Rows", &report.overview.rows.to_string()));
    overview.add_row(metric_row("Columns", &report.overview.columns.to_string()));
    overview.add_row(metric_row(
        "Missing cells",
        &format!(
            "{} ({:.1}%)",
            report.overview.missing_cells, report.overview.missing_pct
        ),
    ));
    if let Some(duplicates) = report.overview.duplicate_rows {
        overview.add_row(metric_row("Duplicate rows", &duplicates.to_string()));
    }
    overview.add_row(metric_row(
        "Generated",
        &report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ));
    overview.printstd();

    println!("\n--- Columns ---");
    let mut columns = Table::new();
    columns.set_format(*format::consts::FORMAT_BOX_CHARS);
    columns.add_row(Row::new(vec![
        Cell::new("Column").style_spec("bFg"),
        Cell::new("Kind").style_spec("bFg"),
        Cell::new("Count").style_spec("bFg"),
        Cell::new("Missing").style_spec("bFg"),
        Cell::new("Distinct").style_spec("bFg"),
        Cell::new("Top value").style_spec("bFg"),
        Cell::new("Details").style_spec("bFg"),
    ]));
    for column in &report.columns {
        let top = column
            .top_values
            .as_ref()
            .and_then(|t| t.first())
            .map(|t| format!("{} ({})", t.value, t.count))
            .unwrap_or_default();
        columns.add_row(Row::new(vec![
            Cell::new(&column.name),
            Cell::new(kind_str(column.kind)),
            Cell::new(&column.count.to_string()).style_spec("r"),
            Cell::new(&column.missing.to_string()).style_spec("r"),
            Cell::new(&column.distinct.to_string()).style_spec("r"),
            Cell::new(&top),
            Cell::new(&details(column)),
        ]));
    }
    columns.printstd();

    for column in &report.columns {
        let bins = match &column.histogram {
            Some(bins) if !bins.is_empty() => bins,
            _ => continue,
        };
        println!("\n--- Histogram: {} ---", column.name);
        let tallest = bins.iter().map(|b| b.count).max().unwrap_or(1).max(1);
        for bin in bins {
            let width = bin.count * BAR_WIDTH / tallest;
            println!(
                "{:>12} .. {:<12} {:>6}  {}",
                short(bin.lower),
                short(bin.upper),
                bin.count,
                "#".repeat(width)
            );
        }
    }

    for column in &report.columns {
        let words = match &column.words {
            Some(words) if !words.is_empty() => words,
            _ => continue,
        };
        println!("\n--- Words: {} ---", column.name);
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.add_row(Row::new(vec![
            Cell::new("Word").style_spec("bFg"),
            Cell::new("Count").style_spec("bFg"),
        ]));
        for word in words.iter().take(WORDS_SHOWN) {
            table.add_row(Row::new(vec![
                Cell::new(&word.value),
                Cell::new(&word.count.to_string()).style_spec("r"),
            ]));
        }
        table.printstd();
    }

    if let Some(correlations) = &report.correlations {
        println!("\n--- Correlations ---");
        if correlations.is_empty() {
            println!("(no numeric column pairs)");
        } else {
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BOX_CHARS);
            table.add_row(Row::new(vec![
                Cell::new("Left").style_spec("bFg"),
                Cell::new("Right").style_spec("bFg"),
                Cell::new("Pearson").style_spec("bFg"),
            ]));
            for entry in correlations {
                table.add_row(Row::new(vec![
                    Cell::new(&entry.left),
                    Cell::new(&entry.right),
                    Cell::new(&format!("{:+.4}", entry.pearson)).style_spec("r"),
                ]));
            }
            table.printstd();
        }
    }
}

fn metric_row(name: &str, value: &str) -> Row {
    Row::new(vec![Cell::new(name), Cell::new(value).style_spec("r")])
}

fn kind_str(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Numeric => "numeric",
        ColumnKind::Text => "text",
        ColumnKind::Empty => "empty",
    }
}

fn details(column: &ColumnProfile) -> String {
    if let Some(n) = &column.numeric {
        format!(
            "min {}, median {}, max {}, mean {:.3}, std {:.3}",
            short(n.min),
            short(n.median),
            short(n.max),
            n.mean,
            n.std_dev
        )
    } else if let Some(t) = &column.text {
        format!("len {}..{}, avg {:.1}", t.min_len, t.max_len, t.mean_len)
    } else {
        String::new()
    }
}

/// Compact float rendering for table cells: whole numbers lose the fraction.
fn short(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.4}")
    }
}
