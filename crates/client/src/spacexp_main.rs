use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use spacexp_client::{chart, output, CatalogSource};
use spacexp_common::catalog::{CatalogQuery, CatalogRow};
use spacexp_common::config::{default_config_path, load_config, Config};
use spacexp_common::humanize::{format_age, humanize_file_size};
use spacexp_common::logging;
use spacexp_common::stats::{StatisticsReport, DEFAULT_TOP_N};
use spacexp_extract_dispatch::{search_content, IndexReport, Indexer};

#[derive(Parser)]
#[command(name = "spacexp", about = "Index file metadata and report on what uses the space")]
struct Args {
    /// Path to config file (default: $SPACEXP_CONFIG, else ./spacexp.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output raw JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
    /// Suppress color output
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

/// Catalog to read; the configured CSV file when neither is given.
#[derive(clap::Args)]
struct SourceArgs {
    /// Read the catalog from this CSV file
    #[arg(long, conflicts_with = "db")]
    csv: Option<PathBuf>,
    /// Read the catalog from this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,
}

impl SourceArgs {
    fn resolve(self, config: &Config) -> CatalogSource {
        match (self.csv, self.db) {
            (_, Some(db)) => CatalogSource::Db(db),
            (Some(csv), None) => CatalogSource::Csv(csv),
            (None, None) => CatalogSource::Csv(config.output.csv.clone()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum StatsView {
    Extensions,
    TopFiles,
    Images,
    Documents,
    Summary,
    All,
}

#[derive(Subcommand)]
enum Command {
    /// Index a directory tree and write the catalog
    Index {
        dir: PathBuf,
        /// Write the catalog to this CSV file (default: output.csv from config)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Replace the contents of this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Statistics over an indexed catalog
    Stats {
        #[arg(value_enum, default_value = "all")]
        view: StatsView,
        /// Draw the largest files as a bar chart
        #[arg(long)]
        chart: bool,
        /// Entries in each top-N list
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        limit: usize,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Find catalog entries by name, size and date
    Search {
        /// Case-insensitive substring of the file name
        #[arg(long)]
        name: Option<String>,
        /// Minimum size in bytes
        #[arg(long)]
        min_size: Option<u64>,
        /// Maximum size in bytes
        #[arg(long)]
        max_size: Option<u64>,
        /// Created on or after this day (YYYY-MM-DD)
        #[arg(long)]
        created_since: Option<String>,
        /// Modified on or after this day (YYYY-MM-DD)
        #[arg(long)]
        modified_since: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Search inside text files, DOCX and PDF under a directory
    Grep {
        dir: PathBuf,
        needle: String,
    },
    /// Show how long ago the catalog was built
    LastIndex {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Load a CSV catalog into the SQLite database
    Import {
        csv: PathBuf,
        /// Target database (default: output.database from config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print effective configuration with defaults filled in
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = load_config(args.config.as_deref())?;
    let _guard = logging::init(&config.log, "warn,spacexp=info,spacexp_extract_dispatch=info");

    match args.command {
        Command::Index { dir, csv, db } => {
            let report = run_index(&config, &dir, csv, db)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "files": report.records.len(),
                    "unsupported": report.unsupported,
                    "failed": report.failed,
                    "skipped": report.skipped,
                    "elapsed_secs": report.elapsed.as_secs_f64(),
                }))?);
            } else {
                println!(
                    "{}",
                    format!(
                        "✓  Indexed {} files in {:.2} seconds",
                        report.records.len(),
                        report.elapsed.as_secs_f64()
                    )
                    .green()
                );
                if report.unsupported > 0 {
                    println!("   {} with no metadata handler", report.unsupported);
                }
                if report.failed > 0 {
                    println!("{}", format!("✗  {} could not be read", report.failed).red());
                }
            }
        }

        Command::Stats { view, chart, limit, source } => {
            let report = source.resolve(&config).report(limit)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_stats(&report, view, chart);
            }
        }

        Command::Search { name, min_size, max_size, created_since, modified_since, source } => {
            let query = CatalogQuery { name, min_size, max_size, created_since, modified_since }
                .normalized()?;
            let rows = source.resolve(&config).search(&query)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_search(&rows);
            }
        }

        Command::Grep { dir, needle } => {
            let hits = search_content(&dir, &needle, &config.index)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                eprintln!("no matches");
            } else {
                for path in &hits {
                    println!("{}", path.display().to_string().green());
                }
                eprintln!("({} files)", hits.len());
            }
        }

        Command::LastIndex { source } => {
            let source = source.resolve(&config);
            let last = source.last_index()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "catalog": source.path().display().to_string(),
                    "last_index": last,
                }))?);
            } else {
                match last {
                    Some(ts) => println!("Indexing was performed {}", format_age(age_secs(ts))),
                    None => println!("No index yet; run `spacexp index <dir>` first."),
                }
            }
        }

        Command::Import { csv, db } => {
            let db = db.unwrap_or_else(|| config.output.database.clone());
            let source = CatalogSource::Csv(csv);
            let rows = source.rows()?;
            let conn = spacexp_store::open(&db)?;
            spacexp_store::replace_all(&conn, &rows)?;
            if let Some(ts) = source.last_index()? {
                spacexp_store::set_last_index(&conn, ts)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "imported": rows.len(),
                    "database": db.display().to_string(),
                }))?);
            } else {
                println!("{}", format!("✓  Imported {} rows into {}", rows.len(), db.display()).green());
            }
        }

        Command::Config => {
            if args.json {
                let json = serde_json::to_string_pretty(&config)
                    .context("serializing config to JSON")?;
                println!("{json}");
            } else {
                let toml = toml::to_string_pretty(&config)
                    .context("serializing config to TOML")?;
                let path = args.config.unwrap_or_else(default_config_path);
                println!("# Effective configuration (file: {})", path.display());
                println!("# Values shown include defaults for any fields not set in your file.");
                println!();
                print!("{toml}");
            }
        }
    }

    Ok(())
}

/// Index `dir`, then write the CSV (default path unless only `--db` was
/// given) and/or replace the database.
fn run_index(
    config: &Config,
    dir: &Path,
    csv: Option<PathBuf>,
    db: Option<PathBuf>,
) -> Result<IndexReport> {
    let indexer = Indexer::new(&config.index);
    let report = indexer.run(dir, |done, total| {
        if done == total || done % 100 == 0 {
            tracing::info!("processed {done}/{total} files");
        }
    })?;

    let csv = if csv.is_none() && db.is_some() {
        None
    } else {
        Some(csv.unwrap_or_else(|| config.output.csv.clone()))
    };
    if let Some(path) = csv {
        output::write_csv(&path, &report.records)?;
        tracing::info!("catalog written to {}", path.display());
    }
    if let Some(path) = db {
        let rows: Vec<CatalogRow> = report.records.iter().map(CatalogRow::from).collect();
        let conn = spacexp_store::open(&path)?;
        spacexp_store::replace_all(&conn, &rows)?;
        spacexp_store::set_last_index(&conn, chrono::Utc::now().timestamp())?;
        tracing::info!("database {} updated", path.display());
    }
    Ok(report)
}

fn age_secs(ts: i64) -> i64 {
    (chrono::Utc::now().timestamp() - ts).max(0)
}

fn print_stats(report: &StatisticsReport, view: StatsView, draw_chart: bool) {
    let show = |v: StatsView| view == StatsView::All || view == v;

    if show(StatsView::Extensions) {
        println!("{}", "Files by extension:".bold());
        for e in &report.file_statistics {
            let ext = if e.extension.is_empty() { "(none)" } else { e.extension.as_str() };
            println!("  {:12}  {:>6}", ext, e.count);
        }
        println!();
    }
    if show(StatsView::TopFiles) {
        println!("{}", "Largest files:".bold());
        if draw_chart {
            print!("{}", chart::size_chart(&report.largest_files));
        } else {
            for (i, f) in report.largest_files.iter().enumerate() {
                println!("  {:>2}. {}  {}", i + 1, f.file_name, humanize_file_size(f.file_size).cyan());
            }
        }
        println!();
    }
    if show(StatsView::Images) {
        println!("{}", "Largest images:".bold());
        if report.largest_images.is_empty() {
            println!("  none");
        }
        for (i, img) in report.largest_images.iter().enumerate() {
            println!(
                "  {:>2}. {}  {}x{}  ({} px)",
                i + 1,
                img.file_name,
                img.width,
                img.height,
                img.calculated_area
            );
        }
        println!();
    }
    if show(StatsView::Documents) {
        println!("{}", "Documents by page count:".bold());
        if report.largest_documents.is_empty() {
            println!("  none");
        }
        for (i, doc) in report.largest_documents.iter().enumerate() {
            println!("  {:>2}. {}  {} pages", i + 1, doc.file_name, doc.page_count);
        }
        println!();
    }
    if show(StatsView::Summary) {
        let s = &report.summary;
        println!("{}", "Summary:".bold());
        println!("  Files:   {}", s.total_files);
        println!("  Total:   {}", humanize_file_size(s.total_size));
        if let (Some(mean), Some(median)) = (s.average_size, s.median_size) {
            println!("  Average: {}", humanize_file_size(mean.round() as u64));
            println!("  Median:  {}", humanize_file_size(median.round() as u64));
        }
    }
}

fn print_search(rows: &[CatalogRow]) {
    if rows.is_empty() {
        eprintln!("no files match the search criteria");
        return;
    }
    for r in rows {
        println!(
            "{} - {} bytes - {} - {}",
            r.file_name.green(),
            r.file_size,
            r.creation_time,
            r.modification_time
        );
    }
    eprintln!("({} files)", rows.len());
}
