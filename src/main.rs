mod cohort;
mod db;
mod docx;
mod import;
mod parser;
mod schedule;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;

use db::Store;
use import::Importer;
use settings::Settings;

/// Rows shown per table by `dump`.
const DUMP_ROWS: usize = 8;

#[derive(Parser)]
#[command(name = "schedule_import", about = "Timetable .docx importer and viewer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a group's sessions with those found in the given documents
    Import {
        /// Group code (default: SCHEDULE_DEFAULT_GROUP)
        #[arg(short, long)]
        group: Option<String>,
        /// Document to import; repeat for several (default: SCHEDULE_DOCX_PATH)
        #[arg(short, long = "path")]
        paths: Vec<PathBuf>,
        /// Glob of documents to import (default: SCHEDULE_DOCX_GLOB)
        #[arg(long)]
        glob: Option<String>,
    },
    /// Sessions of one day
    Day {
        #[arg(short, long)]
        group: Option<String>,
        /// YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Sessions of the Monday-Sunday week containing a date
    Week {
        #[arg(short, long)]
        group: Option<String>,
        /// YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Print the tables of a document as the importer sees them
    Dump { path: PathBuf },
    /// Size, container check and table count of one document
    Info { path: PathBuf },
    /// Show where `import` would look for documents
    Locations,
    /// Known groups
    Groups,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    info!(settings_loaded = ?settings, "starting");

    let group_or_default = |g: Option<String>| {
        cohort::canonical_code(g.as_deref().unwrap_or(&settings.default_group))
    };

    let result = match cli.command {
        Commands::Import { group, paths, glob } => {
            let group = group_or_default(group);
            // An explicit --glob takes precedence over the configured path.
            let (docx_path, glob) = match glob {
                Some(g) => (None, Some(g)),
                None => (settings.docx_path.as_deref(), settings.docx_glob.clone()),
            };
            let locations = import::resolve_locations(&paths, docx_path, glob.as_deref())?;

            let store = Store::open(&settings.db_path)?;
            let importer = Importer::new(&store, settings.today()?.year());
            println!("Importing {} document(s) for {}...", locations.len(), group);
            let report = importer.import_from_locations(&group, &locations)?;
            for doc in &report.documents {
                println!("  {}", doc);
            }
            let stored = store.with_conn(|conn| db::count_group(conn, &report.cohort_code))?;
            println!(
                "Saved {} sessions for {} ({} stored).",
                report.inserted, report.cohort_code, stored
            );
            Ok(())
        }
        Commands::Day { group, date, json } => {
            let group = group_or_default(group);
            let day = match date {
                Some(d) => d,
                None => settings.today()?,
            };
            let store = Store::open(&settings.db_path)?;
            let rows = store.with_conn(|conn| db::fetch_day(conn, day, &group))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{}", schedule::format_day(day, &rows, &group));
            }
            Ok(())
        }
        Commands::Week { group, date, json } => {
            let group = group_or_default(group);
            let anchor = match date {
                Some(d) => d,
                None => settings.today()?,
            };
            let (start, end) = schedule::week_bounds(anchor);
            let store = Store::open(&settings.db_path)?;
            let rows = store.with_conn(|conn| db::fetch_week(conn, start, end, &group))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{}", schedule::format_week(anchor, &rows, &group));
            }
            Ok(())
        }
        Commands::Dump { path } => {
            let doc = docx::load(&path).with_context(|| format!("Failed to load {:?}", path))?;
            println!("{} table(s)", doc.tables.len());
            for (i, table) in doc.tables.iter().enumerate() {
                println!(
                    "\n--- Table {} ({} rows x {} cols) ---",
                    i,
                    table.row_count(),
                    table.column_count()
                );
                for row in table.rows.iter().take(DUMP_ROWS) {
                    let cells: Vec<String> = row.iter().map(|c| dump_cell(c)).collect();
                    println!("{}", cells.join(" | "));
                }
            }
            Ok(())
        }
        Commands::Info { path } => {
            let meta = std::fs::metadata(&path)
                .with_context(|| format!("Failed to stat {:?}", path))?;
            let resolved = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            println!("Path:   {}", resolved.display());
            println!("Size:   {} bytes", meta.len());
            println!("Zip:    {}", docx::is_zip_container(&path)?);
            match docx::load(&path) {
                Ok(doc) => {
                    let rows: usize = doc.tables.iter().map(|t| t.row_count()).sum();
                    println!("Tables: {} ({} rows)", doc.tables.len(), rows);
                }
                Err(e) if e.is_format() => println!("Unusable: {}", e),
                Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
            }
            Ok(())
        }
        Commands::Locations => {
            let cwd = std::env::current_dir()?;
            println!("Working dir: {}", cwd.display());
            println!("DOCX_PATH:   {:?}", settings.docx_path);
            println!("DOCX_GLOB:   {:?}", settings.docx_glob);
            println!("\nWord files in working dir:");
            for p in import::documents_in(&cwd)? {
                println!("  {}", p.display());
            }
            if let Some(pattern) = &settings.docx_glob {
                println!("\nGlob matches:");
                for p in import::resolve_locations(&[], None, Some(pattern))? {
                    println!("  {}", p.display());
                }
            }
            let locations = import::resolve_locations(
                &[],
                settings.docx_path.as_deref(),
                settings.docx_glob.as_deref(),
            )?;
            println!("\nImport would read {} document(s):", locations.len());
            for p in &locations {
                println!("  {}", p.display());
            }
            Ok(())
        }
        Commands::Groups => {
            for c in cohort::COHORTS {
                println!("{:<8} {}", c.code, c.label);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

/// One-line preview of a cell; blank cells print as `·`.
fn dump_cell(raw: &str) -> String {
    let flat = parser::text::collapse_ws(&raw.replace('\n', " / "));
    if flat.is_empty() {
        "·".to_string()
    } else {
        truncate(&flat, 40)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
