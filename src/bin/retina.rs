//! Retina CLI — load annotation documents and report the analytical battery.
//!
//! Usage:
//!   retina load <dir> [--clear] [--db path] [--json]
//!   retina report [--db path] [--json]

use clap::{Parser, Subcommand};
use retina::ingest::{load_directory, LoadOptions};
use retina::query::{QueryEngine, QueryReport};
use retina::storage::{OpenStore, SqliteStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "retina",
    version,
    about = "Property-graph analytics for image annotation corpora"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a directory of annotation documents, then report the battery
    Load {
        /// Directory containing *.json annotation documents
        dir: PathBuf,
        /// Clear the store before loading
        #[arg(long)]
        clear: bool,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Skip the query battery after loading
        #[arg(long)]
        no_report: bool,
        /// Render reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the analytical battery against an already-loaded store
    Report {
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Render reports as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Get the default database path (~/.local/share/retina/retina.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("retina").join("retina.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&path).map_err(|e| format!("Failed to open database: {}", e))
}

fn print_reports(reports: &[QueryReport], json: bool) -> i32 {
    if json {
        match serde_json::to_string_pretty(reports) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        }
    } else {
        for report in reports {
            println!();
            println!("{}: {}", report.title, report.description);
            println!("    {}", report.columns.join("\t"));
            for row in &report.rows {
                println!("    {}", row.join("\t"));
            }
        }
        0
    }
}

fn run_battery(store: &SqliteStore, json: bool) -> i32 {
    match QueryEngine::new(store).run_battery() {
        Ok(reports) => print_reports(&reports, json),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_load(store: &SqliteStore, dir: &PathBuf, clear: bool, no_report: bool, json: bool) -> i32 {
    let options = LoadOptions { clear_first: clear };
    let summary = match load_directory(store, dir, &options) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if clear {
        println!("Deleted {} nodes", summary.cleared_nodes);
    }
    println!(
        "Loaded {} documents ({} rejected)",
        summary.loaded, summary.rejected
    );

    if no_report {
        0
    } else {
        run_battery(store, json)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Load { dir, clear, db, no_report, json } => match open_store(db) {
            Ok(store) => cmd_load(&store, &dir, clear, no_report, json),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Report { db, json } => match open_store(db) {
            Ok(store) => run_battery(&store, json),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
