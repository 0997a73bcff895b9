use ::clap::Parser;
use log::error;
use std::path::PathBuf;

use pkgbench::summary::{format_table, load_results, summarize};

/// Summarize the benchmark results CSV as a per-manager table.
#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct CLI {
    #[arg(
        long,
        short,
        default_value = "results/results.csv",
        help = "CSV results file produced by the benchmark"
    )]
    input: PathBuf,
}

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();
    let args = CLI::parse();

    if !args.input.exists() {
        error!("Results file not found: {}", args.input.display());
        error!("Run pkgbench first to generate results.");
        std::process::exit(1);
    }

    let rows = match load_results(&args.input) {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to load {}: {e}", args.input.display());
            std::process::exit(1);
        }
    };
    if rows.is_empty() {
        error!("Results file is empty.");
        std::process::exit(1);
    }

    print!("{}", format_table(&summarize(&rows)));
}
