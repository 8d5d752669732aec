//! Bulk CSV import entry point.
//!
//! # Responsibility
//! - Load one CSV file into the configured shelter collection.
//! - Print a short summary of imported and failed rows.
//!
//! # Invariants
//! - Exactly one positional argument; clap prints usage and exits otherwise.
//! - A store that cannot be opened or a file that cannot be read exits 1.

use clap::Parser;
use log::error;
use shelter_core::{import_csv, init_logging, AnimalRepository, AnimalShelter, ShelterConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "shelter_import", version, about = "Import animal records from a CSV file")]
struct Cli {
    /// CSV file with a header row.
    csv_file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ShelterConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("shelter_import: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("shelter_import: {err}");
        return ExitCode::FAILURE;
    }

    let mut repo = match AnimalShelter::open(&config.store) {
        Ok(repo) => repo,
        Err(err) => {
            error!("event=import_open module=cli status=error error={err}");
            eprintln!("shelter_import: cannot open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = import_csv(&cli.csv_file, &repo);
    repo.close();

    match outcome {
        Ok(report) => {
            println!("Rows read: {}", report.total_rows);
            println!("Successfully imported: {}", report.success_count);
            println!("Errors: {}", report.error_count);
            for message in &report.errors {
                println!("  {message}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=import_finish module=cli status=error error={err}");
            eprintln!("shelter_import: {err}");
            ExitCode::FAILURE
        }
    }
}
