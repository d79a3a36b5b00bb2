//! Spreadsheet Import Tool
//!
//! Fetches a published Google spreadsheet as CSV and reconciles its rows into
//! a Postgres table with upsert and soft-delete lifecycle semantics.

// sheetsync/src/main.rs
mod config;
mod errors;
mod import;
mod source;
mod store;

use anyhow::{Context, Result};
use config::{load_import_config, CliOverrides, RawJsonConfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Main entry point for the import tool
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => {
            println!("✅ Import completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    dotenv::dotenv().ok();

    let overrides = parse_cli_overrides(env::args().skip(1))?;

    // Expects config.json in the working directory; every setting can also
    // come from the environment or the command line.
    let config_path = PathBuf::from("config.json");
    let raw = RawJsonConfig::load_from_json(&config_path).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;
    let import_config = load_import_config(&raw, &overrides)
        .context("Failed to assemble the import configuration")?;

    println!(
        "🚀 Starting spreadsheet import into table '{}'...",
        import_config.table
    );
    let summary = import::run_import_flow(&import_config)
        .await
        .context("Import process failed")?;
    println!("📊 {}", summary);

    Ok(())
}

/// Parses command-line overrides. Unknown arguments are rejected with a
/// usage hint.
fn parse_cli_overrides<I: Iterator<Item = String>>(args: I) -> Result<CliOverrides> {
    let mut overrides = CliOverrides::default();
    for arg in args {
        if arg == "--create-new" {
            overrides.create_new = true;
        } else if arg == "--skip-errors" {
            overrides.skip_errors = true;
        } else if let Some(v) = arg.strip_prefix("--spreadsheet=") {
            overrides.spreadsheet_id = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--table=") {
            overrides.table = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--unique-key=") {
            overrides.unique_key = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--json-column=") {
            overrides.json_column = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--filename=") {
            overrides.filename = Some(PathBuf::from(v));
        } else {
            anyhow::bail!(
                "Unknown argument '{}'. Supported: --spreadsheet=<id> --table=<name> \
                 --unique-key=<column=attribute> --json-column=<name> --filename=<path> \
                 --create-new --skip-errors",
                arg
            );
        }
    }
    Ok(overrides)
}
