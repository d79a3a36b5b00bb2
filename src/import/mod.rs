// sheetsync/src/import/mod.rs
pub(crate) mod engine;

pub use engine::{EngineOptions, ImportEngine, RowFailure, RunAborted, RunSummary};

use anyhow::{Context, Result};

use crate::config::ImportConfig;
use crate::source::{CsvRowSource, FileCache, SheetFetcher};
use crate::store::postgres::db_name_from_url;
use crate::store::PgRecordStore;

/// Public entry point for the import process: fetch the published
/// spreadsheet, decode it, and reconcile every row into the target table.
pub async fn run_import_flow(config: &ImportConfig) -> Result<RunSummary> {
    let fetcher = SheetFetcher::new();
    let cache = FileCache::new(config.filename.clone(), config.cache_ttl_secs);
    let body = fetcher
        .fetch_csv(&config.spreadsheet_id, &cache)
        .await
        .context("Failed to fetch the spreadsheet document")?;

    let rows = CsvRowSource::new(body.as_bytes())
        .context("Failed to decode the spreadsheet header row")?;

    let store = PgRecordStore::connect(&config.database_url, &config.table)
        .await
        .with_context(|| {
            format!(
                "Failed to open the record store for table '{}'",
                config.table
            )
        })?;

    let options = EngineOptions {
        unique_key: config.unique_key.clone(),
        json_column: config.json_column.clone(),
        create_new: config.create_new,
        skip_errors: config.skip_errors,
    };

    let mut engine = ImportEngine::new(store, options);
    let summary = engine.run(rows).await.map_err(|aborted| {
        let persisted = aborted.summary.processed;
        anyhow::Error::new(aborted).context(format!(
            "Import aborted; {} row(s) persisted before the abort remain in place",
            persisted
        ))
    })?;

    for failure in &summary.failures {
        println!("⚠️ Row '{}' was not persisted: {}", failure.key, failure.message);
    }
    let db_name =
        db_name_from_url(&config.database_url).unwrap_or_else(|_| "database".to_string());
    println!(
        "✓ Reconciled spreadsheet into table '{}' of '{}'.",
        config.table, db_name
    );

    Ok(summary)
}
