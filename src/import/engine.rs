// sheetsync/src/import/engine.rs
use std::fmt;

use thiserror::Error;

use crate::config::UniqueKeyMapping;
use crate::errors::{ImportError, Result};
use crate::source::rows::is_blank;
use crate::source::{Row, RowSource};
use crate::store::{AttrValue, AttributeMap, RecordStore};

/// Engine-level settings for one reconciliation run, resolved from the
/// import configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub unique_key: Option<UniqueKeyMapping>,
    pub json_column: Option<String>,
    pub create_new: bool,
    pub skip_errors: bool,
}

/// One row that could not be persisted while running with skip-errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub key: String,
    pub message: String,
}

/// Aggregate counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub skipped: u64,
    pub created: u64,
    pub updated: u64,
    pub prior_soft_deleted: u64,
    pub failures: Vec<RowFailure>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} row(s) processed ({} created, {} updated), {} skipped, {} failed; \
             {} record(s) were soft-deleted before the run",
            self.processed,
            self.created,
            self.updated,
            self.skipped,
            self.failures.len(),
            self.prior_soft_deleted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

/// A run that stopped before the row sequence was exhausted. Rows persisted
/// before the abort point stay persisted; `summary` covers them.
#[derive(Debug, Error)]
#[error("Import run aborted: {error}")]
pub struct RunAborted {
    #[source]
    pub error: ImportError,
    pub summary: RunSummary,
}

enum RowOutcome {
    Created,
    Updated,
}

/// Reconciles a sequence of spreadsheet rows against a record store:
/// create, update-and-restore, or skip, one row at a time in source order.
pub struct ImportEngine<S: RecordStore> {
    store: S,
    options: EngineOptions,
    state: EngineState,
    summary: RunSummary,
}

impl<S: RecordStore> ImportEngine<S> {
    pub fn new(store: S, options: EngineOptions) -> Self {
        ImportEngine {
            store,
            options,
            state: EngineState::NotStarted,
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the reconciliation pass to completion or abort. Entered at most
    /// once per engine; there is no pause or resume.
    pub async fn run<R: RowSource>(
        &mut self,
        mut rows: R,
    ) -> std::result::Result<RunSummary, RunAborted> {
        if self.state != EngineState::NotStarted {
            return Err(RunAborted {
                error: ImportError::Config(
                    "Engine has already run; build a new engine for another pass".to_string(),
                ),
                summary: self.summary.clone(),
            });
        }
        self.state = EngineState::Running;

        // Validation is fatal before any store mutation.
        if let Err(error) = self.validate() {
            return Err(self.abort(error));
        }

        // The bulk soft-delete happens exactly once, before the first row.
        if self.options.create_new {
            match self.store.soft_delete_all().await {
                Ok(count) => self.summary.prior_soft_deleted = count,
                Err(error) => return Err(self.abort(error)),
            }
        }

        loop {
            let row = match rows.next_row() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(error) => return Err(self.abort(error)),
            };
            if let Err(error) = self.reconcile_row(&row).await {
                return Err(self.abort(error));
            }
        }

        self.state = EngineState::Completed;
        Ok(self.summary.clone())
    }

    fn abort(&mut self, error: ImportError) -> RunAborted {
        self.state = EngineState::Aborted;
        RunAborted {
            error,
            summary: self.summary.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.store.supports_soft_delete() {
            return Err(ImportError::Config(
                "The target table has no soft-delete marker (deleted_at column), \
                 which the import lifecycle requires"
                    .to_string(),
            ));
        }
        match &self.options.unique_key {
            Some(mapping) => {
                if !self.store.schema_has_attribute(&mapping.target_attribute) {
                    return Err(ImportError::Config(format!(
                        "Unique-key target attribute '{}' does not exist on the target table",
                        mapping.target_attribute
                    )));
                }
            }
            None => {
                if !self.options.create_new {
                    return Err(ImportError::Config(
                        "A unique-key mapping is required unless running in create-new mode"
                            .to_string(),
                    ));
                }
            }
        }
        if let Some(column) = &self.options.json_column {
            if !self.store.schema_has_attribute(column) {
                return Err(ImportError::Config(format!(
                    "JSON column '{}' does not exist on the target table",
                    column
                )));
            }
        }
        Ok(())
    }

    async fn reconcile_row(&mut self, row: &Row) -> Result<()> {
        // A blank unique-key cell skips the row silently. Without a mapping
        // (create-new mode) there is nothing to check and every row is taken.
        let unique = match &self.options.unique_key {
            Some(mapping) => {
                let value = row.get(&mapping.source_column).unwrap_or("");
                if is_blank(value) {
                    self.summary.skipped += 1;
                    return Ok(());
                }
                Some((mapping.target_attribute.clone(), value.to_string()))
            }
            None => None,
        };

        let mut attrs = AttributeMap::new();
        for (name, value) in row.cells() {
            attrs.insert(name.to_string(), AttrValue::Text(value.to_string()));
        }
        if let Some((attr, value)) = &unique {
            attrs.insert(attr.clone(), AttrValue::Text(value.clone()));
        }
        if let Some(column) = &self.options.json_column {
            attrs.insert(column.clone(), AttrValue::Json(row.to_json()));
        }

        match self.persist_row(&unique, &attrs).await {
            Ok(RowOutcome::Created) => {
                self.summary.processed += 1;
                self.summary.created += 1;
                Ok(())
            }
            Ok(RowOutcome::Updated) => {
                self.summary.processed += 1;
                self.summary.updated += 1;
                Ok(())
            }
            Err(error) => {
                let key = unique
                    .map(|(_, value)| value)
                    .unwrap_or_else(|| "<no unique key>".to_string());
                let message = error.to_string();
                if self.options.skip_errors {
                    self.summary.failures.push(RowFailure { key, message });
                    Ok(())
                } else {
                    Err(ImportError::Persistence { key, message })
                }
            }
        }
    }

    async fn persist_row(
        &mut self,
        unique: &Option<(String, String)>,
        attrs: &AttributeMap,
    ) -> Result<RowOutcome> {
        if self.options.create_new {
            if let Some((attr, value)) = unique {
                if let Some(record) = self.store.find_by_attribute(attr, value, true).await? {
                    self.store.overwrite_attributes(&record, attrs).await?;
                    self.store.restore(&record).await?;
                    return Ok(RowOutcome::Updated);
                }
            }
            self.store.create_with_attributes(attrs).await?;
            Ok(RowOutcome::Created)
        } else {
            // Unconditional create, no pre-query. A duplicate unique value
            // surfaces as a store constraint error.
            self.store.create_with_attributes(attrs).await?;
            Ok(RowOutcome::Created)
        }
    }
}
