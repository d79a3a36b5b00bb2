// sheetsync/src/store/postgres.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row as SqlxRow};
use std::collections::HashSet;
use url::Url;

use super::{AttrValue, AttributeMap, Record, RecordStore};
use crate::errors::{ImportError, Result};

/// Record store backed by one Postgres table. The column set is loaded once
/// at connect time; all generated SQL quotes identifiers and binds values.
pub struct PgRecordStore {
    pool: PgPool,
    table: String,
    columns: HashSet<String>,
}

impl PgRecordStore {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(table)
        .fetch_all(&pool)
        .await?;

        if columns.is_empty() {
            return Err(ImportError::Config(format!(
                "Table '{}' does not exist in the target database (or has no columns)",
                table
            )));
        }

        Ok(PgRecordStore {
            pool,
            table: table.to_string(),
            columns: columns.into_iter().collect(),
        })
    }

    fn mapped_columns(&self, attrs: &AttributeMap) -> Vec<(String, AttrValue)> {
        map_attributes(&self.columns, attrs)
    }
}

/// Quotes a SQL identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Coerces a spreadsheet header to the snake_case column naming convention:
/// lowercased, word boundaries (spaces, punctuation, case changes) become a
/// single underscore.
fn snake_case_column(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut prev_lower = false;
    let mut pending_sep = false;
    for ch in header.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            let boundary = pending_sep || (ch.is_ascii_uppercase() && prev_lower);
            if boundary && !out.is_empty() {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Maps row-shaped attributes onto actual table columns. Exact column names
/// win; otherwise the header is snake_cased. Attributes with no matching
/// column are silently skipped, and `id`/`deleted_at` are never written from
/// row data.
fn map_attributes(columns: &HashSet<String>, attrs: &AttributeMap) -> Vec<(String, AttrValue)> {
    let mut seen = HashSet::new();
    let mut mapped = Vec::new();
    for (name, value) in attrs {
        let column = if columns.contains(name) {
            name.clone()
        } else {
            snake_case_column(name)
        };
        if column == "id" || column == "deleted_at" || !columns.contains(&column) {
            continue;
        }
        if seen.insert(column.clone()) {
            mapped.push((column, value.clone()));
        }
    }
    mapped
}

/// Extracts the database name from a PostgreSQL connection URL.
pub fn db_name_from_url(db_url: &str) -> Result<String> {
    let parsed_url = Url::parse(db_url)?;
    let path = parsed_url.path().trim_start_matches('/');
    if path.is_empty() {
        Err(ImportError::Config(format!(
            "Database name not found in URL path: {}",
            db_url
        )))
    } else {
        Ok(path.to_string())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    fn schema_has_attribute(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    fn supports_soft_delete(&self) -> bool {
        self.columns.contains("deleted_at")
    }

    async fn find_by_attribute(
        &mut self,
        attr: &str,
        value: &str,
        include_soft_deleted: bool,
    ) -> Result<Option<Record>> {
        let mut sql = format!(
            "SELECT id, deleted_at FROM {} WHERE {} = $1",
            quote_ident(&self.table),
            quote_ident(attr)
        );
        if !include_soft_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }
        sql.push_str(" LIMIT 1");

        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Record {
            id: r.get("id"),
            deleted_at: r.get("deleted_at"),
        }))
    }

    async fn create_with_attributes(&mut self, attrs: &AttributeMap) -> Result<Record> {
        let mapped = self.mapped_columns(attrs);
        let sql = if mapped.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING id",
                quote_ident(&self.table)
            )
        } else {
            let names: Vec<String> = mapped.iter().map(|(c, _)| quote_ident(c)).collect();
            let placeholders: Vec<String> = (1..=mapped.len()).map(|i| format!("${}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
                quote_ident(&self.table),
                names.join(", "),
                placeholders.join(", ")
            )
        };

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for (_, value) in &mapped {
            query = match value {
                AttrValue::Text(s) => query.bind(s),
                AttrValue::Json(j) => query.bind(j),
            };
        }
        let id = query.fetch_one(&self.pool).await?;
        Ok(Record {
            id,
            deleted_at: None,
        })
    }

    async fn overwrite_attributes(&mut self, record: &Record, attrs: &AttributeMap) -> Result<()> {
        let mapped = self.mapped_columns(attrs);
        if mapped.is_empty() {
            return Ok(());
        }
        let assignments: Vec<String> = mapped
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("{} = ${}", quote_ident(c), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${}",
            quote_ident(&self.table),
            assignments.join(", "),
            mapped.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in &mapped {
            query = match value {
                AttrValue::Text(s) => query.bind(s),
                AttrValue::Json(j) => query.bind(j),
            };
        }
        query.bind(record.id).execute(&self.pool).await?;
        Ok(())
    }

    async fn restore(&mut self, record: &Record) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET deleted_at = NULL WHERE id = $1",
            quote_ident(&self.table)
        );
        sqlx::query(&sql).bind(record.id).execute(&self.pool).await?;
        Ok(())
    }

    async fn soft_delete_all(&mut self) -> Result<u64> {
        // Marks every row, matching the import lifecycle: rows present in the
        // new spreadsheet get restored, stale rows stay soft-deleted.
        let sql = format!("UPDATE {} SET deleted_at = $1", quote_ident(&self.table));
        let result = sqlx::query(&sql)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
