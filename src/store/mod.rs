// sheetsync/src/store/mod.rs
pub(crate) mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use postgres::PgRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::errors::Result;

/// Handle to a persisted record: its primary identity plus the soft-delete
/// marker. Column values are not carried; writes always go through an
/// [`AttributeMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A value bound into a record attribute: plain text from a spreadsheet cell,
/// or a structured blob for the configured JSON column.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Json(serde_json::Value),
}

pub type AttributeMap = BTreeMap<String, AttrValue>;

/// Persistence abstraction the reconciliation engine writes through.
///
/// Implementations own the schema boundary: header-to-column naming coercion
/// and dropping attributes with no matching column happen here, not in the
/// engine.
#[async_trait]
pub trait RecordStore {
    /// Whether the target schema has a column for `name`.
    fn schema_has_attribute(&self, name: &str) -> bool;

    /// Whether the target table carries the soft-delete marker column.
    fn supports_soft_delete(&self) -> bool;

    /// Looks up a single record by one attribute value. With
    /// `include_soft_deleted`, records marked as removed are also candidates.
    async fn find_by_attribute(
        &mut self,
        attr: &str,
        value: &str,
        include_soft_deleted: bool,
    ) -> Result<Option<Record>>;

    /// Inserts a new record. Fails if a unique constraint on the target
    /// table rejects the attribute values.
    async fn create_with_attributes(&mut self, attrs: &AttributeMap) -> Result<Record>;

    /// Overwrites the record's column attributes with the given values.
    async fn overwrite_attributes(&mut self, record: &Record, attrs: &AttributeMap) -> Result<()>;

    /// Clears the record's soft-delete marker.
    async fn restore(&mut self, record: &Record) -> Result<()>;

    /// Marks every record in the target table as removed (current timestamp).
    /// Returns the number of rows affected.
    async fn soft_delete_all(&mut self) -> Result<u64>;
}
