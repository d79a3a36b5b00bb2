// sheetsync/src/store/memory.rs
//! In-memory record store used by the engine tests: keeps the record set in a
//! plain Vec and records every store call so tests can assert call sequences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::{AttrValue, AttributeMap, Record, RecordStore};
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Find {
        attr: String,
        value: String,
        include_soft_deleted: bool,
    },
    Create,
    Overwrite { id: i64 },
    Restore { id: i64 },
    SoftDeleteAll,
}

#[derive(Debug, Clone)]
pub struct MemRecord {
    pub id: i64,
    pub attrs: AttributeMap,
    pub deleted_at: Option<DateTime<Utc>>,
}

pub struct MemoryStore {
    columns: HashSet<String>,
    records: Vec<MemRecord>,
    next_id: i64,
    pub calls: Vec<StoreCall>,
    /// Attribute values whose writes fail with a simulated constraint error.
    pub fail_on_values: HashSet<String>,
}

impl MemoryStore {
    pub fn new(columns: &[&str]) -> Self {
        MemoryStore {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            records: Vec::new(),
            next_id: 1,
            calls: Vec::new(),
            fail_on_values: HashSet::new(),
        }
    }

    pub fn records(&self) -> &[MemRecord] {
        &self.records
    }

    /// Seeds a record directly, bypassing the call log.
    pub fn insert_existing(
        &mut self,
        attrs: AttributeMap,
        deleted_at: Option<DateTime<Utc>>,
    ) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(MemRecord {
            id,
            attrs: self.filtered(&attrs),
            deleted_at,
        });
        id
    }

    // Same boundary behavior as the Postgres store: attributes with no
    // matching column are dropped, id/deleted_at are never writable.
    fn filtered(&self, attrs: &AttributeMap) -> AttributeMap {
        attrs
            .iter()
            .filter(|(name, _)| {
                self.columns.contains(*name) && *name != "id" && *name != "deleted_at"
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn should_fail(&self, attrs: &AttributeMap) -> bool {
        attrs.values().any(|v| match v {
            AttrValue::Text(s) => self.fail_on_values.contains(s),
            AttrValue::Json(_) => false,
        })
    }

    fn constraint_error() -> crate::errors::ImportError {
        std::io::Error::other("simulated unique constraint violation").into()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
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
        self.calls.push(StoreCall::Find {
            attr: attr.to_string(),
            value: value.to_string(),
            include_soft_deleted,
        });
        let found = self.records.iter().find(|r| {
            (include_soft_deleted || r.deleted_at.is_none())
                && r.attrs.get(attr) == Some(&AttrValue::Text(value.to_string()))
        });
        Ok(found.map(|r| Record {
            id: r.id,
            deleted_at: r.deleted_at,
        }))
    }

    async fn create_with_attributes(&mut self, attrs: &AttributeMap) -> Result<Record> {
        self.calls.push(StoreCall::Create);
        if self.should_fail(attrs) {
            return Err(Self::constraint_error());
        }
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(MemRecord {
            id,
            attrs: self.filtered(attrs),
            deleted_at: None,
        });
        Ok(Record {
            id,
            deleted_at: None,
        })
    }

    async fn overwrite_attributes(&mut self, record: &Record, attrs: &AttributeMap) -> Result<()> {
        self.calls.push(StoreCall::Overwrite { id: record.id });
        if self.should_fail(attrs) {
            return Err(Self::constraint_error());
        }
        let filtered = self.filtered(attrs);
        if let Some(r) = self.records.iter_mut().find(|r| r.id == record.id) {
            for (name, value) in filtered {
                r.attrs.insert(name, value);
            }
        }
        Ok(())
    }

    async fn restore(&mut self, record: &Record) -> Result<()> {
        self.calls.push(StoreCall::Restore { id: record.id });
        if let Some(r) = self.records.iter_mut().find(|r| r.id == record.id) {
            r.deleted_at = None;
        }
        Ok(())
    }

    async fn soft_delete_all(&mut self) -> Result<u64> {
        self.calls.push(StoreCall::SoftDeleteAll);
        let now = Utc::now();
        for r in self.records.iter_mut() {
            r.deleted_at = Some(now);
        }
        Ok(self.records.len() as u64)
    }
}
