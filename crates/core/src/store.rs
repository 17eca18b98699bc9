//! Expression Store: the authoritative registry of expression records
//!
//! All access goes through a single `parking_lot::RwLock`. Each operation
//! holds the lock for one record read/write or one snapshot copy, so readers
//! never see a half-applied update.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::expression::{ExpressionRecord, OwnerId, StatusUpdate};

/// Thread-safe map from expression ID to record
#[derive(Default)]
pub struct ExpressionStore {
    records: RwLock<HashMap<Uuid, ExpressionRecord>>,
}

impl ExpressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `Pending` record and return its ID
    pub fn create(&self, owner_id: Option<OwnerId>, expression: impl Into<String>) -> Uuid {
        let expression = expression.into();
        let mut records = self.records.write();
        loop {
            let record = ExpressionRecord::new(owner_id, expression.clone());
            if let Entry::Vacant(slot) = records.entry(record.id) {
                let id = record.id;
                slot.insert(record);
                debug!(expression_id = %id, "Expression record created");
                return id;
            }
        }
    }

    /// Snapshot of one record
    pub fn get(&self, id: Uuid) -> Option<ExpressionRecord> {
        self.records.read().get(&id).cloned()
    }

    /// Point-in-time snapshot of every record, oldest first
    pub fn list_all(&self) -> Vec<ExpressionRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        sort_by_creation(&mut records);
        records
    }

    /// Point-in-time snapshot of one owner's records, oldest first
    pub fn list_by_owner(&self, owner_id: OwnerId) -> Vec<ExpressionRecord> {
        let mut records: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|r| r.owner_id == Some(owner_id))
            .cloned()
            .collect();
        sort_by_creation(&mut records);
        records
    }

    /// Move a record along the state machine, returning the updated snapshot
    pub fn transition(&self, id: Uuid, update: StatusUpdate) -> Result<ExpressionRecord> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(CoreError::NotFound(id))?;
        record.apply(update)?;
        Ok(record.clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn sort_by_creation(records: &mut [ExpressionRecord]) {
    // v7 IDs are time-ordered, so they break created_at ties in insertion order
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
