//! In-memory record store.

use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use shapecut_pipeline::ValidationRecord;

use crate::{RecordStore, StoreError};

/// Records held in a map ordered by image id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    records: BTreeMap<String, ValidationRecord>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] for the first repeated id.
    pub fn from_records(
        records: impl IntoIterator<Item = ValidationRecord>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// All records in image-id order.
    pub fn records(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.values()
    }

    /// Remove and return a record. Only used to undo a failed insert.
    pub(crate) fn remove(&mut self, image_id: &str) -> Option<ValidationRecord> {
        self.records.remove(image_id)
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, record: ValidationRecord) -> Result<(), StoreError> {
        if self.records.contains_key(&record.image_id) {
            return Err(StoreError::DuplicateId(record.image_id));
        }
        self.records.insert(record.image_id.clone(), record);
        Ok(())
    }

    fn get_by_id(&self, image_id: &str) -> Result<&ValidationRecord, StoreError> {
        self.records
            .get(image_id)
            .ok_or_else(|| StoreError::NotFound(image_id.to_string()))
    }

    fn get_random(&self, rng: &mut dyn RngCore) -> Result<&ValidationRecord, StoreError> {
        if self.records.is_empty() {
            return Err(StoreError::Empty);
        }
        let index = rng.random_range(0..self.records.len());
        self.records.values().nth(index).ok_or(StoreError::Empty)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
