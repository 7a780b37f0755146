//! Record store persisted as a JSON array on disk.
//!
//! The whole file is rewritten on every insert. Writes go to a sibling
//! temporary file first and are then renamed over the target, so a
//! crash mid-write leaves the previous contents intact.

use std::path::{Path, PathBuf};

use rand::RngCore;
use shapecut_pipeline::ValidationRecord;

use crate::memory::MemoryStore;
use crate::{RecordStore, StoreError};

/// A [`MemoryStore`] mirrored to a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not
    /// exist yet. Nothing is written until the first insert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read,
    /// [`StoreError::Serde`] if it is not a record list, and
    /// [`StoreError::DuplicateId`] if it lists an id twice.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(json) => {
                let list: Vec<ValidationRecord> = serde_json::from_str(&json)?;
                MemoryStore::from_records(list)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryStore::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            "opened record store",
        );
        Ok(Self { path, records })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let list: Vec<&ValidationRecord> = self.records.records().collect();
        let json = serde_json::to_string_pretty(&list)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), records = list.len(), "saved record store");
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn insert(&mut self, record: ValidationRecord) -> Result<(), StoreError> {
        let id = record.image_id.clone();
        self.records.insert(record)?;
        if let Err(e) = self.save() {
            self.records.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    fn get_by_id(&self, image_id: &str) -> Result<&ValidationRecord, StoreError> {
        self.records.get_by_id(image_id)
    }

    fn get_random(&self, rng: &mut dyn RngCore) -> Result<&ValidationRecord, StoreError> {
        self.records.get_random(rng)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
