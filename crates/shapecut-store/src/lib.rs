//! shapecut-store: keyed storage for validation records.
//!
//! One record per generated challenge, keyed by image id. Records are
//! immutable once inserted; the serving side only reads them back by id
//! or at random.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use rand::RngCore;
use shapecut_pipeline::ValidationRecord;

/// Errors from record storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a valid record list.
    #[error("store data is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    /// A record with this id already exists.
    #[error("a record for image id {0:?} already exists")]
    DuplicateId(String),

    /// No record has this id.
    #[error("no record for image id {0:?}")]
    NotFound(String),

    /// A random record was requested from an empty store.
    #[error("the record store is empty")]
    Empty,
}

/// A keyed collection of [`ValidationRecord`]s.
pub trait RecordStore {
    /// Add a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the id is taken, or a
    /// backend error if the record could not be persisted. A failed
    /// insert leaves the store unchanged.
    fn insert(&mut self, record: ValidationRecord) -> Result<(), StoreError>;

    /// Look up a record by image id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no record has this id.
    fn get_by_id(&self, image_id: &str) -> Result<&ValidationRecord, StoreError>;

    /// Pick a record uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Empty`] when there are no records.
    fn get_random(&self, rng: &mut dyn RngCore) -> Result<&ValidationRecord, StoreError>;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
