//! Record store and profile provider
//!
//! The engine only depends on the `RecordStore` and `ProfileProvider` traits.
//! Two stores ship with the crate: an in-memory one for tests and embedding,
//! and a JSON file store used by the CLI.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::models::{Profile, Record, RecordId};

const EVENT_CAPACITY: usize = 64;

/// Change notifications published by a store
#[derive(Debug, Clone)]
pub enum RecordEvent {
    Created(Record),
}

/// Source of truth for records
pub trait RecordStore: Send + Sync {
    /// All records, in storage order
    fn list_records(&self) -> Result<Vec<Record>>;

    /// Apply `mutator` to one record and return the updated copy
    fn update_record(&self, id: RecordId, mutator: &mut dyn FnMut(&mut Record)) -> Result<Record>;

    /// Receive an event for every record created after this call
    fn subscribe(&self) -> broadcast::Receiver<RecordEvent>;
}

/// Source of the user profile
pub trait ProfileProvider: Send + Sync {
    fn current_profile(&self) -> Option<Profile>;
}

/// A profile fixed at construction
#[derive(Debug, Clone, Default)]
pub struct StaticProfile(Option<Profile>);

impl StaticProfile {
    pub fn new(profile: Profile) -> Self {
        Self(Some(profile))
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// Load a profile from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let profile: Profile = serde_json::from_str(&content)?;
        Ok(Self::new(profile))
    }
}

impl ProfileProvider for StaticProfile {
    fn current_profile(&self) -> Option<Profile> {
        self.0.clone()
    }
}

fn lock<'a>(records: &'a Mutex<Vec<Record>>) -> Result<MutexGuard<'a, Vec<Record>>> {
    records
        .lock()
        .map_err(|_| Error::Store("Failed to acquire record lock".into()))
}

fn next_id(records: &[Record]) -> RecordId {
    records.iter().map(|r| r.id).max().unwrap_or(0) + 1
}

fn ensure_unique(records: &[Record], id: RecordId) -> Result<()> {
    if records.iter().any(|r| r.id == id) {
        return Err(Error::InvalidData(format!("record {} already exists", id)));
    }
    Ok(())
}

fn apply_update(
    records: &mut [Record],
    id: RecordId,
    mutator: &mut dyn FnMut(&mut Record),
) -> Result<Record> {
    let record = records
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| Error::NotFound(format!("record {}", id)))?;
    mutator(record);
    Ok(record.clone())
}

/// Records held in memory
pub struct InMemoryRecordStore {
    records: Mutex<Vec<Record>>,
    events: broadcast::Sender<RecordEvent>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            records: Mutex::new(records),
            events,
        }
    }

    /// Next unused id
    pub fn next_id(&self) -> Result<RecordId> {
        Ok(next_id(&lock(&self.records)?))
    }

    /// Add a record and publish `RecordEvent::Created`
    pub fn insert(&self, record: Record) -> Result<Record> {
        record.validate()?;
        {
            let mut records = lock(&self.records)?;
            ensure_unique(&records, record.id)?;
            records.push(record.clone());
        }
        let _ = self.events.send(RecordEvent::Created(record.clone()));
        Ok(record)
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list_records(&self) -> Result<Vec<Record>> {
        Ok(lock(&self.records)?.clone())
    }

    fn update_record(&self, id: RecordId, mutator: &mut dyn FnMut(&mut Record)) -> Result<Record> {
        apply_update(&mut lock(&self.records)?, id, mutator)
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.subscribe()
    }
}

/// Records persisted as a JSON array in a single file
///
/// Every mutation rewrites the file atomically (temp file in the same
/// directory, then rename).
pub struct JsonFileRecordStore {
    path: PathBuf,
    records: Mutex<Vec<Record>>,
    events: broadcast::Sender<RecordEvent>,
}

impl JsonFileRecordStore {
    /// Open a records file; a missing file is an empty log
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records: Vec<Record> = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        for record in &records {
            record.validate()?;
        }

        tracing::debug!(path = %path.display(), count = records.len(), "Opened record store");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            path,
            records: Mutex::new(records),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next unused id
    pub fn next_id(&self) -> Result<RecordId> {
        Ok(next_id(&lock(&self.records)?))
    }

    /// Add a record, persist, then publish `RecordEvent::Created`
    pub fn insert(&self, record: Record) -> Result<Record> {
        record.validate()?;
        {
            let mut records = lock(&self.records)?;
            ensure_unique(&records, record.id)?;
            records.push(record.clone());
            if let Err(e) = self.persist(&records) {
                records.pop();
                return Err(e);
            }
        }
        let _ = self.events.send(RecordEvent::Created(record.clone()));
        Ok(record)
    }

    fn persist(&self, records: &[Record]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, records)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl RecordStore for JsonFileRecordStore {
    fn list_records(&self) -> Result<Vec<Record>> {
        Ok(lock(&self.records)?.clone())
    }

    fn update_record(&self, id: RecordId, mutator: &mut dyn FnMut(&mut Record)) -> Result<Record> {
        let mut records = lock(&self.records)?;
        let previous = records.clone();
        let updated = apply_update(&mut records, id, mutator)?;
        if let Err(e) = self.persist(&records) {
            *records = previous;
            return Err(e);
        }
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.subscribe()
    }
}
