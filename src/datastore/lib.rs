// Directory backed store for records, collections, persistent identifiers
// and their search index documents.
//
// Layout of the store root:
//   collections.json       collection tree
//   pidstore.json          persistent identifier registry
//   records/<uuid>.json    one file per record
//   index/<index>/<uuid>.json
#[macro_use]
extern crate strum_macros;

mod collections;
mod indexer;
mod models;
mod pidstore;
mod records;

pub use indexer::{index_name, SearchIndex};
pub use models::*;
pub use pidstore::*;
pub use records::Validation;

use collections::CollectionTable;
use log::debug;
use pidstore::PidTable;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufReader, Write};
use std::path::Path;
use uuid::Uuid;

static COLLECTIONS_FILE: &str = "collections.json";
static PIDSTORE_FILE: &str = "pidstore.json";
static RECORDS_DIRECTORY: &str = "records";
static INDEX_DIRECTORY: &str = "index";

#[derive(Debug, EnumDiscriminants)]
pub enum StoreError {
    IOError(std::io::Error),          // Could not read / write the store.
    JsonError(serde_json::Error),     // Corrupt table or record file.
    RecordNotFound(Uuid),             // No record with the given id.
    RecordAlreadyExists(Uuid),        // Explicit id already taken.
    InvalidRecord(String),            // Record failed validation.
    PidAlreadyExists(String, String), // Type and value are unique in the registry.
    CollectionNotFound(i64),          // Parent collection does not exist.
    CollectionAlreadyExists(String),  // Collection names are unique.
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IOError(error) => write!(f, "Datastore IO error: {}", error),
            StoreError::JsonError(error) => write!(f, "Datastore JSON error: {}", error),
            StoreError::RecordNotFound(id) => write!(f, "Record {} does not exist", id),
            StoreError::RecordAlreadyExists(id) => write!(f, "Record {} already exists", id),
            StoreError::InvalidRecord(reason) => write!(f, "Invalid record: {}", reason),
            StoreError::PidAlreadyExists(pid_type, pid_value) => write!(
                f,
                "Persistent identifier {}:{} already exists",
                pid_type, pid_value
            ),
            StoreError::CollectionNotFound(id) => write!(f, "Collection {} does not exist", id),
            StoreError::CollectionAlreadyExists(name) => {
                write!(f, "Collection '{}' already exists", name)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::IOError(error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::JsonError(error)
    }
}

impl From<tempfile::PersistError> for StoreError {
    fn from(error: tempfile::PersistError) -> Self {
        StoreError::IOError(error.error)
    }
}

// Reads a table, absent files are treated as empty tables.
fn read_json<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }
    let file = fs::File::open(path)?;
    Ok(Some(serde_json::from_reader(BufReader::new(file))?))
}

// Writes to a temporary file in the destination directory and renames it
// into place, readers never observe a partially written file.
pub(crate) fn write_json<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory)?;
    let mut file = tempfile::NamedTempFile::new_in(directory)?;
    file.write_all(&serde_json::to_vec_pretty(value)?)?;
    file.persist(path)?;
    Ok(())
}

pub struct Datastore {
    root: Box<Path>,
    collections: CollectionTable,
    pids: PidTable,
    // Records added or modified since the last commit.
    staged: BTreeMap<Uuid, RecordMetadata>,
    tables_modified: bool,
}

impl Datastore {
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root.join(RECORDS_DIRECTORY))?;
        let mut datastore = Datastore {
            root: root.into(),
            collections: CollectionTable::default(),
            pids: PidTable::default(),
            staged: BTreeMap::new(),
            tables_modified: false,
        };
        datastore.load_tables()?;
        Ok(datastore)
    }

    fn load_tables(&mut self) -> Result<(), StoreError> {
        self.collections = read_json(&self.root.join(COLLECTIONS_FILE))?.unwrap_or_default();
        self.pids = read_json(&self.root.join(PIDSTORE_FILE))?.unwrap_or_default();
        self.pids.reindex();
        self.tables_modified = false;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn indexer(&self) -> SearchIndex {
        SearchIndex::new(&self.root.join(INDEX_DIRECTORY))
    }

    fn record_path(&self, id: &Uuid) -> Box<Path> {
        self.root
            .join(RECORDS_DIRECTORY)
            .join(format!("{}.json", id))
            .into_boxed_path()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.tables_modified || !self.staged.is_empty()
    }

    // Persists staged records first, then the tables. A crash in between
    // leaves records that a later reconciliation run repairs.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        for (id, record) in &staged {
            write_json(&self.record_path(id), record)?;
        }
        if self.tables_modified {
            write_json(&self.root.join(COLLECTIONS_FILE), &self.collections)?;
            write_json(&self.root.join(PIDSTORE_FILE), &self.pids)?;
            self.tables_modified = false;
        }
        debug!("Committed {} record(s).", staged.len());
        Ok(())
    }

    // Discards everything since the last commit.
    pub fn rollback(&mut self) -> Result<(), StoreError> {
        self.staged.clear();
        self.load_tables()
    }
}
