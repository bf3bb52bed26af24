// Seeds the portal datastore with demo content: the collection tree, MARC21
// demo records, vocabulary terms, and the persistent identifiers records
// are expected to carry.
#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate strum_macros;

#[cfg(test)]
#[macro_use]
extern crate maplit;

mod collections;
mod files;
mod mapping;
mod pids;
mod records;
mod terms;

pub use collections::{load_collections, CollectionSpec, COLLECTIONS};
pub use mapping::to_json;
pub use pids::{reconcile, register_pids, PidState, Reconciliation, ReconciliationResults};
pub use records::load_records;
pub use terms::load_terms;

use datastore::{Datastore, FetchError, StoreError};
use log::{info, warn};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

pub static DEFAULT_STORE_DIRECTORY: &str = "instance";
pub static DEFAULT_OAI_PREFIX: &str = "oai:opendata.cern.ch:";
pub static DEFAULT_SCHEMAS_HOST: &str = "opendata.cern.ch";

// Accepted command names, in the order they are usually chained.
pub static COMMANDS: &[&str] = &["collections", "records", "terms", "pids"];

#[derive(Clone, Debug)]
pub struct Config {
    pub store_directory: Box<Path>,
    pub data_directory: Box<Path>,
    pub oai_prefix: String,
    pub schemas_host: String,
}

impl Config {
    pub fn record_schema(&self) -> String {
        format!(
            "https://{}/schemas/records/record-v1.0.0.json",
            self.schemas_host
        )
    }

    pub fn term_schema(&self) -> String {
        format!(
            "https://{}/schemas/records/term-v1.0.0.json",
            self.schemas_host
        )
    }
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    Collections,
    Records,
    Terms,
    Pids,
}

#[derive(Debug, EnumDiscriminants)]
pub enum FixturesError {
    IOError(std::io::Error),                         // Could not read fixture data.
    WalkDirError(walkdir::Error),                    // Could not enumerate fixture data.
    Marc21Error(Box<Path>, marc21::Marc21Error),     // Could not decode a MARC21 file.
    JsonError(Box<Path>, serde_json::Error),         // Could not decode a terms file.
    InvalidTerms(Box<Path>),                         // Terms file is not an array of objects.
    FetchError(Uuid, FetchError),                    // Identifier could not be derived from a record.
    StoreError(StoreError),                          // Wrap datastore errors.
}

impl fmt::Display for FixturesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixturesError::IOError(error) => write!(f, "{}", error),
            FixturesError::WalkDirError(error) => write!(f, "{}", error),
            FixturesError::Marc21Error(path, error) => {
                write!(f, "Failed to load {}: {}", path.display(), error)
            }
            FixturesError::JsonError(path, error) => {
                write!(f, "Failed to load {}: {}", path.display(), error)
            }
            FixturesError::InvalidTerms(path) => write!(
                f,
                "Failed to load {}: expected an array of term objects",
                path.display()
            ),
            FixturesError::FetchError(id, error) => write!(f, "Record {}: {}", id, error),
            FixturesError::StoreError(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for FixturesError {}

impl From<std::io::Error> for FixturesError {
    fn from(error: std::io::Error) -> Self {
        FixturesError::IOError(error)
    }
}

impl From<walkdir::Error> for FixturesError {
    fn from(error: walkdir::Error) -> Self {
        FixturesError::WalkDirError(error)
    }
}

impl From<StoreError> for FixturesError {
    fn from(error: StoreError) -> Self {
        FixturesError::StoreError(error)
    }
}

pub fn valid_data_directory(path: &Path) -> Result<(), String> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(format!("The directory '{}' does not exist", path.display()))
    }
}

fn execute(command: Command, store: &mut Datastore, config: &Config) -> Result<(), FixturesError> {
    match command {
        Command::Collections => {
            let ids = load_collections(store, COLLECTIONS)?;
            info!("Created {} collections.", ids.len());
        }
        Command::Records => {
            let ids = load_records(store, config)?;
            info!("Created {} records.", ids.len());
        }
        Command::Terms => {
            let ids = load_terms(store, config)?;
            info!("Created {} terms.", ids.len());
        }
        Command::Pids => {
            let results = register_pids(store, config)?;
            info!("Finished registering PIDs: {}", results);
        }
    }
    Ok(())
}

// Runs a single command, anything it left uncommitted is discarded on failure.
pub fn run(command: Command, store: &mut Datastore, config: &Config) -> Result<(), FixturesError> {
    info!("Running fixtures command '{}'.", command);
    let result = execute(command, store, config);
    if result.is_err() && store.has_pending_changes() {
        warn!("Rolling back uncommitted changes of '{}'.", command);
        store.rollback()?;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::str::FromStr;

    // Helper to get the packaged data directory.
    pub(crate) fn data_directory() -> PathBuf {
        let manifest_directory = PathBuf::from_str(&env!("CARGO_MANIFEST_DIR")).unwrap();
        let root_directory = manifest_directory.parent().unwrap().parent().unwrap();
        root_directory.join("data")
    }

    pub(crate) fn config(store: &Path, data: &Path) -> Config {
        Config {
            store_directory: store.into(),
            data_directory: data.into(),
            oai_prefix: "oai:example.org:".to_string(),
            schemas_host: "example.org".to_string(),
        }
    }

    #[test]
    fn command_names() {
        for name in COMMANDS {
            let command = Command::from_str(name).unwrap();
            assert_eq!(command.to_string(), *name);
        }
        assert!(Command::from_str("users").is_err());
    }

    #[test]
    fn schemas() {
        let config = config(Path::new("instance"), Path::new("data"));
        assert_eq!(
            config.term_schema(),
            "https://example.org/schemas/records/term-v1.0.0.json"
        );
        assert_eq!(
            config.record_schema(),
            "https://example.org/schemas/records/record-v1.0.0.json"
        );
    }

    #[test]
    fn chained_commands_over_packaged_data() {
        let store_directory = tempfile::tempdir().unwrap();
        let config = config(store_directory.path(), &data_directory());
        let mut store = Datastore::open(store_directory.path()).unwrap();
        for name in COMMANDS {
            run(Command::from_str(name).unwrap(), &mut store, &config).unwrap();
        }
        let ids = store.record_ids().unwrap();
        assert!(!ids.is_empty());
        for id in ids {
            let record = store.record(&id).unwrap();
            assert!(datastore::oai_id(&record.json).is_some());
        }
    }

    #[test]
    fn failed_command_rolls_back() {
        let store_directory = tempfile::tempdir().unwrap();
        let config = config(store_directory.path(), &data_directory());
        let mut store = Datastore::open(store_directory.path()).unwrap();
        run(Command::Collections, &mut store, &config).unwrap();
        let count = store.collections().len();
        // Collection names are unique, a second bootstrap fails part way.
        let err: FixturesErrorDiscriminants = run(Command::Collections, &mut store, &config)
            .unwrap_err()
            .into();
        assert_eq!(err, FixturesErrorDiscriminants::StoreError);
        assert!(!store.has_pending_changes());
        assert_eq!(store.collections().len(), count);
    }
}
