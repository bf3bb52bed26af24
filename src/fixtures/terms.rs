use super::files::files;
use super::{Config, FixturesError};
use datastore::{recid_minter, Datastore, Validation};
use log::{debug, info};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use uuid::Uuid;

static TERMS_DIRECTORY: &str = "terms";

fn read_terms(path: &Path) -> Result<Vec<Value>, FixturesError> {
    let file = File::open(path)?;
    let terms: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|error| FixturesError::JsonError(path.into(), error))?;
    match terms {
        Value::Array(terms) if terms.iter().all(Value::is_object) => Ok(terms),
        _ => Err(FixturesError::InvalidTerms(path.into())),
    }
}

// Creates a validated record for every term in `<data>/terms/*.json`. Terms
// carry no control number of their own, one is minted for each. Terms are
// indexed once committed.
pub fn load_terms(store: &mut Datastore, config: &Config) -> Result<Vec<Uuid>, FixturesError> {
    let directory = config.data_directory.join(TERMS_DIRECTORY);
    let schema = Value::String(config.term_schema());
    let indexer = store.indexer();
    let mut ids = Vec::new();
    for path in files(&directory, 1, "json")? {
        info!("Loading {}", path.display());
        for mut term in read_terms(&path)? {
            let id = Uuid::new_v4();
            let pid = recid_minter(store, &id, &mut term)?;
            term["$schema"] = schema.clone();
            store.create_record(term, Some(id), Validation::Enforce)?;
            store.commit()?;
            let record = store.record(&id)?;
            let index = indexer.index(&record)?;
            debug!("Created term {} ({}) in index {}.", id, pid, index);
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::super::tests::config;
    use super::super::FixturesErrorDiscriminants;
    use super::*;
    use datastore::{control_number, RECID};
    use std::collections::HashSet;
    use std::fs;

    fn data_directory(terms: &[(&str, &str)]) -> tempfile::TempDir {
        let directory = tempfile::tempdir().unwrap();
        let terms_directory = directory.path().join(TERMS_DIRECTORY);
        fs::create_dir(&terms_directory).unwrap();
        for (name, content) in terms {
            fs::write(terms_directory.join(name), content).unwrap();
        }
        directory
    }

    #[test]
    fn terms_are_minted_and_indexed() {
        let store_directory = tempfile::tempdir().unwrap();
        let data_directory = data_directory(&[
            ("glossary.json", r#"[{"anchor": "aod"}, {"anchor": "trigger"}]"#),
            ("more.json", r#"[{"anchor": "luminosity"}]"#),
        ]);
        let config = config(store_directory.path(), data_directory.path());
        let mut store = Datastore::open(store_directory.path()).unwrap();

        let ids = load_terms(&mut store, &config).unwrap();
        assert_eq!(ids.len(), 3);
        assert!(!store.has_pending_changes());

        let recids: HashSet<_> = ids
            .iter()
            .map(|id| control_number(&store.record(id).unwrap().json).unwrap())
            .collect();
        assert_eq!(recids.len(), 3);
        for id in &ids {
            let record = store.record(id).unwrap();
            let recid = control_number(&record.json).unwrap();
            assert!(store.get_pid(RECID, &recid, None).unwrap().points_to("rec", id));
        }

        let mut indexed = store.indexer().documents("records-term-v1.0.0").unwrap();
        let mut expected = ids.clone();
        indexed.sort();
        expected.sort();
        assert_eq!(indexed, expected);
    }

    #[test]
    fn missing_terms_directory() {
        let store_directory = tempfile::tempdir().unwrap();
        let data_directory = tempfile::tempdir().unwrap();
        let config = config(store_directory.path(), data_directory.path());
        let mut store = Datastore::open(store_directory.path()).unwrap();
        assert!(load_terms(&mut store, &config).unwrap().is_empty());
    }

    #[test]
    fn terms_must_be_an_array_of_objects() {
        let store_directory = tempfile::tempdir().unwrap();
        let data_directory = data_directory(&[("glossary.json", r#"{"anchor": "aod"}"#)]);
        let config = config(store_directory.path(), data_directory.path());
        let mut store = Datastore::open(store_directory.path()).unwrap();
        let err: FixturesErrorDiscriminants = load_terms(&mut store, &config).unwrap_err().into();
        assert_eq!(err, FixturesErrorDiscriminants::InvalidTerms);
    }

    #[test]
    fn malformed_terms_file() {
        let store_directory = tempfile::tempdir().unwrap();
        let data_directory = data_directory(&[("glossary.json", "[{")]);
        let config = config(store_directory.path(), data_directory.path());
        let mut store = Datastore::open(store_directory.path()).unwrap();
        let err: FixturesErrorDiscriminants = load_terms(&mut store, &config).unwrap_err().into();
        assert_eq!(err, FixturesErrorDiscriminants::JsonError);
    }
}
