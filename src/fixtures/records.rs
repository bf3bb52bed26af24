use super::files::files;
use super::mapping::to_json;
use super::{Config, FixturesError};
use datastore::{Datastore, Validation};
use log::{debug, info};
use marc21::Marc21Record;
use serde_json::Value;
use uuid::Uuid;

// Demo records live in the data folder and one level below it.
const MAX_DEPTH: usize = 2;

// Creates a record for every MARC21 record found in the data folder. Each
// record is committed as soon as it is created, a later failure keeps
// everything before it.
pub fn load_records(store: &mut Datastore, config: &Config) -> Result<Vec<Uuid>, FixturesError> {
    let schema = Value::String(config.record_schema());
    let mut ids = Vec::new();
    for path in files(&config.data_directory, MAX_DEPTH, "xml")? {
        info!("Loading {}", path.display());
        let records = Marc21Record::from_path(&path)
            .map_err(|error| FixturesError::Marc21Error(path.clone(), error))?;
        for record in records {
            let mut json = to_json(&record);
            if let Value::Object(object) = &mut json {
                object.insert("$schema".to_string(), schema.clone());
            }
            let id = store.create_record(json, None, Validation::Skip)?;
            store.commit()?;
            debug!("Created record {} from {}.", id, path.display());
            println!("{}", id);
            ids.push(id);
        }
    }
    Ok(ids)
}
