// Persistent identifier registry, plus the fetchers and minters for the two
// identifier kinds the portal uses: record ids and OAI identifiers.
use super::{Datastore, PersistentIdentifier, PidStatus, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

pub static RECID: &str = "recid";
pub static OAIID: &str = "oai";
pub static OAIID_PROVIDER: &str = "oai";
pub static RECORD_OBJECT_TYPE: &str = "rec";

#[derive(Default, Deserialize, Serialize)]
pub(crate) struct PidTable {
    // Last value handed out by the record id minter.
    recid_sequence: u64,
    pids: Vec<PersistentIdentifier>,
    // (pid_type, pid_value) => position in `pids`.
    #[serde(skip)]
    index: HashMap<(String, String), usize>,
}

impl PidTable {
    pub(crate) fn reindex(&mut self) {
        self.index = self
            .pids
            .iter()
            .enumerate()
            .map(|(i, pid)| ((pid.pid_type.clone(), pid.pid_value.clone()), i))
            .collect();
    }
}

impl Datastore {
    // A provider of `None` matches any provider.
    pub fn get_pid(
        &self,
        pid_type: &str,
        pid_value: &str,
        pid_provider: Option<&str>,
    ) -> Option<&PersistentIdentifier> {
        let key = (pid_type.to_string(), pid_value.to_string());
        let pid = self.pids.index.get(&key).map(|&i| &self.pids.pids[i])?;
        match pid_provider {
            Some(provider) if pid.pid_provider.as_deref() != Some(provider) => None,
            _ => Some(pid),
        }
    }

    pub fn create_pid(
        &mut self,
        pid_type: &str,
        pid_value: &str,
        pid_provider: Option<&str>,
        object: Option<(&str, Uuid)>,
        status: PidStatus,
    ) -> Result<PersistentIdentifier, StoreError> {
        if self.get_pid(pid_type, pid_value, None).is_some() {
            return Err(StoreError::PidAlreadyExists(
                pid_type.to_string(),
                pid_value.to_string(),
            ));
        }
        let pid = PersistentIdentifier {
            pid_type: pid_type.to_string(),
            pid_value: pid_value.to_string(),
            pid_provider: pid_provider.map(str::to_string),
            object_type: object.map(|(object_type, _)| object_type.to_string()),
            object_uuid: object.map(|(_, object_uuid)| object_uuid),
            status,
            created: Utc::now(),
        };
        self.pids.index.insert(
            (pid.pid_type.clone(), pid.pid_value.clone()),
            self.pids.pids.len(),
        );
        self.pids.pids.push(pid.clone());
        self.tables_modified = true;
        Ok(pid)
    }

    pub fn pids(&self) -> &[PersistentIdentifier] {
        &self.pids.pids
    }

    pub fn pids_for_object<'a>(
        &'a self,
        object_type: &'a str,
        object_uuid: &'a Uuid,
    ) -> impl Iterator<Item = &'a PersistentIdentifier> {
        self.pids
            .pids
            .iter()
            .filter(move |pid| pid.points_to(object_type, object_uuid))
    }

    // Next free record id, values already registered (e.g. control numbers
    // taken from demo records) are skipped.
    fn next_recid(&mut self) -> String {
        loop {
            self.pids.recid_sequence += 1;
            let value = self.pids.recid_sequence.to_string();
            if self.get_pid(RECID, &value, None).is_none() {
                self.tables_modified = true;
                return value;
            }
        }
    }
}

// A candidate identifier derived from a record, not yet looked up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchedPid {
    pub pid_type: &'static str,
    pub pid_value: String,
    pub provider: Option<&'static str>,
}

impl fmt::Display for FetchedPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid_type, self.pid_value)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum FetchError {
    MissingField(&'static str), // The record body lacks the field the fetcher reads.
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::MissingField(field) => write!(f, "Missing required field '{}'", field),
        }
    }
}

impl std::error::Error for FetchError {}

// Control numbers may be stored as strings or numbers.
pub fn control_number(data: &Value) -> Option<String> {
    match data.get("control_number")? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

pub fn oai_id(data: &Value) -> Option<&str> {
    data.get("_oai")?.get("id")?.as_str()
}

pub fn set_oai_id(data: &mut Value, value: &str) -> Result<(), StoreError> {
    let object = data
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidRecord("record body must be a JSON object".to_string()))?;
    let oai = object
        .entry("_oai")
        .or_insert_with(|| Value::Object(Map::new()));
    if !oai.is_object() {
        *oai = Value::Object(Map::new());
    }
    oai["id"] = Value::String(value.to_string());
    Ok(())
}

pub fn recid_fetcher(_record_uuid: &Uuid, data: &Value) -> Result<FetchedPid, FetchError> {
    let pid_value = control_number(data).ok_or(FetchError::MissingField("control_number"))?;
    Ok(FetchedPid {
        pid_type: RECID,
        pid_value,
        provider: None,
    })
}

pub fn oaiid_fetcher(_record_uuid: &Uuid, data: &Value) -> Result<FetchedPid, FetchError> {
    let pid_value = oai_id(data).ok_or(FetchError::MissingField("_oai.id"))?;
    Ok(FetchedPid {
        pid_type: OAIID,
        pid_value: pid_value.to_string(),
        provider: Some(OAIID_PROVIDER),
    })
}

// Registers a fresh record id for the record and stores it as its control number.
pub fn recid_minter(
    store: &mut Datastore,
    record_uuid: &Uuid,
    data: &mut Value,
) -> Result<PersistentIdentifier, StoreError> {
    assert!(
        data.get("control_number").is_none(),
        "Record {} already has a control number",
        record_uuid
    );
    let object = data
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidRecord("record body must be a JSON object".to_string()))?;
    let value = store.next_recid();
    let pid = store.create_pid(
        RECID,
        &value,
        None,
        Some((RECORD_OBJECT_TYPE, *record_uuid)),
        PidStatus::Registered,
    )?;
    object.insert("control_number".to_string(), Value::String(value));
    Ok(pid)
}

// Registers the OAI identifier of the record, deriving it from the control
// number when the record has none, and writes the registered value back.
pub fn oaiid_minter(
    store: &mut Datastore,
    record_uuid: &Uuid,
    data: &mut Value,
    prefix: &str,
) -> Result<PersistentIdentifier, StoreError> {
    let pid_value = match oai_id(data) {
        Some(value) => value.to_string(),
        None => {
            let control_number = control_number(data);
            assert!(
                control_number.is_some(),
                "Record {} has neither an OAI identifier nor a control number",
                record_uuid
            );
            format!("{}{}", prefix, control_number.unwrap_or_default())
        }
    };
    let pid = store.create_pid(
        OAIID,
        &pid_value,
        Some(OAIID_PROVIDER),
        Some((RECORD_OBJECT_TYPE, *record_uuid)),
        PidStatus::Registered,
    )?;
    set_oai_id(data, &pid.pid_value)?;
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::super::StoreErrorDiscriminants;
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_filters_by_provider() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = Datastore::open(directory.path()).unwrap();
        let id = Uuid::new_v4();
        store
            .create_pid(
                OAIID,
                "oai:example.org:1",
                Some(OAIID_PROVIDER),
                Some((RECORD_OBJECT_TYPE, id)),
                PidStatus::Registered,
            )
            .unwrap();
        assert!(store.get_pid(OAIID, "oai:example.org:1", None).is_some());
        assert!(store
            .get_pid(OAIID, "oai:example.org:1", Some(OAIID_PROVIDER))
            .is_some());
        assert!(store
            .get_pid(OAIID, "oai:example.org:1", Some("datacite"))
            .is_none());
        assert!(store.get_pid(OAIID, "oai:example.org:2", None).is_none());
        assert_eq!(store.pids_for_object(RECORD_OBJECT_TYPE, &id).count(), 1);
    }

    #[test]
    fn duplicates_are_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = Datastore::open(directory.path()).unwrap();
        store
            .create_pid(RECID, "1", None, None, PidStatus::Registered)
            .unwrap();
        let err: StoreErrorDiscriminants = store
            .create_pid(RECID, "1", None, None, PidStatus::New)
            .unwrap_err()
            .into();
        assert_eq!(err, StoreErrorDiscriminants::PidAlreadyExists);
    }

    #[test]
    fn registry_survives_reopen() {
        let directory = tempfile::tempdir().unwrap();
        {
            let mut store = Datastore::open(directory.path()).unwrap();
            store
                .create_pid(RECID, "1", None, None, PidStatus::Registered)
                .unwrap();
            store.commit().unwrap();
        }
        let store = Datastore::open(directory.path()).unwrap();
        let pid = store.get_pid(RECID, "1", None).unwrap();
        assert!(pid.is_registered());
    }

    #[test]
    fn fetchers() {
        let id = Uuid::new_v4();
        let data = json!({"control_number": 12345, "_oai": {"id": "oai:example.org:12345"}});
        assert_eq!(
            recid_fetcher(&id, &data).unwrap(),
            FetchedPid {
                pid_type: RECID,
                pid_value: "12345".to_string(),
                provider: None
            }
        );
        assert_eq!(
            oaiid_fetcher(&id, &data).unwrap(),
            FetchedPid {
                pid_type: OAIID,
                pid_value: "oai:example.org:12345".to_string(),
                provider: Some(OAIID_PROVIDER)
            }
        );
        assert_eq!(
            recid_fetcher(&id, &json!({})).unwrap_err(),
            FetchError::MissingField("control_number")
        );
        assert_eq!(
            oaiid_fetcher(&id, &json!({"_oai": {}})).unwrap_err(),
            FetchError::MissingField("_oai.id")
        );
    }

    #[test]
    fn recid_minter_skips_taken_values() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = Datastore::open(directory.path()).unwrap();
        store
            .create_pid(RECID, "1", None, None, PidStatus::Registered)
            .unwrap();
        let id = Uuid::new_v4();
        let mut data = json!({"title": "Luminosity"});
        let pid = recid_minter(&mut store, &id, &mut data).unwrap();
        assert_eq!(pid.pid_value, "2");
        assert!(pid.points_to(RECORD_OBJECT_TYPE, &id));
        assert_eq!(data["control_number"], json!("2"));
    }

    #[test]
    fn oaiid_minter_synthesizes_from_control_number() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = Datastore::open(directory.path()).unwrap();
        let id = Uuid::new_v4();
        let mut data = json!({"control_number": "12345"});
        let pid = oaiid_minter(&mut store, &id, &mut data, "oai:example.org:").unwrap();
        assert_eq!(pid.pid_value, "oai:example.org:12345");
        assert_eq!(pid.pid_provider.as_deref(), Some(OAIID_PROVIDER));
        assert_eq!(oai_id(&data), Some("oai:example.org:12345"));
    }

    #[test]
    #[should_panic]
    fn oaiid_minter_requires_control_number() {
        let directory = tempfile::tempdir().unwrap();
        let mut store = Datastore::open(directory.path()).unwrap();
        let _ = oaiid_minter(&mut store, &Uuid::new_v4(), &mut json!({}), "oai:example.org:");
    }

    #[test]
    fn set_oai_id_replaces_invalid_container() {
        let mut data = json!({"_oai": "broken"});
        set_oai_id(&mut data, "oai:example.org:1").unwrap();
        assert_eq!(data, json!({"_oai": {"id": "oai:example.org:1"}}));
    }
}
