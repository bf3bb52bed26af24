use super::{read_json, Datastore, RecordMetadata, StoreError, RECORDS_DIRECTORY};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use uuid::Uuid;

// Whether a record body is checked before it is created. Demo records are
// intentionally incomplete and are created with `Skip`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Validation {
    Enforce,
    Skip,
}

fn validate(json: &Value) -> Result<(), StoreError> {
    let object = json
        .as_object()
        .ok_or_else(|| StoreError::InvalidRecord("record body must be a JSON object".to_string()))?;
    match object.get("$schema").and_then(Value::as_str) {
        Some(schema) if !schema.is_empty() => Ok(()),
        _ => Err(StoreError::InvalidRecord(
            "record body has no '$schema'".to_string(),
        )),
    }
}

impl Datastore {
    pub fn create_record(
        &mut self,
        json: Value,
        id: Option<Uuid>,
        validation: Validation,
    ) -> Result<Uuid, StoreError> {
        let id = id.unwrap_or_else(Uuid::new_v4);
        if self.staged.contains_key(&id) || self.record_path(&id).exists() {
            return Err(StoreError::RecordAlreadyExists(id));
        }
        if validation == Validation::Enforce {
            validate(&json)?;
        }
        let now = Utc::now();
        self.staged.insert(
            id,
            RecordMetadata {
                id,
                json,
                created: now,
                updated: now,
                version_id: 1,
            },
        );
        Ok(id)
    }

    pub fn record(&self, id: &Uuid) -> Result<RecordMetadata, StoreError> {
        if let Some(record) = self.staged.get(id) {
            return Ok(record.clone());
        }
        read_json(&self.record_path(id))?.ok_or(StoreError::RecordNotFound(*id))
    }

    // Stages a modified record, the body is always considered changed.
    pub fn update_record(&mut self, mut record: RecordMetadata) -> Result<(), StoreError> {
        if !self.staged.contains_key(&record.id) && !self.record_path(&record.id).exists() {
            return Err(StoreError::RecordNotFound(record.id));
        }
        record.updated = Utc::now();
        record.version_id += 1;
        self.staged.insert(record.id, record);
        Ok(())
    }

    // Ids of all records, committed or staged, in a stable order.
    pub fn record_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut ids: BTreeSet<Uuid> = self.staged.keys().cloned().collect();
        for entry in fs::read_dir(self.root.join(RECORDS_DIRECTORY))? {
            let path = entry?.path();
            if path.extension().map_or(false, |extension| extension == "json") {
                let id = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| Uuid::parse_str(stem).ok());
                if let Some(id) = id {
                    ids.insert(id);
                }
            }
        }
        Ok(ids.into_iter().collect())
    }
}
