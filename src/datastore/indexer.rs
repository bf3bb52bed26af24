use super::{write_json, RecordMetadata, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use uuid::Uuid;

static DEFAULT_INDEX: &str = "records-record";

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "_id")]
    id: &'a Uuid,
    #[serde(rename = "_version")]
    version: u32,
    #[serde(rename = "_source")]
    source: &'a Value,
}

// Index name derived from the record's schema, e.g.
// https://opendata.cern.ch/schemas/records/term-v1.0.0.json => records-term-v1.0.0
pub fn index_name(schema: Option<&str>) -> String {
    schema
        .and_then(|schema| schema.splitn(2, "/schemas/").nth(1))
        .map(|path| path.trim_end_matches(".json").replace('/', "-"))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_INDEX.to_string())
}

pub struct SearchIndex {
    root: Box<Path>,
}

impl SearchIndex {
    pub fn new(root: &Path) -> Self {
        SearchIndex { root: root.into() }
    }

    // Writes (or replaces) the document for the record, returns the index name.
    pub fn index(&self, record: &RecordMetadata) -> Result<String, StoreError> {
        let index = index_name(record.schema());
        let document = Document {
            id: &record.id,
            version: record.version_id,
            source: &record.json,
        };
        let path = self.root.join(&index).join(format!("{}.json", record.id));
        write_json(&path, &document)?;
        Ok(index)
    }

    pub fn documents(&self, index: &str) -> Result<Vec<Uuid>, StoreError> {
        let directory = self.root.join(index);
        if !directory.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
