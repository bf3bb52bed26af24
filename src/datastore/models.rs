use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RecordMetadata {
    pub id: Uuid,
    pub json: Value,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub version_id: u32,
}

impl RecordMetadata {
    pub fn schema(&self) -> Option<&str> {
        self.json.get("$schema").and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub dbquery: Option<String>,
    pub parent_id: Option<i64>,
}

// Serialized with the single letter codes used by the portal's registry.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum PidStatus {
    #[serde(rename = "N")]
    New,
    #[serde(rename = "K")]
    Reserved,
    #[serde(rename = "R")]
    Registered,
    #[serde(rename = "M")]
    Redirected,
    #[serde(rename = "D")]
    Deleted,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PersistentIdentifier {
    pub pid_type: String,
    pub pid_value: String,
    pub pid_provider: Option<String>,
    pub object_type: Option<String>,
    pub object_uuid: Option<Uuid>,
    pub status: PidStatus,
    pub created: DateTime<Utc>,
}

impl PersistentIdentifier {
    pub fn is_registered(&self) -> bool {
        self.status == PidStatus::Registered
    }

    pub fn points_to(&self, object_type: &str, object_uuid: &Uuid) -> bool {
        self.object_type.as_deref() == Some(object_type)
            && self.object_uuid.as_ref() == Some(object_uuid)
    }
}

impl fmt::Display for PersistentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.pid_type, self.pid_value, self.status)?;
        if let (Some(object_type), Some(object_uuid)) = (&self.object_type, &self.object_uuid) {
            write!(f, " -> {}:{}", object_type, object_uuid)?;
        }
        Ok(())
    }
}
