use super::{Collection, Datastore, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Default, Deserialize, Serialize)]
pub(crate) struct CollectionTable {
    // Last assigned id, ids start at 1.
    last_id: i64,
    collections: Vec<Collection>,
}

impl Datastore {
    // Inserts a collection and returns its id immediately, so children can
    // reference it before the transaction is committed.
    pub fn add_collection(
        &mut self,
        name: &str,
        dbquery: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<i64, StoreError> {
        if let Some(parent_id) = parent_id {
            if self.collection(parent_id).is_none() {
                return Err(StoreError::CollectionNotFound(parent_id));
            }
        }
        if self.collections.collections.iter().any(|c| c.name == name) {
            return Err(StoreError::CollectionAlreadyExists(name.to_string()));
        }
        self.collections.last_id += 1;
        let id = self.collections.last_id;
        self.collections.collections.push(Collection {
            id,
            name: name.to_string(),
            dbquery: dbquery.map(str::to_string),
            parent_id,
        });
        self.tables_modified = true;
        Ok(id)
    }

    pub fn collection(&self, id: i64) -> Option<&Collection> {
        self.collections.collections.iter().find(|c| c.id == id)
    }

    pub fn collection_by_name(&self, name: &str) -> Option<&Collection> {
        self.collections.collections.iter().find(|c| c.name == name)
    }

    // In insertion order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections.collections
    }

    pub fn children(&self, id: i64) -> impl Iterator<Item = &Collection> {
        self.collections
            .collections
            .iter()
            .filter(move |c| c.parent_id == Some(id))
    }
}
