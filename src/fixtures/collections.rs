use datastore::{Datastore, StoreError};
use log::debug;

#[derive(Debug)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub dbquery: Option<&'static str>,
    pub children: &'static [CollectionSpec],
}

macro_rules! collection {
    ($name:literal) => {
        CollectionSpec {
            name: $name,
            dbquery: Some(concat!("collections.primary:\"", $name, "\"")),
            children: &[],
        }
    };
    ($name:literal, [$($child:expr),* $(,)?]) => {
        CollectionSpec {
            name: $name,
            dbquery: Some(concat!("collections.primary:\"", $name, "\"")),
            children: &[$($child),*],
        }
    };
}

// Default collection tree of the portal, one branch per experiment.
pub static COLLECTIONS: &[CollectionSpec] = &[
    collection!(
        "CMS",
        [
            collection!("CMS-Primary-Datasets"),
            collection!("CMS-Derived-Datasets"),
            collection!("CMS-Simulated-Datasets"),
            collection!("CMS-Configuration-Files"),
            collection!("CMS-Tools"),
            collection!("CMS-Validation-Utilities"),
            collection!("CMS-Learning-Resources"),
        ]
    ),
    collection!(
        "ALICE",
        [
            collection!("ALICE-Reconstructed-Data"),
            collection!("ALICE-Analysis-Modules"),
            collection!("ALICE-Tools"),
            collection!("ALICE-Learning-Resources"),
        ]
    ),
    collection!(
        "ATLAS",
        [
            collection!("ATLAS-Derived-Datasets"),
            collection!("ATLAS-Higgs-Challenge-2014"),
            collection!("ATLAS-Tools"),
            collection!("ATLAS-Learning-Resources"),
        ]
    ),
    collection!(
        "LHCb",
        [
            collection!("LHCb-Derived-Datasets"),
            collection!("LHCb-Tools"),
            collection!("LHCb-Learning-Resources"),
        ]
    ),
    CollectionSpec {
        name: "Terms",
        dbquery: Some("$schema:\"*/schemas/records/term-v1.0.0.json\""),
        children: &[],
    },
];

// Creates the tree in pre-order. A node is inserted, and its id known,
// before any of its children are, children then reference it as parent.
pub fn load_collections(
    store: &mut Datastore,
    collections: &[CollectionSpec],
) -> Result<Vec<i64>, StoreError> {
    let mut ids = Vec::new();
    let mut stack: Vec<(&CollectionSpec, Option<i64>)> =
        collections.iter().rev().map(|spec| (spec, None)).collect();
    while let Some((spec, parent_id)) = stack.pop() {
        let id = store.add_collection(spec.name, spec.dbquery, parent_id)?;
        debug!("Created collection {} ({}).", spec.name, id);
        ids.push(id);
        stack.extend(spec.children.iter().rev().map(|child| (child, Some(id))));
    }
    store.commit()?;
    Ok(ids)
}
