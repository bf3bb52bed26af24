// Makes sure every record carries the persistent identifiers the portal
// expects: a record id matching its control number, and an OAI identifier
// matching `_oai.id` (derived from the control number when absent).
//
// Every step is a lookup followed by a creation only when the lookup finds
// nothing, running it again over the same records changes nothing.
use super::{Config, FixturesError};
use datastore::{
    control_number, oai_id, oaiid_fetcher, oaiid_minter, recid_fetcher, set_oai_id, Datastore,
    FetchedPid, PidStatus, RECORD_OBJECT_TYPE,
};
use log::{debug, info, warn};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PidState {
    Present, // Already there, left untouched.
    Missing, // Created (or repaired) by this run.
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reconciliation {
    // The record lacks the fields needed to derive its record id.
    Skipped,
    // One of the record's identifiers is registered for another record, the
    // record is left as is.
    Conflict,
    Reconciled {
        recid: PidState,
        oai_id: PidState,
        oaiid: PidState,
    },
}

use PidState::*;
use Reconciliation::*;

#[derive(Debug, Default, Eq, PartialEq)]
pub struct ReconciliationResults {
    total: usize,
    reconciled: usize,
    skipped: usize,
    conflicts: usize,
    recids_created: usize,
    oai_ids_repaired: usize,
    oaiids_created: usize,
}

impl ReconciliationResults {
    pub fn new(results: &[Reconciliation]) -> Self {
        let mut summary = ReconciliationResults {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result {
                Skipped => summary.skipped += 1,
                Conflict => summary.conflicts += 1,
                Reconciled {
                    recid,
                    oai_id,
                    oaiid,
                } => {
                    summary.reconciled += 1;
                    summary.recids_created += (*recid == Missing) as usize;
                    summary.oai_ids_repaired += (*oai_id == Missing) as usize;
                    summary.oaiids_created += (*oaiid == Missing) as usize;
                }
            }
        }
        summary
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    pub fn created(&self) -> usize {
        self.recids_created + self.oaiids_created
    }
}

impl fmt::Display for ReconciliationResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} (Reconciled: {}, Skipped: {}, Conflicts: {}, Record ids created: {}, OAI ids repaired: {}, OAI identifiers created: {})",
            self.total,
            self.reconciled,
            self.skipped,
            self.conflicts,
            self.recids_created,
            self.oai_ids_repaired,
            self.oaiids_created
        )
    }
}

// Looks up a fetched identifier, `None` when it is registered for another
// object.
fn lookup(store: &Datastore, id: &Uuid, fetched: &FetchedPid) -> Option<PidState> {
    match store.get_pid(fetched.pid_type, &fetched.pid_value, fetched.provider) {
        Some(pid) if !pid.points_to(RECORD_OBJECT_TYPE, id) => {
            warn!(
                "Record {}: {} is registered for another object: {}",
                id, fetched, pid
            );
            None
        }
        Some(pid) => {
            debug!("Found {}", pid);
            Some(Present)
        }
        None => Some(Missing),
    }
}

// Reconciles the identifiers of a single record and stages the record. The
// caller decides when to commit.
pub fn reconcile(
    store: &mut Datastore,
    id: &Uuid,
    oai_prefix: &str,
) -> Result<Reconciliation, FixturesError> {
    let mut record = store.record(id)?;

    let fetched = match recid_fetcher(id, &record.json) {
        Ok(fetched) => fetched,
        Err(error) => {
            warn!("Skipping record {}: {}", id, error);
            return Ok(Skipped);
        }
    };
    let recid = match lookup(store, id, &fetched) {
        Some(state) => state,
        None => return Ok(Conflict),
    };
    if recid == Missing {
        let pid = store.create_pid(
            fetched.pid_type,
            &fetched.pid_value,
            fetched.provider,
            Some((RECORD_OBJECT_TYPE, *id)),
            PidStatus::Registered,
        )?;
        info!("Created {}", pid);
    }

    let oai_id_state = match oai_id(&record.json) {
        Some(value) if !value.is_empty() => Present,
        _ => {
            let control_number = control_number(&record.json);
            assert!(
                control_number.is_some(),
                "Record {} has no control number",
                id
            );
            let value = format!("{}{}", oai_prefix, control_number.unwrap_or_default());
            debug!("Setting OAI id of record {} to {}", id, value);
            set_oai_id(&mut record.json, &value)?;
            Missing
        }
    };

    let fetched = oaiid_fetcher(id, &record.json)
        .map_err(|error| FixturesError::FetchError(*id, error))?;
    // The record id registered above stays, it belongs to this record.
    let oaiid = match lookup(store, id, &fetched) {
        Some(state) => state,
        None => return Ok(Conflict),
    };
    if oaiid == Missing {
        let pid = oaiid_minter(store, id, &mut record.json, oai_prefix)?;
        info!("Created {}", pid);
    }

    assert!(
        oai_id(&record.json).map_or(false, |value| !value.is_empty()),
        "Record {} has no OAI id after reconciliation",
        id
    );
    store.update_record(record)?;

    Ok(Reconciled {
        recid,
        oai_id: oai_id_state,
        oaiid,
    })
}

// Reconciles every record in the store, committing after each one.
pub fn register_pids(
    store: &mut Datastore,
    config: &Config,
) -> Result<ReconciliationResults, FixturesError> {
    let ids = store.record_ids()?;
    info!("Registering PIDs of {} records.", ids.len());
    let progress_bar = logger::progress_bar(ids.len() as u64, "pids");
    let mut results = Vec::with_capacity(ids.len());
    for id in &ids {
        let result = reconcile(store, id, &config.oai_prefix)?;
        store.commit()?;
        results.push(result);
        progress_bar.inc(1);
    }
    progress_bar.finish_and_clear();
    Ok(ReconciliationResults::new(&results))
}
