//! Assignment reconciliation: converge stored assignments for one occurrence
//! to a desired set inside the caller's transaction.
//!
//! Driver reconciliation is diff-based. An untouched driver keeps its
//! assignment row (and therefore its kid assignments); a full replace would
//! orphan them for no reason.
//!
//! Kid reconciliation is a full replace. Kid assignments have no dependents,
//! and replacing wholesale is what enforces the "one bucket per kid"
//! invariant.

use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

use crate::store::{self, DriverAssignmentRow, KidAssignmentRow, StoreError};

pub fn set_driver_assignments(
    conn: &Connection,
    occurrence_id: &str,
    desired: &[String],
) -> Result<Vec<DriverAssignmentRow>, StoreError> {
    store::occurrence_exists(conn, occurrence_id)?;

    // Duplicates in the request collapse to set membership.
    let desired: HashSet<&str> = desired.iter().map(|s| s.as_str()).collect();
    for driver_id in &desired {
        store::fetch_driver(conn, driver_id)?;
    }

    let existing: HashSet<String> = {
        let mut stmt = conn
            .prepare("SELECT driver_id FROM driver_assignments WHERE activity_instance_id = ?")?;
        let rows = stmt
            .query_map([occurrence_id], |r| r.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;
        rows
    };

    let to_remove: Vec<&str> = existing
        .iter()
        .map(|s| s.as_str())
        .filter(|id| !desired.contains(id))
        .collect();
    let to_add: Vec<&str> = desired
        .iter()
        .copied()
        .filter(|id| !existing.contains(*id))
        .collect();

    // Nothing changed: zero mutations, existing assignment ids survive.
    if to_remove.is_empty() && to_add.is_empty() {
        return store::list_driver_assignments(conn, occurrence_id);
    }

    for driver_id in &to_remove {
        conn.execute(
            "DELETE FROM kid_assignments
             WHERE driver_assignment_id IN (
               SELECT id FROM driver_assignments
               WHERE activity_instance_id = ? AND driver_id = ?
             )",
            (occurrence_id, driver_id),
        )?;
        conn.execute(
            "DELETE FROM driver_assignments WHERE activity_instance_id = ? AND driver_id = ?",
            (occurrence_id, driver_id),
        )?;
    }
    for driver_id in &to_add {
        conn.execute(
            "INSERT INTO driver_assignments(id, activity_instance_id, driver_id) VALUES(?, ?, ?)",
            (store::new_id(), occurrence_id, driver_id),
        )?;
    }
    tracing::debug!(
        occurrence = occurrence_id,
        added = to_add.len(),
        removed = to_remove.len(),
        "reconciled driver assignments"
    );

    store::list_driver_assignments(conn, occurrence_id)
}

/// One entry of the desired kid mapping: every driver assignment for the
/// occurrence should be represented, with an empty list to clear it.
#[derive(Debug, Clone)]
pub struct KidBucket {
    pub driver_assignment_id: String,
    pub kid_ids: Vec<String>,
}

pub fn set_kid_assignments(
    conn: &Connection,
    occurrence_id: &str,
    buckets: &[KidBucket],
) -> Result<Vec<KidAssignmentRow>, StoreError> {
    store::occurrence_exists(conn, occurrence_id)?;

    // Every referenced driver assignment must belong to this occurrence.
    let assignments = store::list_driver_assignments(conn, occurrence_id)?;
    let by_id: HashMap<&str, &DriverAssignmentRow> =
        assignments.iter().map(|a| (a.id.as_str(), a)).collect();
    for bucket in buckets {
        if !by_id.contains_key(bucket.driver_assignment_id.as_str()) {
            return Err(StoreError::NotFound {
                what: "driver assignment",
            });
        }
        for kid_id in &bucket.kid_ids {
            store::fetch_kid(conn, kid_id)?;
        }
    }

    // A kid may ride with at most one driver per occurrence. When the caller
    // lists the same kid under several buckets, the last bucket wins; the
    // same resolution dedupes repeats inside a single bucket.
    let mut placement: HashMap<&str, &str> = HashMap::new();
    for bucket in buckets {
        for kid_id in &bucket.kid_ids {
            placement.insert(kid_id.as_str(), bucket.driver_assignment_id.as_str());
        }
    }
    let mut resolved: Vec<(&str, Vec<&str>)> = Vec::with_capacity(buckets.len());
    let mut placed: HashSet<&str> = HashSet::new();
    for bucket in buckets {
        let mut kids: Vec<&str> = Vec::new();
        for kid_id in &bucket.kid_ids {
            let kid = kid_id.as_str();
            if placement.get(kid).copied() == Some(bucket.driver_assignment_id.as_str())
                && placed.insert(kid)
            {
                kids.push(kid);
            }
        }
        resolved.push((bucket.driver_assignment_id.as_str(), kids));
    }

    // Capacity is checked against what would actually be inserted; a
    // violation fails the whole call before any row changes.
    for (assignment_id, kids) in &resolved {
        let assignment = by_id[assignment_id];
        if kids.len() as i64 > assignment.seat_capacity {
            return Err(StoreError::CapacityExceeded {
                family_name: assignment.family_name.clone(),
                seat_capacity: assignment.seat_capacity,
                requested: kids.len(),
            });
        }
    }

    conn.execute(
        "DELETE FROM kid_assignments
         WHERE driver_assignment_id IN (
           SELECT id FROM driver_assignments WHERE activity_instance_id = ?
         )",
        [occurrence_id],
    )?;
    let mut inserted = 0usize;
    for (assignment_id, kids) in &resolved {
        for kid_id in kids {
            conn.execute(
                "INSERT INTO kid_assignments(id, driver_assignment_id, kid_id) VALUES(?, ?, ?)",
                (store::new_id(), assignment_id, kid_id),
            )?;
            inserted += 1;
        }
    }
    tracing::debug!(
        occurrence = occurrence_id,
        inserted,
        "reconciled kid assignments"
    );

    store::list_kid_assignments(conn, occurrence_id)
}
