use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_str, required_str_array};
use crate::ipc::types::{AppState, Request};
use crate::reconcile::{self, KidBucket};
use crate::store::{self, DriverAssignmentRow, KidAssignmentRow, StoreError};

fn driver_assignment_json(a: &DriverAssignmentRow) -> serde_json::Value {
    json!({
        "assignmentId": a.id,
        "driverId": a.driver_id,
        "familyName": a.family_name,
        "seatCapacity": a.seat_capacity
    })
}

fn kid_assignment_json(a: &KidAssignmentRow) -> serde_json::Value {
    json!({
        "assignmentId": a.id,
        "kidId": a.kid_id,
        "kidName": a.kid_name,
        "driverAssignmentId": a.driver_assignment_id,
        "driverId": a.driver_id,
        "driverFamilyName": a.driver_family_name
    })
}

fn drivers_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let occurrence_id = required_str(params, "occurrenceId")?;
    store::occurrence_exists(conn, &occurrence_id)?;
    let rows: Vec<_> = store::list_driver_assignments(conn, &occurrence_id)?
        .iter()
        .map(driver_assignment_json)
        .collect();
    Ok(json!({ "assignments": rows }))
}

fn drivers_set(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let occurrence_id = required_str(params, "occurrenceId")?;
    let driver_ids = required_str_array(params, "driverIds")?;

    let tx = conn.unchecked_transaction()?;
    let rows = reconcile::set_driver_assignments(&tx, &occurrence_id, &driver_ids)?;
    tx.commit()?;

    let rows: Vec<_> = rows.iter().map(driver_assignment_json).collect();
    Ok(json!({ "assignments": rows }))
}

fn kids_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let occurrence_id = required_str(params, "occurrenceId")?;
    store::occurrence_exists(conn, &occurrence_id)?;
    let rows: Vec<_> = store::list_kid_assignments(conn, &occurrence_id)?
        .iter()
        .map(kid_assignment_json)
        .collect();
    Ok(json!({ "assignments": rows }))
}

fn parse_buckets(params: &serde_json::Value) -> Result<Vec<KidBucket>, StoreError> {
    let raw = params
        .get("buckets")
        .and_then(|v| v.as_array())
        .ok_or_else(|| StoreError::Validation("missing buckets".to_string()))?;
    raw.iter()
        .map(|entry| {
            Ok(KidBucket {
                driver_assignment_id: required_str(entry, "driverAssignmentId")?,
                kid_ids: required_str_array(entry, "kidIds")?,
            })
        })
        .collect()
}

fn kids_set(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let occurrence_id = required_str(params, "occurrenceId")?;
    let buckets = parse_buckets(params)?;

    let tx = conn.unchecked_transaction()?;
    let rows = reconcile::set_kid_assignments(&tx, &occurrence_id, &buckets)?;
    tx.commit()?;

    let rows: Vec<_> = rows.iter().map(kid_assignment_json).collect();
    Ok(json!({ "assignments": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if !matches!(
        req.method.as_str(),
        "assignments.drivers.list"
            | "assignments.drivers.set"
            | "assignments.kids.list"
            | "assignments.kids.set"
    ) {
        return None;
    }

    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "assignments.drivers.list" => drivers_list(conn, &req.params),
        "assignments.drivers.set" => drivers_set(conn, &req.params),
        "assignments.kids.list" => kids_list(conn, &req.params),
        "assignments.kids.set" => kids_set(conn, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(r) => ok(&req.id, r),
        Err(e) => store_err(&req.id, &req.method, &e),
    })
}
