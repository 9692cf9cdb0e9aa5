use rusqlite::Connection;
use serde_json::json;

use crate::cascade;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::materialize;
use crate::schedule;
use crate::store::{self, OccurrenceRow, StoreError};

fn occurrence_json(o: &OccurrenceRow) -> serde_json::Value {
    json!({
        "id": o.id,
        "date": o.date,
        "isCancelled": o.is_cancelled,
        "activityId": o.activity_id,
        "name": o.name,
        "time": o.time,
        "location": o.location,
        "isOneTime": o.is_one_time
    })
}

/// Ensure-then-read for a calendar window, as one transaction. A reversed
/// window is an empty result, not an error.
fn occurrences_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let start = schedule::parse_date(&required_str(params, "startDate")?, "startDate")?;
    let end = schedule::parse_date(&required_str(params, "endDate")?, "endDate")?;
    if end < start {
        return Ok(json!({ "occurrences": [] }));
    }

    let tx = conn.unchecked_transaction()?;
    materialize::ensure_window(&tx, start, end)?;
    let rows = materialize::list_window(&tx, start, end)?;
    tx.commit()?;

    let occurrences: Vec<_> = rows.iter().map(occurrence_json).collect();
    Ok(json!({ "occurrences": occurrences }))
}

fn occurrences_toggle_cancelled(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let occurrence_id = required_str(params, "occurrenceId")?;

    let tx = conn.unchecked_transaction()?;
    let current = store::fetch_occurrence_row(&tx, &occurrence_id)?;
    let now_cancelled = !current.is_cancelled;
    tx.execute(
        "UPDATE activity_instances SET is_cancelled = ? WHERE id = ?",
        (now_cancelled as i64, &occurrence_id),
    )?;
    // Cancelling frees every seat; uncancelling does not bring them back.
    if now_cancelled {
        let counts = cascade::remove_occurrence_assignments(&tx, &occurrence_id)?;
        tracing::info!(
            occurrence = %occurrence_id,
            driver_assignments = counts.driver_assignments,
            kid_assignments = counts.kid_assignments,
            "occurrence cancelled"
        );
    }
    let refreshed = store::fetch_occurrence_row(&tx, &occurrence_id)?;
    tx.commit()?;

    Ok(occurrence_json(&refreshed))
}

fn occurrences_regenerate(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let start = schedule::parse_date(&required_str(params, "startDate")?, "startDate")?;
    let end = schedule::parse_date(&required_str(params, "endDate")?, "endDate")?;
    if end < start {
        return Ok(json!({ "removedOccurrences": 0, "createdOccurrences": 0 }));
    }

    let tx = conn.unchecked_transaction()?;
    let (removed, created) = materialize::regenerate_window(&tx, start, end)?;
    tx.commit()?;

    Ok(json!({
        "removedOccurrences": removed.occurrences,
        "removedDriverAssignments": removed.driver_assignments,
        "removedKidAssignments": removed.kid_assignments,
        "createdOccurrences": created
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if !matches!(
        req.method.as_str(),
        "occurrences.list" | "occurrences.toggleCancelled" | "occurrences.regenerate"
    ) {
        return None;
    }

    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "occurrences.list" => occurrences_list(conn, &req.params),
        "occurrences.toggleCancelled" => occurrences_toggle_cancelled(conn, &req.params),
        "occurrences.regenerate" => occurrences_regenerate(conn, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(r) => ok(&req.id, r),
        Err(e) => store_err(&req.id, &req.method, &e),
    })
}
