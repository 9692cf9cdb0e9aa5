use rusqlite::Connection;
use serde_json::json;

use crate::cascade;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Kid, StoreError};

fn kid_json(k: &Kid) -> serde_json::Value {
    json!({ "id": k.id, "name": k.name })
}

fn kids_list(conn: &Connection) -> Result<serde_json::Value, StoreError> {
    let kids: Vec<_> = store::list_kids(conn)?.iter().map(kid_json).collect();
    Ok(json!({ "kids": kids }))
}

fn kids_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let name = required_str(params, "name")?;
    let kid = Kid {
        id: store::new_id(),
        name,
    };
    conn.execute(
        "INSERT INTO kids(id, name) VALUES(?, ?)",
        (&kid.id, &kid.name),
    )?;
    Ok(kid_json(&kid))
}

fn kids_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let kid_id = required_str(params, "kidId")?;
    let name = required_str(params, "name")?;
    store::fetch_kid(conn, &kid_id)?;
    conn.execute("UPDATE kids SET name = ? WHERE id = ?", (&name, &kid_id))?;
    Ok(kid_json(&Kid { id: kid_id, name }))
}

fn kids_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let kid_id = required_str(params, "kidId")?;
    let tx = conn.unchecked_transaction()?;
    let kid = cascade::delete_kid(&tx, &kid_id)?;
    tx.commit()?;
    Ok(kid_json(&kid))
}

/// Where a kid currently rides, so the UI can warn before deleting.
fn kids_assignments_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let kid_id = required_str(params, "kidId")?;
    store::fetch_kid(conn, &kid_id)?;
    let assignments: Vec<_> = store::list_assignments_for_kid(conn, &kid_id)?
        .iter()
        .map(|a| {
            json!({
                "assignmentId": a.assignment_id,
                "driverAssignmentId": a.driver_assignment_id,
                "occurrenceId": a.occurrence_id,
                "date": a.date
            })
        })
        .collect();
    Ok(json!({ "assignments": assignments }))
}

fn kids_assignments_remove(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let kid_id = required_str(params, "kidId")?;
    store::fetch_kid(conn, &kid_id)?;
    let tx = conn.unchecked_transaction()?;
    let removed = cascade::remove_kid_assignments(&tx, &kid_id)?;
    tx.commit()?;
    Ok(json!({ "removedKidAssignments": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if !matches!(
        req.method.as_str(),
        "kids.list"
            | "kids.create"
            | "kids.update"
            | "kids.delete"
            | "kids.assignments.list"
            | "kids.assignments.remove"
    ) {
        return None;
    }

    if req.method == "kids.list" {
        let Some(conn) = state.db.as_ref() else {
            return Some(ok(&req.id, json!({ "kids": [] })));
        };
        return Some(match kids_list(conn) {
            Ok(r) => ok(&req.id, r),
            Err(e) => store_err(&req.id, &req.method, &e),
        });
    }

    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "kids.create" => kids_create(conn, &req.params),
        "kids.update" => kids_update(conn, &req.params),
        "kids.delete" => kids_delete(conn, &req.params),
        "kids.assignments.list" => kids_assignments_list(conn, &req.params),
        "kids.assignments.remove" => kids_assignments_remove(conn, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(r) => ok(&req.id, r),
        Err(e) => store_err(&req.id, &req.method, &e),
    })
}
