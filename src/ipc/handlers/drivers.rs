use rusqlite::Connection;
use serde_json::json;

use crate::cascade;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Driver, StoreError};

fn driver_json(d: &Driver) -> serde_json::Value {
    json!({
        "id": d.id,
        "familyName": d.family_name,
        "seatCapacity": d.seat_capacity
    })
}

fn validate_capacity(v: i64) -> Result<i64, StoreError> {
    if v > 0 {
        Ok(v)
    } else {
        Err(StoreError::Validation(format!(
            "seatCapacity must be positive, got {}",
            v
        )))
    }
}

fn drivers_list(conn: &Connection) -> Result<serde_json::Value, StoreError> {
    let drivers: Vec<_> = store::list_drivers(conn)?.iter().map(driver_json).collect();
    Ok(json!({ "drivers": drivers }))
}

fn drivers_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let family_name = required_str(params, "familyName")?;
    let seat_capacity = validate_capacity(required_i64(params, "seatCapacity")?)?;
    let driver = Driver {
        id: store::new_id(),
        family_name,
        seat_capacity,
    };
    conn.execute(
        "INSERT INTO drivers(id, family_name, seat_capacity) VALUES(?, ?, ?)",
        (&driver.id, &driver.family_name, driver.seat_capacity),
    )?;
    Ok(driver_json(&driver))
}

fn drivers_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let driver_id = required_str(params, "driverId")?;
    let family_name = required_str(params, "familyName")?;
    let seat_capacity = validate_capacity(required_i64(params, "seatCapacity")?)?;
    store::fetch_driver(conn, &driver_id)?;
    conn.execute(
        "UPDATE drivers SET family_name = ?, seat_capacity = ? WHERE id = ?",
        (&family_name, seat_capacity, &driver_id),
    )?;
    Ok(driver_json(&Driver {
        id: driver_id,
        family_name,
        seat_capacity,
    }))
}

fn drivers_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let driver_id = required_str(params, "driverId")?;
    let tx = conn.unchecked_transaction()?;
    let driver = cascade::delete_driver(&tx, &driver_id)?;
    tx.commit()?;
    Ok(driver_json(&driver))
}

fn drivers_assignments_remove(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let driver_id = required_str(params, "driverId")?;
    store::fetch_driver(conn, &driver_id)?;
    let tx = conn.unchecked_transaction()?;
    let counts = cascade::remove_driver_assignments(&tx, &driver_id)?;
    tx.commit()?;
    Ok(json!({
        "removedDriverAssignments": counts.driver_assignments,
        "removedKidAssignments": counts.kid_assignments
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if !matches!(
        req.method.as_str(),
        "drivers.list"
            | "drivers.create"
            | "drivers.update"
            | "drivers.delete"
            | "drivers.assignments.remove"
    ) {
        return None;
    }

    if req.method == "drivers.list" {
        let Some(conn) = state.db.as_ref() else {
            return Some(ok(&req.id, json!({ "drivers": [] })));
        };
        return Some(match drivers_list(conn) {
            Ok(r) => ok(&req.id, r),
            Err(e) => store_err(&req.id, &req.method, &e),
        });
    }

    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "drivers.create" => drivers_create(conn, &req.params),
        "drivers.update" => drivers_update(conn, &req.params),
        "drivers.delete" => drivers_delete(conn, &req.params),
        "drivers.assignments.remove" => drivers_assignments_remove(conn, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(r) => ok(&req.id, r),
        Err(e) => store_err(&req.id, &req.method, &e),
    })
}
