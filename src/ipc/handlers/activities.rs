use rusqlite::Connection;
use serde_json::json;

use crate::cascade;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{optional_bool, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::materialize;
use crate::schedule;
use crate::store::{self, Activity, StoreError};

fn activity_json(a: &Activity) -> serde_json::Value {
    json!({
        "id": a.id,
        "name": a.name,
        "day": a.day,
        "time": a.time,
        "location": a.location,
        "isRecurring": !a.is_one_time
    })
}

fn activities_list(conn: &Connection) -> Result<serde_json::Value, StoreError> {
    let activities: Vec<_> = store::list_activities(conn)?
        .iter()
        .map(activity_json)
        .collect();
    Ok(json!({ "activities": activities }))
}

fn activities_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let name = required_str(params, "name")?;
    let day = schedule::validate_day(required_i64(params, "day")?)?;
    let time = schedule::validate_time(&required_str(params, "time")?)?;
    let location = required_str(params, "location")?;
    let is_recurring = optional_bool(params, "isRecurring", true);

    // Pin the one-time occurrence date up front so a bad targetDate fails
    // before anything is written.
    let pinned_date = if is_recurring {
        None
    } else {
        Some(match optional_str(params, "targetDate") {
            Some(raw) => schedule::parse_date(&raw, "targetDate")?,
            None => schedule::next_on_or_after(chrono::Local::now().date_naive(), day),
        })
    };

    let activity = Activity {
        id: store::new_id(),
        name,
        day: day as i64,
        time,
        location,
        is_one_time: !is_recurring,
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO activities(id, name, day, time, location, is_one_time) VALUES(?, ?, ?, ?, ?, ?)",
        (
            &activity.id,
            &activity.name,
            activity.day,
            &activity.time,
            &activity.location,
            activity.is_one_time as i64,
        ),
    )?;
    let mut result = activity_json(&activity);
    if let Some(date) = pinned_date {
        let occurrence_id = materialize::create_pinned_occurrence(&tx, &activity.id, date)?;
        result["occurrenceId"] = json!(occurrence_id);
        result["occurrenceDate"] = json!(date.to_string());
    }
    tx.commit()?;
    Ok(result)
}

fn activities_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let activity_id = required_str(params, "activityId")?;
    let name = required_str(params, "name")?;
    let day = schedule::validate_day(required_i64(params, "day")?)?;
    let time = schedule::validate_time(&required_str(params, "time")?)?;
    let location = required_str(params, "location")?;

    let tx = conn.unchecked_transaction()?;
    let current = store::fetch_activity(&tx, &activity_id)?;
    tx.execute(
        "UPDATE activities SET name = ?, day = ?, time = ?, location = ? WHERE id = ?",
        (&name, day as i64, &time, &location, &activity_id),
    )?;

    // A recurrence-day change invalidates the whole occurrence set; the
    // window rematerializes on the next calendar read.
    if current.day != day as i64 {
        let counts = cascade::purge_activity_instances(&tx, &activity_id)?;
        tracing::info!(
            activity = %name,
            from_day = current.day,
            to_day = day,
            occurrences = counts.occurrences,
            "recurrence day changed, purged occurrence set"
        );
    }
    tx.commit()?;

    Ok(activity_json(&Activity {
        id: activity_id,
        name,
        day: day as i64,
        time,
        location,
        is_one_time: current.is_one_time,
    }))
}

fn activities_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let activity_id = required_str(params, "activityId")?;
    let tx = conn.unchecked_transaction()?;
    let activity = cascade::delete_activity(&tx, &activity_id)?;
    tx.commit()?;
    Ok(activity_json(&activity))
}

fn activities_assignments_remove(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, StoreError> {
    let activity_id = required_str(params, "activityId")?;
    store::fetch_activity(conn, &activity_id)?;
    let tx = conn.unchecked_transaction()?;
    let counts = cascade::remove_activity_assignments(&tx, &activity_id)?;
    tx.commit()?;
    Ok(json!({
        "removedDriverAssignments": counts.driver_assignments,
        "removedKidAssignments": counts.kid_assignments
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if !matches!(
        req.method.as_str(),
        "activities.list"
            | "activities.create"
            | "activities.update"
            | "activities.delete"
            | "activities.assignments.remove"
    ) {
        return None;
    }

    if req.method == "activities.list" {
        let Some(conn) = state.db.as_ref() else {
            return Some(ok(&req.id, json!({ "activities": [] })));
        };
        return Some(match activities_list(conn) {
            Ok(r) => ok(&req.id, r),
            Err(e) => store_err(&req.id, &req.method, &e),
        });
    }

    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "activities.create" => activities_create(conn, &req.params),
        "activities.update" => activities_update(conn, &req.params),
        "activities.delete" => activities_delete(conn, &req.params),
        "activities.assignments.remove" => activities_assignments_remove(conn, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(r) => ok(&req.id, r),
        Err(e) => store_err(&req.id, &req.method, &e),
    })
}
