//! Ordered dependent deletion. Every rule walks the ownership tree
//! bottom-up (kid assignments, then driver assignments, then occurrences,
//! then the parent row) with explicit SQL rather than engine-level
//! ON DELETE CASCADE, and always inside the caller's transaction.

use rusqlite::Connection;

use crate::store::{self, Activity, Driver, Kid, StoreError};

#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeCounts {
    pub kid_assignments: usize,
    pub driver_assignments: usize,
    pub occurrences: usize,
}

/// Strip one occurrence of its assignments, keeping the occurrence row.
/// Used when an occurrence is cancelled.
pub fn remove_occurrence_assignments(
    conn: &Connection,
    occurrence_id: &str,
) -> Result<CascadeCounts, StoreError> {
    let kid_assignments = conn.execute(
        "DELETE FROM kid_assignments
         WHERE driver_assignment_id IN (
           SELECT id FROM driver_assignments WHERE activity_instance_id = ?
         )",
        [occurrence_id],
    )?;
    let driver_assignments = conn.execute(
        "DELETE FROM driver_assignments WHERE activity_instance_id = ?",
        [occurrence_id],
    )?;
    Ok(CascadeCounts {
        kid_assignments,
        driver_assignments,
        occurrences: 0,
    })
}

/// Remove every assignment referencing a driver, across all occurrences.
pub fn remove_driver_assignments(
    conn: &Connection,
    driver_id: &str,
) -> Result<CascadeCounts, StoreError> {
    let kid_assignments = conn.execute(
        "DELETE FROM kid_assignments
         WHERE driver_assignment_id IN (
           SELECT id FROM driver_assignments WHERE driver_id = ?
         )",
        [driver_id],
    )?;
    let driver_assignments = conn.execute(
        "DELETE FROM driver_assignments WHERE driver_id = ?",
        [driver_id],
    )?;
    Ok(CascadeCounts {
        kid_assignments,
        driver_assignments,
        occurrences: 0,
    })
}

/// Remove every assignment referencing a kid.
pub fn remove_kid_assignments(conn: &Connection, kid_id: &str) -> Result<usize, StoreError> {
    Ok(conn.execute("DELETE FROM kid_assignments WHERE kid_id = ?", [kid_id])?)
}

/// Remove every assignment under an activity's occurrences, keeping the
/// occurrences themselves.
pub fn remove_activity_assignments(
    conn: &Connection,
    activity_id: &str,
) -> Result<CascadeCounts, StoreError> {
    let kid_assignments = conn.execute(
        "DELETE FROM kid_assignments
         WHERE driver_assignment_id IN (
           SELECT da.id
           FROM driver_assignments da
           JOIN activity_instances ai ON ai.id = da.activity_instance_id
           WHERE ai.activity_id = ?
         )",
        [activity_id],
    )?;
    let driver_assignments = conn.execute(
        "DELETE FROM driver_assignments
         WHERE activity_instance_id IN (
           SELECT id FROM activity_instances WHERE activity_id = ?
         )",
        [activity_id],
    )?;
    Ok(CascadeCounts {
        kid_assignments,
        driver_assignments,
        occurrences: 0,
    })
}

/// Drop an activity's entire occurrence set, assignments first. Used when a
/// template is deleted or its recurrence day changes; the window
/// rematerializes on the next calendar read.
pub fn purge_activity_instances(
    conn: &Connection,
    activity_id: &str,
) -> Result<CascadeCounts, StoreError> {
    let mut counts = remove_activity_assignments(conn, activity_id)?;
    counts.occurrences = conn.execute(
        "DELETE FROM activity_instances WHERE activity_id = ?",
        [activity_id],
    )?;
    Ok(counts)
}

/// Drop every occurrence in a date window, assignments first. The
/// destructive half of `occurrences.regenerate`.
pub fn purge_window_instances(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<CascadeCounts, StoreError> {
    let kid_assignments = conn.execute(
        "DELETE FROM kid_assignments
         WHERE driver_assignment_id IN (
           SELECT da.id
           FROM driver_assignments da
           JOIN activity_instances ai ON ai.id = da.activity_instance_id
           WHERE ai.date BETWEEN ? AND ?
         )",
        [start, end],
    )?;
    let driver_assignments = conn.execute(
        "DELETE FROM driver_assignments
         WHERE activity_instance_id IN (
           SELECT id FROM activity_instances WHERE date BETWEEN ? AND ?
         )",
        [start, end],
    )?;
    let occurrences = conn.execute(
        "DELETE FROM activity_instances WHERE date BETWEEN ? AND ?",
        [start, end],
    )?;
    Ok(CascadeCounts {
        kid_assignments,
        driver_assignments,
        occurrences,
    })
}

pub fn delete_driver(conn: &Connection, driver_id: &str) -> Result<Driver, StoreError> {
    let driver = store::fetch_driver(conn, driver_id)?;
    let counts = remove_driver_assignments(conn, driver_id)?;
    conn.execute("DELETE FROM drivers WHERE id = ?", [driver_id])?;
    tracing::info!(
        driver = %driver.family_name,
        driver_assignments = counts.driver_assignments,
        kid_assignments = counts.kid_assignments,
        "deleted driver"
    );
    Ok(driver)
}

pub fn delete_kid(conn: &Connection, kid_id: &str) -> Result<Kid, StoreError> {
    let kid = store::fetch_kid(conn, kid_id)?;
    let removed = remove_kid_assignments(conn, kid_id)?;
    conn.execute("DELETE FROM kids WHERE id = ?", [kid_id])?;
    tracing::info!(kid = %kid.name, kid_assignments = removed, "deleted kid");
    Ok(kid)
}

pub fn delete_activity(conn: &Connection, activity_id: &str) -> Result<Activity, StoreError> {
    let activity = store::fetch_activity(conn, activity_id)?;
    let counts = purge_activity_instances(conn, activity_id)?;
    conn.execute("DELETE FROM activities WHERE id = ?", [activity_id])?;
    tracing::info!(
        activity = %activity.name,
        occurrences = counts.occurrences,
        driver_assignments = counts.driver_assignments,
        kid_assignments = counts.kid_assignments,
        "deleted activity"
    );
    Ok(activity)
}
