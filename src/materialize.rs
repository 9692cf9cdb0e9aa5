//! Occurrence materialization: expanding recurring activity templates into
//! dated occurrence rows for a calendar window.
//!
//! Insertion is guarded by the UNIQUE(activity_id, date) constraint via
//! INSERT OR IGNORE, so repeating a window is a no-op: existing rows are
//! never touched and cancellation flags and assignments survive.

use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::cascade::{self, CascadeCounts};
use crate::schedule;
use crate::store::{self, OccurrenceRow, StoreError};

/// Guarantee that every recurring template has one occurrence per matching
/// weekday in [start, end]. Returns the number of rows actually inserted.
/// One-time templates are never part of the sweep; their single occurrence
/// is pinned at creation time.
pub fn ensure_window(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, StoreError> {
    let mut by_day: HashMap<u32, Vec<String>> = HashMap::new();
    {
        let mut stmt = conn.prepare("SELECT id, day FROM activities WHERE is_one_time = 0")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (id, day) in rows {
            by_day.entry(day as u32).or_default().push(id);
        }
    }

    let mut inserted = 0usize;
    let mut insert = conn.prepare(
        "INSERT OR IGNORE INTO activity_instances(id, activity_id, date, is_cancelled)
         VALUES(?, ?, ?, 0)",
    )?;
    for date in schedule::dates_in_window(start, end) {
        let Some(activity_ids) = by_day.get(&schedule::weekday_of(date)) else {
            continue;
        };
        let date_str = date.to_string();
        for activity_id in activity_ids {
            inserted += insert.execute((store::new_id(), activity_id, &date_str))?;
        }
    }
    if inserted > 0 {
        tracing::debug!(start = %start, end = %end, inserted, "materialized occurrences");
    }
    Ok(inserted)
}

/// Occurrence+template join for the window, ordered by (date, time).
/// Callers ensure the window first; the two run in one transaction.
pub fn list_window(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<OccurrenceRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT ai.id, ai.date, ai.is_cancelled, a.id, a.name, a.time, a.location, a.is_one_time
         FROM activity_instances ai
         JOIN activities a ON a.id = ai.activity_id
         WHERE ai.date BETWEEN ? AND ?
         ORDER BY ai.date, a.time",
    )?;
    let rows = stmt
        .query_map(
            (start.to_string(), end.to_string()),
            store::occurrence_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The single pinned occurrence backing a one-time template. Not OR IGNORE:
/// the template was inserted in the same transaction, so a conflict here
/// would be a real bug.
pub fn create_pinned_occurrence(
    conn: &Connection,
    activity_id: &str,
    date: NaiveDate,
) -> Result<String, StoreError> {
    let id = store::new_id();
    conn.execute(
        "INSERT INTO activity_instances(id, activity_id, date, is_cancelled) VALUES(?, ?, ?, 0)",
        (&id, activity_id, date.to_string()),
    )?;
    Ok(id)
}

/// Destructive rebuild: drop every occurrence in the window (assignments
/// first) and re-expand recurring templates from scratch. Cancellation and
/// assignment state in the window is discarded; one-time occurrences are
/// deleted and not rebuilt, since their pinned date only existed on the
/// deleted row.
pub fn regenerate_window(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(CascadeCounts, usize), StoreError> {
    let removed = cascade::purge_window_instances(conn, &start.to_string(), &end.to_string())?;
    let created = ensure_window(conn, start, end)?;
    tracing::info!(
        start = %start,
        end = %end,
        removed = removed.occurrences,
        created,
        "regenerated occurrence window"
    );
    Ok((removed, created))
}
