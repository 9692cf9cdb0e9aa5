use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

/// Core error taxonomy. Handlers map these onto IPC error codes; anything in
/// `Db` has already rolled back its transaction by the time a caller sees it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{what} not found")]
    NotFound { what: &'static str },
    #[error("{0}")]
    Validation(String),
    #[error("{family_name} has {seat_capacity} seats but {requested} kids were requested")]
    CapacityExceeded {
        family_name: String,
        seat_capacity: i64,
        requested: usize,
    },
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Validation(_) => "bad_params",
            StoreError::CapacityExceeded { .. } => "capacity_exceeded",
            StoreError::Db(_) => "db_failed",
        }
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone)]
pub struct Driver {
    pub id: String,
    pub family_name: String,
    pub seat_capacity: i64,
}

#[derive(Debug, Clone)]
pub struct Kid {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub day: i64,
    pub time: String,
    pub location: String,
    pub is_one_time: bool,
}

/// One occurrence joined with its template, the shape every calendar read returns.
#[derive(Debug, Clone)]
pub struct OccurrenceRow {
    pub id: String,
    pub date: String,
    pub is_cancelled: bool,
    pub activity_id: String,
    pub name: String,
    pub time: String,
    pub location: String,
    pub is_one_time: bool,
}

#[derive(Debug, Clone)]
pub struct DriverAssignmentRow {
    pub id: String,
    pub driver_id: String,
    pub family_name: String,
    pub seat_capacity: i64,
}

#[derive(Debug, Clone)]
pub struct KidAssignmentRow {
    pub id: String,
    pub kid_id: String,
    pub kid_name: String,
    pub driver_assignment_id: String,
    pub driver_id: String,
    pub driver_family_name: String,
}

/// One place a kid currently rides, with enough context to describe it.
#[derive(Debug, Clone)]
pub struct KidRideRow {
    pub assignment_id: String,
    pub driver_assignment_id: String,
    pub occurrence_id: String,
    pub date: String,
}

pub fn list_assignments_for_kid(
    conn: &Connection,
    kid_id: &str,
) -> Result<Vec<KidRideRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT ka.id, da.id, ai.id, ai.date
         FROM kid_assignments ka
         JOIN driver_assignments da ON da.id = ka.driver_assignment_id
         JOIN activity_instances ai ON ai.id = da.activity_instance_id
         WHERE ka.kid_id = ?
         ORDER BY ai.date",
    )?;
    let rows = stmt
        .query_map([kid_id], |r| {
            Ok(KidRideRow {
                assignment_id: r.get(0)?,
                driver_assignment_id: r.get(1)?,
                occurrence_id: r.get(2)?,
                date: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_driver(conn: &Connection, id: &str) -> Result<Driver, StoreError> {
    conn.query_row(
        "SELECT id, family_name, seat_capacity FROM drivers WHERE id = ?",
        [id],
        |r| {
            Ok(Driver {
                id: r.get(0)?,
                family_name: r.get(1)?,
                seat_capacity: r.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::NotFound { what: "driver" })
}

pub fn list_drivers(conn: &Connection) -> Result<Vec<Driver>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, family_name, seat_capacity FROM drivers ORDER BY family_name")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Driver {
                id: r.get(0)?,
                family_name: r.get(1)?,
                seat_capacity: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_kid(conn: &Connection, id: &str) -> Result<Kid, StoreError> {
    conn.query_row("SELECT id, name FROM kids WHERE id = ?", [id], |r| {
        Ok(Kid {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    })
    .optional()?
    .ok_or(StoreError::NotFound { what: "kid" })
}

pub fn list_kids(conn: &Connection) -> Result<Vec<Kid>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, name FROM kids ORDER BY name")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Kid {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn activity_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: r.get(0)?,
        name: r.get(1)?,
        day: r.get(2)?,
        time: r.get(3)?,
        location: r.get(4)?,
        is_one_time: r.get::<_, i64>(5)? != 0,
    })
}

pub fn fetch_activity(conn: &Connection, id: &str) -> Result<Activity, StoreError> {
    conn.query_row(
        "SELECT id, name, day, time, location, is_one_time FROM activities WHERE id = ?",
        [id],
        activity_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound { what: "activity" })
}

pub fn list_activities(conn: &Connection) -> Result<Vec<Activity>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, day, time, location, is_one_time FROM activities ORDER BY day, time",
    )?;
    let rows = stmt
        .query_map([], activity_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn occurrence_exists(conn: &Connection, id: &str) -> Result<(), StoreError> {
    conn.query_row("SELECT 1 FROM activity_instances WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()?
    .map(|_| ())
    .ok_or(StoreError::NotFound { what: "occurrence" })
}

pub fn fetch_occurrence_row(conn: &Connection, id: &str) -> Result<OccurrenceRow, StoreError> {
    conn.query_row(
        "SELECT ai.id, ai.date, ai.is_cancelled, a.id, a.name, a.time, a.location, a.is_one_time
         FROM activity_instances ai
         JOIN activities a ON a.id = ai.activity_id
         WHERE ai.id = ?",
        [id],
        occurrence_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound { what: "occurrence" })
}

pub fn occurrence_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<OccurrenceRow> {
    Ok(OccurrenceRow {
        id: r.get(0)?,
        date: r.get(1)?,
        is_cancelled: r.get::<_, i64>(2)? != 0,
        activity_id: r.get(3)?,
        name: r.get(4)?,
        time: r.get(5)?,
        location: r.get(6)?,
        is_one_time: r.get::<_, i64>(7)? != 0,
    })
}

pub fn list_driver_assignments(
    conn: &Connection,
    occurrence_id: &str,
) -> Result<Vec<DriverAssignmentRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT da.id, d.id, d.family_name, d.seat_capacity
         FROM driver_assignments da
         JOIN drivers d ON d.id = da.driver_id
         WHERE da.activity_instance_id = ?
         ORDER BY d.family_name",
    )?;
    let rows = stmt
        .query_map([occurrence_id], |r| {
            Ok(DriverAssignmentRow {
                id: r.get(0)?,
                driver_id: r.get(1)?,
                family_name: r.get(2)?,
                seat_capacity: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_kid_assignments(
    conn: &Connection,
    occurrence_id: &str,
) -> Result<Vec<KidAssignmentRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT ka.id, ka.kid_id, k.name, da.id, da.driver_id, d.family_name
         FROM kid_assignments ka
         JOIN kids k ON k.id = ka.kid_id
         JOIN driver_assignments da ON da.id = ka.driver_assignment_id
         JOIN drivers d ON d.id = da.driver_id
         WHERE da.activity_instance_id = ?
         ORDER BY d.family_name, k.name",
    )?;
    let rows = stmt
        .query_map([occurrence_id], |r| {
            Ok(KidAssignmentRow {
                id: r.get(0)?,
                kid_id: r.get(1)?,
                kid_name: r.get(2)?,
                driver_assignment_id: r.get(3)?,
                driver_id: r.get(4)?,
                driver_family_name: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
