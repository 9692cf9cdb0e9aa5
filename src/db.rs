use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("carpool.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS drivers(
            id TEXT PRIMARY KEY,
            family_name TEXT NOT NULL,
            seat_capacity INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kids(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activities(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            day INTEGER NOT NULL,
            time TEXT NOT NULL,
            location TEXT NOT NULL,
            is_one_time INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Existing workspaces may predate one-time activities. Add the column if needed.
    ensure_activities_is_one_time(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activity_instances(
            id TEXT PRIMARY KEY,
            activity_id TEXT NOT NULL,
            date TEXT NOT NULL,
            is_cancelled INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(activity_id) REFERENCES activities(id),
            UNIQUE(activity_id, date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_instances_activity ON activity_instances(activity_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_instances_date ON activity_instances(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS driver_assignments(
            id TEXT PRIMARY KEY,
            activity_instance_id TEXT NOT NULL,
            driver_id TEXT NOT NULL,
            FOREIGN KEY(activity_instance_id) REFERENCES activity_instances(id),
            FOREIGN KEY(driver_id) REFERENCES drivers(id),
            UNIQUE(activity_instance_id, driver_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_driver_assignments_instance ON driver_assignments(activity_instance_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_driver_assignments_driver ON driver_assignments(driver_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kid_assignments(
            id TEXT PRIMARY KEY,
            driver_assignment_id TEXT NOT NULL,
            kid_id TEXT NOT NULL,
            FOREIGN KEY(driver_assignment_id) REFERENCES driver_assignments(id),
            FOREIGN KEY(kid_id) REFERENCES kids(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_kid_assignments_assignment ON kid_assignments(driver_assignment_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_kid_assignments_kid ON kid_assignments(kid_id)",
        [],
    )?;

    Ok(conn)
}

fn ensure_activities_is_one_time(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "activities", "is_one_time")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE activities ADD COLUMN is_one_time INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
