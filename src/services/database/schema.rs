use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_settings_table(conn)?;
    run_settings_migrations(conn)?;
    insert_default_settings(conn)?;
    create_rooms_table(conn)?;
    create_appointments_table(conn)?;
    create_appointment_indexes(conn)?;
    Ok(())
}

fn create_settings_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            slot_interval_minutes INTEGER NOT NULL DEFAULT 15,
            day_start_time TEXT NOT NULL DEFAULT '07:00',
            day_end_time TEXT NOT NULL DEFAULT '20:00',
            current_view TEXT NOT NULL DEFAULT 'Day',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create settings table")?;

    Ok(())
}

// Columns added after the first release of the settings table
fn run_settings_migrations(conn: &Connection) -> Result<()> {
    migrations::ensure_column(
        conn,
        "settings",
        "conflict_policy",
        "ALTER TABLE settings ADD COLUMN conflict_policy TEXT NOT NULL DEFAULT 'warn'",
    )?;

    migrations::ensure_column(
        conn,
        "settings",
        "show_cancelled",
        "ALTER TABLE settings ADD COLUMN show_cancelled INTEGER NOT NULL DEFAULT 1",
    )?;

    migrations::ensure_column(
        conn,
        "settings",
        "default_appointment_duration",
        "ALTER TABLE settings ADD COLUMN default_appointment_duration INTEGER NOT NULL DEFAULT 30",
    )?;

    Ok(())
}

fn insert_default_settings(conn: &Connection) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO settings (id) VALUES (1)", [])
        .context("Failed to insert default settings")?;

    Ok(())
}

fn create_rooms_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            capacity INTEGER NOT NULL DEFAULT 1 CHECK (capacity >= 1),
            color TEXT NOT NULL DEFAULT '#1890ff',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create rooms table")?;

    Ok(())
}

fn create_appointments_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            room_id INTEGER REFERENCES rooms(id),
            status TEXT NOT NULL DEFAULT 'scheduled',
            created_by TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        )",
        [],
    )
    .context("Failed to create appointments table")?;

    Ok(())
}

fn create_appointment_indexes(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_start ON appointments(start_time)",
        [],
    )
    .context("Failed to create appointment start index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_room ON appointments(room_id, start_time)",
        [],
    )
    .context("Failed to create appointment room index")?;

    Ok(())
}
