use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{self, types::Type, Result, Row};

use crate::models::appointment::{Appointment, AppointmentStatus};

pub(crate) const APPOINTMENT_COLUMNS: &str = "id, patient_id, title, description, start_time, end_time,
    room_id, status, created_by, created_at, updated_at, deleted_at";

/// Timestamps are stored as UTC RFC 3339 with second precision so that
/// string comparison in SQL matches chronological order.
pub(crate) fn to_db_time(value: &DateTime<Local>) -> String {
    value
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn now_db_time() -> String {
    to_db_time(&Local::now())
}

pub(crate) fn to_local_datetime(value: String) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn optional_local_datetime(value: Option<String>) -> Result<Option<DateTime<Local>>> {
    value.map(to_local_datetime).transpose()
}

pub(crate) fn map_appointment_row(row: &Row<'_>) -> Result<Appointment> {
    let status: String = row.get(7)?;
    let status = status
        .parse::<AppointmentStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        start_time: to_local_datetime(row.get(4)?)?,
        end_time: to_local_datetime(row.get(5)?)?,
        room_id: row.get(6)?,
        status,
        created_by: row.get(8)?,
        created_at: optional_local_datetime(row.get(9)?)?,
        updated_at: optional_local_datetime(row.get(10)?)?,
        deleted_at: optional_local_datetime(row.get(11)?)?,
    })
}
