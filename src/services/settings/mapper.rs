use crate::models::settings::{ConflictPolicy, Settings};
use rusqlite::Row;

pub const SETTINGS_COLUMNS: &str = "id, slot_interval_minutes, day_start_time, day_end_time,
    current_view, conflict_policy, show_cancelled, default_appointment_duration";

pub fn row_to_settings(row: &Row) -> Result<Settings, rusqlite::Error> {
    let policy: String = row.get(5)?;

    Ok(Settings {
        id: Some(row.get(0)?),
        slot_interval_minutes: row.get(1)?,
        day_start_time: row.get(2)?,
        day_end_time: row.get(3)?,
        current_view: row.get(4)?,
        // Unknown values from older builds fall back to the default policy
        conflict_policy: policy.parse().unwrap_or_else(|_| ConflictPolicy::default()),
        show_cancelled: row.get::<_, i32>(6)? != 0,
        default_appointment_duration: row.get(7)?,
    })
}
