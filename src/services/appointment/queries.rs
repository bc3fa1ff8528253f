use super::shared::{map_appointment_row, to_db_time, APPOINTMENT_COLUMNS};
use super::AppointmentService;
use crate::models::appointment::{
    Appointment, AppointmentFilter, AppointmentListResponse, AppointmentStatus,
    ConflictCheckResponse,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use rusqlite::{self, params_from_iter, types::Value};

/// WHERE clause and bound values built from an [`AppointmentFilter`].
struct FilterClause {
    sql: String,
    values: Vec<Value>,
}

impl FilterClause {
    fn from_filter(filter: &AppointmentFilter) -> Self {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values = Vec::new();

        if !filter.include_deleted {
            conditions.push("deleted_at IS NULL");
        }
        if filter.excludes_cancelled() {
            conditions.push("status != 'cancelled'");
        }
        // Range filters select anything intersecting [start_date, end_date)
        if let Some(start) = filter.start_date {
            conditions.push("end_time > ?");
            values.push(Value::Text(to_db_time(&start)));
        }
        if let Some(end) = filter.end_date {
            conditions.push("start_time < ?");
            values.push(Value::Text(to_db_time(&end)));
        }
        if let Some(patient_id) = filter.patient_id {
            conditions.push("patient_id = ?");
            values.push(Value::Integer(patient_id));
        }
        if let Some(room_id) = filter.room_id {
            conditions.push("room_id = ?");
            values.push(Value::Integer(room_id));
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }

        let sql = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Self { sql, values }
    }
}

impl<'a> AppointmentService<'a> {
    /// List appointments matching `filter`, ordered by start time.
    ///
    /// `limit = None` returns every match after `offset`.
    pub fn list(
        &self,
        filter: &AppointmentFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<AppointmentListResponse> {
        let clause = FilterClause::from_filter(filter);
        let offset = offset.max(0);

        let total: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM appointments {}", clause.sql),
                params_from_iter(clause.values.iter()),
                |row| row.get(0),
            )
            .context("Failed to count appointments")?;

        let mut values = clause.values.clone();
        // SQLite treats a negative LIMIT as "no limit"
        values.push(Value::Integer(limit.unwrap_or(-1)));
        values.push(Value::Integer(offset));

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM appointments {} ORDER BY start_time ASC, id ASC LIMIT ? OFFSET ?",
                APPOINTMENT_COLUMNS, clause.sql
            ))
            .context("Failed to prepare appointment listing")?;

        let appointments = stmt
            .query_map(params_from_iter(values.iter()), map_appointment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list appointments")?;

        let has_more = offset + (appointments.len() as i64) < total;
        Ok(AppointmentListResponse {
            appointments,
            total,
            has_more,
        })
    }

    /// Every appointment intersecting `[start, end)` that passes `filter`.
    pub fn find_in_range(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        let filter = AppointmentFilter {
            start_date: Some(start),
            end_date: Some(end),
            ..filter.clone()
        };
        Ok(self.list(&filter, None, 0)?.appointments)
    }

    /// Authoritative conflict query used at commit time.
    ///
    /// Only live appointments in the same room count; cancelled and completed
    /// ones have released the room. Without a room nothing can conflict.
    pub fn check_conflicts(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
        room_id: Option<i64>,
        exclude_id: Option<i64>,
    ) -> Result<ConflictCheckResponse> {
        if end <= start {
            return Err(anyhow!("End time must be after start time"));
        }

        let Some(room_id) = room_id else {
            return Ok(ConflictCheckResponse {
                has_conflicts: false,
                conflicts: Vec::new(),
            });
        };

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM appointments
                 WHERE deleted_at IS NULL
                   AND status NOT IN (?1, ?2)
                   AND room_id = ?3
                   AND start_time < ?4
                   AND end_time > ?5
                   AND (?6 IS NULL OR id != ?6)
                 ORDER BY start_time ASC, id ASC",
                APPOINTMENT_COLUMNS
            ))
            .context("Failed to prepare conflict query")?;

        let conflicts = stmt
            .query_map(
                rusqlite::params![
                    AppointmentStatus::Cancelled.as_str(),
                    AppointmentStatus::Completed.as_str(),
                    room_id,
                    to_db_time(&end),
                    to_db_time(&start),
                    exclude_id,
                ],
                map_appointment_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to check appointment conflicts")?;

        if !conflicts.is_empty() {
            log::debug!(
                "{} conflict(s) in room {} for {} - {}",
                conflicts.len(),
                room_id,
                start,
                end
            );
        }

        Ok(ConflictCheckResponse {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
        })
    }
}
