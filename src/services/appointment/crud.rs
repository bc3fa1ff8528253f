use super::shared::{map_appointment_row, now_db_time, to_db_time, APPOINTMENT_COLUMNS};
use super::AppointmentService;
use crate::models::appointment::{
    validate_times, Appointment, AppointmentStatus, CreateAppointmentInput, UpdateAppointmentInput,
};
use anyhow::{anyhow, Context, Result};
use crate::scheduling::controller::to_local;
use chrono::NaiveDate;
use rusqlite::{self, params};

impl<'a> AppointmentService<'a> {
    /// Book a new appointment. New bookings always start as scheduled.
    pub fn create(&self, input: &CreateAppointmentInput) -> Result<Appointment> {
        input
            .validate(self.granularity_minutes)
            .map_err(|e| anyhow!(e))?;

        let now = now_db_time();
        self.conn
            .execute(
                "INSERT INTO appointments (
                    patient_id, title, description, start_time, end_time,
                    room_id, status, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    input.patient_id,
                    input.title,
                    input.description,
                    to_db_time(&input.start_time),
                    to_db_time(&input.end_time),
                    input.room_id,
                    AppointmentStatus::Scheduled.as_str(),
                    &now,
                    &now,
                ],
            )
            .context("Failed to insert appointment")?;

        let id = self.conn.last_insert_rowid();
        log::info!(
            "Created appointment {} ({} - {}, room {:?})",
            id,
            input.start_time,
            input.end_time,
            input.room_id
        );

        self.get(id)?
            .ok_or_else(|| anyhow!("Appointment with id {} not found", id))
    }

    /// Retrieve an appointment by ID, soft-deleted rows included.
    pub fn get(&self, id: i64) -> Result<Option<Appointment>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS),
            [id],
            map_appointment_row,
        );

        match result {
            Ok(appointment) => Ok(Some(appointment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_live(&self, id: i64) -> Result<Appointment> {
        let appointment = self
            .get(id)?
            .ok_or_else(|| anyhow!("Appointment with id {} not found", id))?;

        if appointment.deleted_at.is_some() {
            return Err(anyhow!("Appointment with id {} has been deleted", id));
        }
        Ok(appointment)
    }

    /// Apply a partial update. An empty update returns the stored row unchanged.
    pub fn update(&self, id: i64, input: &UpdateAppointmentInput) -> Result<Appointment> {
        let existing = self.get_live(id)?;
        if input.is_empty() {
            return Ok(existing);
        }

        input
            .validate(self.granularity_minutes)
            .map_err(|e| anyhow!(e))?;

        let start = input.start_time.unwrap_or(existing.start_time);
        let end = input.end_time.unwrap_or(existing.end_time);
        if input.start_time.is_some() || input.end_time.is_some() {
            validate_times(start, end, self.granularity_minutes).map_err(|e| anyhow!(e))?;
        }

        let title = input.title.as_ref().unwrap_or(&existing.title);
        let description = input.description.as_ref().or(existing.description.as_ref());
        let room_id = input.room_id.or(existing.room_id);
        let status = input.status.unwrap_or(existing.status);

        self.conn
            .execute(
                "UPDATE appointments SET
                    title = ?, description = ?, start_time = ?, end_time = ?,
                    room_id = ?, status = ?, updated_at = ?
                 WHERE id = ? AND deleted_at IS NULL",
                params![
                    title,
                    description,
                    to_db_time(&start),
                    to_db_time(&end),
                    room_id,
                    status.as_str(),
                    now_db_time(),
                    id,
                ],
            )
            .context("Failed to update appointment")?;

        log::info!("Updated appointment {}", id);
        self.get_live(id)
    }

    /// Soft delete: the row stays for history but disappears from listings.
    pub fn delete(&self, id: i64) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE appointments SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now_db_time(), id],
            )
            .context("Failed to delete appointment")?;

        if rows_affected == 0 {
            return Err(anyhow!("Appointment with id {} not found", id));
        }

        log::info!("Deleted appointment {}", id);
        Ok(())
    }

    /// Copy an appointment onto `target_date`, keeping time of day, duration,
    /// room, title and description. The copy starts as scheduled.
    pub fn duplicate(&self, id: i64, target_date: NaiveDate) -> Result<Appointment> {
        let original = self.get_live(id)?;

        let naive_start = target_date.and_time(original.start_time.naive_local().time());
        let start_time = to_local(naive_start);

        let input = CreateAppointmentInput {
            patient_id: original.patient_id,
            title: original.title,
            description: original.description,
            start_time,
            end_time: start_time + (original.end_time - original.start_time),
            room_id: original.room_id,
        };

        self.create(&input)
            .with_context(|| format!("Failed to duplicate appointment {}", id))
    }
}
