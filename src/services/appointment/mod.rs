//! Appointment service entry point.
//! SQLite-backed appointment store: validated CRUD with soft delete, filtered
//! listing and the authoritative room conflict query.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::Connection;

use crate::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointmentInput, UpdateAppointmentInput,
    DEFAULT_GRANULARITY_MINUTES,
};
use crate::scheduling::store::AppointmentStore;

pub mod crud;
pub mod queries;
pub(crate) mod shared;

/// Service for managing appointments stored in SQLite.
pub struct AppointmentService<'a> {
    pub(crate) conn: &'a Connection,
    /// Minute grid that start and end times must sit on
    pub(crate) granularity_minutes: u32,
}

impl<'a> AppointmentService<'a> {
    /// Create a new AppointmentService with a database connection
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
        }
    }

    /// Use the calendar's slot interval as the booking granularity.
    pub fn with_granularity(mut self, minutes: u32) -> Self {
        self.granularity_minutes = minutes.max(1);
        self
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.granularity_minutes
    }
}

impl AppointmentStore for AppointmentService<'_> {
    fn list_appointments(
        &self,
        range_start: DateTime<Local>,
        range_end: DateTime<Local>,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        self.find_in_range(range_start, range_end, filter)
    }

    fn create_appointment(&self, input: &CreateAppointmentInput) -> Result<Appointment> {
        self.create(input)
    }

    fn update_appointment(&self, id: i64, input: &UpdateAppointmentInput) -> Result<Appointment> {
        self.update(id, input)
    }

    fn delete_appointment(&self, id: i64) -> Result<()> {
        self.delete(id)
    }

    fn conflicting_appointments(
        &self,
        room_id: i64,
        start: DateTime<Local>,
        end: DateTime<Local>,
        exclude_id: Option<i64>,
    ) -> Result<Vec<Appointment>> {
        Ok(self
            .check_conflicts(start, end, Some(room_id), exclude_id)?
            .conflicts)
    }

    fn duplicate_appointment(&self, id: i64, target_date: NaiveDate) -> Result<Appointment> {
        self.duplicate(id, target_date)
    }
}
