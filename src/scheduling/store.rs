// Store interfaces
// The scheduling engine's view of appointment and room persistence

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};

#[cfg(test)]
use mockall::automock;

use crate::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointmentInput, UpdateAppointmentInput,
};
use crate::models::room::{Room, RoomFilter};

/// Source of truth for appointments.
///
/// `list_appointments` returns every appointment intersecting
/// `[range_start, range_end)` that passes `filter`; the range arguments take
/// precedence over any dates inside the filter.
#[cfg_attr(test, automock)]
pub trait AppointmentStore {
    fn list_appointments(
        &self,
        range_start: DateTime<Local>,
        range_end: DateTime<Local>,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>>;

    fn create_appointment(&self, input: &CreateAppointmentInput) -> Result<Appointment>;

    fn update_appointment(&self, id: i64, input: &UpdateAppointmentInput) -> Result<Appointment>;

    fn delete_appointment(&self, id: i64) -> Result<()>;

    /// Live appointments holding `room_id` anywhere in `[start, end)`, other
    /// than `exclude_id`. This is the binding check made right before a
    /// booking is committed, independent of what the view has loaded.
    fn conflicting_appointments(
        &self,
        room_id: i64,
        start: DateTime<Local>,
        end: DateTime<Local>,
        exclude_id: Option<i64>,
    ) -> Result<Vec<Appointment>>;

    /// Copies appointment `id` onto `target_date` at the same time of day.
    fn duplicate_appointment(&self, id: i64, target_date: NaiveDate) -> Result<Appointment>;
}

/// Source of rooms, used only to resolve display name and color.
#[cfg_attr(test, automock)]
pub trait ResourceStore {
    fn list_resources(&self, filter: &RoomFilter) -> Result<Vec<Room>>;
}
