// Appointment module
// Clinic appointment model plus the request/filter types used by the appointment store

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default booking granularity in minutes.
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 15;
/// Longest appointment the clinic will book.
pub const MAX_DURATION_HOURS: i64 = 8;
/// Longest title accepted by the store.
pub const MAX_TITLE_LEN: usize = 200;

/// A scheduled visit, optionally bound to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    /// Opaque reference into the patient records; not resolved here.
    pub patient_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub room_id: Option<i64>,
    pub status: AppointmentStatus,
    pub created_by: String,
    pub created_at: Option<DateTime<Local>>,
    pub updated_at: Option<DateTime<Local>>,
    pub deleted_at: Option<DateTime<Local>>,
}

impl Appointment {
    /// Create an unsaved appointment with the required fields.
    ///
    /// # Examples
    /// ```
    /// use vet_calendar::models::appointment::Appointment;
    /// use chrono::{Duration, Local};
    ///
    /// let start = Local::now();
    /// let appointment = Appointment::new(0, 7, "Vaccination", start, start + Duration::minutes(30));
    /// assert!(appointment.is_active());
    /// ```
    pub fn new(
        id: i64,
        patient_id: i64,
        title: impl Into<String>,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
    ) -> Self {
        Self {
            id,
            patient_id,
            title: title.into(),
            description: None,
            start_time,
            end_time,
            room_id: None,
            status: AppointmentStatus::Scheduled,
            created_by: String::new(),
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    /// Builder-style room assignment.
    pub fn in_room(mut self, room_id: i64) -> Self {
        self.room_id = Some(room_id);
        self
    }

    /// Builder-style status assignment.
    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }

    /// Not cancelled and not soft-deleted.
    pub fn is_active(&self) -> bool {
        !self.is_cancelled() && self.deleted_at.is_none()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Reasons an appointment request is rejected before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppointmentValidationError {
    #[error("Title must be {} characters or less", MAX_TITLE_LEN)]
    TitleTooLong,
    #[error("End time must be after start time")]
    EndBeforeStart,
    #[error("Start time must be on a {0}-minute interval")]
    StartNotAligned(u32),
    #[error("End time must be on a {0}-minute interval")]
    EndNotAligned(u32),
    #[error("Appointment must be at least {0} minutes long")]
    TooShort(u32),
    #[error("Appointment cannot exceed {} hours", MAX_DURATION_HOURS)]
    TooLong,
    #[error("Unknown appointment status '{0}'")]
    UnknownStatus(String),
}

/// Fields accepted when booking a new appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAppointmentInput {
    pub patient_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub room_id: Option<i64>,
}

impl CreateAppointmentInput {
    pub fn validate(&self, granularity_minutes: u32) -> Result<(), AppointmentValidationError> {
        validate_title(&self.title)?;
        validate_times(self.start_time, self.end_time, granularity_minutes)
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAppointmentInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub room_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
}

impl UpdateAppointmentInput {
    /// Reschedule to a new time range, keeping everything else.
    pub fn reschedule(start_time: DateTime<Local>, end_time: DateTime<Local>) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.room_id.is_none()
            && self.status.is_none()
    }

    pub fn validate(&self, granularity_minutes: u32) -> Result<(), AppointmentValidationError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }

        // Times are only checked together; a lone bound is checked against the stored row
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            validate_times(start, end, granularity_minutes)?;
        }

        Ok(())
    }
}

/// Query filter for listing appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub start_date: Option<DateTime<Local>>,
    pub end_date: Option<DateTime<Local>>,
    pub patient_id: Option<i64>,
    pub room_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub include_deleted: bool,
    pub include_cancelled: Option<bool>,
}

impl AppointmentFilter {
    /// Filter restricted to the appointments intersecting `[start, end)`.
    pub fn for_range(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Self::default()
        }
    }

    /// Cancelled rows are hidden unless requested or filtered on explicitly.
    pub fn excludes_cancelled(&self) -> bool {
        self.include_cancelled != Some(true) && self.status != Some(AppointmentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflicts: bool,
    pub conflicts: Vec<Appointment>,
}

fn validate_title(title: &str) -> Result<(), AppointmentValidationError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppointmentValidationError::TitleTooLong);
    }
    Ok(())
}

/// Shared time checks for create and update requests.
pub fn validate_times(
    start: DateTime<Local>,
    end: DateTime<Local>,
    granularity_minutes: u32,
) -> Result<(), AppointmentValidationError> {
    let granularity = granularity_minutes.max(1);

    if end <= start {
        return Err(AppointmentValidationError::EndBeforeStart);
    }

    if start.minute() % granularity != 0 || start.second() != 0 {
        return Err(AppointmentValidationError::StartNotAligned(granularity));
    }
    if end.minute() % granularity != 0 || end.second() != 0 {
        return Err(AppointmentValidationError::EndNotAligned(granularity));
    }

    let duration = end - start;
    if duration.num_minutes() < i64::from(granularity) {
        return Err(AppointmentValidationError::TooShort(granularity));
    }
    if duration > chrono::Duration::hours(MAX_DURATION_HOURS) {
        return Err(AppointmentValidationError::TooLong);
    }

    Ok(())
}
