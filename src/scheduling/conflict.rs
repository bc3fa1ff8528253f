// Conflict checking
// Advisory room double-booking detection; the store makes the binding decision at commit time

use chrono::{DateTime, Local};

use crate::models::appointment::Appointment;

/// The booking being checked: a new range, or an existing appointment being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictCandidate {
    /// Id of the appointment being edited; never compared against itself.
    pub appointment_id: Option<i64>,
    pub resource_id: Option<i64>,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub cancelled: bool,
}

impl ConflictCandidate {
    pub fn new(resource_id: Option<i64>, start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self {
            appointment_id: None,
            resource_id,
            start,
            end,
            cancelled: false,
        }
    }

    /// Marks the candidate as an edit of `appointment_id`.
    pub fn excluding(mut self, appointment_id: i64) -> Self {
        self.appointment_id = Some(appointment_id);
        self
    }
}

impl From<&Appointment> for ConflictCandidate {
    fn from(appointment: &Appointment) -> Self {
        Self {
            appointment_id: Some(appointment.id),
            resource_id: appointment.room_id,
            start: appointment.start_time,
            end: appointment.end_time,
            cancelled: !appointment.is_active(),
        }
    }
}

/// Half-open interval intersection: touching ranges do not overlap.
pub fn intervals_overlap(
    a_start: DateTime<Local>,
    a_end: DateTime<Local>,
    b_start: DateTime<Local>,
    b_end: DateTime<Local>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Whether `candidate` collides with `other`.
pub fn conflicts_with(candidate: &ConflictCandidate, other: &Appointment) -> bool {
    if candidate.cancelled || !other.is_active() {
        return false;
    }
    if candidate.appointment_id == Some(other.id) {
        return false;
    }

    match (candidate.resource_id, other.room_id) {
        (Some(mine), Some(theirs)) if mine == theirs => {
            intervals_overlap(candidate.start, candidate.end, other.start_time, other.end_time)
        }
        _ => false,
    }
}

pub fn has_conflict(candidate: &ConflictCandidate, existing: &[Appointment]) -> bool {
    existing
        .iter()
        .any(|other| conflicts_with(candidate, other))
}

/// Every appointment in `existing` that collides with `candidate`, in input order.
pub fn find_conflicts<'a>(candidate: &ConflictCandidate, existing: &'a [Appointment]) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|other| conflicts_with(candidate, other))
        .collect()
}
