// Room module
// Treatment/consultation rooms: the exclusive resource appointments are booked into

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ROOM_COLOR: &str = "#1890ff";
pub const MAX_ROOM_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    /// Hex color used when rendering the room's appointments
    pub color: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Local>>,
    pub updated_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomValidationError {
    #[error("Room name cannot be empty")]
    EmptyName,
    #[error("Room name must be {} characters or less", MAX_ROOM_NAME_LEN)]
    NameTooLong,
    #[error("Room capacity must be at least 1")]
    InvalidCapacity,
    #[error("Color must be in hex format (#RRGGBB or #RGB)")]
    InvalidColor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRoomInput {
    pub name: String,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub color: Option<String>,
}

impl CreateRoomInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RoomValidationError> {
        validate_name(&self.name)?;
        validate_capacity(self.capacity)?;
        validate_color(self.color.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRoomInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateRoomInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.capacity.is_none()
            && self.color.is_none()
            && self.is_active.is_none()
    }

    pub fn validate(&self) -> Result<(), RoomValidationError> {
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        validate_capacity(self.capacity)?;
        validate_color(self.color.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomFilter {
    pub active_only: bool,
}

impl Default for RoomFilter {
    fn default() -> Self {
        Self { active_only: true }
    }
}

/// Occupancy snapshot of one room around a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAvailability {
    pub room: Room,
    pub is_available: bool,
    pub next_available: Option<DateTime<Local>>,
    pub current_appointments: Vec<RoomAppointmentSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAppointmentSlot {
    pub appointment_id: i64,
    pub title: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub status: String,
}

fn validate_name(name: &str) -> Result<(), RoomValidationError> {
    if name.trim().is_empty() {
        return Err(RoomValidationError::EmptyName);
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(RoomValidationError::NameTooLong);
    }
    Ok(())
}

fn validate_capacity(capacity: Option<i32>) -> Result<(), RoomValidationError> {
    match capacity {
        Some(capacity) if capacity < 1 => Err(RoomValidationError::InvalidCapacity),
        _ => Ok(()),
    }
}

fn validate_color(color: Option<&str>) -> Result<(), RoomValidationError> {
    let Some(color) = color else {
        return Ok(());
    };

    let hex = color.strip_prefix('#').ok_or(RoomValidationError::InvalidColor)?;
    if (hex.len() == 6 || hex.len() == 3) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(RoomValidationError::InvalidColor)
    }
}
