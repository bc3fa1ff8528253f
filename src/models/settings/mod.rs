// Settings module
// Persisted calendar preferences (single row in the settings table)

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Slot widths the calendar grid supports; each divides an hour evenly.
pub const SUPPORTED_SLOT_INTERVALS: [u32; 6] = [5, 10, 15, 20, 30, 60];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: Option<i64>,
    /// Width of one calendar slot in minutes
    pub slot_interval_minutes: u32,
    /// First visible time of day, "HH:MM"
    pub day_start_time: String,
    /// End of the visible range, "HH:MM"; "24:00" means midnight
    pub day_end_time: String,
    pub current_view: String,
    pub conflict_policy: ConflictPolicy,
    pub show_cancelled: bool,
    /// Minutes used when an appointment is created without a drag
    pub default_appointment_duration: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: Some(1),
            slot_interval_minutes: 15,
            day_start_time: "07:00".to_string(),
            day_end_time: "20:00".to_string(),
            current_view: "Day".to_string(),
            conflict_policy: ConflictPolicy::Warn,
            show_cancelled: true,
            default_appointment_duration: 30,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if !SUPPORTED_SLOT_INTERVALS.contains(&self.slot_interval_minutes) {
            return Err(format!(
                "Slot interval must be one of {:?} minutes",
                SUPPORTED_SLOT_INTERVALS
            ));
        }

        let start = parse_minutes_of_day(&self.day_start_time)
            .ok_or_else(|| format!("Invalid day start time '{}'", self.day_start_time))?;
        let end = parse_minutes_of_day(&self.day_end_time)
            .ok_or_else(|| format!("Invalid day end time '{}'", self.day_end_time))?;

        if end <= start {
            return Err("Day end time must be after day start time".to_string());
        }

        if start % self.slot_interval_minutes != 0 {
            return Err(format!(
                "Day start time must fall on a {}-minute slot boundary",
                self.slot_interval_minutes
            ));
        }

        if (end - start) < self.slot_interval_minutes {
            return Err("Visible range must hold at least one slot".to_string());
        }

        if !matches!(self.current_view.as_str(), "Day" | "Week") {
            return Err(format!("Unknown view '{}'", self.current_view));
        }

        if self.default_appointment_duration == 0
            || self.default_appointment_duration % self.slot_interval_minutes != 0
        {
            return Err("Default duration must be a positive multiple of the slot interval".to_string());
        }

        Ok(())
    }

    pub fn day_start(&self) -> NaiveTime {
        parse_minutes_of_day(&self.day_start_time)
            .and_then(|minutes| NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0))
            .unwrap_or(NaiveTime::MIN)
    }

    /// Length of the visible range in minutes; falls back to the whole day.
    pub fn visible_minutes(&self) -> u32 {
        match (
            parse_minutes_of_day(&self.day_start_time),
            parse_minutes_of_day(&self.day_end_time),
        ) {
            (Some(start), Some(end)) if end > start => end - start,
            _ => 24 * 60,
        }
    }
}

/// Parses "HH:MM" into minutes since midnight, accepting "24:00".
pub fn parse_minutes_of_day(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;

    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return None;
    }

    Some(hours * 60 + minutes)
}

/// What the calendar does when a new booking collides with an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Refuse to create the appointment
    Block,
    /// Create it anyway and surface the conflicts
    #[default]
    Warn,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Block => "block",
            ConflictPolicy::Warn => "warn",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "block" => Ok(ConflictPolicy::Block),
            "warn" => Ok(ConflictPolicy::Warn),
            other => Err(format!("Unknown conflict policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_unsupported_interval_rejected() {
        let settings = Settings {
            slot_interval_minutes: 7,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let settings = Settings {
            day_start_time: "18:00".to_string(),
            day_end_time: "08:00".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_full_day_range() {
        let settings = Settings {
            day_start_time: "00:00".to_string(),
            day_end_time: "24:00".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.visible_minutes(), 1440);
        assert_eq!(settings.day_start(), NaiveTime::MIN);
    }

    #[test_case("07:10", 15, false ; "ten past on quarter hours")]
    #[test_case("07:45", 15, true ; "quarter to on quarter hours")]
    #[test_case("07:45", 30, false ; "quarter to on half hours")]
    #[test_case("07:20", 20, true ; "twenty past on twenty minutes")]
    #[test_case("07:30", 60, false ; "half past on hours")]
    fn test_day_start_must_sit_on_slot_edge(start: &str, interval: u32, valid: bool) {
        let settings = Settings {
            slot_interval_minutes: interval,
            day_start_time: start.to_string(),
            default_appointment_duration: 60,
            ..Settings::default()
        };
        assert_eq!(settings.validate().is_ok(), valid);
    }

    #[test]
    fn test_parse_minutes_of_day() {
        assert_eq!(parse_minutes_of_day("07:30"), Some(450));
        assert_eq!(parse_minutes_of_day("24:00"), Some(1440));
        assert_eq!(parse_minutes_of_day("24:30"), None);
        assert_eq!(parse_minutes_of_day("9"), None);
        assert_eq!(parse_minutes_of_day("09:60"), None);
    }

    #[test]
    fn test_conflict_policy_parsing() {
        assert_eq!("Block".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Block));
        assert_eq!("warn".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Warn));
        assert!("ignore".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_default_duration_must_align() {
        let settings = Settings {
            slot_interval_minutes: 20,
            default_appointment_duration: 30,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
