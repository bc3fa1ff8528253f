// Parameterized validation cases for appointment time and title rules

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use test_case::test_case;
use vet_calendar::models::appointment::{
    validate_times, AppointmentStatus, AppointmentValidationError, CreateAppointmentInput,
    MAX_TITLE_LEN,
};

fn at(hour: u32, minute: u32) -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(2024, 6, 14)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap();
    Local.from_local_datetime(&naive).earliest().unwrap()
}

#[test_case((9, 0), (9, 15), 15 ; "one slot")]
#[test_case((9, 0), (17, 0), 15 ; "full working day")]
#[test_case((9, 5), (9, 10), 5 ; "five minute grid")]
#[test_case((9, 0), (10, 0), 60 ; "hourly grid")]
fn test_valid_times(start: (u32, u32), end: (u32, u32), granularity: u32) {
    assert_eq!(validate_times(at(start.0, start.1), at(end.0, end.1), granularity), Ok(()));
}

#[test_case((9, 0), (9, 0), 15, AppointmentValidationError::EndBeforeStart ; "zero length")]
#[test_case((10, 0), (9, 0), 15, AppointmentValidationError::EndBeforeStart ; "reversed")]
#[test_case((9, 5), (9, 30), 15, AppointmentValidationError::StartNotAligned(15) ; "start off grid")]
#[test_case((9, 0), (9, 20), 15, AppointmentValidationError::EndNotAligned(15) ; "end off grid")]
#[test_case((8, 0), (16, 30), 15, AppointmentValidationError::TooLong ; "over eight hours")]
fn test_invalid_times(
    start: (u32, u32),
    end: (u32, u32),
    granularity: u32,
    expected: AppointmentValidationError,
) {
    assert_eq!(
        validate_times(at(start.0, start.1), at(end.0, end.1), granularity),
        Err(expected)
    );
}

#[test_case(MAX_TITLE_LEN, true ; "at limit")]
#[test_case(MAX_TITLE_LEN + 1, false ; "over limit")]
#[test_case(0, true ; "empty")]
fn test_title_length(len: usize, valid: bool) {
    let input = CreateAppointmentInput {
        patient_id: 1,
        title: "x".repeat(len),
        description: None,
        start_time: at(9, 0),
        end_time: at(9, 30),
        room_id: None,
    };
    assert_eq!(input.validate(15).is_ok(), valid);
}

#[test_case("scheduled", AppointmentStatus::Scheduled)]
#[test_case("in_progress", AppointmentStatus::InProgress)]
#[test_case("completed", AppointmentStatus::Completed)]
#[test_case("cancelled", AppointmentStatus::Cancelled)]
fn test_status_parsing(value: &str, expected: AppointmentStatus) {
    assert_eq!(value.parse::<AppointmentStatus>(), Ok(expected));
    assert_eq!(expected.as_str(), value);
}
