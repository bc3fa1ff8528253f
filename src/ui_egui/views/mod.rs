mod booking_dialog;
mod calendar_grid;
mod palette;

pub use booking_dialog::{
    availability_summary, render_appointment_window, render_booking_dialog, AppointmentAction,
    BookingDialogAction, BookingForm,
};
pub use calendar_grid::{render_calendar_grid, GridResponse};
pub(crate) use palette::TimeGridPalette;
