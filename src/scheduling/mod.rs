// Scheduling module
// Presentation-agnostic calendar engine: slot math, column layout, drag selection and conflicts

pub mod conflict;
pub mod controller;
pub mod drag;
pub mod layout;
pub mod store;
pub mod time_grid;

pub use conflict::{find_conflicts, has_conflict, ConflictCandidate};
pub use controller::{
    AppointmentDetails, BookingOutcome, CalendarViewController, ControllerError,
    PendingAppointment, PositionedAppointment, ViewKind,
};
pub use drag::{CancelReason, CandidateRange, DragSelectionController, DragState, MIN_DRAG_PIXELS};
pub use layout::{layout_day, overlap_groups, LayoutDescriptor, OverlapGroup, SlotInterval};
pub use store::{AppointmentStore, ResourceStore};
pub use time_grid::{Slot, SlotSpan, TimeGrid};
