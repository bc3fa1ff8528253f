//! Composition root for the calendar view.
//!
//! [`CalendarViewController`] owns the grid, the drag state and the current
//! appointment snapshot. It turns finished drags into pending bookings, applies
//! the conflict policy and pushes mutations to the [`AppointmentStore`]. Every
//! mutation is followed by a full refresh; the snapshot and its layout are
//! always rebuilt together, never patched.
//!
//! Conflicts found in the snapshot are advisory only: the snapshot is limited
//! to the visible range and room filter. The policy decision at commit time
//! asks the store.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, Offset, TimeZone};
use thiserror::Error;

use super::conflict::{find_conflicts, ConflictCandidate};
use super::drag::{CancelReason, CandidateRange, DragSelectionController, MIN_DRAG_PIXELS};
use super::layout::{day_intervals, layout_intervals, visible_span};
use super::store::{AppointmentStore, ResourceStore};
use super::time_grid::{SlotSpan, TimeGrid};
use crate::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointmentInput, UpdateAppointmentInput,
};
use crate::models::room::{Room, RoomFilter, DEFAULT_ROOM_COLOR};
use crate::models::settings::ConflictPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewKind {
    #[default]
    Day,
    /// Seven days starting on Monday
    Week,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Day => "Day",
            ViewKind::Week => "Week",
        }
    }

    pub fn day_count(&self) -> i64 {
        match self {
            ViewKind::Day => 1,
            ViewKind::Week => 7,
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Day" => Ok(ViewKind::Day),
            "Week" => Ok(ViewKind::Week),
            other => Err(format!("Unknown view '{}'", other)),
        }
    }
}

/// An appointment with its resolved place on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedAppointment {
    pub appointment: Appointment,
    pub day: NaiveDate,
    pub span: SlotSpan,
    pub column: usize,
    pub total_columns: usize,
    /// Cancelled; drawn full width behind the packed appointments
    pub muted: bool,
}

/// A finished drag waiting for the user to fill in the booking details.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAppointment {
    pub range: CandidateRange,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    /// Advisory conflicts for the range's room at the time of the drag
    pub conflicts: Vec<Appointment>,
}

/// What the user supplies to turn a pending range into a booking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentDetails {
    pub patient_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Overrides the room the drag started in
    pub room_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Saved(Appointment),
    /// Saved under the warn policy despite overlapping bookings
    SavedWithConflicts {
        appointment: Appointment,
        conflicts: Vec<Appointment>,
    },
    /// Refused under the block policy; nothing was written
    Blocked { conflicts: Vec<Appointment> },
}

impl BookingOutcome {
    pub fn appointment(&self) -> Option<&Appointment> {
        match self {
            BookingOutcome::Saved(appointment) => Some(appointment),
            BookingOutcome::SavedWithConflicts { appointment, .. } => Some(appointment),
            BookingOutcome::Blocked { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("No pending selection to confirm")]
    NoPendingSelection,
    #[error("Appointment with id {0} is not in the current view")]
    NotVisible(i64),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct CalendarViewController<S: AppointmentStore> {
    store: S,
    grid: TimeGrid,
    drag: DragSelectionController,
    view: ViewKind,
    anchor: NaiveDate,
    room_filter: Option<i64>,
    show_cancelled: bool,
    policy: ConflictPolicy,
    snapshot: Vec<Appointment>,
    positioned: Vec<PositionedAppointment>,
    pending: Option<PendingAppointment>,
    rooms: HashMap<i64, Room>,
    /// The last reload failed; the snapshot may not match the store
    stale: bool,
}

impl<S: AppointmentStore> CalendarViewController<S> {
    /// Creates a controller showing `anchor`. Nothing is loaded until [`Self::refresh`].
    pub fn new(store: S, grid: TimeGrid, anchor: NaiveDate) -> Self {
        Self {
            store,
            grid,
            drag: DragSelectionController::with_threshold(grid, MIN_DRAG_PIXELS),
            view: ViewKind::Day,
            anchor,
            room_filter: None,
            show_cancelled: true,
            policy: ConflictPolicy::default(),
            snapshot: Vec::new(),
            positioned: Vec::new(),
            pending: None,
            rooms: HashMap::new(),
            stale: false,
        }
    }

    pub fn with_view(mut self, view: ViewKind) -> Self {
        self.view = view;
        self
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_drag_threshold(mut self, min_drag_pixels: f32) -> Self {
        self.drag = DragSelectionController::with_threshold(self.grid, min_drag_pixels);
        self
    }

    pub fn with_show_cancelled(mut self, show_cancelled: bool) -> Self {
        self.show_cancelled = show_cancelled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn room_filter(&self) -> Option<i64> {
        self.room_filter
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ConflictPolicy) {
        self.policy = policy;
    }

    /// Replaces the grid; drags and pending ranges measured on the old one are dropped.
    pub fn set_grid(&mut self, grid: TimeGrid) {
        if grid == self.grid {
            return;
        }
        self.grid = grid;
        self.drag.set_grid(grid);
        self.pending = None;
        self.rebuild_layout();
    }

    /// Days currently on screen, in order.
    pub fn visible_days(&self) -> Vec<NaiveDate> {
        let first = match self.view {
            ViewKind::Day => self.anchor,
            ViewKind::Week => {
                self.anchor - Duration::days(i64::from(self.anchor.weekday().num_days_from_monday()))
            }
        };
        (0..self.view.day_count())
            .map(|offset| first + Duration::days(offset))
            .collect()
    }

    /// Whole-day range covering every visible day, used for fetching.
    pub fn visible_range(&self) -> (DateTime<Local>, DateTime<Local>) {
        let days = self.visible_days();
        let first = days.first().copied().unwrap_or(self.anchor);
        let last = days.last().copied().unwrap_or(self.anchor);
        (
            to_local(first.and_time(chrono::NaiveTime::MIN)),
            to_local((last + Duration::days(1)).and_time(chrono::NaiveTime::MIN)),
        )
    }

    /// Re-fetches the visible range and rebuilds the layout from scratch.
    pub fn refresh(&mut self) -> Result<(), ControllerError> {
        let (start, end) = self.visible_range();
        let filter = AppointmentFilter {
            room_id: self.room_filter,
            include_cancelled: Some(self.show_cancelled),
            ..AppointmentFilter::default()
        };

        let appointments = match self.store.list_appointments(start, end, &filter) {
            Ok(appointments) => appointments,
            Err(e) => {
                self.stale = true;
                return Err(e.into());
            }
        };
        self.stale = false;
        log::debug!(
            "Loaded {} appointments for {} - {}",
            appointments.len(),
            start,
            end
        );
        self.snapshot = appointments;
        self.rebuild_layout();
        Ok(())
    }

    fn rebuild_layout(&mut self) {
        let mut positioned = Vec::new();
        let by_id: HashMap<i64, &Appointment> = self
            .snapshot
            .iter()
            .map(|appointment| (appointment.id, appointment))
            .collect();

        for day in self.visible_days() {
            if self.show_cancelled {
                for appointment in self.snapshot.iter().filter(|a| a.is_cancelled()) {
                    if let Some(span) = visible_span(&self.grid, day, appointment) {
                        positioned.push(PositionedAppointment {
                            appointment: appointment.clone(),
                            day,
                            span,
                            column: 0,
                            total_columns: 1,
                            muted: true,
                        });
                    }
                }
            }

            let intervals = day_intervals(&self.grid, day, &self.snapshot);
            let spans: HashMap<i64, SlotSpan> = intervals
                .iter()
                .map(|interval| (interval.appointment_id, interval.span))
                .collect();

            for descriptor in layout_intervals(&intervals) {
                let (Some(appointment), Some(span)) = (
                    by_id.get(&descriptor.appointment_id),
                    spans.get(&descriptor.appointment_id),
                ) else {
                    continue;
                };
                positioned.push(PositionedAppointment {
                    appointment: (*appointment).clone(),
                    day,
                    span: *span,
                    column: descriptor.column,
                    total_columns: descriptor.total_columns,
                    muted: false,
                });
            }
        }

        self.positioned = positioned;
    }

    /// Reloads after a committed mutation. A failed reload leaves the
    /// snapshot stale but does not undo or misreport the mutation.
    fn refresh_after_commit(&mut self) {
        if let Err(e) = self.refresh() {
            log::error!("Change saved but the calendar could not be reloaded: {}", e);
        }
    }

    /// True when the last reload failed and the snapshot may be out of date.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Snapshot of appointments from the last refresh.
    pub fn appointments(&self) -> &[Appointment] {
        &self.snapshot
    }

    /// Layout for every visible day; muted entries come first on each day.
    pub fn positioned(&self) -> &[PositionedAppointment] {
        &self.positioned
    }

    pub fn positioned_on(&self, day: NaiveDate) -> impl Iterator<Item = &PositionedAppointment> {
        self.positioned.iter().filter(move |p| p.day == day)
    }

    fn navigate(&mut self, anchor: NaiveDate, view: ViewKind) -> Result<(), ControllerError> {
        self.teardown_interaction(CancelReason::ElementLost);
        self.anchor = anchor;
        self.view = view;
        self.refresh()
    }

    pub fn go_to(&mut self, date: NaiveDate) -> Result<(), ControllerError> {
        self.navigate(date, self.view)
    }

    pub fn today(&mut self) -> Result<(), ControllerError> {
        self.go_to(Local::now().date_naive())
    }

    pub fn next(&mut self) -> Result<(), ControllerError> {
        self.go_to(self.anchor + Duration::days(self.view.day_count()))
    }

    pub fn previous(&mut self) -> Result<(), ControllerError> {
        self.go_to(self.anchor - Duration::days(self.view.day_count()))
    }

    pub fn set_view(&mut self, view: ViewKind) -> Result<(), ControllerError> {
        self.navigate(self.anchor, view)
    }

    pub fn set_room_filter(&mut self, room_id: Option<i64>) -> Result<(), ControllerError> {
        self.teardown_interaction(CancelReason::ElementLost);
        self.room_filter = room_id;
        self.refresh()
    }

    pub fn set_show_cancelled(&mut self, show_cancelled: bool) -> Result<(), ControllerError> {
        self.show_cancelled = show_cancelled;
        self.refresh()
    }

    /// Starts a drag in `day`'s column. `on_empty_cell` is false for presses on an appointment.
    pub fn pointer_down(&mut self, day: NaiveDate, y: f32, on_empty_cell: bool) {
        if self.pending.is_some() {
            return;
        }
        self.drag.pointer_down(day, self.room_filter, y, on_empty_cell);
    }

    pub fn pointer_move(&mut self, y: f32) {
        self.drag.pointer_move(y);
    }

    /// Finishes the drag. A real drag becomes the pending appointment.
    pub fn pointer_up(&mut self, y: f32) -> Option<&PendingAppointment> {
        let range = self.drag.pointer_up(y)?;
        let start = to_local(range.start);
        let end = to_local(range.end);
        let conflicts = self.conflicts_for(range.resource_id, start, end, None);

        self.pending = Some(PendingAppointment {
            range,
            start,
            end,
            conflicts,
        });
        self.pending.as_ref()
    }

    pub fn cancel_drag(&mut self, reason: CancelReason) {
        self.drag.cancel(reason);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn wants_global_pointer(&self) -> bool {
        self.drag.wants_global_pointer()
    }

    pub fn drag_preview(&self) -> Option<CandidateRange> {
        self.drag.preview()
    }

    pub fn pending(&self) -> Option<&PendingAppointment> {
        self.pending.as_ref()
    }

    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    /// Advisory conflicts for booking `[start, end)` in `room_id`, ignoring `exclude_id`.
    pub fn conflicts_for(
        &self,
        room_id: Option<i64>,
        start: DateTime<Local>,
        end: DateTime<Local>,
        exclude_id: Option<i64>,
    ) -> Vec<Appointment> {
        let mut candidate = ConflictCandidate::new(room_id, start, end);
        candidate.appointment_id = exclude_id;
        find_conflicts(&candidate, &self.snapshot)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Books the pending range with `details`, applying the conflict policy.
    ///
    /// The pending range survives a block or a store error so the user can
    /// adjust and retry.
    pub fn confirm_pending(&mut self, details: AppointmentDetails) -> Result<BookingOutcome, ControllerError> {
        let pending = self.pending.take().ok_or(ControllerError::NoPendingSelection)?;
        let room_id = details.room_id.or(pending.range.resource_id);
        let conflicts = match self.committed_conflicts(room_id, pending.start, pending.end, None) {
            Ok(conflicts) => conflicts,
            Err(e) => {
                self.pending = Some(pending);
                return Err(e);
            }
        };

        if !conflicts.is_empty() && self.policy == ConflictPolicy::Block {
            log::info!(
                "Booking blocked: {} conflicting appointment(s) in room {:?}",
                conflicts.len(),
                room_id
            );
            self.pending = Some(PendingAppointment {
                conflicts: conflicts.clone(),
                ..pending
            });
            return Ok(BookingOutcome::Blocked { conflicts });
        }

        let input = CreateAppointmentInput {
            patient_id: details.patient_id,
            title: details.title,
            description: details.description,
            start_time: pending.start,
            end_time: pending.end,
            room_id,
        };

        let appointment = match self.store.create_appointment(&input) {
            Ok(appointment) => appointment,
            Err(e) => {
                self.pending = Some(pending);
                return Err(e.into());
            }
        };
        self.refresh_after_commit();

        if conflicts.is_empty() {
            Ok(BookingOutcome::Saved(appointment))
        } else {
            log::warn!(
                "Appointment {} saved with {} conflict(s)",
                appointment.id,
                conflicts.len()
            );
            Ok(BookingOutcome::SavedWithConflicts {
                appointment,
                conflicts,
            })
        }
    }

    /// Moves an appointment in the current snapshot to `[start, end)`.
    pub fn reschedule(
        &mut self,
        id: i64,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<BookingOutcome, ControllerError> {
        let room_id = self
            .snapshot
            .iter()
            .find(|appointment| appointment.id == id)
            .map(|appointment| appointment.room_id)
            .ok_or(ControllerError::NotVisible(id))?;

        let conflicts = self.committed_conflicts(room_id, start, end, Some(id))?;
        if !conflicts.is_empty() && self.policy == ConflictPolicy::Block {
            return Ok(BookingOutcome::Blocked { conflicts });
        }

        let appointment = self
            .store
            .update_appointment(id, &UpdateAppointmentInput::reschedule(start, end))?;
        self.refresh_after_commit();

        Ok(Self::saved(appointment, conflicts))
    }

    /// Copies an appointment in the current snapshot onto `target_date`,
    /// applying the conflict policy to the copy's time range.
    pub fn duplicate(&mut self, id: i64, target_date: NaiveDate) -> Result<BookingOutcome, ControllerError> {
        let original = self
            .snapshot
            .iter()
            .find(|appointment| appointment.id == id)
            .ok_or(ControllerError::NotVisible(id))?;

        let start = to_local(target_date.and_time(original.start_time.naive_local().time()));
        let end = start + original.duration();
        let room_id = original.room_id;

        let conflicts = self.committed_conflicts(room_id, start, end, None)?;
        if !conflicts.is_empty() && self.policy == ConflictPolicy::Block {
            return Ok(BookingOutcome::Blocked { conflicts });
        }

        let appointment = self.store.duplicate_appointment(id, target_date)?;
        log::info!("Duplicated appointment {} onto {}", id, target_date);
        self.refresh_after_commit();

        Ok(Self::saved(appointment, conflicts))
    }

    pub fn delete(&mut self, id: i64) -> Result<(), ControllerError> {
        self.store.delete_appointment(id)?;
        self.refresh_after_commit();
        Ok(())
    }

    /// Conflicts as the store sees them, regardless of what is loaded.
    fn committed_conflicts(
        &self,
        room_id: Option<i64>,
        start: DateTime<Local>,
        end: DateTime<Local>,
        exclude_id: Option<i64>,
    ) -> Result<Vec<Appointment>, ControllerError> {
        match room_id {
            Some(room_id) => Ok(self
                .store
                .conflicting_appointments(room_id, start, end, exclude_id)?),
            None => Ok(Vec::new()),
        }
    }

    fn saved(appointment: Appointment, conflicts: Vec<Appointment>) -> BookingOutcome {
        if conflicts.is_empty() {
            BookingOutcome::Saved(appointment)
        } else {
            BookingOutcome::SavedWithConflicts {
                appointment,
                conflicts,
            }
        }
    }

    /// Loads every room for name and color lookups.
    pub fn load_rooms<R: ResourceStore>(&mut self, resources: &R) -> Result<(), ControllerError> {
        let rooms = resources.list_resources(&RoomFilter { active_only: false })?;
        self.rooms = rooms.into_iter().map(|room| (room.id, room)).collect();
        Ok(())
    }

    pub fn room(&self, room_id: i64) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// Rooms in name order.
    pub fn rooms(&self) -> Vec<&Room> {
        let mut rooms: Vec<&Room> = self.rooms.values().collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }

    pub fn room_color(&self, room_id: Option<i64>) -> &str {
        room_id
            .and_then(|id| self.rooms.get(&id))
            .map(|room| room.color.as_str())
            .unwrap_or(DEFAULT_ROOM_COLOR)
    }

    fn teardown_interaction(&mut self, reason: CancelReason) {
        self.drag.cancel(reason);
        self.pending = None;
    }

    /// Drops all transient interaction state; call when the view goes away.
    pub fn teardown(&mut self) {
        if self.drag.is_dragging() || self.pending.is_some() {
            log::warn!("Calendar view torn down with an interaction in flight; discarding it");
        }
        self.teardown_interaction(CancelReason::Unmounted);
    }
}

/// Resolves a wall-clock time on the grid to the local timezone.
pub fn to_local(naive: NaiveDateTime) -> DateTime<Local> {
    resolve_local(&Local, naive)
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant. Times skipped by a forward jump are read with the offset in force
/// before the jump, so 02:30 in a 02:00-03:00 gap becomes 03:30 and keeps its
/// position on the slot grid.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(resolved) = tz.from_local_datetime(&naive).earliest() {
        return resolved;
    }

    match tz.from_local_datetime(&(naive - Duration::hours(3))).earliest() {
        Some(before) => {
            let offset = i64::from(before.offset().fix().local_minus_utc());
            tz.from_utc_datetime(&(naive - Duration::seconds(offset)))
        }
        None => tz.from_utc_datetime(&naive),
    }
}
