// Drag-to-create selection
//
// Turns pointer-down -> pointer-move* -> pointer-up on an empty grid cell into a
// candidate appointment range. The state machine is a plain value with a pure
// transition function; `DragSelectionController` wraps it for callers that want
// to hold the state in one place.

use chrono::{NaiveDate, NaiveDateTime};

use super::time_grid::{Slot, SlotSpan, TimeGrid};

/// Below this pointer travel a pointer-down/up pair is a click, not a drag.
pub const MIN_DRAG_PIXELS: f32 = 10.0;

/// In-flight drag on one day column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSelection {
    pub day: NaiveDate,
    pub resource_id: Option<i64>,
    pub anchor_slot: Slot,
    pub current_slot: Slot,
    pub anchor_y: f32,
    pub current_y: f32,
}

impl DragSelection {
    /// Slots covered so far; always at least one.
    pub fn span(&self) -> SlotSpan {
        SlotSpan {
            start: self.anchor_slot.min(self.current_slot),
            end: self.anchor_slot.max(self.current_slot) + 1,
        }
    }

    pub fn pixel_distance(&self) -> f32 {
        (self.current_y - self.anchor_y).abs()
    }

    fn resolve(&self, grid: &TimeGrid) -> CandidateRange {
        let span = self.span();
        CandidateRange {
            day: self.day,
            resource_id: self.resource_id,
            span,
            start: grid.time_from_slot(span.start, self.day),
            end: grid.time_from_slot(span.end, self.day),
        }
    }
}

/// A tentative, not yet persisted appointment time range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateRange {
    pub day: NaiveDate,
    pub resource_id: Option<i64>,
    pub span: SlotSpan,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Why an in-flight drag was dropped without producing a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// User pressed Escape
    Escape,
    /// The view hosting the grid went away
    Unmounted,
    /// The tracked grid element disappeared or changed underneath the drag
    ElementLost,
    /// Explicit reset by the owner
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragEvent {
    PointerDown {
        day: NaiveDate,
        resource_id: Option<i64>,
        y: f32,
        /// False when the press landed on an existing appointment
        on_empty_cell: bool,
    },
    PointerMove {
        y: f32,
    },
    PointerUp {
        y: f32,
    },
    Cancel(CancelReason),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSelection),
}

/// Externally visible result of one transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragOutcome {
    /// Nothing happened (event ignored in the current state)
    Ignored,
    Started,
    Updated,
    /// Pointer released after a real drag
    Finalized(CandidateRange),
    /// Pointer released too close to where it went down
    Clicked,
    Cancelled(CancelReason),
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging(_))
    }

    pub fn selection(&self) -> Option<&DragSelection> {
        match self {
            DragState::Dragging(selection) => Some(selection),
            DragState::Idle => None,
        }
    }

    /// Pure transition function. Only `PointerUp` after a real drag yields a range.
    pub fn apply(self, event: DragEvent, grid: &TimeGrid, min_drag_pixels: f32) -> (DragState, DragOutcome) {
        match (self, event) {
            (
                DragState::Idle,
                DragEvent::PointerDown {
                    day,
                    resource_id,
                    y,
                    on_empty_cell: true,
                },
            ) => {
                let slot = grid.slot_from_pointer_offset(y);
                let selection = DragSelection {
                    day,
                    resource_id,
                    anchor_slot: slot,
                    current_slot: slot,
                    anchor_y: y,
                    current_y: y,
                };
                (DragState::Dragging(selection), DragOutcome::Started)
            }
            (DragState::Dragging(mut selection), DragEvent::PointerMove { y }) => {
                selection.current_y = y;
                selection.current_slot = grid.slot_from_pointer_offset(y);
                (DragState::Dragging(selection), DragOutcome::Updated)
            }
            (DragState::Dragging(mut selection), DragEvent::PointerUp { y }) => {
                selection.current_y = y;
                selection.current_slot = grid.slot_from_pointer_offset(y);

                // NaN travel compares false and is treated as a click
                if !(selection.pixel_distance() >= min_drag_pixels) {
                    return (DragState::Idle, DragOutcome::Clicked);
                }
                (
                    DragState::Idle,
                    DragOutcome::Finalized(selection.resolve(grid)),
                )
            }
            (DragState::Dragging(_), DragEvent::Cancel(reason)) => {
                (DragState::Idle, DragOutcome::Cancelled(reason))
            }
            (state, _) => (state, DragOutcome::Ignored),
        }
    }
}

/// Holds the drag state for one calendar surface.
#[derive(Clone, Debug)]
pub struct DragSelectionController {
    grid: TimeGrid,
    min_drag_pixels: f32,
    state: DragState,
}

impl DragSelectionController {
    pub fn new(grid: TimeGrid) -> Self {
        Self::with_threshold(grid, MIN_DRAG_PIXELS)
    }

    pub fn with_threshold(grid: TimeGrid, min_drag_pixels: f32) -> Self {
        let min_drag_pixels = if min_drag_pixels.is_finite() {
            min_drag_pixels.max(0.0)
        } else {
            MIN_DRAG_PIXELS
        };
        Self {
            grid,
            min_drag_pixels,
            state: DragState::Idle,
        }
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Swaps the grid; an in-flight drag measured against the old grid is dropped.
    pub fn set_grid(&mut self, grid: TimeGrid) {
        if grid != self.grid {
            self.cancel(CancelReason::ElementLost);
            self.grid = grid;
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    /// Whether global pointer-move/up tracking should be installed right now.
    pub fn wants_global_pointer(&self) -> bool {
        self.is_dragging()
    }

    /// Feeds one event through the state machine, returning the finalized range if any.
    pub fn handle(&mut self, event: DragEvent) -> Option<CandidateRange> {
        let (next, outcome) = self.state.apply(event, &self.grid, self.min_drag_pixels);
        self.state = next;

        match outcome {
            DragOutcome::Finalized(range) => {
                log::debug!(
                    "Drag finalized: {} {}-{} (slots {}..{})",
                    range.day,
                    range.start.time(),
                    range.end.time(),
                    range.span.start,
                    range.span.end
                );
                Some(range)
            }
            DragOutcome::Clicked => {
                log::trace!("Pointer released below drag threshold; ignoring");
                None
            }
            DragOutcome::Cancelled(reason) => {
                log::debug!("Drag cancelled: {:?}", reason);
                None
            }
            DragOutcome::Ignored | DragOutcome::Started | DragOutcome::Updated => None,
        }
    }

    pub fn pointer_down(&mut self, day: NaiveDate, resource_id: Option<i64>, y: f32, on_empty_cell: bool) {
        self.handle(DragEvent::PointerDown {
            day,
            resource_id,
            y,
            on_empty_cell,
        });
    }

    pub fn pointer_move(&mut self, y: f32) {
        self.handle(DragEvent::PointerMove { y });
    }

    pub fn pointer_up(&mut self, y: f32) -> Option<CandidateRange> {
        self.handle(DragEvent::PointerUp { y })
    }

    pub fn cancel(&mut self, reason: CancelReason) {
        self.handle(DragEvent::Cancel(reason));
    }

    /// Unconditionally return to idle, whatever the current state.
    pub fn reset(&mut self) {
        self.cancel(CancelReason::Reset);
        self.state = DragState::Idle;
    }

    /// Range the current drag would produce if released now.
    pub fn preview(&self) -> Option<CandidateRange> {
        self.state
            .selection()
            .map(|selection| selection.resolve(&self.grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// 15-minute slots from 08:00, no header, 30px per slot.
    fn grid() -> TimeGrid {
        TimeGrid::new(15, NaiveTime::from_hms_opt(8, 0, 0).unwrap(), 10 * 60)
            .with_geometry(0.0, 30.0)
    }

    fn y_in_slot(slot: usize, within: f32) -> f32 {
        slot as f32 * 30.0 + within
    }

    #[test]
    fn test_drag_down_produces_range() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), Some(1), y_in_slot(2, 5.0), true);
        drag.pointer_move(y_in_slot(3, 5.0));
        let range = drag.pointer_up(y_in_slot(4, 5.0)).expect("range");

        assert_eq!(range.span, SlotSpan { start: 2, end: 5 });
        assert_eq!(range.start, day().and_hms_opt(8, 30, 0).unwrap());
        assert_eq!(range.end, day().and_hms_opt(9, 15, 0).unwrap());
        assert_eq!(range.resource_id, Some(1));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_drag_up_normalizes_order() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, y_in_slot(6, 1.0), true);
        let range = drag.pointer_up(y_in_slot(3, 1.0)).expect("range");
        assert_eq!(range.span, SlotSpan { start: 3, end: 7 });
    }

    #[test]
    fn test_same_slot_drag_spans_one_slot() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, y_in_slot(10, 2.0), true);
        let range = drag.pointer_up(y_in_slot(10, 25.0)).expect("range");
        assert_eq!(range.span, SlotSpan { start: 10, end: 11 });
        assert_eq!(range.end - range.start, chrono::Duration::minutes(15));
    }

    #[test]
    fn test_click_is_suppressed() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, 100.0, true);
        assert!(drag.pointer_up(104.0).is_none());
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_threshold_uses_final_position_not_path() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, 100.0, true);
        drag.pointer_move(300.0);
        assert!(drag.pointer_up(103.0).is_none());
    }

    #[test]
    fn test_press_on_appointment_does_not_start() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, 100.0, false);
        assert!(!drag.is_dragging());
        assert!(!drag.wants_global_pointer());
    }

    #[test]
    fn test_second_pointer_down_is_ignored() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, y_in_slot(1, 0.0), true);
        drag.pointer_down(day(), None, y_in_slot(8, 0.0), true);
        let selection = *drag.state().selection().unwrap();
        assert_eq!(selection.anchor_slot, 1);
    }

    #[test]
    fn test_events_while_idle_are_ignored() {
        let (state, outcome) = DragState::Idle.apply(DragEvent::PointerUp { y: 400.0 }, &grid(), MIN_DRAG_PIXELS);
        assert_eq!(state, DragState::Idle);
        assert_eq!(outcome, DragOutcome::Ignored);

        let (state, outcome) = DragState::Idle.apply(DragEvent::PointerMove { y: 40.0 }, &grid(), MIN_DRAG_PIXELS);
        assert_eq!(state, DragState::Idle);
        assert_eq!(outcome, DragOutcome::Ignored);
    }

    #[test]
    fn test_moves_are_idempotent() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, 10.0, true);
        drag.pointer_move(200.0);
        let once = *drag.state();
        drag.pointer_move(200.0);
        drag.pointer_move(200.0);
        assert_eq!(*drag.state(), once);
    }

    #[test]
    fn test_cancel_discards_in_flight_state() {
        for reason in [
            CancelReason::Escape,
            CancelReason::Unmounted,
            CancelReason::ElementLost,
            CancelReason::Reset,
        ] {
            let mut drag = DragSelectionController::new(grid());
            drag.pointer_down(day(), None, 10.0, true);
            drag.pointer_move(200.0);
            drag.cancel(reason);
            assert!(!drag.is_dragging());
            assert!(drag.preview().is_none());
            // A release after teardown must not emit anything
            assert!(drag.pointer_up(300.0).is_none());
        }
    }

    #[test]
    fn test_grid_change_drops_drag() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, 10.0, true);
        drag.set_grid(grid().with_geometry(0.0, 20.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_preview_tracks_pointer() {
        let mut drag = DragSelectionController::new(grid());
        assert!(drag.preview().is_none());
        drag.pointer_down(day(), Some(3), y_in_slot(4, 0.0), true);
        drag.pointer_move(y_in_slot(6, 0.0));
        let preview = drag.preview().unwrap();
        assert_eq!(preview.span, SlotSpan { start: 4, end: 7 });
        assert!(drag.wants_global_pointer());
    }

    #[test]
    fn test_drag_past_grid_clamps_to_last_slot() {
        let mut drag = DragSelectionController::new(grid());
        drag.pointer_down(day(), None, y_in_slot(38, 0.0), true);
        let range = drag.pointer_up(5_000.0).unwrap();
        assert_eq!(range.span, SlotSpan { start: 38, end: 40 });
        assert_eq!(range.end, day().and_hms_opt(18, 0, 0).unwrap());
    }
}
