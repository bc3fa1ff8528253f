// Property-based tests for the scheduling engine
// Slot math, column packing, drag selection and conflict detection under random inputs

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use proptest::prelude::*;
use vet_calendar::models::appointment::Appointment;
use vet_calendar::scheduling::{
    has_conflict, layout_day, CancelReason, ConflictCandidate, DragSelectionController,
    LayoutDescriptor, TimeGrid, MIN_DRAG_PIXELS,
};

const SLOT_MINUTES: u32 = 15;
const VISIBLE_MINUTES: u32 = 600;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
}

fn grid() -> TimeGrid {
    TimeGrid::new(
        SLOT_MINUTES,
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        VISIBLE_MINUTES,
    )
    .with_geometry(0.0, 30.0)
}

/// Minutes after 08:00 on the test day, in local time.
fn at_offset(minutes: i64) -> DateTime<Local> {
    let naive = day().and_hms_opt(8, 0, 0).unwrap() + Duration::minutes(minutes);
    Local.from_local_datetime(&naive).earliest().unwrap()
}

fn appointments_from(specs: &[(i64, i64)]) -> Vec<Appointment> {
    specs
        .iter()
        .enumerate()
        .map(|(index, (start, length))| {
            Appointment::new(
                index as i64 + 1,
                1,
                "Visit",
                at_offset(*start),
                at_offset(start + length),
            )
            .in_room(1)
        })
        .collect()
}

fn sorted(mut layout: Vec<LayoutDescriptor>) -> Vec<LayoutDescriptor> {
    layout.sort();
    layout
}

fn booking_specs() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..570, 1i64..120), 0..24)
}

proptest! {
    /// Property: later times never map to earlier slots
    #[test]
    fn prop_slot_from_time_is_monotonic(a in 0i64..600, b in 0i64..600) {
        let grid = grid();
        let (early, late) = if a <= b { (a, b) } else { (b, a) };
        let t1 = day().and_hms_opt(8, 0, 0).unwrap() + Duration::minutes(early);
        let t2 = day().and_hms_opt(8, 0, 0).unwrap() + Duration::minutes(late);
        prop_assert!(grid.slot_from_time(t1, day()) <= grid.slot_from_time(t2, day()));
    }

    /// Property: a slot's start time maps back to the same slot
    #[test]
    fn prop_slot_time_round_trip(slot in 0usize..40) {
        let grid = grid();
        let time = grid.time_from_slot(slot, day());
        prop_assert_eq!(grid.slot_from_time(time, day()), slot);
    }

    /// Property: pointer offsets always land on a valid slot
    #[test]
    fn prop_pointer_offset_stays_in_range(offset in -500.0f32..5000.0) {
        let grid = grid();
        let slot = grid.slot_from_pointer_offset(offset);
        prop_assert!(slot < grid.slots_per_day());
    }

    /// Property: overlapping appointments never share a column
    #[test]
    fn prop_layout_never_overlaps_in_a_column(specs in booking_specs()) {
        let grid = grid();
        let appointments = appointments_from(&specs);
        let layout = layout_day(&grid, day(), &appointments);

        prop_assert_eq!(layout.len(), appointments.len());
        for a in &layout {
            prop_assert!(a.column < a.total_columns);
            for b in &layout {
                if a.appointment_id >= b.appointment_id || a.column != b.column {
                    continue;
                }
                let first = &appointments[(a.appointment_id - 1) as usize];
                let second = &appointments[(b.appointment_id - 1) as usize];
                let span_a = grid.slot_span(first.start_time.naive_local(), first.end_time.naive_local(), day());
                let span_b = grid.slot_span(second.start_time.naive_local(), second.end_time.naive_local(), day());
                prop_assert!(!span_a.intersects(&span_b));
            }
        }
    }

    /// Property: overlapping appointments agree on the column count
    #[test]
    fn prop_overlapping_share_total_columns(specs in booking_specs()) {
        let grid = grid();
        let appointments = appointments_from(&specs);
        let layout = layout_day(&grid, day(), &appointments);

        for a in &layout {
            for b in &layout {
                let first = &appointments[(a.appointment_id - 1) as usize];
                let second = &appointments[(b.appointment_id - 1) as usize];
                let span_a = grid.slot_span(first.start_time.naive_local(), first.end_time.naive_local(), day());
                let span_b = grid.slot_span(second.start_time.naive_local(), second.end_time.naive_local(), day());
                if span_a.intersects(&span_b) {
                    prop_assert_eq!(a.total_columns, b.total_columns);
                }
            }
        }
    }

    /// Property: the layout does not depend on input order
    #[test]
    fn prop_layout_is_order_independent(specs in booking_specs(), seed in any::<u64>()) {
        let grid = grid();
        let appointments = appointments_from(&specs);
        let mut shuffled = appointments.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }

        prop_assert_eq!(
            sorted(layout_day(&grid, day(), &appointments)),
            sorted(layout_day(&grid, day(), &shuffled))
        );
    }

    /// Property: pointer travel below the threshold never yields a selection
    #[test]
    fn prop_short_travel_is_a_click(start in 0.0f32..500.0, travel in 0.0f32..(MIN_DRAG_PIXELS - 1.0)) {
        let mut controller = DragSelectionController::new(grid());
        controller.pointer_down(day(), None, start, true);
        controller.pointer_move(start + travel / 2.0);
        prop_assert!(controller.pointer_up(start + travel).is_none());
        prop_assert!(!controller.is_dragging());
    }

    /// Property: a finished drag covers both endpoints and at least one slot
    #[test]
    fn prop_drag_covers_endpoints(down in 0.0f32..600.0, up in 0.0f32..600.0) {
        prop_assume!((up - down).abs() >= MIN_DRAG_PIXELS);
        let grid = grid();
        let mut controller = DragSelectionController::new(grid);
        controller.pointer_down(day(), Some(1), down, true);
        let range = controller.pointer_up(up).expect("Drag past threshold should finalize");

        prop_assert!(range.start < range.end);
        prop_assert!(range.span.len() >= 1);
        prop_assert!(range.span.contains(grid.slot_from_pointer_offset(down)));
        prop_assert!(range.span.contains(grid.slot_from_pointer_offset(up)));
        prop_assert_eq!(range.resource_id, Some(1));
    }

    /// Property: a cancelled drag never yields a selection
    #[test]
    fn prop_cancelled_drag_yields_nothing(down in 0.0f32..300.0, up in 300.0f32..600.0) {
        let mut controller = DragSelectionController::new(grid());
        controller.pointer_down(day(), None, down, true);
        controller.pointer_move(up);
        controller.cancel(CancelReason::Escape);
        prop_assert!(controller.pointer_up(up).is_none());
    }

    /// Property: conflict detection is symmetric between two bookings
    #[test]
    fn prop_conflict_is_symmetric(a in (0i64..570, 1i64..120), b in (0i64..570, 1i64..120)) {
        let appointments = appointments_from(&[a, b]);
        let forward = has_conflict(&ConflictCandidate::from(&appointments[0]), &appointments[1..]);
        let backward = has_conflict(&ConflictCandidate::from(&appointments[1]), &appointments[..1]);
        prop_assert_eq!(forward, backward);
    }

    /// Property: an appointment being edited never conflicts with itself
    #[test]
    fn prop_edit_excludes_self(booking in (0i64..570, 1i64..120)) {
        let appointments = appointments_from(&[booking]);
        let candidate = ConflictCandidate::from(&appointments[0]);
        prop_assert!(!has_conflict(&candidate, &appointments));
    }
}
