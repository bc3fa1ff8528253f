//! Side-by-side column packing for overlapping appointments.
//!
//! Appointments are packed greedily into columns in start order. A run of
//! appointments connected by (possibly transitive) overlap forms an
//! [`OverlapGroup`]; every member of a group shares the same column count so
//! the group renders as one block of equal-width lanes.

use chrono::{Duration, NaiveDate};

use super::time_grid::{SlotSpan, TimeGrid};
use crate::models::appointment::Appointment;

/// An appointment reduced to what the packer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotInterval {
    pub appointment_id: i64,
    pub span: SlotSpan,
}

impl SlotInterval {
    pub fn new(appointment_id: i64, span: SlotSpan) -> Self {
        Self {
            appointment_id,
            span,
        }
    }
}

/// Column assignment for one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutDescriptor {
    pub appointment_id: i64,
    pub column: usize,
    pub total_columns: usize,
}

/// Maximal set of transitively overlapping appointments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapGroup {
    /// Members in placement order (start slot, then id).
    pub members: Vec<LayoutDescriptor>,
    pub span: SlotSpan,
    pub total_columns: usize,
}

impl OverlapGroup {
    pub fn contains(&self, appointment_id: i64) -> bool {
        self.members
            .iter()
            .any(|member| member.appointment_id == appointment_id)
    }
}

/// Group being filled while walking the sorted intervals.
#[derive(Default)]
struct OpenGroup {
    placed: Vec<(i64, usize)>,
    /// End slot of the last occupant of each column
    column_ends: Vec<usize>,
    start: usize,
    end: usize,
}

impl OpenGroup {
    fn is_open_at(&self, slot: usize) -> bool {
        !self.placed.is_empty() && slot < self.end
    }

    fn place(&mut self, interval: &SlotInterval) {
        let span = interval.span;
        let column = match self.column_ends.iter().position(|&end| end <= span.start) {
            Some(free) => free,
            None => {
                self.column_ends.push(span.start);
                self.column_ends.len() - 1
            }
        };
        self.column_ends[column] = span.end;

        if self.placed.is_empty() {
            self.start = span.start;
        }
        self.end = self.end.max(span.end);
        self.placed.push((interval.appointment_id, column));
    }

    fn close(self) -> Option<OverlapGroup> {
        if self.placed.is_empty() {
            return None;
        }

        let total_columns = self.column_ends.len().max(1);
        let members = self
            .placed
            .into_iter()
            .map(|(appointment_id, column)| LayoutDescriptor {
                appointment_id,
                column,
                total_columns,
            })
            .collect();

        Some(OverlapGroup {
            members,
            span: SlotSpan {
                start: self.start,
                end: self.end,
            },
            total_columns,
        })
    }
}

/// Partitions `intervals` into overlap groups with column assignments.
///
/// Input order does not matter: intervals are sorted by start slot with ties
/// broken by appointment id, so the same set always yields the same layout.
pub fn overlap_groups(intervals: &[SlotInterval]) -> Vec<OverlapGroup> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|interval| {
        (
            interval.span.start,
            interval.appointment_id,
            interval.span.end,
        )
    });

    let mut groups = Vec::new();
    let mut current = OpenGroup::default();

    for interval in &sorted {
        if !current.is_open_at(interval.span.start) {
            groups.extend(std::mem::take(&mut current).close());
        }
        current.place(interval);
    }
    groups.extend(current.close());

    log::trace!(
        "Packed {} intervals into {} overlap groups",
        sorted.len(),
        groups.len()
    );
    groups
}

/// Column assignment for every interval, in placement order.
pub fn layout_intervals(intervals: &[SlotInterval]) -> Vec<LayoutDescriptor> {
    overlap_groups(intervals)
        .into_iter()
        .flat_map(|group| group.members)
        .collect()
}

/// Slot span of `appointment` on `day`, or `None` when it falls outside the
/// day's visible range. Spans are clamped into the range.
pub fn visible_span(grid: &TimeGrid, day: NaiveDate, appointment: &Appointment) -> Option<SlotSpan> {
    let start = appointment.start_time.naive_local();
    let end = appointment.end_time.naive_local();

    // Malformed rows (end <= start) still occupy the minute they start in
    let effective_end = if end > start {
        end
    } else {
        start + Duration::minutes(1)
    };
    if start >= grid.range_end(day) || effective_end <= grid.range_start(day) {
        return None;
    }
    Some(grid.slot_span(start, end, day))
}

/// Slot intervals of the non-cancelled appointments visible on `day`.
pub fn day_intervals(grid: &TimeGrid, day: NaiveDate, appointments: &[Appointment]) -> Vec<SlotInterval> {
    appointments
        .iter()
        .filter(|appointment| appointment.is_active())
        .filter_map(|appointment| {
            visible_span(grid, day, appointment)
                .map(|span| SlotInterval::new(appointment.id, span))
        })
        .collect()
}

/// Lays out one day of appointments.
pub fn layout_day(grid: &TimeGrid, day: NaiveDate, appointments: &[Appointment]) -> Vec<LayoutDescriptor> {
    layout_intervals(&day_intervals(grid, day, appointments))
}
