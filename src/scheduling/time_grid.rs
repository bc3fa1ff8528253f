//! Slot quantization for the calendar grid.
//!
//! A day's visible range (e.g. 07:00-20:00) is cut into fixed-width slots.
//! Every conversion here clamps instead of failing, so callers always get
//! a usable slot index back.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::models::settings::Settings;
use crate::services::config::GridConfig;

/// Index of a slot inside the visible range of one day.
pub type Slot = usize;

pub const DEFAULT_SLOT_MINUTES: u32 = 15;
pub const DEFAULT_SLOT_HEIGHT: f32 = 30.0;
pub const DEFAULT_HEADER_HEIGHT: f32 = 0.0;

/// Half-open slot interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotSpan {
    pub start: Slot,
    pub end: Slot,
}

impl SlotSpan {
    /// Builds a span, widening it to one slot when `end <= start`.
    pub fn new(start: Slot, end: Slot) -> Self {
        Self {
            start,
            end: end.max(start + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn intersects(&self, other: &SlotSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.start <= slot && slot < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    slot_minutes: u32,
    day_start: NaiveTime,
    visible_minutes: u32,
    header_height_px: f32,
    slot_height_px: f32,
}

impl Default for TimeGrid {
    /// Whole day in 15-minute slots.
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_MINUTES, NaiveTime::MIN, 24 * 60)
    }
}

impl TimeGrid {
    /// Creates a grid of `visible_minutes` starting at `day_start`.
    ///
    /// A zero slot width is treated as one minute and the visible range always
    /// holds at least one slot. A `day_start` off the slot grid is rounded down
    /// to the previous slot edge so every slot boundary is bookable; the end of
    /// the range stays where it was.
    pub fn new(slot_minutes: u32, day_start: NaiveTime, visible_minutes: u32) -> Self {
        let slot_minutes = slot_minutes.max(1);
        let (day_start, shift) = align_to_slot(truncate_time(day_start), slot_minutes);
        Self {
            slot_minutes,
            day_start,
            visible_minutes: (visible_minutes + shift).max(slot_minutes),
            header_height_px: DEFAULT_HEADER_HEIGHT,
            slot_height_px: DEFAULT_SLOT_HEIGHT,
        }
    }

    /// Sets the pixel geometry used for pointer conversions.
    pub fn with_geometry(mut self, header_height_px: f32, slot_height_px: f32) -> Self {
        self.header_height_px = if header_height_px.is_finite() {
            header_height_px.max(0.0)
        } else {
            DEFAULT_HEADER_HEIGHT
        };
        self.slot_height_px = if slot_height_px.is_finite() && slot_height_px > 0.0 {
            slot_height_px
        } else {
            DEFAULT_SLOT_HEIGHT
        };
        self
    }

    pub fn from_settings(settings: &Settings, config: &GridConfig) -> Self {
        Self::new(
            settings.slot_interval_minutes,
            settings.day_start(),
            settings.visible_minutes(),
        )
        .with_geometry(config.header_height_px, config.slot_height_px)
    }

    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    pub fn day_start(&self) -> NaiveTime {
        self.day_start
    }

    pub fn header_height_px(&self) -> f32 {
        self.header_height_px
    }

    pub fn slot_height_px(&self) -> f32 {
        self.slot_height_px
    }

    pub fn slots_per_day(&self) -> usize {
        (self.visible_minutes / self.slot_minutes) as usize
    }

    fn last_slot(&self) -> Slot {
        self.slots_per_day().saturating_sub(1)
    }

    /// Height of the slot area, header excluded.
    pub fn grid_height_px(&self) -> f32 {
        self.slots_per_day() as f32 * self.slot_height_px
    }

    pub fn range_start(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.day_start)
    }

    /// End of the last whole slot of `day`.
    pub fn range_end(&self, day: NaiveDate) -> NaiveDateTime {
        self.time_from_slot(self.slots_per_day(), day)
    }

    fn minutes_since_range_start(&self, t: NaiveDateTime, day: NaiveDate) -> i64 {
        (truncate_datetime(t) - self.range_start(day)).num_minutes()
    }

    /// Slot containing `t`. A time on a slot edge belongs to the later slot;
    /// times outside the visible range clamp to the first/last slot.
    pub fn slot_from_time(&self, t: NaiveDateTime, day: NaiveDate) -> Slot {
        let minutes = self.minutes_since_range_start(t, day);
        let slot = minutes.div_euclid(i64::from(self.slot_minutes));
        slot.clamp(0, self.last_slot() as i64) as Slot
    }

    /// Start time of `slot` on `day`. `slots_per_day()` itself is accepted as
    /// the closing boundary; anything beyond clamps to it.
    pub fn time_from_slot(&self, slot: Slot, day: NaiveDate) -> NaiveDateTime {
        let slot = slot.min(self.slots_per_day());
        self.range_start(day) + Duration::minutes(slot as i64 * i64::from(self.slot_minutes))
    }

    /// Half-open slot interval covered by `[start, end)` on `day`.
    ///
    /// The end rounds up to the next slot edge, and the span is widened to one
    /// slot when the times are degenerate or fall outside the visible range.
    pub fn slot_span(&self, start: NaiveDateTime, end: NaiveDateTime, day: NaiveDate) -> SlotSpan {
        let start_slot = self.slot_from_time(start, day);
        let slot_minutes = i64::from(self.slot_minutes);
        let end_minutes = self.minutes_since_range_start(end, day);
        let end_slot = (end_minutes + slot_minutes - 1).div_euclid(slot_minutes);
        let end_slot = end_slot.clamp(start_slot as i64 + 1, self.slots_per_day() as i64);

        SlotSpan {
            start: start_slot,
            end: end_slot as Slot,
        }
    }

    /// Slot under a vertical pointer offset measured from the top of the grid
    /// widget (header included). Never negative, never NaN.
    pub fn slot_from_pointer_offset(&self, offset_px: f32) -> Slot {
        if !offset_px.is_finite() {
            return 0;
        }

        let raw = ((offset_px - self.header_height_px) / self.slot_height_px).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as Slot).min(self.last_slot())
        }
    }

    /// Vertical offset of the top edge of `slot`, header included.
    pub fn offset_from_slot(&self, slot: Slot) -> f32 {
        self.header_height_px + slot.min(self.slots_per_day()) as f32 * self.slot_height_px
    }
}

fn truncate_time(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Rounds `time` down to a multiple of `slot_minutes` since midnight and
/// returns it with the number of minutes removed.
fn align_to_slot(time: NaiveTime, slot_minutes: u32) -> (NaiveTime, u32) {
    let minutes = time.num_seconds_from_midnight() / 60;
    let shift = minutes % slot_minutes;
    match NaiveTime::from_num_seconds_from_midnight_opt((minutes - shift) * 60, 0) {
        Some(aligned) => (aligned, shift),
        None => (time, 0),
    }
}

fn truncate_datetime(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
