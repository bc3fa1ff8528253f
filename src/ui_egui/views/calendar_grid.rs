//! Calendar grid rendering for the day and week views.
//!
//! Paints the time gutter, day columns, laid-out appointments and the live
//! drag selection, then feeds raw pointer input to the view controller. All
//! slot and column math lives in the scheduling engine; this file only maps
//! it to screen rectangles.

use chrono::{Datelike, Local, NaiveDate, Timelike};
use egui::{Align2, FontId, Pos2, Rect, Sense, Stroke, Vec2};

use super::palette::{with_alpha, TimeGridPalette};
use crate::scheduling::{
    AppointmentStore, CalendarViewController, CancelReason, SlotSpan, TimeGrid,
};

const COLUMN_GAP: f32 = 2.0;
const BOX_ROUNDING: f32 = 3.0;

/// What happened on the grid this frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct GridResponse {
    pub clicked_appointment: Option<i64>,
    /// A drag finished and the controller now holds a pending appointment
    pub opened_pending: bool,
}

/// Screen placement of the visible day columns.
struct GridGeometry {
    rect: Rect,
    label_width: f32,
    column_width: f32,
    days: Vec<NaiveDate>,
}

impl GridGeometry {
    fn new(rect: Rect, label_width: f32, days: Vec<NaiveDate>) -> Self {
        let count = days.len().max(1) as f32;
        Self {
            rect,
            label_width,
            column_width: ((rect.width() - label_width) / count).max(1.0),
            days,
        }
    }

    fn column_left(&self, index: usize) -> f32 {
        self.rect.left() + self.label_width + index as f32 * self.column_width
    }

    fn day_index(&self, day: NaiveDate) -> Option<usize> {
        self.days.iter().position(|d| *d == day)
    }

    fn day_at(&self, x: f32) -> Option<NaiveDate> {
        let offset = x - self.rect.left() - self.label_width;
        if offset < 0.0 {
            return None;
        }
        self.days.get((offset / self.column_width) as usize).copied()
    }

    /// Rectangle of `span` inside lane `column` of `total_columns` on day `index`.
    fn span_rect(&self, grid: &TimeGrid, index: usize, span: SlotSpan, column: usize, total_columns: usize) -> Rect {
        let lane_width = self.column_width / total_columns.max(1) as f32;
        let left = self.column_left(index) + column as f32 * lane_width;
        let top = self.rect.top() + grid.offset_from_slot(span.start);
        let bottom = self.rect.top() + grid.offset_from_slot(span.end);

        Rect::from_min_max(
            Pos2::new(left + COLUMN_GAP / 2.0, top + 1.0),
            Pos2::new(left + lane_width - COLUMN_GAP / 2.0, bottom - 1.0),
        )
    }
}

fn paint_background(painter: &egui::Painter, geometry: &GridGeometry, grid: &TimeGrid, palette: &TimeGridPalette) {
    let today = Local::now().date_naive();
    let top = geometry.rect.top();

    painter.rect_filled(geometry.rect, 0.0, palette.background);

    for (index, day) in geometry.days.iter().enumerate() {
        let left = geometry.column_left(index);
        let column = Rect::from_min_max(
            Pos2::new(left, top),
            Pos2::new(left + geometry.column_width, geometry.rect.bottom()),
        );
        if *day == today {
            painter.rect_filled(column, 0.0, palette.today_background);
        }
        painter.line_segment(
            [column.left_top(), column.left_bottom()],
            Stroke::new(1.0, palette.hour_line),
        );

        if grid.header_height_px() > 0.0 {
            painter.text(
                Pos2::new(column.center().x, top + grid.header_height_px() / 2.0),
                Align2::CENTER_CENTER,
                format!("{} {} {}", day.weekday(), day.day(), day.format("%b")),
                FontId::proportional(13.0),
                palette.header_text,
            );
        }
    }

    let Some(reference_day) = geometry.days.first().copied() else {
        return;
    };
    let right = geometry.rect.right();
    for slot in 0..=grid.slots_per_day() {
        let y = top + grid.offset_from_slot(slot);
        let time = grid.time_from_slot(slot, reference_day);
        let on_hour = time.minute() == 0;

        let stroke = if on_hour {
            Stroke::new(1.0, palette.hour_line)
        } else {
            Stroke::new(1.0, palette.slot_line)
        };
        painter.line_segment(
            [Pos2::new(geometry.rect.left() + geometry.label_width, y), Pos2::new(right, y)],
            stroke,
        );

        if on_hour && slot < grid.slots_per_day() {
            painter.text(
                Pos2::new(geometry.rect.left() + geometry.label_width - 5.0, y + 2.0),
                Align2::RIGHT_TOP,
                format!("{:02}:00", time.hour()),
                FontId::proportional(12.0),
                palette.label_text,
            );
        }
    }
}

/// Render the grid for the controller's visible days and route pointer input to it.
pub fn render_calendar_grid<S: AppointmentStore>(
    ui: &mut egui::Ui,
    controller: &mut CalendarViewController<S>,
    palette: &TimeGridPalette,
    label_width: f32,
) -> GridResponse {
    let mut result = GridResponse::default();
    let grid = *controller.grid();

    let width = ui.available_width().max(label_width + 120.0);
    let height = grid.header_height_px() + grid.grid_height_px();
    let (rect, response) = ui.allocate_exact_size(Vec2::new(width, height), Sense::click_and_drag());
    let geometry = GridGeometry::new(rect, label_width, controller.visible_days());
    let painter = ui.painter_at(rect);

    paint_background(&painter, &geometry, &grid, palette);

    // Muted (cancelled) boxes come first in the list so active ones paint over them
    let mut hit_boxes: Vec<(Rect, i64)> = Vec::new();
    for positioned in controller.positioned() {
        let Some(index) = geometry.day_index(positioned.day) else {
            continue;
        };
        let box_rect = geometry.span_rect(
            &grid,
            index,
            positioned.span,
            positioned.column,
            positioned.total_columns,
        );

        let (fill, text_color) = if positioned.muted {
            (palette.muted_fill, palette.muted_text)
        } else {
            let color = palette.appointment_fill(controller.room_color(positioned.appointment.room_id));
            (color, palette.appointment_text)
        };
        painter.rect_filled(box_rect, BOX_ROUNDING, fill);

        let start = positioned.appointment.start_time;
        let label = format!("{} {}", start.format("%H:%M"), positioned.appointment.title);
        painter.with_clip_rect(box_rect.intersect(rect)).text(
            box_rect.left_top() + Vec2::new(4.0, 2.0),
            Align2::LEFT_TOP,
            label,
            FontId::proportional(12.0),
            text_color,
        );

        if !positioned.muted {
            hit_boxes.push((box_rect, positioned.appointment.id));
        }
    }

    if let Some(preview) = controller.drag_preview() {
        if let Some(index) = geometry.day_index(preview.day) {
            let selection = geometry.span_rect(&grid, index, preview.span, 0, 1);
            painter.rect_filled(selection, BOX_ROUNDING, palette.selection_fill);
            painter.text(
                selection.left_top() + Vec2::new(4.0, 2.0),
                Align2::LEFT_TOP,
                format!("{} - {}", preview.start.format("%H:%M"), preview.end.format("%H:%M")),
                FontId::proportional(12.0),
                palette.header_text,
            );
        }
    }

    if let Some(pending) = controller.pending() {
        if let Some(index) = geometry.day_index(pending.range.day) {
            let selection = geometry.span_rect(&grid, index, pending.range.span, 0, 1);
            let stroke_color = if pending.conflicts.is_empty() {
                palette.selection_stroke
            } else {
                palette.conflict_stroke
            };
            painter.rect_filled(selection, BOX_ROUNDING, with_alpha(stroke_color, 50));
            painter.rect_stroke(selection, BOX_ROUNDING, Stroke::new(2.0, stroke_color));
        }
    }

    let (pressed, released, pointer, escape) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos().or(i.pointer.latest_pos()),
            i.key_pressed(egui::Key::Escape),
        )
    });

    if escape && controller.is_dragging() {
        controller.cancel_drag(CancelReason::Escape);
    }

    if pressed {
        if let Some(pos) = pointer.filter(|pos| rect.contains(*pos)) {
            if let Some(day) = geometry.day_at(pos.x) {
                let on_empty_cell = !hit_boxes.iter().any(|(hit, _)| hit.contains(pos));
                controller.pointer_down(day, pos.y - rect.top(), on_empty_cell);
            }
        }
    }

    // Global tracking: the pointer may leave the grid while dragging
    if controller.wants_global_pointer() {
        match pointer {
            Some(pos) => {
                let y = pos.y - rect.top();
                controller.pointer_move(y);
                if released {
                    result.opened_pending = controller.pointer_up(y).is_some();
                }
            }
            None if released => controller.cancel_drag(CancelReason::ElementLost),
            None => {}
        }
        ui.ctx().request_repaint();
    }

    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            result.clicked_appointment = hit_boxes
                .iter()
                .rev()
                .find(|(hit, _)| hit.contains(pos))
                .map(|(_, id)| *id);
        }
    }

    result
}
