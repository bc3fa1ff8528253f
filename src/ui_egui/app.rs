mod lifecycle;
mod toolbar;

use crate::models::settings::Settings;
use crate::scheduling::{
    BookingOutcome, CalendarViewController, ControllerError, ViewKind,
};
use crate::services::appointment::AppointmentService;
use crate::services::config::GridConfig;
use crate::services::database::Database;
use crate::services::room::RoomService;
use crate::services::settings::SettingsService;
use crate::ui_egui::views::{
    availability_summary, render_appointment_window, render_booking_dialog, render_calendar_grid,
    AppointmentAction, BookingDialogAction, BookingForm, TimeGridPalette,
};
use chrono::{Duration, Local};

type Controller = CalendarViewController<AppointmentService<'static>>;

pub struct CalendarApp {
    /// Leaked for the 'static lifetime the services borrow
    database: &'static Database,
    settings: Settings,
    grid_config: GridConfig,
    controller: Controller,
    booking_form: Option<BookingForm>,
    selected_appointment: Option<i64>,
    /// Occupancy line for the selected appointment's room, loaded on selection
    selected_room_status: Option<String>,
    /// Last message shown in the status bar
    status: Option<StatusMessage>,
}

struct StatusMessage {
    text: String,
    is_error: bool,
}

impl eframe::App for CalendarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_update(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.handle_exit();
    }
}

impl CalendarApp {
    fn room_service(&self) -> RoomService<'static> {
        RoomService::new(self.database.connection())
    }

    fn settings_service(&self) -> SettingsService<'static> {
        SettingsService::new(self.database)
    }

    fn report(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn report_error(&mut self, context: &str, error: ControllerError) {
        log::error!("{}: {}", context, error);
        self.status = Some(StatusMessage {
            text: format!("{}: {}", context, error),
            is_error: true,
        });
    }

    fn handle_update(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.render_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.render_status_bar(ui);
        });

        let palette = TimeGridPalette::from_visuals(&ctx.style().visuals);
        let label_width = self.grid_config.time_label_width_px;
        let grid_response = egui::CentralPanel::default()
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .drag_to_scroll(false)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        render_calendar_grid(ui, &mut self.controller, &palette, label_width)
                    })
                    .inner
            })
            .inner;

        if grid_response.opened_pending {
            self.booking_form = self.controller.pending().map(BookingForm::for_pending);
        }
        if let Some(id) = grid_response.clicked_appointment {
            self.select_appointment(id);
        }

        self.render_booking_dialog(ctx);
        self.render_selected_appointment(ctx);
    }

    fn select_appointment(&mut self, id: i64) {
        self.selected_appointment = Some(id);
        let room_id = self
            .controller
            .appointments()
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| a.room_id);

        self.selected_room_status = room_id.and_then(|room_id| {
            match self.room_service().availability(room_id, Local::now()) {
                Ok(availability) => Some(availability_summary(&availability)),
                Err(e) => {
                    log::warn!("Failed to load availability for room {}: {}", room_id, e);
                    None
                }
            }
        });
    }

    fn render_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.controller.is_stale() {
                ui.colored_label(
                    egui::Color32::from_rgb(220, 160, 40),
                    "Calendar may be out of date",
                );
                ui.separator();
            }
            match &self.status {
                Some(message) if message.is_error => {
                    ui.colored_label(egui::Color32::from_rgb(220, 60, 60), &message.text);
                }
                Some(message) => {
                    ui.label(&message.text);
                }
                None => {
                    ui.label(format!(
                        "{} appointment(s) in view",
                        self.controller.appointments().len()
                    ));
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("Conflicts: {}", self.controller.policy()));
            });
        });
    }

    fn render_booking_dialog(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.controller.pending().cloned() else {
            self.booking_form = None;
            return;
        };
        let form = self
            .booking_form
            .get_or_insert_with(|| BookingForm::for_pending(&pending));

        let rooms = self.controller.rooms();
        let action = render_booking_dialog(ctx, form, &pending, &rooms);

        match action {
            BookingDialogAction::None => {}
            BookingDialogAction::Cancel => {
                self.controller.discard_pending();
                self.booking_form = None;
            }
            BookingDialogAction::Confirm(details) => match self.controller.confirm_pending(details) {
                Ok(BookingOutcome::Blocked { conflicts }) => {
                    if let Some(form) = self.booking_form.as_mut() {
                        form.error = Some(format!(
                            "Room is already booked ({} overlapping appointment(s))",
                            conflicts.len()
                        ));
                    }
                }
                Ok(BookingOutcome::SavedWithConflicts { appointment, conflicts }) => {
                    log::warn!(
                        "Booked '{}' over {} existing appointment(s)",
                        appointment.title,
                        conflicts.len()
                    );
                    self.report(format!(
                        "Booked '{}' (overlaps {} appointment(s))",
                        appointment.title,
                        conflicts.len()
                    ));
                    self.booking_form = None;
                }
                Ok(BookingOutcome::Saved(appointment)) => {
                    self.report(format!("Booked '{}'", appointment.title));
                    self.booking_form = None;
                }
                Err(e) => {
                    if let Some(form) = self.booking_form.as_mut() {
                        form.error = Some(e.to_string());
                    }
                    log::error!("Failed to book appointment: {}", e);
                }
            },
        }
    }

    fn render_selected_appointment(&mut self, ctx: &egui::Context) {
        let Some(id) = self.selected_appointment else {
            return;
        };
        let Some(appointment) = self
            .controller
            .appointments()
            .iter()
            .find(|a| a.id == id)
            .cloned()
        else {
            self.selected_appointment = None;
            return;
        };

        let room_name = appointment
            .room_id
            .and_then(|room_id| self.controller.room(room_id))
            .map(|room| room.name.clone());

        let action = render_appointment_window(
            ctx,
            &appointment,
            room_name.as_deref(),
            self.selected_room_status.as_deref(),
        );
        match action {
            AppointmentAction::None => {}
            AppointmentAction::Close => self.selected_appointment = None,
            AppointmentAction::Shift(slots) => {
                let step = Duration::minutes(slots * i64::from(self.controller.grid().slot_minutes()));
                let result = self.controller.reschedule(
                    id,
                    appointment.start_time + step,
                    appointment.end_time + step,
                );
                match result {
                    Ok(BookingOutcome::Blocked { .. }) => {
                        self.report("Move blocked: the room is already booked then");
                    }
                    Ok(_) => self.report(format!("Moved '{}'", appointment.title)),
                    Err(e) => self.report_error("Failed to move appointment", e),
                }
            }
            AppointmentAction::DuplicateNextDay => {
                let target = appointment.start_time.date_naive() + Duration::days(1);
                match self.controller.duplicate(id, target) {
                    Ok(BookingOutcome::Blocked { .. }) => {
                        self.report("Copy blocked: the room is already booked then");
                    }
                    Ok(_) => self.report(format!(
                        "Copied '{}' to {}",
                        appointment.title,
                        target.format("%a %d %b")
                    )),
                    Err(e) => self.report_error("Failed to copy appointment", e),
                }
            }
            AppointmentAction::Delete => {
                match self.controller.delete(id) {
                    Ok(()) => self.report(format!("Deleted '{}'", appointment.title)),
                    Err(e) => self.report_error("Failed to delete appointment", e),
                }
                self.selected_appointment = None;
            }
        }
    }

    fn persist_view(&mut self, view: ViewKind) {
        self.settings.current_view = view.to_string();
        if let Err(e) = self.settings_service().update(&self.settings) {
            log::warn!("Failed to save current view: {}", e);
        }
    }
}
