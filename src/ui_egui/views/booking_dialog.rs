// Booking dialog
// Collects patient and title for a pending drag selection, and shows details of a booked appointment

use egui::{Color32, RichText};

use crate::models::appointment::{Appointment, MAX_TITLE_LEN};
use crate::models::room::{Room, RoomAvailability};
use crate::scheduling::{AppointmentDetails, PendingAppointment};

/// Editable fields of the booking form.
#[derive(Debug, Clone, Default)]
pub struct BookingForm {
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub room_id: Option<i64>,
    pub error: Option<String>,
}

impl BookingForm {
    pub fn for_pending(pending: &PendingAppointment) -> Self {
        Self {
            room_id: pending.range.resource_id,
            ..Self::default()
        }
    }

    /// Checks the raw input and converts it into booking details.
    pub fn to_details(&self) -> Result<AppointmentDetails, String> {
        let patient_id = self
            .patient_id
            .trim()
            .parse::<i64>()
            .map_err(|_| "Patient ID must be a number".to_string())?;

        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(format!("Title must be {} characters or less", MAX_TITLE_LEN));
        }

        let description = self.description.trim();
        Ok(AppointmentDetails {
            patient_id,
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            room_id: self.room_id,
        })
    }
}

pub enum BookingDialogAction {
    None,
    Confirm(AppointmentDetails),
    Cancel,
}

fn room_label(rooms: &[&Room], room_id: Option<i64>) -> String {
    room_id
        .and_then(|id| rooms.iter().find(|room| room.id == id))
        .map(|room| room.name.clone())
        .unwrap_or_else(|| "No room".to_string())
}

pub fn render_booking_dialog(
    ctx: &egui::Context,
    form: &mut BookingForm,
    pending: &PendingAppointment,
    rooms: &[&Room],
) -> BookingDialogAction {
    let mut action = BookingDialogAction::None;

    egui::Window::new("New Appointment")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(format!(
                "{}  {} - {}",
                pending.start.format("%a %d %b %Y"),
                pending.start.format("%H:%M"),
                pending.end.format("%H:%M")
            ));
            ui.add_space(6.0);

            egui::Grid::new("booking_form_grid")
                .num_columns(2)
                .spacing([8.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Patient ID");
                    ui.text_edit_singleline(&mut form.patient_id);
                    ui.end_row();

                    ui.label("Title");
                    ui.text_edit_singleline(&mut form.title);
                    ui.end_row();

                    ui.label("Notes");
                    ui.text_edit_multiline(&mut form.description);
                    ui.end_row();

                    ui.label("Room");
                    egui::ComboBox::from_id_source("booking_room")
                        .selected_text(room_label(rooms, form.room_id))
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut form.room_id, None, "No room");
                            for room in rooms.iter().filter(|room| room.is_active) {
                                ui.selectable_value(&mut form.room_id, Some(room.id), &room.name);
                            }
                        });
                    ui.end_row();
                });

            if !pending.conflicts.is_empty() {
                ui.add_space(6.0);
                ui.label(
                    RichText::new(format!(
                        "Overlaps {} appointment(s) in this room:",
                        pending.conflicts.len()
                    ))
                    .color(Color32::from_rgb(220, 60, 60)),
                );
                for conflict in &pending.conflicts {
                    ui.label(format!(
                        "  {} - {}  {}",
                        conflict.start_time.format("%H:%M"),
                        conflict.end_time.format("%H:%M"),
                        conflict.title
                    ));
                }
            }

            if let Some(error) = &form.error {
                ui.add_space(6.0);
                ui.colored_label(Color32::from_rgb(220, 60, 60), error);
            }

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Book").clicked() {
                    match form.to_details() {
                        Ok(details) => action = BookingDialogAction::Confirm(details),
                        Err(message) => form.error = Some(message),
                    }
                }
                if ui.button("Cancel").clicked() {
                    action = BookingDialogAction::Cancel;
                }
            });
        });

    action
}

pub enum AppointmentAction {
    None,
    Close,
    /// Move by this many slots
    Shift(i64),
    DuplicateNextDay,
    Delete,
}

/// One-line occupancy summary for the appointment window.
pub fn availability_summary(availability: &RoomAvailability) -> String {
    if availability.is_available {
        return format!("{} is free now", availability.room.name);
    }
    match availability.next_available {
        Some(at) => format!("{} is busy until {}", availability.room.name, at.format("%H:%M")),
        None => format!("{} is busy for the rest of the day", availability.room.name),
    }
}

pub fn render_appointment_window(
    ctx: &egui::Context,
    appointment: &Appointment,
    room_name: Option<&str>,
    room_status: Option<&str>,
) -> AppointmentAction {
    let mut action = AppointmentAction::None;
    let mut open = true;

    egui::Window::new(&appointment.title)
        .id(egui::Id::new(("appointment_details", appointment.id)))
        .collapsible(false)
        .open(&mut open)
        .show(ctx, |ui| {
            ui.label(format!(
                "{} - {}",
                appointment.start_time.format("%a %d %b %H:%M"),
                appointment.end_time.format("%H:%M")
            ));
            ui.label(format!("Patient #{}", appointment.patient_id));
            ui.label(format!("Room: {}", room_name.unwrap_or("none")));
            if let Some(status) = room_status {
                ui.weak(status);
            }
            ui.label(format!("Status: {}", appointment.status));
            if let Some(description) = &appointment.description {
                ui.separator();
                ui.label(description);
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("⬆ Earlier").clicked() {
                    action = AppointmentAction::Shift(-1);
                }
                if ui.button("⬇ Later").clicked() {
                    action = AppointmentAction::Shift(1);
                }
                if ui.button("Copy to next day").clicked() {
                    action = AppointmentAction::DuplicateNextDay;
                }
                if ui.button("🗑 Delete").clicked() {
                    action = AppointmentAction::Delete;
                }
            });
        });

    if !open {
        action = AppointmentAction::Close;
    }
    action
}
