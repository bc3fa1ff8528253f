use super::CalendarApp;
use crate::scheduling::{ControllerError, ViewKind};

impl CalendarApp {
    pub(super) fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        let mut navigation: Option<Result<(), ControllerError>> = None;

        ui.horizontal(|ui| {
            if ui.button("◀").on_hover_text("Previous").clicked() {
                navigation = Some(self.controller.previous());
            }
            if ui.button("Today").clicked() {
                navigation = Some(self.controller.today());
            }
            if ui.button("▶").on_hover_text("Next").clicked() {
                navigation = Some(self.controller.next());
            }

            ui.separator();
            ui.heading(self.title_for_range());
            ui.separator();

            for view in [ViewKind::Day, ViewKind::Week] {
                if ui
                    .selectable_label(self.controller.view() == view, view.as_str())
                    .clicked()
                    && self.controller.view() != view
                {
                    navigation = Some(self.controller.set_view(view));
                    self.persist_view(view);
                }
            }

            ui.separator();
            let current_filter = self.controller.room_filter();
            let mut selected_filter = current_filter;
            let selected_text = current_filter
                .and_then(|id| self.controller.room(id))
                .map(|room| room.name.clone())
                .unwrap_or_else(|| "All rooms".to_string());
            let room_choices: Vec<(i64, String)> = self
                .controller
                .rooms()
                .into_iter()
                .filter(|room| room.is_active)
                .map(|room| (room.id, room.name.clone()))
                .collect();

            egui::ComboBox::from_id_source("room_filter")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut selected_filter, None, "All rooms");
                    for (id, name) in &room_choices {
                        ui.selectable_value(&mut selected_filter, Some(*id), name);
                    }
                });
            if selected_filter != current_filter {
                navigation = Some(self.controller.set_room_filter(selected_filter));
            }

            let mut show_cancelled = self.settings.show_cancelled;
            if ui.checkbox(&mut show_cancelled, "Show cancelled").changed() {
                self.settings.show_cancelled = show_cancelled;
                navigation = Some(self.controller.set_show_cancelled(show_cancelled));
                if let Err(e) = self.settings_service().update(&self.settings) {
                    log::warn!("Failed to save settings: {}", e);
                }
            }
        });

        if let Some(Err(e)) = navigation {
            self.report_error("Failed to load appointments", e);
        }
    }

    fn title_for_range(&self) -> String {
        let days = self.controller.visible_days();
        match (days.first(), days.last()) {
            (Some(first), Some(last)) if first != last => format!(
                "{} - {}",
                first.format("%d %b"),
                last.format("%d %b %Y")
            ),
            (Some(first), _) => first.format("%A %d %B %Y").to_string(),
            _ => String::new(),
        }
    }
}
