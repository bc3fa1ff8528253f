// Vet Calendar Application
// Main entry point

use vet_calendar::ui_egui::CalendarApp;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::init();

    log::info!("Starting Vet Calendar");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Vet Calendar"),
        ..Default::default()
    };

    eframe::run_native(
        "Vet Calendar",
        options,
        Box::new(|cc| Ok(Box::new(CalendarApp::new(cc)?))),
    )
}
