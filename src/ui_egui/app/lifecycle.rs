#[cfg(not(debug_assertions))]
use directories::ProjectDirs;

use super::CalendarApp;
use crate::scheduling::{CalendarViewController, TimeGrid, ViewKind};
use crate::services::appointment::AppointmentService;
use crate::services::config::GridConfig;
use crate::services::database::Database;
use crate::services::settings::SettingsService;
use anyhow::{Context, Result};
use chrono::Local;

impl CalendarApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Result<Self> {
        // Leaked for the 'static lifetime the services borrow
        let database = initialize_database()?;
        let settings = SettingsService::new(database).get_or_default();
        let grid_config = GridConfig::load_default();
        log::info!(
            "Loaded settings: {}-minute slots, {} to {}, {} policy",
            settings.slot_interval_minutes,
            settings.day_start_time,
            settings.day_end_time,
            settings.conflict_policy
        );

        let view = settings.current_view.parse().unwrap_or(ViewKind::Day);
        let store = AppointmentService::new(database.connection())
            .with_granularity(settings.slot_interval_minutes);
        let controller = CalendarViewController::new(
            store,
            TimeGrid::from_settings(&settings, &grid_config),
            Local::now().date_naive(),
        )
        .with_view(view)
        .with_policy(settings.conflict_policy)
        .with_show_cancelled(settings.show_cancelled)
        .with_drag_threshold(grid_config.min_drag_pixels);

        let mut app = Self {
            database,
            settings,
            grid_config,
            controller,
            booking_form: None,
            selected_appointment: None,
            selected_room_status: None,
            status: None,
        };

        let rooms = app.room_service();
        if let Err(e) = app.controller.load_rooms(&rooms) {
            app.report_error("Failed to load rooms", e);
        }
        if let Err(e) = app.controller.refresh() {
            app.report_error("Failed to load appointments", e);
        }

        Ok(app)
    }

    pub(super) fn handle_exit(&mut self) {
        self.controller.teardown();
        log::info!("Calendar closed");
    }
}

fn database_path() -> Result<String> {
    #[cfg(debug_assertions)]
    let db_path = "calendar.db".to_string();

    #[cfg(not(debug_assertions))]
    let db_path = {
        if let Some(proj_dirs) = ProjectDirs::from("com", "VetClinic", "VetCalendar") {
            let data_dir = proj_dirs.data_dir();
            std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
            data_dir.join("calendar.db").to_string_lossy().to_string()
        } else {
            "calendar_prod.db".to_string()
        }
    };

    Ok(db_path)
}

fn initialize_database() -> Result<&'static Database> {
    let db_path = database_path()?;
    let db = Database::new(&db_path)?;
    db.initialize_schema()
        .context("Failed to initialize database schema")?;
    log::info!("Opened database at {}", db_path);

    Ok(Box::leak(Box::new(db)))
}
