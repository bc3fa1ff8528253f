use crate::models::settings::Settings;
use crate::services::database::Database;
use anyhow::{anyhow, Context, Result};

use super::mapper::{row_to_settings, SETTINGS_COLUMNS};

pub struct SettingsService<'a> {
    db: &'a Database,
}

impl<'a> SettingsService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get the current settings
    pub fn get(&self) -> Result<Settings> {
        let conn = self.db.connection();

        let settings = conn
            .query_row(
                &format!("SELECT {} FROM settings WHERE id = 1", SETTINGS_COLUMNS),
                [],
                row_to_settings,
            )
            .context("Failed to load settings")?;

        Ok(settings)
    }

    /// Get the current settings, falling back to defaults when the stored row is unusable.
    pub fn get_or_default(&self) -> Settings {
        match self.get() {
            Ok(settings) if settings.validate().is_ok() => settings,
            Ok(settings) => {
                log::warn!(
                    "Stored settings are invalid ({:?}); using defaults",
                    settings.validate().err()
                );
                Settings::default()
            }
            Err(e) => {
                log::warn!("Failed to load settings: {:#}; using defaults", e);
                Settings::default()
            }
        }
    }

    /// Update settings
    pub fn update(&self, settings: &Settings) -> Result<()> {
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;

        let conn = self.db.connection();

        conn.execute(
            "UPDATE settings \
             SET slot_interval_minutes = ?1, \
                 day_start_time = ?2, \
                 day_end_time = ?3, \
                 current_view = ?4, \
                 conflict_policy = ?5, \
                 show_cancelled = ?6, \
                 default_appointment_duration = ?7, \
                 updated_at = CURRENT_TIMESTAMP \
             WHERE id = 1",
            (
                settings.slot_interval_minutes,
                &settings.day_start_time,
                &settings.day_end_time,
                &settings.current_view,
                settings.conflict_policy.as_str(),
                settings.show_cancelled as i32,
                settings.default_appointment_duration,
            ),
        )
        .context("Failed to update settings")?;

        log::info!("Settings updated");
        Ok(())
    }

    /// Reset settings to defaults
    pub fn reset(&self) -> Result<()> {
        self.update(&Settings::default())
    }
}
