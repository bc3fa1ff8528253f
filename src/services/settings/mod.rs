// Settings service module
// Loads and stores the single calendar settings row

mod mapper;
mod service;

pub use service::SettingsService;
