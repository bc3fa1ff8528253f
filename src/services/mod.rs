// Service module exports
// Each service borrows the shared SQLite connection

pub mod appointment;
pub mod config;
pub mod database;
pub mod room;
pub mod settings;
