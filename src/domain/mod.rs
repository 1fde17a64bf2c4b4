pub mod control;
pub mod models;
pub mod settings;
