//! BuWizz 3.0 motor controller protocol engine and session runner.

pub mod domain;
pub mod infrastructure;
