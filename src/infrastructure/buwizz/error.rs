use crate::domain::models::{MotorMode, Port};
use thiserror::Error;

/// Failures reported by the link below the protocol core
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device is not connected")]
    Disconnected,

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Notification subscription failed: {0}")]
    Notifications(String),
}

/// Protocol level errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid port: {0}")]
    InvalidPort(u8),

    #[error("Malformed telemetry frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// Reserved for device variants whose ports lack a mode
    #[error("Mode {mode} is not supported on {port}")]
    UnsupportedMode { port: Port, mode: MotorMode },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
