//! BuWizz Module
//!
//! Protocol engine for the BuWizz 3.0 motor controller.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Buwizz3                           │
//! │   (Session - owns state, sends frames in order)          │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!      ┌────────────┬───┴────────┬─────────────┐
//!      │            │            │             │
//!      ▼            ▼            ▼             ▼
//! ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐
//! │  Modes  │ │ Encoder  │ │  Status  │ │ Transport │
//! │         │ │          │ │          │ │           │
//! │ - 0x50  │ │ - 0x31   │ │ - 54 B   │ │ - writes  │
//! │ - 0x51  │ │ - 0xA1   │ │   decode │ │ - latest  │
//! │         │ │          │ │          │ │   notify  │
//! └─────────┘ └──────────┘ └──────────┘ └───────────┘
//!        \         |         /
//!         ▼        ▼        ▼
//!        ┌──────────────────┐
//!        │     Protocol     │
//!        │ opcodes, scaling │
//!        └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Opcodes, byte layout helpers and scaling
//! - [`modes`] - Power Up port mode state machine
//! - [`encoder`] - Setpoint buffer and motor command frames
//! - [`status`] - Telemetry frame decoding
//! - [`transport`] - Link trait and telemetry slot
//! - [`device`] - Session coordinator

pub mod device;
pub mod encoder;
pub mod error;
pub mod modes;
pub mod protocol;
pub mod status;
pub mod transport;

// Re-export main session for convenience
pub use device::Buwizz3;
