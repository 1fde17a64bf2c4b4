//! BuWizz 3.0 Protocol
//!
//! Opcodes, frame layout helpers and the fixed scaling rules of the
//! application characteristic.

use std::fmt;

/// BuWizz 3.0 BLE Service UUID
pub const SERVICE_UUID: &str = "500592d1-74fb-4481-88b3-9919b1676e93";

/// Application characteristic (write + notify), carries every frame below
pub const APPLICATION_CHAR_UUID: &str = "50052901-74fb-4481-88b3-9919b1676e93";

/// Size of the `0x31` motor data payload
pub const SETPOINT_LEN: usize = 20;

/// Size of the `0x50` / `0x51` per-port vectors
pub const PORT_VECTOR_LEN: usize = 4;

/// Size of an application notification
pub const STATUS_FRAME_LEN: usize = 54;

/// Refresh interval bounds in milliseconds, 5 ms per raw step
pub const REFRESH_RATE_MIN_MS: i32 = 100;
pub const REFRESH_RATE_MAX_MS: i32 = 1275;
pub const REFRESH_RATE_STEP_MS: i32 = 5;

/// Power Function servo can only hold left, centre and right
pub const PF_SERVO_POSITIONS: [i8; 3] = [-127, 0, 127];

/// Telemetry scaling factors
pub mod scale {
    /// Accelerometer, milli-g per LSB
    pub const ACCEL_MG_PER_LSB: f64 = 0.488;
    /// Battery voltage at raw 0
    pub const VOLTAGE_BASE: f64 = 9.0;
    /// Volts per raw step
    pub const VOLTAGE_STEP: f64 = 0.05;
    /// Power Up speed divisor
    pub const PU_SPEED_DIVISOR: f64 = 131.0;
}

/// Outbound frame selector, first byte on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Full 20-byte setpoint buffer
    SetMotorData,
    /// Telemetry refresh interval, 1 byte
    SetDataRefreshRate,
    /// Power Up mode vector, 4 bytes
    SetPortMode,
    /// PID status report enable vector, 4 bytes
    SetPidStatusEnable,
    /// Shelf mode, no payload
    Hibernate,
}

impl Opcode {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::SetMotorData => 0x31,
            Self::SetDataRefreshRate => 0x32,
            Self::SetPortMode => 0x50,
            Self::SetPidStatusEnable => 0x51,
            Self::Hibernate => 0xA1,
        }
    }
}

/// One outbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl CommandFrame {
    pub fn new(opcode: Opcode, payload: &[u8]) -> Self {
        Self {
            opcode,
            payload: payload.to_vec(),
        }
    }

    /// Bytes as written to the application characteristic
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload.len());
        bytes.push(self.opcode.as_byte());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04X} {:02X?}", self.opcode.as_byte(), self.payload)
    }
}

// Field access. Offsets are produced by this crate, an out of range
// offset is a bug and panics on the slice index.

pub fn write_i32_le(buffer: &mut [u8], offset: usize, value: i32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn write_i8(buffer: &mut [u8], offset: usize, value: i8) {
    buffer[offset] = value as u8;
}

pub fn read_u16_le(buffer: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

pub fn read_i16_le(buffer: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

pub fn read_u32_le(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

/// Map a velocity in [-1, 1] onto the signed byte range.
///
/// `clip(round((v + 1) * 255 / 2 - 127), -127, 127)`, ties to even.
pub fn encode_velocity_byte(velocity: f64) -> i8 {
    let raw = ((velocity + 1.0) * 127.5 - 127.0).round_ties_even();
    raw.clamp(-127.0, 127.0) as i8
}

/// Power Up servo setpoint, whole degrees truncated toward zero
pub fn encode_angle(degrees: f64) -> i32 {
    degrees.trunc() as i32
}

/// Quantize an angle onto the three Power Function servo positions
pub fn encode_pf_servo_byte(degrees: f64) -> i8 {
    let step = (degrees / 90.0).round_ties_even().clamp(-1.0, 1.0) as i8;
    PF_SERVO_POSITIONS[(step + 1) as usize]
}

/// Raw `0x32` payload for a refresh interval in milliseconds
pub fn encode_refresh_rate(rate_ms: i32) -> u8 {
    (rate_ms.clamp(REFRESH_RATE_MIN_MS, REFRESH_RATE_MAX_MS) / REFRESH_RATE_STEP_MS) as u8
}

pub fn accel_to_milli_g(raw: i16) -> f64 {
    raw as f64 * scale::ACCEL_MG_PER_LSB
}

pub fn voltage_from_raw(raw: u8) -> f64 {
    scale::VOLTAGE_BASE + raw as f64 * scale::VOLTAGE_STEP
}

pub fn pu_speed_from_raw(raw: i8) -> f64 {
    raw as f64 / scale::PU_SPEED_DIVISOR
}
