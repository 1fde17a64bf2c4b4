//! Telemetry Decoder
//!
//! # Status Frame Structure (54 bytes)
//!
//! ```text
//! [0]      : Message type
//! [1]      : Status flags
//!            bit 0    : Error
//!            bit 1    : Motion wakeup enabled
//!            bit 2    : BLE long range enabled
//!            bit 3-4  : Battery level (0-3)
//!            bit 5    : Charging
//!            bit 6    : USB connecting
//! [2]      : Battery voltage, 9 V + n * 50 mV
//! [3-8]    : Reserved
//! [9]      : Temperature
//! [10-15]  : Accelerometer X, Y, Z (i16 little-endian, 0.488 mg/LSB)
//! [16-20]  : Reserved
//! [21]     : Battery charge current
//! [22-53]  : Power Up motor blocks, 8 bytes each
//!            +0    : Motor type (u8)
//!            +1    : Velocity (i8)
//!            +2-3  : Absolute position (u16 little-endian)
//!            +4-7  : Position (u32 little-endian)
//! ```

use crate::domain::models::{BuwizzStatus, MotorMode, MotorStatus, PU_PORT_COUNT};
use crate::infrastructure::buwizz::error::{ProtocolError, Result};
use crate::infrastructure::buwizz::protocol::{
    accel_to_milli_g, pu_speed_from_raw, read_i16_le, read_u16_le, read_u32_le,
    voltage_from_raw, STATUS_FRAME_LEN,
};

const MOTOR_BLOCK_OFFSET: usize = 22;
const MOTOR_BLOCK_LEN: usize = 8;

/// Decode a status frame.
///
/// `port_modes` and `port_refs` are the mode controller's view at decode
/// time; Speed ports get their reference added to the speed, Position
/// ports to the position.
pub fn decode(
    raw: &[u8],
    port_modes: &[MotorMode; PU_PORT_COUNT],
    port_refs: &[f64; PU_PORT_COUNT],
) -> Result<BuwizzStatus> {
    if raw.len() != STATUS_FRAME_LEN {
        return Err(ProtocolError::MalformedFrame {
            expected: STATUS_FRAME_LEN,
            actual: raw.len(),
        });
    }

    let flags = raw[1];
    let mut motors = [MotorStatus::default(); PU_PORT_COUNT];
    for (i, motor) in motors.iter_mut().enumerate() {
        let start = MOTOR_BLOCK_OFFSET + i * MOTOR_BLOCK_LEN;
        let block = &raw[start..start + MOTOR_BLOCK_LEN];
        *motor = decode_motor(block, port_modes[i], port_refs[i]);
    }

    Ok(BuwizzStatus {
        error: flags & 0x01 != 0,
        motion_wakeup_enable: (flags >> 1) & 0x01 != 0,
        ble_longrange_enable: (flags >> 2) & 0x01 != 0,
        battery_level: (flags >> 3) & 0x03,
        charging: (flags >> 5) & 0x01 != 0,
        usb_connecting: (flags >> 6) & 0x01 != 0,
        voltage: voltage_from_raw(raw[2]),
        temperature: raw[9],
        acc_x: accel_to_milli_g(read_i16_le(raw, 10)),
        acc_y: accel_to_milli_g(read_i16_le(raw, 12)),
        acc_z: accel_to_milli_g(read_i16_le(raw, 14)),
        battery_charge_current: raw[21],
        motors,
    })
}

fn decode_motor(block: &[u8], mode: MotorMode, reference: f64) -> MotorStatus {
    let raw_speed = block[1] as i8;
    let abs_position = read_u16_le(block, 2);

    let speed_offset = if mode == MotorMode::Speed { reference } else { 0.0 };
    let position = if mode == MotorMode::Position {
        abs_position as f64 + reference
    } else {
        abs_position as f64
    };

    MotorStatus {
        motor_type: block[0],
        speed: pu_speed_from_raw(raw_speed) + speed_offset,
        abs_position,
        position,
        raw_position: read_u32_le(block, 4),
    }
}
