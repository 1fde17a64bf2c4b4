//! Motor Command Encoder
//!
//! Holds the 20-byte `0x31` setpoint buffer and turns velocity, angle and
//! brake requests into frames.
//!
//! ```text
//! [0-15]  : Power Up ports 1-4, i32 little-endian, 4 bytes each
//! [16]    : Power Function port A, i8
//! [17]    : Power Function port B, i8
//! [18]    : Reserved
//! [19]    : Brake flags, bit n = port n
//! ```
//!
//! Every `0x31` frame carries the whole buffer, so values written for one
//! port stay in effect until that port is written again.

use crate::domain::models::{ModeGroupRequest, MotorMode, Port};
use crate::infrastructure::buwizz::error::Result;
use crate::infrastructure::buwizz::modes::PortModeController;
use crate::infrastructure::buwizz::protocol::{
    encode_angle, encode_pf_servo_byte, encode_velocity_byte, write_i32_le, write_i8,
    CommandFrame, Opcode, SETPOINT_LEN,
};

const PF_OFFSET: usize = 16;
const BRAKE_OFFSET: usize = 19;

/// Persistent `0x31` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetpointBuffer {
    bytes: [u8; SETPOINT_LEN],
}

impl SetpointBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; SETPOINT_LEN],
        }
    }

    pub fn as_bytes(&self) -> &[u8; SETPOINT_LEN] {
        &self.bytes
    }

    fn write_pu(&mut self, pu_index: usize, value: i32) {
        write_i32_le(&mut self.bytes, 4 * pu_index, value);
    }

    fn write_pf(&mut self, port: Port, value: i8) {
        write_i8(&mut self.bytes, PF_OFFSET + (port.index() - 4), value);
    }

    /// Replaces the brake byte, flags of other ports are cleared
    fn set_brake(&mut self, port: Port) {
        self.bytes[BRAKE_OFFSET] = 1 << port.index();
    }

    fn to_frame(&self) -> CommandFrame {
        CommandFrame::new(Opcode::SetMotorData, &self.bytes)
    }
}

impl Default for SetpointBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CommandEncoder {
    buffer: SetpointBuffer,
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self {
            buffer: SetpointBuffer::new(),
        }
    }

    pub fn buffer(&self) -> &SetpointBuffer {
        &self.buffer
    }

    /// Drive a port at `velocity` in [-1, 1].
    ///
    /// Power Up ports are first moved into a motor mode; the returned frames
    /// are in send order, mode change first.
    pub fn set_velocity(
        &mut self,
        modes: &mut PortModeController,
        port: Port,
        velocity: f64,
    ) -> Result<Vec<CommandFrame>> {
        let mut frames = Vec::with_capacity(2);

        match port.pu_index() {
            Some(index) => {
                frames.extend(modes.request_group(port, ModeGroupRequest::Motor)?);

                let mut velocity = velocity;
                if modes.mode_of(port)? == MotorMode::Position {
                    velocity -= modes.reference_of(port)?;
                }
                self.buffer
                    .write_pu(index, encode_velocity_byte(velocity) as i32);
            }
            None => self.buffer.write_pf(port, encode_velocity_byte(velocity)),
        }

        frames.push(self.buffer.to_frame());
        Ok(frames)
    }

    /// Turn a port to `degrees`.
    ///
    /// Power Up ports take whole degrees after switching to a servo mode.
    /// Power Function servos only hold -90, 0 and 90, anything else snaps
    /// to the nearest of those.
    pub fn set_angle(
        &mut self,
        modes: &mut PortModeController,
        port: Port,
        degrees: f64,
    ) -> Result<Vec<CommandFrame>> {
        let mut frames = Vec::with_capacity(2);

        match port.pu_index() {
            Some(index) => {
                frames.extend(modes.request_group(port, ModeGroupRequest::Servo)?);

                let mut degrees = degrees;
                if modes.mode_of(port)? == MotorMode::Position {
                    degrees -= modes.reference_of(port)?;
                }
                self.buffer.write_pu(index, encode_angle(degrees));
            }
            None => self.buffer.write_pf(port, encode_pf_servo_byte(degrees)),
        }

        frames.push(self.buffer.to_frame());
        Ok(frames)
    }

    pub fn brake(&mut self, port: Port) -> CommandFrame {
        self.buffer.set_brake(port);
        self.buffer.to_frame()
    }

    pub fn hibernate(&self) -> CommandFrame {
        CommandFrame::new(Opcode::Hibernate, &[])
    }
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self::new()
    }
}
