use crate::infrastructure::buwizz::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of Power Up (geared motor) ports
pub const PU_PORT_COUNT: usize = 4;

/// Output ports of a BuWizz 3.0
///
/// Ports 1-4 are Power Up ports with a mode state machine,
/// A and B are Power Function ports (plain motor or 3-position servo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Port {
    Port1 = 0,
    Port2 = 1,
    Port3 = 2,
    Port4 = 3,
    PortA = 4,
    PortB = 5,
}

impl Port {
    pub const ALL: [Port; 6] = [
        Port::Port1,
        Port::Port2,
        Port::Port3,
        Port::Port4,
        Port::PortA,
        Port::PortB,
    ];

    pub const POWER_UP: [Port; PU_PORT_COUNT] =
        [Port::Port1, Port::Port2, Port::Port3, Port::Port4];

    /// Wire index, 0-5
    pub fn index(self) -> usize {
        self as usize
    }

    /// Index into the per-port mode arrays, `None` for Power Function ports
    pub fn pu_index(self) -> Option<usize> {
        match self {
            Port::Port1 | Port::Port2 | Port::Port3 | Port::Port4 => Some(self as usize),
            Port::PortA | Port::PortB => None,
        }
    }

    pub fn is_power_up(self) -> bool {
        self.pu_index().is_some()
    }
}

impl TryFrom<u8> for Port {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Port::ALL
            .get(value as usize)
            .copied()
            .ok_or(ProtocolError::InvalidPort(value))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Port::Port1 => "1",
            Port::Port2 => "2",
            Port::Port3 => "3",
            Port::Port4 => "4",
            Port::PortA => "A",
            Port::PortB => "B",
        };
        write!(f, "port {}", label)
    }
}

/// Operating mode of a Power Up port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorMode {
    /// Firmware default, input in [-1, 1]
    Default,
    /// Plain PWM, input in [-1, 1]
    Pwm,
    /// Closed loop speed, input in [-1, 1]
    Speed,
    /// Angle in degrees relative to a locally held zero point
    Position,
    /// Absolute angle in degrees
    Absolute,
}

impl MotorMode {
    /// Mode byte written into the `0x50` mode vector.
    ///
    /// Position shares the absolute code; the zero point offset is applied
    /// on this side of the link.
    pub fn code(self) -> u8 {
        match self {
            MotorMode::Pwm => 0x00,
            MotorMode::Default => 0x10,
            MotorMode::Speed => 0x14,
            MotorMode::Position => 0x16,
            MotorMode::Absolute => 0x16,
        }
    }

    pub fn group(self) -> ModeGroup {
        match self {
            MotorMode::Default | MotorMode::Pwm | MotorMode::Speed => ModeGroup::Motor,
            MotorMode::Position | MotorMode::Absolute => ModeGroup::Servo,
        }
    }
}

impl fmt::Display for MotorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotorMode::Default => "default",
            MotorMode::Pwm => "pwm",
            MotorMode::Speed => "speed",
            MotorMode::Position => "position",
            MotorMode::Absolute => "absolute",
        };
        f.write_str(name)
    }
}

/// Family a concrete mode belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeGroup {
    Motor,
    Servo,
}

/// Coarse mode request that resolves against the port's current mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeGroupRequest {
    NoChange,
    Motor,
    Servo,
}

/// Mode state held for one Power Up port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortState {
    pub mode: MotorMode,
    /// Zero point for Position mode, speed offset for Speed mode
    pub base_reference: f64,
}

impl Default for PortState {
    fn default() -> Self {
        Self {
            mode: MotorMode::Pwm,
            base_reference: 0.0,
        }
    }
}

/// Decoded status of one Power Up motor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MotorStatus {
    pub motor_type: u8,
    /// Speed, offset by the port reference in Speed mode
    pub speed: f64,
    /// Absolute position as reported, never adjusted
    pub abs_position: u16,
    /// Absolute position, offset by the port reference in Position mode
    pub position: f64,
    /// 32-bit position counter as reported
    pub raw_position: u32,
}

/// Decoded 54-byte telemetry frame
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BuwizzStatus {
    pub error: bool,
    pub motion_wakeup_enable: bool,
    pub ble_longrange_enable: bool,
    /// 2-bit level, 0-3
    pub battery_level: u8,
    pub charging: bool,
    pub usb_connecting: bool,
    /// Volts
    pub voltage: f64,
    /// Degrees Celsius as reported
    pub temperature: u8,
    /// Milli-g
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub battery_charge_current: u8,
    pub motors: [MotorStatus; PU_PORT_COUNT],
}

impl fmt::Display for BuwizzStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        writeln!(f, "Motion Wakeup Enable: {}", self.motion_wakeup_enable)?;
        writeln!(f, "BLE Longrange Enable: {}", self.ble_longrange_enable)?;
        writeln!(f, "Charging: {}", self.charging)?;
        writeln!(f, "USB Connecting: {}", self.usb_connecting)?;
        writeln!(f, "Battery Level: {}", self.battery_level)?;
        writeln!(f, "Battery Charge Current: {}", self.battery_charge_current)?;
        writeln!(f, "Voltage: {:.2} V", self.voltage)?;
        writeln!(f, "Temperature: {} C", self.temperature)?;
        writeln!(
            f,
            "Acceleration: x={:.1} y={:.1} z={:.1} mg",
            self.acc_x, self.acc_y, self.acc_z
        )?;
        for (port, motor) in Port::POWER_UP.iter().zip(self.motors.iter()) {
            writeln!(
                f,
                "  {}: type={} speed={:.3} abs={} pos={:.1}",
                port, motor.motor_type, motor.speed, motor.abs_position, motor.position
            )?;
        }
        Ok(())
    }
}
