//! Power Up Port Mode Controller
//!
//! Tracks the operating mode and reference of ports 1-4 and emits the
//! `0x50` mode vector only when a port actually changes mode. The device
//! has no partial update, so every frame carries all four ports.

use crate::domain::models::{
    ModeGroup, ModeGroupRequest, MotorMode, Port, PortState, PU_PORT_COUNT,
};
use crate::infrastructure::buwizz::error::{ProtocolError, Result};
use crate::infrastructure::buwizz::protocol::{CommandFrame, Opcode, PORT_VECTOR_LEN};
use tracing::debug;

/// Group request against the current group, and the mode it moves to.
/// `None` keeps the current mode.
pub const MODE_TRANSITIONS: &[(ModeGroupRequest, ModeGroup, Option<MotorMode>)] = &[
    (ModeGroupRequest::Motor, ModeGroup::Motor, None),
    (ModeGroupRequest::Motor, ModeGroup::Servo, Some(MotorMode::Pwm)),
    (ModeGroupRequest::Servo, ModeGroup::Motor, Some(MotorMode::Absolute)),
    (ModeGroupRequest::Servo, ModeGroup::Servo, None),
];

#[derive(Debug, Clone)]
pub struct PortModeController {
    ports: [PortState; PU_PORT_COUNT],
    mode_vector: [u8; PORT_VECTOR_LEN],
    pid_enable_vector: [u8; PORT_VECTOR_LEN],
}

impl PortModeController {
    pub fn new() -> Self {
        let ports = [PortState::default(); PU_PORT_COUNT];
        let mut mode_vector = [0u8; PORT_VECTOR_LEN];
        for (byte, state) in mode_vector.iter_mut().zip(ports.iter()) {
            *byte = state.mode.code();
        }

        Self {
            ports,
            mode_vector,
            pid_enable_vector: [0u8; PORT_VECTOR_LEN],
        }
    }

    /// Mode the port ends up in for a group request
    pub fn resolve(&self, port: Port, request: ModeGroupRequest) -> Result<MotorMode> {
        let current = self.state(port)?.mode;
        let target = MODE_TRANSITIONS
            .iter()
            .find(|(req, group, _)| *req == request && *group == current.group())
            .and_then(|(_, _, target)| *target);

        Ok(target.unwrap_or(current))
    }

    /// Switch a port to `mode`.
    ///
    /// Returns the `0x50` frame to send, or `None` when the port is already
    /// in that mode. The reference is only stored for Position and Speed.
    pub fn set_mode(
        &mut self,
        port: Port,
        mode: MotorMode,
        reference: f64,
    ) -> Result<Option<CommandFrame>> {
        let index = pu_index(port)?;
        let state = &mut self.ports[index];

        if state.mode == mode {
            return Ok(None);
        }

        debug!("{}: mode {} -> {}", port, state.mode, mode);
        state.mode = mode;
        self.mode_vector[index] = mode.code();

        if matches!(mode, MotorMode::Position | MotorMode::Speed) {
            state.base_reference = reference;
        }

        Ok(Some(CommandFrame::new(Opcode::SetPortMode, &self.mode_vector)))
    }

    /// Resolve a group request and apply it
    pub fn request_group(
        &mut self,
        port: Port,
        request: ModeGroupRequest,
    ) -> Result<Option<CommandFrame>> {
        let mode = self.resolve(port, request)?;
        self.set_mode(port, mode, 0.0)
    }

    /// Enable or disable PID status reports for a port.
    /// Always produces a frame, the device has no read-back for this vector.
    pub fn set_pid_status_enable(&mut self, port: Port, enabled: bool) -> Result<CommandFrame> {
        let index = pu_index(port)?;
        self.pid_enable_vector[index] = u8::from(enabled);
        Ok(CommandFrame::new(
            Opcode::SetPidStatusEnable,
            &self.pid_enable_vector,
        ))
    }

    pub fn mode_of(&self, port: Port) -> Result<MotorMode> {
        Ok(self.state(port)?.mode)
    }

    pub fn reference_of(&self, port: Port) -> Result<f64> {
        Ok(self.state(port)?.base_reference)
    }

    /// Modes and references of ports 1-4, in port order
    pub fn snapshot(&self) -> ([MotorMode; PU_PORT_COUNT], [f64; PU_PORT_COUNT]) {
        (
            self.ports.map(|state| state.mode),
            self.ports.map(|state| state.base_reference),
        )
    }

    fn state(&self, port: Port) -> Result<&PortState> {
        Ok(&self.ports[pu_index(port)?])
    }
}

impl Default for PortModeController {
    fn default() -> Self {
        Self::new()
    }
}

fn pu_index(port: Port) -> Result<usize> {
    port.pu_index()
        .ok_or(ProtocolError::InvalidPort(port.index() as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let modes = PortModeController::new();
        for port in Port::POWER_UP {
            assert_eq!(modes.mode_of(port).unwrap(), MotorMode::Pwm);
            assert_eq!(modes.reference_of(port).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_motor_request_is_idempotent() {
        let mut modes = PortModeController::new();
        modes.set_mode(Port::Port1, MotorMode::Position, 0.0).unwrap();

        let first = modes.request_group(Port::Port1, ModeGroupRequest::Motor).unwrap();
        let second = modes.request_group(Port::Port1, ModeGroupRequest::Motor).unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(modes.mode_of(Port::Port1).unwrap(), MotorMode::Pwm);
    }

    #[test]
    fn test_servo_request_from_pwm() {
        let mut modes = PortModeController::new();
        assert_eq!(
            modes.resolve(Port::Port2, ModeGroupRequest::Servo).unwrap(),
            MotorMode::Absolute
        );

        let frame = modes
            .request_group(Port::Port2, ModeGroupRequest::Servo)
            .unwrap()
            .unwrap();
        assert_eq!(frame.opcode, Opcode::SetPortMode);
        assert_eq!(frame.payload, vec![0x00, 0x16, 0x00, 0x00]);

        assert!(modes
            .request_group(Port::Port2, ModeGroupRequest::Servo)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_transition_table() {
        let mut modes = PortModeController::new();
        let cases = [
            (MotorMode::Speed, ModeGroupRequest::Motor, MotorMode::Speed),
            (MotorMode::Default, ModeGroupRequest::Motor, MotorMode::Default),
            (MotorMode::Speed, ModeGroupRequest::Servo, MotorMode::Absolute),
            (MotorMode::Position, ModeGroupRequest::Motor, MotorMode::Pwm),
            (MotorMode::Absolute, ModeGroupRequest::Motor, MotorMode::Pwm),
            (MotorMode::Position, ModeGroupRequest::Servo, MotorMode::Position),
            (MotorMode::Absolute, ModeGroupRequest::NoChange, MotorMode::Absolute),
        ];

        for (current, request, expected) in cases {
            modes.set_mode(Port::Port3, current, 0.0).unwrap();
            assert_eq!(
                modes.resolve(Port::Port3, request).unwrap(),
                expected,
                "{:?} + {:?}",
                current,
                request
            );
        }
    }

    #[test]
    fn test_mode_vector_keeps_other_ports() {
        let mut modes = PortModeController::new();
        modes.set_mode(Port::Port1, MotorMode::Speed, 0.2).unwrap();
        let frame = modes
            .set_mode(Port::Port4, MotorMode::Default, 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(frame.payload, vec![0x14, 0x00, 0x00, 0x10]);
    }

    #[test]
    fn test_reference_handling() {
        let mut modes = PortModeController::new();
        modes.set_mode(Port::Port1, MotorMode::Position, 90.0).unwrap();
        assert_eq!(modes.reference_of(Port::Port1).unwrap(), 90.0);

        // Absolute keeps whatever was stored before
        modes.set_mode(Port::Port1, MotorMode::Absolute, 10.0).unwrap();
        assert_eq!(modes.reference_of(Port::Port1).unwrap(), 90.0);

        modes.set_mode(Port::Port1, MotorMode::Speed, 0.25).unwrap();
        assert_eq!(modes.reference_of(Port::Port1).unwrap(), 0.25);

        // Same mode is a no-op, reference untouched
        assert!(modes
            .set_mode(Port::Port1, MotorMode::Speed, 0.5)
            .unwrap()
            .is_none());
        assert_eq!(modes.reference_of(Port::Port1).unwrap(), 0.25);
    }

    #[test]
    fn test_power_function_ports_rejected() {
        let mut modes = PortModeController::new();
        assert!(matches!(
            modes.set_mode(Port::PortA, MotorMode::Speed, 0.0),
            Err(ProtocolError::InvalidPort(4))
        ));
        assert!(matches!(
            modes.mode_of(Port::PortB),
            Err(ProtocolError::InvalidPort(5))
        ));
        assert!(modes.set_pid_status_enable(Port::PortB, true).is_err());
    }

    #[test]
    fn test_pid_enable_always_sends_full_vector() {
        let mut modes = PortModeController::new();
        let first = modes.set_pid_status_enable(Port::Port2, true).unwrap();
        let again = modes.set_pid_status_enable(Port::Port2, true).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.opcode, Opcode::SetPidStatusEnable);
        assert_eq!(first.payload, vec![0, 1, 0, 0]);

        modes.set_pid_status_enable(Port::Port4, true).unwrap();
        let cleared = modes.set_pid_status_enable(Port::Port2, false).unwrap();
        assert_eq!(cleared.payload, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_snapshot() {
        let mut modes = PortModeController::new();
        modes.set_mode(Port::Port3, MotorMode::Position, -90.0).unwrap();
        let (port_modes, refs) = modes.snapshot();
        assert_eq!(port_modes[2], MotorMode::Position);
        assert_eq!(refs, [0.0, 0.0, -90.0, 0.0]);
    }
}
