//! BuWizz 3.0 Session
//!
//! Owns the mode controller, the setpoint buffer and a transport, and sends
//! the frames they produce in order. All methods take `&mut self`; hosts
//! sharing a session across tasks wrap it in a single mutex.

use crate::domain::models::{BuwizzStatus, ModeGroupRequest, MotorMode, Port};
use crate::infrastructure::buwizz::encoder::CommandEncoder;
use crate::infrastructure::buwizz::error::Result;
use crate::infrastructure::buwizz::modes::PortModeController;
use crate::infrastructure::buwizz::protocol::{encode_refresh_rate, CommandFrame, Opcode};
use crate::infrastructure::buwizz::status;
use crate::infrastructure::buwizz::transport::Transport;
use tracing::{debug, info, warn};

pub struct Buwizz3<T: Transport> {
    transport: T,
    modes: PortModeController,
    encoder: CommandEncoder,
    status_enabled: bool,
}

impl<T: Transport> Buwizz3<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            modes: PortModeController::new(),
            encoder: CommandEncoder::new(),
            status_enabled: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn modes(&self) -> &PortModeController {
        &self.modes
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await?;
        info!("BuWizz session started");
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await?;
        self.status_enabled = false;
        info!("BuWizz session closed");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Set the telemetry interval in milliseconds.
    ///
    /// Zero or negative turns notifications off. Positive values are clamped
    /// to 100-1275 ms.
    pub async fn set_data_refresh_rate(&mut self, rate_ms: i32) -> Result<()> {
        if rate_ms <= 0 {
            self.transport.disable_notifications().await?;
            self.status_enabled = false;
            info!("Telemetry disabled");
            return Ok(());
        }

        if !self.status_enabled {
            self.transport.enable_notifications().await?;
            self.status_enabled = true;
            info!("Telemetry enabled");
        }

        let raw = encode_refresh_rate(rate_ms);
        self.send(&CommandFrame::new(Opcode::SetDataRefreshRate, &[raw]))
            .await
    }

    /// Put a Power Up port into a concrete mode.
    ///
    /// `reference` is the zero point for Position and the speed offset for
    /// Speed; other modes ignore it.
    pub async fn set_powerup_motor_mode(
        &mut self,
        port: Port,
        mode: MotorMode,
        reference: f64,
    ) -> Result<()> {
        let previous = self.modes.clone();
        let frames: Vec<_> = self.modes.set_mode(port, mode, reference)?.into_iter().collect();
        self.send_all(&frames, previous).await
    }

    pub async fn request_powerup_motor_group(
        &mut self,
        port: Port,
        request: ModeGroupRequest,
    ) -> Result<()> {
        let previous = self.modes.clone();
        let frames: Vec<_> = self.modes.request_group(port, request)?.into_iter().collect();
        self.send_all(&frames, previous).await
    }

    pub async fn set_powerup_motor_pid_status_enable(
        &mut self,
        port: Port,
        enabled: bool,
    ) -> Result<()> {
        let previous = self.modes.clone();
        let frame = self.modes.set_pid_status_enable(port, enabled)?;
        self.send_all(&[frame], previous).await
    }

    pub async fn set_motor_velocity(&mut self, port: Port, velocity: f64) -> Result<()> {
        let previous = self.modes.clone();
        let frames = self.encoder.set_velocity(&mut self.modes, port, velocity)?;
        self.send_all(&frames, previous).await
    }

    pub async fn set_motor_angle(&mut self, port: Port, degrees: f64) -> Result<()> {
        let previous = self.modes.clone();
        let frames = self.encoder.set_angle(&mut self.modes, port, degrees)?;
        self.send_all(&frames, previous).await
    }

    pub async fn brake_motor(&mut self, port: Port) -> Result<()> {
        let frame = self.encoder.brake(port);
        self.send(&frame).await
    }

    /// Shelf mode. The device stays off until a charger is connected.
    pub async fn activate_hibernation(&mut self) -> Result<()> {
        warn!("Activating hibernation, a charger is needed to wake the device");
        let frame = self.encoder.hibernate();
        self.send(&frame).await
    }

    /// Decode the newest telemetry frame, if one has arrived
    pub fn get_status(&self) -> Result<Option<BuwizzStatus>> {
        let Some(raw) = self.transport.latest_notification() else {
            return Ok(None);
        };

        let (port_modes, port_refs) = self.modes.snapshot();
        status::decode(&raw, &port_modes, &port_refs).map(Some)
    }

    /// Send frames in order. If a mode or PID vector frame is not
    /// delivered, the controller goes back to `previous` so the next
    /// request produces the frame again.
    async fn send_all(
        &mut self,
        frames: &[CommandFrame],
        previous: PortModeController,
    ) -> Result<()> {
        for frame in frames {
            if let Err(e) = self.send(frame).await {
                if matches!(
                    frame.opcode,
                    Opcode::SetPortMode | Opcode::SetPidStatusEnable
                ) {
                    warn!(
                        "{:#04X} not delivered, port modes unchanged",
                        frame.opcode.as_byte()
                    );
                    self.modes = previous;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    async fn send(&mut self, frame: &CommandFrame) -> Result<()> {
        debug!("Sending {}", frame);
        self.transport.send(frame.opcode, &frame.payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::buwizz::error::{ProtocolError, TransportError};
    use crate::infrastructure::buwizz::transport::RecordingTransport;

    async fn connected() -> Buwizz3<RecordingTransport> {
        let mut device = Buwizz3::new(RecordingTransport::new());
        device.connect().await.unwrap();
        device
    }

    fn opcodes(device: &Buwizz3<RecordingTransport>) -> Vec<u8> {
        device.transport().written().iter().map(|f| f[0]).collect()
    }

    #[tokio::test]
    async fn test_refresh_rate_enables_notifications_once() {
        let mut device = connected().await;

        device.set_data_refresh_rate(50).await.unwrap();
        device.set_data_refresh_rate(2000).await.unwrap();
        assert!(device.transport().notifications_enabled());
        assert_eq!(
            device.transport().written(),
            &[vec![0x32, 20], vec![0x32, 255]]
        );

        device.set_data_refresh_rate(0).await.unwrap();
        assert!(!device.transport().notifications_enabled());
        assert_eq!(device.transport().written().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_motor_requests_send_one_mode_frame() {
        let mut device = connected().await;
        device
            .set_powerup_motor_mode(Port::Port1, MotorMode::Absolute, 0.0)
            .await
            .unwrap();

        device.set_motor_velocity(Port::Port1, 0.3).await.unwrap();
        device.set_motor_velocity(Port::Port1, 0.6).await.unwrap();

        assert_eq!(opcodes(&device), vec![0x50, 0x50, 0x31, 0x31]);
    }

    #[tokio::test]
    async fn test_servo_group_request_deduplicated() {
        let mut device = connected().await;
        device
            .request_powerup_motor_group(Port::Port2, ModeGroupRequest::Servo)
            .await
            .unwrap();
        device
            .request_powerup_motor_group(Port::Port2, ModeGroupRequest::Servo)
            .await
            .unwrap();

        assert_eq!(
            device.transport().written(),
            &[vec![0x50, 0x00, 0x16, 0x00, 0x00]]
        );
        assert_eq!(
            device.modes().mode_of(Port::Port2).unwrap(),
            MotorMode::Absolute
        );
    }

    #[tokio::test]
    async fn test_pid_enable_not_deduplicated() {
        let mut device = connected().await;
        device
            .set_powerup_motor_pid_status_enable(Port::Port3, true)
            .await
            .unwrap();
        device
            .set_powerup_motor_pid_status_enable(Port::Port3, true)
            .await
            .unwrap();
        assert_eq!(
            device.transport().written(),
            &[vec![0x51, 0, 0, 1, 0], vec![0x51, 0, 0, 1, 0]]
        );
    }

    #[tokio::test]
    async fn test_brake_and_hibernate() {
        let mut device = connected().await;
        device.brake_motor(Port::Port1).await.unwrap();
        device.brake_motor(Port::PortA).await.unwrap();
        device.activate_hibernation().await.unwrap();

        let written = device.transport().written();
        assert_eq!(written[0].len(), 21);
        assert_eq!(written[0][20], 0b0000_0001);
        assert_eq!(written[1][20], 0b0001_0000);
        assert_eq!(written[2], vec![0xA1]);
    }

    #[tokio::test]
    async fn test_status_uses_current_references() {
        let mut device = connected().await;
        assert!(device.get_status().unwrap().is_none());

        device
            .set_powerup_motor_mode(Port::Port1, MotorMode::Position, 90.0)
            .await
            .unwrap();

        let mut raw = [0u8; 54];
        raw[24..26].copy_from_slice(&1000u16.to_le_bytes());
        device.transport().telemetry_slot().publish(&raw);

        let status = device.get_status().unwrap().unwrap();
        assert_eq!(status.motors[0].position, 1090.0);
        assert_eq!(status.motors[0].abs_position, 1000);

        // Same frame decodes again
        assert_eq!(device.get_status().unwrap().unwrap(), status);
    }

    #[tokio::test]
    async fn test_malformed_telemetry() {
        let device = connected().await;
        device.transport().telemetry_slot().publish(&[0u8; 20]);
        assert!(matches!(
            device.get_status(),
            Err(ProtocolError::MalformedFrame { actual: 20, .. })
        ));
    }

    #[tokio::test]
    async fn test_mode_on_power_function_port() {
        let mut device = connected().await;
        assert!(matches!(
            device
                .set_powerup_motor_mode(Port::PortA, MotorMode::Speed, 0.0)
                .await,
            Err(ProtocolError::InvalidPort(4))
        ));
        assert!(device.transport().written().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mode_write_is_retried() {
        let mut device = connected().await;
        device.transport.set_reject_writes(true);
        assert!(device
            .set_powerup_motor_mode(Port::Port1, MotorMode::Speed, 0.5)
            .await
            .is_err());
        assert_eq!(device.modes().mode_of(Port::Port1).unwrap(), MotorMode::Pwm);
        assert_eq!(device.modes().reference_of(Port::Port1).unwrap(), 0.0);

        device.transport.set_reject_writes(false);
        device
            .set_powerup_motor_mode(Port::Port1, MotorMode::Speed, 0.5)
            .await
            .unwrap();
        assert_eq!(
            device.transport().written(),
            &[vec![0x50, 0x14, 0x00, 0x00, 0x00]]
        );
        assert_eq!(device.modes().mode_of(Port::Port1).unwrap(), MotorMode::Speed);
    }

    #[tokio::test]
    async fn test_failed_servo_switch_resent_with_angle() {
        let mut device = connected().await;
        device.transport.set_reject_writes(true);
        assert!(device.set_motor_angle(Port::Port3, 30.0).await.is_err());
        assert_eq!(device.modes().mode_of(Port::Port3).unwrap(), MotorMode::Pwm);

        device.transport.set_reject_writes(false);
        device.set_motor_angle(Port::Port3, 30.0).await.unwrap();
        assert_eq!(opcodes(&device), vec![0x50, 0x31]);
        assert_eq!(
            device.transport().written()[0],
            vec![0x50, 0x00, 0x00, 0x16, 0x00]
        );
    }

    #[tokio::test]
    async fn test_failed_pid_write_leaves_vector_unchanged() {
        let mut device = connected().await;
        device.transport.set_reject_writes(true);
        assert!(device
            .set_powerup_motor_pid_status_enable(Port::Port2, true)
            .await
            .is_err());

        device.transport.set_reject_writes(false);
        device
            .set_powerup_motor_pid_status_enable(Port::Port4, true)
            .await
            .unwrap();
        assert_eq!(device.transport().written(), &[vec![0x51, 0, 0, 0, 1]]);
    }

    #[tokio::test]
    async fn test_transport_errors_surface() {
        let mut device = Buwizz3::new(RecordingTransport::new());
        assert!(matches!(
            device.set_motor_velocity(Port::PortB, 1.0).await,
            Err(ProtocolError::Transport(TransportError::Disconnected))
        ));
    }
}
