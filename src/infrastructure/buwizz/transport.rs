//! Link Abstraction
//!
//! The protocol core only needs to write frames to the application
//! characteristic and peek the most recent notification. Discovery, GATT
//! access and reconnection live behind [`Transport`].

use crate::infrastructure::buwizz::error::TransportError;
use crate::infrastructure::buwizz::protocol::Opcode;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace};

/// Connection to one BuWizz application characteristic
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Write `opcode` followed by `payload`, resolves once the write is accepted
    async fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), TransportError>;

    async fn enable_notifications(&mut self) -> Result<(), TransportError>;

    async fn disable_notifications(&mut self) -> Result<(), TransportError>;

    /// Most recent notification, without waiting
    fn latest_notification(&self) -> Option<Vec<u8>>;
}

/// Single-slot cell holding the newest telemetry frame.
///
/// Writers overwrite, readers clone; frames that arrive faster than they
/// are read are lost.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySlot {
    inner: Arc<Mutex<Option<Vec<u8>>>>,
}

impl TelemetrySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: &[u8]) {
        trace!("Telemetry: {:02X?}", frame);
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(frame.to_vec());
    }

    pub fn latest(&self) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Transport that records every written frame instead of using a radio.
///
/// Used for dry runs and tests; telemetry is injected through
/// [`RecordingTransport::telemetry_slot`].
#[derive(Debug, Default)]
pub struct RecordingTransport {
    connected: bool,
    notifications_enabled: bool,
    reject_writes: bool,
    written: Vec<Vec<u8>>,
    telemetry: TelemetrySlot,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a notification source publishes into
    pub fn telemetry_slot(&self) -> TelemetrySlot {
        self.telemetry.clone()
    }

    /// Frames written so far, opcode byte first
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Make every following write fail
    pub fn set_reject_writes(&mut self, reject: bool) {
        self.reject_writes = reject;
    }
}

impl Transport for RecordingTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        info!("Recording transport connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.notifications_enabled = false;
        info!("Recording transport disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        if self.reject_writes {
            return Err(TransportError::WriteRejected(format!(
                "opcode {:#04X}",
                opcode.as_byte()
            )));
        }

        let mut frame = Vec::with_capacity(1 + payload.len());
        frame.push(opcode.as_byte());
        frame.extend_from_slice(payload);
        debug!("Write: {:02X?}", frame);
        self.written.push(frame);
        Ok(())
    }

    async fn enable_notifications(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Notifications("not connected".to_string()));
        }
        self.notifications_enabled = true;
        Ok(())
    }

    async fn disable_notifications(&mut self) -> Result<(), TransportError> {
        self.notifications_enabled = false;
        Ok(())
    }

    fn latest_notification(&self) -> Option<Vec<u8>> {
        self.telemetry.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_keeps_latest_only() {
        let slot = TelemetrySlot::new();
        assert!(slot.latest().is_none());

        slot.publish(&[1, 2, 3]);
        slot.publish(&[4, 5]);
        assert_eq!(slot.latest(), Some(vec![4, 5]));
        // Reading does not consume
        assert_eq!(slot.latest(), Some(vec![4, 5]));

        slot.clear();
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_slot_shared_between_handles() {
        let transport = RecordingTransport::new();
        let slot = transport.telemetry_slot();
        slot.publish(&[0xAA]);
        assert_eq!(transport.latest_notification(), Some(vec![0xAA]));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut transport = RecordingTransport::new();
        assert!(matches!(
            transport.send(Opcode::Hibernate, &[]).await,
            Err(TransportError::Disconnected)
        ));

        transport.connect().await.unwrap();
        transport.send(Opcode::SetDataRefreshRate, &[20]).await.unwrap();
        assert_eq!(transport.written(), &[vec![0x32, 20]]);
    }

    #[tokio::test]
    async fn test_rejected_write() {
        let mut transport = RecordingTransport::new();
        transport.connect().await.unwrap();
        transport.set_reject_writes(true);
        assert!(matches!(
            transport.send(Opcode::SetMotorData, &[0; 20]).await,
            Err(TransportError::WriteRejected(_))
        ));
        assert!(transport.written().is_empty());
    }
}
