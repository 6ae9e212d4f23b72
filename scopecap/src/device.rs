/*!
Device session: connection state machine and configuration.

The session owns the transport and the device's last-known
configuration. The device holds no configuration across connection
cycles, so the full configuration is re-sent on every connect.
*/

use crate::transport::{Transport, TransportOpener};
use shared::codec::{encode_trigger_enable, CommandCode, Timebase, TriggerEdge};
use shared::protocol::BUFFER_SIZE;
use shared::{Frame, Result, ScopeError, START_CAPTURE};
use std::time::Duration;
use tracing::{debug, info};

/// Device boot time after the port opens; commands sent earlier are lost
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Default bound on one capture, start command to last sample byte.
/// Generous because a triggered capture waits for the selected edge.
const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Last-known device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub timebase: Timebase,
    pub trigger_enabled: bool,
    pub trigger_edge: TriggerEdge,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            timebase: Timebase::Ms20,
            trigger_enabled: false,
            trigger_edge: TriggerEdge::Rising,
        }
    }
}

/// A session with the sampling device over a byte transport
pub struct Device {
    opener: TransportOpener,
    transport: Option<Box<dyn Transport>>,
    config: DeviceConfig,
    port_name: Option<String>,
    settle_delay: Duration,
    capture_timeout: Duration,
}

impl Device {
    /// Create a disconnected session that opens transports via `opener`
    pub fn new(opener: TransportOpener) -> Self {
        Self {
            opener,
            transport: None,
            config: DeviceConfig::default(),
            port_name: None,
            settle_delay: SETTLE_DELAY,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }

    /// Override the post-open settle delay (tests use zero)
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Override the per-capture timeout
    pub fn with_capture_timeout(mut self, capture_timeout: Duration) -> Self {
        self.capture_timeout = capture_timeout;
        self
    }

    /// Current configuration as last applied or staged
    pub fn config(&self) -> DeviceConfig {
        self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Port identifier of the live connection, if any
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Open the transport at `port_name`, wait out the device boot time,
    /// then synchronize the full configuration in fixed order (timebase,
    /// trigger state, trigger edge). A failed write mid-sync tears the
    /// session down; it is not left half-configured.
    pub fn connect(&mut self, port_name: &str) -> Result<()> {
        let transport = (self.opener)(port_name)?;
        std::thread::sleep(self.settle_delay);
        self.transport = Some(transport);

        if let Err(e) = self.write_all_settings() {
            self.transport = None;
            return Err(e);
        }

        self.port_name = Some(port_name.to_string());
        info!("connected to device on '{}'", port_name);
        Ok(())
    }

    /// Close the transport. Idempotent.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!(
                "disconnected from '{}'",
                self.port_name.as_deref().unwrap_or("<unknown>")
            );
        }
        self.port_name = None;
    }

    /// Set the timebase, writing it to the device when connected.
    /// Local state is untouched if the write fails.
    pub fn set_timebase(&mut self, timebase: Timebase) -> Result<()> {
        if self.is_connected() {
            self.send(timebase.command_code())?;
        }
        self.config.timebase = timebase;
        debug!("timebase set to {}", timebase);
        Ok(())
    }

    /// Enable or disable triggered capture
    pub fn set_trigger_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.is_connected() {
            self.send(encode_trigger_enable(enabled))?;
        }
        self.config.trigger_enabled = enabled;
        debug!("trigger {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Select the trigger edge
    pub fn set_trigger_edge(&mut self, edge: TriggerEdge) -> Result<()> {
        if self.is_connected() {
            self.send(edge.command_code())?;
        }
        self.config.trigger_edge = edge;
        debug!("trigger edge set to {}", edge);
        Ok(())
    }

    /// Discard buffered bytes in both directions. Stale bytes from a
    /// prior, possibly aborted, capture would corrupt the next read.
    pub fn clear_buffers(&mut self) -> Result<()> {
        self.transport
            .as_mut()
            .ok_or(ScopeError::NotConnected)?
            .clear_buffers()
    }

    /// Perform exactly one capture: write the start command, read one
    /// full raw buffer under the capture deadline, decode to volts.
    pub fn capture_one(&mut self) -> Result<Frame> {
        let capture_timeout = self.capture_timeout;
        let transport = self.transport.as_mut().ok_or(ScopeError::NotConnected)?;

        transport.write_all(&[START_CAPTURE.as_byte()])?;

        let mut raw = vec![0u8; BUFFER_SIZE];
        transport.read_exact(&mut raw, capture_timeout)?;

        Frame::decode(&raw)
    }

    fn send(&mut self, code: CommandCode) -> Result<()> {
        self.transport
            .as_mut()
            .ok_or(ScopeError::NotConnected)?
            .write_all(&[code.as_byte()])
    }

    fn write_all_settings(&mut self) -> Result<()> {
        self.send(self.config.timebase.command_code())?;
        self.send(encode_trigger_enable(self.config.trigger_enabled))?;
        self.send(self.config.trigger_edge.command_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{opener, MockState};
    use std::sync::Arc;

    fn test_device(state: &Arc<std::sync::Mutex<MockState>>) -> Device {
        Device::new(opener(Arc::clone(state)))
            .with_settle_delay(Duration::ZERO)
            .with_capture_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_connect_resyncs_settings_in_order() {
        let state = MockState::shared();
        let mut device = test_device(&state);

        device.connect("mock0").unwrap();

        // Default config: 20 ms timebase, trigger off, rising edge
        assert_eq!(state.lock().unwrap().writes, vec![0x2a, 0x32, 0x33]);
        assert!(device.is_connected());
        assert_eq!(device.port_name(), Some("mock0"));
    }

    #[test]
    fn test_connect_failure_leaves_disconnected() {
        let state = MockState::shared();
        state.lock().unwrap().fail_open = true;
        let mut device = test_device(&state);

        assert!(matches!(
            device.connect("mock0"),
            Err(ScopeError::Transport(_))
        ));
        assert!(!device.is_connected());
    }

    #[test]
    fn test_settings_staged_while_disconnected_then_resent() {
        let state = MockState::shared();
        let mut device = test_device(&state);

        device.set_timebase(Timebase::Us100).unwrap();
        device.set_trigger_enabled(true).unwrap();
        device.set_trigger_edge(TriggerEdge::Falling).unwrap();
        assert!(state.lock().unwrap().writes.is_empty());

        device.connect("mock0").unwrap();
        assert_eq!(state.lock().unwrap().writes, vec![0x23, 0x31, 0x34]);
    }

    #[test]
    fn test_setting_written_immediately_while_connected() {
        let state = MockState::shared();
        let mut device = test_device(&state);
        device.connect("mock0").unwrap();
        state.lock().unwrap().writes.clear();

        device.set_timebase(Timebase::Ms1).unwrap();
        assert_eq!(state.lock().unwrap().writes, vec![0x26]);
        assert_eq!(device.config().timebase, Timebase::Ms1);
    }

    #[test]
    fn test_capture_one_roundtrip() {
        let pattern: Vec<u8> = (0..BUFFER_SIZE).map(|i| (i % 256) as u8).collect();
        let state = MockState::shared_with_response(pattern.clone());
        let mut device = test_device(&state);
        device.connect("mock0").unwrap();

        let frame = device.capture_one().unwrap();
        assert_eq!(frame.len(), BUFFER_SIZE);
        for (i, &sample) in frame.samples().iter().enumerate() {
            let expected = pattern[i] as f32 * 5.0 / 256.0;
            assert!((sample - expected).abs() < 1e-6, "sample {i} mismatch");
        }
        assert_eq!(state.lock().unwrap().captures_started, 1);
    }

    #[test]
    fn test_capture_requires_connection() {
        let state = MockState::shared();
        let mut device = test_device(&state);

        assert!(matches!(device.capture_one(), Err(ScopeError::NotConnected)));
        assert!(matches!(
            device.clear_buffers(),
            Err(ScopeError::NotConnected)
        ));
    }

    #[test]
    fn test_capture_times_out_on_silent_device() {
        let state = MockState::shared();
        let mut device = test_device(&state);
        device.connect("mock0").unwrap();

        assert!(matches!(device.capture_one(), Err(ScopeError::Timeout(_))));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let state = MockState::shared();
        let mut device = test_device(&state);
        device.connect("mock0").unwrap();

        device.disconnect();
        device.disconnect();
        assert!(!device.is_connected());
        assert!(device.port_name().is_none());
    }
}
