/*!
Byte transport over the serial link.

The acquisition core only needs open/write/read-exactly-N/clear from its
environment; the [`Transport`] trait captures that seam so tests can
substitute a scripted in-memory transport for real hardware.
*/

use shared::protocol::BAUD_RATE;
use shared::{Result, ScopeError};
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tracing::debug;

/// Internal read timeout of the underlying port. The overall capture
/// deadline is enforced above this in [`Transport::read_exact`].
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Point-to-point byte stream to the device
pub trait Transport: Send {
    /// Write the whole buffer to the device
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes, failing with
    /// [`ScopeError::Timeout`] when `timeout` elapses first
    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;

    /// Discard any buffered bytes in both directions
    fn clear_buffers(&mut self) -> Result<()>;
}

/// Factory producing an open transport for a named port
pub type TransportOpener = Box<dyn Fn(&str) -> Result<Box<dyn Transport>> + Send>;

/// List the available serial port identifiers
pub fn list_ports() -> Result<Vec<String>> {
    let ports =
        serialport::available_ports().map_err(|e| ScopeError::transport(e.to_string()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// An opener for real serial hardware at the fixed instrument baud rate
pub fn serial_opener() -> TransportOpener {
    Box::new(|port_name| Ok(Box::new(SerialTransport::open(port_name)?) as Box<dyn Transport>))
}

/// Serial implementation over the `serialport` crate
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open `port_name` at the instrument's fixed 115200 baud
    pub fn open(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(PORT_POLL_TIMEOUT)
            .open()
            .map_err(|e| {
                ScopeError::transport(format!(
                    "failed to open '{port_name}' at {BAUD_RATE} baud: {e}"
                ))
            })?;

        debug!("serial port '{}' opened at {} baud", port_name, BAUD_RATE);
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        use std::io::Write;
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        use std::io::Read;

        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() {
            if Instant::now() >= deadline {
                return Err(ScopeError::Timeout(timeout));
            }
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => return Err(ScopeError::transport("unexpected EOF on serial port")),
                Ok(n) => filled += n,
                // Port poll timeout is shorter than the overall deadline
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| ScopeError::transport(e.to_string()))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use shared::START_CAPTURE;
    use std::sync::{Arc, Mutex};

    /// Observable state shared between a test and its mock transports
    #[derive(Default)]
    pub struct MockState {
        /// Every byte written by the session, in order
        pub writes: Vec<u8>,
        /// Bytes echoed back for each start command; None = device stays silent
        pub response: Option<Vec<u8>>,
        /// Number of start commands observed
        pub captures_started: usize,
        /// Number of buffer clears
        pub clears: usize,
        /// When true, opening the port fails
        pub fail_open: bool,
    }

    impl MockState {
        pub fn shared() -> Arc<Mutex<MockState>> {
            Arc::new(Mutex::new(MockState::default()))
        }

        pub fn shared_with_response(response: Vec<u8>) -> Arc<Mutex<MockState>> {
            let state = Self::shared();
            state.lock().unwrap().response = Some(response);
            state
        }
    }

    /// Scripted in-memory transport for device and controller tests
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
        rx_buffer: Vec<u8>,
    }

    pub fn opener(state: Arc<Mutex<MockState>>) -> TransportOpener {
        Box::new(move |port_name| {
            if state.lock().unwrap().fail_open {
                return Err(ScopeError::transport(format!("cannot open '{port_name}'")));
            }
            Ok(Box::new(MockTransport {
                state: Arc::clone(&state),
                rx_buffer: Vec::new(),
            }) as Box<dyn Transport>)
        })
    }

    impl Transport for MockTransport {
        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.writes.extend_from_slice(bytes);
            if bytes.contains(&START_CAPTURE.as_byte()) {
                state.captures_started += 1;
                if let Some(response) = state.response.clone() {
                    self.rx_buffer.extend_from_slice(&response);
                }
            }
            Ok(())
        }

        fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
            if self.rx_buffer.len() < buf.len() {
                return Err(ScopeError::Timeout(timeout));
            }
            buf.copy_from_slice(&self.rx_buffer[..buf.len()]);
            self.rx_buffer.drain(..buf.len());
            Ok(())
        }

        fn clear_buffers(&mut self) -> Result<()> {
            self.rx_buffer.clear();
            self.state.lock().unwrap().clears += 1;
            Ok(())
        }
    }
}
