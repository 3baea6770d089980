//! Transport layer and timeout-driven framing
//!
//! The programmer never announces how many bytes follow, so every receive
//! loop here is bounded by a byte count known in advance and by silence on
//! the line.

use std::ops::ControlFlow;
use std::time::Duration;

use crate::error::Result;

/// Byte-level access to the programmer
pub trait Transport {
    /// Write all bytes to the line
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next byte
    ///
    /// Returns `None` if the line stayed quiet.
    fn read_byte_timeout(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Drop anything received but not yet read
    fn discard_input(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_byte_timeout(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte_timeout(timeout)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }
}

/// Receive up to `expected` bytes with a rolling timeout
///
/// Waits `first` for the first byte and `streaming` for each following one.
/// Every byte goes to `on_byte` with its index; the loop ends on silence,
/// when `expected` bytes arrived, or when `on_byte` breaks. Returns how many
/// bytes were handed to `on_byte`.
pub fn receive_framed<T, F>(
    transport: &mut T,
    expected: usize,
    first: Duration,
    streaming: Duration,
    mut on_byte: F,
) -> Result<usize>
where
    T: Transport + ?Sized,
    F: FnMut(usize, u8) -> ControlFlow<()>,
{
    let mut count = 0;
    let mut timeout = first;
    while count < expected {
        let Some(byte) = transport.read_byte_timeout(timeout)? else {
            log::debug!("line quiet after {} of {} bytes", count, expected);
            break;
        };
        let flow = on_byte(count, byte);
        count += 1;
        if flow.is_break() {
            break;
        }
        timeout = streaming;
    }
    Ok(count)
}

/// Read one text line, ended by silence
///
/// Collects characters until nothing arrives within the current timeout,
/// skipping `\r` and `\n`. Returns `None` if nothing arrived at all.
pub fn read_line<T: Transport + ?Sized>(
    transport: &mut T,
    first: Duration,
    streaming: Duration,
) -> Result<Option<String>> {
    let mut line = String::new();
    let mut received = 0usize;
    let mut timeout = first;
    while let Some(byte) = transport.read_byte_timeout(timeout)? {
        received += 1;
        if byte != b'\r' && byte != b'\n' {
            line.push(byte as char);
        }
        timeout = streaming;
    }
    Ok((received > 0).then_some(line))
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};

    /// Default line speed of the programmer
    pub const DEFAULT_BAUD: u32 = 115200;

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
        timeout: Duration,
    }

    impl SerialTransport {
        /// Open a serial port at 8N1 without flow control
        pub fn open(device: &str, baud: u32) -> Result<Self> {
            let timeout = Duration::from_millis(100);
            let port = serialport::new(device, baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(timeout)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud);

            Ok(Self { port, timeout })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            self.port.flush()?;
            Ok(())
        }

        fn read_byte_timeout(&mut self, timeout: Duration) -> Result<Option<u8>> {
            if timeout != self.timeout {
                self.port.set_timeout(timeout)?;
                self.timeout = timeout;
            }

            let mut buf = [0u8; 1];
            match self.port.read(&mut buf) {
                Ok(1) => Ok(Some(buf[0])),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn discard_input(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::All)?;
            Ok(())
        }
    }
}

#[cfg(any(feature = "dummy", test))]
pub mod simulated {
    //! Transport backed by an in-process simulated programmer

    use super::*;
    use eeprog_dummy::SimulatedDevice;

    /// Transport that feeds a [`SimulatedDevice`]
    pub struct SimulatedTransport {
        device: SimulatedDevice,
    }

    impl SimulatedTransport {
        /// Wrap a simulated programmer
        pub fn new(device: SimulatedDevice) -> Self {
            log::info!("Using simulated programmer");
            Self { device }
        }

        /// The simulated programmer
        pub fn device(&self) -> &SimulatedDevice {
            &self.device
        }

        /// Mutable simulated programmer
        pub fn device_mut(&mut self) -> &mut SimulatedDevice {
            &mut self.device
        }
    }

    impl Transport for SimulatedTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.device.send(data)?;
            Ok(())
        }

        fn read_byte_timeout(&mut self, timeout: Duration) -> Result<Option<u8>> {
            Ok(self.device.receive(timeout.as_millis() as u64))
        }

        fn discard_input(&mut self) -> Result<()> {
            self.device.discard_output();
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Transport replaying a script
    ///
    /// Each entry of `incoming` is a byte or a quiet period (`None`).
    /// Writes are recorded, and every write moves the next entry of
    /// `replies` onto the incoming queue.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub incoming: VecDeque<Option<u8>>,
        pub replies: VecDeque<Vec<Option<u8>>>,
        pub written: Vec<u8>,
        pub waits: Vec<Duration>,
        pub discards: usize,
    }

    impl ScriptedTransport {
        pub fn bytes(data: &[u8]) -> Vec<Option<u8>> {
            data.iter().copied().map(Some).collect()
        }

        pub fn queue(&mut self, data: &[u8]) {
            self.incoming.extend(Self::bytes(data));
        }

        pub fn reply(&mut self, data: &[u8]) {
            self.replies.push_back(Self::bytes(data));
        }

        pub fn written_str(&self) -> String {
            String::from_utf8_lossy(&self.written).into_owned()
        }
    }

    impl Transport for ScriptedTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.extend_from_slice(data);
            if let Some(reply) = self.replies.pop_front() {
                self.incoming.extend(reply);
            }
            Ok(())
        }

        fn read_byte_timeout(&mut self, timeout: Duration) -> Result<Option<u8>> {
            self.waits.push(timeout);
            Ok(self.incoming.pop_front().flatten())
        }

        fn discard_input(&mut self) -> Result<()> {
            self.discards += 1;
            self.incoming.clear();
            Ok(())
        }
    }

    const MS100: Duration = Duration::from_millis(100);
    const MS500: Duration = Duration::from_millis(500);

    #[test]
    fn test_exact_count_then_stop() {
        let mut t = ScriptedTransport::default();
        t.queue(&[1, 2, 3, 4, 5]);
        let mut got = Vec::new();
        let n = receive_framed(&mut t, 4, MS500, MS100, |_, b| {
            got.push(b);
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(n, 4);
        assert_eq!(got, [1, 2, 3, 4]);
        // stops without waiting for a fifth byte
        assert_eq!(t.waits.len(), 4);
        assert_eq!(t.waits[0], MS500);
        assert!(t.waits[1..].iter().all(|w| *w == MS100));
    }

    #[test]
    fn test_short_stream_reports_count() {
        let mut t = ScriptedTransport::default();
        t.queue(&[0xFF; 9]);
        let n = receive_framed(&mut t, 10, MS100, MS100, |_, _| ControlFlow::Continue(()))
            .unwrap();
        assert_eq!(n, 9);
    }

    #[test]
    fn test_silence_from_start() {
        let mut t = ScriptedTransport::default();
        let n = receive_framed(&mut t, 10, MS100, MS100, |_, _| ControlFlow::Continue(()))
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(t.waits, [MS100]);
    }

    #[test]
    fn test_break_from_callback() {
        let mut t = ScriptedTransport::default();
        t.queue(&[0; 10]);
        let n = receive_framed(&mut t, 10, MS100, MS100, |i, _| {
            if i == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_read_line_strips_terminators() {
        let mut t = ScriptedTransport::default();
        t.queue(b"+READBYTE=12\r\n");
        assert_eq!(
            read_line(&mut t, MS500, MS100).unwrap().as_deref(),
            Some("+READBYTE=12")
        );
        assert_eq!(t.waits[0], MS500);
        assert_eq!(*t.waits.last().unwrap(), MS100);
        assert_eq!(read_line(&mut t, MS100, MS100).unwrap(), None);
    }

    #[test]
    fn test_read_line_ends_at_gap() {
        let mut t = ScriptedTransport::default();
        t.queue(b"first\r\n");
        t.incoming.push_back(None);
        t.queue(b"second\r\n");
        assert_eq!(read_line(&mut t, MS100, MS100).unwrap().unwrap(), "first");
        assert_eq!(read_line(&mut t, MS100, MS100).unwrap().unwrap(), "second");
    }

    #[test]
    fn test_bare_terminators_count_as_a_reply() {
        let mut t = ScriptedTransport::default();
        t.queue(b"\r\n");
        assert_eq!(read_line(&mut t, MS100, MS100).unwrap().as_deref(), Some(""));
    }
}
