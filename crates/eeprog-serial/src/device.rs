//! Programmer connection and whole-chip operations
//!
//! [`Programmer`] sends one command at a time and drives the matching
//! receive loop to completion. Nothing is retried: the first failure ends
//! the operation.

use std::ops::ControlFlow;
use std::time::Duration;

use eeprog_core::chip::ChipType;
use eeprog_core::protocol::{
    Command, FirmwareVersion, Response, MIN_FIRMWARE_VERSION, PAGE_SIZE,
};

use crate::error::{Result, TransferError};
use crate::session::{Mismatch, Operation, Session, TransferProgress};
use crate::transport::{read_line, receive_framed, Transport};

/// Verify and blank check stop after this many differences
pub const MAX_REPORTED_MISMATCHES: usize = 3;

/// Timeouts used by the host side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Wait for the first byte of a response
    pub response: Duration,
    /// Wait for the boot banner of a programmer that was reset by opening the port
    pub boot_banner: Duration,
    /// Wait for each following byte of a stream
    pub streaming: Duration,
    /// Wait for each echo byte of a write block
    pub write_per_byte: Duration,
    /// Pause after opening the port before the first command
    pub settle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            response: Duration::from_millis(100),
            boot_banner: Duration::from_millis(1500),
            streaming: Duration::from_millis(100),
            write_per_byte: Duration::from_millis(100),
            settle: Duration::from_millis(100),
        }
    }
}

/// Outcome of a successful verify or blank check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    /// Bytes compared
    pub checked: usize,
}

/// Connection to the programmer firmware
pub struct Programmer<T: Transport> {
    transport: T,
    timeouts: Timeouts,
    firmware: Option<FirmwareVersion>,
    banner: Option<String>,
}

impl<T: Transport> Programmer<T> {
    /// Wrap a transport without talking to the programmer yet
    pub fn new(transport: T, timeouts: Timeouts) -> Self {
        Self {
            transport,
            timeouts,
            firmware: None,
            banner: None,
        }
    }

    /// Wait for the line to settle and check the firmware version
    pub fn connect(transport: T, timeouts: Timeouts) -> Result<Self> {
        let mut programmer = Self::new(transport, timeouts);
        if !timeouts.settle.is_zero() {
            std::thread::sleep(timeouts.settle);
        }
        programmer.handshake()?;
        Ok(programmer)
    }

    /// Firmware version, once the handshake succeeded
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.firmware
    }

    /// Boot banner, if the programmer printed one during the handshake
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Access the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.transport.discard_input()?;
        log::debug!("-> {}", command);
        let line = format!("{}\r", command);
        self.transport.write(line.as_bytes())
    }

    fn answer(&mut self, first: Duration) -> Result<Option<String>> {
        let line = read_line(&mut self.transport, first, self.timeouts.streaming)?;
        if let Some(line) = &line {
            log::debug!("<- {}", line);
        }
        Ok(line)
    }

    fn response(&mut self) -> Result<String> {
        self.answer(self.timeouts.response)?
            .ok_or(TransferError::NoResponse)
    }

    /// Ask for the firmware version
    ///
    /// A programmer that resets when the port opens misses the first
    /// request; in that case wait for its banner and ask again.
    pub fn handshake(&mut self) -> Result<FirmwareVersion> {
        self.send(Command::Version)?;
        let line = match self.answer(self.timeouts.response)? {
            Some(line) => line,
            None => {
                let banner = self
                    .answer(self.timeouts.boot_banner)?
                    .ok_or(TransferError::NoResponse)?;
                log::info!("{}", banner);
                self.banner = Some(banner);
                self.send(Command::Version)?;
                self.response()?
            }
        };

        let version = match Response::parse(&line) {
            Ok(Response::Version(v)) => Some(v),
            _ => None,
        };
        let version = version.ok_or(TransferError::MalformedResponse(line))?;
        log::info!("Firmware version {}", version);
        if version.value() < MIN_FIRMWARE_VERSION {
            return Err(TransferError::FirmwareTooOld {
                found: version,
                minimum: MIN_FIRMWARE_VERSION,
            });
        }
        self.firmware = Some(version);
        Ok(version)
    }

    fn request_read(&mut self, chip: ChipType) -> Result<()> {
        self.send(Command::ReadEeprom {
            chip,
            total: chip.total_bytes(),
        })
    }

    /// Read the whole chip
    pub fn read(
        &mut self,
        chip: ChipType,
        progress: &mut dyn TransferProgress,
    ) -> Result<Vec<u8>> {
        self.request_read(chip)?;
        let mut session = Session::start(chip, Operation::Read, progress);
        let mut data = Vec::with_capacity(session.expected);

        receive_framed(
            &mut self.transport,
            session.expected,
            self.timeouts.response,
            self.timeouts.streaming,
            |_, byte| {
                data.push(byte);
                session.advance(1, progress);
                ControlFlow::Continue(())
            },
        )?;
        session.finish(progress);

        if !session.is_complete() {
            return Err(TransferError::ByteCountMismatch {
                expected: session.expected,
                received: session.processed,
            });
        }
        Ok(data)
    }

    fn compare(
        &mut self,
        chip: ChipType,
        op: Operation,
        expected_byte: impl Fn(usize) -> u8,
        progress: &mut dyn TransferProgress,
    ) -> Result<VerifyReport> {
        self.request_read(chip)?;
        let mut session = Session::start(chip, op, progress);

        receive_framed(
            &mut self.transport,
            session.expected,
            self.timeouts.response,
            self.timeouts.streaming,
            |index, byte| {
                let expected = expected_byte(index);
                if byte != expected {
                    session.record_mismatch(
                        Mismatch {
                            addr: index as u32,
                            device: byte,
                            expected,
                        },
                        progress,
                    );
                    if session.mismatches.len() >= MAX_REPORTED_MISMATCHES {
                        return ControlFlow::Break(());
                    }
                }
                session.advance(1, progress);
                ControlFlow::Continue(())
            },
        )?;
        session.finish(progress);

        if !session.mismatches.is_empty() {
            return Err(TransferError::ContentMismatch {
                mismatches: session.mismatches,
                checked: session.processed,
                expected: session.expected,
            });
        }
        if !session.is_complete() {
            return Err(TransferError::ByteCountMismatch {
                expected: session.expected,
                received: session.processed,
            });
        }
        Ok(VerifyReport {
            checked: session.processed,
        })
    }

    /// Compare the chip against an image
    pub fn verify(
        &mut self,
        chip: ChipType,
        image: &[u8],
        progress: &mut dyn TransferProgress,
    ) -> Result<VerifyReport> {
        check_image(chip, image)?;
        self.compare(chip, Operation::Verify, |i| image[i], progress)
    }

    /// Check that every byte reads back erased (0xFF)
    pub fn blank_check(
        &mut self,
        chip: ChipType,
        progress: &mut dyn TransferProgress,
    ) -> Result<VerifyReport> {
        self.compare(chip, Operation::BlankCheck, |_| 0xFF, progress)
    }

    /// Program an image, checking the echo of every block
    ///
    /// Blocks are single bytes, or 64-byte pages when `paged` is set.
    pub fn write(
        &mut self,
        chip: ChipType,
        image: &[u8],
        paged: bool,
        progress: &mut dyn TransferProgress,
    ) -> Result<usize> {
        check_image(chip, image)?;
        if !chip.supports_whole_chip_write() {
            return Err(TransferError::WholeChipWriteUnsupported(chip));
        }
        if paged && !chip.geometry().supports_page_write() {
            return Err(TransferError::PagedWriteUnsupported(chip));
        }

        self.send(Command::WriteEeprom {
            total: chip.total_bytes(),
            paged,
        })?;
        let mut session = Session::start(chip, Operation::Write, progress);
        let block_size = if paged { PAGE_SIZE } else { 1 };
        let result = self.write_blocks(&mut session, image, block_size, progress);
        session.finish(progress);
        result?;
        Ok(session.processed)
    }

    fn write_blocks(
        &mut self,
        session: &mut Session,
        image: &[u8],
        block_size: usize,
        progress: &mut dyn TransferProgress,
    ) -> Result<()> {
        let mut echo = Vec::with_capacity(block_size);
        for block in image.chunks(block_size) {
            let start = session.processed;
            self.transport.write(block)?;

            echo.clear();
            while echo.len() < block.len() {
                match self
                    .transport
                    .read_byte_timeout(self.timeouts.write_per_byte)?
                {
                    Some(byte) => echo.push(byte),
                    None => {
                        return Err(TransferError::WriteTimeout {
                            addr: (start + echo.len()) as u32,
                        })
                    }
                }
            }

            if let Some(i) = block.iter().zip(&echo).position(|(a, b)| a != b) {
                return Err(TransferError::WriteMismatch {
                    addr: (start + i) as u32,
                    expected: block[i],
                    found: echo[i],
                });
            }
            session.advance(block.len(), progress);
        }
        Ok(())
    }

    fn text_response(&mut self) -> Result<Response<'static>> {
        let line = self.response()?;
        let parsed = match Response::parse(&line) {
            Ok(Response::WriteByte(v)) => Some(Response::WriteByte(v)),
            Ok(Response::ReadByte(v)) => Some(Response::ReadByte(v)),
            Ok(Response::Error(reason)) => return Err(TransferError::Device(reason.to_string())),
            _ => None,
        };
        parsed.ok_or(TransferError::MalformedResponse(line))
    }

    /// Write a single byte and return its readback
    ///
    /// The programmer addresses the byte as on an AT28C256.
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<u8> {
        self.send(Command::WriteByte { addr, value })?;
        match self.text_response()? {
            Response::WriteByte(found) if found == value => Ok(found),
            Response::WriteByte(found) => Err(TransferError::WriteMismatch {
                addr,
                expected: value,
                found,
            }),
            other => Err(TransferError::MalformedResponse(other.to_string())),
        }
    }

    /// Read a single byte
    pub fn read_byte(&mut self, chip: ChipType, addr: u32) -> Result<u8> {
        self.send(Command::ReadByte { chip, addr })?;
        match self.text_response()? {
            Response::ReadByte(value) => Ok(value),
            other => Err(TransferError::MalformedResponse(other.to_string())),
        }
    }

    /// Enable or disable software data protection
    ///
    /// The programmer does not answer this command.
    pub fn set_sdp(&mut self, enable: bool) -> Result<()> {
        self.send(Command::SetSdp { enable })?;
        log::info!(
            "Software data protection {}",
            if enable { "enable" } else { "disable" }
        );
        Ok(())
    }
}

fn check_image(chip: ChipType, image: &[u8]) -> Result<()> {
    let expected = chip.total_bytes() as usize;
    if image.len() != expected {
        return Err(TransferError::ImageSizeMismatch {
            chip,
            expected,
            found: image.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NoProgress;
    use crate::transport::tests::ScriptedTransport;
    use crate::transport::simulated::SimulatedTransport;
    use eeprog_core::programmer::{DEFAULT_POLL_LIMIT, POLL_INTERVAL_US};
    use eeprog_dummy::{DummyConfig, SimulatedChip, SimulatedDevice};

    fn quick() -> Timeouts {
        Timeouts {
            settle: Duration::ZERO,
            ..Default::default()
        }
    }

    fn scripted() -> Programmer<ScriptedTransport> {
        Programmer::new(ScriptedTransport::default(), quick())
    }

    #[derive(Default)]
    struct Recorder {
        mismatches: Vec<Mismatch>,
        percents: Vec<u32>,
        finished: Option<usize>,
    }

    impl TransferProgress for Recorder {
        fn percent(&mut self, _op: Operation, percent: u32) {
            self.percents.push(percent);
        }
        fn mismatch(&mut self, mismatch: &Mismatch) {
            self.mismatches.push(*mismatch);
        }
        fn finish(&mut self, _op: Operation, processed: usize) {
            self.finished = Some(processed);
        }
    }

    #[test]
    fn test_handshake_direct() {
        let mut p = scripted();
        p.transport_mut().reply(b"+VERSION=0.004\r\n");
        let v = p.handshake().unwrap();
        assert_eq!(v, FirmwareVersion::new(0, 4));
        assert_eq!(p.firmware_version(), Some(v));
        assert_eq!(p.transport_mut().written_str(), "VERSION=?\r");
        assert_eq!(p.transport_mut().waits[0], Duration::from_millis(100));
        assert!(p.banner().is_none());
    }

    #[test]
    fn test_handshake_waits_for_boot_banner() {
        let mut p = scripted();
        let mut first = vec![None];
        first.extend(ScriptedTransport::bytes(b"EEPROM PROGRAMMER READY\r\n"));
        p.transport_mut().replies.push_back(first);
        p.transport_mut().reply(b"+VERSION=1.002\r\n");

        assert_eq!(p.handshake().unwrap().value(), 1002);
        assert_eq!(p.banner(), Some("EEPROM PROGRAMMER READY"));
        let t = p.transport_mut();
        assert_eq!(t.written_str(), "VERSION=?\rVERSION=?\r");
        assert!(t.waits.contains(&Duration::from_millis(1500)));
        assert_eq!(t.discards, 2);
    }

    #[test]
    fn test_handshake_silent_programmer() {
        let mut p = scripted();
        assert!(matches!(p.handshake(), Err(TransferError::NoResponse)));
    }

    #[test]
    fn test_handshake_rejects_old_firmware() {
        let mut p = scripted();
        p.transport_mut().reply(b"+VERSION=0.003\r\n");
        assert!(matches!(
            p.handshake(),
            Err(TransferError::FirmwareTooOld { minimum: 4, .. })
        ));
        assert_eq!(p.firmware_version(), None);
    }

    #[test]
    fn test_handshake_rejects_garbage() {
        let mut p = scripted();
        p.transport_mut().reply(b"HELLO\r\n");
        match p.handshake() {
            Err(TransferError::MalformedResponse(line)) => assert_eq!(line, "HELLO"),
            other => panic!("unexpected {:?}", other.map(|v| v.to_string())),
        }
    }

    #[test]
    fn test_read_exact() {
        let mut p = scripted();
        let image: Vec<u8> = (0..8192u32).map(|i| i as u8).collect();
        p.transport_mut().reply(&image);
        let mut rec = Recorder::default();
        let data = p.read(ChipType::E2764, &mut rec).unwrap();
        assert_eq!(data, image);
        assert_eq!(rec.finished, Some(8192));
        assert_eq!(rec.percents.last(), Some(&100));
        assert_eq!(p.transport_mut().written_str(), "READEEPROM=2,8192\r");
    }

    #[test]
    fn test_read_short_and_silent() {
        let mut p = scripted();
        p.transport_mut().reply(&[0u8; 8191]);
        assert!(matches!(
            p.read(ChipType::At28c64, &mut NoProgress),
            Err(TransferError::ByteCountMismatch {
                expected: 8192,
                received: 8191
            })
        ));

        let mut p = scripted();
        assert!(matches!(
            p.read(ChipType::At28c64, &mut NoProgress),
            Err(TransferError::ByteCountMismatch { received: 0, .. })
        ));
    }

    #[test]
    fn test_verify_reports_first_three() {
        let image = vec![0x5Au8; 32768];
        let mut stream = image.clone();
        for addr in [10, 500, 9000, 9001] {
            stream[addr] = 0xA5;
        }
        let mut p = scripted();
        p.transport_mut().reply(&stream);
        let mut rec = Recorder::default();
        match p.verify(ChipType::At28c256, &image, &mut rec) {
            Err(TransferError::ContentMismatch {
                mismatches,
                checked,
                ..
            }) => {
                let addrs: Vec<u32> = mismatches.iter().map(|m| m.addr).collect();
                assert_eq!(addrs, [10, 500, 9000]);
                assert_eq!(mismatches[0].device, 0xA5);
                assert_eq!(mismatches[0].expected, 0x5A);
                assert_eq!(checked, 9000);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(rec.mismatches.len(), 3);
    }

    #[test]
    fn test_verify_single_mismatch_reads_everything() {
        let image = vec![0u8; 8192];
        let mut stream = image.clone();
        stream[8191] = 1;
        let mut p = scripted();
        p.transport_mut().reply(&stream);
        match p.verify(ChipType::At28c64, &image, &mut NoProgress) {
            Err(TransferError::ContentMismatch {
                mismatches,
                checked,
                ..
            }) => {
                assert_eq!(mismatches.len(), 1);
                assert_eq!(checked, 8192);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verify_short_stream_with_mismatch() {
        let image = vec![0u8; 8192];
        let mut stream = vec![0u8; 100];
        stream[5] = 0x42;
        let mut p = scripted();
        p.transport_mut().reply(&stream);
        let err = p
            .verify(ChipType::At28c64, &image, &mut NoProgress)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 errors found, stream ended after 100 of 8192 bytes"
        );
        assert!(matches!(
            err,
            TransferError::ContentMismatch {
                checked: 100,
                expected: 8192,
                ..
            }
        ));
    }

    #[test]
    fn test_verify_checks_image_size() {
        let mut p = scripted();
        assert!(matches!(
            p.verify(ChipType::At28c64, &[0u8; 100], &mut NoProgress),
            Err(TransferError::ImageSizeMismatch {
                expected: 8192,
                found: 100,
                ..
            })
        ));
        assert!(p.transport_mut().written.is_empty());
    }

    #[test]
    fn test_blank_check() {
        let mut p = scripted();
        p.transport_mut().reply(&[0xFF; 16384]);
        assert_eq!(
            p.blank_check(ChipType::E27128, &mut NoProgress).unwrap(),
            VerifyReport { checked: 16384 }
        );

        let mut stream = vec![0xFFu8; 16384];
        stream[0x1234] = 0x7F;
        let mut p = scripted();
        p.transport_mut().reply(&stream);
        let mut rec = Recorder::default();
        assert!(p.blank_check(ChipType::E27128, &mut rec).is_err());
        assert_eq!(
            rec.mismatches,
            [Mismatch {
                addr: 0x1234,
                device: 0x7F,
                expected: 0xFF
            }]
        );

        let mut p = scripted();
        p.transport_mut().reply(&[0xFF; 100]);
        assert!(matches!(
            p.blank_check(ChipType::E27128, &mut NoProgress),
            Err(TransferError::ByteCountMismatch { received: 100, .. })
        ));
    }

    fn echo_script(p: &mut Programmer<ScriptedTransport>, image: &[u8], block: usize) {
        let t = p.transport_mut();
        // the command itself gets no answer
        t.replies.push_back(Vec::new());
        for chunk in image.chunks(block) {
            t.reply(chunk);
        }
    }

    #[test]
    fn test_unpaged_write() {
        let image: Vec<u8> = (0..8192u32).map(|i| (i * 3) as u8).collect();
        let mut p = scripted();
        echo_script(&mut p, &image, 1);
        let mut rec = Recorder::default();
        assert_eq!(p.write(ChipType::At28c64, &image, false, &mut rec).unwrap(), 8192);
        let t = p.transport_mut();
        assert!(t.written.starts_with(b"WRITEEEPROM=8192\r"));
        assert_eq!(&t.written[17..], image.as_slice());
        assert!(t.waits.iter().all(|w| *w == Duration::from_millis(100)));
        assert_eq!(rec.percents.len(), 101);
    }

    #[test]
    fn test_paged_write_command() {
        let image = vec![0x11u8; 32768];
        let mut p = scripted();
        echo_script(&mut p, &image, PAGE_SIZE);
        p.write(ChipType::At28c256, &image, true, &mut NoProgress)
            .unwrap();
        assert!(p
            .transport_mut()
            .written
            .starts_with(b"WRITEEEPROM=32768,64\r"));
    }

    #[test]
    fn test_write_aborts_on_echo_mismatch() {
        let image = vec![0x42u8; 8192];
        let mut echo = image.clone();
        echo[3] = 0x40;
        let mut p = scripted();
        echo_script(&mut p, &echo, 1);
        let mut rec = Recorder::default();
        assert!(matches!(
            p.write(ChipType::At28c64, &image, false, &mut rec),
            Err(TransferError::WriteMismatch {
                addr: 3,
                expected: 0x42,
                found: 0x40
            })
        ));
        // command plus four data bytes, nothing after the mismatch
        assert_eq!(p.transport_mut().written.len(), 17 + 4);
        assert_eq!(rec.finished, Some(3));
    }

    #[test]
    fn test_paged_write_mismatch_address() {
        let image = vec![0x00u8; 32768];
        let mut echo = image.clone();
        echo[64 + 5] = 0xFF;
        let mut p = scripted();
        echo_script(&mut p, &echo, PAGE_SIZE);
        assert!(matches!(
            p.write(ChipType::At28c256, &image, true, &mut NoProgress),
            Err(TransferError::WriteMismatch { addr: 69, .. })
        ));
    }

    #[test]
    fn test_write_timeout() {
        let image = vec![0x42u8; 8192];
        let mut p = scripted();
        echo_script(&mut p, &image[..2], 1);
        assert!(matches!(
            p.write(ChipType::At28c64, &image, false, &mut NoProgress),
            Err(TransferError::WriteTimeout { addr: 2 })
        ));
    }

    #[test]
    fn test_write_rejections() {
        let mut p = scripted();
        assert!(matches!(
            p.write(ChipType::At28c64, &[0u8; 8192], true, &mut NoProgress),
            Err(TransferError::PagedWriteUnsupported(ChipType::At28c64))
        ));
        assert!(matches!(
            p.write(ChipType::At28c256, &[0u8; 8192], false, &mut NoProgress),
            Err(TransferError::ImageSizeMismatch { .. })
        ));
        assert!(p.transport_mut().written.is_empty());
    }

    #[test]
    fn test_whole_chip_write_needs_own_geometry() {
        let mut p = scripted();
        for chip in [ChipType::E2764, ChipType::E27256] {
            let image = vec![0u8; chip.total_bytes() as usize];
            assert!(matches!(
                p.write(chip, &image, false, &mut NoProgress),
                Err(TransferError::WholeChipWriteUnsupported(c)) if c == chip
            ));
        }
        assert!(p.transport_mut().written.is_empty());
    }

    #[test]
    fn test_single_byte_commands() {
        let mut p = scripted();
        p.transport_mut().reply(b"+WRITEBYTE=171\r\n");
        assert_eq!(p.write_byte(100, 171).unwrap(), 171);

        p.transport_mut().reply(b"+WRITEBYTE=255\r\n");
        assert!(matches!(
            p.write_byte(100, 0),
            Err(TransferError::WriteMismatch {
                addr: 100,
                expected: 0,
                found: 255
            })
        ));

        p.transport_mut().reply(b"+READBYTE=7\r\n");
        assert_eq!(p.read_byte(ChipType::E27256, 0x4000).unwrap(), 7);

        p.transport_mut().reply(b"+ERROR=invalid command\r\n");
        assert!(matches!(
            p.read_byte(ChipType::At28c64, 1),
            Err(TransferError::Device(reason)) if reason == "invalid command"
        ));

        p.set_sdp(false).unwrap();
        assert_eq!(
            p.transport_mut().written_str(),
            "WRITEBYTE=100,171\rWRITEBYTE=100,0\rREADBYTE=4,16384\rREADBYTE=0,1\rENABLESDP=0\r"
        );
    }

    fn simulated(config: DummyConfig) -> Programmer<SimulatedTransport> {
        let transport = SimulatedTransport::new(SimulatedDevice::new(config));
        Programmer::connect(transport, quick()).unwrap()
    }

    #[test]
    fn test_simulated_boot_handshake() {
        let device = SimulatedDevice::booting(DummyConfig::default(), 1000);
        let p = Programmer::connect(SimulatedTransport::new(device), quick()).unwrap();
        assert_eq!(p.firmware_version(), Some(FirmwareVersion::new(0, 4)));
        assert!(p.banner().unwrap().starts_with("EEPROM PROGRAMMER READY"));
    }

    #[test]
    fn test_simulated_paged_cycle() {
        let chip = ChipType::At28c256;
        let mut p = simulated(DummyConfig::for_chip(chip));
        p.blank_check(chip, &mut NoProgress).unwrap();

        let image: Vec<u8> = (0..32768u32).map(|i| (i ^ (i >> 8)) as u8).collect();
        assert_eq!(p.write(chip, &image, true, &mut NoProgress).unwrap(), 32768);
        assert_eq!(p.verify(chip, &image, &mut NoProgress).unwrap().checked, 32768);
        assert_eq!(p.read(chip, &mut NoProgress).unwrap(), image);
        assert!(p.blank_check(chip, &mut NoProgress).is_err());
    }

    #[test]
    fn test_simulated_unpaged_eprom() {
        let chip = ChipType::E27128;
        let mut p = simulated(DummyConfig::for_chip(chip));
        let image: Vec<u8> = (0..16384u32).map(|i| (i % 7) as u8).collect();
        p.write(chip, &image, false, &mut NoProgress).unwrap();
        p.verify(chip, &image, &mut NoProgress).unwrap();

        // programmed zeros cannot be turned back into ones
        let erased = vec![0xFFu8; 16384];
        assert!(matches!(
            p.write(chip, &erased, false, &mut NoProgress),
            Err(TransferError::WriteMismatch { addr: 0, .. })
        ));
    }

    #[test]
    fn test_simulated_single_bytes_and_sdp() {
        let mut p = simulated(DummyConfig::default());
        assert_eq!(p.write_byte(0x1234, 0x99).unwrap(), 0x99);
        assert_eq!(p.read_byte(ChipType::At28c256, 0x1234).unwrap(), 0x99);

        p.set_sdp(true).unwrap();
        assert!(p.transport_mut().device().chip().sdp_enabled());
        assert!(matches!(
            p.write_byte(0x1235, 0x00),
            Err(TransferError::WriteMismatch { found: 0xFF, .. })
        ));
        p.set_sdp(false).unwrap();
        assert_eq!(p.write_byte(0x1235, 0x00).unwrap(), 0x00);
    }

    #[test]
    fn test_stuck_write_answers_before_host_gives_up() {
        let budget = Duration::from_micros((DEFAULT_POLL_LIMIT * POLL_INTERVAL_US) as u64);
        let timeouts = Timeouts::default();
        assert!(budget * 2 <= timeouts.write_per_byte);
        assert!(budget * 2 <= timeouts.response);

        let mut p = simulated(DummyConfig::default());
        p.transport_mut().device_mut().chip_mut().set_stuck(true);
        let start = p.transport_mut().device().chip().elapsed_us();
        assert!(matches!(
            p.write_byte(0x10, 0x80),
            Err(TransferError::WriteMismatch { addr: 0x10, .. })
        ));
        let spent = p.transport_mut().device().chip().elapsed_us() - start;
        assert!(spent < timeouts.write_per_byte.as_micros() as u64);
    }

    #[test]
    fn test_simulated_verify_against_prefilled_chip() {
        let chip = ChipType::E27256;
        let mut contents = vec![0xFFu8; 32768];
        for addr in [10usize, 500, 9000, 9001] {
            contents[addr] = 0;
        }
        let sim = SimulatedChip::with_data(DummyConfig::for_chip(chip), &contents);
        let transport = SimulatedTransport::new(SimulatedDevice::with_chip(sim));
        let mut p = Programmer::connect(transport, quick()).unwrap();
        match p.blank_check(chip, &mut NoProgress) {
            Err(TransferError::ContentMismatch { mismatches, .. }) => {
                assert_eq!(mismatches.len(), 3);
                assert_eq!(mismatches[2].addr, 9000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
