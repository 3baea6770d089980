//! Programmer-side command processor
//!
//! [`CommandProcessor`] is fed one received byte at a time and writes its
//! answers to an [`embedded_io::Write`] sink. It owns the [`ChipDriver`]
//! and is the only thing the firmware main loop talks to.

use core::fmt::{self, Write as _};

use embedded_io::Write;
use heapless::{String, Vec};

use crate::chip::ChipType;
use crate::error::{Error, Result};
use crate::programmer::{ChipDriver, ParallelBus};
use crate::protocol::{
    Command, Response, BANNER, COMMAND_TERMINATOR, FIRMWARE_VERSION, MAX_COMMAND_LEN,
    PAGE_SIZE, RESPONSE_TERMINATOR,
};

/// Receive state of the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Collecting a command line
    Command,
    /// Line overflowed, skipping to the next terminator
    Overflow,
    /// Consuming the payload of a whole-chip write
    Writing {
        chip: ChipType,
        next: u32,
        total: u32,
        paged: bool,
    },
}

/// Decodes commands and drives the chip
pub struct CommandProcessor<B> {
    driver: ChipDriver<B>,
    line: Vec<u8, MAX_COMMAND_LEN>,
    page: Vec<u8, PAGE_SIZE>,
    state: State,
}

fn io<E>(_: E) -> Error {
    Error::IoError
}

fn send_line<W: Write>(out: &mut W, args: fmt::Arguments<'_>) -> Result<()> {
    let mut line: String<96> = String::new();
    line.write_fmt(args).map_err(|_| Error::LineTooLong)?;
    out.write_all(line.as_bytes()).map_err(io)?;
    out.write_all(RESPONSE_TERMINATOR).map_err(io)?;
    out.flush().map_err(io)
}

fn send_response<W: Write>(out: &mut W, response: Response<'_>) -> Result<()> {
    send_line(out, format_args!("{}", response))
}

impl<B: ParallelBus> CommandProcessor<B> {
    /// Create a processor around a chip driver
    pub fn new(driver: ChipDriver<B>) -> Self {
        Self {
            driver,
            line: Vec::new(),
            page: Vec::new(),
            state: State::Command,
        }
    }

    /// Access the chip driver
    pub fn driver(&self) -> &ChipDriver<B> {
        &self.driver
    }

    /// Mutable access to the chip driver
    pub fn driver_mut(&mut self) -> &mut ChipDriver<B> {
        &mut self.driver
    }

    /// Whether the processor waits for a new command
    pub fn is_idle(&self) -> bool {
        self.state == State::Command && self.line.is_empty()
    }

    /// Announce the programmer after reset
    pub fn banner<W: Write>(&mut self, out: &mut W) -> Result<()> {
        send_line(out, format_args!("{} {}", BANNER, FIRMWARE_VERSION))
    }

    /// Process one received byte
    pub fn feed<W: Write>(&mut self, byte: u8, out: &mut W) -> Result<()> {
        match self.state {
            State::Writing {
                chip,
                next,
                total,
                paged,
            } => {
                let next = if paged {
                    self.write_paged(chip, next, byte, out)?
                } else {
                    self.write_single(chip, next, byte, out)?
                };
                self.state = if next >= total {
                    log::debug!("write of {} bytes finished", total);
                    State::Command
                } else {
                    State::Writing {
                        chip,
                        next,
                        total,
                        paged,
                    }
                };
                Ok(())
            }
            State::Overflow => {
                if byte == COMMAND_TERMINATOR {
                    self.state = State::Command;
                    send_response(out, Response::Error("command line too long"))?;
                }
                Ok(())
            }
            State::Command => match byte {
                COMMAND_TERMINATOR => {
                    let line = core::mem::take(&mut self.line);
                    if line.is_empty() {
                        return Ok(());
                    }
                    self.dispatch(&line, out)
                }
                b'\n' => Ok(()),
                _ => {
                    if self.line.push(byte).is_err() {
                        self.line.clear();
                        self.state = State::Overflow;
                    }
                    Ok(())
                }
            },
        }
    }

    fn dispatch<W: Write>(&mut self, line: &[u8], out: &mut W) -> Result<()> {
        let command = core::str::from_utf8(line)
            .map_err(|_| Error::InvalidCommand)
            .and_then(Command::parse);
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                log::warn!("rejected command: {}", e);
                return self.report(e, out);
            }
        };
        log::debug!("command: {}", command);

        match command {
            Command::Version => send_line(out, format_args!("+VERSION={}", FIRMWARE_VERSION)),
            Command::ReadEeprom { chip, total } => {
                if total > chip.total_bytes() {
                    return send_response(out, Response::Error("size exceeds chip"));
                }
                for addr in 0..total {
                    let value = self.driver.read_byte(chip, addr)?;
                    out.write_all(&[value]).map_err(io)?;
                }
                out.flush().map_err(io)
            }
            Command::WriteEeprom { total, paged } => {
                let Some(chip) = ChipType::from_total_bytes(total) else {
                    return send_response(out, Response::Error("unsupported size"));
                };
                if paged && total as usize % PAGE_SIZE != 0 {
                    return send_response(out, Response::Error("size not page aligned"));
                }
                log::debug!("writing {} bytes as {}", total, chip);
                self.page.clear();
                self.state = State::Writing {
                    chip,
                    next: 0,
                    total,
                    paged,
                };
                Ok(())
            }
            Command::WriteByte { addr, value } => {
                if let Err(e) = self.driver.write_byte(ChipType::At28c256, addr, value) {
                    return self.report(e, out);
                }
                let readback = self.settle_write(value)?;
                send_response(out, Response::WriteByte(readback))
            }
            Command::ReadByte { chip, addr } => match self.driver.read_byte(chip, addr) {
                Ok(value) => send_response(out, Response::ReadByte(value)),
                Err(e) => self.report(e, out),
            },
            Command::SetSdp { enable } => self.driver.set_sdp(enable),
        }
    }

    fn report<W: Write>(&mut self, e: Error, out: &mut W) -> Result<()> {
        let mut reason: String<64> = String::new();
        let _ = write!(reason, "{}", e);
        send_response(out, Response::Error(&reason))
    }

    /// Wait for a write to finish; a stuck write yields the last sample so
    /// the host sees a readback mismatch.
    fn settle_write(&mut self, expected: u8) -> Result<u8> {
        match self.driver.wait_for_write_completion(expected) {
            Ok(value) => Ok(value),
            Err(Error::WriteIncomplete { last, .. }) => Ok(last),
            Err(e) => Err(e),
        }
    }

    fn write_single<W: Write>(
        &mut self,
        chip: ChipType,
        addr: u32,
        byte: u8,
        out: &mut W,
    ) -> Result<u32> {
        self.driver.write_byte(chip, addr, byte)?;
        let readback = self.settle_write(byte)?;
        out.write_all(&[readback]).map_err(io)?;
        out.flush().map_err(io)?;
        Ok(addr + 1)
    }

    fn write_paged<W: Write>(
        &mut self,
        chip: ChipType,
        start: u32,
        byte: u8,
        out: &mut W,
    ) -> Result<u32> {
        // a full page is always taken below, so there is room here
        let _ = self.page.push(byte);
        if !self.page.is_full() {
            return Ok(start);
        }

        // taken before the burst so a failed page is never resent
        let page = core::mem::take(&mut self.page);
        let last = self.driver.write_block(chip, start, &page)?;
        self.settle_write(last)?;

        let mut readback = [0u8; PAGE_SIZE];
        for (offset, slot) in readback.iter_mut().enumerate() {
            *slot = self.driver.read_byte(chip, start + offset as u32)?;
        }
        out.write_all(&readback).map_err(io)?;
        out.flush().map_err(io)?;
        Ok(start + PAGE_SIZE as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programmer::DataDirection;
    use std::vec::Vec as StdVec;

    /// Flat 64K memory that stores whatever is written, no timing
    struct FlatBus {
        mem: StdVec<u8>,
        addr: u16,
        data: u8,
        ce: bool,
        we: bool,
    }

    impl FlatBus {
        fn new() -> Self {
            Self {
                mem: std::vec![0xFF; 0x10000],
                addr: 0,
                data: 0,
                ce: false,
                we: false,
            }
        }
    }

    impl ParallelBus for FlatBus {
        fn set_data_direction(&mut self, _dir: DataDirection) {}
        fn set_address(&mut self, addr: u16) {
            self.addr = addr;
        }
        fn write_data(&mut self, value: u8) {
            self.data = value;
        }
        fn read_data(&mut self) -> u8 {
            self.mem[self.addr as usize]
        }
        fn set_chip_enable(&mut self, active: bool) {
            self.ce = active;
        }
        fn set_output_enable(&mut self, _active: bool) {}
        fn set_write_enable(&mut self, active: bool) {
            // latch on the rising edge
            if self.we && !active && self.ce {
                self.mem[self.addr as usize] = self.data;
            }
            self.we = active;
        }
        fn delay_us(&mut self, _us: u32) {}
    }

    fn processor() -> CommandProcessor<FlatBus> {
        CommandProcessor::new(ChipDriver::new(FlatBus::new()))
    }

    fn feed_all(p: &mut CommandProcessor<FlatBus>, bytes: &[u8]) -> StdVec<u8> {
        let mut out = StdVec::new();
        for &b in bytes {
            p.feed(b, &mut out).unwrap();
        }
        out
    }

    #[test]
    fn test_version() {
        let mut p = processor();
        assert_eq!(feed_all(&mut p, b"VERSION=?\r"), b"+VERSION=0.004\r\n");
        assert!(p.is_idle());
    }

    #[test]
    fn test_banner() {
        let mut p = processor();
        let mut out = StdVec::new();
        p.banner(&mut out).unwrap();
        assert!(out.starts_with(BANNER.as_bytes()));
        assert!(out.ends_with(b"0.004\r\n"));
    }

    #[test]
    fn test_write_and_read_byte() {
        let mut p = processor();
        assert_eq!(feed_all(&mut p, b"WRITEBYTE=100,171\r"), b"+WRITEBYTE=171\r\n");
        assert_eq!(feed_all(&mut p, b"READBYTE=1,100\r\n"), b"+READBYTE=171\r\n");
        assert_eq!(feed_all(&mut p, b"READBYTE=0,101\r"), b"+READBYTE=255\r\n");
    }

    #[test]
    fn test_read_eeprom_streams_exact_count() {
        let mut p = processor();
        p.driver_mut().bus_mut().mem[0x6000] = 0x12;
        let out = feed_all(&mut p, b"READEEPROM=2,8192\r");
        assert_eq!(out.len(), 8192);
        assert_eq!(out[0], 0x12);
        assert!(out[1..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_unpaged_write_echoes_every_byte() {
        let mut p = processor();
        let mut out = feed_all(&mut p, b"WRITEEEPROM=8192\r");
        assert!(out.is_empty());
        for i in 0..8192u32 {
            p.feed((i % 251) as u8, &mut out).unwrap();
            assert_eq!(out.len(), i as usize + 1);
        }
        assert!(p.is_idle());
        assert_eq!(out[250], 250);
        assert_eq!(out[251], 0);
        assert_eq!(p.driver().bus().mem[8191], (8191 % 251) as u8);
    }

    #[test]
    fn test_paged_write_echoes_per_page() {
        let mut p = processor();
        feed_all(&mut p, b"WRITEEEPROM=32768,64\r");
        let mut out = StdVec::new();
        for i in 0..63u32 {
            p.feed(i as u8, &mut out).unwrap();
        }
        assert!(out.is_empty());
        p.feed(63, &mut out).unwrap();
        assert_eq!(out, (0..64).collect::<StdVec<u8>>());
        for i in 64..32768u32 {
            p.feed(i as u8, &mut out).unwrap();
        }
        assert_eq!(out.len(), 32768);
        assert!(p.is_idle());
        // back to command mode
        assert_eq!(feed_all(&mut p, b"READBYTE=1,300\r"), b"+READBYTE=44\r\n");
    }

    /// Host line that drops everything
    struct BrokenLine;

    impl embedded_io::ErrorType for BrokenLine {
        type Error = embedded_io::ErrorKind;
    }

    impl Write for BrokenLine {
        fn write(&mut self, _buf: &[u8]) -> core::result::Result<usize, Self::Error> {
            Err(embedded_io::ErrorKind::Other)
        }
        fn flush(&mut self) -> core::result::Result<(), Self::Error> {
            Err(embedded_io::ErrorKind::Other)
        }
    }

    #[test]
    fn test_failed_page_starts_fresh() {
        let mut p = processor();
        feed_all(&mut p, b"WRITEEEPROM=32768,64\r");
        for i in 0..63u8 {
            p.feed(i, &mut BrokenLine).unwrap();
        }
        assert!(p.feed(63, &mut BrokenLine).is_err());

        let mut out = StdVec::new();
        for i in 0..64u8 {
            p.feed(0x80 | i, &mut out).unwrap();
        }
        let page: StdVec<u8> = (0..64u8).map(|i| 0x80 | i).collect();
        assert_eq!(out, page);
        assert_eq!(&p.driver().bus().mem[..64], &page[..]);
    }

    #[test]
    fn test_sdp_has_no_response() {
        let mut p = processor();
        assert!(feed_all(&mut p, b"ENABLESDP=1\r").is_empty());
        assert_eq!(p.driver().bus().mem[0x5555], 0xA0);
    }

    #[test]
    fn test_errors() {
        let mut p = processor();
        assert_eq!(feed_all(&mut p, b"HELLO\r"), b"+ERROR=invalid command\r\n");
        assert_eq!(
            feed_all(&mut p, b"READBYTE=0,8192\r"),
            b"+ERROR=address 0x2000 out of range (chip has 8192 bytes)\r\n"
        );
        assert_eq!(
            feed_all(&mut p, b"WRITEEEPROM=1000\r"),
            b"+ERROR=unsupported size\r\n"
        );
        let long = [b'A'; 40];
        let out = feed_all(&mut p, &long);
        assert!(out.is_empty());
        assert_eq!(feed_all(&mut p, b"\r"), b"+ERROR=command line too long\r\n");
        assert_eq!(feed_all(&mut p, b"VERSION=?\r"), b"+VERSION=0.004\r\n");
        // stray terminators are ignored
        assert!(feed_all(&mut p, b"\r\n\r").is_empty());
    }
}
