//! Timed read/write sequences for parallel EEPROMs and EPROMs

use super::bus::{DataDirection, ParallelBus};
use crate::chip::{ChipType, Translated, WeDrive, WriteStrobe};
use crate::error::{Error, Result};

/// Settle time between control line transitions
const SETTLE_US: u32 = 1;

/// Gap between two data polls
pub const POLL_INTERVAL_US: u32 = 1000;

/// Number of data polls before a write is declared stuck
///
/// Roughly 25 ms with the 1 ms poll interval. The whole budget must stay
/// well below the host's per-byte echo timeout.
pub const DEFAULT_POLL_LIMIT: u32 = 25;

/// Software data protection disable sequence (address, data)
pub const SDP_DISABLE: [(u16, u8); 6] = [
    (0x5555, 0xAA),
    (0x2AAA, 0x55),
    (0x5555, 0x80),
    (0x5555, 0xAA),
    (0x2AAA, 0x55),
    (0x5555, 0x20),
];

/// Software data protection enable sequence (address, data)
pub const SDP_ENABLE: [(u16, u8); 3] = [(0x5555, 0xAA), (0x2AAA, 0x55), (0x5555, 0xA0)];

/// Drives a chip through a [`ParallelBus`]
pub struct ChipDriver<B> {
    bus: B,
    poll_limit: u32,
}

impl<B: ParallelBus> ChipDriver<B> {
    /// Create a driver with the default poll limit
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }

    /// Override the number of data polls before giving up on a write
    pub fn with_poll_limit(mut self, limit: u32) -> Self {
        self.poll_limit = limit;
        self
    }

    /// Access the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn park(&mut self) {
        self.bus.set_chip_enable(false);
        self.bus.set_output_enable(false);
        self.bus.set_write_enable(false);
    }

    fn drive_address(&mut self, t: Translated) {
        self.bus.set_address(t.physical);
        match t.we {
            WeDrive::Untouched => {}
            WeDrive::Low => self.bus.set_write_enable(true),
            WeDrive::High => self.bus.set_write_enable(false),
        }
    }

    fn settle(&mut self) {
        self.bus.delay_us(SETTLE_US);
    }

    /// Read one byte at a logical address
    pub fn read_byte(&mut self, chip: ChipType, addr: u32) -> Result<u8> {
        let t = chip.geometry().translate(addr)?;

        self.bus.set_data_direction(DataDirection::Input);
        self.park();
        self.settle();
        self.drive_address(t);

        self.bus.set_chip_enable(true);
        self.settle();
        self.bus.set_output_enable(true);
        self.settle();

        let value = self.bus.read_data();

        self.bus.set_output_enable(false);
        self.settle();
        self.bus.set_chip_enable(false);
        self.settle();

        Ok(value)
    }

    /// Write one byte at a logical address
    ///
    /// Returns the value written. Completion is not awaited; see
    /// [`wait_for_write_completion`](Self::wait_for_write_completion).
    pub fn write_byte(&mut self, chip: ChipType, addr: u32, value: u8) -> Result<u8> {
        let geometry = chip.geometry();
        let t = geometry.translate(addr)?;

        self.park();
        self.bus.set_data_direction(DataDirection::Output);
        self.drive_address(t);
        self.bus.write_data(value);
        self.settle();

        self.bus.set_chip_enable(true);
        self.settle();

        let we_strobe = geometry.strobe == WriteStrobe::WriteEnable;
        if we_strobe {
            self.bus.set_write_enable(true);
            self.settle();
        }
        if geometry.program_hold_us > 0 {
            self.bus.delay_us(geometry.program_hold_us);
        }
        if we_strobe {
            self.bus.set_write_enable(false);
            self.settle();
        }

        self.bus.set_chip_enable(false);
        self.settle();

        Ok(value)
    }

    /// Write consecutive bytes starting at `start`
    ///
    /// Returns the last value written, or 0xFF for an empty block.
    pub fn write_block(&mut self, chip: ChipType, start: u32, data: &[u8]) -> Result<u8> {
        let total = chip.total_bytes();
        let end = start.saturating_add(data.len() as u32);
        if end > total {
            return Err(Error::AddressOutOfBounds {
                addr: end - 1,
                size: total,
            });
        }

        let mut last = 0xFF;
        for (offset, &value) in data.iter().enumerate() {
            last = self.write_byte(chip, start + offset as u32, value)?;
        }
        Ok(last)
    }

    /// Poll D7 until it matches bit 7 of `expected`, then return the byte
    ///
    /// Self-timed chips output the complement of the written D7 while the
    /// internal write cycle runs. Gives up with [`Error::WriteIncomplete`]
    /// after the configured number of polls.
    pub fn wait_for_write_completion(&mut self, expected: u8) -> Result<u8> {
        self.bus.set_data_direction(DataDirection::Input);
        self.bus.set_chip_enable(true);
        self.bus.set_output_enable(true);
        self.settle();

        let mut polls = 0;
        loop {
            let sample = self.bus.read_data();
            if (sample ^ expected) & 0x80 == 0 {
                break;
            }
            if polls >= self.poll_limit {
                self.bus.set_output_enable(false);
                self.bus.set_chip_enable(false);
                log::warn!(
                    "write of 0x{:02X} did not complete after {} polls",
                    expected,
                    polls
                );
                return Err(Error::WriteIncomplete {
                    expected,
                    last: sample,
                });
            }
            polls += 1;

            self.bus.set_output_enable(false);
            self.bus.delay_us(POLL_INTERVAL_US);
            self.bus.set_output_enable(true);
            self.settle();
        }

        let value = self.bus.read_data();
        self.bus.set_output_enable(false);
        self.settle();
        self.bus.set_chip_enable(false);
        self.settle();

        Ok(value)
    }

    /// Issue the software data protection enable or disable sequence
    pub fn set_sdp(&mut self, enable: bool) -> Result<()> {
        let seq: &[(u16, u8)] = if enable { &SDP_ENABLE } else { &SDP_DISABLE };
        for &(addr, value) in seq {
            self.write_byte(ChipType::At28c256, addr as u32, value)?;
        }
        log::debug!("SDP {}", if enable { "enabled" } else { "disabled" });
        Ok(())
    }
}
