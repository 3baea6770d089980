//! Complete simulated programmer: command processor plus emulated chip

use std::collections::VecDeque;

use eeprog_core::device::CommandProcessor;
use eeprog_core::programmer::ChipDriver;
use eeprog_core::Result;

use crate::chip::{DummyConfig, SimulatedChip};

/// Simulated programmer as seen from the serial line
///
/// Bytes sent by the host go through [`send`](Self::send); everything the
/// firmware answers is queued and handed out by [`receive`](Self::receive).
pub struct SimulatedDevice {
    processor: CommandProcessor<SimulatedChip>,
    output: VecDeque<u8>,
    /// Milliseconds until the banner appears, `None` once booted
    boot_remaining_ms: Option<u64>,
    received: usize,
}

impl SimulatedDevice {
    /// A programmer that is already running
    pub fn new(config: DummyConfig) -> Self {
        Self::with_chip(SimulatedChip::new(config))
    }

    /// A running programmer holding a prepared chip
    pub fn with_chip(chip: SimulatedChip) -> Self {
        Self {
            processor: CommandProcessor::new(ChipDriver::new(chip)),
            output: VecDeque::new(),
            boot_remaining_ms: None,
            received: 0,
        }
    }

    /// A programmer that was just reset by opening the port
    ///
    /// Input is dropped until the boot banner has been printed after
    /// `boot_ms` milliseconds of waiting on the host side.
    pub fn booting(config: DummyConfig, boot_ms: u64) -> Self {
        let mut device = Self::new(config);
        device.boot_remaining_ms = Some(boot_ms);
        device
    }

    /// Emulated chip
    pub fn chip(&self) -> &SimulatedChip {
        self.processor.driver().bus()
    }

    /// Mutable emulated chip
    pub fn chip_mut(&mut self) -> &mut SimulatedChip {
        self.processor.driver_mut().bus_mut()
    }

    /// Number of bytes accepted from the host
    pub fn received(&self) -> usize {
        self.received
    }

    /// Deliver host bytes to the firmware
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.boot_remaining_ms.is_some() {
            log::debug!("simulated device booting, dropped {} bytes", data.len());
            return Ok(());
        }
        let mut out = Vec::new();
        for &byte in data {
            self.processor.feed(byte, &mut out)?;
            self.received += 1;
        }
        self.output.extend(out);
        Ok(())
    }

    /// Take the next byte the firmware sent, waiting up to `wait_ms`
    pub fn receive(&mut self, wait_ms: u64) -> Option<u8> {
        if let Some(remaining) = self.boot_remaining_ms {
            if wait_ms < remaining {
                self.boot_remaining_ms = Some(remaining - wait_ms);
                return None;
            }
            self.boot_remaining_ms = None;
            let mut banner = Vec::new();
            if self.processor.banner(&mut banner).is_ok() {
                self.output.extend(banner);
            }
        }
        self.output.pop_front()
    }

    /// Drop everything queued for the host
    pub fn discard_output(&mut self) {
        self.output.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeprog_core::chip::ChipType;

    fn drain(dev: &mut SimulatedDevice) -> Vec<u8> {
        std::iter::from_fn(|| dev.receive(0)).collect()
    }

    #[test]
    fn test_version_round_trip() {
        let mut dev = SimulatedDevice::new(DummyConfig::default());
        dev.send(b"VERSION=?\r").unwrap();
        assert_eq!(drain(&mut dev), b"+VERSION=0.004\r\n");
    }

    #[test]
    fn test_booting_drops_input_then_prints_banner() {
        let mut dev = SimulatedDevice::booting(DummyConfig::default(), 1000);
        dev.send(b"VERSION=?\r").unwrap();
        assert_eq!(dev.received(), 0);
        assert_eq!(dev.receive(100), None);
        let first = dev.receive(1500);
        assert_eq!(first, Some(b'E'));
        let rest = drain(&mut dev);
        assert!(rest.ends_with(b"\r\n"));

        dev.send(b"VERSION=?\r").unwrap();
        assert_eq!(drain(&mut dev), b"+VERSION=0.004\r\n");
    }

    #[test]
    fn test_whole_chip_write_then_read() {
        let mut dev = SimulatedDevice::new(DummyConfig::for_chip(ChipType::At28c64));
        dev.send(b"WRITEEEPROM=8192\r").unwrap();
        let image: Vec<u8> = (0..8192u32).map(|i| (i * 7) as u8).collect();
        dev.send(&image).unwrap();
        assert_eq!(drain(&mut dev), image);
        assert_eq!(dev.chip().data(), image.as_slice());

        dev.send(b"READEEPROM=0,8192\r").unwrap();
        assert_eq!(drain(&mut dev), image);
    }
}
