//! Parallel EEPROM/EPROM programmer firmware for Raspberry Pi Pico
//!
//! Receives text commands over UART0 (GP0 TX, GP1 RX, 115200 8N1) and drives
//! the socket described in [`socket`]. All command handling lives in
//! `eeprog_core::device`; this crate only provides the pins and the line.

#![no_std]
#![no_main]

mod socket;

use defmt::{info, warn};
use eeprog_core::device::CommandProcessor;
use eeprog_core::programmer::ChipDriver;
use embassy_executor::Spawner;
use embassy_rp::gpio::Flex;
use embassy_rp::uart::{self, Blocking, UartTx};
use {defmt_rtt as _, panic_probe as _};

use crate::socket::{AddressRegister, Socket};

/// Host line speed
const BAUD_RATE: u32 = 115200;

/// `embedded_io` sink over the blocking UART transmitter
struct UartSink<'a> {
    tx: &'a mut UartTx<'static, Blocking>,
}

impl embedded_io::ErrorType for UartSink<'_> {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for UartSink<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx
            .blocking_write(buf)
            .map_err(|_| embedded_io::ErrorKind::Other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.tx
            .blocking_flush()
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("pico-eeprog starting...");

    let p = embassy_rp::init(Default::default());

    let address = AddressRegister::new(p.PIN_2, p.PIN_3, p.PIN_4);
    let data = [
        Flex::new(p.PIN_6),
        Flex::new(p.PIN_7),
        Flex::new(p.PIN_8),
        Flex::new(p.PIN_9),
        Flex::new(p.PIN_10),
        Flex::new(p.PIN_11),
        Flex::new(p.PIN_12),
        Flex::new(p.PIN_13),
    ];
    let socket = Socket::new(address, data, p.PIN_14, p.PIN_15, p.PIN_16);

    let mut config = uart::Config::default();
    config.baudrate = BAUD_RATE;
    let uart = uart::Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, config);
    let (mut tx, mut rx) = uart.split();

    let mut processor = CommandProcessor::new(ChipDriver::new(socket));
    let mut out = UartSink { tx: &mut tx };
    if processor.banner(&mut out).is_err() {
        warn!("failed to send banner");
    }
    info!("pico-eeprog ready");

    let mut byte = [0u8; 1];
    loop {
        if let Err(e) = rx.blocking_read(&mut byte) {
            warn!("UART receive error: {:?}", e);
            continue;
        }
        if let Err(e) = processor.feed(byte[0], &mut out) {
            warn!("command failed: {}", defmt::Display2Format(&e));
        }
    }
}
