//! GPIO driver for the programmer socket
//!
//! The 16 address lines come from two daisy-chained 74HC595 shift
//! registers. Data lines and the three control lines are direct GPIOs.
//!
//! ## Pin Assignments
//!
//! | Pin       | Function                   |
//! |-----------|----------------------------|
//! | GP2       | 74HC595 SER (serial data)  |
//! | GP3       | 74HC595 SRCLK (shift)      |
//! | GP4       | 74HC595 RCLK (latch)       |
//! | GP6-GP13  | D0-D7                      |
//! | GP14      | CE (active low)            |
//! | GP15      | OE (active low)            |
//! | GP16      | WE (active low)            |

use eeprog_core::programmer::{DataDirection, ParallelBus};
use embassy_rp::gpio::{Flex, Level, Output, Pin, Pull};
use embassy_rp::Peri;
use embassy_time::{block_for, Duration};

/// Address shift register outputs
pub struct AddressRegister {
    ser: Output<'static>,
    srclk: Output<'static>,
    rclk: Output<'static>,
}

impl AddressRegister {
    pub fn new(
        ser: Peri<'static, impl Pin>,
        srclk: Peri<'static, impl Pin>,
        rclk: Peri<'static, impl Pin>,
    ) -> Self {
        Self {
            ser: Output::new(ser, Level::Low),
            srclk: Output::new(srclk, Level::Low),
            rclk: Output::new(rclk, Level::Low),
        }
    }

    /// Shift out 16 bits MSB first and latch them onto the outputs
    fn load(&mut self, value: u16) {
        for bit in (0..16).rev() {
            self.ser.set_level(Level::from(value & (1 << bit) != 0));
            self.srclk.set_high();
            self.srclk.set_low();
        }
        self.rclk.set_high();
        self.rclk.set_low();
    }
}

/// Socket wired to the RP2040
pub struct Socket {
    address: AddressRegister,
    data: [Flex<'static>; 8],
    ce: Output<'static>,
    oe: Output<'static>,
    we: Output<'static>,
    direction: DataDirection,
}

impl Socket {
    /// Create the socket driver with every control line deasserted
    pub fn new(
        address: AddressRegister,
        data: [Flex<'static>; 8],
        ce: Peri<'static, impl Pin>,
        oe: Peri<'static, impl Pin>,
        we: Peri<'static, impl Pin>,
    ) -> Self {
        let mut socket = Self {
            address,
            data,
            ce: Output::new(ce, Level::High),
            oe: Output::new(oe, Level::High),
            we: Output::new(we, Level::High),
            direction: DataDirection::Output,
        };
        socket.set_data_direction(DataDirection::Input);
        socket.set_address(0);
        socket
    }
}

fn drive(pin: &mut Output<'static>, active: bool) {
    pin.set_level(if active { Level::Low } else { Level::High });
}

impl ParallelBus for Socket {
    fn set_data_direction(&mut self, dir: DataDirection) {
        if dir == self.direction {
            return;
        }
        for pin in &mut self.data {
            match dir {
                DataDirection::Input => {
                    pin.set_as_input();
                    pin.set_pull(Pull::None);
                }
                DataDirection::Output => pin.set_as_output(),
            }
        }
        self.direction = dir;
    }

    fn set_address(&mut self, addr: u16) {
        self.address.load(addr);
    }

    fn write_data(&mut self, value: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            pin.set_level(Level::from(value & (1 << bit) != 0));
        }
    }

    fn read_data(&mut self) -> u8 {
        self.data
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, pin)| acc | ((pin.is_high() as u8) << bit))
    }

    fn set_chip_enable(&mut self, active: bool) {
        drive(&mut self.ce, active);
    }

    fn set_output_enable(&mut self, active: bool) {
        drive(&mut self.oe, active);
    }

    fn set_write_enable(&mut self, active: bool) {
        drive(&mut self.we, active);
    }

    fn delay_us(&mut self, us: u32) {
        block_for(Duration::from_micros(us as u64));
    }
}
