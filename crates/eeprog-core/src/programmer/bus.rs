//! Pin-level access to a parallel memory socket

/// Direction of the 8 data lines as seen from the programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// Programmer samples the data lines
    Input,
    /// Programmer drives the data lines
    Output,
}

/// Trait for bit-banging a parallel memory socket
///
/// The socket has 16 address lines, 8 bidirectional data lines and the
/// three active-low control lines CE, OE and WE. Control setters take the
/// logical state: `active = true` drives the line low.
pub trait ParallelBus {
    /// Switch the data lines between input and output
    fn set_data_direction(&mut self, dir: DataDirection);

    /// Drive all 16 address lines
    fn set_address(&mut self, addr: u16);

    /// Drive the data lines (only meaningful in output mode)
    fn write_data(&mut self, value: u8);

    /// Sample the data lines (only meaningful in input mode)
    fn read_data(&mut self) -> u8;

    /// Set chip enable (CE is active low, so `active=true` means CE=0)
    fn set_chip_enable(&mut self, active: bool);

    /// Set output enable (OE is active low)
    fn set_output_enable(&mut self, active: bool);

    /// Set write enable (WE is active low)
    fn set_write_enable(&mut self, active: bool);

    /// Busy-wait for the given number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: ParallelBus + ?Sized> ParallelBus for &mut T {
    fn set_data_direction(&mut self, dir: DataDirection) {
        (**self).set_data_direction(dir)
    }

    fn set_address(&mut self, addr: u16) {
        (**self).set_address(addr)
    }

    fn write_data(&mut self, value: u8) {
        (**self).write_data(value)
    }

    fn read_data(&mut self) -> u8 {
        (**self).read_data()
    }

    fn set_chip_enable(&mut self, active: bool) {
        (**self).set_chip_enable(active)
    }

    fn set_output_enable(&mut self, active: bool) {
        (**self).set_output_enable(active)
    }

    fn set_write_enable(&mut self, active: bool) {
        (**self).set_write_enable(active)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
