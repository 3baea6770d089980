//! Programmer traits and the chip driver
//!
//! [`ParallelBus`] is the pin-level seam: the firmware implements it on
//! real GPIOs, the emulator implements it in memory. [`ChipDriver`] builds
//! the timed read, write and polling sequences on top of it.

mod bus;
mod driver;

pub use bus::{DataDirection, ParallelBus};
pub use driver::{ChipDriver, DEFAULT_POLL_LIMIT, POLL_INTERVAL_US, SDP_DISABLE, SDP_ENABLE};
