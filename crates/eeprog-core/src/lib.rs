//! eeprog-core - Core library for parallel EEPROM/EPROM programming
//!
//! This crate contains everything shared between the programmer firmware
//! and the host tool. It is `no_std` so that the firmware can link it
//! directly.
//!
//! - [`chip`] - the geometry table and logical-to-physical address translation
//! - [`programmer`] - the pin-level bus trait and the chip driver on top of it
//! - [`protocol`] - the line-oriented wire grammar
//! - [`device`] - the device-side command processor
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for the core error type
//!
//! # Example
//!
//! ```ignore
//! use eeprog_core::chip::ChipType;
//! use eeprog_core::programmer::{ChipDriver, ParallelBus};
//!
//! fn dump<B: ParallelBus>(bus: B) -> eeprog_core::Result<()> {
//!     let mut driver = ChipDriver::new(bus);
//!     for addr in 0..ChipType::At28c64.total_bytes() {
//!         let byte = driver.read_byte(ChipType::At28c64, addr)?;
//!         // ...
//!     }
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod device;
pub mod error;
pub mod programmer;
pub mod protocol;

pub use error::{Error, Result};
