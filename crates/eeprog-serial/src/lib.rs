//! eeprog-serial - Host side of the programmer protocol
//!
//! This crate talks to the programmer firmware over a serial line. The
//! wire format has no length headers and no checksums: every transfer is
//! framed by knowing the expected byte count in advance and by a rolling
//! timeout that ends a stream when the line goes quiet.
//!
//! # Example
//!
//! ```no_run
//! use eeprog_core::chip::ChipType;
//! use eeprog_serial::{NoProgress, Programmer, SerialTransport, Timeouts};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 115200)?;
//! let mut programmer = Programmer::connect(transport, Timeouts::default())?;
//! let image = programmer.read(ChipType::At28c256, &mut NoProgress)?;
//! println!("read {} bytes", image.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod session;
pub mod transport;

pub use device::{Programmer, Timeouts, VerifyReport};
pub use error::{Result, TransferError};
pub use session::{Mismatch, NoProgress, Operation, Session, TransferProgress};
pub use transport::serial::SerialTransport;
#[cfg(any(feature = "dummy", test))]
pub use transport::simulated::SimulatedTransport;
pub use transport::Transport;
