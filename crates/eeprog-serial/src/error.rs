//! Error types for host transfers

use eeprog_core::chip::ChipType;
use eeprog_core::protocol::FirmwareVersion;
use thiserror::Error;

use crate::device::MAX_REPORTED_MISMATCHES;
use crate::session::Mismatch;

/// Errors raised while talking to the programmer
#[derive(Debug, Error)]
pub enum TransferError {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the core library
    #[error("{0}")]
    Core(#[from] eeprog_core::Error),

    /// Programmer stayed silent
    #[error("No response from programmer")]
    NoResponse,

    /// Response line did not match the expected form
    #[error("Malformed response: {0:?}")]
    MalformedResponse(String),

    /// Programmer answered with `+ERROR=`
    #[error("Programmer error: {0}")]
    Device(String),

    /// Firmware older than the host supports
    #[error("Firmware {found} is too old, please update the programmer (need {minimum})")]
    FirmwareTooOld {
        /// Version reported by the programmer
        found: FirmwareVersion,
        /// Minimum as `major * 1000 + minor`
        minimum: u32,
    },

    /// Stream ended before the expected number of bytes
    #[error("Expected {expected} bytes, received {received}")]
    ByteCountMismatch {
        /// Bytes the geometry calls for
        expected: usize,
        /// Bytes actually received
        received: usize,
    },

    /// Chip contents differ from the reference
    #[error("{}", content_summary(.mismatches.len(), *.checked, *.expected))]
    ContentMismatch {
        /// Reported differences, at most three
        mismatches: Vec<Mismatch>,
        /// Bytes compared before stopping
        checked: usize,
        /// Bytes the geometry calls for
        expected: usize,
    },

    /// Write echo differs from the byte sent
    #[error("Write error at address 0x{addr:04X}: written byte 0x{expected:02X}, read byte 0x{found:02X}")]
    WriteMismatch {
        /// Logical address
        addr: u32,
        /// Byte sent
        expected: u8,
        /// Byte echoed back
        found: u8,
    },

    /// Write echo did not arrive in time
    #[error("Write timeout at address 0x{addr:04X}")]
    WriteTimeout {
        /// Logical address of the first missing echo byte
        addr: u32,
    },

    /// Image file does not match the chip size
    #[error("Image is {found} bytes but {chip} holds {expected}")]
    ImageSizeMismatch {
        /// Selected chip
        chip: ChipType,
        /// Chip size
        expected: usize,
        /// Image size
        found: usize,
    },

    /// Paged write requested on a chip without page support
    #[error("Paged write is not supported by {0}")]
    PagedWriteUnsupported(ChipType),

    /// Whole-chip write the programmer would address with another geometry
    #[error("Whole-chip write is not supported by {0}")]
    WholeChipWriteUnsupported(ChipType),
}

/// "N errors found", plus the shortfall when the stream ended early
///
/// A scan that stopped at the mismatch cap is not a shortfall.
fn content_summary(errors: usize, checked: usize, expected: usize) -> String {
    if errors < MAX_REPORTED_MISMATCHES && checked < expected {
        format!(
            "{} errors found, stream ended after {} of {} bytes",
            errors, checked, expected
        )
    } else {
        format!("{} errors found", errors)
    }
}

/// Result type for host transfers
pub type Result<T> = core::result::Result<T, TransferError>;
