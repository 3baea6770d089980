//! Error types for eeprog-core
//!
//! This module provides a no_std compatible error type shared by the
//! firmware and the host.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Address errors
    /// Logical address is beyond the chip size
    AddressOutOfBounds {
        /// Requested logical address
        addr: u32,
        /// Number of addressable bytes of the chip
        size: u32,
    },

    // Operation errors
    /// Data polling never saw the written value settle
    WriteIncomplete {
        /// Value that was written
        expected: u8,
        /// Last value sampled from the data bus
        last: u8,
    },

    // Chip errors
    /// Geometry code does not name a known chip
    UnknownChipType(u8),
    /// Chip has no such capability
    NotSupported,

    // Protocol errors
    /// Command line could not be parsed
    InvalidCommand,
    /// Response line could not be parsed
    InvalidResponse,
    /// Command line exceeds the receive buffer
    LineTooLong,

    // I/O errors
    /// Writing to the serial sink failed
    IoError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfBounds { addr, size } => write!(
                f,
                "address 0x{:04X} out of range (chip has {} bytes)",
                addr, size
            ),
            Self::WriteIncomplete { expected, last } => write!(
                f,
                "write did not complete: expected 0x{:02X}, last read 0x{:02X}",
                expected, last
            ),
            Self::UnknownChipType(code) => write!(f, "unknown chip type code {}", code),
            Self::NotSupported => write!(f, "operation not supported by chip"),
            Self::InvalidCommand => write!(f, "invalid command"),
            Self::InvalidResponse => write!(f, "invalid response"),
            Self::LineTooLong => write!(f, "command line too long"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
