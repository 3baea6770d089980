//! Wire protocol between host and programmer
//!
//! Commands are ASCII lines terminated by `\r`:
//!
//! | Command                         | Response                        |
//! |---------------------------------|---------------------------------|
//! | `VERSION=?`                     | `+VERSION=MAJ.MIN`              |
//! | `READEEPROM=<romtype>,<total>`  | `total` raw bytes               |
//! | `WRITEEEPROM=<total>[,64]`      | raw readback, block by block    |
//! | `WRITEBYTE=<address>,<value>`   | `+WRITEBYTE=<value>`            |
//! | `READBYTE=<romtype>,<address>`  | `+READBYTE=<value>`             |
//! | `ENABLESDP=1` / `ENABLESDP=0`   | none                            |
//!
//! Text responses end with `\r\n`. Raw streams carry no length prefix and no
//! checksum; the receiver knows the size from the chip geometry.

use core::fmt;

use crate::chip::ChipType;
use crate::error::{Error, Result};

/// Command line terminator
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// Text response terminator
pub const RESPONSE_TERMINATOR: &[u8] = b"\r\n";

/// Longest command line the programmer accepts, terminator excluded
pub const MAX_COMMAND_LEN: usize = 32;

/// Page size of a paged whole-chip write
pub const PAGE_SIZE: usize = 64;

/// Firmware version reported by this implementation
pub const FIRMWARE_VERSION: FirmwareVersion = FirmwareVersion::new(0, 4);

/// Oldest firmware the host talks to, as `major * 1000 + minor`
pub const MIN_FIRMWARE_VERSION: u32 = 4;

/// Line printed by the programmer after reset
pub const BANNER: &str = "EEPROM PROGRAMMER READY";

/// Firmware version in `MAJ.MIN` form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Major number
    pub major: u32,
    /// Minor number
    pub minor: u32,
}

impl FirmwareVersion {
    /// Create a version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Single comparable number: `major * 1000 + minor`
    pub const fn value(&self) -> u32 {
        self.major * 1000 + self.minor
    }

    /// Parse `MAJ.MIN`
    pub fn parse(s: &str) -> Result<Self> {
        let (major, minor) = s.trim().split_once('.').ok_or(Error::InvalidResponse)?;
        Ok(Self {
            major: major.parse().map_err(|_| Error::InvalidResponse)?,
            minor: minor.parse().map_err(|_| Error::InvalidResponse)?,
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.major, self.minor)
    }
}

/// Host to programmer command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `VERSION=?`
    Version,
    /// Stream the whole chip
    ReadEeprom {
        /// Geometry used for addressing
        chip: ChipType,
        /// Number of bytes to stream
        total: u32,
    },
    /// Write the whole chip from the bytes that follow
    WriteEeprom {
        /// Number of bytes that follow
        total: u32,
        /// 64-byte pages instead of single bytes
        paged: bool,
    },
    /// Write one byte (AT28C256 addressing)
    WriteByte {
        /// Logical address
        addr: u32,
        /// Value to write
        value: u8,
    },
    /// Read one byte
    ReadByte {
        /// Geometry used for addressing
        chip: ChipType,
        /// Logical address
        addr: u32,
    },
    /// Enable or disable software data protection
    SetSdp {
        /// `true` to enable
        enable: bool,
    },
}

fn number<T: core::str::FromStr>(s: &str) -> Result<T> {
    s.trim().parse().map_err(|_| Error::InvalidCommand)
}

fn pair(s: &str) -> Result<(&str, &str)> {
    s.split_once(',').ok_or(Error::InvalidCommand)
}

impl Command {
    /// Parse a command line (terminator already stripped)
    pub fn parse(line: &str) -> Result<Self> {
        let (name, args) = line.trim().split_once('=').ok_or(Error::InvalidCommand)?;
        match name {
            "VERSION" if args == "?" => Ok(Command::Version),
            "READEEPROM" => {
                let (code, total) = pair(args)?;
                Ok(Command::ReadEeprom {
                    chip: ChipType::from_code(number(code)?)?,
                    total: number(total)?,
                })
            }
            "WRITEEEPROM" => {
                let (total, paged) = match args.split_once(',') {
                    None => (args, false),
                    Some((total, page)) if number::<usize>(page)? == PAGE_SIZE => (total, true),
                    Some(_) => return Err(Error::InvalidCommand),
                };
                Ok(Command::WriteEeprom {
                    total: number(total)?,
                    paged,
                })
            }
            "WRITEBYTE" => {
                let (addr, value) = pair(args)?;
                Ok(Command::WriteByte {
                    addr: number(addr)?,
                    value: number(value)?,
                })
            }
            "READBYTE" => {
                let (code, addr) = pair(args)?;
                Ok(Command::ReadByte {
                    chip: ChipType::from_code(number(code)?)?,
                    addr: number(addr)?,
                })
            }
            "ENABLESDP" => match args {
                "1" => Ok(Command::SetSdp { enable: true }),
                "0" => Ok(Command::SetSdp { enable: false }),
                _ => Err(Error::InvalidCommand),
            },
            _ => Err(Error::InvalidCommand),
        }
    }

    /// Whether the programmer answers this command
    pub fn expects_response(&self) -> bool {
        !matches!(self, Command::SetSdp { .. })
    }
}

/// Formats the command line without its terminator
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Version => write!(f, "VERSION=?"),
            Command::ReadEeprom { chip, total } => {
                write!(f, "READEEPROM={},{}", chip.code(), total)
            }
            Command::WriteEeprom { total, paged } => {
                write!(f, "WRITEEEPROM={}", total)?;
                if paged {
                    write!(f, ",{}", PAGE_SIZE)?;
                }
                Ok(())
            }
            Command::WriteByte { addr, value } => write!(f, "WRITEBYTE={},{}", addr, value),
            Command::ReadByte { chip, addr } => write!(f, "READBYTE={},{}", chip.code(), addr),
            Command::SetSdp { enable } => write!(f, "ENABLESDP={}", enable as u8),
        }
    }
}

/// Programmer to host text response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    /// `+VERSION=MAJ.MIN`
    Version(FirmwareVersion),
    /// `+WRITEBYTE=<value read back>`
    WriteByte(u8),
    /// `+READBYTE=<value>`
    ReadByte(u8),
    /// `+ERROR=<reason>`
    Error(&'a str),
}

impl<'a> Response<'a> {
    /// Parse a response line (terminators already stripped)
    pub fn parse(line: &'a str) -> Result<Self> {
        let body = line.trim().strip_prefix('+').ok_or(Error::InvalidResponse)?;
        let (name, value) = body.split_once('=').ok_or(Error::InvalidResponse)?;
        let byte = |v: &str| v.trim().parse::<u8>().map_err(|_| Error::InvalidResponse);
        match name {
            "VERSION" => Ok(Response::Version(FirmwareVersion::parse(value)?)),
            "WRITEBYTE" => Ok(Response::WriteByte(byte(value)?)),
            "READBYTE" => Ok(Response::ReadByte(byte(value)?)),
            "ERROR" => Ok(Response::Error(value)),
            _ => Err(Error::InvalidResponse),
        }
    }
}

impl fmt::Display for Response<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Version(v) => write!(f, "+VERSION={}", v),
            Response::WriteByte(v) => write!(f, "+WRITEBYTE={}", v),
            Response::ReadByte(v) => write!(f, "+READBYTE={}", v),
            Response::Error(reason) => write!(f, "+ERROR={}", reason),
        }
    }
}
