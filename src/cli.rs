//! CLI argument parsing

use clap::{Parser, ValueEnum};
use eeprog_core::chip::{ChipType, GEOMETRIES};
use std::path::PathBuf;

/// Parse a number given as decimal or as `x`/`0x` prefixed hex
fn parse_number(s: &str) -> Result<u32, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('x'))
        .or_else(|| s.strip_prefix('X'));
    match hex {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e)),
        None => s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e)),
    }
}

fn parse_address(s: &str) -> Result<u32, String> {
    parse_number(s)
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let value = parse_number(s)?;
    u8::try_from(value).map_err(|_| format!("Byte value {} is above 255", value))
}

fn parse_chip(s: &str) -> Result<ChipType, String> {
    ChipType::from_cli_name(s).ok_or_else(|| format!("Unknown chip type '{}'", s))
}

/// Generate help text for the chip type argument
fn chip_help() -> String {
    let names: Vec<&str> = GEOMETRIES.iter().filter_map(|g| g.cli_name).collect();
    format!("Chip type [available: {}]", names.join(", "))
}

/// Operation selected with `-o`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpCode {
    /// Read the chip (to a file, or dump it to the console)
    #[value(name = "r")]
    Read,
    /// Read one byte (needs -a)
    #[value(name = "rb")]
    ReadByte,
    /// Write a file byte by byte
    #[value(name = "w")]
    Write,
    /// Write a file in 64-byte pages (AT28C256 only)
    #[value(name = "wp")]
    WritePaged,
    /// Write one byte (needs -a and -b)
    #[value(name = "wb")]
    WriteByte,
    /// Verify the chip against a file
    #[value(name = "v")]
    Verify,
    /// Enable software data protection
    #[value(name = "e")]
    EnableSdp,
    /// Disable software data protection
    #[value(name = "d")]
    DisableSdp,
    /// Check that the chip is erased
    #[value(name = "b")]
    BlankCheck,
}

#[derive(Parser)]
#[command(name = "eeprog")]
#[command(author, version, about = "Parallel EEPROM/EPROM programmer", long_about = None)]
pub struct Cli {
    /// Serial device of the programmer ("sim" for the built-in simulator)
    #[arg(short = 'd', long = "device")]
    pub device: Option<String>,

    #[arg(short = 't', long = "type", value_parser = parse_chip, help = chip_help())]
    pub chip: Option<ChipType>,

    /// Operation to perform
    #[arg(short = 'o', long = "operation", value_enum)]
    pub operation: Option<OpCode>,

    /// Address for single-byte operations (decimal, or hex with x prefix)
    #[arg(short = 'a', long, value_parser = parse_address)]
    pub address: Option<u32>,

    /// Byte value for -o wb (0-255, decimal or hex with x prefix)
    #[arg(short = 'b', long = "byte", value_parser = parse_byte)]
    pub byte: Option<u8>,

    /// Image file to read into, write from or verify against
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Serial line speed
    #[arg(long, default_value_t = eeprog_serial::transport::serial::DEFAULT_BAUD)]
    pub baud: u32,

    /// List supported chips and exit
    #[arg(long)]
    pub list_chips: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// A fully validated operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read the whole chip
    Read { file: Option<PathBuf> },
    /// Read one byte
    ReadByte { addr: u32 },
    /// Write the whole chip
    Write { file: PathBuf, paged: bool },
    /// Write one byte
    WriteByte { addr: u32, value: u8 },
    /// Verify against a file
    Verify { file: PathBuf },
    /// Enable or disable SDP
    SetSdp { enable: bool },
    /// Blank check
    BlankCheck,
}

/// Everything needed to run one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub device: String,
    pub chip: ChipType,
    pub action: Action,
    pub baud: u32,
}

impl Cli {
    /// Check that the options required by the selected operation are present
    pub fn request(&self) -> Result<Request, String> {
        let device = self.device.clone().ok_or("missing device (-d)")?;
        let chip = self.chip.ok_or("missing chip type (-t)")?;
        let op = self.operation.ok_or("missing operation (-o)")?;

        let file = || self.file.clone().ok_or("operation needs a file (-f)");
        let addr = || -> Result<u32, String> {
            let addr = self.address.ok_or("operation needs an address (-a)")?;
            if addr >= chip.total_bytes() {
                return Err(format!(
                    "address 0x{:04X} is beyond the {} bytes of {}",
                    addr,
                    chip.total_bytes(),
                    chip
                ));
            }
            Ok(addr)
        };

        let action = match op {
            OpCode::Read => Action::Read {
                file: self.file.clone(),
            },
            OpCode::ReadByte => Action::ReadByte { addr: addr()? },
            OpCode::Write => Action::Write {
                file: file()?,
                paged: false,
            },
            OpCode::WritePaged => Action::Write {
                file: file()?,
                paged: true,
            },
            OpCode::WriteByte => Action::WriteByte {
                addr: addr()?,
                value: self.byte.ok_or("operation needs a byte value (-b)")?,
            },
            OpCode::Verify => Action::Verify { file: file()? },
            OpCode::EnableSdp => Action::SetSdp { enable: true },
            OpCode::DisableSdp => Action::SetSdp { enable: false },
            OpCode::BlankCheck => Action::BlankCheck,
        };

        Ok(Request {
            device,
            chip,
            action,
            baud: self.baud,
        })
    }
}
