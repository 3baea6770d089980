//! Chip type definitions and the geometry table

use core::fmt;

use super::features::Features;
use crate::error::{Error, Result};

/// Chip families understood by the programmer
///
/// The discriminant is the geometry code used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChipType {
    /// Atmel AT28C64 8K x 8 EEPROM
    At28c64 = 0,
    /// Atmel AT28C256 32K x 8 EEPROM
    At28c256 = 1,
    /// 2764 8K x 8 EPROM
    E2764 = 2,
    /// 27128 16K x 8 EPROM
    E27128 = 3,
    /// 27256 32K x 8 EPROM
    E27256 = 4,
    /// 27512 64K x 8 EPROM (wire protocol only)
    E27512 = 5,
}

/// How the chip receives its write-enable signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEnableMode {
    /// The chip has its own WE pin wired to the programmer's WE line
    DedicatedPin,
    /// The programmer's WE line doubles as an address line on this socket
    SharedWithAddressLine,
}

/// Control line that strobes a byte into the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrobe {
    /// WE is pulsed low while CE is asserted
    WriteEnable,
    /// WE is busy carrying an address bit, so the CE assertion is the pulse
    ChipEnable,
}

/// Level forced onto the WE line by address translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeDrive {
    /// Translation leaves WE alone
    Untouched,
    /// WE driven low
    Low,
    /// WE driven high
    High,
}

/// Result of translating a logical address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translated {
    /// Value for the 16 socket address lines
    pub physical: u16,
    /// Override for the WE line
    pub we: WeDrive,
}

impl Translated {
    const fn new(physical: u16, we: WeDrive) -> Self {
        Self { physical, we }
    }
}

/// One entry of the geometry table
#[derive(Clone, Copy)]
pub struct Geometry {
    /// Chip this record describes
    pub chip: ChipType,
    /// Display name
    pub name: &'static str,
    /// Name accepted on the command line, `None` if not selectable there
    pub cli_name: Option<&'static str>,
    /// Number of addressable bytes
    pub total_bytes: u32,
    /// How WE reaches the chip
    pub write_enable: WriteEnableMode,
    /// Which line strobes a write
    pub strobe: WriteStrobe,
    /// Extra time the strobe is held, in microseconds
    pub program_hold_us: u32,
    /// Capabilities
    pub features: Features,
    transform: fn(u16) -> Translated,
}

impl Geometry {
    /// Translate a logical address that is known to be in range
    pub fn map(&self, logical: u16) -> Translated {
        (self.transform)(logical)
    }

    /// Translate a logical address, rejecting anything outside the chip
    pub fn translate(&self, logical: u32) -> Result<Translated> {
        if logical >= self.total_bytes {
            return Err(Error::AddressOutOfBounds {
                addr: logical,
                size: self.total_bytes,
            });
        }
        Ok(self.map(logical as u16))
    }

    /// Whether the chip takes 64-byte page writes
    pub fn supports_page_write(&self) -> bool {
        self.features.contains(Features::PAGE_WRITE)
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("chip", &self.chip)
            .field("total_bytes", &self.total_bytes)
            .field("write_enable", &self.write_enable)
            .field("strobe", &self.strobe)
            .field("program_hold_us", &self.program_hold_us)
            .field("features", &self.features)
            .finish()
    }
}

fn passthrough(a: u16) -> Translated {
    Translated::new(a, WeDrive::Untouched)
}

// 2764 and 27128 sit at the top of the 28-pin socket; A13/A14 become
// the PGM and VPP pins and must stay high while reading.
fn e2764(a: u16) -> Translated {
    Translated::new(a + 0x6000, WeDrive::Untouched)
}

fn e27128(a: u16) -> Translated {
    Translated::new(a + 0x4000, WeDrive::Untouched)
}

// WE carries A14 of the 27256, socket A14 is VPP.
fn e27256(a: u16) -> Translated {
    if a < 0x4000 {
        Translated::new(a + 0x4000, WeDrive::Low)
    } else {
        Translated::new(a, WeDrive::High)
    }
}

// WE carries A14 of the 27512, socket A14 is routed to A15.
fn e27512(a: u16) -> Translated {
    match a {
        0x0000..=0x3FFF => Translated::new(a, WeDrive::Low),
        0x4000..=0x7FFF => Translated::new(a + 0x4000, WeDrive::High),
        0x8000..=0xBFFF => Translated::new(a - 0x4000, WeDrive::Low),
        _ => Translated::new(a, WeDrive::High),
    }
}

const EEPROM: Features = Features::ELECTRICALLY_ERASABLE
    .union(Features::SELF_TIMED)
    .union(Features::SDP);

/// Program pulse width of the 27xx family
pub const EPROM_PROGRAM_PULSE_US: u32 = 1000;

/// The geometry table, indexed by wire code
pub static GEOMETRIES: [Geometry; 6] = [
    Geometry {
        chip: ChipType::At28c64,
        name: "AT28C64",
        cli_name: Some("AT28C64"),
        total_bytes: 8192,
        write_enable: WriteEnableMode::DedicatedPin,
        strobe: WriteStrobe::WriteEnable,
        program_hold_us: 0,
        features: EEPROM,
        transform: passthrough,
    },
    Geometry {
        chip: ChipType::At28c256,
        name: "AT28C256",
        cli_name: Some("AT28C256"),
        total_bytes: 32768,
        write_enable: WriteEnableMode::DedicatedPin,
        strobe: WriteStrobe::WriteEnable,
        program_hold_us: 0,
        features: EEPROM.union(Features::PAGE_WRITE),
        transform: passthrough,
    },
    Geometry {
        chip: ChipType::E2764,
        name: "2764",
        cli_name: Some("2764"),
        total_bytes: 8192,
        write_enable: WriteEnableMode::SharedWithAddressLine,
        strobe: WriteStrobe::WriteEnable,
        program_hold_us: EPROM_PROGRAM_PULSE_US,
        features: Features::PROGRAM_PULSE,
        transform: e2764,
    },
    Geometry {
        chip: ChipType::E27128,
        name: "27128",
        cli_name: Some("27128"),
        total_bytes: 16384,
        write_enable: WriteEnableMode::SharedWithAddressLine,
        strobe: WriteStrobe::WriteEnable,
        program_hold_us: EPROM_PROGRAM_PULSE_US,
        features: Features::PROGRAM_PULSE,
        transform: e27128,
    },
    Geometry {
        chip: ChipType::E27256,
        name: "27256",
        cli_name: Some("27256"),
        total_bytes: 32768,
        write_enable: WriteEnableMode::SharedWithAddressLine,
        strobe: WriteStrobe::ChipEnable,
        program_hold_us: EPROM_PROGRAM_PULSE_US,
        features: Features::PROGRAM_PULSE,
        transform: e27256,
    },
    Geometry {
        chip: ChipType::E27512,
        name: "27512",
        cli_name: None,
        total_bytes: 65536,
        write_enable: WriteEnableMode::SharedWithAddressLine,
        strobe: WriteStrobe::WriteEnable,
        program_hold_us: 0,
        features: Features::empty(),
        transform: e27512,
    },
];

impl ChipType {
    /// All chip types in wire-code order
    pub const ALL: [ChipType; 6] = [
        ChipType::At28c64,
        ChipType::At28c256,
        ChipType::E2764,
        ChipType::E27128,
        ChipType::E27256,
        ChipType::E27512,
    ];

    /// Look up a chip type by its wire code
    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::UnknownChipType(code))
    }

    /// Look up a chip type by its command-line name (case-insensitive)
    pub fn from_cli_name(name: &str) -> Option<Self> {
        GEOMETRIES
            .iter()
            .find(|g| g.cli_name.is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|g| g.chip)
    }

    /// Guess the chip from the size of a whole-chip transfer
    ///
    /// The write command carries no geometry code; the size selects the
    /// addressing used for it.
    pub fn from_total_bytes(total: u32) -> Option<Self> {
        match total {
            8192 => Some(ChipType::At28c64),
            16384 => Some(ChipType::E27128),
            32768 => Some(ChipType::At28c256),
            65536 => Some(ChipType::E27512),
            _ => None,
        }
    }

    /// Wire code of this chip type
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The geometry record for this chip type
    pub fn geometry(self) -> &'static Geometry {
        &GEOMETRIES[self as usize]
    }

    /// Number of addressable bytes
    pub fn total_bytes(self) -> u32 {
        self.geometry().total_bytes
    }

    /// Display name
    pub fn name(self) -> &'static str {
        self.geometry().name
    }

    /// Whether a whole-chip write reaches this chip with its own geometry
    ///
    /// The programmer picks the write geometry from the transfer size, so
    /// only the chip that owns its size can be written as a whole.
    pub fn supports_whole_chip_write(self) -> bool {
        Self::from_total_bytes(self.total_bytes()) == Some(self)
    }
}

impl fmt::Display for ChipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
