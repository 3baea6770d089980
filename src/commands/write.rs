//! Write command implementation

use eeprog_core::chip::ChipType;
use eeprog_serial::{Programmer, Transport};
use std::path::Path;

use crate::progress::IndicatifProgress;

/// Run the write command
pub fn run_write<T: Transport>(
    programmer: &mut Programmer<T>,
    chip: ChipType,
    input: &Path,
    paged: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", image.len(), input);

    let mut progress = IndicatifProgress::new();
    let written = programmer.write(chip, &image, paged, &mut progress)?;

    println!(
        "Wrote {} bytes to {}{}",
        written,
        chip,
        if paged { " (64-byte pages)" } else { "" }
    );
    Ok(())
}

/// Run the single byte write command
pub fn run_write_byte<T: Transport>(
    programmer: &mut Programmer<T>,
    addr: u32,
    value: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    programmer.write_byte(addr, value)?;
    println!(
        "written byte {} [x{:02X}] at address {} [x{:04X}]",
        value, value, addr, addr
    );
    Ok(())
}
