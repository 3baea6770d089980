//! Read command implementation

use eeprog_core::chip::ChipType;
use eeprog_serial::{Programmer, Transport};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::progress::IndicatifProgress;

/// Bytes per hex dump line
const DUMP_WIDTH: usize = 16;

/// Run the read command
///
/// Writes the image to `output`, or prints a hex dump without one.
pub fn run_read<T: Transport>(
    programmer: &mut Programmer<T>,
    chip: ChipType,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::new();
    let data = programmer.read(chip, &mut progress)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            for (i, line) in data.chunks(DUMP_WIDTH).enumerate() {
                writeln!(stdout, "{}", hexdump_line(i * DUMP_WIDTH, line))?;
            }
        }
    }

    Ok(())
}

/// Run the single byte read command
pub fn run_read_byte<T: Transport>(
    programmer: &mut Programmer<T>,
    chip: ChipType,
    addr: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = programmer.read_byte(chip, addr)?;
    println!(
        "read byte {} [x{:02X}] at address {} [x{:04X}]",
        value, value, addr, addr
    );
    Ok(())
}

/// Format one dump line: `xADDR:  xHH xHH ...  -  | ascii |`
fn hexdump_line(offset: usize, bytes: &[u8]) -> String {
    let mut line = format!("x{:04X}: ", offset);
    for b in bytes {
        let _ = write!(line, " x{:02X}", b);
    }
    for _ in bytes.len()..DUMP_WIDTH {
        line.push_str("    ");
    }
    line.push_str("  -  | ");
    line.extend(bytes.iter().map(|&b| {
        if b.is_ascii_graphic() || b == b' ' {
            b as char
        } else {
            '.'
        }
    }));
    line.push_str(" |");
    line
}
