//! Verify and blank check implementation

use eeprog_core::chip::ChipType;
use eeprog_serial::{Programmer, TransferError, Transport, VerifyReport};
use std::path::Path;

use crate::progress::IndicatifProgress;

/// Run the verify command
pub fn run_verify<T: Transport>(
    programmer: &mut Programmer<T>,
    chip: ChipType,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", expected.len(), input);

    let mut progress = IndicatifProgress::new();
    let result = programmer.verify(chip, &expected, &mut progress);
    report(result)?;
    println!("Verification passed!");
    Ok(())
}

/// Run the blank check command
pub fn run_blank_check<T: Transport>(
    programmer: &mut Programmer<T>,
    chip: ChipType,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::new();
    let result = programmer.blank_check(chip, &mut progress);
    report(result)?;
    println!("{} is blank", chip);
    Ok(())
}

/// Print the summary line of a comparison
///
/// Mismatches were already printed as they were found.
fn report(result: eeprog_serial::Result<VerifyReport>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(report) => {
            println!("checked: {}", report.checked);
            Ok(())
        }
        Err(e) => {
            if let TransferError::ContentMismatch { checked, .. } = &e {
                println!("checked: {}", checked);
            }
            Err(e.into())
        }
    }
}
