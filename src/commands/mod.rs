//! Command implementations

pub mod list;
pub mod read;
pub mod verify;
pub mod write;

pub use list::list_chips;

use crate::cli::{Action, Request};
use eeprog_serial::{Programmer, SerialTransport, Timeouts, Transport};

/// Device name selecting the in-process simulated programmer
pub const SIM_DEVICE: &str = "sim";

/// Open the programmer named in the request and run its action
pub fn run(request: &Request) -> Result<(), Box<dyn std::error::Error>> {
    let timeouts = Timeouts::default();

    if request.device == SIM_DEVICE {
        return run_simulated(request, timeouts);
    }

    let transport = SerialTransport::open(&request.device, request.baud)?;
    let programmer = Programmer::connect(transport, timeouts)?;
    execute(programmer, request)
}

#[cfg(feature = "dummy")]
fn run_simulated(request: &Request, timeouts: Timeouts) -> Result<(), Box<dyn std::error::Error>> {
    use eeprog_dummy::{DummyConfig, SimulatedDevice};
    use eeprog_serial::SimulatedTransport;

    // behaves like a board that resets when the port opens
    let device = SimulatedDevice::booting(DummyConfig::for_chip(request.chip), 1000);
    let programmer = Programmer::connect(SimulatedTransport::new(device), timeouts)?;
    execute(programmer, request)
}

#[cfg(not(feature = "dummy"))]
fn run_simulated(
    _request: &Request,
    _timeouts: Timeouts,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("simulated programmer support not compiled in (enable the 'dummy' feature)".into())
}

/// Run one action against a connected programmer
pub fn execute<T: Transport>(
    mut programmer: Programmer<T>,
    request: &Request,
) -> Result<(), Box<dyn std::error::Error>> {
    let chip = request.chip;
    match &request.action {
        Action::Read { file } => read::run_read(&mut programmer, chip, file.as_deref()),
        Action::ReadByte { addr } => read::run_read_byte(&mut programmer, chip, *addr),
        Action::Write { file, paged } => write::run_write(&mut programmer, chip, file, *paged),
        Action::WriteByte { addr, value } => write::run_write_byte(&mut programmer, *addr, *value),
        Action::Verify { file } => verify::run_verify(&mut programmer, chip, file),
        Action::BlankCheck => verify::run_blank_check(&mut programmer, chip),
        Action::SetSdp { enable } => {
            programmer.set_sdp(*enable)?;
            println!(
                "software data protection {}",
                if *enable { "enabled" } else { "disabled" }
            );
            Ok(())
        }
    }
}
