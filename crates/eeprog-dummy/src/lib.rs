//! eeprog-dummy - In-memory EEPROM/EPROM emulator for testing
//!
//! [`SimulatedChip`] implements [`ParallelBus`](eeprog_core::programmer::ParallelBus)
//! and reacts to the control lines the way a chip in the programmer socket
//! would, including the socket wiring of each family, AT28C write cycles
//! with data polling and EPROM program pulses. [`SimulatedDevice`] puts the
//! firmware command processor in front of it, giving a complete programmer
//! without hardware.

mod chip;
mod device;

pub use chip::{DummyConfig, SimulatedChip};
pub use device::SimulatedDevice;
