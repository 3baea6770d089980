//! Chip geometries and address translation
//!
//! Every supported chip is described by one [`Geometry`] record in a static
//! table. The record holds the chip size, the way the write strobe is
//! delivered, and the pure function that maps a logical address onto the
//! 16 physical address lines of the programmer socket.

mod features;
mod types;

pub use features::Features;
pub use types::*;
