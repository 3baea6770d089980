//! Chip feature flags

use bitflags::bitflags;

bitflags! {
    /// Feature flags for parallel memory chips
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u8 {
        /// Electrically erasable, rewritten in place without UV erase
        const ELECTRICALLY_ERASABLE = 1 << 0;
        /// Internally timed write cycle, completion detected by data polling
        const SELF_TIMED            = 1 << 1;
        /// Accepts 64-byte page writes
        const PAGE_WRITE            = 1 << 2;
        /// Software data protection command sequences
        const SDP                   = 1 << 3;
        /// Needs a long programming pulse per byte (one-time programmable)
        const PROGRAM_PULSE         = 1 << 4;
    }
}
