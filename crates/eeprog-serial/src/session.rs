//! Per-transfer state and progress reporting

use core::fmt;

use eeprog_core::chip::ChipType;

/// Whole-chip operations that report progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Dump the chip
    Read,
    /// Compare against an image
    Verify,
    /// Compare against the erased state
    BlankCheck,
    /// Program an image
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Verify => "verify",
            Operation::BlankCheck => "blank check",
            Operation::Write => "write",
        })
    }
}

/// One differing byte found by verify or blank check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Logical address
    pub addr: u32,
    /// Byte read from the chip
    pub device: u8,
    /// Byte expected
    pub expected: u8,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "address: 0x{:04X}, eprom byte: 0x{:02X}, file byte: 0x{:02X}",
            self.addr, self.device, self.expected
        )
    }
}

/// Progress callbacks for whole-chip operations
///
/// All methods have empty defaults.
pub trait TransferProgress {
    /// Operation started, `total` bytes expected
    fn start(&mut self, _op: Operation, _total: usize) {}

    /// Completion percentage changed
    fn percent(&mut self, _op: Operation, _percent: u32) {}

    /// A differing byte was found
    fn mismatch(&mut self, _mismatch: &Mismatch) {}

    /// Operation ended after `processed` bytes, successful or not
    fn finish(&mut self, _op: Operation, _processed: usize) {}
}

/// A no-op progress reporter
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// State of one whole-chip transfer
///
/// Lives for exactly one operation and is threaded through its loop.
#[derive(Debug)]
pub struct Session {
    /// Chip the transfer runs against
    pub chip: ChipType,
    /// Operation in progress
    pub op: Operation,
    /// Bytes the transfer must move
    pub expected: usize,
    /// Bytes moved so far
    pub processed: usize,
    /// Differences found so far
    pub mismatches: Vec<Mismatch>,
    last_percent: Option<u32>,
}

impl Session {
    /// Start a session and announce it
    pub fn start(chip: ChipType, op: Operation, progress: &mut dyn TransferProgress) -> Self {
        let expected = chip.total_bytes() as usize;
        log::info!("{} {} ({} bytes)", op, chip, expected);
        progress.start(op, expected);
        Self {
            chip,
            op,
            expected,
            processed: 0,
            mismatches: Vec::new(),
            last_percent: None,
        }
    }

    /// Current completion percentage
    pub fn percent(&self) -> u32 {
        if self.expected == 0 {
            return 100;
        }
        (self.processed * 100 / self.expected) as u32
    }

    /// Account for `n` more bytes, reporting the percentage if it moved
    pub fn advance(&mut self, n: usize, progress: &mut dyn TransferProgress) {
        self.processed += n;
        let percent = self.percent();
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            progress.percent(self.op, percent);
        }
    }

    /// Record a difference
    pub fn record_mismatch(&mut self, mismatch: Mismatch, progress: &mut dyn TransferProgress) {
        log::debug!("mismatch at 0x{:04X}", mismatch.addr);
        progress.mismatch(&mismatch);
        self.mismatches.push(mismatch);
    }

    /// Whether every expected byte went through
    pub fn is_complete(&self) -> bool {
        self.processed == self.expected
    }

    /// Close the session
    pub fn finish(&self, progress: &mut dyn TransferProgress) {
        log::info!("{}: {} of {} bytes", self.op, self.processed, self.expected);
        progress.finish(self.op, self.processed);
    }
}
