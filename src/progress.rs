//! Progress bars for whole-chip transfers

use eeprog_serial::{Mismatch, Operation, TransferProgress};
use indicatif::{ProgressBar, ProgressStyle};

fn bar_style() -> Result<ProgressStyle, indicatif::style::TemplateError> {
    Ok(ProgressStyle::default_bar()
        .template("{msg:>12} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
        .progress_chars("#>-"))
}

/// Renders transfer progress as an indicatif bar
///
/// The engine reports percentages, so the bar length is the byte count and
/// the position is derived from the percentage.
#[derive(Default)]
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
    total: u64,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferProgress for IndicatifProgress {
    fn start(&mut self, op: Operation, total: usize) {
        self.total = total as u64;

        let pb = ProgressBar::new(self.total);
        pb.set_style(bar_style().unwrap_or_else(|_| ProgressStyle::default_bar()));
        pb.set_message(op.to_string());
        self.bar = Some(pb);
    }

    fn percent(&mut self, _op: Operation, percent: u32) {
        if let Some(pb) = &self.bar {
            pb.set_position(self.total * percent as u64 / 100);
        }
    }

    fn mismatch(&mut self, mismatch: &Mismatch) {
        if let Some(pb) = &self.bar {
            pb.println(mismatch.to_string());
        } else {
            println!("{}", mismatch);
        }
    }

    fn finish(&mut self, _op: Operation, processed: usize) {
        if let Some(pb) = self.bar.take() {
            pb.set_position(processed as u64);
            pb.finish_and_clear();
        }
    }
}
