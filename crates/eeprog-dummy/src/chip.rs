//! Pin-level chip emulation

use eeprog_core::chip::{ChipType, Features, WriteStrobe, EPROM_PROGRAM_PULSE_US};
use eeprog_core::programmer::{DataDirection, ParallelBus};

/// Configuration for the simulated chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Chip sitting in the socket
    pub chip: ChipType,
    /// Internal write cycle of self-timed chips, in microseconds
    pub write_cycle_us: u64,
    /// Self-timed writes never finish
    pub stuck: bool,
    /// Software data protection active at power-up
    pub sdp_enabled: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            chip: ChipType::At28c256,
            write_cycle_us: 2500,
            stuck: false,
            sdp_enabled: false,
        }
    }
}

impl DummyConfig {
    /// Default configuration for a given chip
    pub fn for_chip(chip: ChipType) -> Self {
        Self {
            chip,
            ..Default::default()
        }
    }
}

/// Write cycle in progress on a self-timed chip
#[derive(Debug)]
struct WriteCycle {
    until_us: u64,
    last: u8,
    pending: Vec<(usize, u8)>,
}

/// Emulated chip in the programmer socket
pub struct SimulatedChip {
    config: DummyConfig,
    data: Vec<u8>,

    // socket lines, control lines in logical (active) form
    addr: u16,
    bus_out: u8,
    direction: DataDirection,
    ce: bool,
    oe: bool,
    we: bool,

    now_us: u64,
    strobe_start_us: u64,
    cycle: Option<WriteCycle>,
    sdp_enabled: bool,
    recent: Vec<(usize, u8)>,
    programmed: usize,
}

const SDP_ENABLE_SEQ: [(usize, u8); 3] = [(0x5555, 0xAA), (0x2AAA, 0x55), (0x5555, 0xA0)];
const SDP_DISABLE_SEQ: [(usize, u8); 6] = [
    (0x5555, 0xAA),
    (0x2AAA, 0x55),
    (0x5555, 0x80),
    (0x5555, 0xAA),
    (0x2AAA, 0x55),
    (0x5555, 0x20),
];

impl SimulatedChip {
    /// Create an erased chip
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.chip.total_bytes() as usize];
        let sdp_enabled = config.sdp_enabled;
        Self {
            config,
            data,
            addr: 0,
            bus_out: 0,
            direction: DataDirection::Input,
            ce: false,
            oe: false,
            we: false,
            now_us: 0,
            strobe_start_us: 0,
            cycle: None,
            sdp_enabled,
            recent: Vec::new(),
            programmed: 0,
        }
    }

    /// Create a chip with pre-filled contents
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut chip = Self::new(config);
        let len = core::cmp::min(initial_data.len(), chip.data.len());
        chip.data[..len].copy_from_slice(&initial_data[..len]);
        chip
    }

    /// Chip contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Virtual time elapsed through `delay_us`
    pub fn elapsed_us(&self) -> u64 {
        self.now_us
    }

    /// Number of bytes that were committed to the array
    pub fn programmed(&self) -> usize {
        self.programmed
    }

    /// Whether software data protection is active
    pub fn sdp_enabled(&self) -> bool {
        self.sdp_enabled
    }

    /// Make self-timed writes hang (or recover)
    pub fn set_stuck(&mut self, stuck: bool) {
        self.config.stuck = stuck;
    }

    fn features(&self) -> Features {
        self.config.chip.geometry().features
    }

    /// Address seen by the chip, following the socket wiring of each family
    fn chip_address(&self) -> usize {
        let a = self.addr as usize;
        let we_high = if self.we { 0 } else { 1 };
        match self.config.chip {
            ChipType::At28c64 | ChipType::E2764 => a & 0x1FFF,
            ChipType::At28c256 => a & 0x7FFF,
            ChipType::E27128 => a & 0x3FFF,
            ChipType::E27256 => (we_high << 14) | (a & 0x3FFF),
            ChipType::E27512 => (((a >> 14) & 1) << 15) | (we_high << 14) | (a & 0x3FFF),
        }
    }

    /// Socket A14 is the VPP pin of 28-pin EPROMs
    fn vpp_high(&self) -> bool {
        self.addr & 0x4000 != 0
    }

    fn mask(&self) -> usize {
        self.data.len() - 1
    }

    fn finish_cycle(&mut self) {
        if self.config.stuck {
            return;
        }
        let done = matches!(&self.cycle, Some(c) if self.now_us >= c.until_us);
        if !done {
            return;
        }
        if let Some(cycle) = self.cycle.take() {
            for (addr, value) in cycle.pending {
                self.data[addr] = value;
                self.programmed += 1;
            }
        }
    }

    fn match_sdp(&mut self) -> bool {
        let mask = self.mask();
        let tail_is = |seq: &[(usize, u8)], recent: &[(usize, u8)]| {
            recent.len() >= seq.len()
                && recent[recent.len() - seq.len()..]
                    .iter()
                    .zip(seq)
                    .all(|(&(a, d), &(sa, sd))| a == sa & mask && d == sd)
        };
        if tail_is(&SDP_DISABLE_SEQ, &self.recent) {
            log::debug!("simulated chip: SDP disabled");
            self.sdp_enabled = false;
            self.recent.clear();
            true
        } else if tail_is(&SDP_ENABLE_SEQ, &self.recent) {
            log::debug!("simulated chip: SDP enabled");
            self.sdp_enabled = true;
            self.recent.clear();
            true
        } else {
            false
        }
    }

    /// WE rising edge on a self-timed chip
    fn latch_eeprom(&mut self) {
        let addr = self.chip_address();
        let value = self.bus_out;

        self.recent.push((addr, value));
        if self.recent.len() > SDP_DISABLE_SEQ.len() {
            self.recent.remove(0);
        }
        if self.features().contains(Features::SDP) && self.match_sdp() {
            return;
        }
        if self.sdp_enabled {
            log::debug!("simulated chip: write to 0x{:04X} blocked by SDP", addr);
            return;
        }

        let until_us = self.now_us + self.config.write_cycle_us;
        let cycle = self.cycle.get_or_insert_with(|| WriteCycle {
            until_us,
            last: value,
            pending: Vec::new(),
        });
        cycle.until_us = until_us;
        cycle.last = value;
        cycle.pending.push((addr, value));
    }

    /// End of a program pulse on a UV EPROM
    fn program_eprom(&mut self) {
        let width = self.now_us - self.strobe_start_us;
        if width < EPROM_PROGRAM_PULSE_US as u64 || !self.vpp_high() {
            return;
        }
        let addr = self.chip_address();
        self.data[addr] &= self.bus_out;
        self.programmed += 1;
    }

    fn writing(&self) -> bool {
        self.ce && !self.oe && self.direction == DataDirection::Output
    }
}

impl ParallelBus for SimulatedChip {
    fn set_data_direction(&mut self, dir: DataDirection) {
        self.direction = dir;
    }

    fn set_address(&mut self, addr: u16) {
        self.addr = addr;
    }

    fn write_data(&mut self, value: u8) {
        self.bus_out = value;
    }

    fn read_data(&mut self) -> u8 {
        if self.direction != DataDirection::Input || !self.ce || !self.oe {
            return 0xFF;
        }
        if let Some(cycle) = &self.cycle {
            // data polling: D7 reads inverted until the cycle ends
            return (!cycle.last & 0x80) | (cycle.last & 0x7F);
        }
        self.data[self.chip_address()]
    }

    fn set_chip_enable(&mut self, active: bool) {
        let chip = self.config.chip;
        if active && !self.ce {
            self.strobe_start_us = self.now_us;
        }
        if !active && self.ce && chip.geometry().strobe == WriteStrobe::ChipEnable {
            // check before the line drops so the chip still sees CE asserted
            if self.writing() {
                self.program_eprom();
            }
        }
        self.ce = active;
    }

    fn set_output_enable(&mut self, active: bool) {
        self.oe = active;
    }

    fn set_write_enable(&mut self, active: bool) {
        let chip = self.config.chip;
        if chip.geometry().strobe == WriteStrobe::WriteEnable {
            if active && !self.we {
                self.strobe_start_us = self.now_us;
            }
            if !active && self.we && self.writing() {
                if self.features().contains(Features::SELF_TIMED) {
                    self.latch_eeprom();
                } else if self.features().contains(Features::PROGRAM_PULSE) {
                    self.program_eprom();
                }
            }
        }
        self.we = active;
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += us as u64;
        self.finish_cycle();
    }
}
