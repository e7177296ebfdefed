//! GPIO line descriptors and the line source seam.

use crate::consts::DEFAULT_POLL_INTERVAL_MS;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::time::Duration;

const IDLE_WAIT: Duration = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpioDirection {
    #[serde(alias = "in", alias = "input", alias = "both", alias = "rising", alias = "falling")]
    Input,
    #[serde(alias = "out", alias = "output")]
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioLevel {
    Low,
    High,
}

impl GpioLevel {
    #[inline]
    pub fn is_high(self) -> bool {
        self == GpioLevel::High
    }
}

impl From<bool> for GpioLevel {
    fn from(high: bool) -> Self {
        if high {
            GpioLevel::High
        } else {
            GpioLevel::Low
        }
    }
}

/// Which physical level counts as an asserted bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpioPolarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl GpioPolarity {
    /// Converts a physical level into the logical bit fed to the decoder.
    #[inline]
    pub fn asserted(self, level: GpioLevel) -> bool {
        match self {
            GpioPolarity::ActiveHigh => level.is_high(),
            GpioPolarity::ActiveLow => !level.is_high(),
        }
    }
}

/// One GPIO line of a control.
///
/// `group_index` is the bit this line contributes to the raw index. It comes
/// from the declared order in the configuration, never from the pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioLineConfig {
    pub line: u32,
    pub direction: GpioDirection,
    pub group_index: u8,
    pub polarity: GpioPolarity,
}

/// The primitive that hands out GPIO lines and reports edges on them.
///
/// A line number plays the role of a file descriptor: it is the key the
/// reactor dispatches on. Implementations report readiness through
/// [`LineSource::wait`], which returns the lines that saw an edge.
pub trait LineSource {
    /// Claims `line` for edge monitoring. Fails if the line is busy, missing
    /// or not accessible.
    fn request(&mut self, line: u32, direction: GpioDirection) -> io::Result<()>;

    /// Reads the current physical level of a claimed line.
    fn read(&mut self, line: u32) -> io::Result<GpioLevel>;

    /// Gives a claimed line back. Releasing an unknown line is a no-op.
    fn release(&mut self, line: u32);

    /// Blocks up to `timeout` (forever if `None`) and returns the claimed
    /// lines that saw an edge since the last call.
    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<u32>>;
}

/// In-memory line source.
///
/// Levels are set by the caller; every level change on a claimed line queues
/// an edge that the next [`LineSource::wait`] reports. Useful for tests and
/// dry runs without hardware.
#[derive(Debug, Default)]
pub struct MemoryLineSource {
    levels: HashMap<u32, GpioLevel>,
    claimed: HashSet<u32>,
    unavailable: HashSet<u32>,
    pending: VecDeque<u32>,
    reads: HashMap<u32, usize>,
}

impl MemoryLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level of `line`, queueing an edge if it changed on a claimed line.
    pub fn set_level(&mut self, line: u32, level: GpioLevel) {
        let previous = self.levels.insert(line, level);
        if previous != Some(level) && self.claimed.contains(&line) {
            trace!("Memory line {} -> {:?}, queueing edge", line, level);
            self.pending.push_back(line);
        }
    }

    /// Sets the level of `line` without queueing an edge.
    pub fn set_level_quiet(&mut self, line: u32, level: GpioLevel) {
        self.levels.insert(line, level);
    }

    /// Queues an edge on `line` without changing its level (a glitch that
    /// already resolved by the time anyone reads it).
    pub fn inject_edge(&mut self, line: u32) {
        if self.claimed.contains(&line) {
            self.pending.push_back(line);
        }
    }

    /// Makes future requests for `line` fail as if another consumer held it.
    pub fn mark_busy(&mut self, line: u32) {
        self.unavailable.insert(line);
    }

    pub fn is_claimed(&self, line: u32) -> bool {
        self.claimed.contains(&line)
    }

    /// Number of reads performed on `line` so far.
    pub fn read_count(&self, line: u32) -> usize {
        self.reads.get(&line).copied().unwrap_or(0)
    }
}

impl LineSource for MemoryLineSource {
    fn request(&mut self, line: u32, direction: GpioDirection) -> io::Result<()> {
        if self.unavailable.contains(&line) {
            return Err(io::Error::new(
                io::ErrorKind::ResourceBusy,
                format!("line {} is held by another consumer", line),
            ));
        }
        if !self.claimed.insert(line) {
            return Err(io::Error::new(
                io::ErrorKind::ResourceBusy,
                format!("line {} is already claimed", line),
            ));
        }
        debug!("Claimed memory line {} as {:?}", line, direction);
        Ok(())
    }

    fn read(&mut self, line: u32) -> io::Result<GpioLevel> {
        if !self.claimed.contains(&line) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("line {} is not claimed", line),
            ));
        }
        *self.reads.entry(line).or_insert(0) += 1;
        Ok(self.levels.get(&line).copied().unwrap_or(GpioLevel::Low))
    }

    fn release(&mut self, line: u32) {
        if self.claimed.remove(&line) {
            self.pending.retain(|&l| l != line);
            debug!("Released memory line {}", line);
        }
    }

    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<u32>> {
        if self.pending.is_empty() {
            // Nothing can change while we block: an unbounded wait idles one
            // scan interval
            std::thread::sleep(timeout.unwrap_or(IDLE_WAIT));
            return Ok(Vec::new());
        }
        let mut ready = Vec::with_capacity(self.pending.len());
        while let Some(line) = self.pending.pop_front() {
            if !ready.contains(&line) {
                ready.push(line);
            }
        }
        Ok(ready)
    }
}
