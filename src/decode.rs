//! Group decode engine: turns the levels of correlated lines into a raw index.

use crate::consts::MAX_GROUP_LINES;
use crate::error::{acquisition_error, config_error, Error, Result};
use crate::gpio::{GpioDirection, GpioLineConfig, LineSource};
use log::{debug, trace, warn};
use std::cell::RefCell;
use std::rc::Rc;

/// Composes asserted line levels into a raw index.
///
/// Bit `i` of the result is `levels[i]`, so the first configured line is the
/// least significant bit. `[false, true, false]` decodes to `2`.
/// Only the first 32 levels are considered.
pub fn decode(levels: &[bool]) -> u32 {
    levels
        .iter()
        .take(MAX_GROUP_LINES)
        .enumerate()
        .fold(0u32, |acc, (bit, &on)| if on { acc | (1u32 << bit) } else { acc })
}

/// The acquired lines of one control, ordered by their group index.
///
/// Dropping the group releases every line back to the source.
pub struct LineGroup {
    form_factor: String,
    lines: Vec<GpioLineConfig>,
    source: Rc<RefCell<dyn LineSource>>,
}

impl LineGroup {
    /// Claims every line in `configs`.
    ///
    /// Fails with a `Config` error for an empty or oversized group, an output
    /// line or duplicated group indices, and with `HardwareAcquisition` when a
    /// line cannot be claimed. Lines claimed before a failure are released.
    pub fn acquire(
        form_factor: &str,
        configs: &[GpioLineConfig],
        source: Rc<RefCell<dyn LineSource>>,
    ) -> Result<Self> {
        if configs.is_empty() {
            return Err(config_error(form_factor, "control has no GPIO lines"));
        }
        if configs.len() > MAX_GROUP_LINES {
            return Err(config_error(
                form_factor,
                format!(
                    "group has {} lines, at most {} are supported",
                    configs.len(),
                    MAX_GROUP_LINES
                ),
            ));
        }
        let mut lines = configs.to_vec();
        lines.sort_by_key(|c| c.group_index);
        for (expected, cfg) in lines.iter().enumerate() {
            if usize::from(cfg.group_index) != expected {
                return Err(config_error(
                    form_factor,
                    format!(
                        "group indices must be 0..{} without gaps, found {}",
                        lines.len(),
                        cfg.group_index
                    ),
                ));
            }
            if cfg.direction != GpioDirection::Input {
                return Err(config_error(
                    form_factor,
                    format!("line {} must be an input", cfg.line),
                ));
            }
        }

        let mut group = LineGroup {
            form_factor: form_factor.to_string(),
            lines: Vec::with_capacity(lines.len()),
            source,
        };
        for cfg in lines {
            let claimed = group.source.borrow_mut().request(cfg.line, cfg.direction);
            if let Err(e) = claimed {
                warn!("{}: failed to claim line {}: {}", form_factor, cfg.line, e);
                // `group` drops here and releases what was already claimed
                return Err(acquisition_error(form_factor, cfg.line, e.to_string()));
            }
            group.lines.push(cfg);
        }
        debug!(
            "{}: acquired lines {:?}",
            form_factor,
            group.line_numbers().collect::<Vec<_>>()
        );
        Ok(group)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, line: u32) -> bool {
        self.lines.iter().any(|c| c.line == line)
    }

    /// Kernel line numbers in group order.
    pub fn line_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().map(|c| c.line)
    }

    /// Reads every line in the group and returns the asserted bits in group
    /// order.
    pub fn sample(&self) -> Result<Vec<bool>> {
        let mut source = self.source.borrow_mut();
        let mut levels = Vec::with_capacity(self.lines.len());
        for cfg in &self.lines {
            let level = source.read(cfg.line).map_err(Error::Io)?;
            levels.push(cfg.polarity.asserted(level));
        }
        Ok(levels)
    }

    /// Samples the whole group and decodes it.
    pub fn raw_index(&self) -> Result<u32> {
        let levels = self.sample()?;
        let raw = decode(&levels);
        trace!("{}: levels {:?} -> raw {}", self.form_factor, levels, raw);
        Ok(raw)
    }
}

impl Drop for LineGroup {
    fn drop(&mut self) {
        match self.source.try_borrow_mut() {
            Ok(mut source) => {
                for cfg in &self.lines {
                    source.release(cfg.line);
                }
            }
            Err(_) => warn!(
                "{}: line source busy during teardown, lines not released",
                self.form_factor
            ),
        }
    }
}
