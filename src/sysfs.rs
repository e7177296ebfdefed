//! Line source backed by the sysfs GPIO class directory.
//!
//! Lines are exported and configured through `<root>/export`,
//! `<root>/gpioN/direction` and `<root>/gpioN/edge`, then observed by scanning
//! `<root>/gpioN/value` at a fixed interval. A changed value is reported as an
//! edge on that line.
//!
//! Only levels seen by a scan are reported: a pulse that starts and ends
//! between two scans (shorter than the poll interval) is never seen, even
//! though `edge` is set to `both`. Lower the interval for short presses.

use crate::gpio::{GpioDirection, GpioLevel, LineSource};
use log::{debug, trace, warn};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

struct SysfsLine {
    value: File,
    last: GpioLevel,
}

/// [`LineSource`] reading `/sys/class/gpio` value files.
pub struct SysfsLineSource {
    root: PathBuf,
    poll_interval: Duration,
    lines: BTreeMap<u32, SysfsLine>,
}

impl SysfsLineSource {
    pub fn new(root: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            root: root.into(),
            poll_interval,
            lines: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{}", line))
    }

    fn export(&self, line: u32) -> io::Result<()> {
        let dir = self.line_dir(line);
        if dir.exists() {
            return Ok(());
        }
        debug!("Exporting GPIO line {}", line);
        write_attr(&self.root.join("export"), &line.to_string())?;
        if dir.exists() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} did not appear after export", dir.display()),
            ))
        }
    }

    fn scan(&mut self) -> io::Result<Vec<u32>> {
        let mut changed = Vec::new();
        for (&line, state) in self.lines.iter_mut() {
            let level = read_level(&mut state.value)?;
            if level != state.last {
                trace!("sysfs line {}: {:?} -> {:?}", line, state.last, level);
                state.last = level;
                changed.push(line);
            }
        }
        Ok(changed)
    }
}

impl LineSource for SysfsLineSource {
    fn request(&mut self, line: u32, direction: GpioDirection) -> io::Result<()> {
        if self.lines.contains_key(&line) {
            return Err(io::Error::new(
                io::ErrorKind::ResourceBusy,
                format!("line {} is already claimed", line),
            ));
        }
        self.export(line)?;
        let dir = self.line_dir(line);

        let direction_attr = dir.join("direction");
        if direction_attr.exists() {
            let wanted = match direction {
                GpioDirection::Input => "in",
                GpioDirection::Output => "out",
            };
            write_attr(&direction_attr, wanted)?;
        }

        let edge_attr = dir.join("edge");
        if edge_attr.exists() {
            if let Err(e) = write_attr(&edge_attr, "both") {
                // Value scanning still works without kernel edge support
                warn!("Cannot enable edge detection on line {}: {}", line, e);
            }
        }

        let mut value = File::open(dir.join("value"))?;
        let last = read_level(&mut value)?;
        debug!("Claimed sysfs line {} (initial {:?})", line, last);
        self.lines.insert(line, SysfsLine { value, last });
        Ok(())
    }

    fn read(&mut self, line: u32) -> io::Result<GpioLevel> {
        let state = self.lines.get_mut(&line).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("line {} is not claimed", line),
            )
        })?;
        read_level(&mut state.value)
    }

    fn release(&mut self, line: u32) {
        if self.lines.remove(&line).is_some() {
            debug!("Released sysfs line {}", line);
        }
    }

    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<u32>> {
        let start = Instant::now();
        loop {
            let changed = self.scan()?;
            if !changed.is_empty() {
                return Ok(changed);
            }
            let nap = match timeout {
                Some(timeout) => {
                    let elapsed = start.elapsed();
                    if elapsed >= timeout {
                        return Ok(changed);
                    }
                    self.poll_interval.min(timeout - elapsed)
                }
                None => self.poll_interval,
            };
            std::thread::sleep(nap);
        }
    }
}

fn write_attr(path: &Path, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.write_all(value.as_bytes())
}

fn read_level(file: &mut File) -> io::Result<GpioLevel> {
    let mut buf = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut buf)?;
    match buf.trim() {
        "0" => Ok(GpioLevel::Low),
        "1" => Ok(GpioLevel::High),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected GPIO value {:?}", other),
        )),
    }
}

/// Reads the base line number of the first gpiochip under `root`, if any.
pub fn first_chip_base(root: &Path) -> io::Result<Option<u32>> {
    let mut bases = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("gpiochip") {
            continue;
        }
        let raw = fs::read_to_string(entry.path().join("base"))?;
        if let Ok(base) = raw.trim().parse::<u32>() {
            bases.push(base);
        }
    }
    Ok(bases.into_iter().min())
}
