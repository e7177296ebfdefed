//! Position mapper: raw index → logical host/position id.

use crate::error::{config_error, Error, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How raw indices are spelled as keys in the position map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFormat {
    /// Binary, zero-padded to the group width, most significant bit first
    /// (`2` on a 3-line group is `"010"`).
    #[default]
    Binary,
    /// Plain decimal (`2` is `"2"`).
    Decimal,
}

impl KeyFormat {
    /// Renders the canonical key for `raw` on a group of `width` lines.
    pub fn key(self, raw: u32, width: usize) -> String {
        match self {
            KeyFormat::Binary => format!("{:0width$b}", raw, width = width),
            KeyFormat::Decimal => raw.to_string(),
        }
    }

    /// Name as written in the `key_format` field.
    pub fn name(self) -> &'static str {
        match self {
            KeyFormat::Binary => "binary",
            KeyFormat::Decimal => "decimal",
        }
    }

    fn other(self) -> Self {
        match self {
            KeyFormat::Binary => KeyFormat::Decimal,
            KeyFormat::Decimal => KeyFormat::Binary,
        }
    }

    /// Parses a configured key back into a raw index, rejecting keys that a
    /// group of `width` lines can never produce.
    pub fn parse(self, key: &str, width: usize) -> Option<u32> {
        let raw = match self {
            KeyFormat::Binary => {
                if key.len() != width || !key.chars().all(|c| c == '0' || c == '1') {
                    return None;
                }
                u32::from_str_radix(key, 2).ok()?
            }
            KeyFormat::Decimal => key.parse::<u32>().ok()?,
        };
        let representable = width >= 32 || raw < (1u32 << width);
        representable.then_some(raw)
    }
}

/// Immutable table from raw index to position id.
///
/// Keys are validated once at load; any raw index not present has no
/// mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMap {
    width: usize,
    format: KeyFormat,
    entries: HashMap<u32, u32>,
}

impl PositionMap {
    /// Builds the map from configured `key → position` pairs.
    pub fn from_keys(
        form_factor: &str,
        width: usize,
        format: KeyFormat,
        keys: &BTreeMap<String, u32>,
    ) -> Result<Self> {
        let mut entries = HashMap::with_capacity(keys.len());
        for (key, &position) in keys {
            let raw = format.parse(key, width).ok_or_else(|| {
                config_error(
                    form_factor,
                    format!(
                        "host_selector_map key {:?} is not a {} key for a {}-line group \
                         (set \"key_format\" to {:?} if the map uses {} keys)",
                        key,
                        format.name(),
                        width,
                        format.other().name(),
                        format.other().name()
                    ),
                )
            })?;
            if entries.insert(raw, position).is_some() {
                return Err(config_error(
                    form_factor,
                    format!("host_selector_map key {:?} duplicates raw index {}", key, raw),
                ));
            }
        }
        Ok(Self {
            width,
            format,
            entries,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical key for `raw` in this map's format.
    pub fn key_for(&self, raw: u32) -> String {
        self.format.key(raw, self.width)
    }

    pub fn get(&self, raw: u32) -> Option<u32> {
        self.entries.get(&raw).copied()
    }
}

/// Resolves raw indices to positions bounded by `max_position`.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    form_factor: String,
    map: PositionMap,
    max_position: u32,
}

impl PositionMapper {
    pub fn new(form_factor: &str, map: PositionMap, max_position: u32) -> Result<Self> {
        if max_position == 0 {
            return Err(config_error(form_factor, "max_position must be at least 1"));
        }
        Ok(Self {
            form_factor: form_factor.to_string(),
            map,
            max_position,
        })
    }

    pub fn max_position(&self) -> u32 {
        self.max_position
    }

    pub fn map(&self) -> &PositionMap {
        &self.map
    }

    /// Looks up `raw`, failing with `DecodeMapping` when the key is absent or
    /// the mapped position is `>= max_position`.
    pub fn resolve(&self, raw: u32) -> Result<u32> {
        match self.map.get(raw) {
            Some(position) if position < self.max_position => Ok(position),
            _ => Err(Error::DecodeMapping {
                form_factor: self.form_factor.clone(),
                raw,
            }),
        }
    }

    /// Like [`PositionMapper::resolve`], but logs the miss and returns `None`
    /// as the invalid position.
    pub fn map_to_position(&self, raw: u32) -> Option<u32> {
        match self.resolve(raw) {
            Ok(position) => Some(position),
            Err(e) => {
                warn!("{} (key {:?}, max {})", e, self.map.key_for(raw), self.max_position);
                None
            }
        }
    }
}
