//! GPIO definitions file loading.
//!
//! The file holds a `gpio_definitions` array with one object per control:
//!
//! ```json
//! {
//!   "gpio_base": 0,
//!   "gpio_definitions": [
//!     { "name": "ID_BTN", "pin": "Q6", "direction": "both", "polarity": "active_low" },
//!     {
//!       "name": "HOST_SELECTOR",
//!       "group_gpio_config": [
//!         { "pin": "AA4", "direction": "in" },
//!         { "pin": "AA5", "direction": "in" },
//!         { "pin": "AA6", "direction": "in" }
//!       ],
//!       "host_selector_map": { "000": 0, "001": 1, "010": 2, "011": 3 },
//!       "max_position": 4
//!     }
//!   ]
//! }
//! ```
//!
//! An unreadable or unparsable file is fatal. A malformed entry only fails
//! that entry.

use crate::consts::PINS_PER_BANK;
use crate::error::{config_error, Result};
use crate::gpio::{GpioDirection, GpioLineConfig, GpioPolarity};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A pin given either as a kernel line number or as an ASPEED-style name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PinSpec {
    Number(u32),
    Name(String),
}

impl PinSpec {
    /// Resolves the pin to a kernel line number. Names are offset by `base`,
    /// numbers are taken as-is.
    pub fn resolve(&self, base: u32) -> Option<u32> {
        match self {
            PinSpec::Number(line) => Some(*line),
            PinSpec::Name(name) => pin_offset(name).and_then(|offset| base.checked_add(offset)),
        }
    }
}

/// Offset of an ASPEED-style pin name: bank letters in bijective base 26
/// (`A`..`Z`, `AA`..) followed by a bit `0`-`7`. `"B3"` is 11, `"AA4"` is 212.
pub fn pin_offset(name: &str) -> Option<u32> {
    let name = name.trim();
    let split = name.find(|c: char| !c.is_ascii_uppercase())?;
    let (letters, digits) = name.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let bit: u32 = digits.parse().ok()?;
    if bit >= PINS_PER_BANK {
        return None;
    }
    let mut bank: u32 = 0;
    for c in letters.chars() {
        bank = bank.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    (bank - 1).checked_mul(PINS_PER_BANK)?.checked_add(bit)
}

/// Parsed descriptor of one control.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonConfig {
    pub name: String,
    pub form_factor: String,
    pub gpios: Vec<GpioLineConfig>,
    /// The whole entry object; form factors read their own parameters from it.
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawLine {
    pin: PinSpec,
    direction: GpioDirection,
    #[serde(default)]
    polarity: GpioPolarity,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    #[serde(default)]
    form_factor: Option<String>,
    #[serde(default)]
    pin: Option<PinSpec>,
    #[serde(default)]
    direction: Option<GpioDirection>,
    #[serde(default)]
    polarity: GpioPolarity,
    #[serde(default)]
    group_gpio_config: Option<Vec<RawLine>>,
}

/// Contents of the GPIO definitions file.
#[derive(Debug, Clone, Deserialize)]
pub struct GpioDefinitions {
    #[serde(default)]
    pub gpio_base: Option<u32>,
    pub gpio_definitions: Vec<serde_json::Value>,
}

impl GpioDefinitions {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading GPIO definitions from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn len(&self) -> usize {
        self.gpio_definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gpio_definitions.is_empty()
    }

    /// Converts every entry, resolving pin names against the file's
    /// `gpio_base` or, when absent, `fallback_base`.
    pub fn button_configs(&self, fallback_base: u32) -> Vec<Result<ButtonConfig>> {
        let base = self.gpio_base.unwrap_or(fallback_base);
        self.gpio_definitions
            .iter()
            .map(|entry| button_config(entry, base))
            .collect()
    }
}

fn entry_label(entry: &serde_json::Value) -> String {
    entry
        .get("form_factor")
        .or_else(|| entry.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("<unnamed>")
        .to_string()
}

/// Converts one `gpio_definitions` entry.
pub fn button_config(entry: &serde_json::Value, base: u32) -> Result<ButtonConfig> {
    let label = entry_label(entry);
    let raw: RawEntry =
        serde_json::from_value(entry.clone()).map_err(|e| config_error(&label, e.to_string()))?;
    let form_factor = raw.form_factor.clone().unwrap_or_else(|| raw.name.clone());

    let lines: Vec<RawLine> = match (raw.group_gpio_config, raw.pin) {
        (Some(group), _) => group,
        (None, Some(pin)) => {
            let direction = raw
                .direction
                .ok_or_else(|| config_error(&form_factor, "missing field `direction`"))?;
            vec![RawLine {
                pin,
                direction,
                polarity: raw.polarity,
            }]
        }
        (None, None) => {
            return Err(config_error(
                &form_factor,
                "entry needs either `pin` or `group_gpio_config`",
            ))
        }
    };

    let mut gpios = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        let number = line
            .pin
            .resolve(base)
            .ok_or_else(|| config_error(&form_factor, format!("invalid pin {:?}", line.pin)))?;
        let group_index = u8::try_from(index)
            .map_err(|_| config_error(&form_factor, "too many lines in group"))?;
        gpios.push(GpioLineConfig {
            line: number,
            direction: line.direction,
            group_index,
            polarity: line.polarity,
        });
    }

    Ok(ButtonConfig {
        name: raw.name,
        form_factor,
        gpios,
        params: entry.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_pin_offsets() {
        assert_eq!(pin_offset("A0"), Some(0));
        assert_eq!(pin_offset("B3"), Some(11));
        assert_eq!(pin_offset("Z7"), Some(207));
        assert_eq!(pin_offset("AA4"), Some(212));
        assert_eq!(pin_offset("A8"), None);
        assert_eq!(pin_offset("a1"), None);
        assert_eq!(pin_offset("7"), None);
        assert_eq!(pin_offset("AB"), None);
    }

    #[test]
    fn test_pin_spec_resolve() {
        assert_eq!(PinSpec::Number(17).resolve(280), Some(17));
        assert_eq!(PinSpec::Name("B3".into()).resolve(280), Some(291));
    }

    #[test]
    fn test_single_pin_entry() {
        let cfg = button_config(
            &json!({ "name": "ID_BTN", "pin": 5, "direction": "both", "polarity": "active_low" }),
            0,
        )
        .unwrap();
        assert_eq!(cfg.form_factor, "ID_BTN");
        assert_eq!(cfg.gpios.len(), 1);
        assert_eq!(cfg.gpios[0].line, 5);
        assert_eq!(cfg.gpios[0].direction, GpioDirection::Input);
        assert_eq!(cfg.gpios[0].polarity, GpioPolarity::ActiveLow);
    }

    #[test]
    fn test_group_entry_keeps_declared_order() {
        let cfg = button_config(
            &json!({
                "name": "HOST_SELECTOR",
                "group_gpio_config": [
                    { "pin": 40, "direction": "in" },
                    { "pin": 12, "direction": "in" },
                    { "pin": 33, "direction": "in" }
                ],
                "host_selector_map": { "000": 0 },
                "max_position": 4
            }),
            0,
        )
        .unwrap();
        let lines: Vec<(u32, u8)> = cfg.gpios.iter().map(|g| (g.line, g.group_index)).collect();
        assert_eq!(lines, vec![(40, 0), (12, 1), (33, 2)]);
        assert_eq!(cfg.params["max_position"], 4);
    }

    #[test]
    fn test_form_factor_overrides_name() {
        let cfg = button_config(
            &json!({ "name": "front_panel_id", "form_factor": "ID_BTN", "pin": 1, "direction": "in" }),
            0,
        )
        .unwrap();
        assert_eq!(cfg.name, "front_panel_id");
        assert_eq!(cfg.form_factor, "ID_BTN");
    }

    #[test]
    fn test_bad_entries_are_config_errors() {
        let missing_pin = button_config(&json!({ "name": "ID_BTN", "direction": "in" }), 0);
        assert!(matches!(missing_pin, Err(Error::Config { ref form_factor, .. }) if form_factor == "ID_BTN"));

        let missing_direction = button_config(&json!({ "name": "ID_BTN", "pin": 3 }), 0);
        assert!(matches!(missing_direction, Err(Error::Config { .. })));

        let bad_pin = button_config(&json!({ "name": "ID_BTN", "pin": "A9", "direction": "in" }), 0);
        assert!(matches!(bad_pin, Err(Error::Config { .. })));

        let no_name = button_config(&json!({ "pin": 3, "direction": "in" }), 0);
        assert!(matches!(no_name, Err(Error::Config { ref form_factor, .. }) if form_factor == "<unnamed>"));
    }

    #[test]
    fn test_file_level_errors_are_fatal() {
        let err = GpioDefinitions::parse("{ not json").unwrap_err();
        assert!(err.is_fatal());
        let err = GpioDefinitions::parse(r#"{ "something_else": [] }"#).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_gpio_base_precedence() {
        let defs = GpioDefinitions::parse(
            r#"{ "gpio_base": 100, "gpio_definitions": [ { "name": "ID_BTN", "pin": "A1", "direction": "in" } ] }"#,
        )
        .unwrap();
        let configs = defs.button_configs(280);
        assert_eq!(configs[0].as_ref().unwrap().gpios[0].line, 101);
    }
}
