//! Decoded state and the publish sink seam.

use crate::error::{Error, Result};
use log::info;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Released,
    Pressed,
}

impl ButtonState {
    #[inline]
    pub fn from_asserted(asserted: bool) -> Self {
        if asserted {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

/// The logical value a control publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodedState {
    Button(ButtonState),
    Position(u32),
}

/// One state change handed to a [`StateSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateUpdate {
    /// Control name from the configuration.
    pub control: String,
    pub form_factor: String,
    pub object_path: String,
    pub state: DecodedState,
}

/// Receives every confirmed state change, plus one initial value per control.
pub trait StateSink {
    fn publish_state(&mut self, update: &StateUpdate) -> Result<()>;
}

/// Sink that only logs updates.
#[derive(Debug, Default)]
pub struct LogSink;

impl StateSink for LogSink {
    fn publish_state(&mut self, update: &StateUpdate) -> Result<()> {
        info!(
            "{} {} ({}): {:?}",
            update.form_factor, update.control, update.object_path, update.state
        );
        Ok(())
    }
}

/// Sink writing one JSON object per update to `W`.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StateSink for JsonLinesSink<W> {
    fn publish_state(&mut self, update: &StateUpdate) -> Result<()> {
        let line = serde_json::to_string(update)?;
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(|e| Error::Publish(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines_shape() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish_state(&StateUpdate {
            control: "HOST_SELECTOR".into(),
            form_factor: "HOST_SELECTOR".into(),
            object_path: "/xyz/openbmc_project/Chassis/Buttons/HostSelector".into(),
            state: DecodedState::Position(3),
        })
        .unwrap();
        sink.publish_state(&StateUpdate {
            control: "ID_BTN".into(),
            form_factor: "ID_BTN".into(),
            object_path: "/xyz/openbmc_project/Chassis/Buttons/ID0".into(),
            state: DecodedState::Button(ButtonState::Pressed),
        })
        .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["state"]["position"], 3);
        assert_eq!(lines[1]["state"]["button"], "pressed");
        assert_eq!(lines[1]["object_path"], "/xyz/openbmc_project/Chassis/Buttons/ID0");
    }
}
