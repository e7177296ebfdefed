//! Momentary single-line buttons (identify, debug host selector).

use super::{apply_outcome, initial_raw_index, Env, Publisher};
use crate::config::ButtonConfig;
use crate::consts;
use crate::debounce::DebounceFilter;
use crate::decode::LineGroup;
use crate::error::{config_error, Result};
use crate::reactor::Timers;
use crate::sink::{ButtonState, DecodedState};
use log::{debug, warn};

/// Which momentary button form factor an instance represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Id,
    DebugSelector,
}

impl ButtonKind {
    pub fn form_factor(self) -> &'static str {
        match self {
            ButtonKind::Id => consts::ID_BUTTON,
            ButtonKind::DebugSelector => consts::DEBUG_SELECTOR_BUTTON,
        }
    }

    pub fn object_path(self) -> &'static str {
        match self {
            ButtonKind::Id => consts::ID_BUTTON_PATH,
            ButtonKind::DebugSelector => consts::DEBUG_SELECTOR_PATH,
        }
    }
}

/// A `{Released, Pressed}` button on one line.
///
/// Real edges go through the same sample → debounce path as a host selector
/// with a one-line group: raw index `1` is pressed. Simulated presses skip
/// the hardware but publish exactly like a real transition.
pub struct MomentaryButton {
    kind: ButtonKind,
    group: LineGroup,
    filter: DebounceFilter,
    state: ButtonState,
    publisher: Publisher,
}

impl MomentaryButton {
    pub fn new(kind: ButtonKind, env: &Env, config: &ButtonConfig) -> Result<Self> {
        if config.gpios.len() != 1 {
            return Err(config_error(
                &config.form_factor,
                format!(
                    "a momentary button takes exactly one line, got {}",
                    config.gpios.len()
                ),
            ));
        }
        let group = LineGroup::acquire(&config.form_factor, &config.gpios, env.lines.clone())?;
        let raw = initial_raw_index(&group, &config.form_factor)?;
        let mut filter = DebounceFilter::new(env.debounce);
        filter.prime(raw);

        let button = Self {
            kind,
            group,
            filter,
            state: ButtonState::from_asserted(raw != 0),
            publisher: Publisher::new(config, kind.object_path(), env),
        };
        button.publisher.publish(DecodedState::Button(button.state));
        Ok(button)
    }

    pub fn kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.publisher.control()
    }

    pub fn form_factor(&self) -> &str {
        self.publisher.form_factor()
    }

    pub fn lines(&self) -> Vec<u32> {
        self.group.line_numbers().collect()
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn simulate_press(&mut self) {
        debug!("{}: simulated press", self.form_factor());
        self.inject(ButtonState::Pressed);
    }

    pub fn simulate_release(&mut self) {
        debug!("{}: simulated release", self.form_factor());
        self.inject(ButtonState::Released);
    }

    fn inject(&mut self, state: ButtonState) {
        self.filter.force(u32::from(state == ButtonState::Pressed));
        self.state = state;
        self.publisher.publish(DecodedState::Button(state));
    }

    fn commit(&mut self, raw: u32) {
        self.state = ButtonState::from_asserted(raw != 0);
        self.publisher.publish(DecodedState::Button(self.state));
    }

    pub(crate) fn handle_edge(&mut self, line: u32, timers: &mut Timers) {
        let raw = match self.group.raw_index() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: cannot sample line {}: {}", self.form_factor(), line, e);
                return;
            }
        };
        if let Some(raw) = apply_outcome(self.filter.on_sample(raw), line, timers) {
            self.commit(raw);
        }
    }

    pub(crate) fn handle_settle(&mut self, line: u32, token: u64, timers: &mut Timers) {
        let raw = match self.group.raw_index() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: cannot re-sample line {}: {}", self.form_factor(), line, e);
                return;
            }
        };
        if let Some(raw) = apply_outcome(self.filter.on_settle(token, raw), line, timers) {
            self.commit(raw);
        }
    }
}
