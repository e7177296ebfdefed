//! Per-form-factor state machines.
//!
//! GPIO-driven controls are collected in the [`Control`] enum, which is what
//! the factory builds and the reactor dispatches to. The power button is
//! driven by inbound notifications instead and lives on its own in
//! [`power`].

pub mod button;
pub mod host_selector;
pub mod power;

pub use button::{ButtonKind, MomentaryButton};
pub use host_selector::HostSelector;
pub use power::{ButtonSignal, PowerButtonHandler, PowerButtonObserver};

use crate::config::ButtonConfig;
use crate::debounce::{DebouncePolicy, FilterOutcome};
use crate::decode::LineGroup;
use crate::error::{acquisition_error, Result};
use crate::gpio::LineSource;
use crate::reactor::{LineHandler, Timers};
use crate::sink::{DecodedState, StateSink, StateUpdate};
use log::{error, info};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared collaborators handed to every control constructor.
#[derive(Clone)]
pub struct Env {
    pub lines: Rc<RefCell<dyn LineSource>>,
    pub sink: Rc<RefCell<dyn StateSink>>,
    pub debounce: DebouncePolicy,
}

impl Env {
    pub fn new(
        lines: Rc<RefCell<dyn LineSource>>,
        sink: Rc<RefCell<dyn StateSink>>,
        debounce: DebouncePolicy,
    ) -> Self {
        Self {
            lines,
            sink,
            debounce,
        }
    }
}

/// A GPIO-driven control built by the factory.
pub enum Control {
    HostSelector(HostSelector),
    Button(MomentaryButton),
}

impl Control {
    pub fn name(&self) -> &str {
        match self {
            Control::HostSelector(c) => c.name(),
            Control::Button(c) => c.name(),
        }
    }

    pub fn form_factor(&self) -> &str {
        match self {
            Control::HostSelector(c) => c.form_factor(),
            Control::Button(c) => c.form_factor(),
        }
    }

    /// Lines owned by this control, in group order.
    pub fn lines(&self) -> Vec<u32> {
        match self {
            Control::HostSelector(c) => c.lines(),
            Control::Button(c) => c.lines(),
        }
    }

    /// Current decoded value; `None` for a host selector in the invalid
    /// position.
    pub fn state(&self) -> Option<DecodedState> {
        match self {
            Control::HostSelector(c) => c.position().map(DecodedState::Position),
            Control::Button(c) => Some(DecodedState::Button(c.state())),
        }
    }

    pub fn as_host_selector(&self) -> Option<&HostSelector> {
        match self {
            Control::HostSelector(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_button_mut(&mut self) -> Option<&mut MomentaryButton> {
        match self {
            Control::Button(c) => Some(c),
            _ => None,
        }
    }
}

impl LineHandler for Control {
    fn on_readable(&mut self, line: u32, timers: &mut Timers) {
        match self {
            Control::HostSelector(c) => c.handle_edge(line, timers),
            Control::Button(c) => c.handle_edge(line, timers),
        }
    }

    fn on_timer(&mut self, line: u32, token: u64, timers: &mut Timers) {
        match self {
            Control::HostSelector(c) => c.handle_settle(line, token, timers),
            Control::Button(c) => c.handle_settle(line, token, timers),
        }
    }
}

/// Publishes updates for one control and logs sink failures.
pub(crate) struct Publisher {
    control: String,
    form_factor: String,
    object_path: String,
    sink: Rc<RefCell<dyn StateSink>>,
}

impl Publisher {
    pub(crate) fn new(config: &ButtonConfig, object_path: &str, env: &Env) -> Self {
        Self {
            control: config.name.clone(),
            form_factor: config.form_factor.clone(),
            object_path: object_path.to_string(),
            sink: env.sink.clone(),
        }
    }

    pub(crate) fn control(&self) -> &str {
        &self.control
    }

    pub(crate) fn form_factor(&self) -> &str {
        &self.form_factor
    }

    pub(crate) fn publish(&self, state: DecodedState) {
        let update = StateUpdate {
            control: self.control.clone(),
            form_factor: self.form_factor.clone(),
            object_path: self.object_path.clone(),
            state,
        };
        info!("{}: publishing {:?}", self.form_factor, state);
        if let Err(e) = self.sink.borrow_mut().publish_state(&update) {
            error!("{}: {}", self.form_factor, e);
        }
    }
}

/// Samples the group once at construction; a read failure here means the
/// line is unusable, so it is reported as an acquisition error.
pub(crate) fn initial_raw_index(group: &LineGroup, form_factor: &str) -> Result<u32> {
    group.raw_index().map_err(|e| {
        let line = group.line_numbers().next().unwrap_or_default();
        acquisition_error(form_factor, line, format!("initial read failed: {}", e))
    })
}

/// Applies a filter outcome: returns the raw index to commit, or arms the
/// settle timer on `line`.
pub(crate) fn apply_outcome(outcome: FilterOutcome, line: u32, timers: &mut Timers) -> Option<u32> {
    match outcome {
        FilterOutcome::Commit(raw) => Some(raw),
        FilterOutcome::Unchanged => None,
        FilterOutcome::Rearm { delay, token } => {
            timers.schedule(line, delay, token);
            None
        }
    }
}
