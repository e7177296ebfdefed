//! # chassis-buttons
//!
//! Decodes chassis controls wired to GPIO lines on a management controller
//! (identify button, debug host selector button, multi-position host
//! selector switch) and republishes them as semantic state.
//!
//! ## Features
//!
//! *   Group GPIO decoding: several lines jointly encode one raw index, in the
//!     bit order declared by the configuration (`decode`, `LineGroup`).
//! *   One process-wide debounce policy (`DebouncePolicy`):
//!     *   `EdgeCompare`: commit whenever a fresh sample differs from the last
//!         committed value.
//!     *   `Settle`: commit only when a deferred re-sample confirms the value.
//! *   Position mapping from raw index to host id through a configured table,
//!     bounded by `max_position` (`PositionMapper`).
//! *   Form factor registry building controls by name (`Registry`), with
//!     unknown names tolerated and per-control failures isolated.
//! *   Single-threaded reactor dispatching line edges and deferred timers to
//!     controls (`Reactor`).
//! *   Initial state is sampled and published at construction, before any edge.
//! *   Simulated press/release injection for momentary buttons.
//! *   Power button observer driven by external `Pressed`/`Released`
//!     notifications (`PowerButtonObserver`).
//!
//! ## Collaborators
//!
//! GPIO access and state publication are behind two traits:
//!
//! *   [`LineSource`] claims lines, reads levels and reports edges. The crate
//!     ships [`MemoryLineSource`] (tests, dry runs) and
//!     [`sysfs::SysfsLineSource`] (scans `/sys/class/gpio/gpioN/value`).
//! *   [`StateSink`] receives every confirmed change. The crate ships
//!     [`LogSink`] and [`JsonLinesSink`].
//!
//! ## Basic Usage
//!
//! ```no_run
//! use chassis_buttons::{
//!     ButtonService, DebouncePolicy, Env, GpioDefinitions, LineSource, LogSink, Reactor,
//!     Registry, Result, StateSink,
//! };
//! use chassis_buttons::sysfs::SysfsLineSource;
//! use std::{cell::RefCell, rc::Rc, time::Duration};
//!
//! fn main() -> Result<()> {
//!     let defs = GpioDefinitions::load("/etc/default/obmc/gpio/gpio_defs.json")?;
//!
//!     let lines: Rc<RefCell<dyn LineSource>> = Rc::new(RefCell::new(SysfsLineSource::new(
//!         "/sys/class/gpio",
//!         Duration::from_millis(20),
//!     )));
//!     let sink: Rc<RefCell<dyn StateSink>> = Rc::new(RefCell::new(LogSink));
//!     let env = Env::new(lines.clone(), sink, DebouncePolicy::EdgeCompare);
//!
//!     let registry = Registry::with_builtin();
//!     let mut service =
//!         ButtonService::build(&registry, &env, defs.button_configs(0), Reactor::new(lines))?;
//!     service.run()
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`config`] for the layout of the GPIO definitions file. Pins are kernel
//! line numbers or ASPEED-style names (`"A0"`, `"Q6"`, `"AA4"`).
//!
//! ## Host selector keys
//!
//! `host_selector_map` keys are, by default, the raw index in binary,
//! zero-padded to the number of lines, most significant bit first. With three
//! lines reading `[low, high, low]` in configured order the raw index is `2`
//! and the key is `"010"`. Set `"key_format": "decimal"` to use `"2"` instead.

pub mod config;
pub mod consts;
pub mod controls;
pub mod debounce;
pub mod decode;
mod error;
pub mod factory;
pub mod gpio;
pub mod position;
pub mod reactor;
pub mod service;
pub mod sink;
pub mod sysfs;

pub use config::{ButtonConfig, GpioDefinitions, PinSpec};
pub use controls::{
    ButtonKind, ButtonSignal, Control, Env, HostSelector, MomentaryButton, PowerButtonHandler,
    PowerButtonObserver,
};
pub use debounce::{DebounceFilter, DebouncePolicy, FilterOutcome};
pub use decode::{decode, LineGroup};
pub use error::{Error, Result};
pub use factory::{Builder, Registry};
pub use gpio::{
    GpioDirection, GpioLevel, GpioLineConfig, GpioPolarity, LineSource, MemoryLineSource,
};
pub use position::{KeyFormat, PositionMap, PositionMapper};
pub use reactor::{LineHandler, Reactor, StopHandle, Timers};
pub use service::{ButtonService, RuntimeSettings};
pub use sink::{ButtonState, DecodedState, JsonLinesSink, LogSink, StateSink, StateUpdate};
