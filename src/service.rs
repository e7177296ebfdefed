//! Wiring of configured controls into the reactor.

use crate::config::ButtonConfig;
use crate::consts::DEFAULT_POLL_INTERVAL_MS;
use crate::controls::{Control, Env};
use crate::debounce::DebouncePolicy;
use crate::error::Result;
use crate::factory::Registry;
use crate::reactor::{LineHandler, Reactor};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Process-wide runtime knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub debounce: DebouncePolicy,
    /// Scan interval of polling line sources.
    pub poll_interval: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            debounce: DebouncePolicy::EdgeCompare,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Owns the reactor and every control attached to it.
pub struct ButtonService {
    reactor: Reactor,
    controls: Vec<Rc<RefCell<Control>>>,
}

impl ButtonService {
    pub fn new(reactor: Reactor) -> Self {
        Self {
            reactor,
            controls: Vec::new(),
        }
    }

    /// Builds and attaches a control for every usable descriptor.
    ///
    /// Malformed descriptors, unknown form factors and controls whose lines
    /// cannot be acquired are logged and skipped. Only fatal errors (the
    /// reactor refusing a registration) abort the build.
    pub fn build(
        registry: &Registry,
        env: &Env,
        configs: Vec<Result<ButtonConfig>>,
        reactor: Reactor,
    ) -> Result<Self> {
        let mut service = Self::new(reactor);
        for config in configs {
            let config = match config {
                Ok(config) => config,
                Err(e) => {
                    warn!("Skipping control: {}", e);
                    continue;
                }
            };
            match registry.create(&config.form_factor, env, &config) {
                Ok(Some(control)) => {
                    service.attach(control)?;
                }
                Ok(None) => {}
                Err(e) if !e.is_fatal() => {
                    warn!("Skipping control {}: {}", config.name, e);
                }
                Err(e) => return Err(e),
            }
        }
        info!("{} control(s) active", service.controls.len());
        Ok(service)
    }

    /// Registers every line of `control` with the reactor.
    pub fn attach(&mut self, control: Control) -> Result<Rc<RefCell<Control>>> {
        let lines = control.lines();
        let control = Rc::new(RefCell::new(control));
        for (i, &line) in lines.iter().enumerate() {
            let handler: Rc<RefCell<dyn LineHandler>> = control.clone();
            if let Err(e) = self.reactor.register(line, handler) {
                error!("{}: {}", control.borrow().form_factor(), e);
                for &registered in &lines[..i] {
                    self.reactor.deregister(registered);
                }
                return Err(e);
            }
        }
        self.controls.push(control.clone());
        Ok(control)
    }

    pub fn controls(&self) -> &[Rc<RefCell<Control>>] {
        &self.controls
    }

    pub fn find(&self, name: &str) -> Option<Rc<RefCell<Control>>> {
        self.controls
            .iter()
            .find(|c| c.borrow().name() == name)
            .cloned()
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn reactor_mut(&mut self) -> &mut Reactor {
        &mut self.reactor
    }

    /// Runs one reactor turn.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize> {
        self.reactor.turn(timeout)
    }

    /// Runs the reactor until it is stopped or no control is left.
    pub fn run(&mut self) -> Result<()> {
        self.reactor.run()
    }

    /// Detaches the control called `name`: its lines are deregistered first,
    /// then the control is dropped, which releases them.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(index) = self.controls.iter().position(|c| c.borrow().name() == name) else {
            return false;
        };
        let control = self.controls.remove(index);
        for line in control.borrow().lines() {
            self.reactor.deregister(line);
        }
        debug!("Removed control {}", name);
        true
    }

    /// Detaches every control.
    pub fn shutdown(&mut self) {
        while let Some(control) = self.controls.pop() {
            for line in control.borrow().lines() {
                self.reactor.deregister(line);
            }
        }
    }
}

impl Drop for ButtonService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
