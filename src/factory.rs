//! Form factor registry: maps a form factor name to the function that builds
//! its control.

use crate::config::ButtonConfig;
use crate::consts;
use crate::controls::{ButtonKind, Control, Env, HostSelector, MomentaryButton};
use crate::error::Result;
use log::{debug, info};
use std::collections::BTreeMap;

/// Builds a control from its descriptor.
pub type Builder = fn(&Env, &ButtonConfig) -> Result<Control>;

#[derive(Default)]
pub struct Registry {
    builders: BTreeMap<String, Builder>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in form factor, registered in a fixed order.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(consts::HOST_SELECTOR, build_host_selector);
        registry.register(consts::ID_BUTTON, build_id_button);
        registry.register(consts::DEBUG_SELECTOR_BUTTON, build_debug_selector);
        registry
    }

    /// Registers `builder` under `name`. Registering a name twice keeps the
    /// first builder and returns `false`.
    pub fn register(&mut self, name: &str, builder: Builder) -> bool {
        if self.builders.contains_key(name) {
            debug!("Form factor {} already registered", name);
            return false;
        }
        self.builders.insert(name.to_string(), builder);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Builds the control for `name`.
    ///
    /// Returns `Ok(None)` for a form factor nobody registered: such entries
    /// may be meant for other services and are skipped. Builder failures are
    /// returned so the caller can skip just this control.
    pub fn create(&self, name: &str, env: &Env, config: &ButtonConfig) -> Result<Option<Control>> {
        let Some(builder) = self.builders.get(name) else {
            debug!("No builder for form factor {}, skipping {}", name, config.name);
            return Ok(None);
        };
        let control = builder(env, config)?;
        info!(
            "Created {} control {} on lines {:?}",
            name,
            control.name(),
            control.lines()
        );
        Ok(Some(control))
    }
}

fn build_host_selector(env: &Env, config: &ButtonConfig) -> Result<Control> {
    HostSelector::new(env, config).map(Control::HostSelector)
}

fn build_id_button(env: &Env, config: &ButtonConfig) -> Result<Control> {
    MomentaryButton::new(ButtonKind::Id, env, config).map(Control::Button)
}

fn build_debug_selector(env: &Env, config: &ButtonConfig) -> Result<Control> {
    MomentaryButton::new(ButtonKind::DebugSelector, env, config).map(Control::Button)
}
