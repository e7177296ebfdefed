//! Power button observer.
//!
//! The power button itself is decoded elsewhere and announced as
//! `Pressed`/`Released` notifications. This observer keeps the same
//! `{Released, Pressed}` shape as the GPIO buttons and forwards transitions
//! to a [`PowerButtonHandler`].

use crate::sink::ButtonState;
use log::{debug, trace};

/// Inbound notification about the power button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSignal {
    Pressed,
    /// `press_time_ms` is how long the button was held.
    Released { press_time_ms: u64 },
}

/// Custom reaction to power button presses.
pub trait PowerButtonHandler {
    fn pressed(&mut self);
    fn released(&mut self, press_time_ms: u64);
}

pub struct PowerButtonObserver<H: PowerButtonHandler> {
    handler: H,
    state: ButtonState,
}

impl<H: PowerButtonHandler> PowerButtonObserver<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: ButtonState::Released,
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Applies one notification. Every release reaches the handler with its
    /// hold time, seen press or not. Returns `false` only for a repeated
    /// press, which the handler does not get.
    pub fn on_signal(&mut self, signal: ButtonSignal) -> bool {
        match signal {
            ButtonSignal::Pressed if self.state == ButtonState::Pressed => {
                trace!("Ignoring repeated power button press");
                false
            }
            ButtonSignal::Pressed => {
                debug!("Power button pressed");
                self.state = ButtonState::Pressed;
                self.handler.pressed();
                true
            }
            ButtonSignal::Released { press_time_ms } => {
                debug!("Power button released after {} ms", press_time_ms);
                self.state = ButtonState::Released;
                self.handler.released(press_time_ms);
                true
            }
        }
    }
}
