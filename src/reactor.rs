//! Single-threaded event reactor.
//!
//! The reactor owns the dispatch table (line → handler) and a queue of
//! deferred timer callbacks, and asks the [`LineSource`] which lines saw an
//! edge. Handlers run to completion one at a time; a handler that is still
//! borrowed when its line fires again (re-entrant dispatch) is retried on the
//! next turn instead of being entered twice.

use crate::error::{Error, Result};
use crate::gpio::LineSource;
use log::{debug, trace};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Callback interface for anything registered with the [`Reactor`].
pub trait LineHandler {
    /// Called when `line` saw an edge.
    fn on_readable(&mut self, line: u32, timers: &mut Timers);

    /// Called when a timer scheduled through [`Timers::schedule`] for `line`
    /// expires.
    fn on_timer(&mut self, _line: u32, _token: u64, _timers: &mut Timers) {}
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    deadline: Instant,
    line: u32,
    token: u64,
}

/// Deferred callbacks, run on the reactor thread.
#[derive(Debug, Default)]
pub struct Timers {
    entries: Vec<TimerEntry>,
}

impl Timers {
    /// Schedules `on_timer(line, token)` on the handler registered for `line`
    /// once `delay` has elapsed.
    pub fn schedule(&mut self, line: u32, delay: Duration, token: u64) {
        trace!("timer for line {} in {:?} (token {})", line, delay, token);
        self.entries.push(TimerEntry {
            deadline: Instant::now() + delay,
            line,
            token,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|t| t.deadline).min()
    }

    fn take_due(&mut self, now: Instant) -> Vec<(u32, u64)> {
        let mut due: Vec<TimerEntry> = Vec::new();
        self.entries.retain(|t| {
            if t.deadline <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| t.deadline);
        due.into_iter().map(|t| (t.line, t.token)).collect()
    }

    fn cancel(&mut self, line: u32) {
        self.entries.retain(|t| t.line != line);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Readable(u32),
    Timer(u32, u64),
}

impl Dispatch {
    fn line(self) -> u32 {
        match self {
            Dispatch::Readable(line) | Dispatch::Timer(line, _) => line,
        }
    }
}

/// Requests [`Reactor::run`] to return after the current turn.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }
}

pub struct Reactor {
    source: Rc<RefCell<dyn LineSource>>,
    handlers: BTreeMap<u32, Rc<RefCell<dyn LineHandler>>>,
    timers: Timers,
    deferred: VecDeque<Dispatch>,
    stop: StopHandle,
}

impl Reactor {
    pub fn new(source: Rc<RefCell<dyn LineSource>>) -> Self {
        Self {
            source,
            handlers: BTreeMap::new(),
            timers: Timers::default(),
            deferred: VecDeque::new(),
            stop: StopHandle::default(),
        }
    }

    /// Routes edges on `line` to `handler`. A line can have only one handler.
    pub fn register(&mut self, line: u32, handler: Rc<RefCell<dyn LineHandler>>) -> Result<()> {
        if self.handlers.contains_key(&line) {
            return Err(Error::Reactor(format!(
                "line {} already has a handler",
                line
            )));
        }
        debug!("Registered handler for line {}", line);
        self.handlers.insert(line, handler);
        Ok(())
    }

    /// Removes the handler for `line` together with its pending timers.
    pub fn deregister(&mut self, line: u32) -> Option<Rc<RefCell<dyn LineHandler>>> {
        self.timers.cancel(line);
        self.deferred.retain(|d| d.line() != line);
        let removed = self.handlers.remove(&line);
        if removed.is_some() {
            debug!("Deregistered handler for line {}", line);
        }
        removed
    }

    pub fn is_registered(&self, line: u32) -> bool {
        self.handlers.contains_key(&line)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Waits up to `timeout` for edges or timers and dispatches them.
    /// Returns the number of callbacks that ran.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize> {
        let now = Instant::now();
        let mut wait_for = timeout;
        if let Some(deadline) = self.timers.next_deadline() {
            let until = deadline.saturating_duration_since(now);
            wait_for = Some(wait_for.map_or(until, |t| t.min(until)));
        }
        if !self.deferred.is_empty() {
            wait_for = Some(Duration::ZERO);
        }

        let ready = self
            .source
            .borrow_mut()
            .wait(wait_for)
            .map_err(|e| Error::Reactor(format!("waiting for GPIO edges failed: {}", e)))?;

        let mut work: Vec<Dispatch> = self.deferred.drain(..).collect();
        work.extend(ready.into_iter().map(Dispatch::Readable));
        work.extend(
            self.timers
                .take_due(Instant::now())
                .into_iter()
                .map(|(line, token)| Dispatch::Timer(line, token)),
        );

        let mut ran = 0;
        for item in work {
            let line = item.line();
            let Some(handler) = self.handlers.get(&line).cloned() else {
                trace!("No handler for line {}, dropping {:?}", line, item);
                continue;
            };
            let Ok(mut guard) = handler.try_borrow_mut() else {
                debug!("Handler for line {} is busy, deferring {:?}", line, item);
                self.deferred.push_back(item);
                continue;
            };
            match item {
                Dispatch::Readable(line) => guard.on_readable(line, &mut self.timers),
                Dispatch::Timer(line, token) => guard.on_timer(line, token, &mut self.timers),
            }
            ran += 1;
        }
        Ok(ran)
    }

    /// Dispatches until stopped or no handler is left.
    pub fn run(&mut self) -> Result<()> {
        while !self.stop.is_stopped() && !self.handlers.is_empty() {
            self.turn(None)?;
        }
        debug!("Reactor loop finished");
        Ok(())
    }
}
