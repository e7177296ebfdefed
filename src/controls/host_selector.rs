//! Multi-position host selector switch.

use super::{apply_outcome, initial_raw_index, Env, Publisher};
use crate::config::ButtonConfig;
use crate::consts;
use crate::debounce::DebounceFilter;
use crate::decode::LineGroup;
use crate::error::{config_error, Result};
use crate::position::{KeyFormat, PositionMap, PositionMapper};
use crate::reactor::Timers;
use crate::sink::DecodedState;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
struct HostSelectorParams {
    host_selector_map: BTreeMap<String, u32>,
    max_position: u32,
    #[serde(default)]
    key_format: KeyFormat,
}

/// Decodes a group of lines into a host position in `0..max_position`.
///
/// The whole group is re-sampled on every edge of any of its lines, run
/// through the debounce filter and mapped through the configured position
/// map. Raw indices without a valid mapping move the selector to the invalid
/// position, which is logged and never published.
pub struct HostSelector {
    group: LineGroup,
    filter: DebounceFilter,
    mapper: PositionMapper,
    position: Option<u32>,
    publisher: Publisher,
}

impl HostSelector {
    /// Claims the group, samples it once and publishes the initial position.
    pub fn new(env: &Env, config: &ButtonConfig) -> Result<Self> {
        let form_factor = config.form_factor.as_str();
        let params: HostSelectorParams = serde_json::from_value(config.params.clone())
            .map_err(|e| config_error(form_factor, e.to_string()))?;
        let map = PositionMap::from_keys(
            form_factor,
            config.gpios.len(),
            params.key_format,
            &params.host_selector_map,
        )?;
        let mapper = PositionMapper::new(form_factor, map, params.max_position)?;

        let group = LineGroup::acquire(form_factor, &config.gpios, env.lines.clone())?;
        let raw = initial_raw_index(&group, form_factor)?;
        let mut filter = DebounceFilter::new(env.debounce);
        filter.prime(raw);

        let selector = Self {
            position: mapper.map_to_position(raw),
            group,
            filter,
            mapper,
            publisher: Publisher::new(config, consts::HOST_SELECTOR_PATH, env),
        };
        match selector.position {
            Some(position) => selector.publisher.publish(DecodedState::Position(position)),
            None => warn!("{}: initial raw index {} is not a valid position", form_factor, raw),
        }
        Ok(selector)
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

    /// Current position, `None` while invalid.
    pub fn position(&self) -> Option<u32> {
        self.position
    }

    pub fn max_position(&self) -> u32 {
        self.mapper.max_position()
    }

    /// Pure lookup of the position a raw index maps to.
    pub fn mapped_hs_config(&self, raw: u32) -> Option<u32> {
        self.mapper.resolve(raw).ok()
    }

    fn commit(&mut self, raw: u32) {
        self.position = self.mapper.map_to_position(raw);
        match self.position {
            Some(position) => self.publisher.publish(DecodedState::Position(position)),
            None => debug!("{}: invalid position, nothing published", self.form_factor()),
        }
    }

    pub(crate) fn handle_edge(&mut self, line: u32, timers: &mut Timers) {
        let raw = match self.group.raw_index() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: cannot sample group after edge on {}: {}", self.form_factor(), line, e);
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
                warn!("{}: cannot re-sample group: {}", self.form_factor(), e);
                return;
            }
        };
        if let Some(raw) = apply_outcome(self.filter.on_settle(token, raw), line, timers) {
            self.commit(raw);
        }
    }
}
