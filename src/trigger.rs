//! Request trigger for starting a monitoring run
//!
//! A run is requested by the presence of a query parameter. Deciding
//! whether the requester may start one is the host's job; the trigger
//! only takes the verdict.

use crate::config::MonitorConfig;
use crate::registry::HookRegistry;
use crate::session::MonitorSession;
use std::rc::Rc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTrigger {
    param: String,
}

impl MonitorTrigger {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.trigger_param.clone())
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Whether `query` (with or without a leading `?`) carries the parameter
    ///
    /// Presence is enough: `?hook_monitor`, `?hook_monitor=` and
    /// `?hook_monitor=1` all request a run.
    pub fn is_requested(&self, query: &str) -> bool {
        query
            .trim_start_matches('?')
            .split('&')
            .map(|pair| pair.split('=').next().unwrap_or(pair))
            .any(|key| key == self.param)
    }

    /// Start `session` if the request asks for it and is authorized
    ///
    /// Returns whether a new run was started.
    pub fn maybe_start(
        &self,
        query: &str,
        authorized: bool,
        session: &Rc<MonitorSession>,
        registry: &dyn HookRegistry,
    ) -> bool {
        if !self.is_requested(query) {
            return false;
        }
        if !authorized {
            warn!(param = %self.param, "unauthorized hook monitor request ignored");
            return false;
        }
        let started = session.start(registry);
        debug!(started, "hook monitor trigger handled");
        started
    }
}

impl Default for MonitorTrigger {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}
