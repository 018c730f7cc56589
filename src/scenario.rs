//! Scenario replay: a scripted host for exercising the recorder
//!
//! A scenario file declares hooks with callbacks that spend a given amount
//! of work, and a script of dispatches. Callbacks may dispatch further hooks
//! (including their own, for re-entrancy) up to `max_nesting` levels.
//!
//! ```json
//! {
//!   "hooks": [
//!     { "name": "init", "callbacks": [{ "priority": 10, "work_ms": 4 }] },
//!     { "name": "the_title", "kind": "filter",
//!       "callbacks": [{ "work_ms": 1, "append": "!" }] }
//!   ],
//!   "script": [
//!     { "hook": "init" },
//!     { "hook": "the_title", "kind": "filter", "value": "Hello" }
//!   ]
//! }
//! ```

use crate::registry::{HookKind, HookTable};
use crate::session::MonitorSession;
use crate::timer::ManualClock;
use crate::trigger::MonitorTrigger;
use serde::Deserialize;
use serde_json::Value;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_PRIORITY: i32 = 10;
const DEFAULT_MAX_NESTING: usize = 4;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// A complete replay description
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Query string of the triggering request; `None` starts unconditionally
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default = "default_authorized")]
    pub authorized: bool,
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
    #[serde(default)]
    pub hooks: Vec<HookDef>,
    /// Registered after monitoring starts, so never instrumented
    #[serde(default)]
    pub late_hooks: Vec<HookDef>,
    #[serde(default)]
    pub script: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookDef {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: HookKind,
    #[serde(default)]
    pub callbacks: Vec<CallbackDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackDef {
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Simulated work in milliseconds
    #[serde(default)]
    pub work_ms: f64,
    /// Filters only: suffix appended to string values
    #[serde(default)]
    pub append: Option<String>,
    /// Hooks dispatched from inside this callback
    #[serde(default)]
    pub dispatch: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub hook: String,
    #[serde(default = "default_kind")]
    pub kind: HookKind,
    /// Filters only: value threaded through the callbacks
    #[serde(default)]
    pub value: Value,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_authorized() -> bool {
    true
}

fn default_max_nesting() -> usize {
    DEFAULT_MAX_NESTING
}

fn default_kind() -> HookKind {
    HookKind::Action
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_repeat() -> usize {
    1
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        for def in self.hooks.iter().chain(&self.late_hooks) {
            if def.name.trim().is_empty() {
                return Err(ScenarioError::Invalid("hook with empty name".to_string()));
            }
            for callback in &def.callbacks {
                if work_duration(callback.work_ms).is_none() {
                    return Err(ScenarioError::Invalid(format!(
                        "hook '{}': work_ms must be a non-negative number of representable size, got {}",
                        def.name, callback.work_ms
                    )));
                }
            }
        }
        Ok(())
    }
}

/// How callbacks spend their `work_ms`
#[derive(Debug, Clone)]
pub enum WorkMode {
    /// Really sleep
    Sleep,
    /// Advance a manual clock; deterministic durations
    Simulated(Rc<ManualClock>),
}

impl WorkMode {
    fn spend(&self, work_ms: f64) {
        let Some(work) = work_duration(work_ms).filter(|work| !work.is_zero()) else {
            return;
        };
        match self {
            WorkMode::Sleep => std::thread::sleep(work),
            WorkMode::Simulated(clock) => clock.advance(work),
        }
    }
}

/// What a replay did
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Whether the trigger started a monitoring run
    pub started: bool,
    /// Top-level script steps executed (counting repeats)
    pub dispatched: usize,
    /// Final value of each top-level filter step
    pub filter_results: Vec<(String, Value)>,
}

/// Replays a [`Scenario`] against a monitor session
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    work: WorkMode,
}

impl ScenarioRunner {
    pub fn new(scenario: Scenario, work: WorkMode) -> Self {
        Self { scenario, work }
    }

    /// Build the host, trigger `session`, run the script, stop the session
    pub fn run(&self, session: &Rc<MonitorSession>) -> RunOutcome {
        let host = Rc::new(ScriptedHost {
            hooks: HookTable::new(),
            work: self.work.clone(),
            depth: Cell::new(0),
            max_nesting: self.scenario.max_nesting,
        });
        for def in &self.scenario.hooks {
            host.register(def);
        }

        let started = match &self.scenario.request {
            Some(query) => MonitorTrigger::from_config(session.config()).maybe_start(
                query,
                self.scenario.authorized,
                session,
                &host.hooks,
            ),
            None => session.start(&host.hooks),
        };

        for def in &self.scenario.late_hooks {
            host.register(def);
        }

        let mut outcome = RunOutcome {
            started,
            dispatched: 0,
            filter_results: Vec::new(),
        };
        for step in &self.scenario.script {
            let value = host.run_step(step);
            outcome.dispatched += step.repeat;
            if step.kind == HookKind::Filter {
                outcome.filter_results.push((step.hook.clone(), value));
            }
        }

        session.stop();
        debug!(dispatched = outcome.dispatched, "scenario replay finished");
        outcome
    }
}

struct ScriptedHost {
    hooks: HookTable,
    work: WorkMode,
    /// Dispatches currently in progress
    depth: Cell<usize>,
    max_nesting: usize,
}

impl ScriptedHost {
    fn register(self: &Rc<Self>, def: &HookDef) {
        for callback in &def.callbacks {
            let host = Rc::downgrade(self);
            let callback = callback.clone();
            match def.kind {
                HookKind::Action => self.hooks.add_action(&def.name, callback.priority, move || {
                    if let Some(host) = host.upgrade() {
                        host.perform(&callback);
                    }
                }),
                HookKind::Filter => {
                    self.hooks
                        .add_filter(&def.name, callback.priority, move |value| match host.upgrade() {
                            Some(host) => {
                                host.perform(&callback);
                                append_suffix(value, callback.append.as_deref())
                            }
                            None => value,
                        })
                }
            }
        }
    }

    fn run_step(&self, step: &Step) -> Value {
        let mut result = step.value.clone();
        for _ in 0..step.repeat {
            self.depth.set(self.depth.get() + 1);
            result = match step.kind {
                HookKind::Action => {
                    self.hooks.do_action(&step.hook);
                    Value::Null
                }
                HookKind::Filter => self.hooks.apply_filters(&step.hook, step.value.clone()),
            };
            self.depth.set(self.depth.get() - 1);
        }
        result
    }

    fn perform(&self, callback: &CallbackDef) {
        self.work.spend(callback.work_ms);
        if callback.dispatch.is_empty() {
            return;
        }
        if self.depth.get() >= self.max_nesting {
            warn!(depth = self.depth.get(), "nested dispatch limit reached; skipping");
            return;
        }
        for step in &callback.dispatch {
            self.run_step(step);
        }
    }
}

/// `work_ms` as a [`Duration`]; `None` when negative, NaN or too large
fn work_duration(work_ms: f64) -> Option<Duration> {
    if work_ms < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(work_ms / 1000.0).ok()
}

fn append_suffix(value: Value, suffix: Option<&str>) -> Value {
    match (value, suffix) {
        (Value::String(s), Some(suffix)) => Value::String(s + suffix),
        (value, _) => value,
    }
}
