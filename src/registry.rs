//! Hook registry capability and an in-memory action/filter table
//!
//! The recorder only needs two things from a host: the set of hook names it
//! knows, and a way to register a callback at a priority. [`HookTable`] is a
//! complete single-threaded host that also dispatches, used by the CLI
//! scenario runner and by the tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Kind of extension point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Side-effecting, no return value
    Action,
    /// Transforms a value and must return one
    Filter,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Action => "action",
            HookKind::Filter => "filter",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ActionFn = Rc<dyn Fn()>;
pub type FilterFn = Rc<dyn Fn(Value) -> Value>;

/// A registered callback; the variant carries the hook kind
#[derive(Clone)]
pub enum Callback {
    Action(ActionFn),
    Filter(FilterFn),
}

impl Callback {
    pub fn action<F: Fn() + 'static>(f: F) -> Self {
        Callback::Action(Rc::new(f))
    }

    pub fn filter<F: Fn(Value) -> Value + 'static>(f: F) -> Self {
        Callback::Filter(Rc::new(f))
    }

    pub fn kind(&self) -> HookKind {
        match self {
            Callback::Action(_) => HookKind::Action,
            Callback::Filter(_) => HookKind::Filter,
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callback::{:?}", self.kind())
    }
}

/// What the recorder consumes from a host framework
pub trait HookRegistry {
    /// Names of every hook that currently has at least one callback
    fn hook_names(&self) -> BTreeSet<String>;

    /// Register `callback` under `hook_name`; lower priority runs first
    fn register_callback(&self, hook_name: &str, priority: i32, callback: Callback);

    /// Kinds that have callbacks under `hook_name`
    ///
    /// Hosts that cannot tell report both, and a dispatch of a kind with
    /// no real callbacks is then still logged.
    fn hook_kinds(&self, _hook_name: &str) -> BTreeSet<HookKind> {
        BTreeSet::from([HookKind::Action, HookKind::Filter])
    }
}

/// Callbacks for one hook name, ordered by priority then registration
#[derive(Debug, Default)]
struct HookSlot {
    by_priority: BTreeMap<i32, Vec<Callback>>,
}

impl HookSlot {
    fn snapshot(&self, kind: HookKind) -> Vec<Callback> {
        self.by_priority
            .values()
            .flatten()
            .filter(|cb| cb.kind() == kind)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.by_priority.values().map(Vec::len).sum()
    }

    fn kinds(&self) -> BTreeSet<HookKind> {
        self.by_priority.values().flatten().map(Callback::kind).collect()
    }
}

/// In-memory hook table with action/filter dispatch
///
/// # Example
/// ```
/// use hookmon::registry::HookTable;
/// use serde_json::json;
///
/// let hooks = HookTable::new();
/// hooks.add_filter("title", 10, |v| json!(format!("[{}]", v.as_str().unwrap_or(""))));
/// assert_eq!(hooks.apply_filters("title", json!("hi")), json!("[hi]"));
/// ```
#[derive(Debug, Default)]
pub struct HookTable {
    slots: RefCell<BTreeMap<String, HookSlot>>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action<F: Fn() + 'static>(&self, hook_name: &str, priority: i32, f: F) {
        self.register_callback(hook_name, priority, Callback::action(f));
    }

    pub fn add_filter<F: Fn(Value) -> Value + 'static>(&self, hook_name: &str, priority: i32, f: F) {
        self.register_callback(hook_name, priority, Callback::filter(f));
    }

    /// Run every action callback of `hook_name`
    ///
    /// The callback list is copied before running, so callbacks may
    /// dispatch hooks themselves or register more callbacks.
    pub fn do_action(&self, hook_name: &str) {
        for callback in self.snapshot(hook_name, HookKind::Action) {
            if let Callback::Action(f) = callback {
                f();
            }
        }
    }

    /// Thread `value` through every filter callback of `hook_name`
    pub fn apply_filters(&self, hook_name: &str, value: Value) -> Value {
        self.snapshot(hook_name, HookKind::Filter)
            .into_iter()
            .fold(value, |acc, callback| match callback {
                Callback::Filter(f) => f(acc),
                Callback::Action(_) => acc,
            })
    }

    /// Number of callbacks registered under `hook_name`
    pub fn callback_count(&self, hook_name: &str) -> usize {
        self.slots
            .borrow()
            .get(hook_name)
            .map(HookSlot::len)
            .unwrap_or(0)
    }

    fn snapshot(&self, hook_name: &str, kind: HookKind) -> Vec<Callback> {
        self.slots
            .borrow()
            .get(hook_name)
            .map(|slot| slot.snapshot(kind))
            .unwrap_or_default()
    }
}

impl HookRegistry for HookTable {
    fn hook_names(&self) -> BTreeSet<String> {
        self.slots
            .borrow()
            .iter()
            .filter(|(_, slot)| slot.len() > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn register_callback(&self, hook_name: &str, priority: i32, callback: Callback) {
        self.slots
            .borrow_mut()
            .entry(hook_name.to_string())
            .or_default()
            .by_priority
            .entry(priority)
            .or_default()
            .push(callback);
    }

    fn hook_kinds(&self, hook_name: &str) -> BTreeSet<HookKind> {
        self.slots
            .borrow()
            .get(hook_name)
            .map(HookSlot::kinds)
            .unwrap_or_default()
    }
}
