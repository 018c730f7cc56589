//! Monitor session: lifecycle, pending start times, and the hook log
//!
//! A session is owned by the host (no global instance) and shared with the
//! interceptors through `Rc`. Dispatch is synchronous and single-threaded,
//! so state lives in `Cell`/`RefCell` and the session is `!Send`.
//!
//! Attachment is a one-time snapshot: hooks that gain their first callback
//! after [`MonitorSession::start`] are not instrumented for that run. A
//! restart on the same registry reuses the wrappers already in place and
//! only attaches hooks (or kinds) that appeared since.

use crate::caller::{BacktraceResolver, CallerInfo, CallerResolver, NoopResolver};
use crate::config::MonitorConfig;
use crate::interceptor;
use crate::profiling::{ProfilingCategory, ProfilingContext};
use crate::registry::{HookKind, HookRegistry};
use crate::timer::{Clock, SystemClock, Timestamp};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, Ref, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{debug, trace};

/// One observed hook invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "hook")]
    pub hook_name: String,
    #[serde(rename = "type")]
    pub kind: HookKind,
    /// Wall clock at completion, seconds since the Unix epoch
    pub timestamp: f64,
    /// Entry-to-exit time; 0 when the exit had no matching entry
    #[serde(rename = "executionTimeSeconds")]
    pub duration_seconds: f64,
    pub caller: CallerInfo,
}

/// Wrappers this session has registered on one registry
///
/// Wrappers own strong references to `token`; once the registry (and with
/// it every wrapper) is gone the token dies and the record is pruned.
struct Attachment {
    registry: usize,
    token: Weak<()>,
    wrapped: BTreeSet<(String, HookKind)>,
}

/// One monitoring run over a hook registry
pub struct MonitorSession {
    config: MonitorConfig,
    clock: Rc<dyn Clock>,
    resolver: Box<dyn CallerResolver>,
    active: Cell<bool>,
    /// Bumped on every start
    generation: Cell<u64>,
    attachments: RefCell<Vec<Attachment>>,
    /// Token of the registry the current run is attached to
    current: RefCell<Weak<()>>,
    entries: RefCell<Vec<LogEntry>>,
    /// LIFO start times per hook name, so nested dispatches pair correctly
    pending: RefCell<HashMap<String, Vec<Timestamp>>>,
    profiling: RefCell<Option<ProfilingContext>>,
}

impl MonitorSession {
    /// Session on the system clock, resolving callers unless disabled
    pub fn new(config: MonitorConfig) -> Self {
        let resolver: Box<dyn CallerResolver> = if config.resolve_callers {
            Box::new(BacktraceResolver::new().ignoring(config.ignored_prefixes.clone()))
        } else {
            Box::new(NoopResolver)
        };
        Self {
            config,
            clock: Rc::new(SystemClock::new()),
            resolver,
            active: Cell::new(false),
            generation: Cell::new(0),
            attachments: RefCell::new(Vec::new()),
            current: RefCell::new(Weak::new()),
            entries: RefCell::new(Vec::new()),
            pending: RefCell::new(HashMap::new()),
            profiling: RefCell::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn CallerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Account recorder overhead from now on (see [`ProfilingContext`])
    pub fn enable_profiling(&self) {
        self.profiling.replace(Some(ProfilingContext::new()));
    }

    pub fn take_profile(&self) -> Option<ProfilingContext> {
        self.profiling.take()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Begin a run: reset state and wrap every hook `registry` knows now
    ///
    /// Returns `false` and changes nothing when a run is already active.
    pub fn start(self: &Rc<Self>, registry: &dyn HookRegistry) -> bool {
        if self.active.get() {
            debug!("hook monitor already active; start ignored");
            return false;
        }

        self.entries.borrow_mut().clear();
        self.pending.borrow_mut().clear();
        self.generation.set(self.generation.get() + 1);
        self.active.set(true);

        let token = self.attach_new_hooks(registry);
        self.current.replace(Rc::downgrade(&token));
        true
    }

    fn attach_new_hooks(self: &Rc<Self>, registry: &dyn HookRegistry) -> Rc<()> {
        let key = registry_key(registry);
        let mut attachments = self.attachments.borrow_mut();
        attachments.retain(|a| a.token.strong_count() > 0);
        let index = match attachments.iter().position(|a| a.registry == key) {
            Some(index) => index,
            None => {
                attachments.push(Attachment {
                    registry: key,
                    token: Weak::new(),
                    wrapped: BTreeSet::new(),
                });
                attachments.len() - 1
            }
        };
        let attachment = &mut attachments[index];
        let token = match attachment.token.upgrade() {
            Some(token) => token,
            None => {
                let token = Rc::new(());
                attachment.token = Rc::downgrade(&token);
                token
            }
        };

        let names = registry.hook_names();
        let mut attached = 0;
        for name in &names {
            for kind in registry.hook_kinds(name) {
                if attachment.wrapped.insert((name.clone(), kind)) {
                    interceptor::attach(name, kind, registry, self, &token);
                    attached += 1;
                }
            }
        }
        debug!(
            hooks = names.len(),
            attached,
            generation = self.generation.get(),
            "hook monitoring started"
        );
        token
    }

    /// End the run; entries stay readable until the next start
    pub fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }
        let dangling: usize = self.pending.borrow().values().map(Vec::len).sum();
        if dangling > 0 {
            debug!(dangling, "stopping with unmatched hook entries");
        }
        self.pending.borrow_mut().clear();
        debug!(entries = self.entries.borrow().len(), "hook monitoring stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Whether a wrapper holding `token` belongs to the running attachment
    pub fn accepts(&self, token: &Rc<()>) -> bool {
        self.active.get()
            && self
                .current
                .borrow()
                .upgrade()
                .is_some_and(|current| Rc::ptr_eq(&current, token))
    }

    /// Entry wrapper: push the current time for `hook_name`
    pub fn mark_entry(&self, hook_name: &str) {
        if !self.active.get() {
            return;
        }
        let started = Instant::now();
        let now = self.clock.now();
        self.pending
            .borrow_mut()
            .entry(hook_name.to_string())
            .or_default()
            .push(now);
        self.record_overhead(ProfilingCategory::EntryWrap, started);
    }

    /// Exit wrapper: pair with the latest entry and append a [`LogEntry`]
    pub fn log_hook(&self, hook_name: &str, kind: HookKind) {
        if !self.active.get() {
            return;
        }
        let started = Instant::now();
        let end = self.clock.now();
        let start = self
            .pending
            .borrow_mut()
            .get_mut(hook_name)
            .and_then(Vec::pop);
        let duration_seconds = match start {
            Some(start) => end.seconds_since(start),
            None => {
                trace!(hook = hook_name, "exit without matching entry; duration 0");
                0.0
            }
        };

        let resolving = Instant::now();
        let caller = self.resolver.resolve(self.config.caller_skip_frames);
        let resolve_time = resolving.elapsed();

        self.entries.borrow_mut().push(LogEntry {
            hook_name: hook_name.to_string(),
            kind,
            timestamp: self.clock.wall_clock(),
            duration_seconds,
            caller,
        });

        if let Some(profile) = self.profiling.borrow_mut().as_mut() {
            profile.record_entry_logged();
            profile.record_time(ProfilingCategory::CallerResolution, resolve_time);
            profile.record_time(
                ProfilingCategory::ExitWrap,
                started.elapsed().saturating_sub(resolve_time),
            );
        }
    }

    /// Read-only view in dispatch order
    ///
    /// Do not hold the view across a dispatch: the exit wrapper appends.
    pub fn entries(&self) -> Ref<'_, [LogEntry]> {
        Ref::map(self.entries.borrow(), Vec::as_slice)
    }

    /// Owned copy of the log
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Unmatched entries currently pending for `hook_name`
    pub fn pending_depth(&self, hook_name: &str) -> usize {
        self.pending.borrow().get(hook_name).map_or(0, Vec::len)
    }

    /// Add rendering time measured outside the session
    pub fn record_rendering(&self, started: Instant) {
        self.record_overhead(ProfilingCategory::Rendering, started);
    }

    fn record_overhead(&self, category: ProfilingCategory, started: Instant) {
        if let Some(profile) = self.profiling.borrow_mut().as_mut() {
            profile.record_time(category, started.elapsed());
        }
    }
}

fn registry_key(registry: &dyn HookRegistry) -> usize {
    registry as *const dyn HookRegistry as *const () as usize
}

impl Default for MonitorSession {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl std::fmt::Debug for MonitorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorSession")
            .field("active", &self.active.get())
            .field("generation", &self.generation.get())
            .field("entries", &self.entries.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HookTable;
    use crate::timer::ManualClock;

    fn manual_session(clock: &Rc<ManualClock>) -> Rc<MonitorSession> {
        Rc::new(
            MonitorSession::new(MonitorConfig::default())
                .with_clock(Rc::clone(clock) as Rc<dyn Clock>)
                .with_resolver(Box::new(NoopResolver)),
        )
    }

    #[test]
    fn test_new_session_is_inactive_and_empty() {
        let session = MonitorSession::default();
        assert!(!session.is_active());
        assert!(session.entries().is_empty());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        let hooks = HookTable::new();
        hooks.add_action("init", 10, || {});

        assert!(session.start(&hooks));
        hooks.do_action("init");
        assert_eq!(session.entries().len(), 1);

        assert!(!session.start(&hooks));
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.generation(), 1);

        // The ignored start attached nothing new
        hooks.do_action("init");
        assert_eq!(session.entries().len(), 2);
    }

    #[test]
    fn test_log_hook_without_entry_defaults_to_zero() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        session.start(&HookTable::new());

        clock.advance_secs(3.0);
        session.log_hook("orphan", HookKind::Action);

        let entries = session.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration_seconds, 0.0);
    }

    #[test]
    fn test_mark_and_log_pair_lifo() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        session.start(&HookTable::new());

        session.mark_entry("loop");
        clock.advance_secs(1.0);
        session.mark_entry("loop");
        assert_eq!(session.pending_depth("loop"), 2);
        clock.advance_secs(0.5);
        session.log_hook("loop", HookKind::Action);
        clock.advance_secs(0.25);
        session.log_hook("loop", HookKind::Action);

        let durations: Vec<f64> = session.entries().iter().map(|e| e.duration_seconds).collect();
        assert_eq!(durations, vec![0.5, 1.75]);
        assert_eq!(session.pending_depth("loop"), 0);
    }

    #[test]
    fn test_inactive_session_records_nothing() {
        let session = MonitorSession::default();
        session.mark_entry("x");
        session.log_hook("x", HookKind::Filter);
        assert!(session.entries().is_empty());
        assert_eq!(session.pending_depth("x"), 0);
    }

    #[test]
    fn test_stop_then_restart_does_not_double_count() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        let hooks = HookTable::new();
        hooks.add_action("wp_head", 10, || {});

        session.start(&hooks);
        hooks.do_action("wp_head");
        session.stop();
        assert!(!session.is_active());
        hooks.do_action("wp_head");
        assert_eq!(session.entries().len(), 1);

        assert!(session.start(&hooks));
        assert!(session.entries().is_empty());
        hooks.do_action("wp_head");
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_restarts_reuse_existing_wrappers() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        let hooks = HookTable::new();
        hooks.add_action("init", 10, || {});

        for _ in 0..50 {
            session.start(&hooks);
            session.stop();
        }
        assert_eq!(hooks.callback_count("init"), 3);

        session.start(&hooks);
        hooks.do_action("init");
        assert_eq!(session.entries().len(), 1);
    }

    #[test]
    fn test_restart_attaches_hooks_added_between_runs() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        let hooks = HookTable::new();
        hooks.add_action("init", 10, || {});

        session.start(&hooks);
        session.stop();
        hooks.add_action("wp_loaded", 10, || {});
        hooks.add_filter("init", 10, |v| v);

        session.start(&hooks);
        hooks.do_action("wp_loaded");
        hooks.apply_filters("init", serde_json::json!(1));
        hooks.do_action("init");
        let kinds: Vec<_> = session.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![HookKind::Action, HookKind::Filter, HookKind::Action]);
        assert_eq!(hooks.callback_count("init"), 6);
    }

    #[test]
    fn test_switching_registry_silences_the_previous_one() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        let first = HookTable::new();
        let second = HookTable::new();
        first.add_action("init", 10, || {});
        second.add_action("init", 10, || {});

        session.start(&first);
        session.stop();
        session.start(&second);
        first.do_action("init");
        assert!(session.entries().is_empty());
        second.do_action("init");
        assert_eq!(session.entries().len(), 1);
    }

    #[test]
    fn test_timestamp_is_wall_clock_at_exit() {
        let clock = Rc::new(ManualClock::starting_at(1_700_000_000.0));
        let session = manual_session(&clock);
        let hooks = HookTable::new();
        let inner_clock = Rc::clone(&clock);
        hooks.add_action("shutdown", 10, move || inner_clock.advance_secs(2.0));

        session.start(&hooks);
        hooks.do_action("shutdown");
        assert_eq!(session.entries()[0].timestamp, 1_700_000_002.0);
    }

    #[test]
    fn test_profiling_counts_logged_entries() {
        let clock = Rc::new(ManualClock::new());
        let session = manual_session(&clock);
        session.enable_profiling();
        let hooks = HookTable::new();
        hooks.add_action("init", 10, || {});

        session.start(&hooks);
        hooks.do_action("init");
        hooks.do_action("init");

        let profile = session.take_profile().unwrap();
        assert_eq!(profile.entries_logged(), 2);
        assert!(session.take_profile().is_none());
    }

    #[test]
    fn test_log_entry_json_field_names() {
        let entry = LogEntry {
            hook_name: "save_post".to_string(),
            kind: HookKind::Action,
            timestamp: 1.5,
            duration_seconds: 0.25,
            caller: CallerInfo::blank(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["hook"], "save_post");
        assert_eq!(json["type"], "action");
        assert_eq!(json["executionTimeSeconds"], 0.25);
        assert!(json["caller"].is_object());
    }
}
