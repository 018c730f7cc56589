//! Hook interceptor: entry/exit wrappers bracketing one hook name
//!
//! For each kind the hook has callbacks of, the entry wrapper is registered
//! at [`ENTRY_PRIORITY`] so it runs before every real callback, and the exit
//! wrapper at [`EXIT_PRIORITY`] so it runs after them. Filter wrappers hand
//! their input back untouched.
//!
//! Wrappers hold a weak reference to the session and the attachment token
//! of their registry. They record only while the session is running on that
//! registry; a stopped or dropped session leaves them inert.

use crate::registry::{Callback, HookKind, HookRegistry};
use crate::session::MonitorSession;
use serde_json::Value;
use std::rc::{Rc, Weak};

/// Runs first among callbacks of the same hook
pub const ENTRY_PRIORITY: i32 = i32::MIN;

/// Runs last among callbacks of the same hook
pub const EXIT_PRIORITY: i32 = i32::MAX;

/// Wrap the `kind` callbacks of `hook_name` in `registry`
pub fn attach(
    hook_name: &str,
    kind: HookKind,
    registry: &dyn HookRegistry,
    session: &Rc<MonitorSession>,
    token: &Rc<()>,
) {
    let interceptor = HookInterceptor::new(hook_name, session, token);
    registry.register_callback(hook_name, ENTRY_PRIORITY, interceptor.entry_callback(kind));
    registry.register_callback(hook_name, EXIT_PRIORITY, interceptor.exit_callback(kind));
}

/// Wrapper factory for one hook name on one registry
#[derive(Debug, Clone)]
pub struct HookInterceptor {
    hook_name: Rc<str>,
    session: Weak<MonitorSession>,
    token: Rc<()>,
}

impl HookInterceptor {
    pub fn new(hook_name: &str, session: &Rc<MonitorSession>, token: &Rc<()>) -> Self {
        Self {
            hook_name: Rc::from(hook_name),
            session: Rc::downgrade(session),
            token: Rc::clone(token),
        }
    }

    pub fn entry_callback(&self, kind: HookKind) -> Callback {
        let this = self.clone();
        match kind {
            HookKind::Action => Callback::action(move || this.on_entry()),
            HookKind::Filter => Callback::filter(move |value: Value| {
                this.on_entry();
                value
            }),
        }
    }

    pub fn exit_callback(&self, kind: HookKind) -> Callback {
        let this = self.clone();
        match kind {
            HookKind::Action => Callback::action(move || this.on_exit(HookKind::Action)),
            HookKind::Filter => Callback::filter(move |value: Value| {
                this.on_exit(HookKind::Filter);
                value
            }),
        }
    }

    fn live_session(&self) -> Option<Rc<MonitorSession>> {
        self.session
            .upgrade()
            .filter(|session| session.accepts(&self.token))
    }

    fn on_entry(&self) {
        if let Some(session) = self.live_session() {
            session.mark_entry(&self.hook_name);
        }
    }

    fn on_exit(&self, kind: HookKind) {
        if let Some(session) = self.live_session() {
            session.log_hook(&self.hook_name, kind);
        }
    }
}
