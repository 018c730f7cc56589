//! Caller attribution through the real backtrace resolver
//!
//! Tests keep their dispatching helpers out of line so the frame that
//! triggers the hook survives in debug builds.

use hookmon::caller::{BacktraceResolver, CallerInfo, CallerResolver};
use hookmon::config::MonitorConfig;
use hookmon::registry::HookTable;
use hookmon::session::MonitorSession;
use serde_json::json;
use std::rc::Rc;

struct Editor {
    hooks: Rc<HookTable>,
}

impl Editor {
    #[inline(never)]
    fn save(&self) {
        self.hooks.do_action("save_post");
    }
}

#[inline(never)]
fn dispatch_from_here(hooks: &HookTable) {
    hooks.do_action("wp_footer");
}

#[inline(never)]
fn resolve_from_here(resolver: &BacktraceResolver, skip: usize) -> CallerInfo {
    resolver.resolve(skip)
}

#[test]
fn test_plain_function_caller() {
    let hooks = HookTable::new();
    hooks.add_action("wp_footer", 10, || {});
    let session = Rc::new(MonitorSession::new(MonitorConfig::default()));
    session.start(&hooks);

    dispatch_from_here(&hooks);

    let entries = session.entries();
    let caller = &entries[0].caller;
    assert_eq!(caller.function, "dispatch_from_here");
    assert_eq!(caller.container, None);
    assert_eq!(caller.file.as_deref(), Some("caller_attribution_tests.rs"));
    assert!(caller.line.is_some());
}

#[test]
fn test_method_caller_reports_container() {
    let hooks = Rc::new(HookTable::new());
    hooks.add_action("save_post", 10, || {});
    let session = Rc::new(MonitorSession::new(MonitorConfig::default()));
    session.start(hooks.as_ref());

    let editor = Editor {
        hooks: Rc::clone(&hooks),
    };
    editor.save();

    let entries = session.entries();
    assert_eq!(entries[0].caller.function, "save");
    assert_eq!(entries[0].caller.container.as_deref(), Some("Editor"));
    assert!(entries[0]
        .caller
        .to_string()
        .starts_with("Editor::save in caller_attribution_tests.rs (line "));
}

#[test]
fn test_file_is_basename_only() {
    let hooks = HookTable::new();
    hooks.add_filter("the_title", 10, |v| v);
    let session = Rc::new(MonitorSession::new(MonitorConfig::default()));
    session.start(&hooks);

    hooks.apply_filters("the_title", json!("t"));

    let entries = session.entries();
    if let Some(file) = &entries[0].caller.file {
        assert!(!file.contains('/'));
        assert!(!file.contains('\\'));
    }
}

#[test]
fn test_direct_resolution_finds_calling_function() {
    let resolver = BacktraceResolver::new();
    let caller = resolve_from_here(&resolver, 0);
    assert_eq!(caller.function, "resolve_from_here");
}

#[test]
fn test_skip_frames_moves_outward() {
    let resolver = BacktraceResolver::new();
    let caller = resolve_from_here(&resolver, 1);
    assert_eq!(caller.function, "test_skip_frames_moves_outward");
}

#[test]
fn test_truncated_stack_is_blank() {
    let resolver = BacktraceResolver::new().with_max_depth(1);
    assert!(resolve_from_here(&resolver, 0).is_blank());
}

#[test]
fn test_extra_ignored_prefix_skips_helpers() {
    let resolver = BacktraceResolver::new().ignoring(["caller_attribution_tests::resolve_from_here"]);
    let caller = resolve_from_here(&resolver, 0);
    assert_eq!(caller.function, "test_extra_ignored_prefix_skips_helpers");
}

#[test]
fn test_disabled_resolution_is_blank() {
    let hooks = HookTable::new();
    hooks.add_action("init", 10, || {});
    let session = Rc::new(MonitorSession::new(MonitorConfig::default().without_callers()));
    session.start(&hooks);

    dispatch_from_here_init(&hooks);
    assert!(session.entries()[0].caller.is_blank());
}

#[inline(never)]
fn dispatch_from_here_init(hooks: &HookTable) {
    hooks.do_action("init");
}
