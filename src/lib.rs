//! hookmon - hook instrumentation recorder
//!
//! Attaches entry/exit wrappers to every hook of an extensible callback
//! registry, times each dispatch, attributes it to the code that triggered
//! it, and reports the slowest hooks.
//!
//! ```
//! use hookmon::registry::HookTable;
//! use hookmon::report::build_report;
//! use hookmon::session::MonitorSession;
//! use std::rc::Rc;
//!
//! let hooks = HookTable::new();
//! hooks.add_action("save_post", 10, || {});
//!
//! let session = Rc::new(MonitorSession::default());
//! session.start(&hooks);
//! hooks.do_action("save_post");
//!
//! let report = build_report(&session.entries());
//! assert_eq!(report[0].hook_name, "save_post");
//! ```

pub mod caller;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod html_output;
pub mod interceptor;
pub mod json_output;
pub mod profiling;
pub mod registry;
pub mod report;
pub mod scenario;
pub mod session;
pub mod stats;
pub mod timer;
pub mod trigger;
