//! Property-based tests for the recorder core
//!
//! Properties:
//! 1. Mocked entry/exit pairs yield exactly the simulated duration
//! 2. build_report is a stable, idempotent descending sort
//! 3. Filter wrappers never change the value flowing through
//! 4. Every dispatch of an instrumented hook yields exactly one entry

use hookmon::caller::{CallerInfo, NoopResolver};
use hookmon::config::MonitorConfig;
use hookmon::registry::{HookKind, HookTable};
use hookmon::report::{build_report, display_ms};
use hookmon::session::{LogEntry, MonitorSession};
use hookmon::timer::{Clock, ManualClock};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::rc::Rc;

fn manual_session() -> (Rc<ManualClock>, Rc<MonitorSession>) {
    let clock = Rc::new(ManualClock::new());
    let session = Rc::new(
        MonitorSession::new(MonitorConfig::default())
            .with_clock(Rc::clone(&clock) as Rc<dyn Clock>)
            .with_resolver(Box::new(NoopResolver)),
    );
    (clock, session)
}

fn entry(index: usize, micros: u64) -> LogEntry {
    LogEntry {
        hook_name: format!("hook_{}", index),
        kind: HookKind::Action,
        timestamp: index as f64,
        duration_seconds: micros as f64 / 1_000_000.0,
        caller: CallerInfo::blank(),
    }
}

fn json_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,12}".prop_map(Value::String),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(|v| json!(v)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_durations_match_mocked_clock(
        work_us in prop::collection::vec(0u64..2_000_000, 1..12),
    ) {
        let (clock, session) = manual_session();
        let hooks = HookTable::new();
        for (i, us) in work_us.iter().enumerate() {
            let clock = Rc::clone(&clock);
            let us = *us;
            hooks.add_action(&format!("hook_{}", i), 10, move || {
                clock.advance(std::time::Duration::from_micros(us));
            });
        }

        session.start(&hooks);
        for i in 0..work_us.len() {
            hooks.do_action(&format!("hook_{}", i));
        }

        let entries = session.entries();
        prop_assert_eq!(entries.len(), work_us.len());
        for (entry, us) in entries.iter().zip(&work_us) {
            let expected = *us as f64 / 1_000_000.0;
            prop_assert!((entry.duration_seconds - expected).abs() < 1e-9);
            prop_assert!(entry.duration_seconds >= 0.0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_report_is_stable_descending_sort(
        micros in prop::collection::vec(0u64..5, 0..30),
    ) {
        let entries: Vec<_> = micros.iter().enumerate().map(|(i, us)| entry(i, *us)).collect();
        let report = build_report(&entries);

        prop_assert_eq!(report.len(), entries.len());
        for pair in report.windows(2) {
            prop_assert!(pair[0].duration_seconds >= pair[1].duration_seconds);
            if pair[0].duration_seconds == pair[1].duration_seconds {
                // Original index is encoded in the timestamp
                prop_assert!(pair[0].timestamp < pair[1].timestamp);
            }
        }
        prop_assert_eq!(build_report(&report), report);
    }

    #[test]
    fn prop_filter_values_pass_through(value in json_value()) {
        let (_clock, session) = manual_session();
        let hooks = HookTable::new();
        hooks.add_filter("option_siteurl", 10, |v| v);

        session.start(&hooks);
        let out = hooks.apply_filters("option_siteurl", value.clone());
        prop_assert_eq!(out, value);
        prop_assert_eq!(session.entries().len(), 1);
    }

    #[test]
    fn prop_display_ms_has_two_decimals(micros in 0u64..10_000_000) {
        let ms = display_ms(micros as f64 / 1_000_000.0);
        let scaled = ms * 100.0;
        prop_assert!((scaled - scaled.round()).abs() < 1e-6);
    }

    #[test]
    fn prop_one_entry_per_dispatch(dispatches in prop::collection::vec(0usize..3, 0..40)) {
        let (_clock, session) = manual_session();
        let hooks = HookTable::new();
        let names = ["init", "wp_head", "the_content"];
        hooks.add_action(names[0], 10, || {});
        hooks.add_action(names[1], 10, || {});
        hooks.add_filter(names[2], 10, |v| v);

        session.start(&hooks);
        for &i in &dispatches {
            if i == 2 {
                hooks.apply_filters(names[i], json!("x"));
            } else {
                hooks.do_action(names[i]);
            }
        }

        let recorded: Vec<String> = session.entries().iter().map(|e| e.hook_name.clone()).collect();
        let expected: Vec<String> = dispatches.iter().map(|&i| names[i].to_string()).collect();
        prop_assert_eq!(recorded, expected);
    }
}
