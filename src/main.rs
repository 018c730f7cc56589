use anyhow::{bail, Context, Result};
use clap::Parser;
use hookmon::cli::{Cli, OutputFormat};
use hookmon::csv_output::CsvOutput;
use hookmon::html_output::HtmlOutput;
use hookmon::json_output::JsonOutput;
use hookmon::report::{build_report, format_text, report_rows};
use hookmon::scenario::{Scenario, ScenarioRunner, WorkMode};
use hookmon::session::MonitorSession;
use hookmon::stats::HookStatsTracker;
use hookmon::timer::{Clock, ManualClock, SystemClock};
use std::rc::Rc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
///
/// `RUST_LOG` wins when set; otherwise everything down to TRACE is shown.
fn init_tracing(debug: bool) {
    if debug {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(tracing::Level::TRACE.into()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn validate_args(args: &Cli) -> Result<()> {
    if !args.slow_threshold.is_finite() || args.slow_threshold < 0.0 {
        bail!(
            "Invalid value for --slow-threshold: {} (must be a non-negative number)",
            args.slow_threshold
        );
    }
    if args.template.is_some() && args.format != OutputFormat::Html {
        bail!("--template requires --format html");
    }
    Ok(())
}

/// Render the session's log in the requested format
fn render(args: &Cli, session: &MonitorSession) -> Result<String> {
    let threshold = session.config().slow_threshold_secs;
    let entries = session.snapshot();
    let stats = args
        .summary
        .then(|| HookStatsTracker::from_entries(&entries, threshold));

    let output = match args.format {
        OutputFormat::Text => match &stats {
            Some(tracker) => tracker.format_summary(),
            None => format_text(&report_rows(&entries, threshold, args.top)),
        },
        OutputFormat::Json => {
            let mut report = build_report(&entries);
            if let Some(top) = args.top {
                report.truncate(top);
            }
            JsonOutput::from_report(report, threshold).to_json()?
        }
        OutputFormat::Csv => CsvOutput::new(report_rows(&entries, threshold, args.top)).to_csv(),
        OutputFormat::Html => {
            let mut html = HtmlOutput::new(report_rows(&entries, threshold, args.top));
            if let Some(template) = &args.template {
                html = html.with_template_file(template)?;
            }
            html.to_html(stats.as_ref())
        }
    };
    Ok(output)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    validate_args(&args)?;

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let scenario = Scenario::from_file(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;

    let session = MonitorSession::new(args.monitor_config());
    let (session, work) = if args.simulate {
        let clock = Rc::new(ManualClock::starting_at(SystemClock::new().wall_clock()));
        let session = session.with_clock(Rc::clone(&clock) as Rc<dyn Clock>);
        (Rc::new(session), WorkMode::Simulated(clock))
    } else {
        (Rc::new(session), WorkMode::Sleep)
    };
    if args.profile_self {
        session.enable_profiling();
    }

    let outcome = ScenarioRunner::new(scenario, work).run(&session);
    if !outcome.started {
        eprintln!("hookmon: monitoring was not started (request not authorized or not requested)");
    }

    let rendering = Instant::now();
    let output = render(&args, &session)?;
    session.record_rendering(rendering);
    print!("{}", output);

    if let Some(profile) = session.take_profile() {
        profile.print_summary();
    }

    Ok(())
}
