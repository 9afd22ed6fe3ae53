//! Quiz Sentinel demo driver
//!
//! Replays a scripted quiz attempt against a simulated page so the whole
//! pipeline can be watched from a terminal: signals stream in, violations
//! accumulate, the cutoff marker fires, and the "host" flags the
//! participation record and tears the monitor down. The real quiz host does
//! the same thing with a browser-backed signal source.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use quiz_sentinel::{
    ActivityMonitor, BrowserSignal, KeyPress, MonitorConfig, SimulatedPage, ViewportMetrics,
    ViolationKind,
};

mod logging;

#[derive(Parser, Debug)]
#[command(name = "quiz-sentinel", version, about = "Scripted demo of the quiz activity monitor")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured violation cutoff threshold
    #[arg(long)]
    max_violations: Option<u32>,

    /// Extra violation kinds to inject after the scripted scenario
    /// (wire strings, e.g. PRINT_BLOCKED,WINDOW_CLOSE_ATTEMPT)
    #[arg(long, value_delimiter = ',')]
    inject: Vec<String>,

    /// Skip the dev-tools dock widening scene (it waits on the real poll
    /// timer, so the demo runs a couple of seconds longer with it)
    #[arg(long)]
    no_dev_tools_scene: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = logging::init()?;
    info!("🚀 Starting Quiz Sentinel demo v{}", env!("CARGO_PKG_VERSION"));

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if let Some(max_violations) = args.max_violations {
        config.max_violations = max_violations;
    }
    if let Err(errors) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", errors.join("; "));
    }
    info!("✅ Configuration loaded successfully");

    let injected = args
        .inject
        .iter()
        .map(|raw| ViolationKind::from_str(raw))
        .collect::<Result<Vec<_>, _>>()?;

    // Stands in for the participation record the host opens when the quiz
    // attempt begins; the fraud marking below is keyed by it.
    let attempt_id = Uuid::new_v4();
    info!("Opened participation record {}", attempt_id);

    let page = Arc::new(SimulatedPage::new());
    let monitor = ActivityMonitor::new(page.clone(), config);

    let cutoff_reached = Arc::new(AtomicBool::new(false));
    let cutoff_flag = Arc::clone(&cutoff_reached);
    let _violation_subscription = monitor.on_violation(move |violation, count| {
        warn!("🚨 Violation #{}: {} {}", count, violation.kind, violation.details);
        if violation.kind.is_cutoff_marker() {
            cutoff_flag.store(true, Ordering::SeqCst);
        }
    });
    let _activity_subscription = monitor.on_activity(|at| {
        debug!("👤 User activity at {}", at);
    });

    monitor.start();

    info!("--- Simulating a quiz attempt ---");
    page.emit(BrowserSignal::Click);
    page.emit(BrowserSignal::Scroll);
    sleep(Duration::from_millis(300)).await;

    page.emit(BrowserSignal::Copy);
    sleep(Duration::from_millis(300)).await;

    page.emit(BrowserSignal::VisibilityChange {
        hidden: true,
        visibility_state: "hidden".to_string(),
    });
    page.emit(BrowserSignal::VisibilityChange {
        hidden: false,
        visibility_state: "visible".to_string(),
    });
    sleep(Duration::from_millis(300)).await;

    if args.no_dev_tools_scene {
        page.emit(BrowserSignal::KeyDown(KeyPress::ctrl("c")));
    } else {
        info!("Docking dev tools (viewport narrows past the gap threshold)");
        page.set_viewport(ViewportMetrics {
            outer_width: 1440,
            outer_height: 900,
            inner_width: 1000,
            inner_height: 812,
        });
        // Give the poll timer one period to notice.
        sleep(Duration::from_millis(
            monitor.config().dev_tools_poll_interval_ms + 500,
        ))
        .await;
    }

    if cutoff_reached.load(Ordering::SeqCst) {
        info!(
            "Max violations reached - marking participation record {} as fraudulent",
            attempt_id
        );
        monitor.stop();
    }

    for kind in injected {
        monitor.test_violation(kind, serde_json::json!({}));
    }

    info!("--- Violation statistics ---");
    let stats = monitor.get_violation_stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    monitor.stop();
    info!("Demo completed");
    Ok(())
}
