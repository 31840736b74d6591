//! Headless demo: walks the onboarding tour with a scripted user.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lapwatch_lib::bootstrap::{init_tracing_subscriber, wire_headless, HeadlessApp, WiringOptions};
use lw_core::ports::{ElementRef, StateStorePort};
use lw_core::{StartOptions, StepId, TourConfig, TourOutcome};
use lw_infra::config::load_tour_config;
use lw_platform::{DriverBuild, HeadlessDocument, HeadlessHighlightLibrary};
use tracing::{debug, info};

const RUN_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Parser)]
#[command(
    name = "lapwatch",
    about = "Walk the lapwatch onboarding tour against a headless stopwatch page",
    version
)]
struct Cli {
    #[arg(long, env = "LAPWATCH_CONFIG", help = "TOML file with a [tour] table")]
    config: Option<PathBuf>,

    #[arg(
        long = "data-dir",
        env = "LAPWATCH_DATA_DIR",
        help = "Directory for persisted tour progress; in-memory when omitted"
    )]
    data_dir: Option<PathBuf>,

    #[arg(long, help = "Replay the tour even if it was completed")]
    force: bool,

    #[arg(long = "start-index", default_value_t = 0, help = "Step to start at")]
    start_index: usize,

    #[arg(
        long = "legacy-driver",
        help = "Use the legacy driver build (reset/close, no event bus)"
    )]
    legacy_driver: bool,

    #[arg(
        long = "pace-ms",
        default_value_t = 300,
        help = "Scripted user think time per step, in milliseconds"
    )]
    pace_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_subscriber().context("Failed to initialize tracing")?;

    let config = match &cli.config {
        Some(path) => load_tour_config(path)?,
        None => TourConfig::default(),
    };
    let app = wire_headless(
        config,
        WiringOptions {
            storage_dir: cli.data_dir.clone(),
            driver_build: if cli.legacy_driver {
                DriverBuild::Legacy
            } else {
                DriverBuild::Modern
            },
        },
    )?;

    let options = StartOptions {
        force: cli.force,
        start_index: cli.start_index,
    };
    let run = if options == StartOptions::default() {
        match app.controller.maybe_start() {
            Some(run) => run,
            None => {
                println!("Tour already completed; pass --force to replay it.");
                return Ok(());
            }
        }
    } else {
        let controller = app.controller.clone();
        tokio::spawn(async move { controller.start(options).await })
    };

    let user = tokio::spawn(scripted_user(
        UserHandles {
            document: app.document.clone(),
            library: app.library.clone(),
            open_settings: app.page.open_settings_button(),
        },
        Duration::from_millis(cli.pace_ms),
    ));
    let outcome = tokio::time::timeout(RUN_TIMEOUT, run)
        .await
        .context("Tour did not finish in time")?
        .context("Tour task panicked")?;
    user.abort();

    report(&app, &outcome);
    Ok(())
}

/// What the scripted user needs from the app.
struct UserHandles {
    document: Arc<HeadlessDocument>,
    library: Arc<HeadlessHighlightLibrary>,
    open_settings: ElementRef,
}

/// Reads each popover, then presses "Next"; on the last step opens settings
/// the way the popover asks.
async fn scripted_user(handles: UserHandles, pace: Duration) {
    let mut handled = None;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let Some(driver) = handles.library.last_driver() else {
            continue;
        };
        if driver.is_destroyed() {
            continue;
        }
        let Some(index) = driver.active() else {
            continue;
        };
        if handled == Some(index) {
            continue;
        }

        tokio::time::sleep(pace).await;
        if let Some(step) = driver.options().steps.get(index) {
            info!(index, title = %step.popover.title, "user reads step");
        }
        if index == StepId::Settings.index() {
            debug!("user opens settings");
            handles.document.click(handles.open_settings);
        } else {
            debug!(index, "user presses next");
            driver.click_next();
        }
        handled = Some(index);
    }
}

fn report(app: &HeadlessApp, outcome: &TourOutcome) {
    let state = app.store.get_state();
    println!("Tour outcome: {outcome:?}");
    println!(
        "Stopwatch: {:?}, {} lap(s), settings open: {}",
        state.stopwatch.status,
        state.stopwatch.laps.len(),
        state.settings.is_open
    );
    println!("Timer mode: {:?}", app.page.timer_mode());
}
