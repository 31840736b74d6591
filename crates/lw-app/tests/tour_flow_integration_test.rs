//! End-to-end tour runs against the headless page, store and driver.

use std::sync::Arc;
use std::time::Duration;

use lw_app::usecases::tour::dom_simulation::keydown;
use lw_app::{TourController, TourDeps};
use lw_core::config::DEFAULT_STORAGE_KEY;
use lw_core::ports::{DocumentPort, KeyValueStoragePort, StateStorePort, TourProgressPort};
use lw_core::tour::predicates::latest_lap_color;
use lw_core::{
    PersistedTourState, SkipReason, StartOptions, StopwatchStatus, StoreAction, TourConfig,
    TourOutcome,
};
use lw_infra::palette::StaticPalette;
use lw_infra::storage::{FileKeyValueStorage, InMemoryKeyValueStorage};
use lw_infra::store::InMemoryAppStore;
use lw_infra::TourProgressRepository;
use lw_platform::{
    DriverBuild, HeadlessDocument, HeadlessDriver, HeadlessHighlightLibrary,
    HeadlessStopwatchPage, TimerMode,
};
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct Harness {
    document: Arc<HeadlessDocument>,
    store: Arc<InMemoryAppStore>,
    progress: Arc<TourProgressRepository>,
    library: Arc<HeadlessHighlightLibrary>,
    page: HeadlessStopwatchPage,
    controller: TourController,
}

impl Harness {
    fn new(build: DriverBuild) -> Self {
        Self::with_storage(build, Arc::new(InMemoryKeyValueStorage::new()))
    }

    fn with_storage(build: DriverBuild, storage: Arc<dyn KeyValueStoragePort>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let config = TourConfig::default();
        let document = Arc::new(HeadlessDocument::with_frame_interval(config.frame_interval()));
        let store = Arc::new(InMemoryAppStore::new());
        let palette = Arc::new(StaticPalette::from_config(&config));
        let progress = Arc::new(TourProgressRepository::new(
            storage,
            config.storage_key.clone(),
        ));
        let library = Arc::new(HeadlessHighlightLibrary::new(build));
        let page = HeadlessStopwatchPage::mount(document.clone(), store.clone(), palette.clone());

        let controller = TourController::new(TourDeps {
            store: store.clone(),
            document: Some(document.clone()),
            palette,
            progress: progress.clone(),
            library: library.clone(),
            config,
        });

        Self {
            document,
            store,
            progress,
            library,
            page,
            controller,
        }
    }

    fn spawn_start(&self, options: StartOptions) -> JoinHandle<TourOutcome> {
        let controller = self.controller.clone();
        tokio::spawn(async move { controller.start(options).await })
    }

    /// Wait until the driver shows step `index`, then let the run settle.
    async fn step(&self, index: usize) -> Arc<HeadlessDriver> {
        eventually(|| {
            self.library
                .last_driver()
                .is_some_and(|driver| driver.active() == Some(index))
        })
        .await;
        self.library.last_driver().unwrap()
    }

    fn laps(&self) -> usize {
        self.store.get_state().stopwatch.laps.len()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            settle().await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Press "Next" through the first four steps and open settings on the last.
async fn click_through(h: &Harness) -> TourOutcome {
    let run = h.spawn_start(StartOptions::default());

    h.step(0).await.click_next();
    let driver = h.step(1).await;
    assert_eq!(h.store.get_state().stopwatch.status, StopwatchStatus::Running);
    assert_eq!(h.laps(), 1);

    driver.click_next();
    h.step(2).await;
    assert_eq!(h.laps(), 2);

    driver.click_next();
    h.step(3).await;
    assert_eq!(latest_lap_color(&h.store.get_state()), Some(1));

    driver.click_next();
    h.step(4).await;
    assert_eq!(h.page.timer_mode(), TimerMode::LastLap);
    assert!(h.progress.is_completed());

    h.document.click(h.page.open_settings_button());
    run.await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn scripted_user_completes_the_tour() {
    let h = Harness::new(DriverBuild::Modern);

    let outcome = click_through(&h).await;

    assert_eq!(outcome, TourOutcome::Completed);
    assert!(h.store.get_state().settings.is_open);
    assert!(h.library.last_driver().unwrap().is_destroyed());
    assert!(!h.controller.is_running());
    assert_eq!(h.document.document_listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn legacy_driver_build_completes_the_tour() {
    let h = Harness::new(DriverBuild::Legacy);

    let outcome = click_through(&h).await;

    assert_eq!(outcome, TourOutcome::Completed);
    assert!(h.library.last_driver().unwrap().is_destroyed());
    assert!(!h.controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn user_gestures_complete_steps_without_next() {
    let h = Harness::new(DriverBuild::Modern);
    let run = h.spawn_start(StartOptions::default());
    h.step(0).await;

    let play = h.document.query_selector(r#"[data-tour="play"]"#).unwrap();
    h.document.click(play);
    h.step(1).await;

    let add_lap = h.document.query_selector(r#"[data-tour="add-lap"]"#).unwrap();
    h.document.click(add_lap);
    h.step(2).await;

    let latest = h
        .document
        .query_selector(r#"[data-tour="lap-item-latest"]"#)
        .unwrap();
    h.document.focus(latest);
    h.document.press_key("ArrowRight");
    h.step(3).await;

    keydown(h.document.as_ref(), h.page.timer_display(), "Enter");
    h.step(4).await;
    assert_eq!(h.page.timer_mode(), TimerMode::LastLap);

    h.document.click(h.page.open_settings_button());
    assert_eq!(run.await.unwrap(), TourOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn completed_tour_is_not_started_again() {
    let h = Harness::new(DriverBuild::Modern);
    h.progress.save(&PersistedTourState::completed());

    assert!(h.controller.maybe_start().is_none());
    assert_eq!(
        h.controller.start(StartOptions::default()).await,
        TourOutcome::Skipped(SkipReason::AlreadyCompleted)
    );
    assert_eq!(h.library.module_loads(), 0);

    let forced = h.spawn_start(StartOptions::forced());
    h.step(0).await;
    h.controller.stop();
    assert_eq!(forced.await.unwrap(), TourOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn maybe_start_runs_a_fresh_tour() {
    let h = Harness::new(DriverBuild::Modern);

    let run = h.controller.maybe_start().unwrap();
    h.step(0).await;
    assert!(h.controller.is_running());

    h.controller.stop();
    assert_eq!(run.await.unwrap(), TourOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn second_start_is_skipped_while_running() {
    let h = Harness::new(DriverBuild::Modern);
    let first = h.spawn_start(StartOptions::default());
    h.step(0).await;

    assert_eq!(
        h.controller.start(StartOptions::forced()).await,
        TourOutcome::Skipped(SkipReason::AlreadyRunning)
    );
    assert_eq!(h.library.drivers_created(), 1);

    h.controller.stop();
    assert_eq!(first.await.unwrap(), TourOutcome::Cancelled);
    assert!(!h.controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn escape_closes_the_tour() {
    let h = Harness::new(DriverBuild::Modern);
    let run = h.spawn_start(StartOptions::default());
    let driver = h.step(0).await;

    h.document.press_key("Escape");

    assert_eq!(run.await.unwrap(), TourOutcome::Cancelled);
    assert!(driver.is_destroyed());
    assert!(!h.controller.is_running());
    assert!(!h.progress.is_completed());

    // Nothing left to stop.
    h.controller.stop();
    assert!(!h.controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn popover_close_button_cancels_mid_tour() {
    let h = Harness::new(DriverBuild::Modern);
    let run = h.spawn_start(StartOptions::default());
    h.step(0).await.click_next();
    let driver = h.step(1).await;

    driver.click_close();

    assert_eq!(run.await.unwrap(), TourOutcome::Cancelled);
    assert_eq!(h.laps(), 1);
    assert!(!h.progress.is_completed());
}

#[tokio::test(start_paused = true)]
async fn done_on_the_last_step_keeps_completion() {
    let h = Harness::new(DriverBuild::Modern);
    let run = h.spawn_start(StartOptions {
        force: false,
        start_index: 4,
    });
    let driver = h.step(4).await;
    assert!(h.progress.is_completed());

    driver.click_next();

    assert_eq!(run.await.unwrap(), TourOutcome::Cancelled);
    assert!(driver.is_destroyed());
    assert!(h.progress.is_completed());
}

#[tokio::test(start_paused = true)]
async fn legacy_close_button_ends_the_run_and_allows_restart() {
    let h = Harness::new(DriverBuild::Legacy);
    let run = h.spawn_start(StartOptions::default());
    let driver = h.step(0).await;

    driver.click_close();

    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should end after the vendor close button")
        .unwrap();
    assert_eq!(outcome, TourOutcome::Cancelled);
    assert!(driver.is_destroyed());
    assert!(!h.controller.is_running());
    assert_eq!(h.document.document_listener_count(), 0);

    let again = h.spawn_start(StartOptions::default());
    let second = h.step(0).await;
    assert_eq!(h.library.drivers_created(), 2);
    h.controller.stop();
    assert_eq!(again.await.unwrap(), TourOutcome::Cancelled);
    assert!(second.is_destroyed());
}

#[tokio::test(start_paused = true)]
async fn legacy_done_on_the_last_step_ends_the_run() {
    let h = Harness::new(DriverBuild::Legacy);
    let run = h.spawn_start(StartOptions {
        force: false,
        start_index: 4,
    });
    let driver = h.step(4).await;

    driver.click_next();

    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should end after Done")
        .unwrap();
    assert_eq!(outcome, TourOutcome::Cancelled);
    assert!(driver.is_destroyed());
    assert!(!h.controller.is_running());
    assert!(h.progress.is_completed());
}

#[tokio::test(start_paused = true)]
async fn settings_flag_alone_completes_the_last_step() {
    let h = Harness::new(DriverBuild::Modern);
    let run = h.spawn_start(StartOptions {
        force: false,
        start_index: 4,
    });
    let driver = h.step(4).await;

    h.store.dispatch(StoreAction::OpenSettings);

    assert_eq!(run.await.unwrap(), TourOutcome::Completed);
    assert!(driver.is_destroyed());
    assert!(!h.controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn start_index_is_clamped_to_the_last_step() {
    let h = Harness::new(DriverBuild::Modern);
    let run = h.spawn_start(StartOptions {
        force: false,
        start_index: 42,
    });
    h.step(4).await;

    h.document.click(h.page.open_settings_button());

    assert_eq!(run.await.unwrap(), TourOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn missing_first_target_skips_on_stop() {
    let h = Harness::new(DriverBuild::Modern);
    // The Group step targets the latest lap, which does not exist yet.
    let run = h.spawn_start(StartOptions {
        force: false,
        start_index: 2,
    });
    eventually(|| h.controller.is_running()).await;

    h.controller.stop();

    assert_eq!(
        run.await.unwrap(),
        TourOutcome::Skipped(SkipReason::TargetUnavailable)
    );
    assert_eq!(h.library.module_loads(), 0);
}

#[tokio::test(start_paused = true)]
async fn driver_load_failure_fails_the_run_and_allows_retry() {
    let h = Harness::new(DriverBuild::Modern);
    h.library.fail_next_module_load("offline");

    let outcome = h.controller.start(StartOptions::default()).await;

    assert_eq!(
        outcome,
        TourOutcome::Failed("failed to load highlight library: offline".to_string())
    );
    assert_eq!(h.library.drivers_created(), 0);
    assert!(!h.controller.is_running());

    let retry = h.spawn_start(StartOptions::default());
    h.step(0).await;
    h.controller.stop();
    assert_eq!(retry.await.unwrap(), TourOutcome::Cancelled);
    assert_eq!(h.library.module_loads(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_during_driver_load_tears_down_the_new_driver() {
    let h = Harness::new(DriverBuild::Modern);
    h.library.set_load_delay(Duration::from_millis(500));
    let run = h.spawn_start(StartOptions::default());
    eventually(|| h.controller.is_running()).await;

    h.controller.stop();

    assert_eq!(run.await.unwrap(), TourOutcome::Cancelled);
    if let Some(driver) = h.library.last_driver() {
        assert!(driver.is_destroyed());
    }
}

#[tokio::test]
async fn no_document_skips_the_tour() {
    let store = Arc::new(InMemoryAppStore::new());
    let controller = TourController::new(TourDeps {
        store: store.clone(),
        document: None,
        palette: Arc::new(StaticPalette::new(6)),
        progress: Arc::new(TourProgressRepository::with_defaults(Arc::new(
            InMemoryKeyValueStorage::new(),
        ))),
        library: Arc::new(HeadlessHighlightLibrary::new(DriverBuild::Modern)),
        config: TourConfig::default(),
    });

    assert_eq!(
        controller.start(StartOptions::forced()).await,
        TourOutcome::Skipped(SkipReason::NoDocument)
    );
    assert!(!controller.is_running());
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn completion_survives_a_restart() {
    let temp_dir = TempDir::new().unwrap();

    let first = Harness::with_storage(
        DriverBuild::Modern,
        Arc::new(FileKeyValueStorage::with_defaults(temp_dir.path())),
    );
    assert_eq!(click_through(&first).await, TourOutcome::Completed);

    let reopened = FileKeyValueStorage::with_defaults(temp_dir.path());
    assert_eq!(
        reopened.get_item(DEFAULT_STORAGE_KEY).unwrap().as_deref(),
        Some(r#"{"completed":true}"#)
    );

    let second = Harness::with_storage(DriverBuild::Modern, Arc::new(reopened));
    assert!(second.controller.maybe_start().is_none());
}
