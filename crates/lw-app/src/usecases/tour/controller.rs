//! Tour controller.
//!
//! Owns at most one tour run at a time. A run waits for the first target,
//! builds the highlight adapter, then walks the steps awaiting each
//! completion condition. Cleanup is scoped to the run id, so a late
//! teardown from an earlier run never touches a newer one.
//!
//! 引导控制器：负责启动、推进与清理引导流程。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lw_core::ports::{
    DocumentPort, HighlightLibraryPort, PalettePort, StateStorePort, TourProgressPort,
};
use lw_core::tour::clamp_index;
use lw_core::{PersistedTourState, SkipReason, StartOptions, TourConfig, TourOutcome};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::adapter_loader::AdapterLoader;
use super::driver_options::to_driver_options;
use super::highlight_adapter::{AdapterSlot, HighlightAdapter};
use super::progress::safe_advance;
use super::steps::{build_steps, StepDeps, TourStep};
use super::waiters::wait_for_selector;
use super::TourError;

/// Collaborators for a [`TourController`].
pub struct TourDeps {
    pub store: Arc<dyn StateStorePort>,
    /// `None` outside a document environment; every start is skipped.
    pub document: Option<Arc<dyn DocumentPort>>,
    pub palette: Arc<dyn PalettePort>,
    pub progress: Arc<dyn TourProgressPort>,
    pub library: Arc<dyn HighlightLibraryPort>,
    pub config: TourConfig,
}

#[derive(Clone)]
pub struct TourController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    store: Arc<dyn StateStorePort>,
    document: Option<Arc<dyn DocumentPort>>,
    palette: Arc<dyn PalettePort>,
    progress: Arc<dyn TourProgressPort>,
    loader: AdapterLoader,
    config: Arc<TourConfig>,
    adapter: AdapterSlot,
    run: Mutex<TourRunState>,
}

#[derive(Debug, Default)]
struct TourRunState {
    is_running: bool,
    run_id: u64,
    cancel: Option<CancellationToken>,
}

/// Cleans up its run when the run future finishes or is dropped.
struct RunGuard {
    inner: Arc<ControllerInner>,
    run_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.inner.cleanup_run(self.run_id);
    }
}

impl TourController {
    pub fn new(deps: TourDeps) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                store: deps.store,
                document: deps.document,
                palette: deps.palette,
                progress: deps.progress,
                loader: AdapterLoader::new(deps.library),
                config: Arc::new(deps.config),
                adapter: AdapterSlot::default(),
                run: Mutex::new(TourRunState::default()),
            }),
        }
    }

    /// Run the tour to its end.
    ///
    /// Returns immediately with [`TourOutcome::Skipped`] when there is no
    /// document, a run is already active, or the tour was completed before
    /// and `options.force` is not set.
    pub async fn start(&self, options: StartOptions) -> TourOutcome {
        let Some(document) = self.inner.document.clone() else {
            debug!("no document, tour skipped");
            return TourOutcome::Skipped(SkipReason::NoDocument);
        };

        let (run_id, cancel) = match self.inner.begin_run(options.force) {
            Ok(run) => run,
            Err(reason) => {
                debug!(?reason, "tour start skipped");
                return TourOutcome::Skipped(reason);
            }
        };
        let _guard = RunGuard {
            inner: self.inner.clone(),
            run_id,
        };

        let span = info_span!(
            "usecase.tour.run",
            run_id,
            start_index = options.start_index,
            force = options.force
        );
        async {
            info!("tour started");
            let outcome = self
                .inner
                .clone()
                .run(run_id, cancel, document, options.start_index)
                .await;
            info!(?outcome, "tour finished");
            outcome
        }
        .instrument(span)
        .await
    }

    /// Start the tour in the background unless it was already completed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn maybe_start(&self) -> Option<JoinHandle<TourOutcome>> {
        if self.inner.progress.is_completed() {
            debug!("tour already completed");
            return None;
        }
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("maybe_start called outside a tokio runtime");
                return None;
            }
        };

        let controller = self.clone();
        Some(handle.spawn(async move { controller.start(StartOptions::default()).await }))
    }

    /// Cancel the active run, if any, and close its UI.
    pub fn stop(&self) {
        let run_id = self.inner.lock_run().run_id;
        self.inner.cleanup_run(run_id);
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_run().is_running
    }
}

impl ControllerInner {
    fn lock_run(&self) -> MutexGuard<'_, TourRunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_run(&self, force: bool) -> Result<(u64, CancellationToken), SkipReason> {
        let mut run = self.lock_run();
        if run.is_running {
            return Err(SkipReason::AlreadyRunning);
        }
        if !force && self.progress.is_completed() {
            return Err(SkipReason::AlreadyCompleted);
        }

        let cancel = CancellationToken::new();
        run.is_running = true;
        run.run_id += 1;
        run.cancel = Some(cancel.clone());
        Ok((run.run_id, cancel))
    }

    /// End run `run_id`: cancel its token and tear its adapter down.
    ///
    /// A no-op when that run already ended or a newer one owns the state.
    fn cleanup_run(&self, run_id: u64) {
        let (cancel, adapter) = {
            let mut run = self.lock_run();
            if !run.is_running || run.run_id != run_id {
                return;
            }
            run.is_running = false;
            (run.cancel.take(), self.adapter.take())
        };

        debug!(run_id, "cleaning up tour run");
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(adapter) = adapter {
            adapter.teardown();
        }
    }

    async fn run(
        self: Arc<Self>,
        run_id: u64,
        cancel: CancellationToken,
        document: Arc<dyn DocumentPort>,
        start_index: usize,
    ) -> TourOutcome {
        let steps = build_steps(Arc::new(StepDeps {
            store: self.store.clone(),
            document: document.clone(),
            palette: self.palette.clone(),
            adapter: self.adapter.clone(),
            config: self.config.clone(),
            run_cancel: cancel.clone(),
        }));
        if steps.is_empty() {
            return TourOutcome::Skipped(SkipReason::NoSteps);
        }
        let start_index = clamp_index(start_index, steps.len());

        if let Err(err) =
            wait_for_selector(document.as_ref(), steps[start_index].target_selector(), &cancel).await
        {
            debug!(error = %err, "first tour target never appeared");
            return TourOutcome::Skipped(SkipReason::TargetUnavailable);
        }

        let options = to_driver_options(&steps, &self.config.driver);
        let adapter = match self
            .loader
            .create_adapter(options, Some(document.clone()))
            .await
        {
            Ok(adapter) => adapter,
            Err(err) => {
                error!(error = %err, "failed to initialize tour driver");
                return TourOutcome::Failed(err.to_string());
            }
        };
        if cancel.is_cancelled() {
            adapter.teardown();
            return TourOutcome::Cancelled;
        }

        self.adapter.set(adapter.clone());
        let weak = Arc::downgrade(&self);
        adapter.on_destroyed(move || {
            if let Some(inner) = weak.upgrade() {
                inner.cleanup_run(run_id);
            }
        });
        adapter.on_step_change(|index| debug!(index, "tour step activated"));
        adapter.start(Some(start_index));

        self.walk(&steps, start_index, &adapter, &document, &cancel)
            .await
    }

    async fn walk(
        &self,
        steps: &[Arc<TourStep>],
        start_index: usize,
        adapter: &HighlightAdapter,
        document: &Arc<dyn DocumentPort>,
        cancel: &CancellationToken,
    ) -> TourOutcome {
        let last = steps.len() - 1;
        for (index, step) in steps.iter().enumerate().skip(start_index) {
            if index == last {
                self.progress.save(&PersistedTourState::completed());
                info!("tour marked completed");
            }

            if let Err(err) = reach_step(document.as_ref(), step, cancel).await {
                if cancel.is_cancelled() {
                    debug!(step = ?step.id(), "tour cancelled");
                    return TourOutcome::Cancelled;
                }
                warn!(step = ?step.id(), error = %err, "tour step failed");
                return TourOutcome::Failed(err.to_string());
            }
            debug!(step = ?step.id(), "tour step completed");

            if index == last {
                adapter.next();
                return TourOutcome::Completed;
            }
            safe_advance(Some(adapter), index);
        }
        TourOutcome::Completed
    }
}

async fn reach_step(
    document: &dyn DocumentPort,
    step: &TourStep,
    cancel: &CancellationToken,
) -> Result<(), TourError> {
    wait_for_selector(document, step.target_selector(), cancel).await?;
    step.await_completion(cancel).await
}
