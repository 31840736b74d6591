//! The tour script: five steps in fixed order.
//!
//! Each step has a target selector, popover content, an optional advance
//! action (run when the user presses the popover's "Next") and a completion
//! condition the controller awaits.
//!
//! 引导步骤定义。

use std::sync::{Arc, Mutex, PoisonError};

use lw_core::ports::{DocumentPort, DomEventKind, PalettePort, StateStorePort};
use lw_core::tour::predicates::{
    has_at_least_n_laps, is_running, latest_lap_color, latest_lap_color_changed_from,
    settings_open,
};
use lw_core::{PopoverAlign, PopoverContent, PopoverSide, StepId, TourConfig};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::change_watcher::{visible_content, wait_for_visible_content_change};
use super::dom_simulation::click_once;
use super::highlight_adapter::{AdapterSlot, HighlightAdapter};
use super::progress::safe_advance;
use super::state_actions::{add_lap_once, bump_latest_lap_color, ensure_running};
use super::waiters::{wait_for_event, wait_for_selector, wait_for_state, within, within_deadline};
use super::TourError;

/// Lap count the Lap step waits for: the lap opened on start plus one.
const LAPS_AFTER_LAP_STEP: usize = 2;

/// Collaborators shared by every step of one run.
pub struct StepDeps {
    pub store: Arc<dyn StateStorePort>,
    pub document: Arc<dyn DocumentPort>,
    pub palette: Arc<dyn PalettePort>,
    pub adapter: AdapterSlot,
    pub config: Arc<TourConfig>,
    /// Cancelled when the run ends; every advance task is bound to it.
    pub run_cancel: CancellationToken,
}

/// Lets an advance action fire once per step activation.
///
/// An activation is identified by the adapter's activation version; the
/// action is also refused while the driver shows a different step.
#[derive(Debug, Default)]
struct ActivationGuard {
    seen_version: Mutex<Option<u64>>,
}

impl ActivationGuard {
    fn try_enter(&self, adapter: Option<&HighlightAdapter>, step_index: usize) -> bool {
        let version = adapter.map_or(0, HighlightAdapter::activation_version);
        let active = adapter.map_or(0, HighlightAdapter::get_index);

        let mut seen = self
            .seen_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *seen == Some(version) || active != step_index {
            return false;
        }
        *seen = Some(version);
        true
    }
}

pub struct TourStep {
    id: StepId,
    target_selector: String,
    content: PopoverContent,
    guard: ActivationGuard,
    deps: Arc<StepDeps>,
}

impl TourStep {
    fn new(id: StepId, target_selector: &str, content: PopoverContent, deps: &Arc<StepDeps>) -> Self {
        Self {
            id,
            target_selector: target_selector.to_string(),
            content,
            guard: ActivationGuard::default(),
            deps: deps.clone(),
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.id.index()
    }

    pub fn target_selector(&self) -> &str {
        &self.target_selector
    }

    pub fn content(&self) -> &PopoverContent {
        &self.content
    }

    /// The Settings step has no advance action; the driver's own "Done"
    /// handles it.
    pub fn has_advance_action(&self) -> bool {
        self.id != StepId::Settings
    }

    /// Run the advance action for the popover's "Next".
    ///
    /// Synchronous store work happens inline; everything that waits runs on
    /// a spawned task bound to the run's cancellation token. Repeated clicks
    /// within one activation are ignored.
    pub fn request_advance(&self) {
        if !self.has_advance_action() {
            return;
        }
        let adapter = self.deps.adapter.get();
        if !self.guard.try_enter(adapter.as_ref(), self.index()) {
            trace!(step = ?self.id, "advance already handled for this activation");
            return;
        }
        debug!(step = ?self.id, "advance requested");

        let deps = self.deps.clone();
        match self.id {
            StepId::Start => {
                ensure_running(deps.store.as_ref());
                spawn_advance(advance_start(deps));
            }
            StepId::Lap => {
                add_lap_once(deps.store.as_ref());
                spawn_advance(advance_lap(deps));
            }
            StepId::Group => spawn_advance(advance_group(deps)),
            StepId::SwitchTime => spawn_advance(advance_switch_time(deps)),
            StepId::Settings => {}
        }
    }

    /// Wait until the user (or the advance action) satisfied this step.
    pub async fn await_completion(&self, cancel: &CancellationToken) -> Result<(), TourError> {
        let deps = self.deps.as_ref();
        let document = deps.document.as_ref();
        let store = deps.store.as_ref();
        let selectors = &deps.config.selectors;

        match self.id {
            StepId::Start => wait_for_state(store, is_running, cancel).await?,
            StepId::Lap => {
                wait_for_state(store, has_at_least_n_laps(LAPS_AFTER_LAP_STEP), cancel).await?
            }
            StepId::Group => {
                wait_for_selector(document, &selectors.latest_lap, cancel).await?;
                let baseline = latest_lap_color(&store.get_state());
                wait_for_state(store, latest_lap_color_changed_from(baseline), cancel).await?;
            }
            StepId::SwitchTime => {
                let timer = wait_for_selector(document, &selectors.timer_display, cancel).await?;
                wait_for_event(
                    document,
                    timer,
                    &[DomEventKind::Click, DomEventKind::KeyDown],
                    cancel,
                )
                .await?;
            }
            StepId::Settings => {
                let button = wait_for_selector(document, &selectors.open_settings, cancel).await?;
                tokio::select! {
                    clicked = wait_for_event(document, button, &[DomEventKind::Click], cancel) => clicked?,
                    opened = wait_for_state(store, settings_open, cancel) => opened?,
                }
                if let Some(adapter) = deps.adapter.get() {
                    adapter.teardown();
                }
            }
        }
        Ok(())
    }
}

/// Build the tour script over `deps`.
pub fn build_steps(deps: Arc<StepDeps>) -> Vec<Arc<TourStep>> {
    let selectors = &deps.config.selectors;
    vec![
        TourStep::new(
            StepId::Start,
            &selectors.play_or_pause,
            PopoverContent::new(
                "Start",
                "Tap Play to start the stopwatch. After starting, the Pause and Lap buttons will appear.",
                PopoverSide::Bottom,
                PopoverAlign::Center,
            ),
            &deps,
        ),
        TourStep::new(
            StepId::Lap,
            &selectors.lap_button,
            PopoverContent::new(
                "Lap",
                "Tap Lap to record the current lap. An entry will be added to the list.",
                PopoverSide::Top,
                PopoverAlign::Center,
            ),
            &deps,
        ),
        TourStep::new(
            StepId::Group,
            &selectors.latest_lap,
            PopoverContent::new(
                "Grouping Attempts",
                "Each Lap shows its number on the left, the total time in the center and the lap time on the right. \
                 Swipe the top Lap or press the ← / → keys to change its color and group your sets.",
                PopoverSide::Right,
                PopoverAlign::Center,
            ),
            &deps,
        ),
        TourStep::new(
            StepId::SwitchTime,
            &selectors.timer_display,
            PopoverContent::new(
                "Switching Time",
                "Tap the large timer to switch modes: total time, last lap, and countdown to the signal.",
                PopoverSide::Bottom,
                PopoverAlign::Center,
            ),
            &deps,
        ),
        TourStep::new(
            StepId::Settings,
            &selectors.open_settings,
            PopoverContent::new(
                "Settings",
                "Here you can configure Sound Notification, Change Time by Tap, Keep Screen On, and the theme color.",
                PopoverSide::Left,
                PopoverAlign::Center,
            ),
            &deps,
        ),
    ]
    .into_iter()
    .map(Arc::new)
    .collect()
}

fn spawn_advance<F>(task: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => warn!("no async runtime available, advance dropped"),
    }
}

/// Advance the highlight past `step` unless the run already ended.
fn advance_from(deps: &StepDeps, step: StepId) {
    if deps.run_cancel.is_cancelled() {
        trace!(?step, "run ended, advance skipped");
        return;
    }
    safe_advance(deps.adapter.get().as_ref(), step.index());
}

/// Wait (bounded) for the Lap button that appears once running, then move on
/// regardless.
async fn advance_start(deps: Arc<StepDeps>) {
    let document = deps.document.as_ref();
    let selector = deps.config.selectors.lap_button.as_str();

    let appeared = within(&deps.run_cancel, deps.config.timeouts.appear(), |token| async move {
        wait_for_selector(document, selector, &token).await
    })
    .await;
    if let Err(err) = appeared {
        debug!(error = %err, "lap button not seen, advancing anyway");
    }
    advance_from(&deps, StepId::Start);
}

/// Wait (bounded) for the new lap to show up in the DOM or the store, then
/// move on regardless.
async fn advance_lap(deps: Arc<StepDeps>) {
    let document = deps.document.as_ref();
    let store = deps.store.as_ref();
    let selector = deps.config.selectors.latest_lap.as_str();

    let recorded = within(
        &deps.run_cancel,
        deps.config.timeouts.lap_dom_or_state(),
        |token| async move {
            tokio::select! {
                found = wait_for_selector(document, selector, &token) => found.map(|_| ()),
                reached = wait_for_state(store, has_at_least_n_laps(LAPS_AFTER_LAP_STEP), &token) => reached,
            }
        },
    )
    .await;
    if let Err(err) = recorded {
        debug!(error = %err, "new lap not observed, advancing anyway");
    }
    advance_from(&deps, StepId::Lap);
}

/// Recolor the latest lap and only advance once the store reflects it.
async fn advance_group(deps: Arc<StepDeps>) {
    match recolor_latest_lap(&deps).await {
        Ok(()) => advance_from(&deps, StepId::Group),
        Err(err) if err.is_cancelled() => trace!("group advance cancelled"),
        Err(err) => warn!(error = %err, "group step could not recolor the latest lap"),
    }
}

async fn recolor_latest_lap(deps: &StepDeps) -> Result<(), TourError> {
    let store = deps.store.as_ref();
    wait_for_selector(
        deps.document.as_ref(),
        &deps.config.selectors.latest_lap,
        &deps.run_cancel,
    )
    .await?;

    let initial = latest_lap_color(&store.get_state()).ok_or(TourError::MissingLatestLap)?;
    bump_latest_lap_color(store, deps.palette.as_ref());
    wait_for_state(store, latest_lap_color_changed_from(Some(initial)), &deps.run_cancel).await?;
    Ok(())
}

/// Click the timer once, give the display a moment to switch, then move on
/// regardless. Both waits share one deadline.
async fn advance_switch_time(deps: Arc<StepDeps>) {
    let document = deps.document.as_ref();
    let selector = deps.config.selectors.timer_display.as_str();
    let deadline = Instant::now() + deps.config.timeouts.watch_switch();

    let timer = match within_deadline(&deps.run_cancel, deadline, |token| async move {
        wait_for_selector(document, selector, &token).await
    })
    .await
    {
        Ok(timer) => Some(timer),
        Err(_) => document.query_selector(selector),
    };

    match timer {
        Some(timer) => {
            let snapshot = visible_content(document, timer);
            click_once(document, timer);
            let snapshot = snapshot.as_str();
            let switched = within_deadline(&deps.run_cancel, deadline, |token| async move {
                wait_for_visible_content_change(document, timer, snapshot, &token).await
            })
            .await;
            if let Err(err) = switched {
                debug!(error = %err, "timer display did not switch, advancing anyway");
            }
        }
        None => debug!("timer display missing, advancing anyway"),
    }
    advance_from(&deps, StepId::SwitchTime);
}
