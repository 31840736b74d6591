//! Headless stopwatch page
//!
//! Renders the stopwatch screen into a [`HeadlessDocument`] and keeps it in
//! sync with the application store. The markup carries the same
//! `data-tour` hooks the browser UI does, so the tour can target it.
//!
//! ```text
//! <header>
//!   <div data-tour="timer-display" aria-label="Total time">00:00.00</div>
//!   <button data-tour="open-settings">
//! <div data-role="controls">   play | pause + add-lap | play + reset
//! <ol data-role="laps">        newest first, the first item is lap-item-latest
//! <div data-tour="settings-dialog">   while settings are open
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use lw_core::ports::{
    DocumentPort, DomEvent, DomEventKind, ElementRef, EventListener, PalettePort, StateStorePort,
    Subscription,
};
use lw_core::tour::predicates::cyclic_index;
use lw_core::{Lap, StopwatchStatus, StoreAction};
use tracing::{debug, trace};

use crate::document::HeadlessDocument;

/// What the large timer shows. Tapping it cycles through the modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    #[default]
    Total,
    LastLap,
    Countdown,
}

impl TimerMode {
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Total => "Total time",
            TimerMode::LastLap => "Last lap time",
            TimerMode::Countdown => "Countdown to signal",
        }
    }

    fn next(self) -> Self {
        match self {
            TimerMode::Total => TimerMode::LastLap,
            TimerMode::LastLap => TimerMode::Countdown,
            TimerMode::Countdown => TimerMode::Total,
        }
    }
}

/// An element the page created, with the listeners bound to it.
struct Mounted {
    element: ElementRef,
    _listeners: Vec<Subscription>,
}

#[derive(Default)]
struct PageView {
    timer_mode: TimerMode,
    rendered_status: Option<StopwatchStatus>,
    controls: Vec<Mounted>,
    laps: Vec<(u64, Mounted)>,
    settings_dialog: Option<Mounted>,
    _static_listeners: Vec<Subscription>,
    _store_subscription: Option<Subscription>,
}

struct PageInner {
    document: Arc<HeadlessDocument>,
    store: Arc<dyn StateStorePort>,
    palette: Arc<dyn PalettePort>,
    timer_display: ElementRef,
    open_settings: ElementRef,
    controls: ElementRef,
    lap_list: ElementRef,
    view: Mutex<PageView>,
}

/// The stopwatch screen, mounted into a headless document.
pub struct HeadlessStopwatchPage {
    inner: Arc<PageInner>,
}

impl HeadlessStopwatchPage {
    /// Build the static markup, subscribe to the store and render the
    /// current state.
    pub fn mount(
        document: Arc<HeadlessDocument>,
        store: Arc<dyn StateStorePort>,
        palette: Arc<dyn PalettePort>,
    ) -> Self {
        let header = document.append_element(None, "header", &[]);
        let timer_display = document.append_element(
            Some(header),
            "div",
            &[
                ("data-tour", "timer-display"),
                ("role", "button"),
                ("tabindex", "0"),
                ("aria-label", TimerMode::Total.label()),
            ],
        );
        document.set_text(timer_display, "00:00.00");
        let open_settings = document.append_element(
            Some(header),
            "button",
            &[("data-tour", "open-settings"), ("aria-label", "Settings")],
        );
        let controls = document.append_element(None, "div", &[("data-role", "controls")]);
        let lap_list = document.append_element(None, "ol", &[("data-role", "laps")]);

        let inner = Arc::new(PageInner {
            document,
            store,
            palette,
            timer_display,
            open_settings,
            controls,
            lap_list,
            view: Mutex::new(PageView::default()),
        });
        inner.wire();
        inner.render();
        debug!("stopwatch page mounted");
        Self { inner }
    }

    pub fn document(&self) -> &Arc<HeadlessDocument> {
        &self.inner.document
    }

    pub fn timer_display(&self) -> ElementRef {
        self.inner.timer_display
    }

    pub fn open_settings_button(&self) -> ElementRef {
        self.inner.open_settings
    }

    pub fn timer_mode(&self) -> TimerMode {
        self.inner.lock_view().timer_mode
    }

    /// Rendered lap ids, in display order (newest first).
    pub fn rendered_laps(&self) -> Vec<u64> {
        self.inner.lock_view().laps.iter().map(|(id, _)| *id).collect()
    }
}

impl PageInner {
    fn lock_view(&self) -> MutexGuard<'_, PageView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wire(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let listeners = vec![
            self.document.add_event_listener(
                self.timer_display,
                DomEventKind::Click,
                bind(&weak, |page, _| page.cycle_timer_mode()),
            ),
            self.document.add_event_listener(
                self.timer_display,
                DomEventKind::KeyDown,
                bind(&weak, |page, event| {
                    if matches!(event.key.as_deref(), Some("Enter" | " ")) {
                        page.cycle_timer_mode();
                    }
                }),
            ),
            self.document.add_event_listener(
                self.open_settings,
                DomEventKind::Click,
                bind(&weak, |page, _| page.store.dispatch(StoreAction::OpenSettings)),
            ),
        ];

        let subscription = self.store.subscribe(Arc::new(move || {
            if let Some(page) = weak.upgrade() {
                page.render();
            }
        }));

        let mut view = self.lock_view();
        view._static_listeners = listeners;
        view._store_subscription = Some(subscription);
    }

    fn cycle_timer_mode(&self) {
        let mode = {
            let mut view = self.lock_view();
            view.timer_mode = view.timer_mode.next();
            view.timer_mode
        };
        trace!(?mode, "timer mode switched");
        self.document
            .set_attribute(self.timer_display, "aria-label", mode.label());
    }

    fn render(self: &Arc<Self>) {
        let mut view = self.lock_view();
        let state = self.store.get_state();

        if view.rendered_status != Some(state.stopwatch.status) {
            self.render_controls(&mut view, state.stopwatch.status);
        }
        self.render_laps(&mut view, &state.stopwatch.laps);
        self.render_settings(&mut view, state.settings.is_open);
    }

    fn render_controls(self: &Arc<Self>, view: &mut PageView, status: StopwatchStatus) {
        for mounted in view.controls.drain(..) {
            self.document.remove_element(mounted.element);
        }

        let buttons = match status {
            StopwatchStatus::Idle => vec![("play", StoreAction::Start)],
            StopwatchStatus::Running => {
                vec![("pause", StoreAction::Pause), ("add-lap", StoreAction::AddLap)]
            }
            StopwatchStatus::Paused => {
                vec![("play", StoreAction::Start), ("reset", StoreAction::Reset)]
            }
        };
        let weak = Arc::downgrade(self);
        for (hook, action) in buttons {
            let element =
                self.document
                    .append_element(Some(self.controls), "button", &[("data-tour", hook)]);
            let listener = self.document.add_event_listener(
                element,
                DomEventKind::Click,
                bind(&weak, move |page, _| page.store.dispatch(action.clone())),
            );
            view.controls.push(Mounted {
                element,
                _listeners: vec![listener],
            });
        }
        view.rendered_status = Some(status);
    }

    fn render_laps(self: &Arc<Self>, view: &mut PageView, laps: &[Lap]) {
        let wanted: Vec<u64> = laps.iter().rev().map(|lap| lap.id).collect();
        let rendered: Vec<u64> = view.laps.iter().map(|(id, _)| *id).collect();

        if wanted == rendered {
            for ((_, item), lap) in view.laps.iter().zip(laps.iter().rev()) {
                self.document
                    .set_attribute(item.element, "data-color", &lap.color_index.to_string());
            }
            return;
        }

        for (_, mounted) in view.laps.drain(..) {
            self.document.remove_element(mounted.element);
        }
        let weak = Arc::downgrade(self);
        for (position, lap) in laps.iter().rev().enumerate() {
            let id = lap.id.to_string();
            let color = lap.color_index.to_string();
            let mut attributes = vec![
                ("data-lap-id", id.as_str()),
                ("data-color", color.as_str()),
                ("tabindex", "0"),
            ];
            let latest = position == 0;
            if latest {
                attributes.push(("data-tour", "lap-item-latest"));
            }
            let element = self
                .document
                .append_element(Some(self.lap_list), "li", &attributes);
            self.document.set_text(element, &format!("Lap {}", lap.id));

            let mut listeners = Vec::new();
            if latest {
                let lap_id = lap.id;
                listeners.push(self.document.add_event_listener(
                    element,
                    DomEventKind::KeyDown,
                    bind(&weak, move |page, event| {
                        let delta = match event.key.as_deref() {
                            Some("ArrowLeft") => -1,
                            Some("ArrowRight") => 1,
                            _ => return,
                        };
                        page.recolor_lap(lap_id, delta);
                    }),
                ));
            }
            view.laps.push((
                lap.id,
                Mounted {
                    element,
                    _listeners: listeners,
                },
            ));
        }
    }

    fn render_settings(self: &Arc<Self>, view: &mut PageView, is_open: bool) {
        match (is_open, view.settings_dialog.is_some()) {
            (true, false) => {
                let dialog = self.document.append_element(
                    None,
                    "div",
                    &[("role", "dialog"), ("data-tour", "settings-dialog")],
                );
                let close = self.document.append_element(
                    Some(dialog),
                    "button",
                    &[("data-tour", "close-settings")],
                );
                let listener = self.document.add_event_listener(
                    close,
                    DomEventKind::Click,
                    bind(&Arc::downgrade(self), |page, _| {
                        page.store.dispatch(StoreAction::CloseSettings)
                    }),
                );
                view.settings_dialog = Some(Mounted {
                    element: dialog,
                    _listeners: vec![listener],
                });
            }
            (false, true) => {
                if let Some(mounted) = view.settings_dialog.take() {
                    self.document.remove_element(mounted.element);
                }
            }
            _ => {}
        }
    }

    fn recolor_lap(&self, lap_id: u64, delta: isize) {
        let state = self.store.get_state();
        let Some(lap) = state.stopwatch.laps.iter().find(|lap| lap.id == lap_id) else {
            return;
        };
        let palette_length = self.palette.palette_length();
        self.store.dispatch(StoreAction::SetLapColorIndex {
            id: lap_id,
            color_index: cyclic_index(lap.color_index, delta, palette_length),
            palette_length,
        });
    }
}

/// Event listener that runs `handler` while the page is alive.
fn bind(
    page: &Weak<PageInner>,
    handler: impl Fn(&Arc<PageInner>, &DomEvent) + Send + Sync + 'static,
) -> EventListener {
    let page = page.clone();
    Arc::new(move |event| {
        if let Some(page) = page.upgrade() {
            handler(&page, event);
        }
    })
}
