//! Highlight adapter
//!
//! Wraps a [`HighlightDriverPort`] so the tour sees one stable surface no
//! matter which driver build is loaded:
//!
//! - a single "destroyed" notification, whichever way the popover went away
//!   (adapter teardown, vendor lifecycle event, Escape key);
//! - navigation helpers that tolerate missing methods;
//! - an activation version bumped whenever the active step index changes,
//!   which per-step advance guards key on.
//!
//! Nothing here panics or surfaces vendor errors to the caller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use lw_core::ports::{
    DocumentPort, DomEvent, DomEventKind, DriverCall, DriverCallback, DriverEventName,
    DriverMethod, HighlightDriverPort, LifecycleMethod, Subscription,
};
use tracing::{debug, trace};

pub type StepChangeCallback = Arc<dyn Fn(usize) + Send + Sync>;

type DestroyedCallback = Box<dyn FnOnce() + Send>;

/// Cheap, cloneable handle to one driver instance.
#[derive(Clone)]
pub struct HighlightAdapter {
    inner: Arc<AdapterInner>,
}

struct AdapterInner {
    driver: Arc<dyn HighlightDriverPort>,
    state: Mutex<AdapterState>,
}

#[derive(Default)]
struct AdapterState {
    destroyed: bool,
    on_destroyed: Vec<DestroyedCallback>,
    on_step_change: Option<StepChangeCallback>,
    activation_version: u64,
    last_index: usize,
    escape_listener: Option<Subscription>,
}

impl HighlightAdapter {
    /// Wrap `driver`, subscribe to its lifecycle and step events, and close
    /// on Escape when a document is available.
    pub fn attach(driver: Arc<dyn HighlightDriverPort>, document: Option<&dyn DocumentPort>) -> Self {
        let last_index = read_index(driver.as_ref());
        let inner = Arc::new(AdapterInner {
            driver,
            state: Mutex::new(AdapterState {
                last_index,
                ..Default::default()
            }),
        });
        inner.subscribe_driver_events();

        if let Some(document) = document {
            let weak = Arc::downgrade(&inner);
            let listener = document.add_document_listener(
                DomEventKind::KeyDown,
                Arc::new(move |event: &DomEvent| {
                    if !matches!(event.key.as_deref(), Some("Escape" | "Esc")) {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        debug!("escape pressed, closing tour");
                        inner.notify_destroyed();
                    }
                }),
            );
            let mut state = inner.lock_state();
            if state.destroyed {
                drop(state);
                drop(listener);
            } else {
                state.escape_listener = Some(listener);
            }
        }

        Self { inner }
    }

    /// Like [`attach`](Self::attach), and route the driver's own teardown
    /// hook (handed to it as `DriverOptions::on_destroyed`) to this adapter.
    pub fn attach_with_destroyed_hook(
        driver: Arc<dyn HighlightDriverPort>,
        document: Option<&dyn DocumentPort>,
        hook: &DestroyedHook,
    ) -> Self {
        let adapter = Self::attach(driver, document);
        hook.bind(&adapter);
        adapter
    }

    /// Render the tour at `index`, or at the driver's default step.
    pub fn start(&self, index: Option<usize>) {
        self.navigate(DriverCall::Drive(index));
    }

    pub fn next(&self) {
        self.navigate(DriverCall::MoveNext);
    }

    /// Step back using whichever spelling the driver build has.
    pub fn previous(&self) {
        for call in [
            DriverCall::MovePrevious,
            DriverCall::MovePrev,
            DriverCall::MoveBack,
        ] {
            if self.navigate(call) {
                return;
            }
        }
    }

    pub fn move_to(&self, index: usize) {
        self.navigate(DriverCall::MoveTo(index));
    }

    /// Active step index, `0` when the driver can't tell.
    pub fn get_index(&self) -> usize {
        read_index(self.inner.driver.as_ref())
    }

    pub fn activation_version(&self) -> u64 {
        self.inner.lock_state().activation_version
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lock_state().destroyed
    }

    /// Register a teardown callback. Callbacks chain; if the adapter is
    /// already destroyed the callback runs immediately.
    pub fn on_destroyed(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.lock_state();
        if state.destroyed {
            drop(state);
            callback();
        } else {
            state.on_destroyed.push(Box::new(callback));
        }
    }

    /// Replace the step-change listener.
    pub fn on_step_change(&self, callback: impl Fn(usize) + Send + Sync + 'static) {
        self.inner.lock_state().on_step_change = Some(Arc::new(callback));
    }

    /// Invoke a lifecycle method through the adapter.
    ///
    /// The destroyed notification fires before the driver is called. Returns
    /// whether the build exposes `method`.
    pub fn invoke_lifecycle(&self, method: LifecycleMethod) -> bool {
        self.inner.notify_destroyed();
        self.inner.call_lifecycle(method)
    }

    /// Close the tour UI.
    ///
    /// Prefers `destroy`; builds without it get the first of
    /// `reset`/`stop`/`close`/`cancel` they expose.
    pub fn teardown(&self) {
        self.inner.notify_destroyed();
        let supported = LifecycleMethod::ALL
            .into_iter()
            .find(|method| self.inner.driver.supports(DriverMethod::Lifecycle(*method)));
        match supported {
            Some(method) => {
                self.inner.call_lifecycle(method);
            }
            None => debug!("driver exposes no teardown method"),
        }
    }

    fn navigate(&self, call: DriverCall) -> bool {
        if !self.inner.driver.supports(call.method()) {
            return false;
        }
        if let Err(err) = self.inner.driver.call(call) {
            debug!(?call, error = %err, "driver navigation failed");
        }
        self.schedule_index_check();
        true
    }

    /// Re-read the active index once the driver has settled.
    ///
    /// Drivers update their index after the call returns, so the read runs
    /// on a follow-up task when a runtime is available.
    fn schedule_index_check(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let weak: Weak<AdapterInner> = Arc::downgrade(&self.inner);
                handle.spawn(async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.bump_on_index_change();
                    }
                });
            }
            Err(_) => self.inner.bump_on_index_change(),
        }
    }
}

impl AdapterInner {
    fn lock_state(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe_driver_events(self: &Arc<Self>) {
        if !self.driver.supports(DriverMethod::On) {
            debug!("driver publishes no events");
            return;
        }

        for event in DriverEventName::teardown_events() {
            let weak = Arc::downgrade(self);
            let subscribed = self.driver.on(
                event,
                Arc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.notify_destroyed();
                    }
                }),
            );
            if let Err(err) = subscribed {
                trace!(?event, error = %err, "driver rejected teardown event");
            }
        }

        for event in DriverEventName::STEP_EVENTS {
            let weak = Arc::downgrade(self);
            let subscribed = self.driver.on(
                event,
                Arc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.bump_on_index_change();
                    }
                }),
            );
            if let Err(err) = subscribed {
                trace!(?event, error = %err, "driver rejected step event");
            }
        }
    }

    fn call_lifecycle(&self, method: LifecycleMethod) -> bool {
        if !self.driver.supports(DriverMethod::Lifecycle(method)) {
            return false;
        }
        if let Err(err) = self.driver.call(DriverCall::Lifecycle(method)) {
            debug!(method = method.as_str(), error = %err, "driver teardown failed");
        }
        true
    }

    fn notify_destroyed(&self) {
        let (callbacks, escape_listener) = {
            let mut state = self.lock_state();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.on_step_change = None;
            (
                std::mem::take(&mut state.on_destroyed),
                state.escape_listener.take(),
            )
        };
        drop(escape_listener);

        debug!(callbacks = callbacks.len(), "highlight destroyed");
        for callback in callbacks {
            callback();
        }
    }

    fn bump_on_index_change(&self) {
        let current = read_index(self.driver.as_ref());
        let (callback, version) = {
            let mut state = self.lock_state();
            if current == state.last_index {
                return;
            }
            state.last_index = current;
            state.activation_version += 1;
            (state.on_step_change.clone(), state.activation_version)
        };

        trace!(index = current, version, "active step changed");
        if let Some(callback) = callback {
            callback(current);
        }
    }
}

fn read_index(driver: &dyn HighlightDriverPort) -> usize {
    if !driver.supports(DriverMethod::GetActiveIndex) {
        return 0;
    }
    driver.active_index().ok().flatten().unwrap_or(0)
}

/// Driver-side teardown hook.
///
/// The driver is built before the adapter that wraps it, so the callback
/// resolves its adapter once [`bind`](Self::bind) ran. A teardown seen before
/// that is replayed on bind.
#[derive(Clone, Default)]
pub struct DestroyedHook(Arc<Mutex<HookTarget>>);

#[derive(Default)]
struct HookTarget {
    adapter: Option<Weak<AdapterInner>>,
    fired: bool,
}

impl DestroyedHook {
    pub fn callback(&self) -> DriverCallback {
        let target = self.0.clone();
        Arc::new(move || {
            let adapter = {
                let mut target = target.lock().unwrap_or_else(PoisonError::into_inner);
                target.fired = true;
                target.adapter.clone()
            };
            if let Some(inner) = adapter.and_then(|weak| weak.upgrade()) {
                debug!("driver tore itself down");
                inner.notify_destroyed();
            }
        })
    }

    fn bind(&self, adapter: &HighlightAdapter) {
        let fired = {
            let mut target = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            target.adapter = Some(Arc::downgrade(&adapter.inner));
            target.fired
        };
        if fired {
            adapter.inner.notify_destroyed();
        }
    }
}

/// Shared slot holding the adapter of the current run.
///
/// Steps read it when an advance fires; the controller fills it after the
/// adapter is built and empties it on cleanup.
#[derive(Clone, Default)]
pub struct AdapterSlot(Arc<Mutex<Option<HighlightAdapter>>>);

impl AdapterSlot {
    pub fn get(&self) -> Option<HighlightAdapter> {
        self.lock().clone()
    }

    pub fn set(&self, adapter: HighlightAdapter) {
        *self.lock() = Some(adapter);
    }

    pub fn take(&self) -> Option<HighlightAdapter> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<HighlightAdapter>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
