//! Scriptable highlight driver.
//!
//! Behaves like the vendor step-highlighting library: it renders one step at
//! a time, "Next" on the last step closes the tour, and the close button
//! destroys it. Two capability profiles mirror the driver builds seen in the
//! wild.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lw_core::ports::{
    DriverCall, DriverCallback, DriverError, DriverEventName, DriverMethod, HighlightDriverPort,
    LifecycleMethod,
};
use lw_core::tour::DriverOptions;
use tracing::{debug, trace};

/// Method surface of a driver build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverBuild {
    /// `destroy`, `drive`, `moveNext`, `movePrevious`, `moveTo`, active
    /// index and an event bus.
    #[default]
    Modern,
    /// `reset`/`close` instead of `destroy`, `movePrev`, active index, no
    /// event bus.
    Legacy,
}

impl DriverBuild {
    pub fn supports(self, method: DriverMethod) -> bool {
        use DriverMethod::*;
        match self {
            DriverBuild::Modern => matches!(
                method,
                Lifecycle(LifecycleMethod::Destroy)
                    | Drive
                    | MoveNext
                    | MovePrevious
                    | MoveTo
                    | GetActiveIndex
                    | On
            ),
            DriverBuild::Legacy => matches!(
                method,
                Lifecycle(LifecycleMethod::Reset)
                    | Lifecycle(LifecycleMethod::Close)
                    | Drive
                    | MoveNext
                    | MovePrev
                    | GetActiveIndex
            ),
        }
    }

    fn publishes(self, event: DriverEventName) -> bool {
        self == DriverBuild::Modern
            && (event == DriverEventName::Destroyed || DriverEventName::STEP_EVENTS.contains(&event))
    }
}

#[derive(Debug, Default)]
struct DriverState {
    active: Option<usize>,
    destroyed: bool,
    calls: Vec<DriverCall>,
}

pub struct HeadlessDriver {
    build: DriverBuild,
    options: DriverOptions,
    state: Mutex<DriverState>,
    handlers: Mutex<HashMap<DriverEventName, Vec<DriverCallback>>>,
}

impl HeadlessDriver {
    pub fn new(build: DriverBuild, options: DriverOptions) -> Self {
        Self {
            build,
            options,
            state: Mutex::new(DriverState::default()),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn build(&self) -> DriverBuild {
        self.build
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Index of the rendered step, `None` before `drive` or after teardown.
    pub fn active(&self) -> Option<usize> {
        self.lock_state().active
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock_state().destroyed
    }

    /// Every call received so far, including unsupported ones.
    pub fn call_log(&self) -> Vec<DriverCall> {
        self.lock_state().calls.clone()
    }

    /// The popover's "Next"/"Done" button.
    ///
    /// Runs the step's `on_next_click` hook when it has one; otherwise moves
    /// forward, which closes the tour on the last step.
    pub fn click_next(&self) {
        let Some(active) = self.active() else {
            trace!("next clicked without an active step");
            return;
        };
        match self
            .options
            .steps
            .get(active)
            .and_then(|step| step.on_next_click.clone())
        {
            Some(hook) => hook(),
            None => self.move_next(),
        }
    }

    /// The popover's "Back" button.
    pub fn click_previous(&self) {
        if self.active().is_some() {
            self.move_previous();
        }
    }

    /// The popover's close button.
    pub fn click_close(&self) {
        if !self.options.settings.allow_close {
            return;
        }
        if self.active().is_some() {
            self.destroy();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, events: &[DriverEventName]) {
        let callbacks: Vec<DriverCallback> = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            events
                .iter()
                .filter_map(|event| handlers.get(event))
                .flatten()
                .cloned()
                .collect()
        };
        for callback in callbacks {
            callback();
        }
    }

    fn drive(&self, index: Option<usize>) -> Result<(), DriverError> {
        let len = self.options.steps.len();
        let index = index.unwrap_or(0);
        if index >= len {
            return Err(DriverError::Vendor(format!(
                "step {index} out of range for {len} steps"
            )));
        }
        {
            let mut state = self.lock_state();
            state.active = Some(index);
            state.destroyed = false;
        }
        debug!(index, "driver rendering step");
        self.emit(&[
            DriverEventName::HighlightStarted,
            DriverEventName::Highlighted,
            DriverEventName::StepChanged,
        ]);
        Ok(())
    }

    fn move_next(&self) {
        let len = self.options.steps.len();
        let moved = {
            let mut state = self.lock_state();
            match state.active {
                Some(active) if active + 1 < len => {
                    state.active = Some(active + 1);
                    true
                }
                Some(_) => false,
                None => return,
            }
        };
        if moved {
            self.emit(&[
                DriverEventName::Next,
                DriverEventName::Highlighted,
                DriverEventName::StepChanged,
            ]);
        } else {
            self.destroy();
        }
    }

    fn move_previous(&self) {
        let moved = {
            let mut state = self.lock_state();
            match state.active {
                Some(active) if active > 0 => {
                    state.active = Some(active - 1);
                    true
                }
                _ => false,
            }
        };
        if moved {
            self.emit(&[
                DriverEventName::Previous,
                DriverEventName::Highlighted,
                DriverEventName::StepChanged,
            ]);
        }
    }

    fn move_to(&self, index: usize) -> Result<(), DriverError> {
        if index >= self.options.steps.len() {
            return Err(DriverError::Vendor(format!("no step at {index}")));
        }
        let moved = {
            let mut state = self.lock_state();
            let moved = state.active.is_some() && state.active != Some(index);
            if state.active.is_some() {
                state.active = Some(index);
            }
            moved
        };
        if moved {
            self.emit(&[DriverEventName::Highlighted, DriverEventName::StepChanged]);
        }
        Ok(())
    }

    fn destroy(&self) {
        {
            let mut state = self.lock_state();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.active = None;
        }
        debug!("driver destroyed");
        self.emit(&[DriverEventName::Destroyed]);
        if let Some(hook) = &self.options.on_destroyed {
            hook();
        }
    }
}

impl HighlightDriverPort for HeadlessDriver {
    fn supports(&self, method: DriverMethod) -> bool {
        self.build.supports(method)
    }

    fn call(&self, call: DriverCall) -> Result<(), DriverError> {
        self.lock_state().calls.push(call);
        if !self.build.supports(call.method()) {
            return Err(DriverError::Unsupported(format!("{:?}", call.method())));
        }

        match call {
            DriverCall::Lifecycle(_) => self.destroy(),
            DriverCall::Drive(index) => self.drive(index)?,
            DriverCall::MoveNext => self.move_next(),
            DriverCall::MovePrevious | DriverCall::MovePrev | DriverCall::MoveBack => {
                self.move_previous()
            }
            DriverCall::MoveTo(index) => self.move_to(index)?,
        }
        Ok(())
    }

    fn active_index(&self) -> Result<Option<usize>, DriverError> {
        if !self.build.supports(DriverMethod::GetActiveIndex) {
            return Err(DriverError::Unsupported("getActiveIndex".to_string()));
        }
        Ok(self.active())
    }

    fn on(&self, event: DriverEventName, callback: DriverCallback) -> Result<(), DriverError> {
        if !self.build.supports(DriverMethod::On) {
            return Err(DriverError::Unsupported("on".to_string()));
        }
        if !self.build.publishes(event) {
            return Err(DriverError::Unsupported(format!("event {event:?}")));
        }
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(callback);
        Ok(())
    }
}
