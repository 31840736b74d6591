//! Highlight driver ports
//!
//! The vendor step-highlighting library exposes a different surface per
//! build: some builds have `destroy`, others only `reset` or `close`; some
//! publish step events, others don't. The driver port therefore reports its
//! capabilities and lets callers invoke whichever methods exist.

use std::sync::Arc;

use async_trait::async_trait;

use super::DriverError;
use crate::tour::DriverOptions;

pub type DriverCallback = Arc<dyn Fn() + Send + Sync>;

/// Teardown-style methods a driver build may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleMethod {
    Destroy,
    Reset,
    Stop,
    Close,
    Cancel,
}

impl LifecycleMethod {
    pub const ALL: [LifecycleMethod; 5] = [
        LifecycleMethod::Destroy,
        LifecycleMethod::Reset,
        LifecycleMethod::Stop,
        LifecycleMethod::Close,
        LifecycleMethod::Cancel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleMethod::Destroy => "destroy",
            LifecycleMethod::Reset => "reset",
            LifecycleMethod::Stop => "stop",
            LifecycleMethod::Close => "close",
            LifecycleMethod::Cancel => "cancel",
        }
    }
}

/// Every optional method a driver build may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverMethod {
    Lifecycle(LifecycleMethod),
    Drive,
    MoveNext,
    MovePrevious,
    MovePrev,
    MoveBack,
    MoveTo,
    GetActiveIndex,
    On,
}

/// A concrete invocation of a driver method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Lifecycle(LifecycleMethod),
    Drive(Option<usize>),
    MoveNext,
    MovePrevious,
    MovePrev,
    MoveBack,
    MoveTo(usize),
}

impl DriverCall {
    pub fn method(&self) -> DriverMethod {
        match self {
            DriverCall::Lifecycle(method) => DriverMethod::Lifecycle(*method),
            DriverCall::Drive(_) => DriverMethod::Drive,
            DriverCall::MoveNext => DriverMethod::MoveNext,
            DriverCall::MovePrevious => DriverMethod::MovePrevious,
            DriverCall::MovePrev => DriverMethod::MovePrev,
            DriverCall::MoveBack => DriverMethod::MoveBack,
            DriverCall::MoveTo(_) => DriverMethod::MoveTo,
        }
    }
}

/// Events a driver build may publish through `on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverEventName {
    Destroyed,
    Lifecycle(LifecycleMethod),
    HighlightStarted,
    Highlighted,
    StepChanged,
    Next,
    Previous,
}

impl DriverEventName {
    /// Events that mean the tour UI went away.
    pub fn teardown_events() -> impl Iterator<Item = DriverEventName> {
        std::iter::once(DriverEventName::Destroyed)
            .chain(LifecycleMethod::ALL.into_iter().map(DriverEventName::Lifecycle))
    }

    /// Events that may accompany an active-step change.
    pub const STEP_EVENTS: [DriverEventName; 5] = [
        DriverEventName::HighlightStarted,
        DriverEventName::Highlighted,
        DriverEventName::StepChanged,
        DriverEventName::Next,
        DriverEventName::Previous,
    ];
}

/// A live driver instance.
pub trait HighlightDriverPort: Send + Sync {
    /// Whether this build exposes `method`.
    fn supports(&self, method: DriverMethod) -> bool;

    /// Invoke a method. Unsupported methods return [`DriverError::Unsupported`].
    fn call(&self, call: DriverCall) -> Result<(), DriverError>;

    /// Index of the highlighted step, `None` when nothing is active.
    fn active_index(&self) -> Result<Option<usize>, DriverError>;

    /// Register an event callback. Unknown events are rejected.
    fn on(&self, event: DriverEventName, callback: DriverCallback) -> Result<(), DriverError>;
}

/// The loaded driver module: builds driver instances from options.
pub trait HighlightDriverFactoryPort: Send + Sync {
    fn create_driver(
        &self,
        options: DriverOptions,
    ) -> Result<Arc<dyn HighlightDriverPort>, DriverError>;
}

/// Loader for the vendor library and its theme asset.
#[async_trait]
pub trait HighlightLibraryPort: Send + Sync {
    async fn load_driver_module(&self) -> Result<Arc<dyn HighlightDriverFactoryPort>, DriverError>;

    async fn load_theme(&self) -> Result<(), DriverError>;
}
