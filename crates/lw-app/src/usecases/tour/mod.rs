//! Guided onboarding tour.
//!
//! ```text
//! TourController::start
//!         ↓
//! wait for the first target  →  AdapterLoader (driver module + theme)
//!         ↓
//! for each step: target appears → completion condition → safe_advance
//!         ↓
//! last step: persist completion, tear the adapter down
//! ```
//!
//! Popover "Next" clicks run the step's advance action on a spawned task;
//! the controller loop only waits for the completion conditions.

pub mod adapter_loader;
pub mod change_watcher;
pub mod controller;
pub mod dom_simulation;
pub mod driver_options;
mod error;
pub mod highlight_adapter;
pub mod progress;
pub mod state_actions;
pub mod steps;
pub mod waiters;

pub use adapter_loader::AdapterLoader;
pub use controller::{TourController, TourDeps};
pub use error::TourError;
pub use highlight_adapter::{AdapterSlot, DestroyedHook, HighlightAdapter};
pub use steps::{build_steps, StepDeps, TourStep};
pub use waiters::WaitError;
