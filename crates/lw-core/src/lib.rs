//! # lw-core
//!
//! Core domain models and ports for the lapwatch onboarding tour.
//!
//! This crate contains pure data, pure predicates and the port contracts the
//! tour engine depends on. It has no runtime or infrastructure dependencies.

pub mod config;
pub mod ports;
pub mod stopwatch;
pub mod tour;

// Re-export commonly used types at the crate root
pub use config::TourConfig;
pub use stopwatch::{AppState, Lap, SettingsState, StopwatchState, StopwatchStatus, StoreAction};
pub use tour::{
    PersistedTourState, PopoverAlign, PopoverContent, PopoverSide, SkipReason, StartOptions,
    StepId, TourOutcome,
};
