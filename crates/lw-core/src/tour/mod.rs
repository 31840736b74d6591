//! Onboarding tour domain models.
//!
//! This module defines the data the tour engine passes around: step identity,
//! popover display content, run options and run outcomes. Behavior lives in
//! `lw-app`.

pub mod driver_options;
pub mod persisted;
pub mod predicates;

pub use driver_options::{DriverOptions, DriverSettings, DriverStep, OverlayClickBehavior};
pub use persisted::PersistedTourState;

use serde::{Deserialize, Serialize};

/// Stable numeric identity of each tour step. The discriminant is the step's
/// index in the tour script.
///
/// 引导步骤的稳定编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepId {
    Start = 0,
    Lap = 1,
    Group = 2,
    SwitchTime = 3,
    Settings = 4,
}

impl StepId {
    /// Every step in script order.
    pub const ALL: [StepId; 5] = [
        StepId::Start,
        StepId::Lap,
        StepId::Group,
        StepId::SwitchTime,
        StepId::Settings,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopoverSide {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopoverAlign {
    Start,
    #[default]
    Center,
    End,
}

/// Display data for a step's popover. Pure data, no behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopoverContent {
    pub title: String,
    pub description: String,
    pub side: PopoverSide,
    pub align: PopoverAlign,
}

impl PopoverContent {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        side: PopoverSide,
        align: PopoverAlign,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            side,
            align,
        }
    }
}

/// Options accepted by the controller's `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartOptions {
    /// Run even if the tour was already completed.
    pub force: bool,
    /// Step to begin at; clamped into the step range.
    pub start_index: usize,
}

impl StartOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            start_index: 0,
        }
    }
}

/// Why a `start` call did not run the tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No document is available (non-browser environment).
    NoDocument,
    /// Another run is active.
    AlreadyRunning,
    /// Completion is persisted and the start was not forced.
    AlreadyCompleted,
    /// The step list is empty.
    NoSteps,
    /// The first step's target never appeared before the run was cancelled.
    TargetUnavailable,
}

/// How a tour run ended.
///
/// 引导运行结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourOutcome {
    Completed,
    Cancelled,
    Failed(String),
    Skipped(SkipReason),
}

impl TourOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TourOutcome::Completed)
    }
}

/// Clamp `index` into `[0, len - 1]`. Returns 0 for an empty range.
pub fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ids_match_script_order() {
        for (index, step) in StepId::ALL.iter().enumerate() {
            assert_eq!(step.index(), index);
            assert_eq!(StepId::from_index(index), Some(*step));
        }
        assert_eq!(StepId::from_index(5), None);
    }

    #[test]
    fn clamp_index_stays_in_range() {
        assert_eq!(clamp_index(0, 5), 0);
        assert_eq!(clamp_index(3, 5), 3);
        assert_eq!(clamp_index(42, 5), 4);
        assert_eq!(clamp_index(7, 0), 0);
    }
}
