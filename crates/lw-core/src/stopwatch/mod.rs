//! Stopwatch state as seen by the tour.
//!
//! The timing model itself lives in the host application; this module only
//! describes the shape of the state the tour reads and the actions it may
//! dispatch through the store.

use serde::{Deserialize, Serialize};

/// Stopwatch run status.
///
/// 秒表运行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopwatchStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

/// A recorded lap. Laps are kept oldest first, so the latest lap is the last
/// element of [`StopwatchState::laps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// Stable numeric id, unique within a stopwatch session.
    pub id: u64,
    /// Index into the active color palette.
    pub color_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StopwatchState {
    pub status: StopwatchStatus,
    pub laps: Vec<Lap>,
}

impl StopwatchState {
    pub fn latest_lap(&self) -> Option<&Lap> {
        self.laps.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsState {
    pub is_open: bool,
}

/// Root application state exposed by the store.
///
/// 应用根状态。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppState {
    pub stopwatch: StopwatchState,
    pub settings: SettingsState,
}

/// Mutations the store understands. The tour dispatches the same actions a
/// user gesture would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreAction {
    Start,
    Pause,
    Reset,
    AddLap,
    SetLapColorIndex {
        id: u64,
        color_index: usize,
        palette_length: usize,
    },
    OpenSettings,
    CloseSettings,
}
