//! # Tour configuration DTO
//!
//! Pure data describing selectors, timeouts and driver presentation for the
//! onboarding tour. Values missing from a configuration source keep their
//! defaults; nothing here validates or applies policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tour::DriverSettings;

/// localStorage key holding the persisted tour progress.
pub const DEFAULT_STORAGE_KEY: &str = "onboardingTour.v1";

/// Document hooks the host page exposes for the tour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourSelectors {
    /// Play control, or the pause control once running.
    pub play_or_pause: String,
    pub lap_button: String,
    pub timer_display: String,
    pub latest_lap: String,
    pub open_settings: String,
}

impl Default for TourSelectors {
    fn default() -> Self {
        Self {
            play_or_pause: r#"[data-tour="play"], [data-tour="pause"]"#.to_string(),
            lap_button: r#"[data-tour="add-lap"]"#.to_string(),
            timer_display: r#"[data-tour="timer-display"]"#.to_string(),
            latest_lap: r#"[data-tour="lap-item-latest"]"#.to_string(),
            open_settings: r#"[data-tour="open-settings"]"#.to_string(),
        }
    }
}

/// Bounds for the fail-open advance actions, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourTimeouts {
    pub appear_ms: u64,
    pub lap_dom_or_state_ms: u64,
    pub watch_switch_ms: u64,
}

impl Default for TourTimeouts {
    fn default() -> Self {
        Self {
            appear_ms: 2_500,
            lap_dom_or_state_ms: 2_000,
            watch_switch_ms: 2_000,
        }
    }
}

impl TourTimeouts {
    pub fn appear(&self) -> Duration {
        Duration::from_millis(self.appear_ms)
    }

    pub fn lap_dom_or_state(&self) -> Duration {
        Duration::from_millis(self.lap_dom_or_state_ms)
    }

    pub fn watch_switch(&self) -> Duration {
        Duration::from_millis(self.watch_switch_ms)
    }
}

/// Tour configuration DTO.
///
/// 引导配置 DTO（纯数据）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    pub storage_key: String,
    /// Number of lap colors in the active theme palette.
    pub palette_length: usize,
    /// Interval of the animation-frame fallback poll.
    pub frame_interval_ms: u64,
    pub selectors: TourSelectors,
    pub timeouts: TourTimeouts,
    pub driver: DriverSettings,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            palette_length: 6,
            frame_interval_ms: 16,
            selectors: TourSelectors::default(),
            timeouts: TourTimeouts::default(),
            driver: DriverSettings::default(),
        }
    }
}

impl TourConfig {
    /// Create a TourConfig from the `[tour]` table of a TOML document.
    ///
    /// A missing table yields the defaults; keys missing inside the table
    /// keep their defaults as well.
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        match toml_value.get("tour") {
            Some(table) => Ok(table.clone().try_into()?),
            None => Ok(Self::default()),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
