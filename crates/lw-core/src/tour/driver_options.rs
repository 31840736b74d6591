//! Options handed to the highlight driver factory.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::PopoverContent;
use crate::ports::highlight::DriverCallback;

/// What a click on the dimmed overlay does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayClickBehavior {
    #[default]
    None,
    Close,
}

/// Presentation settings for the driver. Everything except the step list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub show_progress: bool,
    pub next_btn_text: String,
    pub prev_btn_text: String,
    pub done_btn_text: String,
    pub close_btn_text: String,
    pub stage_padding: u32,
    pub allow_close: bool,
    pub overlay_click_behavior: OverlayClickBehavior,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            show_progress: true,
            next_btn_text: "Next".to_string(),
            prev_btn_text: "Back".to_string(),
            done_btn_text: "Done".to_string(),
            close_btn_text: String::new(),
            stage_padding: 6,
            allow_close: true,
            overlay_click_behavior: OverlayClickBehavior::None,
        }
    }
}

/// One highlighted step as the driver sees it.
#[derive(Clone)]
pub struct DriverStep {
    pub element: String,
    pub popover: PopoverContent,
    /// Replaces the driver's own "Next" handling when present.
    pub on_next_click: Option<DriverCallback>,
}

impl fmt::Debug for DriverStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverStep")
            .field("element", &self.element)
            .field("popover", &self.popover)
            .field("on_next_click", &self.on_next_click.is_some())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct DriverOptions {
    pub settings: DriverSettings,
    pub steps: Vec<DriverStep>,
    /// Called by every build whenever the driver tears itself down, including
    /// from its own close and "Done" buttons.
    pub on_destroyed: Option<DriverCallback>,
}

impl fmt::Debug for DriverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverOptions")
            .field("settings", &self.settings)
            .field("steps", &self.steps)
            .field("on_destroyed", &self.on_destroyed.is_some())
            .finish()
    }
}
