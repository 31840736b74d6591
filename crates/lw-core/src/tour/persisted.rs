use serde::{Deserialize, Serialize};

/// Tour progress persisted between sessions.
///
/// Only `{"completed": true}` is ever written. Any other shape read back is
/// treated as absent by the progress repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedTourState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl PersistedTourState {
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed == Some(true)
    }
}
