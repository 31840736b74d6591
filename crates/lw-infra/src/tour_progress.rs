//! Tour progress repository
//!
//! Stores `{"completed":true}` under a single key, or nothing. Any other
//! JSON value found on load, including the legacy `dismissedAtStep` record,
//! is removed. Text that is not JSON reads as absent and is left alone.
//! Storage failures are logged and swallowed.

use std::sync::Arc;

use log::{debug, warn};
use lw_core::config::DEFAULT_STORAGE_KEY;
use lw_core::ports::{KeyValueStoragePort, TourProgressPort};
use lw_core::PersistedTourState;
use serde_json::Value;

const LEGACY_DISMISSED_FIELD: &str = "dismissedAtStep";

pub struct TourProgressRepository {
    storage: Arc<dyn KeyValueStoragePort>,
    key: String,
}

impl TourProgressRepository {
    pub fn new(storage: Arc<dyn KeyValueStoragePort>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Repository on the default `onboardingTour.v1` key.
    pub fn with_defaults(storage: Arc<dyn KeyValueStoragePort>) -> Self {
        Self::new(storage, DEFAULT_STORAGE_KEY)
    }

    fn discard(&self, reason: &str) {
        debug!("Discarding stored tour progress ({})", reason);
        if let Err(e) = self.storage.remove_item(&self.key) {
            warn!("Failed to remove tour progress: {}", e);
        }
    }
}

impl TourProgressPort for TourProgressRepository {
    fn load(&self) -> PersistedTourState {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return PersistedTourState::default(),
            Err(e) => {
                warn!("Failed to read tour progress: {}", e);
                return PersistedTourState::default();
            }
        };

        let record = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(record)) => record,
            Ok(_) => {
                self.discard("non-object record");
                return PersistedTourState::default();
            }
            Err(e) => {
                debug!("Ignoring unparsable tour progress: {}", e);
                return PersistedTourState::default();
            }
        };

        if record.contains_key(LEGACY_DISMISSED_FIELD) {
            self.discard("legacy schema");
            return PersistedTourState::default();
        }
        if record.get("completed") != Some(&Value::Bool(true)) {
            self.discard("not completed");
            return PersistedTourState::default();
        }
        PersistedTourState::completed()
    }

    fn save(&self, state: &PersistedTourState) {
        let result = if state.is_completed() {
            match serde_json::to_string(&PersistedTourState::completed()) {
                Ok(json) => self.storage.set_item(&self.key, &json),
                Err(e) => Err(e.into()),
            }
        } else {
            self.storage.remove_item(&self.key)
        };

        if let Err(e) = result {
            warn!("Failed to persist tour progress: {}", e);
        }
    }
}
