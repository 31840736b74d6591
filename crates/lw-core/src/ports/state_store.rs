//! Application state store port
//!
//! The store is owned by the host application. The tour reads snapshots,
//! listens for changes and dispatches the same actions a user gesture would.

use std::sync::Arc;

use super::Subscription;
use crate::stopwatch::{AppState, StoreAction};

/// Change listener. Called after every applied action; it must not block.
pub type StoreListener = Arc<dyn Fn() + Send + Sync>;

pub trait StateStorePort: Send + Sync {
    /// Snapshot of the current state.
    fn get_state(&self) -> AppState;

    /// Register a change listener until the returned guard is dropped.
    fn subscribe(&self, listener: StoreListener) -> Subscription;

    /// Apply an action. The store serializes its own writes.
    fn dispatch(&self, action: StoreAction);
}
