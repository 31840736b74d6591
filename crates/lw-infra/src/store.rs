//! In-memory application store
//!
//! A single-threaded-reducer store in the Redux mould: actions are reduced
//! under a lock, then every subscriber is notified outside of it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lw_core::ports::{StateStorePort, StoreListener, Subscription};
use lw_core::{AppState, Lap, StopwatchStatus, StoreAction};
use tracing::trace;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, StoreListener)>,
}

pub struct InMemoryAppStore {
    state: Mutex<AppState>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Default for InMemoryAppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAppStore {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Mutex::new(state),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

impl StateStorePort for InMemoryAppStore {
    fn get_state(&self) -> AppState {
        lock(&self.state).clone()
    }

    fn subscribe(&self, listener: StoreListener) -> Subscription {
        let id = {
            let mut listeners = lock(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, listener));
            id
        };

        let registry = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                lock(&registry).entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    fn dispatch(&self, action: StoreAction) {
        trace!(?action, "dispatch");
        reduce(&mut lock(&self.state), action);

        let listeners: Vec<StoreListener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

/// Apply `action` to `state`.
///
/// Starting from idle opens the first lap; further laps are only recorded
/// while running. Laps are kept oldest first.
pub fn reduce(state: &mut AppState, action: StoreAction) {
    let stopwatch = &mut state.stopwatch;
    match action {
        StoreAction::Start => {
            if stopwatch.status == StopwatchStatus::Running {
                return;
            }
            if stopwatch.status == StopwatchStatus::Idle && stopwatch.laps.is_empty() {
                push_lap(&mut stopwatch.laps);
            }
            stopwatch.status = StopwatchStatus::Running;
        }
        StoreAction::Pause => {
            if stopwatch.status == StopwatchStatus::Running {
                stopwatch.status = StopwatchStatus::Paused;
            }
        }
        StoreAction::Reset => {
            stopwatch.status = StopwatchStatus::Idle;
            stopwatch.laps.clear();
        }
        StoreAction::AddLap => {
            if stopwatch.status == StopwatchStatus::Running {
                push_lap(&mut stopwatch.laps);
            }
        }
        StoreAction::SetLapColorIndex {
            id,
            color_index,
            palette_length,
        } => {
            if let Some(lap) = stopwatch.laps.iter_mut().find(|lap| lap.id == id) {
                lap.color_index = if palette_length == 0 {
                    0
                } else {
                    color_index % palette_length
                };
            }
        }
        StoreAction::OpenSettings => state.settings.is_open = true,
        StoreAction::CloseSettings => state.settings.is_open = false,
    }
}

fn push_lap(laps: &mut Vec<Lap>) {
    let id = laps.iter().map(|lap| lap.id).max().unwrap_or(0) + 1;
    laps.push(Lap { id, color_index: 0 });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn first_start_opens_a_lap() {
        let store = InMemoryAppStore::new();

        store.dispatch(StoreAction::Start);
        store.dispatch(StoreAction::Pause);
        store.dispatch(StoreAction::Start);

        let state = store.get_state();
        assert_eq!(state.stopwatch.status, StopwatchStatus::Running);
        assert_eq!(state.stopwatch.laps, vec![Lap { id: 1, color_index: 0 }]);
    }

    #[test]
    fn laps_are_only_added_while_running() {
        let store = InMemoryAppStore::new();

        store.dispatch(StoreAction::AddLap);
        assert!(store.get_state().stopwatch.laps.is_empty());

        store.dispatch(StoreAction::Start);
        store.dispatch(StoreAction::AddLap);
        store.dispatch(StoreAction::Pause);
        store.dispatch(StoreAction::AddLap);

        let ids: Vec<u64> = store
            .get_state()
            .stopwatch
            .laps
            .iter()
            .map(|lap| lap.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn reset_clears_laps() {
        let store = InMemoryAppStore::new();
        store.dispatch(StoreAction::Start);
        store.dispatch(StoreAction::AddLap);

        store.dispatch(StoreAction::Reset);

        let state = store.get_state();
        assert_eq!(state.stopwatch.status, StopwatchStatus::Idle);
        assert!(state.stopwatch.laps.is_empty());
    }

    #[test]
    fn color_index_is_normalized_into_the_palette() {
        let store = InMemoryAppStore::new();
        store.dispatch(StoreAction::Start);

        store.dispatch(StoreAction::SetLapColorIndex {
            id: 1,
            color_index: 7,
            palette_length: 6,
        });
        assert_eq!(store.get_state().stopwatch.laps[0].color_index, 1);

        store.dispatch(StoreAction::SetLapColorIndex {
            id: 42,
            color_index: 3,
            palette_length: 6,
        });
        assert_eq!(store.get_state().stopwatch.laps[0].color_index, 1);
    }

    #[test]
    fn listeners_fire_until_unsubscribed() {
        let store = InMemoryAppStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let calls = calls.clone();
            store.subscribe(Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }))
        };

        store.dispatch(StoreAction::OpenSettings);
        drop(subscription);
        store.dispatch(StoreAction::CloseSettings);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_dispatch_reentrantly() {
        let store = Arc::new(InMemoryAppStore::new());
        let _subscription = {
            let weak = Arc::downgrade(&store);
            store.subscribe(Arc::new(move || {
                if let Some(store) = weak.upgrade() {
                    if !store.get_state().settings.is_open {
                        store.dispatch(StoreAction::OpenSettings);
                    }
                }
            }))
        };

        store.dispatch(StoreAction::Start);

        assert!(store.get_state().settings.is_open);
    }
}
