//! Store actions the tour performs on the user's behalf.

use lw_core::ports::{PalettePort, StateStorePort};
use lw_core::tour::predicates::{cyclic_index, is_running};
use lw_core::StoreAction;

pub fn ensure_running(store: &dyn StateStorePort) {
    if !is_running(&store.get_state()) {
        store.dispatch(StoreAction::Start);
    }
}

pub fn add_lap_once(store: &dyn StateStorePort) {
    store.dispatch(StoreAction::AddLap);
}

/// Move the latest lap one color forward in the active palette.
///
/// Returns the new color index, or `None` when there is no lap.
pub fn bump_latest_lap_color(store: &dyn StateStorePort, palette: &dyn PalettePort) -> Option<usize> {
    let state = store.get_state();
    let latest = state.stopwatch.latest_lap()?;
    let palette_length = palette.palette_length();
    let color_index = cyclic_index(latest.color_index, 1, palette_length);

    store.dispatch(StoreAction::SetLapColorIndex {
        id: latest.id,
        color_index,
        palette_length,
    });
    Some(color_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use lw_core::tour::predicates::latest_lap_color_changed_from;
    use lw_core::{AppState, Lap, StopwatchState, StopwatchStatus};
    use lw_infra::palette::StaticPalette;
    use lw_infra::store::InMemoryAppStore;

    #[test]
    fn ensure_running_starts_once() {
        let store = InMemoryAppStore::new();

        ensure_running(&store);
        ensure_running(&store);

        let state = store.get_state();
        assert_eq!(state.stopwatch.status, StopwatchStatus::Running);
        assert_eq!(state.stopwatch.laps.len(), 1);
    }

    #[test]
    fn bump_wraps_around_the_palette() {
        let store = InMemoryAppStore::new();
        let palette = StaticPalette::new(3);
        ensure_running(&store);

        assert_eq!(bump_latest_lap_color(&store, &palette), Some(1));
        assert_eq!(bump_latest_lap_color(&store, &palette), Some(2));
        assert_eq!(bump_latest_lap_color(&store, &palette), Some(0));
        assert_eq!(store.get_state().stopwatch.laps[0].color_index, 0);
    }

    #[test]
    fn bump_only_touches_the_latest_lap() {
        let store = InMemoryAppStore::new();
        let palette = StaticPalette::new(6);
        ensure_running(&store);
        add_lap_once(&store);

        bump_latest_lap_color(&store, &palette);

        let laps = store.get_state().stopwatch.laps;
        assert_eq!(laps.len(), 2);
        assert_eq!(laps[0].color_index, 0);
        assert_eq!(laps[1].color_index, 1);
    }

    #[test]
    fn recolor_is_visible_only_after_the_dispatch_applies() {
        let store = Arc::new(InMemoryAppStore::with_state(AppState {
            stopwatch: StopwatchState {
                status: StopwatchStatus::Running,
                laps: vec![Lap {
                    id: 1,
                    color_index: 2,
                }],
            },
            ..Default::default()
        }));
        let palette = StaticPalette::new(6);
        let changed = latest_lap_color_changed_from(Some(2));
        assert!(!changed(&store.get_state()));

        let observed = Arc::new(Mutex::new(Vec::new()));
        let _subscription = {
            let weak = Arc::downgrade(&store);
            let observed = observed.clone();
            let changed = latest_lap_color_changed_from(Some(2));
            store.subscribe(Arc::new(move || {
                if let Some(store) = weak.upgrade() {
                    observed.lock().unwrap().push(changed(&store.get_state()));
                }
            }))
        };

        assert_eq!(bump_latest_lap_color(store.as_ref(), &palette), Some(3));

        assert_eq!(*observed.lock().unwrap(), vec![true]);
        assert_eq!(store.get_state().stopwatch.laps[0].color_index, 3);
        assert!(changed(&store.get_state()));
    }

    #[test]
    fn bump_without_laps_is_a_no_op() {
        let store = InMemoryAppStore::new();
        let palette = StaticPalette::new(6);

        assert_eq!(bump_latest_lap_color(&store, &palette), None);
        assert!(store.get_state().stopwatch.laps.is_empty());
    }
}
