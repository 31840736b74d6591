//! Pure predicates over [`AppState`] used by the tour steps.

use crate::stopwatch::{AppState, StopwatchStatus};

/// True while the stopwatch is running.
pub fn is_running(state: &AppState) -> bool {
    state.stopwatch.status == StopwatchStatus::Running
}

/// Predicate factory: holds once the lap count reaches `min_laps`.
pub fn has_at_least_n_laps(min_laps: usize) -> impl Fn(&AppState) -> bool + Send + Sync + 'static {
    move |state| state.stopwatch.laps.len() >= min_laps
}

/// Predicate factory: holds once the latest lap's color differs from
/// `baseline`. Never holds without a lap or without a baseline.
pub fn latest_lap_color_changed_from(
    baseline: Option<usize>,
) -> impl Fn(&AppState) -> bool + Send + Sync + 'static {
    move |state| match (state.stopwatch.latest_lap(), baseline) {
        (Some(lap), Some(initial)) => lap.color_index != initial,
        _ => false,
    }
}

/// True while the settings panel is open.
pub fn settings_open(state: &AppState) -> bool {
    state.settings.is_open
}

/// Color index of the latest lap, if any.
pub fn latest_lap_color(state: &AppState) -> Option<usize> {
    state.stopwatch.latest_lap().map(|lap| lap.color_index)
}

/// Step `index` by `delta` positions around a palette of `length` entries.
pub fn cyclic_index(index: usize, delta: isize, length: usize) -> usize {
    if length == 0 {
        return 0;
    }
    let length = length as isize;
    ((index as isize + delta).rem_euclid(length)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stopwatch::{Lap, StopwatchState};

    fn state_with_laps(colors: &[usize]) -> AppState {
        AppState {
            stopwatch: StopwatchState {
                status: StopwatchStatus::Running,
                laps: colors
                    .iter()
                    .enumerate()
                    .map(|(i, color)| Lap {
                        id: i as u64 + 1,
                        color_index: *color,
                    })
                    .collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn is_running_only_for_running_status() {
        let mut state = AppState::default();
        assert!(!is_running(&state));
        state.stopwatch.status = StopwatchStatus::Paused;
        assert!(!is_running(&state));
        state.stopwatch.status = StopwatchStatus::Running;
        assert!(is_running(&state));
    }

    #[test]
    fn lap_count_threshold() {
        let two_laps = has_at_least_n_laps(2);
        assert!(!two_laps(&state_with_laps(&[0])));
        assert!(two_laps(&state_with_laps(&[0, 0])));
        assert!(two_laps(&state_with_laps(&[0, 0, 0])));
    }

    #[test]
    fn color_change_is_false_without_baseline_or_laps() {
        assert!(!latest_lap_color_changed_from(None)(&state_with_laps(&[3])));
        assert!(!latest_lap_color_changed_from(Some(2))(&AppState::default()));
    }

    #[test]
    fn color_change_compares_latest_lap_only() {
        let palette_length = 6;
        for baseline in 0..palette_length {
            for current in 0..palette_length {
                // the first lap's color must never matter
                let state = state_with_laps(&[baseline, current]);
                let changed = latest_lap_color_changed_from(Some(baseline))(&state);
                assert_eq!(changed, current != baseline, "{baseline} -> {current}");
            }
        }
    }

    #[test]
    fn cyclic_index_wraps_both_ways() {
        assert_eq!(cyclic_index(2, 1, 6), 3);
        assert_eq!(cyclic_index(5, 1, 6), 0);
        assert_eq!(cyclic_index(0, -1, 6), 5);
        assert_eq!(cyclic_index(4, 1, 0), 0);
    }

    #[test]
    fn settings_flag() {
        let mut state = AppState::default();
        assert!(!settings_open(&state));
        state.settings.is_open = true;
        assert!(settings_open(&state));
    }
}
