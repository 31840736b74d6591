use tracing::debug;

use super::highlight_adapter::HighlightAdapter;

/// Move the highlight past step `current`.
///
/// Steps `next()` while the driver is still at or before `current`; if the
/// driver already moved further, re-renders at `current + 1` instead so a
/// double advance never skips a step.
pub fn safe_advance(adapter: Option<&HighlightAdapter>, current: usize) {
    let Some(adapter) = adapter else {
        return;
    };
    let active = adapter.get_index();
    if active <= current {
        adapter.next();
    } else {
        debug!(active, current, "driver ahead of tour, resyncing");
        adapter.start(Some(current + 1));
    }
}
