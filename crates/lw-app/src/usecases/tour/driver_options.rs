//! Maps the tour script onto the driver's option format.

use std::sync::Arc;

use lw_core::ports::DriverCallback;
use lw_core::tour::{DriverOptions, DriverSettings, DriverStep};

use super::steps::TourStep;

/// Driver options for `steps` with `settings` as presentation.
///
/// Steps with an advance action get an `on_next_click` hook that runs it;
/// the others keep the driver's own "Next"/"Done" handling.
pub fn to_driver_options(steps: &[Arc<TourStep>], settings: &DriverSettings) -> DriverOptions {
    DriverOptions {
        settings: settings.clone(),
        steps: steps.iter().map(to_driver_step).collect(),
        on_destroyed: None,
    }
}

fn to_driver_step(step: &Arc<TourStep>) -> DriverStep {
    let on_next_click = step.has_advance_action().then(|| {
        let step = step.clone();
        Arc::new(move || step.request_advance()) as DriverCallback
    });

    DriverStep {
        element: step.target_selector().to_string(),
        popover: step.content().clone(),
        on_next_click,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_core::tour::OverlayClickBehavior;
    use lw_core::TourConfig;
    use lw_infra::palette::StaticPalette;
    use lw_infra::store::InMemoryAppStore;
    use lw_platform::document::HeadlessDocument;
    use tokio_util::sync::CancellationToken;

    use crate::usecases::tour::{build_steps, AdapterSlot, StepDeps};

    #[test]
    fn every_step_but_settings_overrides_next() {
        let deps = Arc::new(StepDeps {
            store: Arc::new(InMemoryAppStore::new()),
            document: Arc::new(HeadlessDocument::new()),
            palette: Arc::new(StaticPalette::new(6)),
            adapter: AdapterSlot::default(),
            config: Arc::new(TourConfig::default()),
            run_cancel: CancellationToken::new(),
        });
        let steps = build_steps(deps);
        let settings = DriverSettings {
            stage_padding: 10,
            ..Default::default()
        };

        let options = to_driver_options(&steps, &settings);

        assert_eq!(options.steps.len(), 5);
        assert_eq!(options.steps[1].element, "[data-tour=\"add-lap\"]");
        assert_eq!(options.steps[1].popover.title, "Lap");
        let hooks: Vec<bool> = options
            .steps
            .iter()
            .map(|step| step.on_next_click.is_some())
            .collect();
        assert_eq!(hooks, vec![true, true, true, true, false]);
        assert_eq!(options.settings.stage_padding, 10);
        assert_eq!(options.settings.next_btn_text, "Next");
        assert_eq!(
            options.settings.overlay_click_behavior,
            OverlayClickBehavior::None
        );
    }
}
