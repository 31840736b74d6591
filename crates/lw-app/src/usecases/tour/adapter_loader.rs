//! Lazy construction of [`HighlightAdapter`]s.
//!
//! The driver module and its theme asset are fetched on first use and
//! memoized for the lifetime of the loader. A failed load is not cached, so
//! the next tour run retries.

use std::sync::{Arc, Mutex, PoisonError};

use lw_core::ports::{DocumentPort, DriverError, HighlightDriverFactoryPort, HighlightLibraryPort};
use lw_core::tour::DriverOptions;
use tokio::sync::OnceCell;
use tracing::{debug, info_span, Instrument};

use super::highlight_adapter::{DestroyedHook, HighlightAdapter};

#[derive(Default)]
struct LoadedAssets {
    module: OnceCell<Arc<dyn HighlightDriverFactoryPort>>,
    theme: OnceCell<()>,
}

pub struct AdapterLoader {
    library: Arc<dyn HighlightLibraryPort>,
    assets: Mutex<Arc<LoadedAssets>>,
}

impl AdapterLoader {
    pub fn new(library: Arc<dyn HighlightLibraryPort>) -> Self {
        Self {
            library,
            assets: Mutex::new(Arc::new(LoadedAssets::default())),
        }
    }

    /// Load (or reuse) the driver module and theme, then build a driver
    /// from `options` and wrap it.
    pub async fn create_adapter(
        &self,
        mut options: DriverOptions,
        document: Option<Arc<dyn DocumentPort>>,
    ) -> Result<HighlightAdapter, DriverError> {
        let assets = self.current_assets();
        let span = info_span!("usecase.tour.load_driver", steps = options.steps.len());

        async {
            let (module, _) = tokio::try_join!(
                assets
                    .module
                    .get_or_try_init(|| self.library.load_driver_module()),
                assets.theme.get_or_try_init(|| self.library.load_theme()),
            )?;
            debug!("highlight library ready");

            let hook = DestroyedHook::default();
            options.on_destroyed = Some(hook.callback());
            let driver = module.create_driver(options)?;
            Ok::<_, DriverError>(HighlightAdapter::attach_with_destroyed_hook(
                driver,
                document.as_deref(),
                &hook,
            ))
        }
        .instrument(span)
        .await
    }

    /// Forget the memoized module and theme.
    pub fn reset(&self) {
        *self.assets.lock().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(LoadedAssets::default());
    }

    fn current_assets(&self) -> Arc<LoadedAssets> {
        self.assets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_platform::highlight::{DriverBuild, HeadlessHighlightLibrary};

    #[tokio::test]
    async fn module_and_theme_load_once() {
        let library = Arc::new(HeadlessHighlightLibrary::new(DriverBuild::Modern));
        let loader = AdapterLoader::new(library.clone());

        loader
            .create_adapter(DriverOptions::default(), None)
            .await
            .unwrap();
        loader
            .create_adapter(DriverOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(library.module_loads(), 1);
        assert_eq!(library.theme_loads(), 1);
        assert_eq!(library.drivers_created(), 2);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let library = Arc::new(HeadlessHighlightLibrary::new(DriverBuild::Modern));
        library.fail_next_module_load("network down");
        let loader = AdapterLoader::new(library.clone());

        let err = loader
            .create_adapter(DriverOptions::default(), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DriverError::LoadFailed(_)));

        loader
            .create_adapter(DriverOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(library.module_loads(), 2);
    }

    #[tokio::test]
    async fn reset_forces_a_reload() {
        let library = Arc::new(HeadlessHighlightLibrary::new(DriverBuild::Legacy));
        let loader = AdapterLoader::new(library.clone());

        loader
            .create_adapter(DriverOptions::default(), None)
            .await
            .unwrap();
        loader.reset();
        loader
            .create_adapter(DriverOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(library.module_loads(), 2);
        assert_eq!(library.theme_loads(), 2);
    }
}
