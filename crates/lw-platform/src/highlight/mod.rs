//! Headless highlight library
//!
//! Stands in for the lazily fetched vendor module and its stylesheet. Loads
//! are counted and can be made to fail once, so callers can exercise their
//! caching and retry paths.

mod driver;

pub use driver::{DriverBuild, HeadlessDriver};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use lw_core::ports::{
    DriverError, HighlightDriverFactoryPort, HighlightDriverPort, HighlightLibraryPort,
};
use lw_core::tour::DriverOptions;

#[derive(Default)]
struct LibraryState {
    module_loads: usize,
    theme_loads: usize,
    drivers: Vec<Arc<HeadlessDriver>>,
    fail_module: Option<String>,
    fail_theme: Option<String>,
    load_delay: Option<Duration>,
}

/// Loader for headless driver modules.
///
/// 无界面的高亮库加载器。
#[derive(Clone)]
pub struct HeadlessHighlightLibrary {
    build: DriverBuild,
    state: Arc<Mutex<LibraryState>>,
}

impl HeadlessHighlightLibrary {
    pub fn new(build: DriverBuild) -> Self {
        Self {
            build,
            state: Arc::new(Mutex::new(LibraryState::default())),
        }
    }

    /// Number of module load attempts, failed ones included.
    pub fn module_loads(&self) -> usize {
        self.lock().module_loads
    }

    pub fn theme_loads(&self) -> usize {
        self.lock().theme_loads
    }

    pub fn drivers_created(&self) -> usize {
        self.lock().drivers.len()
    }

    /// The most recently created driver.
    pub fn last_driver(&self) -> Option<Arc<HeadlessDriver>> {
        self.lock().drivers.last().cloned()
    }

    pub fn fail_next_module_load(&self, message: impl Into<String>) {
        self.lock().fail_module = Some(message.into());
    }

    pub fn fail_next_theme_load(&self, message: impl Into<String>) {
        self.lock().fail_theme = Some(message.into());
    }

    /// Delay every load by `delay`, like a slow network fetch.
    pub fn set_load_delay(&self, delay: Duration) {
        self.lock().load_delay = Some(delay);
    }

    fn lock(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_fetch(&self) {
        let delay = self.lock().load_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl HighlightLibraryPort for HeadlessHighlightLibrary {
    async fn load_driver_module(&self) -> Result<Arc<dyn HighlightDriverFactoryPort>, DriverError> {
        self.simulate_fetch().await;
        let failure = {
            let mut state = self.lock();
            state.module_loads += 1;
            state.fail_module.take()
        };
        if let Some(message) = failure {
            warn!("Driver module load failed: {}", message);
            return Err(DriverError::LoadFailed(message));
        }
        debug!("Driver module loaded ({:?} build)", self.build);
        Ok(Arc::new(HeadlessDriverFactory {
            library: self.clone(),
        }))
    }

    async fn load_theme(&self) -> Result<(), DriverError> {
        self.simulate_fetch().await;
        let failure = {
            let mut state = self.lock();
            state.theme_loads += 1;
            state.fail_theme.take()
        };
        match failure {
            Some(message) => {
                warn!("Driver theme load failed: {}", message);
                Err(DriverError::LoadFailed(message))
            }
            None => Ok(()),
        }
    }
}

struct HeadlessDriverFactory {
    library: HeadlessHighlightLibrary,
}

impl HighlightDriverFactoryPort for HeadlessDriverFactory {
    fn create_driver(
        &self,
        options: DriverOptions,
    ) -> Result<Arc<dyn HighlightDriverPort>, DriverError> {
        let driver = Arc::new(HeadlessDriver::new(self.library.build, options));
        self.library.lock().drivers.push(driver.clone());
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_records_created_drivers() {
        let library = HeadlessHighlightLibrary::new(DriverBuild::Legacy);

        let factory = library.load_driver_module().await.unwrap();
        factory.create_driver(DriverOptions::default()).unwrap();

        assert_eq!(library.module_loads(), 1);
        assert_eq!(library.drivers_created(), 1);
        let driver = library.last_driver().unwrap();
        assert_eq!(driver.build(), DriverBuild::Legacy);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let library = HeadlessHighlightLibrary::new(DriverBuild::Modern);
        library.fail_next_theme_load("stylesheet 404");

        assert_eq!(
            library.load_theme().await,
            Err(DriverError::LoadFailed("stylesheet 404".to_string()))
        );
        assert!(library.load_theme().await.is_ok());
        assert_eq!(library.theme_loads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn load_delay_is_applied() {
        let library = HeadlessHighlightLibrary::new(DriverBuild::Modern);
        library.set_load_delay(Duration::from_millis(300));
        let started = tokio::time::Instant::now();

        library.load_theme().await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
