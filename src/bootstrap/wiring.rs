//! # Dependency Injection / 依赖注入模块
//!
//! Assembles a [`TourController`] over headless collaborators: the in-memory
//! store, a stopwatch page mounted in a headless document, a storage backend
//! and the headless highlight library.
//!
//! This is the only place that depends on `lw-app`, `lw-infra` and
//! `lw-platform` at once. It assembles; it does not decide.

use std::path::PathBuf;
use std::sync::Arc;

use lw_app::{TourController, TourDeps};
use lw_core::ports::{DocumentPort, KeyValueStoragePort};
use lw_core::TourConfig;
use lw_infra::{
    FileKeyValueStorage, InMemoryAppStore, InMemoryKeyValueStorage, StaticPalette,
    TourProgressRepository,
};
use lw_platform::{DriverBuild, HeadlessDocument, HeadlessHighlightLibrary, HeadlessStopwatchPage};

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
/// 依赖注入错误
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),
}

/// Knobs for [`wire_headless`].
#[derive(Debug, Clone, Default)]
pub struct WiringOptions {
    /// Directory for file-backed progress; in-memory storage when `None`.
    pub storage_dir: Option<PathBuf>,
    pub driver_build: DriverBuild,
}

/// A fully wired headless app.
pub struct HeadlessApp {
    pub document: Arc<HeadlessDocument>,
    pub store: Arc<InMemoryAppStore>,
    pub page: HeadlessStopwatchPage,
    pub library: Arc<HeadlessHighlightLibrary>,
    pub controller: TourController,
}

pub fn wire_headless(config: TourConfig, options: WiringOptions) -> WiringResult<HeadlessApp> {
    let storage: Arc<dyn KeyValueStoragePort> = match options.storage_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir).map_err(|e| {
                WiringError::StorageInit(format!("{}: {}", dir.display(), e))
            })?;
            tracing::debug!(dir = %dir.display(), "using file storage");
            Arc::new(FileKeyValueStorage::with_defaults(&dir))
        }
        None => Arc::new(InMemoryKeyValueStorage::new()),
    };

    let document = Arc::new(HeadlessDocument::with_frame_interval(config.frame_interval()));
    let store = Arc::new(InMemoryAppStore::new());
    let palette = Arc::new(StaticPalette::from_config(&config));
    let page = HeadlessStopwatchPage::mount(document.clone(), store.clone(), palette.clone());
    let library = Arc::new(HeadlessHighlightLibrary::new(options.driver_build));
    let progress = Arc::new(TourProgressRepository::new(
        storage,
        config.storage_key.clone(),
    ));

    let document_port: Arc<dyn DocumentPort> = document.clone();
    let controller = TourController::new(TourDeps {
        store: store.clone(),
        document: Some(document_port),
        palette,
        progress,
        library: library.clone(),
        config,
    });

    Ok(HeadlessApp {
        document,
        store,
        page,
        library,
        controller,
    })
}
