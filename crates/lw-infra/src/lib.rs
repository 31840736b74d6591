//! # lw-infra
//!
//! Adapters behind the lapwatch ports that do not depend on a UI runtime:
//! the application store, key/value storage backends, the tour progress
//! repository and the TOML configuration loader.

pub mod config;
pub mod palette;
pub mod storage;
pub mod store;
pub mod tour_progress;

pub use palette::StaticPalette;
pub use storage::{FileKeyValueStorage, InMemoryKeyValueStorage};
pub use store::InMemoryAppStore;
pub use tour_progress::TourProgressRepository;
