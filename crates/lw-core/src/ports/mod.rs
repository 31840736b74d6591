//! Port interfaces for the tour engine
//!
//! Ports define the contract between the tour use cases and the outside
//! world: the application store, the document, the highlight driver and
//! browser storage. This follows Hexagonal Architecture principles, keeping
//! the tour logic independent of any concrete UI runtime.
//!
//! ## Port Placement Guidelines
//!
//! A port belongs here when the tour consumes it and some adapter layer
//! (`lw-infra`, `lw-platform`, or a real browser binding) implements it.

pub mod document;
pub mod errors;
pub mod highlight;
mod palette;
pub mod state_store;
pub mod storage;
mod subscription;

pub use document::{
    DocumentPort, DomEvent, DomEventKind, ElementRef, EventListener, MutationListener,
    MutationObserverInit,
};
pub use errors::{DriverError, StorageError};
pub use highlight::{
    DriverCall, DriverCallback, DriverEventName, DriverMethod, HighlightDriverFactoryPort,
    HighlightDriverPort, HighlightLibraryPort, LifecycleMethod,
};
pub use palette::PalettePort;
pub use state_store::{StateStorePort, StoreListener};
pub use storage::{KeyValueStoragePort, TourProgressPort};
pub use subscription::Subscription;
