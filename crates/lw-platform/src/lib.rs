//! # lw-platform
//!
//! Runtime-facing implementations of the lapwatch ports that need no
//! browser: an in-process document tree, a stopwatch page rendered into it,
//! and a scriptable highlight driver.

pub mod document;
pub mod highlight;
pub mod page;

pub use document::HeadlessDocument;
pub use highlight::{DriverBuild, HeadlessDriver, HeadlessHighlightLibrary};
pub use page::{HeadlessStopwatchPage, TimerMode};
