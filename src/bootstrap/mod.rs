pub mod tracing;
pub mod wiring;

pub use self::tracing::init_tracing_subscriber;
pub use wiring::{wire_headless, HeadlessApp, WiringError, WiringOptions, WiringResult};
