//! # lapwatch
//!
//! Application shell for the lapwatch onboarding tour: tracing setup and
//! dependency wiring. The tour itself lives in `lw-app`.

pub mod bootstrap;
