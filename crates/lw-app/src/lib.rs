//! lapwatch Application Orchestration Layer
//!
//! This crate contains the onboarding tour use cases: waiters, the step
//! script, the highlight adapter and the tour controller.

pub mod usecases;

pub use usecases::tour::{TourController, TourDeps};
