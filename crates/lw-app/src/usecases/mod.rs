pub mod tour;

pub use tour::{TourController, TourDeps, TourError};
