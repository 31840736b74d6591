use lw_core::ports::DriverError;

use super::waiters::WaitError;

/// Errors produced while a tour step is being reached or advanced.
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("no latest lap to recolor")]
    MissingLatestLap,
}

impl TourError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TourError::Wait(WaitError::Cancelled))
    }
}
