//! Browser-style key/value storage and tour progress ports.

use super::StorageError;
use crate::tour::PersistedTourState;

/// The localStorage contract: string keys, string values, synchronous.
pub trait KeyValueStoragePort: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Persisted tour progress.
///
/// Implementations swallow storage failures: onboarding must never break the
/// host app because storage is blocked or full.
pub trait TourProgressPort: Send + Sync {
    fn load(&self) -> PersistedTourState;

    fn save(&self, state: &PersistedTourState);

    /// Whether the tour was completed in an earlier session.
    fn is_completed(&self) -> bool {
        self.load().is_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        pub Progress {}

        impl TourProgressPort for Progress {
            fn load(&self) -> PersistedTourState;
            fn save(&self, state: &PersistedTourState);
        }
    }

    #[test]
    fn is_completed_reads_through_load() {
        let mut progress = MockProgress::new();
        progress
            .expect_load()
            .times(1)
            .returning(PersistedTourState::completed);
        assert!(progress.is_completed());
    }

    #[test]
    fn non_true_completion_is_not_completed() {
        let mut progress = MockProgress::new();
        progress.expect_load().times(2).returning(|| PersistedTourState {
            completed: Some(false),
        });
        assert!(!progress.is_completed());
        assert!(!progress.load().is_completed());
    }
}
