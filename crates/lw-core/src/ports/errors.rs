use thiserror::Error;

/// Failures raised by a highlight driver or while loading it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The driver build does not expose the requested method or event.
    #[error("driver capability not available: {0}")]
    Unsupported(String),

    /// The vendor code failed while handling a call.
    #[error("driver call failed: {0}")]
    Vendor(String),

    /// The driver module or theme asset could not be loaded.
    #[error("failed to load highlight library: {0}")]
    LoadFailed(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
