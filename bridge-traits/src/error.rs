use thiserror::Error;

/// Failure reported by a host capability
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host does not provide this capability
    #[error("capability not available: {0}")]
    NotAvailable(String),

    #[error("host operation failed: {0}")]
    OperationFailed(String),

    /// Failed below HTTP (connect, reset, timeout); worth retrying
    #[error("network failure: {0}")]
    Network(String),
}

impl BridgeError {
    pub fn is_network(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
