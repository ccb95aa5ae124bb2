use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth client id is not configured")]
    MissingClientId,

    #[error("User consent was not completed within {seconds}s")]
    ConsentTimeout { seconds: u64 },

    #[error("User consent denied: {0}")]
    ConsentDenied(String),

    #[error("Consent flow was abandoned before completing")]
    ConsentAbandoned,

    #[error("Consent could not be requested: {0}")]
    ConsentUnavailable(String),

    #[error("OAuth state mismatch")]
    InvalidState,

    #[error("Invalid consent response: {0}")]
    InvalidResponse(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Token revocation failed: {0}")]
    RevokeFailed(String),

    #[error("Invalid auth configuration: {0}")]
    Config(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Whether asking the user again could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::ConsentTimeout { .. }
                | AuthError::ConsentAbandoned
                | AuthError::ConsentDenied(_)
                | AuthError::InvalidState
                | AuthError::NotAuthenticated
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
