use thiserror::Error;

/// Failures raised while assembling the runtime
#[derive(Error, Debug)]
pub enum Error {
    /// A setting failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A host capability was neither injected nor provided by a feature shim
    #[error("Missing host capability '{capability}': {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The global tracing subscriber could not be installed
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}

impl Error {
    pub fn capability_missing(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CapabilityMissing {
            capability: capability.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
