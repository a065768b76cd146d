use thiserror::Error;

/// Errors raised while assembling the runtime around the offline cache.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bridge the cache depends on was neither injected nor defaultable
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
