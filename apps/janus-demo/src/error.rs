//! Error types for the demo binary.

use janus_core::error::ConfigError;
use janus_host::HostError;

/// Anything that stops `janusd` from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Host(#[from] HostError),
}

pub type DemoResult<T> = Result<T, DemoError>;
