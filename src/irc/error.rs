//! Engine error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("establishing connection: hostname is empty")]
    EmptyHost,

    #[error("establishing connection: port must be non-zero")]
    ZeroPort,

    #[error("establishing connection: nickname is empty")]
    EmptyNick,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid TLS server name '{0}'")]
    InvalidServerName(String),

    #[error("executing command: invalid key '{0}'")]
    InvalidKey(String),

    #[error("session closed")]
    Closed,
}

impl EngineError {
    /// True for the pre-connect checks that never touch the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::EmptyHost | EngineError::ZeroPort | EngineError::EmptyNick
        )
    }
}
