use shared::error::CatalogError;
use thiserror::Error;

/// Synchronous refusals. Remote failures never surface here; they become
/// transcript entries instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid domain: {0}")]
    InvalidDomain(#[from] CatalogError),
    #[error("command must not be empty")]
    EmptyCommand,
    #[error("a command is already awaiting the engine")]
    RequestPending,
    #[error("no domain is active")]
    NoActiveDomain,
    #[error("session has been shut down")]
    ShutDown,
}
