//! Error types for triad.

use thiserror::Error;

use crate::agent::ExecutionError;
use crate::providers::ProviderError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A message was addressed to a name that never registered on the bus.
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    /// A receive was attempted on a mailbox that was never registered.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wiring bugs: the only errors allowed past the orchestrator boundary.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::UnknownRecipient(_) | Error::UnknownAgent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_are_classified() {
        assert!(Error::UnknownRecipient("Worker".into()).is_protocol());
        assert!(Error::UnknownAgent("Verifier".into()).is_protocol());
        assert!(!Error::Tool("boom".into()).is_protocol());
        assert!(!Error::Other("x".into()).is_protocol());
    }

    #[test]
    fn display_names_the_agent() {
        let err = Error::UnknownRecipient("Ghost".into());
        assert_eq!(err.to_string(), "Unknown recipient: Ghost");
    }
}
