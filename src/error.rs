use thiserror::Error;

/// Errors surfaced by the simulation core to its callers.
///
/// Validation, capacity and unknown-agent conditions are detected before any
/// state is touched. `Internal` is only produced by a failed training step and
/// is confined to the agent that raised it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("{0}")]
    Validation(String),

    #[error("Disaster limit reached ({limit} max). Clear some disasters first.")]
    Capacity { limit: usize },

    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Training step failed for {agent}: {message}")]
    Internal { agent: String, message: String },
}

impl SimError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SimError::Validation(message.into())
    }

    /// True for conditions a request layer reports as a client error.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SimError::Internal { .. })
    }
}
