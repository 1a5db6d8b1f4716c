//! Error types for the message bus

/// Bus error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The responder's deferred reply failed
    #[error("responder failed: {0}")]
    Responder(String),

    /// The reply slot was dropped before a reply arrived
    #[error("request abandoned before a reply arrived")]
    Abandoned,

    /// A deferred reply needs a tokio runtime and none was running
    #[error("no async runtime available to resolve a deferred reply")]
    NoRuntime,
}

impl BusError {
    /// Create a responder failure from any displayable error
    #[inline]
    pub fn responder(error: impl std::fmt::Display) -> Self {
        Self::Responder(error.to_string())
    }
}
