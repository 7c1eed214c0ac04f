use thiserror::Error as ThisError;

/// A message that is well-formed but not allowed in the connection's current state.
/// The `Display` text is what the client sees in the Error frame.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RoleViolation {
    #[error("already identified as {0}")]
    AlreadyIdentified(&'static str),
    #[error("not a camera")]
    NotACamera,
    #[error("heartbeat already requested")]
    AlreadyBeating,
}

#[derive(Debug, ThisError)]
pub enum Error {
    /// Unknown message type, malformed frame or a message only servers may send.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Role(#[from] RoleViolation),
    /// Raised by the encoder; nothing is written.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
impl Error {
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Whether the client should be told about this error before being disconnected.
    pub fn is_reportable(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Role(_))
    }
}
