use std::fmt;

use relay_core::FailureClass;

use crate::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Everything that can abort a reconciliation cycle.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Credentials rejected, a login token missing, or a request bounced to the login page.
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl RelayError {
    pub fn class(&self) -> FailureClass {
        match self {
            RelayError::Authentication(_) => FailureClass::Authentication,
            RelayError::Transport(_) => FailureClass::Transport,
            RelayError::Parse(_) => FailureClass::Parse,
        }
    }
}
