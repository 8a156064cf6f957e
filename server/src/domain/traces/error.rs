//! Trace consumer error types

use thiserror::Error;
use tonic::Status;

use crate::core::context::ContextError;

/// Error returned by a [`TracesConsumer`](super::TracesConsumer).
///
/// The variant is the classification. Callers query it through
/// [`is_permanent`](Self::is_permanent) and [`grpc_status`](Self::grpc_status)
/// rather than matching on variants.
#[derive(Error, Debug, Clone)]
pub enum ConsumerError {
    /// Unclassified failure
    #[error("{0}")]
    Other(String),

    /// Retrying the same batch will fail the same way
    #[error("{0}")]
    Permanent(String),

    /// Transient failure, the batch may be accepted on retry
    #[error("{0}")]
    NonPermanent(String),

    /// Already classified against the wire protocol
    #[error("{}", .0.message())]
    Status(Status),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl ConsumerError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn non_permanent(message: impl Into<String>) -> Self {
        Self::NonPermanent(message.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// The protocol status this error was pre-bound to, if any
    pub fn grpc_status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Other(_) => "other",
            Self::Permanent(_) => "permanent",
            Self::NonPermanent(_) => "non_permanent",
            Self::Status(_) => "status",
            Self::Context(ContextError::Cancelled) => "cancelled",
            Self::Context(ContextError::DeadlineExceeded) => "deadline_exceeded",
        }
    }
}

impl From<Status> for ConsumerError {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}
