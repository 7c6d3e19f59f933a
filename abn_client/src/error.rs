use abn::{InstanceId, Rejection};

use crate::Phase;

/// The error type for a single call to the match service.
#[derive(Debug)]
pub enum ServiceError {
    /// The transport failed.
    Io(std::io::Error),
    /// The reply could not be parsed, or did not carry the expected data.
    Malformed(serde_json::Error),
    /// The service understood the request and refused it.
    Rejected(Rejection),
    /// The service reported a failure without saying why.
    Unsuccessful { message: Option<String> },
    /// The service closed the connection.
    Disconnected,
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Io(err) => Some(err),
            ServiceError::Malformed(err) => Some(err),
            ServiceError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Io(_) => write!(f, "Could not reach the match service"),
            ServiceError::Malformed(_) => write!(f, "The match service sent a malformed reply"),
            ServiceError::Rejected(_) => write!(f, "The match service rejected the request"),
            ServiceError::Unsuccessful { message: Some(msg) } => {
                write!(f, "The match service reported a failure: {}", msg)
            }
            ServiceError::Unsuccessful { message: None } => {
                write!(f, "The match service reported a failure")
            }
            ServiceError::Disconnected => write!(f, "The match service closed the connection"),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Malformed(err)
    }
}

impl From<Rejection> for ServiceError {
    fn from(rejection: Rejection) -> Self {
        ServiceError::Rejected(rejection)
    }
}

/// The error type for operations on a [`SessionController`](crate::SessionController).
///
/// Invalid local state is detected before anything is sent to the service.
/// Service failures are always retryable; nothing in a session is fatal.
#[derive(Debug)]
pub enum PlayError {
    WrongPhase { expected: Phase, actual: Phase },
    NothingSelected,
    EmptyHand,
    CardNotInHand(InstanceId),
    /// No session id could be found for this player.
    MissingSession,
    Service(ServiceError),
    /// The coordinator was torn down while waiting.
    Cancelled,
    Store(anyhow::Error),
}

impl PlayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlayError::Service(_))
    }
}

impl std::error::Error for PlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlayError::Service(err) => Some(err),
            PlayError::Store(err) => Some(&**err),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayError::WrongPhase { expected, actual } => write!(
                f,
                "This is only possible in the {:?} phase, but the session is in the {:?} phase",
                expected, actual
            ),
            PlayError::NothingSelected => write!(f, "No card was selected"),
            PlayError::EmptyHand => write!(f, "There are no cards left in the hand"),
            PlayError::CardNotInHand(id) => write!(f, "Card {} is not in the hand", id),
            PlayError::MissingSession => write!(f, "No game session was found"),
            PlayError::Service(_) => write!(f, "A call to the match service failed"),
            PlayError::Cancelled => write!(f, "The round was cancelled"),
            PlayError::Store(_) => write!(f, "Could not persist the session state"),
        }
    }
}

impl From<ServiceError> for PlayError {
    fn from(err: ServiceError) -> Self {
        PlayError::Service(err)
    }
}
