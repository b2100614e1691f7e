use thiserror::Error;

use gatekeep_model::AttendeeId;

/// User-facing failure taxonomy. Every error raised by the coordinator maps
/// onto one of these so the presentation layer can pick a notice style
/// without matching on concrete error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure. Nothing is retried automatically.
    Network,
    /// Non-2xx response or an unreadable payload.
    Server,
    /// A scanned code or requested attendee is not in the loaded queue.
    NotFound,
    /// The request was rejected locally before reaching the server.
    Validation,
    /// The camera could not be acquired.
    Device,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error("check-out queues are area scoped but no session area was given")]
    MissingSessionArea,
}

impl RosterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RosterError::Network(_) => ErrorKind::Network,
            RosterError::Server { .. } | RosterError::Decode(_) => {
                ErrorKind::Server
            }
            RosterError::MissingSessionArea => ErrorKind::Validation,
        }
    }
}

impl From<reqwest::Error> for RosterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RosterError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RosterError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RosterError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error(transparent)]
    Remote(#[from] RosterError),

    #[error("attendee {0} has no check-out status")]
    MissingCheckOutStatus(AttendeeId),

    #[error("check-out requires a session area")]
    MissingSessionArea,

    #[error("attendee {0} is not in the current queue")]
    NotInQueue(AttendeeId),

    #[error("a request for attendee {0} is already in progress")]
    AlreadyPending(AttendeeId),
}

impl MutationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::Remote(err) => err.kind(),
            MutationError::NotInQueue(_) => ErrorKind::NotFound,
            MutationError::MissingCheckOutStatus(_)
            | MutationError::MissingSessionArea
            | MutationError::AlreadyPending(_) => ErrorKind::Validation,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("the camera is already capturing")]
    CameraBusy,

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("no attendee in the current queue matches code {0:?}")]
    NotFound(String),
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::CameraBusy => ErrorKind::Validation,
            ScanError::CameraUnavailable(_) => ErrorKind::Device,
            ScanError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("invalid gate: {0}")]
    Validation(String),

    #[error(transparent)]
    Remote(#[from] RosterError),
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Validation(_) => ErrorKind::Validation,
            GateError::Remote(err) => err.kind(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("gate session has shut down")]
    Closed,
}

pub type RosterResult<T> = std::result::Result<T, RosterError>;
