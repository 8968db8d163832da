use shadowtown_types::RoomId;
use shadowtown_types::SessionId;
use shadowtown_types::SessionToken;
use thiserror::Error;

/// Setup-validation failures, split per spec.md §4.5 so the dispatcher can
/// tell a tampered payload from a well-formed but unplayable one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("malformed setup: {0}")]
    Malformed(String),
    #[error("invalid setup: {0}")]
    Invalid(String),
}

/// Every failure surface the room engine exposes (spec.md §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid session token '{0}'")]
    InvalidSessionToken(SessionToken),
    #[error("session {0:?} is not registered")]
    UnknownSession(SessionId),
    #[error("session name '{0}' is already registered")]
    NameRegistered(String),
    #[error("room {0:?} does not exist")]
    UnknownRoom(RoomId),
    #[error("room {0:?} is full")]
    RoomFull(RoomId),
    #[error("session already belongs to a room")]
    AlreadyInRoom,
    #[error("session does not belong to a room")]
    NotInRoom,
    #[error("session is not the host of its room")]
    NotHost,
    #[error("a game is already in progress in this room")]
    GameInProgress,
    #[error("no game is in progress in this room")]
    NoGameInProgress,
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("invalid vote: {0}")]
    InvalidVote(String),
    #[error("command not permitted in the current phase")]
    WrongPhase,
    #[error("engine invariant violated: {0}")]
    Invariant(String),
}
