//! Unified error handling for papod.
//!
//! Message handling funnels every failure into [`HandlerError`]; the
//! connection loop turns it into an `error` reply (when one is warranted) and
//! decides whether the connection survives.

use papo_proto::Message;
use thiserror::Error;

// ============================================================================
// Handler Errors (message processing)
// ============================================================================

/// Errors that can occur while handling one inbound message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid name")]
    InvalidName,

    #[error("name in use: {0}")]
    NameInUse(String),

    #[error("no such user: {0}")]
    UserNotFound(String),

    #[error("unknown message type")]
    UnknownType,

    #[error("invalid group name")]
    InvalidGroup,

    #[error("group already exists: {0}")]
    GroupExists(String),

    #[error("no such group: {0}")]
    NoSuchGroup(String),

    #[error("first message must be a join")]
    JoinRequired,

    #[error("already joined")]
    AlreadyJoined,

    #[error("undecodable line")]
    InvalidJson,

    #[error("line exceeds the configured limit")]
    MessageTooLong,

    /// Orderly goodbye; ends the connection loop without a reply.
    #[error("client left")]
    Leave,
}

impl HandlerError {
    /// Get the stable wire code for this error.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::NameInUse(_) => "name_in_use",
            Self::UserNotFound(_) => "user_not_found",
            Self::UnknownType => "unknown_type",
            Self::InvalidGroup => "grupo_invalido",
            Self::GroupExists(_) => "grupo_existente",
            Self::NoSuchGroup(_) => "grupo_inexistente",
            Self::JoinRequired => "join_required",
            Self::AlreadyJoined => "already_joined",
            Self::InvalidJson => "invalid_json",
            Self::MessageTooLong => "message_too_long",
            Self::Leave => "leave",
        }
    }

    /// Convert to an `error` reply for the offending sender.
    ///
    /// Returns `None` for [`HandlerError::Leave`], which is a loop-exit
    /// signal rather than a protocol error.
    pub fn to_error_reply(&self) -> Option<Message> {
        match self {
            Self::Leave => None,
            _ => Some(Message::error(self.error_code())),
        }
    }
}

/// Result type for message handlers.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

// ============================================================================
// Registry / Group Errors (state operations)
// ============================================================================

/// Session registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("name is empty or contains a line terminator")]
    Invalid,

    #[error("name already taken: {0}")]
    Taken(String),
}

/// Group directory failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("group name is empty")]
    Invalid,

    #[error("group already exists: {0}")]
    Exists(String),

    #[error("no such group: {0}")]
    NotFound(String),
}

impl From<RegisterError> for HandlerError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Invalid => HandlerError::InvalidName,
            RegisterError::Taken(name) => HandlerError::NameInUse(name),
        }
    }
}

impl From<GroupError> for HandlerError {
    fn from(e: GroupError) -> Self {
        match e {
            GroupError::Invalid => HandlerError::InvalidGroup,
            GroupError::Exists(group) => HandlerError::GroupExists(group),
            GroupError::NotFound(group) => HandlerError::NoSuchGroup(group),
        }
    }
}
