//! Error taxonomy of the cache and synchronization layer.

use rollcall_core::{EntityClass, GroupId, ProfileId, SessionId, SessionStatus};
use thiserror::Error;

/// Failure reported by a remote data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No actor id could be resolved.
    #[error("User not authenticated")]
    Unauthenticated,

    /// The addressed entity does not exist remotely.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity class looked up.
        entity: EntityClass,
        /// Key that was looked up.
        key: String,
    },

    /// A role check failed.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Uniqueness violation or malformed payload.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Transport or server-side failure, opaque to the cache.
    #[error("Remote failure: {0}")]
    Failure(String),
}

/// Error surfaced by cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Remote source failure.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Check-in target session does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Check-in target session is not open.
    #[error("Session {session} is {status}; check-ins require an open session")]
    SessionNotOpen {
        /// Target session.
        session: SessionId,
        /// Status observed when the check-in was attempted.
        status: SessionStatus,
    },

    /// The member already has a check-in in this session.
    #[error("Profile {member} already checked in to session {session}")]
    DuplicateCheckin {
        /// Target session.
        session: SessionId,
        /// Member profile.
        member: ProfileId,
    },

    /// Member management needs the member row in the cache first.
    #[error("Profile {profile} is not a cached member of group {group}")]
    MemberNotCached {
        /// Group searched.
        group: GroupId,
        /// Profile searched.
        profile: ProfileId,
    },
}

/// Coarse error categories shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No actor id resolvable.
    Unauthenticated,
    /// Point entity absent.
    NotFound,
    /// Role check failed.
    PermissionDenied,
    /// Uniqueness violation or malformed payload.
    ValidationFailed,
    /// Transport or server-side error.
    RemoteFailure,
}

impl RemoteError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Failure(_) => ErrorKind::RemoteFailure,
        }
    }

    /// Whether the remote reported the entity as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl SyncError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(err) => err.kind(),
            Self::SessionNotFound(_) | Self::MemberNotCached { .. } => ErrorKind::NotFound,
            Self::SessionNotOpen { .. } | Self::DuplicateCheckin { .. } => {
                ErrorKind::ValidationFailed
            }
        }
    }
}
