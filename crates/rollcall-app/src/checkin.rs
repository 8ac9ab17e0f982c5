//! One check-in per member per session.

use std::sync::Arc;

use rollcall_core::{
    CHECKIN_ACTION, CHECKIN_DESCRIPTION, NewHistoryEntry, ProfileId, SessionHistoryEntry,
    SessionId,
};
use tracing::{debug, info};

use crate::error::{RemoteError, SyncError};
use crate::fetch::{PartitionCache, Shared, lock, tracked};
use crate::remote::{HistoryRemote, IdentityRemote, SessionRemote};

/// Checks session status and existing check-ins before writing a new one.
///
/// The checks and the write are separate remote calls with no lock between
/// them. Two concurrent attempts for the same member can both pass the checks;
/// only a uniqueness rule in the remote source would stop the second write.
pub struct IdempotencyGuard<R> {
    remote: Arc<R>,
    history: Shared<PartitionCache<SessionHistoryEntry>>,
    score: i64,
}

impl<R> IdempotencyGuard<R> {
    /// Guard writing check-ins worth `score` into the shared history cache.
    pub const fn new(
        remote: Arc<R>,
        history: Shared<PartitionCache<SessionHistoryEntry>>,
        score: i64,
    ) -> Self {
        Self {
            remote,
            history,
            score,
        }
    }

    /// Score each check-in contributes.
    pub const fn score(&self) -> i64 {
        self.score
    }
}

impl<R: IdentityRemote + SessionRemote + HistoryRemote> IdempotencyGuard<R> {
    /// Check `member` (the actor when omitted) in to `session`.
    ///
    /// # Errors
    /// `SessionNotFound`, `SessionNotOpen` or `DuplicateCheckin` when a
    /// precondition fails, remote failures otherwise. Nothing is written on error.
    pub async fn perform_checkin(
        &self,
        session: SessionId,
        member: Option<ProfileId>,
    ) -> Result<SessionHistoryEntry, SyncError> {
        let entry = tracked(&self.history, "check in", self.checkin(session, member)).await?;
        lock(&self.history).store.insert(entry.clone());
        info!(%session, member = %entry.member_id, by = %entry.by_profile_id, "Checked in");
        Ok(entry)
    }

    async fn checkin(
        &self,
        session_id: SessionId,
        member: Option<ProfileId>,
    ) -> Result<SessionHistoryEntry, SyncError> {
        let member = match member {
            Some(id) => id,
            None => self.remote.current_actor_id().await?,
        };
        let session = match self.remote.session(session_id).await {
            Ok(session) => session,
            Err(RemoteError::NotFound { .. }) => return Err(SyncError::SessionNotFound(session_id)),
            Err(err) => return Err(err.into()),
        };
        if !session.status.accepts_checkins() {
            return Err(SyncError::SessionNotOpen {
                session: session_id,
                status: session.status,
            });
        }
        if self.remote.find_checkin(session_id, member).await?.is_some() {
            return Err(SyncError::DuplicateCheckin {
                session: session_id,
                member,
            });
        }
        debug!(session = %session_id, %member, "Check-in preconditions passed");
        let entry = self
            .remote
            .create_history_entry(NewHistoryEntry {
                session_id,
                member_id: member,
                action: CHECKIN_ACTION.to_owned(),
                action_description: Some(CHECKIN_DESCRIPTION.to_owned()),
                score: Some(self.score),
            })
            .await?;
        Ok(entry)
    }
}
