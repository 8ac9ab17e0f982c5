//! Session history partitions keyed by session.

use std::sync::Arc;

use rollcall_core::{
    GroupId, HistoryEntryId, NewHistoryEntry, ProfileId, Session, SessionHistoryEntry, SessionId,
};
use tracing::info;

use crate::cascade::CascadeInvalidator;
use crate::error::SyncError;
use crate::fetch::{FetchPolicy, PartitionCache, Shared, lock, read_partition, tracked};
use crate::remote::HistoryRemote;
use crate::score::{self, SessionStats};

/// History reads and writes over the shared history cache.
pub struct HistoryRepository<R> {
    remote: Arc<R>,
    cache: Shared<PartitionCache<SessionHistoryEntry>>,
    policy: FetchPolicy,
    cascade: CascadeInvalidator,
}

impl<R> HistoryRepository<R> {
    /// Repository over a shared cache.
    pub const fn new(
        remote: Arc<R>,
        cache: Shared<PartitionCache<SessionHistoryEntry>>,
        policy: FetchPolicy,
        cascade: CascadeInvalidator,
    ) -> Self {
        Self {
            remote,
            cache,
            policy,
            cascade,
        }
    }

    /// Cached entries of a session, newest first.
    pub fn entries(&self, session: SessionId) -> Vec<SessionHistoryEntry> {
        lock(&self.cache).store.list(&session)
    }

    /// Newest cached check-in of `member` in `session`.
    pub fn last_checkin(&self, session: SessionId, member: ProfileId) -> Option<SessionHistoryEntry> {
        self.entries(session)
            .into_iter()
            .find(|entry| entry.member_id == member && entry.is_checkin())
    }

    /// Whether the cache holds a check-in of `member` in `session`.
    pub fn has_checked_in(&self, session: SessionId, member: ProfileId) -> bool {
        self.last_checkin(session, member).is_some()
    }

    /// Whether `member` may check in to `session` according to the cache.
    pub fn can_checkin(&self, session: &Session, member: ProfileId) -> bool {
        session.status.accepts_checkins() && !self.has_checked_in(session.id, member)
    }

    /// Total cached score of `member` in `session`.
    pub fn user_session_score(&self, session: SessionId, member: ProfileId) -> i64 {
        score::session_total(&self.entries(session), session, member)
    }

    /// Summary of a session's cached history.
    pub fn session_stats(&self, session: SessionId) -> SessionStats {
        score::session_stats(&self.entries(session))
    }

    /// Whether a history request is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.cache).status.is_loading()
    }

    /// Last history error message.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.cache).status.last_error().map(str::to_owned)
    }
}

impl<R: HistoryRemote> HistoryRepository<R> {
    /// History of a session, newest first.
    pub async fn fetch_session_history(
        &self,
        session: SessionId,
        force: bool,
    ) -> Vec<SessionHistoryEntry> {
        read_partition(
            &self.cache,
            self.policy,
            session,
            force,
            self.remote.session_history(session),
        )
        .await
    }

    /// History across a group, optionally narrowed. Not cached.
    pub async fn fetch_group_history(
        &self,
        group: GroupId,
        member: Option<ProfileId>,
        session: Option<SessionId>,
    ) -> Vec<SessionHistoryEntry> {
        tracked(
            &self.cache,
            "fetch group history",
            self.remote.group_history(group, member, session),
        )
        .await
        .unwrap_or_default()
    }

    /// Create an entry authored by the actor and insert it at the partition head.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn create_history_entry(
        &self,
        new: NewHistoryEntry,
    ) -> Result<SessionHistoryEntry, SyncError> {
        let entry = tracked(
            &self.cache,
            "create history entry",
            self.remote.create_history_entry(new),
        )
        .await?;
        lock(&self.cache).store.insert(entry.clone());
        info!(entry = %entry.id, session = %entry.session_id, action = %entry.action, "Created history entry");
        Ok(entry)
    }

    /// Delete an entry and evict it.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn delete_history_entry(&self, id: HistoryEntryId) -> Result<(), SyncError> {
        tracked(
            &self.cache,
            "delete history entry",
            self.remote.delete_history_entry(id),
        )
        .await?;
        lock(&self.cache).store.remove(&id);
        info!(entry = %id, "Deleted history entry");
        Ok(())
    }

    /// Invalidate the session's partition and fetch it again.
    pub async fn refresh_session_history(&self, session: SessionId) -> Vec<SessionHistoryEntry> {
        self.cascade.invalidate_history(session);
        self.fetch_session_history(session, true).await
    }
}
