//! Session partitions keyed by group.

use std::sync::Arc;

use rollcall_core::{GroupId, NewSession, Session, SessionId, SessionUpdate};
use tracing::info;

use crate::cascade::CascadeInvalidator;
use crate::error::SyncError;
use crate::fetch::{FetchPolicy, PartitionCache, Shared, lock, read_partition, tracked};
use crate::remote::SessionRemote;

/// Session reads and writes over the shared session cache.
pub struct SessionRepository<R> {
    remote: Arc<R>,
    cache: Shared<PartitionCache<Session>>,
    policy: FetchPolicy,
    cascade: CascadeInvalidator,
}

impl<R> SessionRepository<R> {
    /// Repository over a shared cache.
    pub const fn new(
        remote: Arc<R>,
        cache: Shared<PartitionCache<Session>>,
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

    /// Cached session.
    pub fn session(&self, id: SessionId) -> Option<Session> {
        lock(&self.cache).store.get(&id).cloned()
    }

    /// Cached sessions of a group in server order.
    pub fn sessions(&self, group: GroupId) -> Vec<Session> {
        lock(&self.cache).store.list(&group)
    }

    /// Whether the group's partition is within its TTL.
    pub fn is_fresh(&self, group: GroupId) -> bool {
        lock(&self.cache).store.is_valid(&group)
    }

    /// Whether a session request is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.cache).status.is_loading()
    }

    /// Last session error message.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.cache).status.last_error().map(str::to_owned)
    }
}

impl<R: SessionRemote> SessionRepository<R> {
    /// Sessions of a group, newest created first.
    pub async fn fetch_sessions_by_group(&self, group: GroupId, force: bool) -> Vec<Session> {
        read_partition(
            &self.cache,
            self.policy,
            group,
            force,
            self.remote.sessions_by_group(group),
        )
        .await
    }

    /// Session by id: cached value when present, otherwise fetched.
    ///
    /// A cached session is never re-validated against a TTL.
    pub async fn fetch_session(&self, id: SessionId) -> Option<Session> {
        if let Some(hit) = self.session(id) {
            return Some(hit);
        }
        self.load_session(id).await
    }

    async fn load_session(&self, id: SessionId) -> Option<Session> {
        let session = tracked(&self.cache, "fetch session", self.remote.session(id))
            .await
            .ok()?;
        lock(&self.cache).store.upsert(session.clone());
        Some(session)
    }

    /// Most recently updated sessions of a group. Not cached.
    pub async fn fetch_recent_sessions(&self, group: GroupId, limit: usize) -> Vec<Session> {
        tracked(
            &self.cache,
            "fetch recent sessions",
            self.remote.recent_sessions(group, limit),
        )
        .await
        .unwrap_or_default()
    }

    /// Create a session and invalidate its group's partition.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn create_session(&self, new: NewSession) -> Result<Session, SyncError> {
        let session = tracked(&self.cache, "create session", self.remote.create_session(new)).await?;
        lock(&self.cache).store.put(session.clone());
        self.cascade.session_mutated(session.group_id);
        info!(session = %session.id, group = %session.group_id, "Created session");
        Ok(session)
    }

    /// Update a session, write it through and invalidate its group's partition.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn update_session(
        &self,
        id: SessionId,
        update: &SessionUpdate,
    ) -> Result<Session, SyncError> {
        let session = tracked(
            &self.cache,
            "update session",
            self.remote.update_session(id, update),
        )
        .await?;
        lock(&self.cache).store.put(session.clone());
        self.cascade.session_mutated(session.group_id);
        info!(session = %id, status = %session.status, "Updated session");
        Ok(session)
    }

    /// Delete a session, evict it and invalidate its group's partition.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn delete_session(&self, id: SessionId) -> Result<(), SyncError> {
        let cached = self.session(id).map(|s| s.group_id);
        let group = match cached {
            Some(group) => group,
            None => {
                tracked(&self.cache, "fetch session", self.remote.session(id))
                    .await?
                    .group_id
            }
        };
        tracked(&self.cache, "delete session", self.remote.delete_session(id)).await?;
        lock(&self.cache).store.remove(&id);
        self.cascade.session_mutated(group);
        info!(session = %id, %group, "Deleted session");
        Ok(())
    }

    /// Invalidate the group's partition and fetch it again.
    pub async fn refresh_group_sessions(&self, group: GroupId) -> Vec<Session> {
        self.cascade.invalidate_sessions(group);
        self.fetch_sessions_by_group(group, true).await
    }

    /// Fetch one session from the remote source regardless of the cache.
    pub async fn refresh_session(&self, id: SessionId) -> Option<Session> {
        self.load_session(id).await
    }
}
