//! Group point cache and the user's memberships.

use std::sync::Arc;

use rollcall_core::{Group, GroupId, GroupMembership, GroupUpdate, NewGroup, ProfileId};
use tracing::info;

use crate::cascade::CascadeInvalidator;
use crate::error::SyncError;
use crate::fetch::{PointCache, Shared, lock, read_point, tracked};
use crate::remote::{GroupRemote, IdentityRemote};

/// Group reads and writes. Cached groups never expire.
pub struct GroupRepository<R> {
    remote: Arc<R>,
    cache: Shared<PointCache<Group>>,
    cascade: CascadeInvalidator,
}

impl<R> GroupRepository<R> {
    /// Repository over a shared cache.
    pub const fn new(
        remote: Arc<R>,
        cache: Shared<PointCache<Group>>,
        cascade: CascadeInvalidator,
    ) -> Self {
        Self {
            remote,
            cache,
            cascade,
        }
    }

    /// Cached group.
    pub fn group(&self, id: GroupId) -> Option<Group> {
        lock(&self.cache).store.get(&id).cloned()
    }

    /// Cached groups owned by `owner`, oldest first.
    pub fn user_groups(&self, owner: ProfileId) -> Vec<Group> {
        let mut groups: Vec<Group> = lock(&self.cache)
            .store
            .values()
            .filter(|group| group.owner_id == owner)
            .cloned()
            .collect();
        groups.sort_by_key(|group| (group.created_at, group.id));
        groups
    }

    /// Number of cached groups.
    pub fn cached_len(&self) -> usize {
        lock(&self.cache).store.len()
    }

    /// Whether a group request is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.cache).status.is_loading()
    }

    /// Last group error message.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.cache).status.last_error().map(str::to_owned)
    }
}

impl<R: GroupRemote + IdentityRemote> GroupRepository<R> {
    async fn resolve_user(&self, user: Option<ProfileId>) -> Result<ProfileId, SyncError> {
        match user {
            Some(id) => Ok(id),
            None => Ok(tracked(&self.cache, "resolve actor", self.remote.current_actor_id()).await?),
        }
    }

    /// Groups `user` (or the actor) belongs to. Always hits the remote source.
    pub async fn fetch_user_groups(&self, user: Option<ProfileId>) -> Vec<GroupMembership> {
        let lookup = async {
            let user = match user {
                Some(id) => id,
                None => self.remote.current_actor_id().await?,
            };
            self.remote.memberships_of(user).await
        };
        match tracked(&self.cache, "fetch user groups", lookup).await {
            Ok(memberships) => {
                lock(&self.cache)
                    .store
                    .put_many(memberships.iter().map(|m| m.group.clone()));
                memberships
            }
            Err(_) => Vec::new(),
        }
    }

    /// Group by id: cached value when present, otherwise fetched.
    pub async fn fetch_group(&self, id: GroupId) -> Option<Group> {
        read_point(&self.cache, id, self.remote.group(id)).await
    }

    /// Group by join code: cached value when present, otherwise fetched.
    pub async fn fetch_group_by_code(&self, code: &str) -> Option<Group> {
        let cached = lock(&self.cache)
            .store
            .values()
            .find(|group| group.code == code)
            .cloned();
        if cached.is_some() {
            return cached;
        }
        let group = tracked(&self.cache, "fetch group by code", self.remote.group_by_code(code))
            .await
            .ok()?;
        lock(&self.cache).store.put(group.clone());
        Some(group)
    }

    /// Join a group as `profile` (or the actor).
    ///
    /// # Errors
    /// Propagates remote failures; a second membership is `ValidationFailed`.
    pub async fn join_group(
        &self,
        group: GroupId,
        profile: Option<ProfileId>,
    ) -> Result<GroupMembership, SyncError> {
        let profile = self.resolve_user(profile).await?;
        let membership = tracked(
            &self.cache,
            "join group",
            self.remote.join_group(group, profile),
        )
        .await?;
        lock(&self.cache).store.put(membership.group.clone());
        info!(%group, %profile, "Joined group");
        Ok(membership)
    }

    /// Create a group and write it through.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn create_group(&self, new: NewGroup) -> Result<Group, SyncError> {
        let group = tracked(&self.cache, "create group", self.remote.create_group(new)).await?;
        lock(&self.cache).store.put(group.clone());
        info!(group = %group.id, code = %group.code, "Created group");
        Ok(group)
    }

    /// Update a group and write the result through.
    ///
    /// # Errors
    /// Propagates remote failures; non-owners get `PermissionDenied`.
    pub async fn update_group(&self, id: GroupId, update: &GroupUpdate) -> Result<Group, SyncError> {
        let group = tracked(
            &self.cache,
            "update group",
            self.remote.update_group(id, update),
        )
        .await?;
        lock(&self.cache).store.put(group.clone());
        info!(group = %id, "Updated group");
        Ok(group)
    }

    /// Delete a group and evict it.
    ///
    /// Member and session partitions of the group are left as they are.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn delete_group(&self, id: GroupId) -> Result<(), SyncError> {
        tracked(&self.cache, "delete group", self.remote.delete_group(id)).await?;
        self.cascade.group_deleted(id);
        info!(group = %id, "Deleted group");
        Ok(())
    }

    /// Evict the groups owned by `user` (or the actor) and fetch memberships again.
    pub async fn refresh_user_groups(&self, user: Option<ProfileId>) -> Vec<GroupMembership> {
        let Ok(user) = self.resolve_user(user).await else {
            return Vec::new();
        };
        lock(&self.cache)
            .store
            .retain(|group| group.owner_id != user);
        self.fetch_user_groups(Some(user)).await
    }

    /// Evict and fetch again.
    pub async fn refresh_group(&self, id: GroupId) -> Option<Group> {
        lock(&self.cache).store.remove(&id);
        self.fetch_group(id).await
    }
}
