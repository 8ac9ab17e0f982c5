//! Group member partitions with aggregated scores.

use std::sync::Arc;

use rollcall_core::{GroupId, GroupMember, MemberRole, MemberUpdate, ProfileId, SessionHistoryEntry};
use tracing::info;

use crate::cascade::CascadeInvalidator;
use crate::error::{RemoteError, SyncError};
use crate::fetch::{FetchPolicy, PartitionCache, Shared, lock, read_partition, tracked};
use crate::remote::{HistoryRemote, MemberRemote, SessionRemote};
use crate::score;

/// What a member may do inside a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberPermissions {
    /// Member owns the group.
    pub is_owner: bool,
    /// Member is an admin or the owner.
    pub is_admin_or_owner: bool,
    /// Member may remove other members.
    pub can_remove_members: bool,
    /// Member may change roles.
    pub can_update_roles: bool,
}

impl MemberPermissions {
    /// Permissions granted by `role`; none for non-members.
    #[must_use]
    pub const fn for_role(role: Option<MemberRole>) -> Self {
        let Some(role) = role else {
            return Self {
                is_owner: false,
                is_admin_or_owner: false,
                can_remove_members: false,
                can_update_roles: false,
            };
        };
        let is_owner = matches!(role, MemberRole::Owner);
        Self {
            is_owner,
            is_admin_or_owner: role.can_manage_members(),
            can_remove_members: role.can_manage_members(),
            can_update_roles: is_owner,
        }
    }
}

/// Member reads and writes over the shared member cache.
pub struct MemberRepository<R> {
    remote: Arc<R>,
    cache: Shared<PartitionCache<GroupMember>>,
    policy: FetchPolicy,
    cascade: CascadeInvalidator,
}

impl<R> MemberRepository<R> {
    /// Repository over a shared cache.
    pub const fn new(
        remote: Arc<R>,
        cache: Shared<PartitionCache<GroupMember>>,
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

    /// Cached members of a group, oldest first.
    pub fn members(&self, group: GroupId) -> Vec<GroupMember> {
        lock(&self.cache).store.list(&group)
    }

    /// Cached membership of `profile` in `group`.
    pub fn member(&self, group: GroupId, profile: ProfileId) -> Option<GroupMember> {
        lock(&self.cache)
            .store
            .values()
            .find(|m| m.group_id == group && m.profile_id == profile)
            .cloned()
    }

    /// Permissions of `profile` in `group` according to the cache.
    pub fn permissions(&self, group: GroupId, profile: ProfileId) -> MemberPermissions {
        MemberPermissions::for_role(self.member(group, profile).map(|m| m.role))
    }

    /// Whether a member request is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.cache).status.is_loading()
    }

    /// Last member error message.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.cache).status.last_error().map(str::to_owned)
    }
}

impl<R: MemberRemote + SessionRemote + HistoryRemote> MemberRepository<R> {
    /// Members of a group with their scores across every session of the group.
    ///
    /// Scores are recomputed from the remote history on every fresh fetch.
    pub async fn fetch_group_members(&self, group: GroupId, force: bool) -> Vec<GroupMember> {
        let fetch = async {
            let mut members = self.remote.group_members(group).await?;
            let history = self.group_history(group).await?;
            score::apply_member_scores(&mut members, &history);
            Ok::<_, RemoteError>(members)
        };
        read_partition(&self.cache, self.policy, group, force, fetch).await
    }

    /// One membership with its score, written into the cache.
    pub async fn fetch_member(&self, group: GroupId, profile: ProfileId) -> Option<GroupMember> {
        let fetch = async {
            let mut member = self.remote.member(group, profile).await?;
            let history = self.group_history(group).await?;
            score::apply_member_scores(std::slice::from_mut(&mut member), &history);
            Ok::<_, RemoteError>(member)
        };
        let member = tracked(&self.cache, "fetch member", fetch).await.ok()?;
        lock(&self.cache).store.upsert(member.clone());
        Some(member)
    }

    async fn group_history(&self, group: GroupId) -> Result<Vec<SessionHistoryEntry>, RemoteError> {
        let sessions: Vec<_> = self
            .remote
            .sessions_by_group(group)
            .await?
            .iter()
            .map(|session| session.id)
            .collect();
        if sessions.is_empty() {
            return Ok(Vec::new());
        }
        self.remote.history_for_sessions(&sessions).await
    }

    /// Remove a cached member from a group.
    ///
    /// # Errors
    /// `MemberNotCached` when the member was never loaded; remote failures
    /// otherwise (only owners and admins may remove, the owner cannot be removed).
    pub async fn remove_member(&self, group: GroupId, profile: ProfileId) -> Result<(), SyncError> {
        let Some(member) = self.member(group, profile) else {
            let err = SyncError::MemberNotCached { group, profile };
            lock(&self.cache).status.fail(err.to_string());
            return Err(err);
        };
        tracked(
            &self.cache,
            "remove member",
            self.remote.remove_member(group, profile),
        )
        .await?;
        lock(&self.cache).store.remove(&member.id);
        info!(%group, %profile, "Removed member");
        Ok(())
    }

    /// Change a member's role and patch the cached row.
    ///
    /// # Errors
    /// Propagates remote failures; only the owner may change roles.
    pub async fn update_member_role(
        &self,
        group: GroupId,
        profile: ProfileId,
        role: MemberRole,
    ) -> Result<GroupMember, SyncError> {
        let updated = tracked(
            &self.cache,
            "update member role",
            self.remote.update_member_role(group, profile, role),
        )
        .await?;
        let patch = MemberUpdate {
            role: Some(updated.role),
            score: None,
        };
        let mut cache = lock(&self.cache);
        let member = match cache.store.patch(&updated.id, &patch) {
            Some(patched) => patched,
            None => {
                cache.store.upsert(updated.clone());
                updated
            }
        };
        drop(cache);
        info!(%group, %profile, %role, "Updated member role");
        Ok(member)
    }

    /// Invalidate the group's member partition and fetch it again.
    pub async fn refresh_group_members(&self, group: GroupId) -> Vec<GroupMember> {
        self.cascade.invalidate_members(group);
        self.fetch_group_members(group, true).await
    }
}
