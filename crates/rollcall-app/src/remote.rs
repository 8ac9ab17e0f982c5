//! Remote data source contract consumed by the cache layer.
//!
//! The contract is split per entity class so each repository only depends on
//! the calls it issues. [`RemoteSource`] bundles all of them.

use rollcall_core::{
    Group, GroupId, GroupMember, GroupMembership, GroupUpdate, HistoryEntryId, MemberRole,
    NewGroup, NewHistoryEntry, NewOrganization, NewProfile, NewSession, Organization,
    OrganizationId, OrganizationUpdate, Profile, ProfileId, ProfileUpdate, Session,
    SessionHistoryEntry, SessionId, SessionUpdate,
};
use rollcall_store_memory::{MemoryRemote, StoreError};

use crate::error::RemoteError;

/// Result of a remote call.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Resolves the authenticated actor.
#[allow(async_fn_in_trait)]
pub trait IdentityRemote {
    /// Profile id of the authenticated user.
    ///
    /// # Errors
    /// Returns [`RemoteError::Unauthenticated`] when nobody is signed in.
    async fn current_actor_id(&self) -> RemoteResult<ProfileId>;
}

/// Organization table access.
#[allow(async_fn_in_trait)]
pub trait OrganizationRemote {
    /// Organization by id.
    async fn organization(&self, id: OrganizationId) -> RemoteResult<Organization>;
    /// Organization a profile belongs to.
    async fn organization_of(&self, profile: ProfileId) -> RemoteResult<Option<Organization>>;
    /// Profiles attached to an organization.
    async fn organization_profiles(&self, org: OrganizationId) -> RemoteResult<Vec<Profile>>;
    /// Create an organization.
    async fn create_organization(&self, new: NewOrganization) -> RemoteResult<Organization>;
    /// Update an organization.
    async fn update_organization(
        &self,
        id: OrganizationId,
        update: &OrganizationUpdate,
    ) -> RemoteResult<Organization>;
    /// Delete an organization.
    async fn delete_organization(&self, id: OrganizationId) -> RemoteResult<()>;
}

/// Profile table access.
#[allow(async_fn_in_trait)]
pub trait ProfileRemote {
    /// Profile by id.
    async fn profile(&self, id: ProfileId) -> RemoteResult<Profile>;
    /// Profile by unique username.
    async fn profile_by_username(&self, username: &str) -> RemoteResult<Profile>;
    /// Every profile.
    async fn profiles(&self) -> RemoteResult<Vec<Profile>>;
    /// Profiles with the given ids.
    async fn profiles_by_ids(&self, ids: &[ProfileId]) -> RemoteResult<Vec<Profile>>;
    /// Profiles of an organization.
    async fn profiles_by_organization(&self, org: OrganizationId) -> RemoteResult<Vec<Profile>>;
    /// Create a profile.
    async fn create_profile(&self, new: NewProfile) -> RemoteResult<Profile>;
    /// Update a profile.
    async fn update_profile(&self, id: ProfileId, update: &ProfileUpdate)
    -> RemoteResult<Profile>;
    /// Delete a profile.
    async fn delete_profile(&self, id: ProfileId) -> RemoteResult<()>;
}

/// Group table access.
#[allow(async_fn_in_trait)]
pub trait GroupRemote {
    /// Groups a profile belongs to, with its role.
    async fn memberships_of(&self, profile: ProfileId) -> RemoteResult<Vec<GroupMembership>>;
    /// Group by id.
    async fn group(&self, id: GroupId) -> RemoteResult<Group>;
    /// Group by join code.
    async fn group_by_code(&self, code: &str) -> RemoteResult<Group>;
    /// Create a group.
    async fn create_group(&self, new: NewGroup) -> RemoteResult<Group>;
    /// Update a group.
    async fn update_group(&self, id: GroupId, update: &GroupUpdate) -> RemoteResult<Group>;
    /// Delete a group.
    async fn delete_group(&self, id: GroupId) -> RemoteResult<()>;
    /// Add a profile to a group.
    async fn join_group(&self, group: GroupId, profile: ProfileId)
    -> RemoteResult<GroupMembership>;
}

/// Membership table access.
#[allow(async_fn_in_trait)]
pub trait MemberRemote {
    /// Members of a group, oldest first.
    async fn group_members(&self, group: GroupId) -> RemoteResult<Vec<GroupMember>>;
    /// One membership.
    async fn member(&self, group: GroupId, profile: ProfileId) -> RemoteResult<GroupMember>;
    /// Change a member's role.
    async fn update_member_role(
        &self,
        group: GroupId,
        profile: ProfileId,
        role: MemberRole,
    ) -> RemoteResult<GroupMember>;
    /// Remove a member.
    async fn remove_member(&self, group: GroupId, profile: ProfileId) -> RemoteResult<()>;
}

/// Session table access.
#[allow(async_fn_in_trait)]
pub trait SessionRemote {
    /// Sessions of a group in server order.
    async fn sessions_by_group(&self, group: GroupId) -> RemoteResult<Vec<Session>>;
    /// Session by id.
    async fn session(&self, id: SessionId) -> RemoteResult<Session>;
    /// Most recently updated sessions of a group.
    async fn recent_sessions(&self, group: GroupId, limit: usize) -> RemoteResult<Vec<Session>>;
    /// Create a session.
    async fn create_session(&self, new: NewSession) -> RemoteResult<Session>;
    /// Update a session.
    async fn update_session(&self, id: SessionId, update: &SessionUpdate)
    -> RemoteResult<Session>;
    /// Delete a session.
    async fn delete_session(&self, id: SessionId) -> RemoteResult<()>;
}

/// Session history table access.
#[allow(async_fn_in_trait)]
pub trait HistoryRemote {
    /// History of one session, newest first.
    async fn session_history(&self, session: SessionId) -> RemoteResult<Vec<SessionHistoryEntry>>;
    /// History of several sessions.
    async fn history_for_sessions(
        &self,
        sessions: &[SessionId],
    ) -> RemoteResult<Vec<SessionHistoryEntry>>;
    /// History across a group, optionally narrowed.
    async fn group_history(
        &self,
        group: GroupId,
        member: Option<ProfileId>,
        session: Option<SessionId>,
    ) -> RemoteResult<Vec<SessionHistoryEntry>>;
    /// Existing check-in of a member in a session.
    async fn find_checkin(
        &self,
        session: SessionId,
        member: ProfileId,
    ) -> RemoteResult<Option<SessionHistoryEntry>>;
    /// Create a history entry authored by the actor.
    async fn create_history_entry(&self, new: NewHistoryEntry)
    -> RemoteResult<SessionHistoryEntry>;
    /// Delete a history entry.
    async fn delete_history_entry(&self, id: HistoryEntryId) -> RemoteResult<()>;
}

/// Every remote capability the cache layer needs.
pub trait RemoteSource:
    IdentityRemote
    + OrganizationRemote
    + ProfileRemote
    + GroupRemote
    + MemberRemote
    + SessionRemote
    + HistoryRemote
{
}

impl<T> RemoteSource for T where
    T: IdentityRemote
        + OrganizationRemote
        + ProfileRemote
        + GroupRemote
        + MemberRemote
        + SessionRemote
        + HistoryRemote
{
}

impl From<StoreError> for RemoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthenticated => Self::Unauthenticated,
            StoreError::NotFound { entity, key } => Self::NotFound { entity, key },
            StoreError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            StoreError::Conflict(msg) | StoreError::Invalid(msg) => Self::ValidationFailed(msg),
        }
    }
}

impl IdentityRemote for MemoryRemote {
    async fn current_actor_id(&self) -> RemoteResult<ProfileId> {
        Ok(self.current_actor()?)
    }
}

impl OrganizationRemote for MemoryRemote {
    async fn organization(&self, id: OrganizationId) -> RemoteResult<Organization> {
        Ok(Self::organization(self, id)?)
    }

    async fn organization_of(&self, profile: ProfileId) -> RemoteResult<Option<Organization>> {
        Ok(Self::organization_of(self, profile)?)
    }

    async fn organization_profiles(&self, org: OrganizationId) -> RemoteResult<Vec<Profile>> {
        Ok(Self::organization_profiles(self, org)?)
    }

    async fn create_organization(&self, new: NewOrganization) -> RemoteResult<Organization> {
        Ok(self.insert_organization(new)?)
    }

    async fn update_organization(
        &self,
        id: OrganizationId,
        update: &OrganizationUpdate,
    ) -> RemoteResult<Organization> {
        Ok(Self::update_organization(self, id, update)?)
    }

    async fn delete_organization(&self, id: OrganizationId) -> RemoteResult<()> {
        Ok(Self::delete_organization(self, id)?)
    }
}

impl ProfileRemote for MemoryRemote {
    async fn profile(&self, id: ProfileId) -> RemoteResult<Profile> {
        Ok(Self::profile(self, id)?)
    }

    async fn profile_by_username(&self, username: &str) -> RemoteResult<Profile> {
        Ok(Self::profile_by_username(self, username)?)
    }

    async fn profiles(&self) -> RemoteResult<Vec<Profile>> {
        Ok(Self::profiles(self)?)
    }

    async fn profiles_by_ids(&self, ids: &[ProfileId]) -> RemoteResult<Vec<Profile>> {
        Ok(Self::profiles_by_ids(self, ids)?)
    }

    async fn profiles_by_organization(&self, org: OrganizationId) -> RemoteResult<Vec<Profile>> {
        Ok(Self::organization_profiles(self, org)?)
    }

    async fn create_profile(&self, new: NewProfile) -> RemoteResult<Profile> {
        Ok(self.insert_profile(new)?)
    }

    async fn update_profile(
        &self,
        id: ProfileId,
        update: &ProfileUpdate,
    ) -> RemoteResult<Profile> {
        Ok(Self::update_profile(self, id, update)?)
    }

    async fn delete_profile(&self, id: ProfileId) -> RemoteResult<()> {
        Ok(Self::delete_profile(self, id)?)
    }
}

impl GroupRemote for MemoryRemote {
    async fn memberships_of(&self, profile: ProfileId) -> RemoteResult<Vec<GroupMembership>> {
        Ok(Self::memberships_of(self, profile)?)
    }

    async fn group(&self, id: GroupId) -> RemoteResult<Group> {
        Ok(Self::group(self, id)?)
    }

    async fn group_by_code(&self, code: &str) -> RemoteResult<Group> {
        Ok(Self::group_by_code(self, code)?)
    }

    async fn create_group(&self, new: NewGroup) -> RemoteResult<Group> {
        Ok(self.insert_group(new)?)
    }

    async fn update_group(&self, id: GroupId, update: &GroupUpdate) -> RemoteResult<Group> {
        Ok(Self::update_group(self, id, update)?)
    }

    async fn delete_group(&self, id: GroupId) -> RemoteResult<()> {
        Ok(Self::delete_group(self, id)?)
    }

    async fn join_group(
        &self,
        group: GroupId,
        profile: ProfileId,
    ) -> RemoteResult<GroupMembership> {
        Ok(Self::join_group(self, group, profile)?)
    }
}

impl MemberRemote for MemoryRemote {
    async fn group_members(&self, group: GroupId) -> RemoteResult<Vec<GroupMember>> {
        Ok(Self::group_members(self, group)?)
    }

    async fn member(&self, group: GroupId, profile: ProfileId) -> RemoteResult<GroupMember> {
        Ok(Self::member(self, group, profile)?)
    }

    async fn update_member_role(
        &self,
        group: GroupId,
        profile: ProfileId,
        role: MemberRole,
    ) -> RemoteResult<GroupMember> {
        Ok(Self::update_member_role(self, group, profile, role)?)
    }

    async fn remove_member(&self, group: GroupId, profile: ProfileId) -> RemoteResult<()> {
        Ok(Self::remove_member(self, group, profile)?)
    }
}

impl SessionRemote for MemoryRemote {
    async fn sessions_by_group(&self, group: GroupId) -> RemoteResult<Vec<Session>> {
        Ok(Self::sessions_by_group(self, group)?)
    }

    async fn session(&self, id: SessionId) -> RemoteResult<Session> {
        Ok(Self::session(self, id)?)
    }

    async fn recent_sessions(&self, group: GroupId, limit: usize) -> RemoteResult<Vec<Session>> {
        Ok(Self::recent_sessions(self, group, limit)?)
    }

    async fn create_session(&self, new: NewSession) -> RemoteResult<Session> {
        Ok(self.insert_session(new)?)
    }

    async fn update_session(
        &self,
        id: SessionId,
        update: &SessionUpdate,
    ) -> RemoteResult<Session> {
        Ok(Self::update_session(self, id, update)?)
    }

    async fn delete_session(&self, id: SessionId) -> RemoteResult<()> {
        Ok(Self::delete_session(self, id)?)
    }
}

impl HistoryRemote for MemoryRemote {
    async fn session_history(&self, session: SessionId) -> RemoteResult<Vec<SessionHistoryEntry>> {
        Ok(Self::session_history(self, session)?)
    }

    async fn history_for_sessions(
        &self,
        sessions: &[SessionId],
    ) -> RemoteResult<Vec<SessionHistoryEntry>> {
        Ok(Self::history_for_sessions(self, sessions)?)
    }

    async fn group_history(
        &self,
        group: GroupId,
        member: Option<ProfileId>,
        session: Option<SessionId>,
    ) -> RemoteResult<Vec<SessionHistoryEntry>> {
        Ok(Self::group_history(self, group, member, session)?)
    }

    async fn find_checkin(
        &self,
        session: SessionId,
        member: ProfileId,
    ) -> RemoteResult<Option<SessionHistoryEntry>> {
        Ok(Self::find_checkin(self, session, member)?)
    }

    async fn create_history_entry(
        &self,
        new: NewHistoryEntry,
    ) -> RemoteResult<SessionHistoryEntry> {
        Ok(self.insert_history(new)?)
    }

    async fn delete_history_entry(&self, id: HistoryEntryId) -> RemoteResult<()> {
        Ok(self.delete_history(id)?)
    }
}
