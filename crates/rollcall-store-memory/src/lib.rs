//! In-process stand-in for the hosted relational store behind rollcall.
//!
//! [`MemoryRemote`] keeps every table in memory and applies the same rules the
//! hosted store enforces: unique usernames, group codes and memberships, role
//! checks on member management, and server-side ordering of list queries. It
//! can be loaded from and saved to a JSON dataset.

mod dataset;
mod error;

pub use dataset::{Dataset, HistoryRow, MembershipRow};
pub use error::StoreError;

use anyhow::{Context, Result};
use rollcall_core::{
    CHECKIN_ACTION, EntityClass, Group, GroupId, GroupMember, GroupMembership, GroupUpdate,
    HistoryEntryId, MemberId, MemberRole, Merge, NewGroup, NewHistoryEntry, NewOrganization,
    NewProfile, NewSession, Organization, OrganizationId, OrganizationUpdate, Profile, ProfileId,
    ProfileUpdate, Session, SessionHistoryEntry, SessionId, SessionStatus, SessionUpdate,
    generate_group_code,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Memory-backed hosted store.
pub struct MemoryRemote {
    data: Mutex<Dataset>,
    actor: Mutex<Option<ProfileId>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_stamp: Mutex<OffsetDateTime>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require_text(field: &str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new(Dataset::default())
    }
}

impl MemoryRemote {
    /// Create a store holding `dataset`.
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: Mutex::new(dataset),
            actor: Mutex::new(None),
            calls: Mutex::new(HashMap::new()),
            last_stamp: Mutex::new(OffsetDateTime::UNIX_EPOCH),
        }
    }

    /// Load a JSON dataset; a missing file yields an empty store.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "Dataset missing, starting empty");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let dataset: Dataset = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::new(dataset))
    }

    /// Write the current dataset as pretty JSON.
    ///
    /// # Errors
    /// Returns an error when serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(&*guard(&self.data))?;
        fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Saved dataset");
        Ok(())
    }

    /// Clone of every table.
    #[must_use]
    pub fn dataset(&self) -> Dataset {
        guard(&self.data).clone()
    }

    /// Authenticate as `profile` for subsequent calls.
    pub fn sign_in(&self, profile: ProfileId) {
        *guard(&self.actor) = Some(profile);
    }

    /// Drop the authenticated identity.
    pub fn sign_out(&self) {
        *guard(&self.actor) = None;
    }

    /// Profile id of the authenticated user.
    ///
    /// # Errors
    /// Returns [`StoreError::Unauthenticated`] when nobody is signed in.
    pub fn current_actor(&self) -> StoreResult<ProfileId> {
        self.record("current_actor");
        (*guard(&self.actor)).ok_or(StoreError::Unauthenticated)
    }

    /// Number of times the named operation was invoked.
    #[must_use]
    pub fn calls(&self, op: &str) -> usize {
        guard(&self.calls).get(op).copied().unwrap_or(0)
    }

    fn record(&self, op: &'static str) {
        *guard(&self.calls).entry(op).or_default() += 1;
    }

    fn actor(&self) -> StoreResult<ProfileId> {
        (*guard(&self.actor)).ok_or(StoreError::Unauthenticated)
    }

    // Strictly increasing so rows created back to back keep a total order.
    fn stamp(&self) -> OffsetDateTime {
        let mut last = guard(&self.last_stamp);
        let now = OffsetDateTime::now_utc();
        let next = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = next;
        next
    }

    // ----- organizations -------------------------------------------------

    /// Organization by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the row is absent.
    pub fn organization(&self, id: OrganizationId) -> StoreResult<Organization> {
        self.record("organization");
        guard(&self.data)
            .organizations
            .iter()
            .find(|org| org.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Organization, id))
    }

    /// Organization the profile belongs to, if any.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the profile is absent.
    pub fn organization_of(&self, profile: ProfileId) -> StoreResult<Option<Organization>> {
        self.record("organization_of");
        let data = guard(&self.data);
        let profile = data
            .profiles
            .iter()
            .find(|p| p.id == profile)
            .ok_or_else(|| StoreError::not_found(EntityClass::Profile, profile))?;
        Ok(profile.organization_id.and_then(|org_id| {
            data.organizations
                .iter()
                .find(|org| org.id == org_id)
                .cloned()
        }))
    }

    /// Profiles attached to an organization.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn organization_profiles(&self, org: OrganizationId) -> StoreResult<Vec<Profile>> {
        self.record("organization_profiles");
        Ok(guard(&self.data)
            .profiles
            .iter()
            .filter(|p| p.organization_id == Some(org))
            .cloned()
            .collect())
    }

    /// Insert an organization.
    ///
    /// # Errors
    /// Requires a signed-in profile and a non-empty name.
    pub fn insert_organization(&self, new: NewOrganization) -> StoreResult<Organization> {
        self.record("insert_organization");
        self.actor()?;
        require_text("organization name", &new.name)?;
        let org = Organization {
            id: OrganizationId::new(),
            name: new.name,
            bio: new.bio,
            address: new.address,
            logo_url: new.logo_url,
            created_at: self.stamp(),
        };
        guard(&self.data).organizations.push(org.clone());
        info!(organization = %org.id, "Inserted organization");
        Ok(org)
    }

    /// Apply a partial update to an organization.
    ///
    /// # Errors
    /// Requires a signed-in profile; fails when the row is absent.
    pub fn update_organization(
        &self,
        id: OrganizationId,
        update: &OrganizationUpdate,
    ) -> StoreResult<Organization> {
        self.record("update_organization");
        self.actor()?;
        if let Some(name) = &update.name {
            require_text("organization name", name)?;
        }
        let mut data = guard(&self.data);
        let org = data
            .organizations
            .iter_mut()
            .find(|org| org.id == id)
            .ok_or_else(|| StoreError::not_found(EntityClass::Organization, id))?;
        org.merge(update);
        Ok(org.clone())
    }

    /// Delete an organization and detach its profiles.
    ///
    /// # Errors
    /// Requires a signed-in profile; fails when the row is absent.
    pub fn delete_organization(&self, id: OrganizationId) -> StoreResult<()> {
        self.record("delete_organization");
        self.actor()?;
        let mut data = guard(&self.data);
        let before = data.organizations.len();
        data.organizations.retain(|org| org.id != id);
        if data.organizations.len() == before {
            return Err(StoreError::not_found(EntityClass::Organization, id));
        }
        for profile in &mut data.profiles {
            if profile.organization_id == Some(id) {
                profile.organization_id = None;
            }
        }
        drop(data);
        info!(organization = %id, "Deleted organization");
        Ok(())
    }

    // ----- profiles ------------------------------------------------------

    /// Profile by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the row is absent.
    pub fn profile(&self, id: ProfileId) -> StoreResult<Profile> {
        self.record("profile");
        guard(&self.data)
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Profile, id))
    }

    /// Profile by unique username.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when no profile uses the handle.
    pub fn profile_by_username(&self, username: &str) -> StoreResult<Profile> {
        self.record("profile_by_username");
        guard(&self.data)
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Profile, username))
    }

    /// Every profile.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn profiles(&self) -> StoreResult<Vec<Profile>> {
        self.record("profiles");
        Ok(guard(&self.data).profiles.clone())
    }

    /// Profiles whose id is in `ids`. Missing ids are skipped.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn profiles_by_ids(&self, ids: &[ProfileId]) -> StoreResult<Vec<Profile>> {
        self.record("profiles_by_ids");
        Ok(guard(&self.data)
            .profiles
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    /// Insert a profile for a registered user.
    ///
    /// # Errors
    /// Fails on duplicate id or username, or an empty username.
    pub fn insert_profile(&self, new: NewProfile) -> StoreResult<Profile> {
        self.record("insert_profile");
        require_text("username", &new.username)?;
        let created_at = self.stamp();
        let mut data = guard(&self.data);
        if data.profiles.iter().any(|p| p.id == new.id) {
            return Err(StoreError::Conflict(format!("profile {} already exists", new.id)));
        }
        if data.profiles.iter().any(|p| p.username == new.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                new.username
            )));
        }
        let profile = Profile {
            id: new.id,
            username: new.username,
            full_name: new.full_name,
            role: new.role,
            organization_id: new.organization_id,
            bio: new.bio,
            avatar_url: new.avatar_url,
            created_at,
        };
        data.profiles.push(profile.clone());
        drop(data);
        info!(profile = %profile.id, "Inserted profile");
        Ok(profile)
    }

    /// Apply a partial update to the signed-in user's own profile.
    ///
    /// # Errors
    /// Fails when editing somebody else's profile or taking a used username.
    pub fn update_profile(&self, id: ProfileId, update: &ProfileUpdate) -> StoreResult<Profile> {
        self.record("update_profile");
        if self.actor()? != id {
            return Err(StoreError::PermissionDenied(
                "profiles can only be edited by their owner".into(),
            ));
        }
        let mut data = guard(&self.data);
        if let Some(username) = &update.username {
            require_text("username", username)?;
            if data
                .profiles
                .iter()
                .any(|p| p.id != id && &p.username == username)
            {
                return Err(StoreError::Conflict(format!(
                    "username '{username}' is already taken"
                )));
            }
        }
        let profile = data
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found(EntityClass::Profile, id))?;
        profile.merge(update);
        Ok(profile.clone())
    }

    /// Delete the signed-in user's profile and its memberships.
    ///
    /// # Errors
    /// Fails when deleting somebody else's profile or the row is absent.
    pub fn delete_profile(&self, id: ProfileId) -> StoreResult<()> {
        self.record("delete_profile");
        if self.actor()? != id {
            return Err(StoreError::PermissionDenied(
                "profiles can only be deleted by their owner".into(),
            ));
        }
        let mut data = guard(&self.data);
        let before = data.profiles.len();
        data.profiles.retain(|p| p.id != id);
        if data.profiles.len() == before {
            return Err(StoreError::not_found(EntityClass::Profile, id));
        }
        data.memberships.retain(|row| row.profile_id != id);
        drop(data);
        info!(profile = %id, "Deleted profile");
        Ok(())
    }

    // ----- groups --------------------------------------------------------

    /// Groups the profile belongs to, with its role, oldest membership first.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn memberships_of(&self, profile: ProfileId) -> StoreResult<Vec<GroupMembership>> {
        self.record("memberships_of");
        let data = guard(&self.data);
        let mut rows: Vec<&MembershipRow> = data
            .memberships
            .iter()
            .filter(|row| row.profile_id == profile)
            .collect();
        rows.sort_by_key(|row| (row.joined_at, row.id));
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                data.groups
                    .iter()
                    .find(|group| group.id == row.group_id)
                    .map(|group| GroupMembership {
                        role: row.role,
                        joined_at: row.joined_at,
                        group: group.clone(),
                    })
            })
            .collect())
    }

    /// Group by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the row is absent.
    pub fn group(&self, id: GroupId) -> StoreResult<Group> {
        self.record("group");
        guard(&self.data)
            .groups
            .iter()
            .find(|group| group.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Group, id))
    }

    /// Group by join code.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when no group uses the code.
    pub fn group_by_code(&self, code: &str) -> StoreResult<Group> {
        self.record("group_by_code");
        guard(&self.data)
            .groups
            .iter()
            .find(|group| group.code == code)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Group, code))
    }

    /// Insert a group and its owner membership.
    ///
    /// # Errors
    /// Requires a signed-in profile, a non-empty name and a unique code.
    pub fn insert_group(&self, new: NewGroup) -> StoreResult<Group> {
        self.record("insert_group");
        let actor = self.actor()?;
        require_text("group name", &new.name)?;
        let created_at = self.stamp();
        let mut data = guard(&self.data);
        let code = match new.code {
            Some(code) => {
                if data.groups.iter().any(|group| group.code == code) {
                    return Err(StoreError::Conflict(format!("group code '{code}' is taken")));
                }
                code
            }
            None => loop {
                let candidate = generate_group_code();
                if !data.groups.iter().any(|group| group.code == candidate) {
                    break candidate;
                }
            },
        };
        let group = Group {
            id: GroupId::new(),
            name: new.name,
            description: new.description,
            code,
            owner_id: new.owner_id.unwrap_or(actor),
            created_at,
        };
        data.memberships.push(MembershipRow {
            id: MemberId::new(),
            group_id: group.id,
            profile_id: group.owner_id,
            role: MemberRole::Owner,
            joined_at: created_at,
        });
        data.groups.push(group.clone());
        drop(data);
        info!(group = %group.id, code = %group.code, "Inserted group");
        Ok(group)
    }

    /// Apply a partial update to a group. Owner only.
    ///
    /// # Errors
    /// Fails for non-owners, unknown groups, or a code already in use.
    pub fn update_group(&self, id: GroupId, update: &GroupUpdate) -> StoreResult<Group> {
        self.record("update_group");
        let actor = self.actor()?;
        let mut data = guard(&self.data);
        if let Some(code) = &update.code
            && data.groups.iter().any(|group| group.id != id && &group.code == code)
        {
            return Err(StoreError::Conflict(format!("group code '{code}' is taken")));
        }
        let group = data
            .groups
            .iter_mut()
            .find(|group| group.id == id)
            .ok_or_else(|| StoreError::not_found(EntityClass::Group, id))?;
        if group.owner_id != actor {
            return Err(StoreError::PermissionDenied(
                "only the group owner can edit the group".into(),
            ));
        }
        group.merge(update);
        Ok(group.clone())
    }

    /// Delete a group together with its memberships, sessions and history.
    ///
    /// # Errors
    /// Fails for non-owners or unknown groups.
    pub fn delete_group(&self, id: GroupId) -> StoreResult<()> {
        self.record("delete_group");
        let actor = self.actor()?;
        let mut data = guard(&self.data);
        let owner = data
            .groups
            .iter()
            .find(|group| group.id == id)
            .map(|group| group.owner_id)
            .ok_or_else(|| StoreError::not_found(EntityClass::Group, id))?;
        if owner != actor {
            return Err(StoreError::PermissionDenied(
                "only the group owner can delete the group".into(),
            ));
        }
        let sessions: Vec<SessionId> = data
            .sessions
            .iter()
            .filter(|session| session.group_id == id)
            .map(|session| session.id)
            .collect();
        data.groups.retain(|group| group.id != id);
        data.memberships.retain(|row| row.group_id != id);
        data.sessions.retain(|session| session.group_id != id);
        data.history.retain(|row| !sessions.contains(&row.session_id));
        drop(data);
        info!(group = %id, "Deleted group");
        Ok(())
    }

    /// Add `profile` to `group` as a regular member.
    ///
    /// # Errors
    /// Fails when the group or profile is unknown or the membership exists.
    pub fn join_group(&self, group: GroupId, profile: ProfileId) -> StoreResult<GroupMembership> {
        self.record("join_group");
        self.actor()?;
        let joined_at = self.stamp();
        let mut data = guard(&self.data);
        let target = data
            .groups
            .iter()
            .find(|g| g.id == group)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Group, group))?;
        if !data.profiles.iter().any(|p| p.id == profile) {
            return Err(StoreError::Invalid(format!("unknown profile {profile}")));
        }
        if data.membership(group, profile).is_some() {
            return Err(StoreError::Conflict(format!(
                "profile {profile} is already a member of group {group}"
            )));
        }
        data.memberships.push(MembershipRow {
            id: MemberId::new(),
            group_id: group,
            profile_id: profile,
            role: MemberRole::Member,
            joined_at,
        });
        drop(data);
        info!(%group, %profile, "Joined group");
        Ok(GroupMembership {
            role: MemberRole::Member,
            joined_at,
            group: target,
        })
    }

    // ----- members -------------------------------------------------------

    /// Members of a group, oldest first. Scores are left at zero.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn group_members(&self, group: GroupId) -> StoreResult<Vec<GroupMember>> {
        self.record("group_members");
        let data = guard(&self.data);
        let mut members: Vec<GroupMember> = data
            .memberships
            .iter()
            .filter(|row| row.group_id == group)
            .map(|row| data.member_view(row))
            .collect();
        members.sort_by_key(|member| (member.joined_at, member.id));
        Ok(members)
    }

    /// Membership of `profile` in `group`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the profile is not a member.
    pub fn member(&self, group: GroupId, profile: ProfileId) -> StoreResult<GroupMember> {
        self.record("member");
        let data = guard(&self.data);
        data.membership(group, profile)
            .map(|row| data.member_view(row))
            .ok_or_else(|| {
                StoreError::not_found(EntityClass::GroupMember, format!("{group}/{profile}"))
            })
    }

    /// Change a member's role. Only the owner may do this, and never for itself.
    ///
    /// # Errors
    /// Fails on permission violations, unknown members or promotion to owner.
    pub fn update_member_role(
        &self,
        group: GroupId,
        profile: ProfileId,
        role: MemberRole,
    ) -> StoreResult<GroupMember> {
        self.record("update_member_role");
        let actor = self.actor()?;
        if role == MemberRole::Owner {
            return Err(StoreError::Invalid("ownership cannot be transferred".into()));
        }
        let mut data = guard(&self.data);
        let actor_role = data.membership(group, actor).map(|row| row.role);
        if actor_role != Some(MemberRole::Owner) {
            return Err(StoreError::PermissionDenied(
                "only the group owner can change member roles".into(),
            ));
        }
        let row = data
            .memberships
            .iter_mut()
            .find(|row| row.group_id == group && row.profile_id == profile)
            .ok_or_else(|| {
                StoreError::not_found(EntityClass::GroupMember, format!("{group}/{profile}"))
            })?;
        if row.role == MemberRole::Owner {
            return Err(StoreError::PermissionDenied(
                "the owner's role cannot be changed".into(),
            ));
        }
        row.role = role;
        let row = row.clone();
        let member = data.member_view(&row);
        drop(data);
        info!(%group, %profile, %role, "Updated member role");
        Ok(member)
    }

    /// Remove a member. Owners and admins may do this; the owner cannot be removed.
    ///
    /// # Errors
    /// Fails on permission violations or unknown members.
    pub fn remove_member(&self, group: GroupId, profile: ProfileId) -> StoreResult<()> {
        self.record("remove_member");
        let actor = self.actor()?;
        let mut data = guard(&self.data);
        let allowed = data
            .membership(group, actor)
            .is_some_and(|row| row.role.can_manage_members());
        if !allowed {
            return Err(StoreError::PermissionDenied(
                "only owners and admins can remove members".into(),
            ));
        }
        let target = data.membership(group, profile).map(|row| row.role).ok_or_else(|| {
            StoreError::not_found(EntityClass::GroupMember, format!("{group}/{profile}"))
        })?;
        if target == MemberRole::Owner {
            return Err(StoreError::PermissionDenied(
                "the group owner cannot be removed".into(),
            ));
        }
        data.memberships
            .retain(|row| !(row.group_id == group && row.profile_id == profile));
        drop(data);
        info!(%group, %profile, "Removed member");
        Ok(())
    }

    // ----- sessions ------------------------------------------------------

    /// Sessions of a group, newest first.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn sessions_by_group(&self, group: GroupId) -> StoreResult<Vec<Session>> {
        self.record("sessions_by_group");
        let mut sessions: Vec<Session> = guard(&self.data)
            .sessions
            .iter()
            .filter(|session| session.group_id == group)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    /// Most recently updated sessions of a group.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn recent_sessions(&self, group: GroupId, limit: usize) -> StoreResult<Vec<Session>> {
        self.record("recent_sessions");
        let mut sessions: Vec<Session> = guard(&self.data)
            .sessions
            .iter()
            .filter(|session| session.group_id == group)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        sessions.truncate(limit);
        Ok(sessions)
    }

    /// Session by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the row is absent.
    pub fn session(&self, id: SessionId) -> StoreResult<Session> {
        self.record("session");
        guard(&self.data)
            .sessions
            .iter()
            .find(|session| session.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityClass::Session, id))
    }

    /// Insert an open session.
    ///
    /// # Errors
    /// Requires a signed-in profile, a known group and a non-empty name.
    pub fn insert_session(&self, new: NewSession) -> StoreResult<Session> {
        self.record("insert_session");
        self.actor()?;
        require_text("session name", &new.name)?;
        let now = self.stamp();
        let mut data = guard(&self.data);
        if !data.groups.iter().any(|group| group.id == new.group_id) {
            return Err(StoreError::Invalid(format!("unknown group {}", new.group_id)));
        }
        let session = Session {
            id: SessionId::new(),
            name: new.name,
            description: new.description,
            delay: new.delay,
            status: SessionStatus::Open,
            status_changed_at: None,
            group_id: new.group_id,
            created_at: now,
            updated_at: now,
        };
        data.sessions.push(session.clone());
        drop(data);
        info!(session = %session.id, group = %session.group_id, "Inserted session");
        Ok(session)
    }

    /// Apply a partial update to a session, stamping status transitions.
    ///
    /// # Errors
    /// Requires a signed-in profile; fails when the row is absent.
    pub fn update_session(&self, id: SessionId, update: &SessionUpdate) -> StoreResult<Session> {
        self.record("update_session");
        self.actor()?;
        let now = self.stamp();
        let mut data = guard(&self.data);
        let session = data
            .sessions
            .iter_mut()
            .find(|session| session.id == id)
            .ok_or_else(|| StoreError::not_found(EntityClass::Session, id))?;
        let previous = session.status;
        session.merge(update);
        if session.status != previous {
            session.status_changed_at = Some(now);
        }
        session.updated_at = now;
        Ok(session.clone())
    }

    /// Delete a session and its history.
    ///
    /// # Errors
    /// Requires a signed-in profile; fails when the row is absent.
    pub fn delete_session(&self, id: SessionId) -> StoreResult<()> {
        self.record("delete_session");
        self.actor()?;
        let mut data = guard(&self.data);
        let before = data.sessions.len();
        data.sessions.retain(|session| session.id != id);
        if data.sessions.len() == before {
            return Err(StoreError::not_found(EntityClass::Session, id));
        }
        data.history.retain(|row| row.session_id != id);
        drop(data);
        info!(session = %id, "Deleted session");
        Ok(())
    }

    // ----- history -------------------------------------------------------

    /// History of one session, newest first.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn session_history(&self, session: SessionId) -> StoreResult<Vec<SessionHistoryEntry>> {
        self.record("session_history");
        let data = guard(&self.data);
        let mut entries: Vec<SessionHistoryEntry> = data
            .history
            .iter()
            .filter(|row| row.session_id == session)
            .map(|row| data.history_view(row))
            .collect();
        Dataset::sort_history_desc(&mut entries);
        Ok(entries)
    }

    /// History of several sessions, newest first.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn history_for_sessions(
        &self,
        sessions: &[SessionId],
    ) -> StoreResult<Vec<SessionHistoryEntry>> {
        self.record("history_for_sessions");
        let data = guard(&self.data);
        let mut entries: Vec<SessionHistoryEntry> = data
            .history
            .iter()
            .filter(|row| sessions.contains(&row.session_id))
            .map(|row| data.history_view(row))
            .collect();
        Dataset::sort_history_desc(&mut entries);
        Ok(entries)
    }

    /// History across a group's sessions, optionally narrowed to a member or session.
    ///
    /// # Errors
    /// Never fails; the signature matches the other list queries.
    pub fn group_history(
        &self,
        group: GroupId,
        member: Option<ProfileId>,
        session: Option<SessionId>,
    ) -> StoreResult<Vec<SessionHistoryEntry>> {
        self.record("group_history");
        let data = guard(&self.data);
        let sessions: Vec<SessionId> = data
            .sessions
            .iter()
            .filter(|s| s.group_id == group)
            .map(|s| s.id)
            .collect();
        let mut entries: Vec<SessionHistoryEntry> = data
            .history
            .iter()
            .filter(|row| sessions.contains(&row.session_id))
            .filter(|row| member.is_none_or(|m| row.member_id == m))
            .filter(|row| session.is_none_or(|s| row.session_id == s))
            .map(|row| data.history_view(row))
            .collect();
        Dataset::sort_history_desc(&mut entries);
        Ok(entries)
    }

    /// Existing check-in of `member` in `session`, if any.
    ///
    /// # Errors
    /// Never fails; the signature matches the other queries.
    pub fn find_checkin(
        &self,
        session: SessionId,
        member: ProfileId,
    ) -> StoreResult<Option<SessionHistoryEntry>> {
        self.record("find_checkin");
        let data = guard(&self.data);
        Ok(data
            .history
            .iter()
            .find(|row| {
                row.session_id == session && row.member_id == member && row.action == CHECKIN_ACTION
            })
            .map(|row| data.history_view(row)))
    }

    /// Insert a history entry authored by the signed-in profile.
    ///
    /// The table carries no uniqueness constraint on check-ins.
    ///
    /// # Errors
    /// Requires a signed-in profile, a known session and a non-empty action.
    pub fn insert_history(&self, new: NewHistoryEntry) -> StoreResult<SessionHistoryEntry> {
        self.record("insert_history");
        let actor = self.actor()?;
        require_text("action", &new.action)?;
        let created_at = self.stamp();
        let mut data = guard(&self.data);
        if !data.sessions.iter().any(|s| s.id == new.session_id) {
            return Err(StoreError::Invalid(format!("unknown session {}", new.session_id)));
        }
        let row = HistoryRow {
            id: HistoryEntryId::new(),
            created_at,
            session_id: new.session_id,
            member_id: new.member_id,
            action: new.action,
            action_description: new.action_description,
            score: new.score.unwrap_or(0),
            by_profile_id: actor,
        };
        let entry = data.history_view(&row);
        data.history.push(row);
        drop(data);
        info!(entry = %entry.id, session = %entry.session_id, action = %entry.action, "Inserted history entry");
        Ok(entry)
    }

    /// Delete a history entry.
    ///
    /// # Errors
    /// Requires a signed-in profile; fails when the row is absent.
    pub fn delete_history(&self, id: HistoryEntryId) -> StoreResult<()> {
        self.record("delete_history");
        self.actor()?;
        let mut data = guard(&self.data);
        let before = data.history.len();
        data.history.retain(|row| row.id != id);
        if data.history.len() == before {
            return Err(StoreError::not_found(EntityClass::SessionHistory, id));
        }
        drop(data);
        info!(entry = %id, "Deleted history entry");
        Ok(())
    }
}
