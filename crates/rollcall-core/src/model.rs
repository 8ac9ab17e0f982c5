//! Entity records as returned by the hosted store.

use crate::id::{GroupId, HistoryEntryId, MemberId, OrganizationId, ProfileId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// History action recording attendance in a session.
pub const CHECKIN_ACTION: &str = "checkin";

/// Description written with every check-in entry.
pub const CHECKIN_DESCRIPTION: &str = "Checked in to the session";

/// Entity classes known to the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// [`Organization`] records.
    Organization,
    /// [`Profile`] records.
    Profile,
    /// [`Group`] records.
    Group,
    /// [`GroupMember`] records.
    GroupMember,
    /// [`Session`] records.
    Session,
    /// [`SessionHistoryEntry`] records.
    SessionHistory,
}

impl EntityClass {
    /// Stable lowercase name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Profile => "profile",
            Self::Group => "group",
            Self::GroupMember => "group_member",
            Self::Session => "session",
            Self::SessionHistory => "session_history",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform administrator.
    SuperAdmin,
    /// Organization administrator.
    Admin,
    /// Regular user.
    #[default]
    Member,
    /// Supervisor of several groups.
    Supervisor,
}

/// Role of a profile inside one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Creator of the group. Exactly one per group.
    Owner,
    /// Can manage members.
    Admin,
    /// Regular participant.
    Member,
}

impl MemberRole {
    /// Whether the role may remove other members.
    #[must_use]
    pub const fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        })
    }
}

/// Lifecycle of a session: `open -> pending -> closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting check-ins.
    #[default]
    Open,
    /// Temporarily not accepting check-ins.
    Pending,
    /// Finished.
    Closed,
}

impl SessionStatus {
    /// Only open sessions accept check-ins.
    #[must_use]
    pub const fn accepts_checkins(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::Closed => "closed",
        })
    }
}

/// Postal address of an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street name.
    #[serde(default)]
    pub street: Option<String>,
    /// House number.
    #[serde(default)]
    pub number: Option<String>,
    /// Complement (apartment, floor).
    #[serde(default)]
    pub complement: Option<String>,
    /// Neighborhood.
    #[serde(default)]
    pub neighborhood: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// State or province.
    #[serde(default)]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub cep: Option<String>,
}

/// Organization owning profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Identifier.
    pub id: OrganizationId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub bio: Option<String>,
    /// Address fields.
    #[serde(default)]
    pub address: Address,
    /// Public logo location.
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// User profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Identifier (same as the authenticated user id).
    pub id: ProfileId,
    /// Unique handle.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Application role.
    #[serde(default)]
    pub role: UserRole,
    /// Owning organization, if any.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    /// Free-form description.
    #[serde(default)]
    pub bio: Option<String>,
    /// Avatar location.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Profile {
    /// Short projection embedded in member and history rows.
    #[must_use]
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id,
            username: Some(self.username.clone()),
            full_name: Some(self.full_name.clone()),
        }
    }
}

/// Short profile projection joined into other rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Profile identifier.
    pub id: ProfileId,
    /// Handle, when visible.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name, when visible.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Group of profiles that meets in sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Unique join code.
    pub code: String,
    /// Creator of the group.
    pub owner_id: ProfileId,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A group as seen from one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Role of the member in the group.
    pub role: MemberRole,
    /// When the member joined.
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
    /// The group itself.
    pub group: Group,
}

/// Membership row linking one profile to one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Identifier of the membership row.
    pub id: MemberId,
    /// Member profile.
    pub profile_id: ProfileId,
    /// Group joined.
    pub group_id: GroupId,
    /// Role in the group.
    pub role: MemberRole,
    /// When the member joined.
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
    /// Joined profile projection.
    pub profile: ProfileSummary,
    /// Sum of history scores across every session of the group.
    #[serde(default)]
    pub score: i64,
}

/// Meeting of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tolerated delay in minutes.
    pub delay: u32,
    /// Current status.
    #[serde(default)]
    pub status: SessionStatus,
    /// Last status transition.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub status_changed_at: Option<OffsetDateTime>,
    /// Owning group.
    pub group_id: GroupId,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Scored action recorded inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    /// Identifier.
    pub id: HistoryEntryId,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Session the entry belongs to.
    pub session_id: SessionId,
    /// Profile the entry is attributed to.
    pub member_id: ProfileId,
    /// Free-form action; [`CHECKIN_ACTION`] is privileged.
    pub action: String,
    /// Human readable description.
    #[serde(default)]
    pub action_description: Option<String>,
    /// Score contribution (may be negative).
    pub score: i64,
    /// Profile that authored the entry.
    pub by_profile_id: ProfileId,
    /// Joined projection of `member_id`.
    pub member_profile: ProfileSummary,
    /// Joined projection of `by_profile_id`.
    pub by_profile: ProfileSummary,
}

impl SessionHistoryEntry {
    /// Whether this entry records a check-in.
    #[must_use]
    pub fn is_checkin(&self) -> bool {
        self.action == CHECKIN_ACTION
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn only_open_sessions_accept_checkins() {
        assert!(SessionStatus::Open.accepts_checkins());
        assert!(!SessionStatus::Pending.accepts_checkins());
        assert!(!SessionStatus::Closed.accepts_checkins());
    }

    #[test]
    fn member_roles_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&MemberRole::Owner).expect("serialize role");
        assert_eq!(json, "\"owner\"");
        let status: SessionStatus = serde_json::from_str("\"pending\"").expect("parse status");
        assert_eq!(status, SessionStatus::Pending);
    }

    #[test]
    fn only_owner_and_admin_manage_members() {
        assert!(MemberRole::Owner.can_manage_members());
        assert!(MemberRole::Admin.can_manage_members());
        assert!(!MemberRole::Member.can_manage_members());
    }
}
