//! Create and update payloads sent to the hosted store.
//!
//! Update payloads double as shallow patches: every `Some` field overwrites the
//! matching field of a cached record through [`Merge`].

use crate::id::{GroupId, OrganizationId, ProfileId, SessionId};
use crate::model::{
    Address, Group, GroupMember, MemberRole, Organization, Profile, Session, SessionStatus,
    UserRole,
};
use serde::{Deserialize, Serialize};

/// Shallow merge of a partial update into a record.
pub trait Merge<P> {
    /// Overwrite the fields present in `patch`.
    fn merge(&mut self, patch: &P);
}

fn set<T: Clone>(field: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

/// Payload creating an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrganization {
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
}

/// Partial organization update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description (`Some(None)` clears it).
    #[serde(default)]
    pub bio: Option<Option<String>>,
    /// Replacement address.
    #[serde(default)]
    pub address: Option<Address>,
    /// New logo location (`Some(None)` clears it).
    #[serde(default)]
    pub logo_url: Option<Option<String>>,
}

impl Merge<OrganizationUpdate> for Organization {
    fn merge(&mut self, patch: &OrganizationUpdate) {
        set(&mut self.name, patch.name.as_ref());
        set(&mut self.bio, patch.bio.as_ref());
        set(&mut self.address, patch.address.as_ref());
        set(&mut self.logo_url, patch.logo_url.as_ref());
    }
}

/// Payload creating a profile for an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    /// User id the profile belongs to.
    pub id: ProfileId,
    /// Unique handle.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Application role.
    #[serde(default)]
    pub role: UserRole,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    /// Free-form description.
    #[serde(default)]
    pub bio: Option<String>,
    /// Avatar location.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Partial profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New handle.
    #[serde(default)]
    pub username: Option<String>,
    /// New display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// New role.
    #[serde(default)]
    pub role: Option<UserRole>,
    /// New organization (`Some(None)` detaches).
    #[serde(default)]
    pub organization_id: Option<Option<OrganizationId>>,
    /// New description.
    #[serde(default)]
    pub bio: Option<Option<String>>,
    /// New avatar location.
    #[serde(default)]
    pub avatar_url: Option<Option<String>>,
}

impl Merge<ProfileUpdate> for Profile {
    fn merge(&mut self, patch: &ProfileUpdate) {
        set(&mut self.username, patch.username.as_ref());
        set(&mut self.full_name, patch.full_name.as_ref());
        set(&mut self.role, patch.role.as_ref());
        set(&mut self.organization_id, patch.organization_id.as_ref());
        set(&mut self.bio, patch.bio.as_ref());
        set(&mut self.avatar_url, patch.avatar_url.as_ref());
    }
}

/// Payload creating a group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGroup {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Join code; generated when absent.
    #[serde(default)]
    pub code: Option<String>,
    /// Owner; the acting profile when absent.
    #[serde(default)]
    pub owner_id: Option<ProfileId>,
}

/// Partial group update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupUpdate {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<Option<String>>,
    /// New join code.
    #[serde(default)]
    pub code: Option<String>,
}

impl Merge<GroupUpdate> for Group {
    fn merge(&mut self, patch: &GroupUpdate) {
        set(&mut self.name, patch.name.as_ref());
        set(&mut self.description, patch.description.as_ref());
        set(&mut self.code, patch.code.as_ref());
    }
}

/// Partial membership update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberUpdate {
    /// New role.
    #[serde(default)]
    pub role: Option<MemberRole>,
    /// Replacement aggregated score.
    #[serde(default)]
    pub score: Option<i64>,
}

impl Merge<MemberUpdate> for GroupMember {
    fn merge(&mut self, patch: &MemberUpdate) {
        set(&mut self.role, patch.role.as_ref());
        set(&mut self.score, patch.score.as_ref());
    }
}

/// Payload creating a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tolerated delay in minutes.
    pub delay: u32,
    /// Owning group.
    pub group_id: GroupId,
}

/// Partial session update. Status transitions go through here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<Option<String>>,
    /// New delay.
    #[serde(default)]
    pub delay: Option<u32>,
    /// New status.
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl Merge<SessionUpdate> for Session {
    fn merge(&mut self, patch: &SessionUpdate) {
        set(&mut self.name, patch.name.as_ref());
        set(&mut self.description, patch.description.as_ref());
        set(&mut self.delay, patch.delay.as_ref());
        set(&mut self.status, patch.status.as_ref());
    }
}

/// Payload creating a history entry. The author is always the acting profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    /// Target session.
    pub session_id: SessionId,
    /// Profile the entry is attributed to.
    pub member_id: ProfileId,
    /// Free-form action.
    pub action: String,
    /// Human readable description.
    #[serde(default)]
    pub action_description: Option<String>,
    /// Score contribution; zero when absent.
    #[serde(default)]
    pub score: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn session() -> Session {
        Session {
            id: SessionId::new(),
            name: "Monday".into(),
            description: Some("weekly".into()),
            delay: 10,
            status: SessionStatus::Open,
            status_changed_at: None,
            group_id: GroupId::new(),
            created_at: datetime!(2024-01-01 10:00 UTC),
            updated_at: datetime!(2024-01-01 10:00 UTC),
        }
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut value = session();
        value.merge(&SessionUpdate {
            status: Some(SessionStatus::Closed),
            ..SessionUpdate::default()
        });
        assert_eq!(value.status, SessionStatus::Closed);
        assert_eq!(value.name, "Monday");
        assert_eq!(value.description.as_deref(), Some("weekly"));
    }

    #[test]
    fn nested_option_clears_field() {
        let mut value = session();
        value.merge(&SessionUpdate {
            description: Some(None),
            delay: Some(15),
            ..SessionUpdate::default()
        });
        assert!(value.description.is_none());
        assert_eq!(value.delay, 15);
    }
}
