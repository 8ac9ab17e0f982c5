//! Table rows held by the memory store and their JSON dataset form.

use rollcall_core::{
    Group, GroupId, GroupMember, HistoryEntryId, MemberId, MemberRole, Organization, Profile,
    ProfileId, ProfileSummary, Session, SessionHistoryEntry, SessionId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Row of the membership table (`group_profile`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipRow {
    /// Row identifier.
    pub id: MemberId,
    /// Group joined.
    pub group_id: GroupId,
    /// Member profile.
    pub profile_id: ProfileId,
    /// Role in the group.
    pub role: MemberRole,
    /// Join time.
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// Row of the session history table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
    /// Row identifier.
    pub id: HistoryEntryId,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Session the entry belongs to.
    pub session_id: SessionId,
    /// Attributed profile.
    pub member_id: ProfileId,
    /// Free-form action.
    pub action: String,
    /// Human readable description.
    #[serde(default)]
    pub action_description: Option<String>,
    /// Score contribution.
    pub score: i64,
    /// Authoring profile.
    pub by_profile_id: ProfileId,
}

/// Every table of the hosted store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Organizations.
    #[serde(default)]
    pub organizations: Vec<Organization>,
    /// Profiles.
    #[serde(default)]
    pub profiles: Vec<Profile>,
    /// Groups.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Memberships.
    #[serde(default)]
    pub memberships: Vec<MembershipRow>,
    /// Sessions.
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Session history.
    #[serde(default)]
    pub history: Vec<HistoryRow>,
}

impl Dataset {
    pub(crate) fn summary(&self, id: ProfileId) -> ProfileSummary {
        self.profiles
            .iter()
            .find(|profile| profile.id == id)
            .map_or(
                ProfileSummary {
                    id,
                    username: None,
                    full_name: None,
                },
                Profile::summary,
            )
    }

    pub(crate) fn membership(&self, group: GroupId, profile: ProfileId) -> Option<&MembershipRow> {
        self.memberships
            .iter()
            .find(|row| row.group_id == group && row.profile_id == profile)
    }

    pub(crate) fn member_view(&self, row: &MembershipRow) -> GroupMember {
        GroupMember {
            id: row.id,
            profile_id: row.profile_id,
            group_id: row.group_id,
            role: row.role,
            joined_at: row.joined_at,
            profile: self.summary(row.profile_id),
            score: 0,
        }
    }

    pub(crate) fn history_view(&self, row: &HistoryRow) -> SessionHistoryEntry {
        SessionHistoryEntry {
            id: row.id,
            created_at: row.created_at,
            session_id: row.session_id,
            member_id: row.member_id,
            action: row.action.clone(),
            action_description: row.action_description.clone(),
            score: row.score,
            by_profile_id: row.by_profile_id,
            member_profile: self.summary(row.member_id),
            by_profile: self.summary(row.by_profile_id),
        }
    }

    /// Newest first, ties broken by id so the order is stable.
    pub(crate) fn sort_history_desc(entries: &mut [SessionHistoryEntry]) {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }
}
