//! Score aggregation over session history.
//!
//! Everything here is a pure function of the entries passed in.

use std::collections::{HashMap, HashSet};

use rollcall_core::{GroupMember, ProfileId, SessionHistoryEntry, SessionId};
use serde::Serialize;
use time::OffsetDateTime;

/// Total score of `member` in `session`, every action included.
#[must_use]
pub fn session_total(entries: &[SessionHistoryEntry], session: SessionId, member: ProfileId) -> i64 {
    entries
        .iter()
        .filter(|entry| entry.session_id == session && entry.member_id == member)
        .map(|entry| entry.score)
        .sum()
}

/// Score per member across every entry given.
#[must_use]
pub fn member_totals(entries: &[SessionHistoryEntry]) -> HashMap<ProfileId, i64> {
    let mut totals = HashMap::new();
    for entry in entries {
        *totals.entry(entry.member_id).or_insert(0) += entry.score;
    }
    totals
}

/// Overwrite each member's score with its total over `entries`.
pub fn apply_member_scores(members: &mut [GroupMember], entries: &[SessionHistoryEntry]) {
    let totals = member_totals(entries);
    for member in members {
        member.score = totals.get(&member.profile_id).copied().unwrap_or(0);
    }
}

/// Summary of one session's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Number of entries.
    pub total_entries: usize,
    /// Number of check-ins.
    pub total_checkins: usize,
    /// Distinct members with at least one check-in.
    pub total_participants: usize,
    /// Sum of every score.
    pub total_score: i64,
    /// Time of the newest entry.
    #[serde(with = "time::serde::rfc3339::option")]
    pub latest_activity: Option<OffsetDateTime>,
}

/// Summarize the entries of one session partition.
#[must_use]
pub fn session_stats(entries: &[SessionHistoryEntry]) -> SessionStats {
    let participants: HashSet<ProfileId> = entries
        .iter()
        .filter(|entry| entry.is_checkin())
        .map(|entry| entry.member_id)
        .collect();
    SessionStats {
        total_entries: entries.len(),
        total_checkins: entries.iter().filter(|entry| entry.is_checkin()).count(),
        total_participants: participants.len(),
        total_score: entries.iter().map(|entry| entry.score).sum(),
        latest_activity: entries.iter().map(|entry| entry.created_at).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{HistoryEntryId, ProfileSummary};
    use time::macros::datetime;

    fn entry(session: SessionId, member: ProfileId, action: &str, score: i64) -> SessionHistoryEntry {
        let summary = ProfileSummary {
            id: member,
            username: None,
            full_name: None,
        };
        SessionHistoryEntry {
            id: HistoryEntryId::new(),
            created_at: datetime!(2024-06-01 12:00 UTC),
            session_id: session,
            member_id: member,
            action: action.into(),
            action_description: None,
            score,
            by_profile_id: member,
            member_profile: summary.clone(),
            by_profile: summary,
        }
    }

    #[test]
    fn session_total_sums_every_action_of_the_member() {
        let s = SessionId::new();
        let m = ProfileId::new();
        let other = ProfileId::new();
        let entries = vec![
            entry(s, m, "checkin", 100),
            entry(s, m, "bonus", 50),
            entry(s, m, "late", -20),
            entry(s, other, "checkin", 100),
            entry(SessionId::new(), m, "checkin", 100),
        ];
        assert_eq!(session_total(&entries, s, m), 130);
    }

    #[test]
    fn member_scores_cover_every_session() {
        let m = ProfileId::new();
        let entries = vec![
            entry(SessionId::new(), m, "checkin", 100),
            entry(SessionId::new(), m, "checkin", 100),
        ];
        let mut members = vec![GroupMember {
            id: rollcall_core::MemberId::new(),
            profile_id: m,
            group_id: rollcall_core::GroupId::new(),
            role: rollcall_core::MemberRole::Member,
            joined_at: datetime!(2024-01-01 00:00 UTC),
            profile: ProfileSummary {
                id: m,
                username: None,
                full_name: None,
            },
            score: 7,
        }];
        apply_member_scores(&mut members, &entries);
        assert_eq!(members[0].score, 200);
        apply_member_scores(&mut members, &[]);
        assert_eq!(members[0].score, 0);
    }

    #[test]
    fn stats_count_checkins_and_participants() {
        let s = SessionId::new();
        let a = ProfileId::new();
        let b = ProfileId::new();
        let entries = vec![
            entry(s, a, "checkin", 100),
            entry(s, a, "bonus", 10),
            entry(s, b, "checkin", 100),
        ];
        let stats = session_stats(&entries);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_checkins, 2);
        assert_eq!(stats.total_participants, 2);
        assert_eq!(stats.total_score, 210);
        assert_eq!(stats.latest_activity, Some(datetime!(2024-06-01 12:00 UTC)));
        assert_eq!(session_stats(&[]), SessionStats::default());
    }

    #[test]
    fn members_without_a_checkin_are_not_participants() {
        let s = SessionId::new();
        let bonus_only = ProfileId::new();
        let checked_in = ProfileId::new();
        let entries = vec![
            entry(s, bonus_only, "bonus", 25),
            entry(s, checked_in, "checkin", 100),
        ];
        let stats = session_stats(&entries);
        assert_eq!(stats.total_participants, 1);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_score, 125);
    }
}
