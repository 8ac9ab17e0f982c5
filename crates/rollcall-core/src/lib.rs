//! Domain records, identifiers and payloads for rollcall.

/// Group join-code generation.
pub mod code;
/// Identifier types.
pub mod id;
/// Entity records.
pub mod model;
/// Create/update payloads.
pub mod payload;

pub use code::generate_group_code;
pub use id::{GroupId, HistoryEntryId, MemberId, OrganizationId, ProfileId, SessionId};
pub use model::{
    Address, CHECKIN_ACTION, CHECKIN_DESCRIPTION, EntityClass, Group, GroupMember,
    GroupMembership, MemberRole, Organization, Profile, ProfileSummary, Session,
    SessionHistoryEntry, SessionStatus, UserRole,
};
pub use payload::{
    GroupUpdate, MemberUpdate, Merge, NewGroup, NewHistoryEntry, NewOrganization, NewProfile,
    NewSession, OrganizationUpdate, ProfileUpdate, SessionUpdate,
};
