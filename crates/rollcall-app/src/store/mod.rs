//! In-memory entity stores, partition indexes and freshness tracking.

mod entity_store;
mod partition_index;
mod partitioned;
mod validity;

pub use entity_store::EntityStore;
pub use partition_index::PartitionIndex;
pub use partitioned::PartitionedStore;
pub use validity::ValidityTracker;

use rollcall_core::{
    EntityClass, Group, GroupId, GroupMember, HistoryEntryId, MemberId, Organization,
    OrganizationId, Profile, ProfileId, Session, SessionHistoryEntry, SessionId,
};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use time::OffsetDateTime;

/// Record cached under its own id.
pub trait Entity: Clone {
    /// Identifier type.
    type Key: Copy + Eq + Ord + Hash + Display + Debug;

    /// Entity class used in logs and errors.
    const CLASS: EntityClass;

    /// Identifier of this record.
    fn key(&self) -> Self::Key;
}

/// Canonical order of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionOrder {
    /// Keep the order the remote returned.
    AsReceived,
    /// Ascending by [`Partitioned::stamp`].
    OldestFirst,
    /// Descending by [`Partitioned::stamp`]; new records go to the head.
    NewestFirst,
}

/// Record indexed under a parent key.
pub trait Partitioned: Entity {
    /// Parent key type.
    type Parent: Copy + Eq + Hash + Display + Debug;

    /// Ordering policy of partitions of this class.
    const ORDER: PartitionOrder;

    /// Parent this record belongs to.
    fn parent(&self) -> Self::Parent;

    /// Timestamp the partition is ordered by.
    fn stamp(&self) -> OffsetDateTime;
}

impl Entity for Organization {
    type Key = OrganizationId;
    const CLASS: EntityClass = EntityClass::Organization;

    fn key(&self) -> OrganizationId {
        self.id
    }
}

impl Entity for Profile {
    type Key = ProfileId;
    const CLASS: EntityClass = EntityClass::Profile;

    fn key(&self) -> ProfileId {
        self.id
    }
}

impl Entity for Group {
    type Key = GroupId;
    const CLASS: EntityClass = EntityClass::Group;

    fn key(&self) -> GroupId {
        self.id
    }
}

impl Entity for GroupMember {
    type Key = MemberId;
    const CLASS: EntityClass = EntityClass::GroupMember;

    fn key(&self) -> MemberId {
        self.id
    }
}

impl Partitioned for GroupMember {
    type Parent = GroupId;
    const ORDER: PartitionOrder = PartitionOrder::OldestFirst;

    fn parent(&self) -> GroupId {
        self.group_id
    }

    fn stamp(&self) -> OffsetDateTime {
        self.joined_at
    }
}

impl Entity for Session {
    type Key = SessionId;
    const CLASS: EntityClass = EntityClass::Session;

    fn key(&self) -> SessionId {
        self.id
    }
}

impl Partitioned for Session {
    type Parent = GroupId;
    const ORDER: PartitionOrder = PartitionOrder::AsReceived;

    fn parent(&self) -> GroupId {
        self.group_id
    }

    fn stamp(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl Entity for SessionHistoryEntry {
    type Key = HistoryEntryId;
    const CLASS: EntityClass = EntityClass::SessionHistory;

    fn key(&self) -> HistoryEntryId {
        self.id
    }
}

impl Partitioned for SessionHistoryEntry {
    type Parent = SessionId;
    const ORDER: PartitionOrder = PartitionOrder::NewestFirst;

    fn parent(&self) -> SessionId {
        self.session_id
    }

    fn stamp(&self) -> OffsetDateTime {
        self.created_at
    }
}
