//! The shared per-class caches of one process.

use std::sync::Arc;

use rollcall_core::{Group, GroupMember, Organization, Session, SessionHistoryEntry};

use crate::clock::Clock;
use crate::config::TtlConfig;
use crate::fetch::{PartitionCache, PointCache, Shared, shared};
use crate::profiles::ProfileCache;

/// One handle per entity class. Clones share the same underlying caches.
#[derive(Clone)]
pub struct Caches {
    /// Organizations, point-cached.
    pub organizations: Shared<PointCache<Organization>>,
    /// Profiles with the "my profile" slot.
    pub profiles: Shared<ProfileCache>,
    /// Groups, point-cached.
    pub groups: Shared<PointCache<Group>>,
    /// Members partitioned by group.
    pub members: Shared<PartitionCache<GroupMember>>,
    /// Sessions partitioned by group.
    pub sessions: Shared<PartitionCache<Session>>,
    /// History entries partitioned by session.
    pub history: Shared<PartitionCache<SessionHistoryEntry>>,
}

impl Caches {
    /// Empty caches with the configured lifetimes.
    pub fn new(ttl: &TtlConfig, clock: &Arc<dyn Clock>) -> Self {
        Self {
            organizations: shared(PointCache::default()),
            profiles: shared(ProfileCache::default()),
            groups: shared(PointCache::default()),
            members: shared(PartitionCache::new(ttl.members(), Arc::clone(clock))),
            sessions: shared(PartitionCache::new(ttl.sessions(), Arc::clone(clock))),
            history: shared(PartitionCache::new(ttl.history(), Arc::clone(clock))),
        }
    }
}
