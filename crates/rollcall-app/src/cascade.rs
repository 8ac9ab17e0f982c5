//! Cross-class invalidation triggered by mutations and identity changes.

use rollcall_core::{GroupId, SessionId};
use tracing::{debug, info};

use crate::caches::Caches;
use crate::fetch::lock;

/// Applies the invalidation rules that span entity classes.
#[derive(Clone)]
pub struct CascadeInvalidator {
    caches: Caches,
}

impl CascadeInvalidator {
    /// Invalidator over the given caches.
    pub const fn new(caches: Caches) -> Self {
        Self { caches }
    }

    /// A session of `group` was created, updated or deleted.
    pub fn session_mutated(&self, group: GroupId) {
        lock(&self.caches.sessions).store.invalidate(&group);
        debug!(%group, "Invalidated session partition");
    }

    /// A group was deleted. Its member and session partitions stay as they are.
    pub fn group_deleted(&self, group: GroupId) {
        lock(&self.caches.groups).store.remove(&group);
        debug!(%group, "Evicted deleted group");
    }

    /// Mark a group's member partition stale.
    pub fn invalidate_members(&self, group: GroupId) {
        lock(&self.caches.members).store.invalidate(&group);
    }

    /// Mark a group's session partition stale.
    pub fn invalidate_sessions(&self, group: GroupId) {
        lock(&self.caches.sessions).store.invalidate(&group);
    }

    /// Mark a session's history partition stale.
    pub fn invalidate_history(&self, session: SessionId) {
        lock(&self.caches.history).store.invalidate(&session);
    }

    /// A new identity signed in: drop groups and organizations.
    pub fn identity_changed(&self) {
        lock(&self.caches.groups).store.clear();
        lock(&self.caches.organizations).store.clear();
        info!("Cleared group and organization caches for new identity");
    }

    /// The identity signed out: drop groups and every profile.
    pub fn identity_cleared(&self) {
        lock(&self.caches.groups).store.clear();
        lock(&self.caches.profiles).clear_identity();
        info!("Cleared group and profile caches");
    }
}
