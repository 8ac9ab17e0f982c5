//! Service façade wiring every repository to one set of shared caches.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rollcall_core::{GroupMembership, ProfileId, SessionHistoryEntry, SessionId};
use tracing::info;

use crate::caches::Caches;
use crate::cascade::CascadeInvalidator;
use crate::checkin::IdempotencyGuard;
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::SyncError;
use crate::fetch::FetchPolicy;
use crate::groups::GroupRepository;
use crate::history::HistoryRepository;
use crate::members::MemberRepository;
use crate::organizations::OrganizationRepository;
use crate::persist::PersistedCache;
use crate::profiles::ProfileRepository;
use crate::remote::RemoteSource;
use crate::sessions::SessionRepository;

/// Entry point of the cache layer: one instance per process, shared by reference.
pub struct SyncService<R> {
    config: CacheConfig,
    caches: Caches,
    cascade: CascadeInvalidator,
    organizations: OrganizationRepository<R>,
    profiles: ProfileRepository<R>,
    groups: GroupRepository<R>,
    members: MemberRepository<R>,
    sessions: SessionRepository<R>,
    history: HistoryRepository<R>,
    checkin: IdempotencyGuard<R>,
}

impl<R> SyncService<R> {
    /// Service over `remote` using the wall clock.
    pub fn new(remote: Arc<R>, config: CacheConfig) -> Self {
        Self::with_clock(remote, config, Arc::new(SystemClock))
    }

    /// Service over `remote` with an explicit clock for freshness checks.
    pub fn with_clock(remote: Arc<R>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let caches = Caches::new(&config.ttl, &clock);
        let cascade = CascadeInvalidator::new(caches.clone());
        let policy = FetchPolicy::new(config.context);
        Self {
            organizations: OrganizationRepository::new(
                Arc::clone(&remote),
                Arc::clone(&caches.organizations),
            ),
            profiles: ProfileRepository::new(Arc::clone(&remote), Arc::clone(&caches.profiles)),
            groups: GroupRepository::new(
                Arc::clone(&remote),
                Arc::clone(&caches.groups),
                cascade.clone(),
            ),
            members: MemberRepository::new(
                Arc::clone(&remote),
                Arc::clone(&caches.members),
                policy,
                cascade.clone(),
            ),
            sessions: SessionRepository::new(
                Arc::clone(&remote),
                Arc::clone(&caches.sessions),
                policy,
                cascade.clone(),
            ),
            history: HistoryRepository::new(
                Arc::clone(&remote),
                Arc::clone(&caches.history),
                policy,
                cascade.clone(),
            ),
            checkin: IdempotencyGuard::new(
                remote,
                Arc::clone(&caches.history),
                config.checkin_score,
            ),
            config,
            caches,
            cascade,
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Shared cache handles.
    pub const fn caches(&self) -> &Caches {
        &self.caches
    }

    /// Cross-class invalidation rules.
    pub const fn cascade(&self) -> &CascadeInvalidator {
        &self.cascade
    }

    /// Organization repository.
    pub const fn organizations(&self) -> &OrganizationRepository<R> {
        &self.organizations
    }

    /// Profile repository.
    pub const fn profiles(&self) -> &ProfileRepository<R> {
        &self.profiles
    }

    /// Group repository.
    pub const fn groups(&self) -> &GroupRepository<R> {
        &self.groups
    }

    /// Member repository.
    pub const fn members(&self) -> &MemberRepository<R> {
        &self.members
    }

    /// Session repository.
    pub const fn sessions(&self) -> &SessionRepository<R> {
        &self.sessions
    }

    /// History repository.
    pub const fn history(&self) -> &HistoryRepository<R> {
        &self.history
    }

    /// Check-in guard.
    pub const fn checkin(&self) -> &IdempotencyGuard<R> {
        &self.checkin
    }

    /// Drop groups and every profile after the identity signed out.
    pub fn logout(&self) {
        self.cascade.identity_cleared();
        info!("Logged out");
    }

    /// Snapshot groups, organizations and profiles to `path`.
    ///
    /// # Errors
    /// Returns an error when the snapshot cannot be written.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        PersistedCache::capture(&self.caches).save(path)
    }

    /// Load a snapshot written by [`SyncService::persist`].
    ///
    /// # Errors
    /// Returns an error when the snapshot exists but cannot be read.
    pub fn restore(&self, path: impl AsRef<Path>) -> Result<()> {
        PersistedCache::load(path)?.restore(&self.caches);
        Ok(())
    }
}

impl<R: RemoteSource> SyncService<R> {
    /// A new identity signed in.
    ///
    /// Groups and organizations are dropped, the "my profile" slot is reloaded,
    /// then the identity's groups are fetched again.
    ///
    /// # Errors
    /// Propagates failures loading the profile.
    pub async fn login(&self, actor: ProfileId) -> Result<Vec<GroupMembership>, SyncError> {
        self.cascade.identity_changed();
        self.profiles.refresh_my_profile(Some(actor)).await?;
        let memberships = self.groups.fetch_user_groups(Some(actor)).await;
        info!(%actor, groups = memberships.len(), "Logged in");
        Ok(memberships)
    }

    /// Check `member` (the actor when omitted) in to `session`.
    ///
    /// # Errors
    /// See [`IdempotencyGuard::perform_checkin`].
    pub async fn perform_checkin(
        &self,
        session: SessionId,
        member: Option<ProfileId>,
    ) -> Result<SessionHistoryEntry, SyncError> {
        self.checkin.perform_checkin(session, member).await
    }
}
