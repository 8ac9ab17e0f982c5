//! Profile cache with the distinguished "my profile" slot.

use std::sync::Arc;

use rollcall_core::{NewProfile, OrganizationId, Profile, ProfileId, ProfileUpdate};
use tracing::info;

use crate::error::SyncError;
use crate::fetch::{Shared, StoreStatus, Tracked, lock, tracked};
use crate::remote::{IdentityRemote, ProfileRemote};
use crate::store::EntityStore;

/// Where a cached profile was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedProfile<'a> {
    /// The authenticated user's own profile.
    Mine(&'a Profile),
    /// Any other profile.
    Other(&'a Profile),
}

impl<'a> CachedProfile<'a> {
    /// The profile itself.
    #[must_use]
    pub const fn profile(self) -> &'a Profile {
        match self {
            Self::Mine(profile) | Self::Other(profile) => profile,
        }
    }

    /// Whether this is the user's own profile.
    #[must_use]
    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine(_))
    }
}

/// "My profile" singleton plus every other known profile.
///
/// Clearing the other profiles never touches the singleton; only
/// [`ProfileCache::clear_identity`] does.
#[derive(Default)]
pub struct ProfileCache {
    mine: Option<Profile>,
    others: EntityStore<Profile>,
    /// Loading state.
    pub status: StoreStatus,
}

impl Tracked for ProfileCache {
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

impl ProfileCache {
    /// The user's own profile.
    #[must_use]
    pub const fn mine(&self) -> Option<&Profile> {
        self.mine.as_ref()
    }

    /// Every cached profile other than the user's own.
    pub fn others(&self) -> impl Iterator<Item = &Profile> {
        self.others.values()
    }

    /// Replace the user's own profile.
    pub fn set_mine(&mut self, profile: Profile) {
        self.others.remove(&profile.id);
        self.mine = Some(profile);
    }

    /// Lookup by id, checking the singleton first.
    #[must_use]
    pub fn lookup(&self, id: &ProfileId) -> Option<CachedProfile<'_>> {
        if let Some(mine) = self.mine.as_ref().filter(|p| &p.id == id) {
            return Some(CachedProfile::Mine(mine));
        }
        self.others.get(id).map(CachedProfile::Other)
    }

    /// Lookup by username, checking the singleton first.
    #[must_use]
    pub fn lookup_username(&self, username: &str) -> Option<CachedProfile<'_>> {
        if let Some(mine) = self.mine.as_ref().filter(|p| p.username == username) {
            return Some(CachedProfile::Mine(mine));
        }
        self.others
            .values()
            .find(|p| p.username == username)
            .map(CachedProfile::Other)
    }

    /// Write a profile through, into the singleton when it is mine.
    pub fn store(&mut self, profile: Profile) {
        if self.mine.as_ref().is_some_and(|mine| mine.id == profile.id) {
            self.mine = Some(profile);
        } else {
            self.others.put(profile);
        }
    }

    /// Write several profiles through.
    pub fn store_many(&mut self, profiles: impl IntoIterator<Item = Profile>) {
        for profile in profiles {
            self.store(profile);
        }
    }

    /// Forget a profile wherever it is cached.
    pub fn remove(&mut self, id: &ProfileId) {
        self.others.remove(id);
        if self.mine.as_ref().is_some_and(|mine| &mine.id == id) {
            self.mine = None;
        }
    }

    /// Cached profiles among `ids`, in the requested order.
    #[must_use]
    pub fn resolve(&self, ids: &[ProfileId]) -> Vec<Profile> {
        ids.iter()
            .filter_map(|id| self.lookup(id))
            .map(|cached| cached.profile().clone())
            .collect()
    }

    /// Cached profiles of an organization.
    #[must_use]
    pub fn by_organization(&self, org: OrganizationId) -> Vec<Profile> {
        self.mine
            .iter()
            .chain(self.others.values())
            .filter(|p| p.organization_id == Some(org))
            .cloned()
            .collect()
    }

    /// Number of cached profiles, the singleton included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.others.len() + usize::from(self.mine.is_some())
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every profile except the user's own.
    pub fn clear_others(&mut self) {
        self.others.clear();
    }

    /// Forget every profile, the user's own included.
    pub fn clear_identity(&mut self) {
        self.mine = None;
        self.others.clear();
    }
}

/// Profile reads and writes through the shared [`ProfileCache`].
pub struct ProfileRepository<R> {
    remote: Arc<R>,
    cache: Shared<ProfileCache>,
}

impl<R> ProfileRepository<R> {
    /// Repository over a shared cache.
    pub const fn new(remote: Arc<R>, cache: Shared<ProfileCache>) -> Self {
        Self { remote, cache }
    }

    /// The user's own profile, if loaded.
    pub fn my_profile(&self) -> Option<Profile> {
        lock(&self.cache).mine().cloned()
    }

    /// Cached profile by id.
    pub fn profile(&self, id: ProfileId) -> Option<Profile> {
        lock(&self.cache).lookup(&id).map(|c| c.profile().clone())
    }

    /// Cached profile by username.
    pub fn profile_by_username(&self, username: &str) -> Option<Profile> {
        lock(&self.cache)
            .lookup_username(username)
            .map(|c| c.profile().clone())
    }

    /// Cached profiles among `ids`.
    pub fn profiles_by_ids(&self, ids: &[ProfileId]) -> Vec<Profile> {
        lock(&self.cache).resolve(ids)
    }

    /// Cached profiles of an organization.
    pub fn profiles_by_organization(&self, org: OrganizationId) -> Vec<Profile> {
        lock(&self.cache).by_organization(org)
    }

    /// Forget every profile except the user's own.
    pub fn clear_others(&self) {
        lock(&self.cache).clear_others();
    }

    /// Forget every profile.
    pub fn clear_identity(&self) {
        lock(&self.cache).clear_identity();
    }

    /// Whether a profile request is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.cache).status.is_loading()
    }

    /// Last profile error message.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.cache).status.last_error().map(str::to_owned)
    }
}

impl<R: ProfileRemote + IdentityRemote> ProfileRepository<R> {
    /// Load the user's own profile, serving the singleton when it matches.
    ///
    /// # Errors
    /// Propagates every failure: callers cannot proceed without an identity.
    pub async fn fetch_my_profile(&self, user: Option<ProfileId>) -> Result<Profile, SyncError> {
        self.load_my_profile(user, false).await
    }

    /// Reload the user's own profile from the remote source.
    ///
    /// # Errors
    /// Propagates every failure.
    pub async fn refresh_my_profile(&self, user: Option<ProfileId>) -> Result<Profile, SyncError> {
        self.load_my_profile(user, true).await
    }

    async fn load_my_profile(
        &self,
        user: Option<ProfileId>,
        force: bool,
    ) -> Result<Profile, SyncError> {
        let id = self.resolve_user(user).await?;
        if !force {
            let cached = lock(&self.cache).mine().filter(|p| p.id == id).cloned();
            if let Some(mine) = cached {
                return Ok(mine);
            }
        }
        let profile = tracked(&self.cache, "fetch my profile", self.remote.profile(id)).await?;
        lock(&self.cache).set_mine(profile.clone());
        info!(profile = %profile.id, "Loaded my profile");
        Ok(profile)
    }

    async fn resolve_user(&self, user: Option<ProfileId>) -> Result<ProfileId, SyncError> {
        match user {
            Some(id) => Ok(id),
            None => Ok(tracked(&self.cache, "resolve actor", self.remote.current_actor_id()).await?),
        }
    }

    /// Profile by id: cached value first, otherwise fetched and stored.
    pub async fn fetch_profile(&self, id: ProfileId) -> Option<Profile> {
        if let Some(hit) = self.profile(id) {
            return Some(hit);
        }
        let profile = tracked(&self.cache, "fetch profile", self.remote.profile(id))
            .await
            .ok()?;
        lock(&self.cache).store(profile.clone());
        Some(profile)
    }

    /// Profile by username: cached value first, otherwise fetched and stored.
    pub async fn fetch_profile_by_username(&self, username: &str) -> Option<Profile> {
        if let Some(hit) = self.profile_by_username(username) {
            return Some(hit);
        }
        let profile = tracked(
            &self.cache,
            "fetch profile by username",
            self.remote.profile_by_username(username),
        )
        .await
        .ok()?;
        lock(&self.cache).store(profile.clone());
        Some(profile)
    }

    /// Every profile, written through.
    pub async fn fetch_profiles(&self) -> Vec<Profile> {
        match tracked(&self.cache, "fetch profiles", self.remote.profiles()).await {
            Ok(profiles) => {
                lock(&self.cache).store_many(profiles.iter().cloned());
                profiles
            }
            Err(_) => Vec::new(),
        }
    }

    /// Profiles by id, fetching only those missing from the cache.
    ///
    /// When the fetch fails the cached subset is returned.
    pub async fn fetch_profiles_by_ids(&self, ids: &[ProfileId]) -> Vec<Profile> {
        let missing: Vec<ProfileId> = {
            let cache = lock(&self.cache);
            ids.iter()
                .copied()
                .filter(|id| cache.lookup(id).is_none())
                .collect()
        };
        if !missing.is_empty()
            && let Ok(fetched) = tracked(
                &self.cache,
                "fetch profiles by ids",
                self.remote.profiles_by_ids(&missing),
            )
            .await
        {
            lock(&self.cache).store_many(fetched);
        }
        self.profiles_by_ids(ids)
    }

    /// Profiles of an organization; cached ones when any are known.
    pub async fn fetch_profiles_by_organization(&self, org: OrganizationId) -> Vec<Profile> {
        let cached = self.profiles_by_organization(org);
        if !cached.is_empty() {
            return cached;
        }
        match tracked(
            &self.cache,
            "fetch organization profiles",
            self.remote.profiles_by_organization(org),
        )
        .await
        {
            Ok(profiles) => {
                lock(&self.cache).store_many(profiles.iter().cloned());
                profiles
            }
            Err(_) => Vec::new(),
        }
    }

    /// Create a profile and write it through.
    ///
    /// # Errors
    /// Propagates remote failures such as a taken username.
    pub async fn create_profile(&self, new: NewProfile) -> Result<Profile, SyncError> {
        let profile = tracked(&self.cache, "create profile", self.remote.create_profile(new)).await?;
        lock(&self.cache).store(profile.clone());
        info!(profile = %profile.id, "Created profile");
        Ok(profile)
    }

    /// Update a profile and write the result through.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn update_profile(
        &self,
        id: ProfileId,
        update: &ProfileUpdate,
    ) -> Result<Profile, SyncError> {
        let profile = tracked(
            &self.cache,
            "update profile",
            self.remote.update_profile(id, update),
        )
        .await?;
        lock(&self.cache).store(profile.clone());
        info!(profile = %profile.id, "Updated profile");
        Ok(profile)
    }

    /// Update the user's own profile.
    ///
    /// # Errors
    /// Returns `Unauthenticated` when no identity is known, or remote failures.
    pub async fn update_my_profile(&self, update: &ProfileUpdate) -> Result<Profile, SyncError> {
        let cached = lock(&self.cache).mine().map(|p| p.id);
        let id = match cached {
            Some(id) => id,
            None => self.resolve_user(None).await?,
        };
        let profile = self.update_profile(id, update).await?;
        lock(&self.cache).set_mine(profile.clone());
        Ok(profile)
    }

    /// Delete a profile and evict it.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn delete_profile(&self, id: ProfileId) -> Result<(), SyncError> {
        tracked(&self.cache, "delete profile", self.remote.delete_profile(id)).await?;
        lock(&self.cache).remove(&id);
        info!(profile = %id, "Deleted profile");
        Ok(())
    }

    /// Drop the cached entry and fetch it again.
    pub async fn refresh_profile(&self, id: ProfileId) -> Option<Profile> {
        let is_mine = lock(&self.cache).mine().is_some_and(|p| p.id == id);
        if is_mine {
            return self.refresh_my_profile(Some(id)).await.ok();
        }
        lock(&self.cache).remove(&id);
        self.fetch_profile(id).await
    }
}
