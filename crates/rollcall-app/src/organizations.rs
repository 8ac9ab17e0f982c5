//! Organization point cache.

use std::sync::Arc;

use rollcall_core::{
    NewOrganization, Organization, OrganizationId, OrganizationUpdate, Profile, ProfileId,
};
use tracing::info;

use crate::error::SyncError;
use crate::fetch::{PointCache, Shared, lock, read_point, tracked};
use crate::remote::{IdentityRemote, OrganizationRemote};

/// Organization reads and writes. Cached organizations never expire.
pub struct OrganizationRepository<R> {
    remote: Arc<R>,
    cache: Shared<PointCache<Organization>>,
}

impl<R> OrganizationRepository<R> {
    /// Repository over a shared cache.
    pub const fn new(remote: Arc<R>, cache: Shared<PointCache<Organization>>) -> Self {
        Self { remote, cache }
    }

    /// Cached organization.
    pub fn organization(&self, id: OrganizationId) -> Option<Organization> {
        lock(&self.cache).store.get(&id).cloned()
    }

    /// Whether an organization request is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.cache).status.is_loading()
    }

    /// Last organization error message.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.cache).status.last_error().map(str::to_owned)
    }
}

impl<R: OrganizationRemote + IdentityRemote> OrganizationRepository<R> {
    /// Organization by id: cached value when present, otherwise fetched.
    pub async fn fetch_organization(&self, id: OrganizationId) -> Option<Organization> {
        read_point(&self.cache, id, self.remote.organization(id)).await
    }

    /// Organization of `profile`, or of the actor when omitted.
    pub async fn fetch_user_organization(&self, profile: Option<ProfileId>) -> Option<Organization> {
        let lookup = async {
            let profile = match profile {
                Some(id) => id,
                None => self.remote.current_actor_id().await?,
            };
            self.remote.organization_of(profile).await
        };
        let org = tracked(&self.cache, "fetch user organization", lookup)
            .await
            .ok()
            .flatten()?;
        lock(&self.cache).store.put(org.clone());
        Some(org)
    }

    /// Profiles of an organization. Not cached here.
    pub async fn fetch_organization_members(&self, id: OrganizationId) -> Vec<Profile> {
        tracked(
            &self.cache,
            "fetch organization members",
            self.remote.organization_profiles(id),
        )
        .await
        .unwrap_or_default()
    }

    /// Create an organization and write it through.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn create_organization(
        &self,
        new: NewOrganization,
    ) -> Result<Organization, SyncError> {
        let org = tracked(
            &self.cache,
            "create organization",
            self.remote.create_organization(new),
        )
        .await?;
        lock(&self.cache).store.put(org.clone());
        info!(organization = %org.id, "Created organization");
        Ok(org)
    }

    /// Update an organization and write the result through.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn update_organization(
        &self,
        id: OrganizationId,
        update: &OrganizationUpdate,
    ) -> Result<Organization, SyncError> {
        let org = tracked(
            &self.cache,
            "update organization",
            self.remote.update_organization(id, update),
        )
        .await?;
        lock(&self.cache).store.put(org.clone());
        info!(organization = %id, "Updated organization");
        Ok(org)
    }

    /// Delete an organization and evict it.
    ///
    /// # Errors
    /// Propagates remote failures.
    pub async fn delete_organization(&self, id: OrganizationId) -> Result<(), SyncError> {
        tracked(
            &self.cache,
            "delete organization",
            self.remote.delete_organization(id),
        )
        .await?;
        lock(&self.cache).store.remove(&id);
        info!(organization = %id, "Deleted organization");
        Ok(())
    }

    /// Evict and fetch again.
    pub async fn refresh_organization(&self, id: OrganizationId) -> Option<Organization> {
        lock(&self.cache).store.remove(&id);
        self.fetch_organization(id).await
    }
}
