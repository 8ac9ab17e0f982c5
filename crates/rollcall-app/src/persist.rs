//! Snapshot of the durable caches across restarts.
//!
//! Groups, organizations and profiles survive a restart. Sessions, members and
//! history are never written and start empty on every load.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rollcall_core::{Group, Organization, Profile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::caches::Caches;
use crate::fetch::lock;

/// Serialized form of the durable caches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCache {
    /// Cached groups.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Cached organizations.
    #[serde(default)]
    pub organizations: Vec<Organization>,
    /// The user's own profile.
    #[serde(default)]
    pub my_profile: Option<Profile>,
    /// Every other cached profile.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl PersistedCache {
    /// Copy the durable caches, sorted by id for stable output.
    pub fn capture(caches: &Caches) -> Self {
        let mut groups: Vec<Group> = lock(&caches.groups).store.values().cloned().collect();
        groups.sort_by_key(|group| group.id);
        let mut organizations: Vec<Organization> =
            lock(&caches.organizations).store.values().cloned().collect();
        organizations.sort_by_key(|org| org.id);
        let profiles = lock(&caches.profiles);
        let my_profile = profiles.mine().cloned();
        let mut others: Vec<Profile> = profiles.others().cloned().collect();
        drop(profiles);
        others.sort_by_key(|profile| profile.id);
        Self {
            groups,
            organizations,
            my_profile,
            profiles: others,
        }
    }

    /// Write the snapshot into the caches, overwriting entries with the same id.
    pub fn restore(self, caches: &Caches) {
        lock(&caches.groups).store.put_many(self.groups);
        lock(&caches.organizations).store.put_many(self.organizations);
        let mut profiles = lock(&caches.profiles);
        if let Some(mine) = self.my_profile {
            profiles.set_mine(mine);
        }
        profiles.store_many(self.profiles);
    }

    /// Read a snapshot; an absent file yields an empty one.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No cache snapshot");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Write the snapshot as JSON, creating parent directories.
    ///
    /// # Errors
    /// Returns an error when serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
        info!(
            path = %path.display(),
            groups = self.groups.len(),
            profiles = self.profiles.len(),
            "Saved cache snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, SystemClock};
    use crate::config::TtlConfig;
    use rollcall_core::{GroupId, ProfileId, UserRole};
    use std::sync::Arc;
    use tempfile::tempdir;
    use time::macros::datetime;

    fn caches() -> Caches {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Caches::new(&TtlConfig::default(), &clock)
    }

    fn profile(name: &str) -> Profile {
        Profile {
            id: ProfileId::new(),
            username: name.into(),
            full_name: name.into(),
            role: UserRole::Member,
            organization_id: None,
            bio: None,
            avatar_url: None,
            created_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[test]
    fn snapshot_round_trips_through_a_file() -> Result<()> {
        let source = caches();
        let me = profile("me");
        let other = profile("other");
        let group = Group {
            id: GroupId::new(),
            name: "g".into(),
            description: None,
            code: "ZXCVBNMA".into(),
            owner_id: me.id,
            created_at: datetime!(2024-01-02 00:00 UTC),
        };
        lock(&source.groups).store.put(group.clone());
        lock(&source.profiles).set_mine(me.clone());
        lock(&source.profiles).store(other.clone());

        let dir = tempdir()?;
        let path = dir.path().join("nested").join("cache.json");
        PersistedCache::capture(&source).save(&path)?;

        let target = caches();
        PersistedCache::load(&path)?.restore(&target);
        assert_eq!(lock(&target.groups).store.get(&group.id), Some(&group));
        assert_eq!(lock(&target.profiles).mine(), Some(&me));
        assert!(lock(&target.profiles).lookup(&other.id).is_some());
        Ok(())
    }

    #[test]
    fn missing_snapshot_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let snapshot = PersistedCache::load(dir.path().join("absent.json"))?;
        assert_eq!(snapshot, PersistedCache::default());
        Ok(())
    }
}
