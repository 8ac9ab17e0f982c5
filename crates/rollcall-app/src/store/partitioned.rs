use std::sync::Arc;

use rollcall_core::Merge;
use time::Duration;

use super::{EntityStore, PartitionIndex, PartitionOrder, Partitioned, ValidityTracker};
use crate::clock::Clock;

/// Entity store, partition index and validity tracker of one entity class.
///
/// Every id listed in a partition resolves in the entity store: removals go
/// through [`PartitionedStore::remove`], which scrubs the index as well.
pub struct PartitionedStore<V: Partitioned> {
    entities: EntityStore<V>,
    index: PartitionIndex<V::Parent, V::Key>,
    validity: ValidityTracker<V::Parent>,
}

impl<V: Partitioned> PartitionedStore<V> {
    /// Empty store whose partitions expire after `ttl`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entities: EntityStore::default(),
            index: PartitionIndex::default(),
            validity: ValidityTracker::new(ttl, clock),
        }
    }

    /// Cached value by id.
    pub fn get(&self, key: &V::Key) -> Option<&V> {
        self.entities.get(key)
    }

    /// Ids of a partition in canonical order.
    pub fn ids(&self, parent: &V::Parent) -> &[V::Key] {
        self.index.list_ids(parent)
    }

    /// Values of a partition in canonical order. Unresolvable ids are skipped.
    pub fn list(&self, parent: &V::Parent) -> Vec<V> {
        self.index
            .list_ids(parent)
            .iter()
            .filter_map(|key| self.entities.get(key))
            .cloned()
            .collect()
    }

    /// Whether the partition was fetched within its TTL.
    pub fn is_valid(&self, parent: &V::Parent) -> bool {
        self.validity.is_valid(parent)
    }

    /// Whether the partition has ever been populated.
    pub fn has_partition(&self, parent: &V::Parent) -> bool {
        self.index.contains_partition(parent)
    }

    /// Store a full fetch result as the partition's new content.
    ///
    /// Values are put into canonical order, previous members that disappeared
    /// are evicted, and the partition is marked fresh. Returns the ordered values.
    pub fn replace_all(&mut self, parent: V::Parent, mut values: Vec<V>) -> Vec<V> {
        sort_partition(&mut values);
        let ids: Vec<V::Key> = values.iter().map(|v| v.key()).collect();
        let previous = self.index.replace_all(parent, ids.clone());
        for stale in previous.iter().filter(|key| !ids.contains(*key)) {
            self.entities.remove(stale);
        }
        self.entities.put_many(values.iter().cloned());
        self.validity.mark_fresh(parent);
        values
    }

    /// Write `value` through and index it at its canonical position.
    pub fn insert(&mut self, value: V) {
        let parent = value.parent();
        let key = value.key();
        match V::ORDER {
            PartitionOrder::AsReceived => self.index.append(parent, key),
            PartitionOrder::NewestFirst => self.index.prepend(parent, key),
            PartitionOrder::OldestFirst => {
                let stamp = (value.stamp(), key);
                let position = self
                    .index
                    .list_ids(&parent)
                    .iter()
                    .position(|existing| {
                        self.entities
                            .get(existing)
                            .is_some_and(|other| (other.stamp(), other.key()) > stamp)
                    })
                    .unwrap_or_else(|| self.index.list_ids(&parent).len());
                self.index.insert_at(parent, position, key);
            }
        }
        self.entities.put(value);
    }

    /// Write `value` through; index it only when its partition is populated.
    pub fn upsert(&mut self, value: V) {
        if self.index.contains_partition(&value.parent()) {
            self.insert(value);
        } else {
            self.entities.put(value);
        }
    }

    /// Write `value` into the entity store without touching the index.
    pub fn put(&mut self, value: V) {
        self.entities.put(value);
    }

    /// Shallow-merge a partial update into a cached value.
    pub fn patch<P>(&mut self, key: &V::Key, patch: &P) -> Option<V>
    where
        V: Merge<P>,
    {
        self.entities.patch(key, patch).cloned()
    }

    /// Evict a value and every index entry pointing at it.
    pub fn remove(&mut self, key: &V::Key) -> Option<V> {
        self.index.remove_everywhere(key);
        self.entities.remove(key)
    }

    /// Mark a partition stale while keeping its content.
    pub fn invalidate(&mut self, parent: &V::Parent) {
        self.validity.invalidate(parent);
    }

    /// Drop a partition, its values and its fetch time.
    pub fn clear_partition(&mut self, parent: &V::Parent) {
        for key in self.index.clear_partition(parent) {
            self.entities.remove(&key);
        }
        self.validity.invalidate(parent);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.index.clear();
        self.validity.clear();
    }

    /// Every cached value in arbitrary order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entities.values()
    }
}

fn sort_partition<V: Partitioned>(values: &mut [V]) {
    match V::ORDER {
        PartitionOrder::AsReceived => {}
        PartitionOrder::OldestFirst => values.sort_by_key(|v| (v.stamp(), v.key())),
        PartitionOrder::NewestFirst => {
            values.sort_by(|a, b| (b.stamp(), b.key()).cmp(&(a.stamp(), a.key())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rollcall_core::{
        GroupId, GroupMember, HistoryEntryId, MemberId, MemberRole, ProfileId, ProfileSummary,
        Session, SessionHistoryEntry, SessionId, SessionStatus,
    };
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::default())
    }

    fn summary(id: ProfileId) -> ProfileSummary {
        ProfileSummary {
            id,
            username: None,
            full_name: None,
        }
    }

    fn member(group: GroupId, joined_at: OffsetDateTime) -> GroupMember {
        let profile_id = ProfileId::new();
        GroupMember {
            id: MemberId::new(),
            profile_id,
            group_id: group,
            role: MemberRole::Member,
            joined_at,
            profile: summary(profile_id),
            score: 0,
        }
    }

    fn session(group: GroupId, name: &str) -> Session {
        let at = datetime!(2024-05-01 18:00 UTC);
        Session {
            id: SessionId::new(),
            name: name.into(),
            description: None,
            delay: 0,
            status: SessionStatus::Open,
            status_changed_at: None,
            group_id: group,
            created_at: at,
            updated_at: at,
        }
    }

    fn entry(session: SessionId, created_at: OffsetDateTime) -> SessionHistoryEntry {
        let member = ProfileId::new();
        SessionHistoryEntry {
            id: HistoryEntryId::new(),
            created_at,
            session_id: session,
            member_id: member,
            action: "checkin".into(),
            action_description: None,
            score: 100,
            by_profile_id: member,
            member_profile: summary(member),
            by_profile: summary(member),
        }
    }

    #[test]
    fn member_partitions_sort_oldest_first_regardless_of_input() {
        let group = GroupId::new();
        let late = member(group, datetime!(2024-02-01 00:00 UTC));
        let early = member(group, datetime!(2024-01-01 00:00 UTC));
        let mut store = PartitionedStore::new(Duration::minutes(3), clock());
        store.replace_all(group, vec![late.clone(), early.clone()]);
        assert_eq!(store.ids(&group), &[early.id, late.id]);
    }

    #[test]
    fn session_partitions_keep_server_order() {
        let group = GroupId::new();
        let a = session(group, "a");
        let b = session(group, "b");
        let c = session(group, "c");
        let mut store = PartitionedStore::new(Duration::minutes(5), clock());
        store.replace_all(group, vec![b.clone(), c.clone(), a.clone()]);
        assert_eq!(store.ids(&group), &[b.id, c.id, a.id]);
    }

    #[test]
    fn history_partitions_sort_newest_first_and_insert_at_head() {
        let sid = SessionId::new();
        let old = entry(sid, datetime!(2024-05-01 18:00 UTC));
        let new = entry(sid, datetime!(2024-05-01 18:05 UTC));
        let mut store = PartitionedStore::new(Duration::minutes(5), clock());
        store.replace_all(sid, vec![old.clone(), new.clone()]);
        assert_eq!(store.ids(&sid), &[new.id, old.id]);

        let newest = entry(sid, datetime!(2024-05-01 18:10 UTC));
        store.insert(newest.clone());
        assert_eq!(store.ids(&sid), &[newest.id, new.id, old.id]);
    }

    #[test]
    fn late_joiner_is_inserted_in_join_order() {
        let group = GroupId::new();
        let first = member(group, datetime!(2024-01-01 00:00 UTC));
        let third = member(group, datetime!(2024-03-01 00:00 UTC));
        let mut store = PartitionedStore::new(Duration::minutes(3), clock());
        store.replace_all(group, vec![first.clone(), third.clone()]);
        let second = member(group, datetime!(2024-02-01 00:00 UTC));
        store.insert(second.clone());
        assert_eq!(store.ids(&group), &[first.id, second.id, third.id]);
    }

    #[test]
    fn replace_all_evicts_members_that_disappeared() {
        let group = GroupId::new();
        let kept = member(group, datetime!(2024-01-01 00:00 UTC));
        let gone = member(group, datetime!(2024-01-02 00:00 UTC));
        let mut store = PartitionedStore::new(Duration::minutes(3), clock());
        store.replace_all(group, vec![kept.clone(), gone.clone()]);
        store.replace_all(group, vec![kept.clone()]);
        assert!(store.get(&gone.id).is_none());
        assert_eq!(store.list(&group), vec![kept]);
    }

    #[test]
    fn remove_leaves_no_dangling_ids() {
        let group = GroupId::new();
        let a = member(group, datetime!(2024-01-01 00:00 UTC));
        let b = member(group, datetime!(2024-01-02 00:00 UTC));
        let mut store = PartitionedStore::new(Duration::minutes(3), clock());
        store.replace_all(group, vec![a.clone(), b.clone()]);
        store.remove(&a.id);
        assert_eq!(store.ids(&group), &[b.id]);
        for id in store.ids(&group) {
            assert!(store.get(id).is_some());
        }
    }

    #[test]
    fn upsert_only_indexes_populated_partitions() {
        let group = GroupId::new();
        let mut store = PartitionedStore::new(Duration::minutes(5), clock());
        let lone = session(group, "lone");
        store.upsert(lone.clone());
        assert!(store.get(&lone.id).is_some());
        assert!(!store.has_partition(&group));
    }

    #[test]
    fn invalidate_keeps_content_but_drops_freshness() {
        let group = GroupId::new();
        let mut store = PartitionedStore::new(Duration::minutes(5), clock());
        let s = session(group, "s");
        store.replace_all(group, vec![s.clone()]);
        assert!(store.is_valid(&group));
        store.invalidate(&group);
        assert!(!store.is_valid(&group));
        assert_eq!(store.list(&group), vec![s]);
        store.clear_partition(&group);
        assert!(store.list(&group).is_empty());
    }
}
