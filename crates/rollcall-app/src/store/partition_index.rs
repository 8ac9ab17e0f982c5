use std::collections::HashMap;
use std::hash::Hash;

/// Parent key to ordered member ids.
#[derive(Debug, Clone)]
pub struct PartitionIndex<P, K> {
    partitions: HashMap<P, Vec<K>>,
}

impl<P, K> Default for PartitionIndex<P, K> {
    fn default() -> Self {
        Self {
            partitions: HashMap::new(),
        }
    }
}

impl<P: Eq + Hash, K: Copy + Eq> PartitionIndex<P, K> {
    /// Ids of a partition in canonical order; empty when unknown.
    pub fn list_ids(&self, parent: &P) -> &[K] {
        self.partitions
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the partition has been populated.
    pub fn contains_partition(&self, parent: &P) -> bool {
        self.partitions.contains_key(parent)
    }

    /// Append `id` at the tail unless already present.
    pub fn append(&mut self, parent: P, id: K) {
        let ids = self.partitions.entry(parent).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Insert `id` at the head unless already present.
    pub fn prepend(&mut self, parent: P, id: K) {
        let ids = self.partitions.entry(parent).or_default();
        if !ids.contains(&id) {
            ids.insert(0, id);
        }
    }

    /// Insert `id` at `position` unless already present.
    pub fn insert_at(&mut self, parent: P, position: usize, id: K) {
        let ids = self.partitions.entry(parent).or_default();
        if !ids.contains(&id) {
            ids.insert(position.min(ids.len()), id);
        }
    }

    /// Replace a partition wholesale and return the ids it held before.
    pub fn replace_all(&mut self, parent: P, ids: Vec<K>) -> Vec<K> {
        self.partitions.insert(parent, ids).unwrap_or_default()
    }

    /// Drop `id` from one partition.
    pub fn remove_id(&mut self, parent: &P, id: &K) {
        if let Some(ids) = self.partitions.get_mut(parent) {
            ids.retain(|existing| existing != id);
        }
    }

    /// Drop `id` from every partition.
    pub fn remove_everywhere(&mut self, id: &K) {
        for ids in self.partitions.values_mut() {
            ids.retain(|existing| existing != id);
        }
    }

    /// Forget a partition and return its ids.
    pub fn clear_partition(&mut self, parent: &P) -> Vec<K> {
        self.partitions.remove(parent).unwrap_or_default()
    }

    /// Forget every partition.
    pub fn clear(&mut self) {
        self.partitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_partition_is_empty() {
        let index: PartitionIndex<u8, u32> = PartitionIndex::default();
        assert!(index.list_ids(&1).is_empty());
        assert!(!index.contains_partition(&1));
    }

    #[test]
    fn append_and_prepend_are_idempotent() {
        let mut index = PartitionIndex::default();
        index.append(1_u8, 10_u32);
        index.append(1, 11);
        index.append(1, 10);
        index.prepend(1, 9);
        index.prepend(1, 11);
        assert_eq!(index.list_ids(&1), &[9, 10, 11]);
    }

    #[test]
    fn replace_all_keeps_given_order_and_returns_previous() {
        let mut index = PartitionIndex::default();
        index.append(1_u8, 1_u32);
        let previous = index.replace_all(1, vec![3, 1, 2]);
        assert_eq!(previous, vec![1]);
        assert_eq!(index.list_ids(&1), &[3, 1, 2]);
    }

    #[test]
    fn remove_everywhere_scrubs_all_partitions() {
        let mut index = PartitionIndex::default();
        index.replace_all(1_u8, vec![1_u32, 2]);
        index.replace_all(2, vec![2, 3]);
        index.remove_everywhere(&2);
        assert_eq!(index.list_ids(&1), &[1]);
        assert_eq!(index.list_ids(&2), &[3]);
        assert_eq!(index.clear_partition(&2), vec![3]);
        assert!(!index.contains_partition(&2));
    }
}
