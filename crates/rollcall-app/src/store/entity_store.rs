use std::collections::HashMap;

use rollcall_core::Merge;

use super::Entity;

/// Map from an entity id to its latest known value. Last write wins.
#[derive(Debug, Clone)]
pub struct EntityStore<V: Entity> {
    values: HashMap<V::Key, V>,
}

impl<V: Entity> Default for EntityStore<V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<V: Entity> EntityStore<V> {
    /// Value stored under `key`.
    pub fn get(&self, key: &V::Key) -> Option<&V> {
        self.values.get(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &V::Key) -> bool {
        self.values.contains_key(key)
    }

    /// Store `value`, replacing any previous value with the same id.
    pub fn put(&mut self, value: V) {
        self.values.insert(value.key(), value);
    }

    /// Store every value.
    pub fn put_many(&mut self, values: impl IntoIterator<Item = V>) {
        for value in values {
            self.put(value);
        }
    }

    /// Drop the value stored under `key`.
    pub fn remove(&mut self, key: &V::Key) -> Option<V> {
        self.values.remove(key)
    }

    /// Shallow-merge `patch` into the stored value. No-op when absent.
    pub fn patch<P>(&mut self, key: &V::Key, patch: &P) -> Option<&V>
    where
        V: Merge<P>,
    {
        let value = self.values.get_mut(key)?;
        value.merge(patch);
        Some(value)
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Drop every value rejected by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&V) -> bool) {
        self.values.retain(|_, value| keep(value));
    }

    /// Iterate stored values in arbitrary order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.values.values()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
