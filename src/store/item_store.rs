//! Concurrent keyed store for configuration entities.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

type Factory<K, T> = Box<dyn Fn(&K) -> T + Send + Sync>;

/// Thread-safe store of `Arc<T>` keyed by `K`.
///
/// Uses `DashMap` so readers on different shards never contend. Values are
/// handed out as `Arc<T>`; `update` replaces the stored `Arc` rather than
/// mutating in place, so earlier readers keep a consistent value.
pub struct ItemStore<T, K = String> {
    items: DashMap<K, Arc<T>>,
    factory: Factory<K, T>,
}

impl<T, K> ItemStore<T, K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty store with the constructor used by `get_or_create`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&K) -> T + Send + Sync + 'static,
    {
        Self {
            items: DashMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Look up an item by id.
    pub fn get<Q>(&self, id: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    /// Point-in-time list of all items, in no particular order.
    pub fn get_all(&self) -> Vec<Arc<T>> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Point-in-time list of all ids.
    pub fn ids(&self) -> Vec<K> {
        self.items.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Return the existing item or construct, insert and return a new one.
    ///
    /// The shard write lock is held while the factory runs, so concurrent
    /// callers for the same id always observe a single instance.
    pub fn get_or_create(&self, id: K) -> Arc<T> {
        let key = id.clone();
        self.items
            .entry(id)
            .or_insert_with(|| Arc::new((self.factory)(&key)))
            .value()
            .clone()
    }

    /// Insert or replace an item.
    pub fn insert(&self, id: K, item: T) -> Arc<T> {
        let item = Arc::new(item);
        self.items.insert(id, item.clone());
        item
    }

    /// Replace an existing item with the mutator's output.
    ///
    /// Returns `None` when the id is not present.
    pub fn update<Q, F>(&self, id: &Q, mutator: F) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&T) -> T,
    {
        let mut entry = self.items.get_mut(id)?;
        let next = Arc::new(mutator(entry.value()));
        *entry.value_mut() = next.clone();
        Some(next)
    }

    /// Remove an item, returning it if present.
    pub fn remove<Q>(&self, id: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.remove(id).map(|(_, item)| item)
    }

    /// Keep only the items whose id passes the predicate.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.items.retain(|key, _| keep(key));
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T, K> fmt::Debug for ItemStore<T, K>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<_> = self.items.iter().map(|e| format!("{:?}", e.key())).collect();
        f.debug_struct("ItemStore").field("ids", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: String,
        value: u32,
    }

    fn store() -> ItemStore<Item> {
        ItemStore::new(|id: &String| Item {
            id: id.clone(),
            value: 0,
        })
    }

    #[test]
    fn test_new_store_empty() {
        let store = store();
        assert!(store.is_empty());
        assert!(store.get("missing").is_none());
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_insert_get_update_remove() {
        let store = store();
        store.insert("a".into(), Item { id: "a".into(), value: 1 });

        let before = store.get("a").unwrap();
        let after = store
            .update("a", |old| Item {
                id: old.id.clone(),
                value: old.value + 1,
            })
            .unwrap();

        assert_eq!(before.value, 1, "earlier readers keep their value");
        assert_eq!(after.value, 2);
        assert_eq!(store.get("a").unwrap().value, 2);
        assert!(store.update("zzz", |old| Item { id: old.id.clone(), value: 9 }).is_none());

        assert_eq!(store.remove("a").unwrap().value, 2);
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let store = store();
        let first = store.get_or_create("x".into());
        let second = store.get_or_create("x".into());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id, "x");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_create_concurrent_single_instance() {
        const THREADS: usize = 32;
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = constructed.clone();
        let store = Arc::new(ItemStore::new(move |id: &String| {
            counter.fetch_add(1, Ordering::SeqCst);
            Item {
                id: id.clone(),
                value: 7,
            }
        }));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store.get_or_create("shared".to_string())
                })
            })
            .collect();

        let items: Vec<Arc<Item>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(items.len(), THREADS);
        assert!(items.iter().all(|i| Arc::ptr_eq(i, &items[0])));
    }

    #[test]
    fn test_retain() {
        let store = store();
        for id in ["a", "b", "c"] {
            store.get_or_create(id.to_string());
        }
        store.retain(|id| id != "b");
        let mut ids = store.ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }
}
