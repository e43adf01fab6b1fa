//! Favorites and shopping list, persisted through a [`KeyValueStorage`].
//!
//! Every mutation writes the new state through to storage and then notifies
//! subscribers with a snapshot of it. A blob that is missing or fails to parse
//! reads as an empty collection.

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::models::ShoppingListItem;
use crate::storage::{FAVORITES_KEY, KeyValueStorage, SHOPPING_LIST_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn Fn(&T) + Send>;

struct Subscribers<T> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

impl<T> Subscribers<T> {
    fn add(&mut self, callback: Callback<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    fn notify(&self, snapshot: &T) {
        for (_, callback) in &self.callbacks {
            callback(snapshot);
        }
    }
}

fn read_blob<T: DeserializeOwned + Default>(storage: &dyn KeyValueStorage, key: &str) -> T {
    match storage.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "unreadable stored value, treating as empty");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "failed to read stored value, treating as empty");
            T::default()
        }
    }
}

fn write_blob<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw)
}

// --- Favorites ---

pub struct FavoritesStore<S: KeyValueStorage> {
    storage: S,
    subscribers: Subscribers<Vec<i64>>,
}

impl<S: KeyValueStorage> FavoritesStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            subscribers: Subscribers::default(),
        }
    }

    /// Favorite recipe ids in insertion order.
    pub fn list(&self) -> Vec<i64> {
        read_blob(&self.storage, FAVORITES_KEY)
    }

    pub fn contains(&self, recipe_id: i64) -> bool {
        self.list().contains(&recipe_id)
    }

    /// Adding an id already present changes nothing and notifies nobody.
    pub fn add(&mut self, recipe_id: i64) -> Result<()> {
        let mut ids = self.list();
        if ids.contains(&recipe_id) {
            return Ok(());
        }
        ids.push(recipe_id);
        self.commit(&ids)
    }

    pub fn remove(&mut self, recipe_id: i64) -> Result<()> {
        let mut ids = self.list();
        ids.retain(|id| *id != recipe_id);
        self.commit(&ids)
    }

    /// Returns the new membership.
    pub fn toggle(&mut self, recipe_id: i64) -> Result<bool> {
        if self.contains(recipe_id) {
            self.remove(recipe_id)?;
            Ok(false)
        } else {
            self.add(recipe_id)?;
            Ok(true)
        }
    }

    pub fn subscribe(&mut self, callback: impl Fn(&Vec<i64>) + Send + 'static) -> SubscriptionId {
        self.subscribers.add(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    #[allow(clippy::ptr_arg)]
    fn commit(&self, ids: &Vec<i64>) -> Result<()> {
        write_blob(&self.storage, FAVORITES_KEY, ids)?;
        self.subscribers.notify(ids);
        Ok(())
    }
}

// --- Shopping list ---

pub struct ShoppingListStore<S: KeyValueStorage> {
    storage: S,
    subscribers: Subscribers<Vec<ShoppingListItem>>,
}

impl<S: KeyValueStorage> ShoppingListStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            subscribers: Subscribers::default(),
        }
    }

    pub fn items(&self) -> Vec<ShoppingListItem> {
        read_blob(&self.storage, SHOPPING_LIST_KEY)
    }

    /// Append `names`, skipping blanks and names already on the list
    /// (case-insensitive). Returns the number of items added.
    pub fn add_items<I, N>(
        &mut self,
        names: I,
        recipe_id: Option<i64>,
        recipe_title: Option<&str>,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut items = self.items();
        let mut existing: Vec<String> = items.iter().map(|i| i.name.trim().to_lowercase()).collect();
        let mut added = 0;

        for name in names {
            let name = name.as_ref().trim();
            let key = name.to_lowercase();
            if key.is_empty() || existing.contains(&key) {
                continue;
            }
            items.push(ShoppingListItem {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                checked: false,
                recipe_id,
                recipe_title: recipe_title.map(ToString::to_string),
            });
            existing.push(key);
            added += 1;
        }

        if added > 0 {
            self.commit(&items)?;
        }
        Ok(added)
    }

    /// Flip the checked flag. Returns the new state, or `None` for an unknown id.
    pub fn toggle(&mut self, item_id: &str) -> Result<Option<bool>> {
        let mut items = self.items();
        let Some(item) = items.iter_mut().find(|i| i.id == item_id) else {
            return Ok(None);
        };
        item.checked = !item.checked;
        let checked = item.checked;
        self.commit(&items)?;
        Ok(Some(checked))
    }

    pub fn remove(&mut self, item_id: &str) -> Result<bool> {
        let mut items = self.items();
        let before = items.len();
        items.retain(|i| i.id != item_id);
        let removed = items.len() != before;
        self.commit(&items)?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(SHOPPING_LIST_KEY)?;
        self.subscribers.notify(&Vec::new());
        Ok(())
    }

    pub fn unchecked_count(&self) -> usize {
        self.items().iter().filter(|i| !i.checked).count()
    }

    pub fn subscribe(
        &mut self,
        callback: impl Fn(&Vec<ShoppingListItem>) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribers.add(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    #[allow(clippy::ptr_arg)]
    fn commit(&self, items: &Vec<ShoppingListItem>) -> Result<()> {
        write_blob(&self.storage, SHOPPING_LIST_KEY, items)?;
        self.subscribers.notify(items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    #[test]
    fn test_favorites_add_is_idempotent() {
        let mut favs = FavoritesStore::new(MemoryStorage::new());
        favs.add(3).unwrap();
        favs.add(3).unwrap();
        favs.add(1).unwrap();
        assert_eq!(favs.list(), vec![3, 1]);
    }

    #[test]
    fn test_favorites_toggle() {
        let mut favs = FavoritesStore::new(MemoryStorage::new());
        assert!(favs.toggle(7).unwrap());
        assert!(favs.contains(7));
        assert!(!favs.toggle(7).unwrap());
        assert!(!favs.contains(7));
    }

    #[test]
    fn test_favorites_notify_with_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut favs = FavoritesStore::new(MemoryStorage::new());
        let sink = Arc::clone(&seen);
        let sub = favs.subscribe(move |ids| sink.lock().unwrap().push(ids.clone()));

        favs.add(1).unwrap();
        favs.add(2).unwrap();
        favs.remove(1).unwrap();
        assert!(favs.unsubscribe(sub));
        favs.add(9).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![vec![1], vec![1, 2], vec![2]]);
    }

    #[test]
    fn test_unreadable_blob_reads_empty() {
        let storage = MemoryStorage::new();
        storage.set(FAVORITES_KEY, "not json").unwrap();
        storage.set(SHOPPING_LIST_KEY, "{\"oops\": true}").unwrap();
        let favs = FavoritesStore::new(storage.clone());
        let list = ShoppingListStore::new(storage);
        assert!(favs.list().is_empty());
        assert!(list.items().is_empty());
    }

    #[test]
    fn test_stores_share_storage_without_clashing() {
        let storage = MemoryStorage::new();
        let mut favs = FavoritesStore::new(storage.clone());
        let mut list = ShoppingListStore::new(storage);
        favs.add(4).unwrap();
        list.add_items(["sel"], None, None).unwrap();
        assert_eq!(favs.list(), vec![4]);
        assert_eq!(list.items().len(), 1);
    }

    #[test]
    fn test_shopping_add_skips_blank_and_duplicates() {
        let mut list = ShoppingListStore::new(MemoryStorage::new());
        let added = list
            .add_items(["Farine", "  ", "oeufs", "farine"], Some(12), Some("Crêpes"))
            .unwrap();
        assert_eq!(added, 2);

        let added = list.add_items(["OEUFS", "lait"], None, None).unwrap();
        assert_eq!(added, 1);

        let items = list.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].recipe_id, Some(12));
        assert_eq!(items[0].recipe_title.as_deref(), Some("Crêpes"));
        assert!(items[2].recipe_id.is_none());
        assert_ne!(items[0].id, items[1].id);
    }

    #[test]
    fn test_shopping_toggle_remove_count() {
        let mut list = ShoppingListStore::new(MemoryStorage::new());
        list.add_items(["sel", "poivre", "beurre"], None, None).unwrap();
        let items = list.items();

        assert_eq!(list.toggle(&items[0].id).unwrap(), Some(true));
        assert_eq!(list.unchecked_count(), 2);
        assert_eq!(list.toggle("missing").unwrap(), None);

        assert!(list.remove(&items[1].id).unwrap());
        assert!(!list.remove(&items[1].id).unwrap());
        assert_eq!(list.unchecked_count(), 1);
    }

    #[test]
    fn test_shopping_clear_notifies_empty() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut list = ShoppingListStore::new(MemoryStorage::new());
        list.add_items(["sel"], None, None).unwrap();
        let sink = Arc::clone(&seen);
        list.subscribe(move |items| sink.lock().unwrap().push(items.len()));

        list.clear().unwrap();
        assert!(list.items().is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_shopping_list_persists_in_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut list = ShoppingListStore::new(FileStorage::new(dir.path()).unwrap());
            list.add_items(["tomates"], Some(1), Some("Salade")).unwrap();
        }
        let list = ShoppingListStore::new(FileStorage::new(dir.path()).unwrap());
        let items = list.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "tomates");
    }
}
