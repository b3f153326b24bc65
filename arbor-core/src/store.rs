//! String-keyed typed storage.
//!
//! A [`Store`] maps names to values of any `Send + Sync` type. It backs
//! three things:
//!
//! - the per-request store on [`Context`](crate::Context) that middleware
//!   and hooks use to hand data to the handler,
//! - process-wide application state (`App::set_state` / `Context::state`),
//! - decorators, named helpers attached by plugins (`App::decorate`).
//!
//! Values are kept behind an `Arc`, so reading one out is a reference-count
//! bump. Asking for a key with the wrong type returns `None`.
//!
//! ```
//! use arbor_core::Store;
//!
//! let mut store = Store::new();
//! store.insert("user_id", 42u64);
//!
//! assert_eq!(store.get::<u64>("user_id").as_deref(), Some(&42));
//! assert!(store.get::<String>("user_id").is_none());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Store {
    map: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing whatever was stored under `key`
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.map.insert(key.into(), Arc::new(value));
    }

    /// Insert an Arc-wrapped value directly
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: Arc<T>) {
        self.map.insert(key.into(), value);
    }

    /// Get a value if it exists and has type `T`
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.map.get(key)?;
        Arc::clone(value).downcast::<T>().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Store").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    #[test]
    fn test_insert_and_get() {
        let mut store = Store::new();
        store.insert("counter", Counter(3));

        assert_eq!(store.get::<Counter>("counter").as_deref(), Some(&Counter(3)));
        assert!(store.contains("counter"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_wrong_type_is_none() {
        let mut store = Store::new();
        store.insert("n", 1u8);
        assert!(store.get::<u16>("n").is_none());
        assert!(store.get::<u8>("missing").is_none());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut store = Store::new();
        store.insert("v", "a".to_string());
        store.insert("v", "b".to_string());
        assert_eq!(store.get::<String>("v").as_deref().map(String::as_str), Some("b"));

        assert!(store.remove("v"));
        assert!(!store.remove("v"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_arc_shares_value() {
        let shared = Arc::new(Counter(9));
        let mut store = Store::new();
        store.insert_arc("c", Arc::clone(&shared));

        let fetched = store.get::<Counter>("c").unwrap();
        assert!(Arc::ptr_eq(&shared, &fetched));
    }
}
