use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Entry = Arc<dyn Any + Send + Sync>;

/// Keyed store for shared client objects.
///
/// Clones share the same entries. Values live until overwritten, removed or
/// until the last handle is dropped; there is no expiry.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<FxHashMap<String, Entry>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// Returns `true` if an entry was replaced.
    pub fn attach<T>(&self, key: impl Into<String>, value: T) -> bool
    where
        T: Any + Send + Sync,
    {
        self.attach_arc(key, Arc::new(value))
    }

    /// Stores an already shared value under `key`.
    pub fn attach_arc<T>(&self, key: impl Into<String>, value: Arc<T>) -> bool
    where
        T: Any + Send + Sync,
    {
        self.entries.write().insert(key.into(), value).is_some()
    }

    /// Typed lookup. `None` if the key is unknown or holds another type.
    #[must_use]
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let entry = self.entries.read().get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Drops the entry under `key`. Returns `true` if one existed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        let mut keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Registry").field("keys", &keys).finish()
    }
}
