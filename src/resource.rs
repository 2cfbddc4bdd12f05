//! Named resources shared between the tasks of a sequence.
//!
//! A [`ResourceStore`] maps a string key to a value of any type. Producer
//! tasks `set` a value (a freshly created environment, a registry value) and
//! later tasks read it, usually through a [`Resource`] handle captured at
//! construction time and resolved only when the consumer executes.
//!
//! The store is an explicitly passed handle rather than a process global:
//! every [`TaskContext`](crate::task::TaskContext) owns one, and clones of it
//! share the same underlying map.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{InstallKitError, Result};

type Slot = Box<dyn Any + Send + Sync>;

/// Keyed store of type-erased values.
#[derive(Clone, Default)]
pub struct ResourceStore {
    inner: Arc<RwLock<HashMap<String, Slot>>>,
}

impl ResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        debug!(key = %key, value_type = type_name::<T>(), "resource set");
        self.write().insert(key, Box::new(value));
        Ok(())
    }

    /// Return a clone of the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if nothing was ever stored under `key`
    /// - `ResourceTypeMismatch` if the stored value is not a `T`
    pub fn get<T: Any + Clone>(&self, key: &str) -> Result<T> {
        let map = self.read();
        let slot = map
            .get(key)
            .ok_or_else(|| InstallKitError::resource_not_found(key))?;
        slot.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| InstallKitError::ResourceTypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Mutate the value stored under `key` in place.
    pub fn update<T: Any, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut map = self.write();
        let slot = map
            .get_mut(key)
            .ok_or_else(|| InstallKitError::resource_not_found(key))?;
        let value = slot
            .downcast_mut::<T>()
            .ok_or_else(|| InstallKitError::ResourceTypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })?;
        debug!(key = %key, "resource updated in place");
        Ok(f(value))
    }

    /// Returns true if a value was stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// All keys currently set, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a late-bound handle to the resource named `key`.
    pub fn resource<T>(&self, key: impl Into<String>) -> Resource<T> {
        Resource {
            key: key.into(),
            store: self.clone(),
            _marker: PhantomData,
        }
    }

    // A panic inside an `update` closure poisons the lock but leaves the map
    // itself intact, so every accessor recovers the guard.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStore")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Handle bound to one key of a [`ResourceStore`].
///
/// Reading through the handle always observes the value current at the time
/// of the read, not at the time the handle was created.
pub struct Resource<T> {
    key: String,
    store: ResourceStore,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Resource<T> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T: Any + Clone> Resource<T> {
    /// Read the current value.
    pub fn get(&self) -> Result<T> {
        self.store.get(&self.key)
    }
}

impl<T: Any + Send + Sync> Resource<T> {
    /// Replace the current value.
    pub fn set(&self, value: T) -> Result<()> {
        self.store.set(self.key.clone(), value)
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource(`{}`)", self.key)
    }
}
