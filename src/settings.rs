//! Persisted settings: a named scalar with load-on-boot / write-through
//! semantics, generic over the store's primitive types instead of a
//! subclass per type.

use crate::error::StoreError;
use crate::hardware::SettingsStore;

/// A value type the settings store can hold directly.
pub trait StoreValue: Clone {
    /// Reads the value stored under `key`.
    fn fetch<S: SettingsStore>(store: &mut S, key: &str) -> Result<Self, StoreError>;

    /// Writes the value under `key`.
    fn persist<S: SettingsStore>(&self, store: &mut S, key: &str) -> Result<(), StoreError>;
}

impl StoreValue for u8 {
    fn fetch<S: SettingsStore>(store: &mut S, key: &str) -> Result<Self, StoreError> {
        store.get_u8(key)
    }

    fn persist<S: SettingsStore>(&self, store: &mut S, key: &str) -> Result<(), StoreError> {
        store.put_u8(key, *self)
    }
}

impl StoreValue for bool {
    fn fetch<S: SettingsStore>(store: &mut S, key: &str) -> Result<Self, StoreError> {
        store.get_bool(key)
    }

    fn persist<S: SettingsStore>(&self, store: &mut S, key: &str) -> Result<(), StoreError> {
        store.put_bool(key, *self)
    }
}

impl<const N: usize> StoreValue for heapless::String<N> {
    fn fetch<S: SettingsStore>(store: &mut S, key: &str) -> Result<Self, StoreError> {
        let mut buf = [0u8; N];
        let len = store.get_str(key, &mut buf)?;
        let text = core::str::from_utf8(buf.get(..len).ok_or(StoreError::Read)?)
            .map_err(|_| StoreError::Read)?;
        let mut value = Self::new();
        value.push_str(text).map_err(|_| StoreError::Read)?;
        Ok(value)
    }

    fn persist<S: SettingsStore>(&self, store: &mut S, key: &str) -> Result<(), StoreError> {
        store.put_str(key, self.as_str())
    }
}

fn passthrough<T>(value: T) -> T {
    value
}

/// A single persisted setting.
///
/// `load` populates the in-memory value from the store, or seeds the store
/// with the default when the key is absent. `set` writes through immediately
/// and unconditionally; a failing store surfaces as [`StoreError`] rather
/// than being swallowed.
#[derive(Debug)]
pub struct Setting<T: StoreValue> {
    key: &'static str,
    value: T,
    sanitize: fn(T) -> T,
}

impl<T: StoreValue> Setting<T> {
    /// A setting that accepts any stored value.
    pub fn new(key: &'static str, default: T) -> Self {
        Self {
            key,
            value: default,
            sanitize: passthrough,
        }
    }

    /// A setting that runs every loaded value through `sanitize` before use,
    /// so out-of-range persisted values never reach the schedulers.
    pub fn sanitized(key: &'static str, default: T, sanitize: fn(T) -> T) -> Self {
        Self {
            key,
            value: default,
            sanitize,
        }
    }

    /// The store key.
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Populates the value from the store, seeding the store with the
    /// current default when the key does not exist yet.
    pub fn load<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        if store.contains(self.key)? {
            self.value = (self.sanitize)(T::fetch(store, self.key)?);
        } else {
            debug!("seeding setting {}", self.key);
            self.value.persist(store, self.key)?;
        }
        Ok(())
    }

    /// The current in-memory value.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        self.value
    }

    /// Borrow of the current in-memory value.
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Replaces the value and writes it through to the store.
    pub fn set<S: SettingsStore>(&mut self, store: &mut S, value: T) -> Result<(), StoreError> {
        self.value = value;
        self.value.persist(store, self.key)
    }
}
