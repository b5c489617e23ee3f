//! Storage port
//!
//! Everything Cosmos persists is a JSON document under a string key. Writers
//! go through [`update_json`], which re-reads and retries when another
//! writer got there first, so concurrent updates are never lost silently.

mod memory;
mod profile;
mod workspace;

pub use memory::MemoryStore;
pub use profile::{ProfileStore, UserProfile};
pub use workspace::Workspace;

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Attempts [`update_json`] makes before giving up with `Error::Conflict`
pub const MAX_UPDATE_ATTEMPTS: usize = 8;

/// A stored value and its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    /// Starts at 1 and increases with every write
    pub version: u64,
}

/// A string key-value store with optimistic concurrency
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// Write a value unconditionally, returning the new version
    async fn set(&self, key: &str, value: &str) -> Result<u64>;

    /// Write only if the stored version is `expected` (`None` meaning the key
    /// is absent). Returns whether the write happened.
    async fn compare_and_set(&self, key: &str, expected: Option<u64>, value: &str) -> Result<bool>;

    /// Remove a value; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Keys of everything Cosmos stores
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// The local user profile
    Profile,
    /// A user's missions
    Missions(String),
    /// A user's selected mission id
    ActiveMission(String),
    /// The shared community aggregate
    Community,
    /// A user's preferred roster
    Roster(String),
    /// A user's saved squad presets
    Presets(String),
}

impl StorageKey {
    /// The raw key string
    pub fn as_key(&self) -> String {
        match self {
            StorageKey::Profile => "cosmos_mock_user".to_string(),
            StorageKey::Missions(user) => format!("missions_{}", user),
            StorageKey::ActiveMission(user) => format!("activeMissionId_{}", user),
            StorageKey::Community => "cosmos_community_db".to_string(),
            StorageKey::Roster(user) => format!("squad_{}", user),
            StorageKey::Presets(user) => format!("presets_{}", user),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

fn decode<T: DeserializeOwned>(key: &StorageKey, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding corrupted stored value");
            None
        }
    }
}

/// Read a JSON value, or `init()` when it is absent or corrupted
pub async fn load_json_or<T, F>(store: &dyn KeyValueStore, key: &StorageKey, init: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let stored = store.get(&key.as_key()).await?;
    Ok(stored
        .and_then(|v| decode(key, &v.value))
        .unwrap_or_else(init))
}

/// Read a JSON value, or `T::default()` when it is absent or corrupted
pub async fn load_json<T>(store: &dyn KeyValueStore, key: &StorageKey) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    load_json_or(store, key, T::default).await
}

/// Read a JSON value, writing `init()` first if nothing valid is stored
pub async fn load_json_or_init<T, F>(store: &dyn KeyValueStore, key: &StorageKey, init: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Fn() -> T,
{
    if let Some(stored) = store.get(&key.as_key()).await? {
        if let Some(value) = decode(key, &stored.value) {
            return Ok(value);
        }
    }

    let (value, ()) = update_json_or(store, key, init, |_| Ok(())).await?;
    Ok(value)
}

/// Write a JSON value unconditionally
pub async fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &StorageKey, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(&key.as_key(), &raw).await?;
    Ok(())
}

/// Read-modify-write a JSON value under a version check
///
/// `apply` may run several times when other writers interfere, so it must
/// not have side effects outside the value. If it returns an error nothing
/// is written. Absent or corrupted values start from `T::default()`.
pub async fn update_json<T, R, F>(store: &dyn KeyValueStore, key: &StorageKey, apply: F) -> Result<R>
where
    T: Serialize + DeserializeOwned + Default,
    F: FnMut(&mut T) -> Result<R>,
{
    update_json_or(store, key, T::default, apply)
        .await
        .map(|(_, result)| result)
}

/// [`update_json`] with an explicit initial value, also returning the
/// value as written
pub async fn update_json_or<T, R, I, F>(
    store: &dyn KeyValueStore,
    key: &StorageKey,
    init: I,
    mut apply: F,
) -> Result<(T, R)>
where
    T: Serialize + DeserializeOwned,
    I: Fn() -> T,
    F: FnMut(&mut T) -> Result<R>,
{
    let raw_key = key.as_key();

    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let stored = store.get(&raw_key).await?;
        let expected = stored.as_ref().map(|v| v.version);
        let mut value = stored
            .and_then(|v| decode(key, &v.value))
            .unwrap_or_else(&init);

        let result = apply(&mut value)?;
        let raw = serde_json::to_string(&value)?;

        if store.compare_and_set(&raw_key, expected, &raw).await? {
            return Ok((value, result));
        }
        debug!(key = %key, attempt, "Concurrent write detected, retrying");
    }

    warn!(key = %key, attempts = MAX_UPDATE_ATTEMPTS, "Gave up updating stored value");
    Err(Error::Conflict(raw_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_key_layout() {
        assert_eq!(StorageKey::Profile.as_key(), "cosmos_mock_user");
        assert_eq!(StorageKey::Missions("user-1".into()).as_key(), "missions_user-1");
        assert_eq!(
            StorageKey::ActiveMission("user-1".into()).as_key(),
            "activeMissionId_user-1"
        );
        assert_eq!(StorageKey::Community.to_string(), "cosmos_community_db");
        assert_eq!(StorageKey::Roster("u".into()).as_key(), "squad_u");
        assert_eq!(StorageKey::Presets("u".into()).as_key(), "presets_u");
    }

    #[tokio::test]
    async fn test_corrupted_value_falls_back_to_default() {
        let store = MemoryStore::new();
        let key = StorageKey::Missions("u".into());
        store.set(&key.as_key(), "{not json").await.unwrap();

        let missions: Vec<String> = load_json(&store, &key).await.unwrap();
        assert!(missions.is_empty());

        // and the next update replaces it
        update_json(&store, &key, |v: &mut Vec<String>| {
            v.push("a".to_string());
            Ok(())
        })
        .await
        .unwrap();
        let missions: Vec<String> = load_json(&store, &key).await.unwrap();
        assert_eq!(missions, vec!["a"]);
    }

    #[tokio::test]
    async fn test_failed_apply_writes_nothing() {
        let store = MemoryStore::new();
        let key = StorageKey::Community;
        save_json(&store, &key, &vec![1, 2]).await.unwrap();

        let err = update_json(&store, &key, |v: &mut Vec<i32>| -> Result<()> {
            v.clear();
            Err(Error::NotFound("post-9".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let stored: Vec<i32> = load_json(&store, &key).await.unwrap();
        assert_eq!(stored, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let key = StorageKey::Community;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                update_json(store.as_ref(), &key, |n: &mut u64| {
                    *n += 1;
                    Ok(())
                })
                .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let total: u64 = load_json(store.as_ref(), &key).await.unwrap();
        assert_eq!(total, 4);
    }

    /// Store whose conditional writes always lose the race
    struct ContendedStore {
        inner: MemoryStore,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for ContendedStore {
        async fn get(&self, key: &str) -> Result<Option<Versioned>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<u64> {
            self.inner.set(key, value).await
        }

        async fn compare_and_set(&self, _key: &str, _expected: Option<u64>, _value: &str) -> Result<bool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_update_gives_up_with_conflict() {
        let store = ContendedStore {
            inner: MemoryStore::new(),
            attempts: AtomicUsize::new(0),
        };
        let err = update_json(&store, &StorageKey::Community, |n: &mut u64| {
            *n += 1;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.attempts.load(Ordering::SeqCst), MAX_UPDATE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_load_or_init_persists_seed() {
        let store = MemoryStore::new();
        let key = StorageKey::Community;
        let seeded: Vec<u8> = load_json_or_init(&store, &key, || vec![7]).await.unwrap();
        assert_eq!(seeded, vec![7]);

        let again: Vec<u8> = load_json_or_init(&store, &key, || vec![9]).await.unwrap();
        assert_eq!(again, vec![7]);
    }
}
