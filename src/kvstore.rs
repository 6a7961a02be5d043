//! The external key-value store boundary. String-keyed, JSON-valued,
//! accessed only from the router worker in the core's own call paths (see
//! `spec.md` §5).

use std::time::Duration;

use crate::error::KvStoreError;

pub trait KvStore: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool, KvStoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, KvStoreError>;
    /// `ttl == Duration::ZERO` means no expiry.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvStoreError>;
    fn del(&self, key: &str) -> Result<(), KvStoreError>;
}

/// Read a JSON record from `store`, falling back to `T::default()` when the
/// key does not exist. Matches the "existing record missing ⇒ zero value"
/// semantic from `spec.md` §9.
pub fn get_or_default<T>(store: &dyn KvStore, key: &str) -> Result<T, KvStoreError>
where
    T: Default + serde::de::DeserializeOwned,
{
    match store.get(key)? {
        None => Ok(T::default()),
        Some(json) => serde_json::from_str(&json).map_err(|source| KvStoreError::Malformed {
            key: key.to_owned(),
            source,
        }),
    }
}

/// Serialize `value` and write it back under `key` with no expiry.
pub fn put<T>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), KvStoreError>
where
    T: serde::Serialize,
{
    let json = serde_json::to_string(value).map_err(|source| KvStoreError::Malformed {
        key: key.to_owned(),
        source,
    })?;
    store.set(key, &json, Duration::ZERO)
}
