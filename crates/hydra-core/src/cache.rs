//! Request-scoped data cache.
//!
//! Entries are keyed by [`CacheKey`] and move from `Pending` to a terminal
//! `Success` or `Error` state exactly once per request. On the server the
//! stored values are live Rust values; on the client they are the JSON
//! restored from the document. Typed reads work the same either way.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A cache key uniquely identifying a loader result.
///
/// Its identity is the ordered list of segments; on the wire it is a JSON
/// array of strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey {
    segments: Vec<String>,
}

impl CacheKey {
    /// Create a cache key from segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the key segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(":"))
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s.split(':'))
    }
}

/// A value a loader can place in the cache.
///
/// Implemented for every `Serialize` type, so loaders return plain structs.
/// Encoding is deferred to dehydration, where a failure only drops that one
/// entry from the payload.
pub trait CachedValue: Any + Send + Sync {
    /// Encode the value as JSON.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Access the concrete value for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T> CachedValue for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A successful loader result.
#[derive(Clone)]
pub enum CacheValue {
    /// Value produced in this process.
    Live(Arc<dyn CachedValue>),
    /// Value restored from a serialized payload.
    Json(serde_json::Value),
}

impl CacheValue {
    /// Wrap a live value.
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::Live(Arc::new(value))
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Live(value) => value.as_ref().to_json(),
            Self::Json(value) => Ok(value.clone()),
        }
    }

    /// Read the value as `T`.
    ///
    /// Live values are downcast; restored values are deserialized.
    pub fn read<T>(&self) -> Result<T, CacheReadError>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        match self {
            Self::Live(value) => match value.as_ref().as_any().downcast_ref::<T>() {
                Some(v) => Ok(v.clone()),
                // A loader may store a different but compatible shape.
                None => {
                    let json = value.as_ref().to_json().map_err(CacheReadError::Decode)?;
                    serde_json::from_value(json).map_err(CacheReadError::Decode)
                }
            },
            Self::Json(value) => {
                serde_json::from_value(value.clone()).map_err(CacheReadError::Decode)
            }
        }
    }
}

impl fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(_) => f.write_str("CacheValue::Live(..)"),
            Self::Json(v) => f.debug_tuple("CacheValue::Json").field(v).finish(),
        }
    }
}

/// Error reading a typed value out of the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheReadError {
    #[error("cache value could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Pending,
    Success,
    Error,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single cache entry.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Loader started but has not settled.
    Pending,
    /// Loader resolved.
    Success {
        value: CacheValue,
        fetched_at: DateTime<Utc>,
    },
    /// Loader rejected.
    Error {
        message: String,
        fetched_at: DateTime<Utc>,
    },
}

impl CacheEntry {
    /// Get the entry status.
    pub fn status(&self) -> CacheStatus {
        match self {
            Self::Pending => CacheStatus::Pending,
            Self::Success { .. } => CacheStatus::Success,
            Self::Error { .. } => CacheStatus::Error,
        }
    }

    /// Whether the entry has settled.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// When the entry settled.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Success { fetched_at, .. } | Self::Error { fetched_at, .. } => Some(*fetched_at),
        }
    }
}

/// Request-scoped cache of loader results.
#[derive(Debug, Clone, Default)]
pub struct DataCache {
    entries: BTreeMap<CacheKey, CacheEntry>,
}

impl DataCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key is present in any state.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get an entry.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Mark a key pending if absent. Returns whether the caller now owns
    /// the fetch for this key.
    pub fn begin(&mut self, key: CacheKey) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, CacheEntry::Pending);
        true
    }

    /// Store a successful result.
    pub fn resolve(&mut self, key: CacheKey, value: CacheValue) {
        self.entries.insert(
            key,
            CacheEntry::Success {
                value,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Store a failed result.
    pub fn reject(&mut self, key: CacheKey, message: impl Into<String>) {
        self.entries.insert(
            key,
            CacheEntry::Error {
                message: message.into(),
                fetched_at: Utc::now(),
            },
        );
    }

    /// Insert an entry as-is (used when restoring from a payload).
    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Replace a value directly, e.g. after a client-side mutation.
    pub fn set_data<T>(&mut self, key: CacheKey, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.resolve(key, CacheValue::new(value));
    }

    /// Drop an entry so the next prefetch loads it again.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Read a successful entry as `T`.
    ///
    /// Returns `None` when the key is absent, pending or failed.
    pub fn data<T>(&self, key: &CacheKey) -> Option<Result<T, CacheReadError>>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        match self.entries.get(key)? {
            CacheEntry::Success { value, .. } => Some(value.read()),
            _ => None,
        }
    }

    /// Error message of a failed entry.
    pub fn error(&self, key: &CacheKey) -> Option<&str> {
        match self.entries.get(key)? {
            CacheEntry::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Keys that are still pending.
    pub fn pending_keys(&self) -> Vec<&CacheKey> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_terminal())
            .map(|(k, _)| k)
            .collect()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &CacheEntry)> {
        self.entries.iter()
    }

    /// Number of entries in any state.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the terminal entries. Pending entries are left out.
    pub fn snapshot(&self) -> DataSnapshot {
        DataSnapshot {
            entries: self
                .entries
                .iter()
                .filter(|(_, e)| e.is_terminal())
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect(),
        }
    }
}

/// Terminal-state entries captured at the end of a render.
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    entries: Vec<(CacheKey, CacheEntry)>,
}

impl DataSnapshot {
    /// Entries in key order.
    pub fn entries(&self) -> &[(CacheKey, CacheEntry)] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Agent {
        id: u32,
        name: String,
    }

    fn agent_key() -> CacheKey {
        CacheKey::new(["agent", "7"])
    }

    #[test]
    fn test_cache_key_serializes_as_array() {
        let json = serde_json::to_string(&agent_key()).unwrap();
        assert_eq!(json, r#"["agent","7"]"#);

        let back: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, agent_key());
    }

    #[test]
    fn test_cache_key_display_and_from_str() {
        assert_eq!(agent_key().to_string(), "agent:7");
        assert_eq!(CacheKey::from("agent:7"), agent_key());
    }

    #[test]
    fn test_begin_claims_key_once() {
        let mut cache = DataCache::new();
        assert!(cache.begin(agent_key()));
        assert!(!cache.begin(agent_key()));
        assert_eq!(cache.pending_keys().len(), 1);
    }

    #[test]
    fn test_live_value_downcasts() {
        let mut cache = DataCache::new();
        let agent = Agent { id: 7, name: "scout".into() };
        cache.set_data(agent_key(), agent.clone());

        let read: Agent = cache.data(&agent_key()).unwrap().unwrap();
        assert_eq!(read, agent);
    }

    #[test]
    fn test_json_value_deserializes() {
        let mut cache = DataCache::new();
        cache.insert(
            agent_key(),
            CacheEntry::Success {
                value: CacheValue::Json(serde_json::json!({"id": 7, "name": "scout"})),
                fetched_at: Utc::now(),
            },
        );

        let read: Agent = cache.data(&agent_key()).unwrap().unwrap();
        assert_eq!(read.name, "scout");
    }

    #[test]
    fn test_error_entry_has_no_data() {
        let mut cache = DataCache::new();
        cache.reject(agent_key(), "upstream 503");

        assert!(cache.data::<Agent>(&agent_key()).is_none());
        assert_eq!(cache.error(&agent_key()), Some("upstream 503"));
        assert_eq!(cache.get(&agent_key()).unwrap().status(), CacheStatus::Error);
    }

    #[test]
    fn test_snapshot_skips_pending() {
        let mut cache = DataCache::new();
        cache.begin(CacheKey::new(["slow"]));
        cache.set_data(agent_key(), Agent { id: 7, name: "scout".into() });
        cache.reject(CacheKey::new(["broken"]), "boom");

        let snapshot = cache.snapshot();
        let keys: Vec<String> = snapshot.entries().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["agent:7", "broken"]);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = DataCache::new();
        cache.set_data(agent_key(), 1u32);
        assert!(cache.invalidate(&agent_key()));
        assert!(!cache.contains(&agent_key()));
    }
}
