//! Data cache dehydration and restoration.
//!
//! Wire format of the data payload:
//!
//! ```json
//! {"queries":[
//!   {"queryKey":["agent","7"],"status":"success","data":{...},"fetchedAt":"2026-01-01T00:00:00Z"},
//!   {"queryKey":["nav"],"status":"error","error":"nav service unavailable","fetchedAt":"..."}
//! ]}
//! ```

use chrono::{DateTime, Utc};
use hydra_core::{CacheEntry, CacheKey, CacheValue, DataCache, DataSnapshot};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::escape::escape_script_json;
use crate::SnapshotError;

/// Dehydrated data cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DehydratedState {
    pub queries: Vec<DehydratedQuery>,
}

/// One dehydrated cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedQuery {
    #[serde(rename = "queryKey")]
    pub query_key: CacheKey,
    #[serde(flatten)]
    pub state: QueryState,
}

/// Terminal state of a dehydrated entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryState {
    Success {
        data: serde_json::Value,
        #[serde(rename = "fetchedAt")]
        fetched_at: DateTime<Utc>,
    },
    Error {
        error: String,
        #[serde(rename = "fetchedAt")]
        fetched_at: DateTime<Utc>,
    },
}

/// Encoded data payload.
#[derive(Debug, Clone)]
pub struct SerializedData {
    /// Script-safe JSON.
    pub json: String,
    /// Entries left out because their value could not be encoded.
    pub omitted: Vec<(CacheKey, String)>,
}

/// Dehydrate a snapshot into script-safe JSON.
///
/// Only terminal entries exist in a snapshot, so pending loads never reach
/// the payload. An entry whose value fails to encode is omitted and
/// reported; the rest of the payload is unaffected.
pub fn serialize(snapshot: &DataSnapshot) -> Result<SerializedData, SnapshotError> {
    let mut state = DehydratedState::default();
    let mut omitted = Vec::new();

    for (key, entry) in snapshot.entries() {
        let query_state = match entry {
            CacheEntry::Success { value, fetched_at } => match value.to_json() {
                Ok(data) => QueryState::Success {
                    data,
                    fetched_at: *fetched_at,
                },
                Err(e) => {
                    warn!(cache_key = %key, error = %e, "Omitting cache entry from snapshot");
                    omitted.push((key.clone(), e.to_string()));
                    continue;
                }
            },
            CacheEntry::Error { message, fetched_at } => QueryState::Error {
                error: message.clone(),
                fetched_at: *fetched_at,
            },
            CacheEntry::Pending => continue,
        };
        state.queries.push(DehydratedQuery {
            query_key: key.clone(),
            state: query_state,
        });
    }

    let json = serde_json::to_string(&state).map_err(SnapshotError::Encode)?;
    Ok(SerializedData {
        json: escape_script_json(&json),
        omitted,
    })
}

/// Dehydrate a live cache. Pending entries are treated as absent.
pub fn serialize_cache(cache: &DataCache) -> Result<SerializedData, SnapshotError> {
    serialize(&cache.snapshot())
}

/// Restore a data cache from its payload.
///
/// Restored values are JSON; typed reads deserialize them on demand.
pub fn deserialize(json: &str) -> Result<DataCache, SnapshotError> {
    let state: DehydratedState = serde_json::from_str(json).map_err(SnapshotError::Decode)?;
    let mut cache = DataCache::new();

    for query in state.queries {
        let entry = match query.state {
            QueryState::Success { data, fetched_at } => CacheEntry::Success {
                value: CacheValue::Json(data),
                fetched_at,
            },
            QueryState::Error { error, fetched_at } => CacheEntry::Error {
                message: error,
                fetched_at,
            },
        };
        cache.insert(query.query_key, entry);
    }

    Ok(cache)
}
