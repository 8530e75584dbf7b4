//! Snapshot codec for the month-bucket mapping.
//!
//! Layout: `{ "YYYY-MM": { "items": [MenuItem...], "lastUpdated": RFC3339 } }`.

use crate::model::menu::{MenuItem, MonthBucket};
use crate::model::month_key::MonthKey;
use crate::store::backend::{BackendError, BackendResult};
use crate::store::check_bucket_items;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) type Buckets = BTreeMap<MonthKey, Arc<MonthBucket>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredBucketRef<'a> {
    items: &'a [MenuItem],
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBucket {
    #[serde(default)]
    items: Vec<MenuItem>,
    last_updated: DateTime<Utc>,
}

pub(crate) fn encode(buckets: &Buckets) -> BackendResult<String> {
    let stored = buckets
        .iter()
        .map(|(key, bucket)| {
            (
                *key,
                StoredBucketRef {
                    items: bucket.items(),
                    last_updated: bucket.last_updated(),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    serde_json::to_string(&stored).map_err(|err| BackendError::Corrupt(err.to_string()))
}

/// Decodes and validates a stored payload.
///
/// Empty buckets are dropped; any other rule violation rejects the payload.
pub(crate) fn decode(payload: &str) -> BackendResult<Buckets> {
    let stored: BTreeMap<String, StoredBucket> =
        serde_json::from_str(payload).map_err(|err| BackendError::Corrupt(err.to_string()))?;

    let mut buckets = Buckets::new();
    for (key_text, bucket) in stored {
        let key = key_text
            .parse::<MonthKey>()
            .map_err(|err| BackendError::Corrupt(err.to_string()))?;
        check_bucket_items(key, &bucket.items)
            .map_err(|violation| BackendError::Corrupt(format!("bucket {key}: {violation}")))?;
        if bucket.items.is_empty() {
            continue;
        }
        buckets.insert(key, MonthBucket::new(key, bucket.items, bucket.last_updated));
    }

    Ok(buckets)
}
