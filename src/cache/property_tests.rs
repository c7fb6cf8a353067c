//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store behavior against a simple in-memory model.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::StoreConfig;
use crate::error::CacheError;

// == Test Helpers ==
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

async fn open_store() -> CacheStore<Value> {
    CacheStore::open(StoreConfig::in_memory("prop")).await.unwrap()
}

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,32}".prop_map(|s| s)
}

/// Generates cacheable JSON values (never null)
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[ -~]{0,64}".prop_map(Value::from),
        prop::collection::vec(any::<i32>(), 0..8).prop_map(|v| json!(v)),
        ("[a-z]{1,8}", any::<u32>()).prop_map(|(k, v)| {
            let mut object = serde_json::Map::new();
            object.insert(k, Value::from(v));
            Value::Object(object)
        }),
    ]
}

/// A sequence of cache operations for model testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    MDelete { keys: Vec<String> },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
        prop::collection::vec(key_strategy(), 0..4).prop_map(|keys| CacheOp::MDelete { keys }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // For any value V, set(k, V) followed by get(k) before expiry yields V.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let retrieved = block_on(async {
            let store = open_store().await;
            store.set(&key, &value, None).await.unwrap();
            store.get(&key).await.unwrap()
        });
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // After del(k), get(k) is absent and ttl(k) reports a missing key.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let (value_after, ttl_after) = block_on(async {
            let store = open_store().await;
            store.set(&key, &value, None).await.unwrap();
            store.del(&key).await.unwrap();
            (store.get(&key).await.unwrap(), store.ttl(&key).await.unwrap())
        });
        prop_assert_eq!(value_after, None);
        prop_assert_eq!(ttl_after, crate::cache::TTL_MISSING);
    }

    // Writing V1 then V2 to the same key leaves exactly one row holding V2.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let (retrieved, rows) = block_on(async {
            let store = open_store().await;
            store.set(&key, &value1, Some(Duration::from_secs(60))).await.unwrap();
            store.set(&key, &value2, None).await.unwrap();
            (store.get(&key).await.unwrap(), store.len().await.unwrap())
        });
        prop_assert_eq!(retrieved, Some(value2), "Overwrite should return new value");
        prop_assert_eq!(rows, 1, "Should have exactly one row after overwrite");
    }

    // mget over N keys returns N slots in input order, None for unknown keys.
    #[test]
    fn prop_mget_length_and_order(
        stored in prop::collection::hash_map(key_strategy(), value_strategy(), 0..10),
        queried in prop::collection::vec(key_strategy(), 0..16)
    ) {
        let results = block_on(async {
            let store = open_store().await;
            let entries: Vec<(String, Value)> = stored.clone().into_iter().collect();
            store.mset(&entries, None).await.unwrap();
            store.mget(&queried).await.unwrap()
        });

        prop_assert_eq!(results.len(), queried.len());
        for (key, result) in queried.iter().zip(results) {
            prop_assert_eq!(result.as_ref(), stored.get(key), "Slot for '{}' mismatched", key);
        }
    }

    // A batch containing a non-cacheable value persists nothing.
    #[test]
    fn prop_mset_all_or_nothing(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 0..10),
        bad_index in 0usize..10
    ) {
        let mut batch = entries.clone();
        let bad_index = bad_index.min(batch.len());
        batch.insert(bad_index, ("rejected".to_string(), Value::Null));

        let (result, rows) = block_on(async {
            let store = open_store().await;
            let result = store.mset(&batch, None).await;
            (result, store.len().await.unwrap())
        });

        prop_assert!(matches!(result, Err(CacheError::NotCacheable(_))));
        prop_assert_eq!(rows, 0, "No entry of a rejected batch may be persisted");
    }

    // For any sequence of operations, reads agree with a HashMap model.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        let mismatches = block_on(async {
            let store = open_store().await;
            let mut model: HashMap<String, Value> = HashMap::new();
            let mut mismatches = Vec::new();

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        store.set(&key, &value, None).await.unwrap();
                        model.insert(key, value);
                    }
                    CacheOp::Get { key } => {
                        let actual = store.get(&key).await.unwrap();
                        if actual.as_ref() != model.get(&key) {
                            mismatches.push(key);
                        }
                    }
                    CacheOp::Delete { key } => {
                        store.del(&key).await.unwrap();
                        model.remove(&key);
                    }
                    CacheOp::MDelete { keys } => {
                        store.mdel(&keys).await.unwrap();
                        for key in &keys {
                            model.remove(key);
                        }
                    }
                }
            }

            let stored: HashSet<String> = store.keys(None).await.unwrap().into_iter().collect();
            let expected: HashSet<String> = model.keys().cloned().collect();
            if stored != expected {
                mismatches.push("<key set>".to_string());
            }
            mismatches
        });

        prop_assert!(mismatches.is_empty(), "Store diverged from model at {:?}", mismatches);
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry with a TTL is live before it elapses and absent after,
    // without any purge having run.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let (before, after, raw_after) = block_on(async {
            let store = open_store().await;
            store.set(&key, &value, Some(Duration::from_millis(20))).await.unwrap();
            let before = store.get(&key).await.unwrap();

            tokio::time::sleep(Duration::from_millis(30)).await;

            let after = store.get(&key).await.unwrap();
            let raw_after = store.get_raw(&key).await.unwrap();
            (before, after, raw_after)
        });

        prop_assert_eq!(before, Some(value.clone()), "Entry should be live before TTL expires");
        prop_assert_eq!(after, None, "Entry should be absent after TTL expires");
        prop_assert_eq!(raw_after, Some(value), "Row should remain until purged");
    }
}
