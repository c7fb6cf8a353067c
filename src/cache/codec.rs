//! Value Codec and Cacheability Gate
//!
//! Capability traits injected into a store at construction: how values map
//! to the stored text, and which values may be stored at all.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Encoder ==
/// Converts values to and from the text stored in the `val` column.
pub trait Encoder<V>: Send + Sync {
    /// Encodes a value for storage.
    fn encode(&self, value: &V) -> Result<String>;

    /// Decodes a stored value.
    fn decode(&self, raw: &str) -> Result<V>;
}

/// Default encoder storing values as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl<V> Encoder<V> for JsonEncoder
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, raw: &str) -> Result<V> {
        Ok(serde_json::from_str(raw)?)
    }
}

// == Cacheability Predicate ==
/// Decides whether a value is eligible to be stored.
pub trait CacheabilityPredicate<V>: Send + Sync {
    fn accepts(&self, value: &V) -> bool;
}

impl<V, F> CacheabilityPredicate<V> for F
where
    F: Fn(&V) -> bool + Send + Sync,
{
    fn accepts(&self, value: &V) -> bool {
        self(value)
    }
}

/// Default predicate: rejects values whose JSON form is `null`
/// (`None`, `()`, `Value::Null`).
///
/// Non-finite floats also serialize to `null` in serde_json, so a NaN or
/// infinite value is rejected as well. Install a custom gate to store them
/// with an encoder that can represent them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNull;

impl<V: Serialize> CacheabilityPredicate<V> for NotNull {
    fn accepts(&self, value: &V) -> bool {
        !matches!(serde_json::to_value(value), Ok(Value::Null))
    }
}

/// Runs the gate and builds the `NotCacheable` error on rejection.
pub(crate) fn check_cacheable<V: Serialize>(
    gate: &dyn CacheabilityPredicate<V>,
    value: &V,
) -> Result<()> {
    if gate.accepts(value) {
        Ok(())
    } else {
        Err(CacheError::NotCacheable(describe(value)))
    }
}

/// Stable textual form of a value for diagnostics.
fn describe<V: Serialize>(value: &V) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unrepresentable>".to_string())
}
