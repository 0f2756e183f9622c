//! Hydrators and dehydrators: the in-memory value of a field to and from the
//! string kept in storage.

use serde::{de::DeserializeOwned, Serialize};

use super::EntityField;
use crate::json::{parse_json_safe, stringify_json_safe};
use crate::store::EntityStore;

/// Plain value: `undefined` hydrates to the default.
pub fn hydrate_value<T: DeserializeOwned>(
    text: &str,
    default: impl FnOnce() -> T,
) -> serde_json::Result<T> {
    Ok(parse_json_safe(text)?.unwrap_or_else(default))
}

pub fn dehydrate_value<T: Serialize>(value: &T) -> serde_json::Result<String> {
    stringify_json_safe(Some(value))
}

/// Optional value: `undefined` and `null` both hydrate to `None`.
pub fn hydrate_optional<T: DeserializeOwned>(text: &str) -> serde_json::Result<Option<T>> {
    Ok(parse_json_safe::<Option<T>>(text)?.flatten())
}

/// Optional value: `None` is written as the `undefined` sentinel.
pub fn dehydrate_optional<T: Serialize>(value: &Option<T>) -> serde_json::Result<String> {
    stringify_json_safe(value.as_ref())
}

/// Entity collection: a JSON array of records, sorted into canonical order
/// and indexed.
pub fn hydrate_entities<F: EntityField>(text: &str) -> serde_json::Result<EntityStore<F::Record>> {
    let records = parse_json_safe::<Vec<F::Record>>(text)?.unwrap_or_default();
    Ok(F::build_store(records))
}

/// Entity collection: only the list is written; the index is derived.
pub fn dehydrate_entities<F: EntityField>(store: &EntityStore<F::Record>) -> serde_json::Result<String> {
    stringify_json_safe(Some(store.as_slice()))
}
