//! Declarative cache schema.
//!
//! Every persisted slot is a zero-sized marker type implementing [`Field`]:
//! its storage key, kind, default, and (de)serialization. Entity fields also
//! implement [`EntityField`], which adds the remote endpoint and the sort
//! order. [`visit_all`] in `fields` is the single list of every field;
//! hydration, reset and introspection all walk it.

pub mod codec;
pub mod fields;
pub mod sort;

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::store::{EntityStore, Record};

pub use fields::visit_all;
pub use sort::{compare_keys, sort_records, SortDirection, SortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Bookkeeping owned by the cache itself
    Internal,
    /// User state and settings
    Value,
    /// Collection synchronized from the remote API
    Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    /// Name of the record field the collection is ordered by
    pub by: &'static str,
    pub direction: SortDirection,
}

/// Introspection row for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

pub trait Field: Send + Sync + 'static {
    type Value: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Storage key
    const NAME: &'static str;
    const KIND: FieldKind;
    const SORT: Option<SortSpec> = None;

    fn default_value() -> Self::Value;

    fn hydrate(text: &str) -> serde_json::Result<Self::Value>;

    fn dehydrate(value: &Self::Value) -> serde_json::Result<String>;

    /// Bring a value into canonical form before it is stored
    fn normalize(value: Self::Value) -> Self::Value {
        value
    }

    fn spec() -> FieldSpec {
        FieldSpec {
            name: Self::NAME,
            kind: Self::KIND,
            sort: Self::SORT,
        }
    }
}

pub trait EntityField: Field {
    type Record: Record + Serialize + DeserializeOwned + PartialEq + Debug;

    /// Path of the collection below the API base URL
    const ENDPOINT: &'static str;
    /// Whether fetching requires a bearer token
    const AUTHENTICATED: bool;
    const DIRECTION: SortDirection;

    fn sort_key(record: &Self::Record) -> SortKey<'_>;

    fn into_value(store: EntityStore<Self::Record>) -> Self::Value;

    fn as_store(value: &Self::Value) -> &EntityStore<Self::Record>;

    /// Sort `records` into canonical order and index them.
    fn build_store(mut records: Vec<Self::Record>) -> EntityStore<Self::Record> {
        sort_records(&mut records, Self::sort_key, Self::DIRECTION);
        EntityStore::from_records(records)
    }
}

/// Callback invoked once per schema field by [`visit_all`].
pub trait FieldVisitor {
    fn visit<F: Field>(&mut self);
}

/// The full registry, in declaration order.
pub fn schema() -> Vec<FieldSpec> {
    struct Collect(Vec<FieldSpec>);

    impl FieldVisitor for Collect {
        fn visit<F: Field>(&mut self) {
            self.0.push(F::spec());
        }
    }

    let mut collect = Collect(Vec::new());
    visit_all(&mut collect);
    collect.0
}

/// Storage keys of every field
pub fn field_names() -> Vec<&'static str> {
    schema().into_iter().map(|spec| spec.name).collect()
}

pub fn find_field(name: &str) -> Option<FieldSpec> {
    schema().into_iter().find(|spec| spec.name == name)
}
