//! Read-only entity store: an ordered list of records plus an `Id` index.
//!
//! A store is immutable once built. `map` and `filter` return new stores
//! whose index is rebuilt from the resulting list, so the index keys are
//! always exactly the ids present in the list.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Utc};

use crate::utils::contains_ignore_case;

/// A remote entity record.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn last_change(&self) -> DateTime<Utc>;

    /// Text matched by [`EntityStore::search`]
    fn search_fields(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Whether any search field contains `query`, ignoring case
    fn matches(&self, query: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|field| contains_ignore_case(field, query))
    }
}

/// One shared empty store per record type
static EMPTY_STORES: OnceLock<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> = OnceLock::new();

/// Clone is cheap: both views are reference counted.
#[derive(Debug)]
pub struct EntityStore<T> {
    items: Arc<[T]>,
    index: Arc<HashMap<String, usize>>,
}

impl<T> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            index: Arc::clone(&self.index),
        }
    }
}

impl<T: Record> EntityStore<T> {
    /// The empty store. Every call for the same record type returns the
    /// same allocation.
    pub fn empty() -> Self {
        let mut stores = EMPTY_STORES
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let shared = stores.entry(TypeId::of::<T>()).or_insert_with(|| -> Box<dyn Any + Send + Sync> {
            Box::new(Self {
                items: Arc::from(Vec::new()),
                index: Arc::new(HashMap::new()),
            })
        });
        match shared.downcast_ref::<Self>() {
            Some(store) => store.clone(),
            None => Self {
                items: Arc::from(Vec::new()),
                index: Arc::new(HashMap::new()),
            },
        }
    }

    /// Build a store keeping `records` in the given order. When an id occurs
    /// more than once the index points at the last occurrence.
    pub fn from_records(records: Vec<T>) -> Self {
        if records.is_empty() {
            return Self::empty();
        }
        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id().to_string(), i))
            .collect();
        Self {
            items: Arc::from(records),
            index: Arc::new(index),
        }
    }

    /// Whether both stores share the same storage
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items) && Arc::ptr_eq(&self.index, &other.index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ids in the index, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn map<U: Record>(&self, f: impl FnMut(&T) -> U) -> EntityStore<U> {
        EntityStore::from_records(self.items.iter().map(f).collect())
    }

    pub fn filter(&self, mut predicate: impl FnMut(&T) -> bool) -> Self {
        EntityStore::from_records(self.items.iter().filter(|r| predicate(r)).cloned().collect())
    }

    /// Records where any search field contains `query`, case-insensitively,
    /// in list order. A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&T> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|r| r.matches(query))
            .collect()
    }

    /// Most recent `LastChangeDateTimeUtc` in the store
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(Record::last_change).max()
    }
}

impl<T: Record> Default for EntityStore<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialEq> PartialEq for EntityStore<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<'a, T> IntoIterator for &'a EntityStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
