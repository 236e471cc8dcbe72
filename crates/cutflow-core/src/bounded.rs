//! Bounded object collections with an authoritative valid-prefix count.

use std::ops::Deref;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::errors::{AnaError, ErrorInfo};

/// Growable collection holding at most `N` objects of one category.
///
/// `len()` is the valid-prefix count of the category for the event; the
/// serialized form carries it explicitly as `count` next to `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounded<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> Bounded<T, N> {
    /// Maximum number of objects the category may hold.
    pub const CAPACITY: usize = N;

    /// Creates an empty collection.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builds a collection from a vector, failing when it exceeds the capacity.
    pub fn from_vec(items: Vec<T>) -> Result<Self, AnaError> {
        if items.len() > N {
            return Err(AnaError::Source(
                ErrorInfo::new("collection_overflow", "collection exceeds its capacity")
                    .with_context("len", items.len())
                    .with_context("capacity", N),
            ));
        }
        Ok(Self { items })
    }

    /// Appends an object, failing when the collection is full.
    pub fn push(&mut self, item: T) -> Result<(), AnaError> {
        if self.items.len() >= N {
            return Err(AnaError::Source(
                ErrorInfo::new("collection_overflow", "collection is full")
                    .with_context("capacity", N),
            ));
        }
        self.items.push(item);
        Ok(())
    }

    /// Number of valid objects.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns the valid objects as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T, const N: usize> Default for Bounded<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for Bounded<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a Bounded<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Deserialize)]
struct RawBounded<T> {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Serialize)]
struct RawBoundedRef<'a, T> {
    count: usize,
    items: &'a [T],
}

impl<T: Serialize, const N: usize> Serialize for Bounded<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawBoundedRef {
            count: self.items.len(),
            items: &self.items,
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for Bounded<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBounded::<T>::deserialize(deserializer)?;
        if let Some(count) = raw.count {
            if count != raw.items.len() {
                return Err(de::Error::custom(format!(
                    "count {count} disagrees with {} stored items",
                    raw.items.len()
                )));
            }
        }
        if raw.items.len() > N {
            return Err(de::Error::custom(format!(
                "{} items exceed the capacity of {N}",
                raw.items.len()
            )));
        }
        Ok(Self { items: raw.items })
    }
}
