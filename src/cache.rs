//! Key/value cache consulted by [`Model::find_by`](crate::model::Model::find_by).

use {
    crate::{database::BoxFuture, error::CacheError},
    std::fmt,
};

#[cfg(feature = "memory-cache")]
use {
    crossbeam::sync::ShardedLock,
    std::{collections::HashMap, sync::PoisonError},
};

pub trait Cache: fmt::Debug + Send + Sync {
    /// `Ok(None)` on a miss.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Backends without a delete overwrite the entry with an empty string,
    /// which readers treat as a miss.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        self.set(key, String::new())
    }
}

/// In-process cache without expiry.
#[cfg(feature = "memory-cache")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory-cache")))]
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: ShardedLock<HashMap<String, String>>,
}

#[cfg(feature = "memory-cache")]
impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(feature = "memory-cache")]
impl Cache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>> {
        let value = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        Box::pin(async move { Ok(value) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), CacheError>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Box::pin(async { Ok(()) })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Box::pin(async { Ok(()) })
    }
}
