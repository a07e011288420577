//! Named cache registries and bulk invalidation
//!
//! Each owning entity (schema, datasource) holds a fixed set of cache
//! instances. Refreshing the owner clears every owned cache before
//! anything is re-derived: cross-cache referential state (a foreign-key
//! cache derived from the constraint cache) cannot be kept consistent
//! piecemeal, and all caches reload lazily, so invalidation order does
//! not matter.

use crate::composite::CompositeCache;
use crate::lookup::StructCache;
use crate::object::ObjectCache;
use std::sync::Arc;
use stela_core::MetaObject;

/// Anything a registry can invalidate
pub trait CacheClear: Send + Sync {
    /// The cache's registry/log label
    fn cache_name(&self) -> &'static str;

    /// Drop all cached contents; the next access reloads lazily
    fn clear(&self);
}

impl<O, T, C> CacheClear for ObjectCache<O, T, C>
where
    O: Send + Sync,
    T: MetaObject,
    C: Send + Sync + 'static,
{
    fn cache_name(&self) -> &'static str {
        self.name()
    }

    fn clear(&self) {
        self.clear_cache();
    }
}

impl<O, T, C> CacheClear for StructCache<O, T, C>
where
    O: Send + Sync,
    T: MetaObject,
    C: MetaObject,
{
    fn cache_name(&self) -> &'static str {
        self.name()
    }

    fn clear(&self) {
        self.clear_cache();
    }
}

impl<O, P, T, D> CacheClear for CompositeCache<O, P, T, D>
where
    O: Send + Sync,
    P: MetaObject,
    T: MetaObject,
    D: Send + Sync + 'static,
{
    fn cache_name(&self) -> &'static str {
        self.name()
    }

    fn clear(&self) {
        self.clear_cache();
    }
}

/// Fixed, named set of caches owned by one entity
#[derive(Default)]
pub struct CacheRegistry {
    caches: Vec<Arc<dyn CacheClear>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with(mut self, cache: Arc<dyn CacheClear>) -> Self {
        self.caches.push(cache);
        self
    }

    pub fn register(&mut self, cache: Arc<dyn CacheClear>) {
        self.caches.push(cache);
    }

    /// Clear every registered cache
    pub fn clear_all(&self) {
        tracing::info!(cache_count = self.caches.len(), "invalidating cache registry");
        for cache in &self.caches {
            tracing::debug!(cache = cache.cache_name(), "clearing");
            cache.clear();
        }
    }

    /// Registered cache labels, in registration order
    pub fn cache_names(&self) -> Vec<&'static str> {
        self.caches.iter().map(|c| c.cache_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

#[cfg(test)]
mod tests;
