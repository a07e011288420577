//! Flat object cache with on-demand bulk fetch
//!
//! Holds every object of one kind owned by one parent context (all
//! tables of a schema, all users of a datasource). The first unscoped
//! access fetches everything; later accesses are served from the map.
//! Single-object lookups while the cache is not fully loaded fetch just
//! that object, so a miss is never mistaken for "does not exist" until
//! a complete listing has been seen.

use crate::entry::{CacheEntry, ChildState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use stela_core::{
    CancelToken, EntityFactory, FetchScope, IdentifierCase, MetaObject, ObjectKey, Result,
    RowSource, StelaError,
};

pub(crate) struct CacheState<T, C> {
    pub(crate) map: HashMap<ObjectKey, CacheEntry<T, C>>,
    /// Snapshot iteration order; kept sorted by name when the cache is
    /// ordered, insertion order otherwise
    pub(crate) order: Vec<ObjectKey>,
    pub(crate) fully_loaded: bool,
}

impl<T, C> Default for CacheState<T, C> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            order: Vec::new(),
            fully_loaded: false,
        }
    }
}

/// Cache for a flat collection of catalog objects.
///
/// `O` is the owner context handed to the row source, `T` the cached
/// object type, and `C` the child type for caches that carry child
/// collections (`()` for flat caches, which never touch the child slot).
pub struct ObjectCache<O, T, C = ()> {
    name: &'static str,
    source: Arc<dyn RowSource<O>>,
    factory: Arc<dyn EntityFactory<O, T>>,
    case: IdentifierCase,
    sorted: bool,
    state: RwLock<CacheState<T, C>>,
    /// Serializes loads so concurrent fetch-triggering calls issue one
    /// query; never guards the state lock across an await
    load_gate: tokio::sync::Mutex<()>,
}

impl<O, T, C> ObjectCache<O, T, C>
where
    O: Send + Sync,
    T: MetaObject,
    C: Send + Sync + 'static,
{
    /// Create a cache over the given row source and factory. `name` is
    /// the cache's label in logs and registries.
    pub fn new(
        name: &'static str,
        source: Arc<dyn RowSource<O>>,
        factory: Arc<dyn EntityFactory<O, T>>,
    ) -> Self {
        Self {
            name,
            source,
            factory,
            case: IdentifierCase::default(),
            sorted: true,
            state: RwLock::new(CacheState::default()),
            load_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the identifier case policy (default: upper)
    pub fn with_case(mut self, case: IdentifierCase) -> Self {
        self.case = case;
        self
    }

    /// Keep snapshots in fetch order instead of sorting by name
    pub fn unsorted(mut self) -> Self {
        self.sorted = false;
        self
    }

    /// The cache's registry/log label
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The cache's identifier case policy
    pub fn case(&self) -> IdentifierCase {
        self.case
    }

    pub(crate) fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(self.case, name)
    }

    /// Whether an unscoped bulk fetch has completed successfully
    pub fn is_fully_loaded(&self) -> bool {
        self.state.read().fully_loaded
    }

    /// Number of cached entries
    pub fn cached_count(&self) -> usize {
        self.state.read().map.len()
    }

    /// Names of all cached objects, in snapshot order
    pub fn cached_names(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|key| state.map.get(key))
            .map(|entry| entry.object.object_name().to_string())
            .collect()
    }

    /// All objects, fetching them once on first access.
    ///
    /// A fetch failure propagates and leaves the previous cache state
    /// untouched. A cancellation mid-batch keeps the partially converted
    /// rows but does not mark the cache fully loaded, so the next call
    /// retries the fetch.
    pub async fn get_all_objects(&self, owner: &O, cancel: &CancelToken) -> Result<Vec<Arc<T>>> {
        if let Some(snapshot) = self.loaded_snapshot() {
            tracing::debug!(cache = self.name, "cache hit for full listing");
            return Ok(snapshot);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(snapshot) = self.loaded_snapshot() {
            return Ok(snapshot);
        }

        cancel.check()?;
        let rows = self.source.fetch(owner, FetchScope::All).await?;
        let total = rows.len();

        let mut fresh: Vec<(ObjectKey, CacheEntry<T, C>)> = Vec::with_capacity(total);
        let mut skipped = 0usize;
        for row in rows {
            if cancel.is_cancelled() {
                tracing::debug!(
                    cache = self.name,
                    converted = fresh.len(),
                    total,
                    "bulk load cancelled; keeping partial result unmarked"
                );
                self.replace_contents(fresh, false);
                return Err(StelaError::Cancelled);
            }
            match self.factory.convert(owner, &row) {
                Ok(object) => {
                    let key = self.key(object.object_name());
                    fresh.push((key, CacheEntry::persisted(Arc::new(object))));
                }
                Err(error) => {
                    skipped += 1;
                    tracing::warn!(
                        cache = self.name,
                        error = %error,
                        "skipping unconvertible catalog row"
                    );
                }
            }
        }

        tracing::debug!(
            cache = self.name,
            object_count = fresh.len(),
            skipped,
            "cached full listing"
        );
        self.replace_contents(fresh, true);
        Ok(self.snapshot())
    }

    /// Pure lookup; never triggers I/O
    pub fn get_cached_object(&self, name: &str) -> Option<Arc<T>> {
        let state = self.state.read();
        state.map.get(&self.key(name)).map(|e| e.object.clone())
    }

    /// Cached object, or a single-object scoped fetch on a miss.
    ///
    /// Once the cache is fully loaded a miss means the object does not
    /// exist and no query is issued. Does not mark the cache fully
    /// loaded.
    pub async fn get_object(
        &self,
        owner: &O,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<T>>> {
        if let Some(object) = self.get_cached_object(name) {
            return Ok(Some(object));
        }
        if self.is_fully_loaded() {
            return Ok(None);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(object) = self.get_cached_object(name) {
            return Ok(Some(object));
        }

        cancel.check()?;
        let rows = self.source.fetch(owner, FetchScope::Object(name)).await?;
        let Some(row) = rows.into_iter().next() else {
            tracing::debug!(cache = self.name, object = %name, "scoped fetch found nothing");
            return Ok(None);
        };

        let object = Arc::new(self.factory.convert(owner, &row)?);
        self.insert_persisted(object.clone());
        Ok(Some(object))
    }

    /// Re-fetch one object's row. A fresh row replaces the map slot
    /// wholesale (resetting any child state); no row means the object is
    /// gone upstream and its entry is removed rather than left stale.
    pub async fn refresh_object(
        &self,
        owner: &O,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<T>>> {
        let _gate = self.load_gate.lock().await;
        cancel.check()?;

        let rows = self.source.fetch(owner, FetchScope::Object(name)).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let object = Arc::new(self.factory.convert(owner, &row)?);
                tracing::debug!(cache = self.name, object = %name, "refreshed object");
                self.insert_persisted(object.clone());
                Ok(Some(object))
            }
            None => {
                let removed = self.remove_object(name);
                if removed {
                    tracing::info!(
                        cache = self.name,
                        object = %name,
                        "object no longer exists upstream; dropped from cache"
                    );
                }
                Ok(None)
            }
        }
    }

    /// Empty the map and force the next access to fetch again. Composite
    /// caches derived from this one are invalidated independently by the
    /// owning registry.
    pub fn clear_cache(&self) {
        let mut state = self.state.write();
        let count = state.map.len();
        state.map.clear();
        state.order.clear();
        state.fully_loaded = false;
        tracing::info!(cache = self.name, dropped = count, "cleared cache");
    }

    /// Administrative bulk seed for statically known objects; marks the
    /// cache fully loaded without querying.
    pub fn set_cache(&self, objects: Vec<T>) {
        let fresh = objects
            .into_iter()
            .map(|object| {
                let key = self.key(object.object_name());
                (key, CacheEntry::persisted(Arc::new(object)))
            })
            .collect();
        self.replace_contents(fresh, true);
        tracing::debug!(
            cache = self.name,
            object_count = self.cached_count(),
            "seeded cache"
        );
    }

    /// Register a pending local creation (e.g. an object being built in
    /// an editor that has not been committed to the engine yet)
    pub fn cache_object(&self, object: T) -> Arc<T> {
        let object = Arc::new(object);
        let key = self.key(object.object_name());
        let mut state = self.state.write();
        if state.map.insert(key.clone(), CacheEntry::pending(object.clone())).is_none() {
            state.order.push(key);
            if self.sorted {
                Self::sort_order(&mut state);
            }
        }
        object
    }

    /// Drop one entry; returns whether it was present
    pub fn remove_object(&self, name: &str) -> bool {
        let key = self.key(name);
        let mut state = self.state.write();
        if state.map.remove(&key).is_some() {
            state.order.retain(|k| k != &key);
            true
        } else {
            false
        }
    }

    /// Whether the named entry exists and is persisted
    pub fn is_persisted(&self, name: &str) -> Option<bool> {
        let state = self.state.read();
        state.map.get(&self.key(name)).map(|e| e.persisted)
    }

    /// Snapshot of all cached objects in deterministic order; no I/O
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|key| state.map.get(key))
            .map(|entry| entry.object.clone())
            .collect()
    }

    fn loaded_snapshot(&self) -> Option<Vec<Arc<T>>> {
        let state = self.state.read();
        if !state.fully_loaded {
            return None;
        }
        Some(
            state
                .order
                .iter()
                .filter_map(|key| state.map.get(key))
                .map(|entry| entry.object.clone())
                .collect(),
        )
    }

    /// Replace the map contents as one atomic unit
    fn replace_contents(&self, fresh: Vec<(ObjectKey, CacheEntry<T, C>)>, fully_loaded: bool) {
        let mut state = self.state.write();
        state.map.clear();
        state.order.clear();
        for (key, entry) in fresh {
            if state.map.insert(key.clone(), entry).is_none() {
                state.order.push(key);
            }
        }
        if self.sorted {
            Self::sort_order(&mut state);
        }
        state.fully_loaded = fully_loaded;
    }

    /// Insert or replace one persisted entry. Replacement resets the
    /// entry's child state, so children are re-read for the fresh parent.
    fn insert_persisted(&self, object: Arc<T>) {
        let key = self.key(object.object_name());
        let mut state = self.state.write();
        if state.map.insert(key.clone(), CacheEntry::persisted(object)).is_none() {
            state.order.push(key);
            if self.sorted {
                Self::sort_order(&mut state);
            }
        }
    }

    fn sort_order(state: &mut CacheState<T, C>) {
        let map = &state.map;
        state.order.sort_by(|a, b| {
            let left = map.get(a).map(|e| e.object.object_name()).unwrap_or("");
            let right = map.get(b).map(|e| e.object.object_name()).unwrap_or("");
            left.cmp(right).then_with(|| a.cmp(b))
        });
    }

    // ---- child-slot hooks used by StructCache ----

    pub(crate) fn cached_children(&self, name: &str) -> Option<Vec<Arc<C>>> {
        let state = self.state.read();
        state
            .map
            .get(&self.key(name))
            .and_then(|entry| entry.children.get())
            .map(|children| children.to_vec())
    }

    pub(crate) fn children_loaded(&self, name: &str) -> bool {
        let state = self.state.read();
        state
            .map
            .get(&self.key(name))
            .is_some_and(|entry| entry.children.is_loaded())
    }

    /// Mark a child load in flight; false when the parent is absent or a
    /// load is already running
    pub(crate) fn begin_child_load(&self, name: &str) -> bool {
        let key = self.key(name);
        let mut state = self.state.write();
        match state.map.get_mut(&key) {
            Some(entry) if !entry.children.is_loading() => {
                entry.children = ChildState::Loading;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish_child_load(&self, name: &str, children: Vec<Arc<C>>) {
        let key = self.key(name);
        let mut state = self.state.write();
        if let Some(entry) = state.map.get_mut(&key) {
            entry.children = ChildState::Loaded(children);
        }
    }

    pub(crate) fn abort_child_load(&self, name: &str) {
        let key = self.key(name);
        let mut state = self.state.write();
        if let Some(entry) = state.map.get_mut(&key)
            && entry.children.is_loading()
        {
            entry.children = ChildState::NotLoaded;
        }
    }

    /// All cached parents with their objects, for unscoped child
    /// distribution
    pub(crate) fn cached_entries(&self) -> Vec<(ObjectKey, Arc<T>)> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|key| state.map.get(key).map(|e| (key.clone(), e.object.clone())))
            .collect()
    }
}
