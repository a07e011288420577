//! Composite cache: one query populating objects and their detail rows
//!
//! Used when a relationship spans three levels and the per-row shape
//! interleaves two of them (table -> constraint -> constraint column):
//! a single denormalized query returns rows carrying both a parent key
//! and an object key, with zero or more detail items per row. The cache
//! groups rows by (parent, object), accumulates details per object, and
//! only exposes each object after its detail list has been attached and
//! sorted, so callers never see a partially filled object.

use crate::lookup::StructCache;
use crate::object::ObjectCache;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use stela_core::{
    CancelToken, FetchScope, IdentifierCase, MetaObject, MetaRow, ObjectKey, Result, RowSource,
};

/// Resolves composite rows against an already-populated parent cache.
///
/// Parents must be cached before a composite load runs; rows whose
/// parent cannot be resolved are dropped with a warning. Lookups consult
/// the whole parent map, so a row may resolve to a parent outside the
/// currently scoped set (e.g. a foreign key joining across tables).
pub trait ParentLookup<P>: Send + Sync {
    fn cached_parent(&self, name: &str) -> Option<Arc<P>>;
    fn cached_parent_names(&self) -> Vec<String>;
}

impl<O, T, C> ParentLookup<T> for ObjectCache<O, T, C>
where
    O: Send + Sync,
    T: MetaObject,
    C: Send + Sync + 'static,
{
    fn cached_parent(&self, name: &str) -> Option<Arc<T>> {
        self.get_cached_object(name)
    }

    fn cached_parent_names(&self) -> Vec<String> {
        self.cached_names()
    }
}

impl<O, T, C> ParentLookup<T> for StructCache<O, T, C>
where
    O: Send + Sync,
    T: MetaObject,
    C: MetaObject,
{
    fn cached_parent(&self, name: &str) -> Option<Arc<T>> {
        self.get_cached_object(name)
    }

    fn cached_parent_names(&self) -> Vec<String> {
        self.cached_names()
    }
}

/// Strategies for one composite load: key extraction, object and detail
/// construction, and finalization
pub trait CompositeFactory<O, P, T, D>: Send + Sync {
    /// The parent-identifying key carried by a row
    fn parent_key(&self, row: &MetaRow) -> Result<String>;

    /// The key of the object the row contributes to (e.g. the
    /// constraint name)
    fn object_key(&self, row: &MetaRow) -> Result<String>;

    /// Build the domain object the first time its (parent, object) pair
    /// is seen in a load pass
    fn make_object(&self, owner: &O, parent: &Arc<P>, row: &MetaRow) -> Result<T>;

    /// Extract zero or more detail items from one row. A multi-valued
    /// delimited encoding is decoded here, preserving declaration order.
    fn make_details(&self, owner: &O, object: &T, row: &MetaRow) -> Result<Vec<D>>;

    /// Declared detail position; equal or missing ordinals keep
    /// accumulation order
    fn detail_ordinal(&self, _detail: &D) -> Option<i64> {
        None
    }

    /// Attach the accumulated, sorted detail list. Runs once per object
    /// after the whole batch is consumed.
    fn finish(&self, object: T, details: Vec<D>) -> T;
}

struct CompositeState<T> {
    groups: HashMap<ObjectKey, Vec<Arc<T>>>,
    /// Parents whose groups are known complete
    loaded_parents: HashSet<ObjectKey>,
    fully_loaded: bool,
}

impl<T> Default for CompositeState<T> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            loaded_parents: HashSet::new(),
            fully_loaded: false,
        }
    }
}

/// Read-only derived cache over a parent cache.
///
/// `P` is the parent type, `T` the cached object, `D` the per-object
/// detail type.
pub struct CompositeCache<O, P, T, D> {
    name: &'static str,
    source: Arc<dyn RowSource<O>>,
    factory: Arc<dyn CompositeFactory<O, P, T, D>>,
    parents: Arc<dyn ParentLookup<P>>,
    case: IdentifierCase,
    state: RwLock<CompositeState<T>>,
    load_gate: tokio::sync::Mutex<()>,
}

impl<O, P, T, D> CompositeCache<O, P, T, D>
where
    O: Send + Sync,
    P: MetaObject,
    T: MetaObject,
    D: Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        source: Arc<dyn RowSource<O>>,
        factory: Arc<dyn CompositeFactory<O, P, T, D>>,
        parents: Arc<dyn ParentLookup<P>>,
    ) -> Self {
        Self {
            name,
            source,
            factory,
            parents,
            case: IdentifierCase::default(),
            state: RwLock::new(CompositeState::default()),
            load_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the identifier case policy (default: upper)
    pub fn with_case(mut self, case: IdentifierCase) -> Self {
        self.case = case;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(self.case, name)
    }

    /// Whether an unscoped load across all parents has completed
    pub fn is_fully_loaded(&self) -> bool {
        self.state.read().fully_loaded
    }

    /// Loaded objects of one parent; `None` until a load has covered it.
    /// Never triggers I/O.
    pub fn get_cached_objects(&self, parent: &str) -> Option<Vec<Arc<T>>> {
        let key = self.key(parent);
        let state = self.state.read();
        if state.fully_loaded || state.loaded_parents.contains(&key) {
            Some(state.groups.get(&key).cloned().unwrap_or_default())
        } else {
            None
        }
    }

    /// Objects of one parent, loading that parent's group on first
    /// access
    pub async fn get_objects(
        &self,
        owner: &O,
        parent: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<T>>> {
        if let Some(objects) = self.get_cached_objects(parent) {
            return Ok(objects);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(objects) = self.get_cached_objects(parent) {
            return Ok(objects);
        }

        self.load(owner, Some(parent), cancel).await?;
        Ok(self.get_cached_objects(parent).unwrap_or_default())
    }

    /// Objects across all parents in one query, loading once
    pub async fn get_all_objects(&self, owner: &O, cancel: &CancelToken) -> Result<Vec<Arc<T>>> {
        if self.is_fully_loaded() {
            return Ok(self.snapshot());
        }

        let _gate = self.load_gate.lock().await;
        if self.is_fully_loaded() {
            return Ok(self.snapshot());
        }

        self.load(owner, None, cancel).await?;
        Ok(self.snapshot())
    }

    /// One object of one parent by name
    pub async fn get_object(
        &self,
        owner: &O,
        parent: &str,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<T>>> {
        let wanted = self.key(name);
        let objects = self.get_objects(owner, parent, cancel).await?;
        Ok(objects
            .into_iter()
            .find(|object| self.key(object.object_name()) == wanted))
    }

    /// Drop everything; the next access reloads lazily
    pub fn clear_cache(&self) {
        let mut state = self.state.write();
        let count = state.groups.values().map(Vec::len).sum::<usize>();
        state.groups.clear();
        state.loaded_parents.clear();
        state.fully_loaded = false;
        tracing::info!(cache = self.name, dropped = count, "cleared cache");
    }

    /// Snapshot of every loaded object, grouped by parent in key order
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        let state = self.state.read();
        let mut keys: Vec<&ObjectKey> = state.groups.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|key| state.groups[key].iter().cloned())
            .collect()
    }

    /// One load pass: fetch, group by (parent, object), accumulate
    /// details, finalize, commit. Nothing is committed on fetch failure
    /// or cancellation.
    async fn load(&self, owner: &O, scope_parent: Option<&str>, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        let scope = match scope_parent {
            Some(parent) => FetchScope::ChildrenOf(parent),
            None => FetchScope::All,
        };
        let rows = self.source.fetch(owner, scope).await?;
        let row_count = rows.len();

        struct Slot<T, D> {
            parent_key: ObjectKey,
            object: T,
            details: Vec<D>,
        }

        let mut slots: Vec<Slot<T, D>> = Vec::new();
        let mut index: HashMap<(ObjectKey, ObjectKey), usize> = HashMap::new();

        for row in rows {
            cancel.check()?;
            let raw_parent = match self.factory.parent_key(&row) {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(cache = self.name, error = %error, "skipping row without a parent key");
                    continue;
                }
            };
            let raw_object = match self.factory.object_key(&row) {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(
                        cache = self.name,
                        parent = %raw_parent,
                        error = %error,
                        "skipping row without an object key"
                    );
                    continue;
                }
            };

            let Some(parent) = self.parents.cached_parent(&raw_parent) else {
                tracing::warn!(
                    cache = self.name,
                    parent = %raw_parent,
                    object = %raw_object,
                    "row references a parent that is not cached; dropping it"
                );
                continue;
            };

            let parent_key = self.key(&raw_parent);
            let object_key = self.key(&raw_object);
            let slot_index = match index.get(&(parent_key.clone(), object_key.clone())) {
                Some(existing) => *existing,
                None => match self.factory.make_object(owner, &parent, &row) {
                    Ok(object) => {
                        slots.push(Slot {
                            parent_key: parent_key.clone(),
                            object,
                            details: Vec::new(),
                        });
                        index.insert((parent_key, object_key), slots.len() - 1);
                        slots.len() - 1
                    }
                    Err(error) => {
                        tracing::warn!(
                            cache = self.name,
                            parent = %raw_parent,
                            object = %raw_object,
                            error = %error,
                            "skipping unconvertible row"
                        );
                        continue;
                    }
                },
            };

            let slot = &mut slots[slot_index];
            match self.factory.make_details(owner, &slot.object, &row) {
                Ok(details) => slot.details.extend(details),
                Err(error) => {
                    tracing::warn!(
                        cache = self.name,
                        object = %slot.object.object_name(),
                        error = %error,
                        "skipping malformed detail encoding"
                    );
                }
            }
        }

        // Finalization: attach sorted details, then group per parent.
        // The write lock below is the first mutation of shared state.
        let mut groups: HashMap<ObjectKey, Vec<Arc<T>>> = HashMap::new();
        let object_count = slots.len();
        for slot in slots {
            let mut details = slot.details;
            details.sort_by_key(|d| self.factory.detail_ordinal(d).unwrap_or(i64::MAX));
            let finished = self.factory.finish(slot.object, details);
            groups
                .entry(slot.parent_key)
                .or_default()
                .push(Arc::new(finished));
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.object_name().cmp(b.object_name()));
        }

        tracing::debug!(
            cache = self.name,
            row_count,
            object_count,
            "composite load complete"
        );

        let mut state = self.state.write();
        match scope_parent {
            Some(parent) => {
                // The scoped parent gets a (possibly empty) complete
                // group; rows may also have completed other parents'
                // objects (cross-parent joins), which become loaded too
                let scoped = self.key(parent);
                let mut touched: HashSet<ObjectKey> = groups.keys().cloned().collect();
                touched.insert(scoped);
                for key in touched {
                    let group = groups.remove(&key).unwrap_or_default();
                    state.groups.insert(key.clone(), group);
                    state.loaded_parents.insert(key);
                }
            }
            None => {
                state.groups.clear();
                state.loaded_parents.clear();
                for name in self.parents.cached_parent_names() {
                    let key = self.key(&name);
                    let group = groups.remove(&key).unwrap_or_default();
                    state.groups.insert(key.clone(), group);
                    state.loaded_parents.insert(key);
                }
                state.fully_loaded = true;
            }
        }
        Ok(())
    }
}
