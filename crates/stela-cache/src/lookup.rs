//! Object cache with independently loadable child collections
//!
//! A `StructCache` caches parents the way an `ObjectCache` does, and
//! additionally owns each parent's child collection (table -> columns).
//! Children load separately from parent discovery: one parent's children
//! can be fetched or refreshed without touching any sibling.

use crate::object::ObjectCache;
use std::collections::HashMap;
use std::sync::Arc;
use stela_core::{
    CancelToken, ChildFactory, EntityFactory, FetchScope, IdentifierCase, MetaObject, ObjectKey,
    Result, RowSource, StelaError,
};

/// Parent cache composed with a child row source and factory
pub struct StructCache<O, T, C> {
    objects: ObjectCache<O, T, C>,
    child_source: Arc<dyn RowSource<O>>,
    child_factory: Arc<dyn ChildFactory<O, T, C>>,
    /// Serializes child loads, like the parent cache's load gate
    child_gate: tokio::sync::Mutex<()>,
}

impl<O, T, C> StructCache<O, T, C>
where
    O: Send + Sync,
    T: MetaObject,
    C: MetaObject,
{
    pub fn new(
        name: &'static str,
        source: Arc<dyn RowSource<O>>,
        factory: Arc<dyn EntityFactory<O, T>>,
        child_source: Arc<dyn RowSource<O>>,
        child_factory: Arc<dyn ChildFactory<O, T, C>>,
    ) -> Self {
        Self {
            objects: ObjectCache::new(name, source, factory),
            child_source,
            child_factory,
            child_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the identifier case policy (default: upper)
    pub fn with_case(mut self, case: IdentifierCase) -> Self {
        self.objects = self.objects.with_case(case);
        self
    }

    /// Keep snapshots in fetch order instead of sorting by name
    pub fn unsorted(mut self) -> Self {
        self.objects = self.objects.unsorted();
        self
    }

    pub fn name(&self) -> &'static str {
        self.objects.name()
    }

    // ---- parent operations, delegated to the object cache ----

    pub async fn get_all_objects(&self, owner: &O, cancel: &CancelToken) -> Result<Vec<Arc<T>>> {
        self.objects.get_all_objects(owner, cancel).await
    }

    pub fn get_cached_object(&self, name: &str) -> Option<Arc<T>> {
        self.objects.get_cached_object(name)
    }

    pub async fn get_object(
        &self,
        owner: &O,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<T>>> {
        self.objects.get_object(owner, name, cancel).await
    }

    pub fn clear_cache(&self) {
        self.objects.clear_cache();
    }

    pub fn set_cache(&self, objects: Vec<T>) {
        self.objects.set_cache(objects);
    }

    pub fn cache_object(&self, object: T) -> Arc<T> {
        self.objects.cache_object(object)
    }

    pub fn remove_object(&self, name: &str) -> bool {
        self.objects.remove_object(name)
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.objects.is_fully_loaded()
    }

    pub fn cached_count(&self) -> usize {
        self.objects.cached_count()
    }

    pub fn cached_names(&self) -> Vec<String> {
        self.objects.cached_names()
    }

    // ---- child operations ----

    /// Whether the named parent's children are loaded
    pub fn children_loaded(&self, parent: &str) -> bool {
        self.objects.children_loaded(parent)
    }

    /// Loaded children of a parent; `None` until `load_children` has run
    /// for it. Never triggers I/O.
    pub fn get_cached_children(&self, parent: &str) -> Option<Vec<Arc<C>>> {
        self.objects.cached_children(parent)
    }

    /// Load children for one parent, or for every cached parent at once.
    ///
    /// The unscoped form expects the row source to return children for
    /// all currently cached parents in one query and distributes each row
    /// onto its parent by the factory's join key. Parents must already be
    /// cached: rows whose parent is unknown are skipped with a warning,
    /// so callers load the parent listing first.
    pub async fn load_children(
        &self,
        owner: &O,
        parent: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<()> {
        match parent {
            Some(name) => self.load_children_of(owner, name, cancel).await,
            None => self.load_all_children(owner, cancel).await,
        }
    }

    /// Children of one parent, loading them on first access. Children
    /// are ordered by their declared position, then by name.
    pub async fn get_children(
        &self,
        owner: &O,
        parent: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<C>>> {
        if let Some(children) = self.objects.cached_children(parent) {
            return Ok(children);
        }
        if self.objects.get_object(owner, parent, cancel).await?.is_none() {
            return Err(StelaError::NotFound(parent.to_string()));
        }
        self.load_children_of(owner, parent, cancel).await?;
        self.objects
            .cached_children(parent)
            .ok_or_else(|| StelaError::NotFound(parent.to_string()))
    }

    /// One child by name, loading the parent's children if needed
    pub async fn get_child(
        &self,
        owner: &O,
        parent: &str,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<C>>> {
        let wanted = self.objects.key(name);
        let children = self.get_children(owner, parent, cancel).await?;
        Ok(children
            .into_iter()
            .find(|child| self.objects.key(child.object_name()) == wanted))
    }

    /// Re-fetch one parent's own row and reload only that parent's
    /// children. Every other cached parent and its child collection is
    /// left untouched, which is what makes "edit one table, keep the
    /// rest of the schema cached" possible.
    pub async fn refresh_object(
        &self,
        owner: &O,
        parent: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<T>>> {
        let refreshed = self.objects.refresh_object(owner, parent, cancel).await?;
        if refreshed.is_some() {
            // The slot replacement reset the child state; reload it now
            self.load_children_of(owner, parent, cancel).await?;
        }
        Ok(refreshed)
    }

    async fn load_children_of(&self, owner: &O, parent: &str, cancel: &CancelToken) -> Result<()> {
        let _gate = self.child_gate.lock().await;
        if self.objects.children_loaded(parent) {
            return Ok(());
        }
        let Some(parent_obj) = self.objects.get_cached_object(parent) else {
            return Err(StelaError::NotFound(parent.to_string()));
        };

        cancel.check()?;
        if !self.objects.begin_child_load(parent) {
            return Ok(());
        }

        let rows = match self
            .child_source
            .fetch(owner, FetchScope::ChildrenOf(parent))
            .await
        {
            Ok(rows) => rows,
            Err(error) => {
                self.objects.abort_child_load(parent);
                return Err(error);
            }
        };

        let mut children = Vec::with_capacity(rows.len());
        for row in rows {
            if cancel.is_cancelled() {
                self.objects.abort_child_load(parent);
                return Err(StelaError::Cancelled);
            }
            match self.child_factory.convert_child(owner, &parent_obj, &row) {
                Ok(child) => children.push(Arc::new(child)),
                Err(error) => {
                    tracing::warn!(
                        cache = self.objects.name(),
                        parent = %parent,
                        error = %error,
                        "skipping unconvertible child row"
                    );
                }
            }
        }

        self.sort_children(&mut children);
        tracing::debug!(
            cache = self.objects.name(),
            parent = %parent,
            child_count = children.len(),
            "cached children"
        );
        self.objects.finish_child_load(parent, children);
        Ok(())
    }

    async fn load_all_children(&self, owner: &O, cancel: &CancelToken) -> Result<()> {
        let _gate = self.child_gate.lock().await;
        cancel.check()?;

        let parents = self.objects.cached_entries();
        let rows = self.child_source.fetch(owner, FetchScope::All).await?;

        let mut groups: HashMap<ObjectKey, Vec<Arc<C>>> = parents
            .iter()
            .map(|(key, _)| (key.clone(), Vec::new()))
            .collect();

        for row in rows {
            cancel.check()?;
            let raw_parent = match self.child_factory.parent_key(&row) {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(
                        cache = self.objects.name(),
                        error = %error,
                        "skipping child row without a parent key"
                    );
                    continue;
                }
            };
            let key = self.objects.key(&raw_parent);
            let Some((_, parent_obj)) = parents.iter().find(|(k, _)| k == &key) else {
                tracing::warn!(
                    cache = self.objects.name(),
                    parent = %raw_parent,
                    "child row references a parent that is not cached; skipping"
                );
                continue;
            };
            match self.child_factory.convert_child(owner, parent_obj, &row) {
                Ok(child) => groups.entry(key).or_default().push(Arc::new(child)),
                Err(error) => {
                    tracing::warn!(
                        cache = self.objects.name(),
                        parent = %raw_parent,
                        error = %error,
                        "skipping unconvertible child row"
                    );
                }
            }
        }

        // Commit only after the whole batch distributed; every cached
        // parent ends up loaded, with an empty collection when no row
        // mentioned it
        for (key, _) in &parents {
            let mut children = groups.remove(key).unwrap_or_default();
            self.sort_children(&mut children);
            self.objects.finish_child_load(key.as_str(), children);
        }
        tracing::debug!(
            cache = self.objects.name(),
            parent_count = parents.len(),
            "cached children for all parents"
        );
        Ok(())
    }

    fn sort_children(&self, children: &mut [Arc<C>]) {
        children.sort_by(|a, b| {
            let left = self.child_factory.ordinal(a).unwrap_or(i64::MAX);
            let right = self.child_factory.ordinal(b).unwrap_or(i64::MAX);
            left.cmp(&right)
                .then_with(|| a.object_name().cmp(b.object_name()))
        });
    }
}
