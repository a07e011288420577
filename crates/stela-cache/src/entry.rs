//! Cache entries and child-collection state

use std::sync::Arc;

/// Load state of one parent's child collection
#[derive(Debug, Clone)]
pub enum ChildState<C> {
    /// Children have not been fetched for this parent
    NotLoaded,
    /// A child fetch is in flight (prevents duplicate loads)
    Loading,
    /// Children are available; a parent with no children holds an empty,
    /// loaded collection rather than `NotLoaded`
    Loaded(Vec<Arc<C>>),
}

impl<C> ChildState<C> {
    /// Check if children are loaded
    pub fn is_loaded(&self) -> bool {
        matches!(self, ChildState::Loaded(_))
    }

    /// Check if a child fetch is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, ChildState::Loading)
    }

    /// Check if children have not been fetched yet
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, ChildState::NotLoaded)
    }

    /// Get the loaded children if available
    pub fn get(&self) -> Option<&[Arc<C>]> {
        match self {
            ChildState::Loaded(children) => Some(children),
            _ => None,
        }
    }
}

/// One cached catalog object together with its bookkeeping.
///
/// Replacing the object always resets the child state: children loaded
/// for a previous instance of the parent would otherwise silently
/// reference a stale identity.
#[derive(Debug, Clone)]
pub struct CacheEntry<T, C = ()> {
    pub(crate) object: Arc<T>,
    pub(crate) persisted: bool,
    pub(crate) children: ChildState<C>,
}

impl<T, C> CacheEntry<T, C> {
    /// Entry for an object materialized from the engine
    pub(crate) fn persisted(object: Arc<T>) -> Self {
        Self {
            object,
            persisted: true,
            children: ChildState::NotLoaded,
        }
    }

    /// Entry for a pending local creation (not yet in the engine)
    pub(crate) fn pending(object: Arc<T>) -> Self {
        Self {
            object,
            persisted: false,
            children: ChildState::NotLoaded,
        }
    }

    /// The cached object
    pub fn object(&self) -> &Arc<T> {
        &self.object
    }

    /// Whether the object came from the engine rather than being a
    /// pending local creation
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Load state of the entry's child collection
    pub fn children(&self) -> &ChildState<C> {
        &self.children
    }
}
