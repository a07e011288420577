//! Row source and entity factory contracts
//!
//! A `RowSource` executes one kind of catalog query (tables of a schema,
//! columns of a table, ...) scoped by a `FetchScope`, and produces raw
//! rows. Factories convert rows into domain objects. Query text
//! construction lives behind the `RowSource` implementations supplied by
//! the driver layer; the cache framework only consumes these contracts.

use crate::{MetaRow, Result};
use async_trait::async_trait;

/// Scope of one catalog fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope<'a> {
    /// Everything the owner contains
    All,
    /// A single object, by name
    Object(&'a str),
    /// Child rows of a single parent object
    ChildrenOf(&'a str),
}

impl FetchScope<'_> {
    /// The target name for scoped fetches
    pub fn target(&self) -> Option<&str> {
        match self {
            FetchScope::All => None,
            FetchScope::Object(name) | FetchScope::ChildrenOf(name) => Some(name),
        }
    }
}

/// Executes a catalog query scoped to an owner and produces raw rows.
///
/// The returned sequence is finite and restartable: a retried call after
/// a failure or cancellation re-executes the query from the start.
/// Errors surface as `StelaError::Fetch` and are propagated unchanged by
/// the caches.
#[async_trait]
pub trait RowSource<O: Send + Sync>: Send + Sync {
    async fn fetch(&self, owner: &O, scope: FetchScope<'_>) -> Result<Vec<MetaRow>>;
}

/// Minimal behavior every cached catalog object exposes
pub trait MetaObject: Send + Sync + 'static {
    /// The object's catalog name, exactly as the engine reports it
    fn object_name(&self) -> &str;
}

/// Converts one row into one domain object
pub trait EntityFactory<O, T>: Send + Sync {
    /// May fail per row without failing the batch; batch loads log and
    /// skip unconvertible rows.
    fn convert(&self, owner: &O, row: &MetaRow) -> Result<T>;
}

/// Converts one row into one child object attached to an
/// already-materialized parent
pub trait ChildFactory<O, T, C>: Send + Sync {
    /// The parent-identifying join key carried by a child row; used to
    /// distribute rows of an unscoped child fetch onto cached parents.
    fn parent_key(&self, row: &MetaRow) -> Result<String>;

    /// May fail per row without failing the batch.
    fn convert_child(&self, owner: &O, parent: &T, row: &MetaRow) -> Result<C>;

    /// Declared position used to order children independent of row
    /// arrival order. `None` sorts by name only.
    fn ordinal(&self, _child: &C) -> Option<i64> {
        None
    }
}
