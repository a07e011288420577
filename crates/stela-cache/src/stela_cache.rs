//! Stela Cache - hierarchical metadata cache framework
//!
//! Every catalog entity in the model is obtained through one of the
//! cache types in this crate rather than by direct querying:
//!
//! - `ObjectCache` - flat collection with on-demand bulk fetch
//! - `StructCache` - objects plus independently loadable child
//!   collections (table -> columns)
//! - `CompositeCache` - one query populating objects and their detail
//!   rows across many parents (table -> constraint -> constraint columns)
//! - `CacheRegistry` - named cache set with bulk invalidation
//!
//! All caches hand out snapshots (`Vec<Arc<T>>`); the live backing map
//! never escapes a cache instance. Bulk loads are serialized per cache
//! instance, so concurrent "load all" requests issue exactly one fetch.

mod composite;
mod entry;
mod lookup;
mod object;
mod registry;

pub use composite::*;
pub use entry::*;
pub use lookup::*;
pub use object::*;
pub use registry::*;
