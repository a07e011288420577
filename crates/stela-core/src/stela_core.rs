//! Stela Core - Core abstractions for the catalog metadata model
//!
//! This crate provides the fundamental traits and types that the cache
//! framework and the concrete catalog model depend on. It defines:
//!
//! - `RowSource` - Trait for executing scoped catalog queries
//! - `EntityFactory` / `ChildFactory` - Row-to-object conversion
//! - `MetaRow` / `MetaValue` - Raw catalog rows with named-field access
//! - `ObjectKey` / `IdentifierCase` - Shared identity normalization
//! - `CancelToken` - Cooperative cancellation for long loads
//! - `StelaError` - Common error type

mod cancel;
mod error;
mod identity;
mod row;
mod source;
mod util;

pub use cancel::*;
pub use error::*;
pub use identity::*;
pub use row::*;
pub use source::*;
pub use util::*;
