//! Tests for registry-wide invalidation

use super::*;
use async_trait::async_trait;
use stela_core::{CancelToken, EntityFactory, FetchScope, MetaRow, Result, RowSource};

struct Db;

#[derive(Debug)]
struct NamedRec {
    name: String,
}

impl MetaObject for NamedRec {
    fn object_name(&self) -> &str {
        &self.name
    }
}

struct NamedFactory;

impl EntityFactory<Db, NamedRec> for NamedFactory {
    fn convert(&self, _owner: &Db, row: &MetaRow) -> Result<NamedRec> {
        Ok(NamedRec {
            name: row.text("NAME")?,
        })
    }
}

struct OneRowSource;

#[async_trait]
impl RowSource<Db> for OneRowSource {
    async fn fetch(&self, _owner: &Db, _scope: FetchScope<'_>) -> Result<Vec<MetaRow>> {
        Ok(vec![MetaRow::new().with("NAME", "X")])
    }
}

fn named_cache(name: &'static str) -> Arc<ObjectCache<Db, NamedRec>> {
    Arc::new(ObjectCache::new(
        name,
        Arc::new(OneRowSource),
        Arc::new(NamedFactory),
    ))
}

#[tokio::test]
async fn test_clear_all_clears_every_registered_cache() {
    let views = named_cache("views");
    let sequences = named_cache("sequences");
    let cancel = CancelToken::new();

    views.get_all_objects(&Db, &cancel).await.unwrap();
    sequences.get_all_objects(&Db, &cancel).await.unwrap();
    assert!(views.is_fully_loaded());
    assert!(sequences.is_fully_loaded());

    let registry = CacheRegistry::new()
        .with(views.clone())
        .with(sequences.clone());
    assert_eq!(registry.cache_names(), vec!["views", "sequences"]);

    registry.clear_all();
    assert!(!views.is_fully_loaded());
    assert!(!sequences.is_fully_loaded());
    assert_eq!(views.cached_count(), 0);
    assert_eq!(sequences.cached_count(), 0);
}

#[test]
fn test_empty_registry() {
    let registry = CacheRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    registry.clear_all();
}
