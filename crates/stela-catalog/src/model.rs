//! Per-schema and per-datasource cache registries
//!
//! These are the objects the browsing UI talks to. Each one owns a fixed
//! set of cache instances and coordinates their invalidation; all data
//! flows through the caches, never around them.

use crate::config::CatalogConfig;
use crate::entity::*;
use crate::factory::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use stela_cache::{CacheRegistry, CompositeCache, ObjectCache, StructCache};
use stela_core::{CancelToken, ObjectKey, Result, RowSource, StelaError};
use uuid::Uuid;

/// Scoping context handed to row sources for datasource-level queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceContext {
    pub id: Uuid,
    pub name: String,
}

/// Scoping context handed to row sources for schema-level queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContext {
    pub datasource: Uuid,
    pub schema: String,
}

/// The schema-level catalog queries the driver layer provides
#[derive(Clone)]
pub struct SchemaSources {
    pub tables: Arc<dyn RowSource<SchemaContext>>,
    pub columns: Arc<dyn RowSource<SchemaContext>>,
    pub views: Arc<dyn RowSource<SchemaContext>>,
    pub triggers: Arc<dyn RowSource<SchemaContext>>,
    pub sequences: Arc<dyn RowSource<SchemaContext>>,
    pub packages: Arc<dyn RowSource<SchemaContext>>,
    pub package_routines: Arc<dyn RowSource<SchemaContext>>,
    pub procedures: Arc<dyn RowSource<SchemaContext>>,
    pub procedure_parameters: Arc<dyn RowSource<SchemaContext>>,
    pub indexes: Arc<dyn RowSource<SchemaContext>>,
    pub constraints: Arc<dyn RowSource<SchemaContext>>,
    pub foreign_keys: Arc<dyn RowSource<SchemaContext>>,
}

/// The datasource-level catalog queries the driver layer provides
#[derive(Clone)]
pub struct DataSourceSources {
    pub schemas: Arc<dyn RowSource<DataSourceContext>>,
    pub users: Arc<dyn RowSource<DataSourceContext>>,
    pub roles: Arc<dyn RowSource<DataSourceContext>>,
    pub tablespaces: Arc<dyn RowSource<DataSourceContext>>,
    pub tablespace_files: Arc<dyn RowSource<DataSourceContext>>,
}

/// Cache registry for one schema
pub struct SchemaModel {
    ctx: SchemaContext,
    tables: Arc<StructCache<SchemaContext, TableInfo, ColumnInfo>>,
    views: Arc<ObjectCache<SchemaContext, ViewInfo>>,
    triggers: Arc<ObjectCache<SchemaContext, TriggerInfo>>,
    sequences: Arc<ObjectCache<SchemaContext, SequenceInfo>>,
    packages: Arc<StructCache<SchemaContext, PackageInfo, ProcedureInfo>>,
    procedures: Arc<StructCache<SchemaContext, ProcedureInfo, ProcedureParameter>>,
    indexes: Arc<CompositeCache<SchemaContext, TableInfo, IndexInfo, IndexColumn>>,
    constraints: Arc<CompositeCache<SchemaContext, TableInfo, ConstraintInfo, ConstraintColumn>>,
    foreign_keys: Arc<CompositeCache<SchemaContext, TableInfo, ForeignKeyInfo, ForeignKeyColumn>>,
    registry: CacheRegistry,
}

impl SchemaModel {
    pub fn new(ctx: SchemaContext, sources: SchemaSources, config: &CatalogConfig) -> Self {
        let case = config.identifier_case;

        let mut tables: StructCache<SchemaContext, TableInfo, ColumnInfo> = StructCache::new(
            "tables",
            sources.tables,
            Arc::new(TableRowFactory),
            sources.columns,
            Arc::new(ColumnRowFactory),
        )
        .with_case(case);
        let mut views: ObjectCache<SchemaContext, ViewInfo> =
            ObjectCache::new("views", sources.views, Arc::new(ViewRowFactory)).with_case(case);
        let mut triggers: ObjectCache<SchemaContext, TriggerInfo> =
            ObjectCache::new("triggers", sources.triggers, Arc::new(TriggerRowFactory))
                .with_case(case);
        let mut sequences: ObjectCache<SchemaContext, SequenceInfo> =
            ObjectCache::new("sequences", sources.sequences, Arc::new(SequenceRowFactory))
                .with_case(case);
        let mut packages: StructCache<SchemaContext, PackageInfo, ProcedureInfo> =
            StructCache::new(
                "packages",
                sources.packages,
                Arc::new(PackageRowFactory),
                sources.package_routines,
                Arc::new(PackageRoutineRowFactory),
            )
            .with_case(case);
        let mut procedures: StructCache<SchemaContext, ProcedureInfo, ProcedureParameter> =
            StructCache::new(
                "procedures",
                sources.procedures,
                Arc::new(ProcedureRowFactory),
                sources.procedure_parameters,
                Arc::new(ParameterRowFactory),
            )
            .with_case(case);

        if !config.sorted_lists {
            tables = tables.unsorted();
            views = views.unsorted();
            triggers = triggers.unsorted();
            sequences = sequences.unsorted();
            packages = packages.unsorted();
            procedures = procedures.unsorted();
        }

        let tables = Arc::new(tables);
        let views = Arc::new(views);
        let triggers = Arc::new(triggers);
        let sequences = Arc::new(sequences);
        let packages = Arc::new(packages);
        let procedures = Arc::new(procedures);

        let indexes: Arc<CompositeCache<SchemaContext, TableInfo, IndexInfo, IndexColumn>> =
            Arc::new(
                CompositeCache::new(
                    "indexes",
                    sources.indexes,
                    Arc::new(IndexAssembler),
                    tables.clone(),
                )
                .with_case(case),
            );
        let constraints: Arc<
            CompositeCache<SchemaContext, TableInfo, ConstraintInfo, ConstraintColumn>,
        > = Arc::new(
            CompositeCache::new(
                "constraints",
                sources.constraints,
                Arc::new(ConstraintAssembler),
                tables.clone(),
            )
            .with_case(case),
        );
        let foreign_keys: Arc<
            CompositeCache<SchemaContext, TableInfo, ForeignKeyInfo, ForeignKeyColumn>,
        > = Arc::new(
            CompositeCache::new(
                "foreign_keys",
                sources.foreign_keys,
                Arc::new(ForeignKeyAssembler),
                tables.clone(),
            )
            .with_case(case),
        );

        let registry = CacheRegistry::new()
            .with(tables.clone())
            .with(views.clone())
            .with(triggers.clone())
            .with(sequences.clone())
            .with(packages.clone())
            .with(procedures.clone())
            .with(indexes.clone())
            .with(constraints.clone())
            .with(foreign_keys.clone());

        Self {
            ctx,
            tables,
            views,
            triggers,
            sequences,
            packages,
            procedures,
            indexes,
            constraints,
            foreign_keys,
            registry,
        }
    }

    /// The schema this model caches
    pub fn name(&self) -> &str {
        &self.ctx.schema
    }

    // ---- tables and columns ----

    pub async fn tables(&self, cancel: &CancelToken) -> Result<Vec<Arc<TableInfo>>> {
        self.tables.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn table(&self, name: &str, cancel: &CancelToken) -> Result<Option<Arc<TableInfo>>> {
        self.tables.get_object(&self.ctx, name, cancel).await
    }

    pub async fn table_columns(
        &self,
        table: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<ColumnInfo>>> {
        self.tables.get_children(&self.ctx, table, cancel).await
    }

    pub async fn table_column(
        &self,
        table: &str,
        column: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<ColumnInfo>>> {
        self.tables.get_child(&self.ctx, table, column, cancel).await
    }

    /// Load columns for every cached table in one query. Tables must be
    /// listed first.
    pub async fn preload_all_columns(&self, cancel: &CancelToken) -> Result<()> {
        self.tables.load_children(&self.ctx, None, cancel).await
    }

    // ---- other flat listings ----

    pub async fn views(&self, cancel: &CancelToken) -> Result<Vec<Arc<ViewInfo>>> {
        self.views.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn view(&self, name: &str, cancel: &CancelToken) -> Result<Option<Arc<ViewInfo>>> {
        self.views.get_object(&self.ctx, name, cancel).await
    }

    pub async fn triggers(&self, cancel: &CancelToken) -> Result<Vec<Arc<TriggerInfo>>> {
        self.triggers.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn sequences(&self, cancel: &CancelToken) -> Result<Vec<Arc<SequenceInfo>>> {
        self.sequences.get_all_objects(&self.ctx, cancel).await
    }

    // ---- routines ----

    pub async fn packages(&self, cancel: &CancelToken) -> Result<Vec<Arc<PackageInfo>>> {
        self.packages.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn package_routines(
        &self,
        package: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<ProcedureInfo>>> {
        self.packages.get_children(&self.ctx, package, cancel).await
    }

    pub async fn procedures(&self, cancel: &CancelToken) -> Result<Vec<Arc<ProcedureInfo>>> {
        self.procedures.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn procedure_parameters(
        &self,
        procedure: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<ProcedureParameter>>> {
        self.procedures
            .get_children(&self.ctx, procedure, cancel)
            .await
    }

    // ---- composite collections over tables ----

    pub async fn indexes_of(
        &self,
        table: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<IndexInfo>>> {
        self.ensure_table(table, cancel).await?;
        self.indexes.get_objects(&self.ctx, table, cancel).await
    }

    pub async fn constraints_of(
        &self,
        table: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<ConstraintInfo>>> {
        self.ensure_table(table, cancel).await?;
        self.constraints.get_objects(&self.ctx, table, cancel).await
    }

    pub async fn all_constraints(&self, cancel: &CancelToken) -> Result<Vec<Arc<ConstraintInfo>>> {
        // The composite resolves rows against the table cache, so the
        // table listing is the documented prerequisite
        self.tables.get_all_objects(&self.ctx, cancel).await?;
        self.constraints.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn foreign_keys_of(
        &self,
        table: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<ForeignKeyInfo>>> {
        self.ensure_table(table, cancel).await?;
        self.foreign_keys.get_objects(&self.ctx, table, cancel).await
    }

    // ---- refresh ----

    /// Re-read one table and its columns, leaving every other table's
    /// cached state alone. The composite caches derived from the table
    /// listing are cleared whole and reload lazily; their cross-table
    /// contents cannot be patched piecemeal.
    pub async fn refresh_table(
        &self,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<TableInfo>>> {
        let refreshed = self.tables.refresh_object(&self.ctx, name, cancel).await?;
        self.indexes.clear_cache();
        self.constraints.clear_cache();
        self.foreign_keys.clear_cache();
        Ok(refreshed)
    }

    /// Drop everything this schema has cached; the next access reloads
    pub fn refresh(&self) {
        tracing::info!(schema = %self.ctx.schema, "refreshing schema model");
        self.registry.clear_all();
    }

    /// The model's cache registry
    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    async fn ensure_table(&self, table: &str, cancel: &CancelToken) -> Result<()> {
        match self.tables.get_object(&self.ctx, table, cancel).await? {
            Some(_) => Ok(()),
            None => Err(StelaError::NotFound(format!(
                "{}.{}",
                self.ctx.schema, table
            ))),
        }
    }
}

/// Cache registry for one datasource: global entities plus one
/// `SchemaModel` per browsed schema
pub struct DataSourceModel {
    ctx: DataSourceContext,
    config: CatalogConfig,
    schema_sources: SchemaSources,
    schemas: Arc<ObjectCache<DataSourceContext, SchemaInfo>>,
    users: Arc<ObjectCache<DataSourceContext, UserInfo>>,
    roles: Arc<ObjectCache<DataSourceContext, RoleInfo>>,
    tablespaces: Arc<StructCache<DataSourceContext, TablespaceInfo, DataFileInfo>>,
    registry: CacheRegistry,
    models: RwLock<HashMap<ObjectKey, Arc<SchemaModel>>>,
}

impl DataSourceModel {
    pub fn new(
        ctx: DataSourceContext,
        sources: DataSourceSources,
        schema_sources: SchemaSources,
        config: CatalogConfig,
    ) -> Self {
        let case = config.identifier_case;

        let schemas: Arc<ObjectCache<DataSourceContext, SchemaInfo>> = Arc::new(
            ObjectCache::new("schemas", sources.schemas, Arc::new(SchemaRowFactory))
                .with_case(case),
        );
        let users: Arc<ObjectCache<DataSourceContext, UserInfo>> = Arc::new(
            ObjectCache::new("users", sources.users, Arc::new(UserRowFactory)).with_case(case),
        );
        let roles: Arc<ObjectCache<DataSourceContext, RoleInfo>> = Arc::new(
            ObjectCache::new("roles", sources.roles, Arc::new(RoleRowFactory)).with_case(case),
        );
        let tablespaces: Arc<StructCache<DataSourceContext, TablespaceInfo, DataFileInfo>> =
            Arc::new(
                StructCache::new(
                    "tablespaces",
                    sources.tablespaces,
                    Arc::new(TablespaceRowFactory),
                    sources.tablespace_files,
                    Arc::new(DataFileRowFactory),
                )
                .with_case(case),
            );

        let registry = CacheRegistry::new()
            .with(schemas.clone())
            .with(users.clone())
            .with(roles.clone())
            .with(tablespaces.clone());

        Self {
            ctx,
            config,
            schema_sources,
            schemas,
            users,
            roles,
            tablespaces,
            registry,
            models: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    pub fn id(&self) -> Uuid {
        self.ctx.id
    }

    pub async fn schemas(&self, cancel: &CancelToken) -> Result<Vec<Arc<SchemaInfo>>> {
        self.schemas.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn schema(
        &self,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Arc<SchemaInfo>>> {
        self.schemas.get_object(&self.ctx, name, cancel).await
    }

    /// The cache model for one schema, created on first use. Errors when
    /// the schema does not exist in the engine.
    pub async fn schema_model(&self, name: &str, cancel: &CancelToken) -> Result<Arc<SchemaModel>> {
        let info = self
            .schemas
            .get_object(&self.ctx, name, cancel)
            .await?
            .ok_or_else(|| StelaError::NotFound(name.to_string()))?;
        let key = ObjectKey::new(self.config.identifier_case, &info.name);

        if let Some(model) = self.models.read().get(&key) {
            return Ok(model.clone());
        }

        let mut models = self.models.write();
        let model = models.entry(key).or_insert_with(|| {
            Arc::new(SchemaModel::new(
                SchemaContext {
                    datasource: self.ctx.id,
                    schema: info.name.clone(),
                },
                self.schema_sources.clone(),
                &self.config,
            ))
        });
        Ok(model.clone())
    }

    pub async fn users(&self, cancel: &CancelToken) -> Result<Vec<Arc<UserInfo>>> {
        self.users.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn roles(&self, cancel: &CancelToken) -> Result<Vec<Arc<RoleInfo>>> {
        self.roles.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn tablespaces(&self, cancel: &CancelToken) -> Result<Vec<Arc<TablespaceInfo>>> {
        self.tablespaces.get_all_objects(&self.ctx, cancel).await
    }

    pub async fn tablespace_files(
        &self,
        tablespace: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<DataFileInfo>>> {
        self.tablespaces
            .get_children(&self.ctx, tablespace, cancel)
            .await
    }

    /// Drop everything cached for this datasource, including every
    /// schema model. Held `SchemaModel` references stay usable but
    /// empty; callers re-request models after a refresh.
    pub fn refresh(&self) {
        tracing::info!(datasource = %self.ctx.name, "refreshing datasource model");
        let models = std::mem::take(&mut *self.models.write());
        for model in models.values() {
            model.refresh();
        }
        self.registry.clear_all();
    }

    /// The model's cache registry (schema models not included)
    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }
}
