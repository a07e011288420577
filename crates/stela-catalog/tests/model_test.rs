//! End-to-end tests for the catalog model over a scripted engine

use async_trait::async_trait;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stela_catalog::{
    CatalogConfig, DataSourceContext, DataSourceModel, DataSourceSources, SchemaContext,
    SchemaSources,
};
use stela_core::{CancelToken, FetchScope, MetaRow, Result, RowSource, StelaError};
use uuid::Uuid;

/// Scripted catalog query: returns its rows, filtered by one field for
/// scoped fetches, counting every execution
struct Scripted<O> {
    rows: Mutex<Vec<MetaRow>>,
    scope_field: &'static str,
    fetch_count: AtomicUsize,
    _owner: PhantomData<fn(&O)>,
}

impl<O> Scripted<O> {
    fn new(scope_field: &'static str, rows: Vec<MetaRow>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            scope_field,
            fetch_count: AtomicUsize::new(0),
            _owner: PhantomData,
        })
    }

    fn empty(scope_field: &'static str) -> Arc<Self> {
        Self::new(scope_field, Vec::new())
    }

    fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn set_rows(&self, rows: Vec<MetaRow>) {
        *self.rows.lock() = rows;
    }
}

#[async_trait]
impl<O: Send + Sync> RowSource<O> for Scripted<O> {
    async fn fetch(&self, _owner: &O, scope: FetchScope<'_>) -> Result<Vec<MetaRow>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().clone();
        Ok(match scope.target() {
            None => rows,
            Some(name) => rows
                .into_iter()
                .filter(|r| r.text_opt(self.scope_field).as_deref() == Some(name))
                .collect(),
        })
    }
}

/// Typed constructors so the trait-object coercions below stay
/// unambiguous
fn schema_query(field: &'static str, rows: Vec<MetaRow>) -> Arc<Scripted<SchemaContext>> {
    Scripted::new(field, rows)
}

fn empty_schema_query(field: &'static str) -> Arc<Scripted<SchemaContext>> {
    Scripted::empty(field)
}

fn source_query(field: &'static str, rows: Vec<MetaRow>) -> Arc<Scripted<DataSourceContext>> {
    Scripted::new(field, rows)
}

struct Engine {
    model: DataSourceModel,
    tables: Arc<Scripted<SchemaContext>>,
    columns: Arc<Scripted<SchemaContext>>,
    constraints: Arc<Scripted<SchemaContext>>,
    schemas: Arc<Scripted<DataSourceContext>>,
}

fn engine() -> Engine {
    let schemas = source_query(
        "SCHEMA_NAME",
        vec![
            MetaRow::new().with("SCHEMA_NAME", "APP").with("OWNER", "SYS"),
            MetaRow::new().with("SCHEMA_NAME", "REPORTING"),
        ],
    );
    let tables = schema_query(
        "TABLE_NAME",
        vec![
            MetaRow::new().with("TABLE_NAME", "ORDERS").with("NUM_ROWS", 1200i64),
            MetaRow::new().with("TABLE_NAME", "CUSTOMERS").with("NUM_ROWS", 300i64),
        ],
    );
    let columns = schema_query(
        "TABLE_NAME",
        vec![
            column_row("ORDERS", "CUSTOMER_ID", 2, "NUMBER"),
            column_row("ORDERS", "ID", 1, "NUMBER"),
            column_row("CUSTOMERS", "ID", 1, "NUMBER"),
            column_row("CUSTOMERS", "NAME", 2, "VARCHAR2"),
        ],
    );
    let constraints = schema_query(
        "TABLE_NAME",
        vec![
            MetaRow::new()
                .with("TABLE_NAME", "ORDERS")
                .with("CONSTRAINT_NAME", "PK_ORDERS")
                .with("CONSTRAINT_TYPE", "P")
                .with("COLUMN_LIST", "ID"),
            MetaRow::new()
                .with("TABLE_NAME", "CUSTOMERS")
                .with("CONSTRAINT_NAME", "PK_CUSTOMERS")
                .with("CONSTRAINT_TYPE", "P")
                .with("COLUMN_LIST", "ID"),
            // References a table the schema listing never reported
            MetaRow::new()
                .with("TABLE_NAME", "ARCHIVED")
                .with("CONSTRAINT_NAME", "PK_ARCHIVED")
                .with("CONSTRAINT_TYPE", "P")
                .with("COLUMN_LIST", "ID"),
        ],
    );

    let schema_sources = SchemaSources {
        tables: tables.clone(),
        columns: columns.clone(),
        views: empty_schema_query("VIEW_NAME"),
        triggers: empty_schema_query("TRIGGER_NAME"),
        sequences: empty_schema_query("SEQUENCE_NAME"),
        packages: empty_schema_query("PACKAGE_NAME"),
        package_routines: empty_schema_query("PACKAGE_NAME"),
        procedures: empty_schema_query("ROUTINE_NAME"),
        procedure_parameters: empty_schema_query("ROUTINE_NAME"),
        indexes: empty_schema_query("TABLE_NAME"),
        constraints: constraints.clone(),
        foreign_keys: empty_schema_query("TABLE_NAME"),
    };
    let sources = DataSourceSources {
        schemas: schemas.clone(),
        users: source_query(
            "USER_NAME",
            vec![MetaRow::new().with("USER_NAME", "APP").with("LOCKED", "N")],
        ),
        roles: source_query(
            "ROLE_NAME",
            vec![MetaRow::new().with("ROLE_NAME", "DBA").with("BUILT_IN", "Y")],
        ),
        tablespaces: source_query(
            "TABLESPACE_NAME",
            vec![
                MetaRow::new()
                    .with("TABLESPACE_NAME", "USERS_TS")
                    .with("STATUS", "ONLINE"),
            ],
        ),
        tablespace_files: source_query(
            "TABLESPACE_NAME",
            vec![
                MetaRow::new()
                    .with("TABLESPACE_NAME", "USERS_TS")
                    .with("FILE_NAME", "users01.dbf")
                    .with("BYTES", 1048576i64),
                MetaRow::new()
                    .with("TABLESPACE_NAME", "USERS_TS")
                    .with("FILE_NAME", "users02.dbf")
                    .with("BYTES", 2097152i64),
            ],
        ),
    };

    let model = DataSourceModel::new(
        DataSourceContext {
            id: Uuid::new_v4(),
            name: "dev".to_string(),
        },
        sources,
        schema_sources,
        CatalogConfig::default(),
    );

    Engine {
        model,
        tables,
        columns,
        constraints,
        schemas,
    }
}

fn column_row(table: &str, column: &str, ordinal: i64, data_type: &str) -> MetaRow {
    MetaRow::new()
        .with("TABLE_NAME", table)
        .with("COLUMN_NAME", column)
        .with("ORDINAL_POSITION", ordinal)
        .with("DATA_TYPE", data_type)
        .with("NULLABLE", "Y")
}

#[tokio::test]
async fn test_browse_schemas_and_tables() {
    let engine = engine();
    let cancel = CancelToken::new();

    let schemas = engine.model.schemas(&cancel).await.unwrap();
    let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["APP", "REPORTING"]);

    let app = engine.model.schema_model("APP", &cancel).await.unwrap();
    let tables = app.tables(&cancel).await.unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["CUSTOMERS", "ORDERS"]);

    // The model is cached per schema
    let again = engine.model.schema_model("app", &cancel).await.unwrap();
    assert!(Arc::ptr_eq(&app, &again));

    let missing = engine.model.schema_model("GHOST", &cancel).await;
    assert!(matches!(missing, Err(StelaError::NotFound(_))));
}

#[tokio::test]
async fn test_columns_load_per_table_and_sort_by_ordinal() {
    let engine = engine();
    let cancel = CancelToken::new();
    let app = engine.model.schema_model("APP", &cancel).await.unwrap();

    let columns = app.table_columns("ORDERS", &cancel).await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ID", "CUSTOMER_ID"]);

    // One scoped query per table, cached afterwards
    app.table_columns("ORDERS", &cancel).await.unwrap();
    assert_eq!(engine.columns.fetches(), 1);
    app.table_columns("CUSTOMERS", &cancel).await.unwrap();
    assert_eq!(engine.columns.fetches(), 2);

    let column = app
        .table_column("ORDERS", "customer_id", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(column.data_type, "NUMBER");
}

#[tokio::test]
async fn test_constraints_assemble_across_the_schema() {
    let engine = engine();
    let cancel = CancelToken::new();
    let app = engine.model.schema_model("APP", &cancel).await.unwrap();

    let all = app.all_constraints(&cancel).await.unwrap();
    // The ARCHIVED row referenced an unknown table and was dropped
    assert_eq!(all.len(), 2);
    let pk = all.iter().find(|c| c.name == "PK_ORDERS").unwrap();
    assert_eq!(pk.table, "ORDERS");
    assert_eq!(pk.columns.len(), 1);
    assert_eq!(pk.columns[0].name, "ID");

    // Per-table view comes from the same load
    let orders = app.constraints_of("ORDERS", &cancel).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(engine.constraints.fetches(), 1);

    let unknown = app.constraints_of("GHOST", &cancel).await;
    assert!(matches!(unknown, Err(StelaError::NotFound(_))));
}

#[tokio::test]
async fn test_refresh_table_keeps_siblings_cached() {
    let engine = engine();
    let cancel = CancelToken::new();
    let app = engine.model.schema_model("APP", &cancel).await.unwrap();

    app.tables(&cancel).await.unwrap();
    let orders_cols_before = app.table_columns("ORDERS", &cancel).await.unwrap();
    let customers_cols_before = app.table_columns("CUSTOMERS", &cancel).await.unwrap();
    app.all_constraints(&cancel).await.unwrap();

    engine.tables.set_rows(vec![
        MetaRow::new()
            .with("TABLE_NAME", "ORDERS")
            .with("NUM_ROWS", 1500i64),
        MetaRow::new()
            .with("TABLE_NAME", "CUSTOMERS")
            .with("NUM_ROWS", 300i64),
    ]);
    engine.columns.set_rows(vec![
        column_row("ORDERS", "ID", 1, "NUMBER"),
        column_row("ORDERS", "CUSTOMER_ID", 2, "NUMBER"),
        column_row("ORDERS", "PLACED_AT", 3, "TIMESTAMP"),
        column_row("CUSTOMERS", "ID", 1, "NUMBER"),
        column_row("CUSTOMERS", "NAME", 2, "VARCHAR2"),
    ]);

    let refreshed = app
        .refresh_table("ORDERS", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.row_count_estimate, Some(1500));

    let orders_cols_after = app.table_columns("ORDERS", &cancel).await.unwrap();
    assert_eq!(orders_cols_after.len(), 3);
    assert_ne!(orders_cols_before.len(), orders_cols_after.len());

    // The sibling table's columns were neither refetched nor replaced
    let customers_cols_after = app.table_columns("CUSTOMERS", &cancel).await.unwrap();
    assert!(Arc::ptr_eq(
        &customers_cols_before[0],
        &customers_cols_after[0]
    ));

    // Derived composite caches reload lazily after the refresh
    let fetches_before = engine.constraints.fetches();
    app.all_constraints(&cancel).await.unwrap();
    assert_eq!(engine.constraints.fetches(), fetches_before + 1);
}

#[tokio::test]
async fn test_datasource_refresh_drops_everything() {
    let engine = engine();
    let cancel = CancelToken::new();

    let app_before = engine.model.schema_model("APP", &cancel).await.unwrap();
    app_before.tables(&cancel).await.unwrap();
    engine.model.users(&cancel).await.unwrap();
    assert_eq!(engine.schemas.fetches(), 1);

    engine.model.refresh();

    // Schema listing and schema models are rebuilt on next access
    engine.model.schemas(&cancel).await.unwrap();
    assert_eq!(engine.schemas.fetches(), 2);
    let app_after = engine.model.schema_model("APP", &cancel).await.unwrap();
    assert!(!Arc::ptr_eq(&app_before, &app_after));

    let tables_fetches = engine.tables.fetches();
    app_after.tables(&cancel).await.unwrap();
    assert_eq!(engine.tables.fetches(), tables_fetches + 1);
}

#[tokio::test]
async fn test_tablespaces_with_data_files() {
    let engine = engine();
    let cancel = CancelToken::new();

    let tablespaces = engine.model.tablespaces(&cancel).await.unwrap();
    assert_eq!(tablespaces.len(), 1);
    assert!(tablespaces[0].online);

    let files = engine
        .model
        .tablespace_files("USERS_TS", &cancel)
        .await
        .unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["users01.dbf", "users02.dbf"]);

    let roles = engine.model.roles(&cancel).await.unwrap();
    assert!(roles[0].built_in);
}

#[test]
fn test_entities_serialize_for_the_host() {
    let table = stela_catalog::TableInfo {
        schema: "APP".to_string(),
        name: "ORDERS".to_string(),
        tablespace: None,
        temporary: false,
        row_count_estimate: Some(1200),
        created: None,
        comment: None,
    };
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["name"], "ORDERS");
    assert_eq!(json["row_count_estimate"], 1200);
}
