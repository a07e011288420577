//! Tests for catalog row factories

use super::*;
use crate::model::SchemaContext;
use uuid::Uuid;

fn ctx() -> SchemaContext {
    SchemaContext {
        datasource: Uuid::new_v4(),
        schema: "APP".to_string(),
    }
}

#[test]
fn test_table_row_conversion() {
    let row = MetaRow::new()
        .with("TABLE_NAME", "ORDERS")
        .with("TABLESPACE_NAME", "USERS_TS")
        .with("TEMPORARY", "N")
        .with("NUM_ROWS", 1200i64)
        .with("COMMENTS", "sales orders");
    let table = TableRowFactory.convert(&ctx(), &row).unwrap();

    assert_eq!(table.name, "ORDERS");
    assert_eq!(table.schema, "APP");
    assert_eq!(table.tablespace.as_deref(), Some("USERS_TS"));
    assert!(!table.temporary);
    assert_eq!(table.row_count_estimate, Some(1200));
    assert_eq!(table.comment.as_deref(), Some("sales orders"));
}

#[test]
fn test_table_row_without_name_fails() {
    let row = MetaRow::new().with("COMMENTS", "nameless");
    assert!(matches!(
        TableRowFactory.convert(&ctx(), &row),
        Err(StelaError::RowField { .. })
    ));
}

#[test]
fn test_column_row_conversion() {
    let parent = TableInfo {
        schema: "APP".to_string(),
        name: "ORDERS".to_string(),
        tablespace: None,
        temporary: false,
        row_count_estimate: None,
        created: None,
        comment: None,
    };
    let row = MetaRow::new()
        .with("TABLE_NAME", "ORDERS")
        .with("COLUMN_NAME", "ID")
        .with("ORDINAL_POSITION", 1i64)
        .with("DATA_TYPE", "NUMBER")
        .with("NULLABLE", "N")
        .with("DATA_PRECISION", 38i64);

    assert_eq!(ColumnRowFactory.parent_key(&row).unwrap(), "ORDERS");
    let column = ColumnRowFactory.convert_child(&ctx(), &parent, &row).unwrap();
    assert_eq!(column.name, "ID");
    assert_eq!(column.table, "ORDERS");
    assert_eq!(column.ordinal, 1);
    assert!(!column.nullable);
    assert_eq!(ColumnRowFactory.ordinal(&column), Some(1));
}

#[test]
fn test_trigger_timing_decoding() {
    let row = MetaRow::new()
        .with("TRIGGER_NAME", "AUDIT_TRG")
        .with("TABLE_NAME", "ORDERS")
        .with("TIMING", "BEFORE")
        .with("TRIGGERING_EVENT", "INSERT OR UPDATE")
        .with("FOR_EACH_ROW", "Y")
        .with("STATUS", "ENABLED");
    let trigger = TriggerRowFactory.convert(&ctx(), &row).unwrap();
    assert_eq!(trigger.timing, TriggerTiming::Before);
    assert!(trigger.for_each_row);
    assert!(trigger.enabled);

    let bad = MetaRow::new()
        .with("TRIGGER_NAME", "T")
        .with("TIMING", "SOMETIME")
        .with("TRIGGERING_EVENT", "INSERT");
    assert!(matches!(
        TriggerRowFactory.convert(&ctx(), &bad),
        Err(StelaError::RowField { .. })
    ));
}

#[test]
fn test_constraint_kind_codes() {
    assert_eq!(ConstraintKind::from_code("P"), Some(ConstraintKind::PrimaryKey));
    assert_eq!(ConstraintKind::from_code("u"), Some(ConstraintKind::Unique));
    assert_eq!(ConstraintKind::from_code("CHECK"), Some(ConstraintKind::Check));
    assert_eq!(ConstraintKind::from_code("?"), None);
}

#[test]
fn test_foreign_key_parallel_lists_must_pair_up() {
    let fk = ForeignKeyInfo {
        name: "FK1".to_string(),
        table: "ORDERS".to_string(),
        ref_table: "CUSTOMERS".to_string(),
        delete_rule: ForeignKeyRule::Cascade,
        enabled: true,
        columns: Vec::new(),
    };

    let good = MetaRow::new()
        .with("COLUMN_LIST", "CUSTOMER_ID, REGION_ID")
        .with("REF_COLUMN_LIST", "ID, REGION_ID");
    let pairs = ForeignKeyAssembler.make_details(&ctx(), &fk, &good).unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].name, "CUSTOMER_ID");
    assert_eq!(pairs[0].ref_column, "ID");
    assert_eq!(pairs[1].position, 2);

    let mismatched = MetaRow::new()
        .with("COLUMN_LIST", "CUSTOMER_ID, REGION_ID")
        .with("REF_COLUMN_LIST", "ID");
    assert!(ForeignKeyAssembler.make_details(&ctx(), &fk, &mismatched).is_err());
}

#[test]
fn test_check_constraint_rows_carry_no_columns() {
    let check = ConstraintInfo {
        name: "CK1".to_string(),
        table: "ORDERS".to_string(),
        kind: ConstraintKind::Check,
        condition: Some("AMOUNT > 0".to_string()),
        enabled: true,
        columns: Vec::new(),
    };
    let row = MetaRow::new()
        .with("TABLE_NAME", "ORDERS")
        .with("CONSTRAINT_NAME", "CK1")
        .with("CONSTRAINT_TYPE", "C")
        .with("SEARCH_CONDITION", "AMOUNT > 0");
    let details = ConstraintAssembler.make_details(&ctx(), &check, &row).unwrap();
    assert!(details.is_empty());
}
