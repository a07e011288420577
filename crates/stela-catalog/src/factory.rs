//! Row factories for the engine's catalog queries
//!
//! Each factory reads the column names the engine's catalog views
//! report. Conversion failures are per-row: batch loads skip the row and
//! keep going.

use crate::entity::*;
use crate::model::{DataSourceContext, SchemaContext};
use std::sync::Arc;
use stela_cache::CompositeFactory;
use stela_core::{
    ChildFactory, EntityFactory, MetaRow, Result, StelaError, split_delimited_list,
};

fn code_field<T>(row: &MetaRow, field: &str, decode: impl Fn(&str) -> Option<T>) -> Result<T> {
    let raw = row.text(field)?;
    decode(&raw).ok_or_else(|| StelaError::bad_field(field, format!("unknown code '{raw}'")))
}

// ---- datasource-level factories ----

pub struct SchemaRowFactory;

impl EntityFactory<DataSourceContext, SchemaInfo> for SchemaRowFactory {
    fn convert(&self, _owner: &DataSourceContext, row: &MetaRow) -> Result<SchemaInfo> {
        Ok(SchemaInfo {
            name: row.text("SCHEMA_NAME")?,
            owner: row.text_opt("OWNER"),
            default_tablespace: row.text_opt("DEFAULT_TABLESPACE"),
            created: row.timestamp_opt("CREATED"),
            comment: row.text_opt("COMMENTS"),
        })
    }
}

pub struct UserRowFactory;

impl EntityFactory<DataSourceContext, UserInfo> for UserRowFactory {
    fn convert(&self, _owner: &DataSourceContext, row: &MetaRow) -> Result<UserInfo> {
        Ok(UserInfo {
            name: row.text("USER_NAME")?,
            created: row.timestamp_opt("CREATED"),
            locked: row.flag("LOCKED", false),
            default_tablespace: row.text_opt("DEFAULT_TABLESPACE"),
            profile: row.text_opt("PROFILE"),
        })
    }
}

pub struct RoleRowFactory;

impl EntityFactory<DataSourceContext, RoleInfo> for RoleRowFactory {
    fn convert(&self, _owner: &DataSourceContext, row: &MetaRow) -> Result<RoleInfo> {
        Ok(RoleInfo {
            name: row.text("ROLE_NAME")?,
            built_in: row.flag("BUILT_IN", false),
            comment: row.text_opt("COMMENTS"),
        })
    }
}

pub struct TablespaceRowFactory;

impl EntityFactory<DataSourceContext, TablespaceInfo> for TablespaceRowFactory {
    fn convert(&self, _owner: &DataSourceContext, row: &MetaRow) -> Result<TablespaceInfo> {
        Ok(TablespaceInfo {
            name: row.text("TABLESPACE_NAME")?,
            online: row
                .text_opt("STATUS")
                .map(|s| s.eq_ignore_ascii_case("ONLINE"))
                .unwrap_or(true),
            total_bytes: row.int_opt("TOTAL_BYTES"),
            free_bytes: row.int_opt("FREE_BYTES"),
        })
    }
}

pub struct DataFileRowFactory;

impl ChildFactory<DataSourceContext, TablespaceInfo, DataFileInfo> for DataFileRowFactory {
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("TABLESPACE_NAME")
    }

    fn convert_child(
        &self,
        _owner: &DataSourceContext,
        parent: &TablespaceInfo,
        row: &MetaRow,
    ) -> Result<DataFileInfo> {
        Ok(DataFileInfo {
            file_name: row.text("FILE_NAME")?,
            tablespace: parent.name.clone(),
            size_bytes: row.int_opt("BYTES"),
            autoextend: row.flag("AUTOEXTENSIBLE", false),
            max_bytes: row.int_opt("MAX_BYTES"),
        })
    }
}

// ---- schema-level factories ----

pub struct TableRowFactory;

impl EntityFactory<SchemaContext, TableInfo> for TableRowFactory {
    fn convert(&self, owner: &SchemaContext, row: &MetaRow) -> Result<TableInfo> {
        Ok(TableInfo {
            schema: owner.schema.clone(),
            name: row.text("TABLE_NAME")?,
            tablespace: row.text_opt("TABLESPACE_NAME"),
            temporary: row.flag("TEMPORARY", false),
            row_count_estimate: row.int_opt("NUM_ROWS"),
            created: row.timestamp_opt("CREATED"),
            comment: row.text_opt("COMMENTS"),
        })
    }
}

pub struct ColumnRowFactory;

impl ChildFactory<SchemaContext, TableInfo, ColumnInfo> for ColumnRowFactory {
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("TABLE_NAME")
    }

    fn convert_child(
        &self,
        _owner: &SchemaContext,
        parent: &TableInfo,
        row: &MetaRow,
    ) -> Result<ColumnInfo> {
        Ok(ColumnInfo {
            name: row.text("COLUMN_NAME")?,
            table: parent.name.clone(),
            ordinal: row.int("ORDINAL_POSITION")?,
            data_type: row.text("DATA_TYPE")?,
            nullable: row.flag("NULLABLE", true),
            default_value: row.text_opt("DATA_DEFAULT"),
            max_length: row.int_opt("CHAR_LENGTH"),
            precision: row.int_opt("DATA_PRECISION"),
            scale: row.int_opt("DATA_SCALE"),
            comment: row.text_opt("COMMENTS"),
        })
    }

    fn ordinal(&self, child: &ColumnInfo) -> Option<i64> {
        Some(child.ordinal)
    }
}

pub struct ViewRowFactory;

impl EntityFactory<SchemaContext, ViewInfo> for ViewRowFactory {
    fn convert(&self, owner: &SchemaContext, row: &MetaRow) -> Result<ViewInfo> {
        Ok(ViewInfo {
            schema: owner.schema.clone(),
            name: row.text("VIEW_NAME")?,
            definition: row.text_opt("TEXT"),
            updatable: row.flag("UPDATABLE", false),
            comment: row.text_opt("COMMENTS"),
        })
    }
}

pub struct TriggerRowFactory;

impl EntityFactory<SchemaContext, TriggerInfo> for TriggerRowFactory {
    fn convert(&self, _owner: &SchemaContext, row: &MetaRow) -> Result<TriggerInfo> {
        Ok(TriggerInfo {
            name: row.text("TRIGGER_NAME")?,
            table: row.text_opt("TABLE_NAME"),
            timing: code_field(row, "TIMING", TriggerTiming::from_code)?,
            event: row.text("TRIGGERING_EVENT")?,
            for_each_row: row.flag("FOR_EACH_ROW", false),
            enabled: row.flag("STATUS", true),
        })
    }
}

pub struct SequenceRowFactory;

impl EntityFactory<SchemaContext, SequenceInfo> for SequenceRowFactory {
    fn convert(&self, _owner: &SchemaContext, row: &MetaRow) -> Result<SequenceInfo> {
        Ok(SequenceInfo {
            name: row.text("SEQUENCE_NAME")?,
            start_value: row.int_opt("START_VALUE"),
            increment: row.int_opt("INCREMENT_BY").unwrap_or(1),
            min_value: row.int_opt("MIN_VALUE"),
            max_value: row.int_opt("MAX_VALUE"),
            cycle: row.flag("CYCLE_FLAG", false),
            last_value: row.int_opt("LAST_NUMBER"),
        })
    }
}

pub struct PackageRowFactory;

impl EntityFactory<SchemaContext, PackageInfo> for PackageRowFactory {
    fn convert(&self, _owner: &SchemaContext, row: &MetaRow) -> Result<PackageInfo> {
        Ok(PackageInfo {
            name: row.text("PACKAGE_NAME")?,
            valid: row
                .text_opt("STATUS")
                .map(|s| s.eq_ignore_ascii_case("VALID"))
                .unwrap_or(true),
            created: row.timestamp_opt("CREATED"),
            comment: row.text_opt("COMMENTS"),
        })
    }
}

/// Routines declared inside a package
pub struct PackageRoutineRowFactory;

impl ChildFactory<SchemaContext, PackageInfo, ProcedureInfo> for PackageRoutineRowFactory {
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("PACKAGE_NAME")
    }

    fn convert_child(
        &self,
        _owner: &SchemaContext,
        parent: &PackageInfo,
        row: &MetaRow,
    ) -> Result<ProcedureInfo> {
        Ok(ProcedureInfo {
            name: row.text("ROUTINE_NAME")?,
            package: Some(parent.name.clone()),
            kind: code_field(row, "ROUTINE_TYPE", RoutineKind::from_code)?,
            language: row.text_opt("LANGUAGE"),
            return_type: row.text_opt("RETURN_TYPE"),
            deterministic: row.flag("DETERMINISTIC", false),
            valid: parent.valid,
        })
    }
}

/// Standalone (non-packaged) routines
pub struct ProcedureRowFactory;

impl EntityFactory<SchemaContext, ProcedureInfo> for ProcedureRowFactory {
    fn convert(&self, _owner: &SchemaContext, row: &MetaRow) -> Result<ProcedureInfo> {
        Ok(ProcedureInfo {
            name: row.text("ROUTINE_NAME")?,
            package: None,
            kind: code_field(row, "ROUTINE_TYPE", RoutineKind::from_code)?,
            language: row.text_opt("LANGUAGE"),
            return_type: row.text_opt("RETURN_TYPE"),
            deterministic: row.flag("DETERMINISTIC", false),
            valid: row
                .text_opt("STATUS")
                .map(|s| s.eq_ignore_ascii_case("VALID"))
                .unwrap_or(true),
        })
    }
}

pub struct ParameterRowFactory;

impl ChildFactory<SchemaContext, ProcedureInfo, ProcedureParameter> for ParameterRowFactory {
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("ROUTINE_NAME")
    }

    fn convert_child(
        &self,
        _owner: &SchemaContext,
        parent: &ProcedureInfo,
        row: &MetaRow,
    ) -> Result<ProcedureParameter> {
        Ok(ProcedureParameter {
            name: row.text("PARAMETER_NAME")?,
            routine: parent.name.clone(),
            position: row.int("POSITION")?,
            direction: code_field(row, "DIRECTION", ParameterDirection::from_code)?,
            data_type: row.text("DATA_TYPE")?,
        })
    }

    fn ordinal(&self, child: &ProcedureParameter) -> Option<i64> {
        Some(child.position)
    }
}

// ---- composite factories over the table cache ----

/// Indexes with their ordered columns, one query for the whole schema.
///
/// The engine reports one row per index column; some editions instead
/// denormalize the column list into a single delimited `COLUMN_LIST`
/// field, which decodes in declaration order.
pub struct IndexAssembler;

impl CompositeFactory<SchemaContext, TableInfo, IndexInfo, IndexColumn> for IndexAssembler {
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("TABLE_NAME")
    }

    fn object_key(&self, row: &MetaRow) -> Result<String> {
        row.text("INDEX_NAME")
    }

    fn make_object(
        &self,
        _owner: &SchemaContext,
        parent: &Arc<TableInfo>,
        row: &MetaRow,
    ) -> Result<IndexInfo> {
        Ok(IndexInfo {
            name: row.text("INDEX_NAME")?,
            table: parent.name.clone(),
            unique: row
                .text_opt("UNIQUENESS")
                .map(|s| s.eq_ignore_ascii_case("UNIQUE"))
                .unwrap_or(false),
            index_type: row
                .text_opt("INDEX_TYPE")
                .unwrap_or_else(|| "NORMAL".to_string()),
            tablespace: row.text_opt("TABLESPACE_NAME"),
            columns: Vec::new(),
        })
    }

    fn make_details(
        &self,
        _owner: &SchemaContext,
        _object: &IndexInfo,
        row: &MetaRow,
    ) -> Result<Vec<IndexColumn>> {
        if row.has("COLUMN_LIST") {
            let names = split_delimited_list(&row.text("COLUMN_LIST")?, ',');
            return Ok(names
                .into_iter()
                .enumerate()
                .map(|(i, name)| IndexColumn {
                    name,
                    position: i as i64 + 1,
                    descending: false,
                })
                .collect());
        }
        Ok(vec![IndexColumn {
            name: row.text("COLUMN_NAME")?,
            position: row.int("POSITION")?,
            descending: row.flag("DESCEND", false),
        }])
    }

    fn detail_ordinal(&self, detail: &IndexColumn) -> Option<i64> {
        Some(detail.position)
    }

    fn finish(&self, mut object: IndexInfo, details: Vec<IndexColumn>) -> IndexInfo {
        object.columns = details;
        object
    }
}

/// Constraints with their ordered columns
pub struct ConstraintAssembler;

impl CompositeFactory<SchemaContext, TableInfo, ConstraintInfo, ConstraintColumn>
    for ConstraintAssembler
{
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("TABLE_NAME")
    }

    fn object_key(&self, row: &MetaRow) -> Result<String> {
        row.text("CONSTRAINT_NAME")
    }

    fn make_object(
        &self,
        _owner: &SchemaContext,
        parent: &Arc<TableInfo>,
        row: &MetaRow,
    ) -> Result<ConstraintInfo> {
        Ok(ConstraintInfo {
            name: row.text("CONSTRAINT_NAME")?,
            table: parent.name.clone(),
            kind: code_field(row, "CONSTRAINT_TYPE", ConstraintKind::from_code)?,
            condition: row.text_opt("SEARCH_CONDITION"),
            enabled: row.flag("STATUS", true),
            columns: Vec::new(),
        })
    }

    fn make_details(
        &self,
        _owner: &SchemaContext,
        _object: &ConstraintInfo,
        row: &MetaRow,
    ) -> Result<Vec<ConstraintColumn>> {
        if row.has("COLUMN_LIST") {
            let names = split_delimited_list(&row.text("COLUMN_LIST")?, ',');
            return Ok(names
                .into_iter()
                .enumerate()
                .map(|(i, name)| ConstraintColumn {
                    name,
                    position: i as i64 + 1,
                })
                .collect());
        }
        // Check constraints carry no column rows
        if !row.has("COLUMN_NAME") {
            return Ok(Vec::new());
        }
        Ok(vec![ConstraintColumn {
            name: row.text("COLUMN_NAME")?,
            position: row.int("POSITION")?,
        }])
    }

    fn detail_ordinal(&self, detail: &ConstraintColumn) -> Option<i64> {
        Some(detail.position)
    }

    fn finish(&self, mut object: ConstraintInfo, details: Vec<ConstraintColumn>) -> ConstraintInfo {
        object.columns = details;
        object
    }
}

/// Foreign keys with their referencing/referenced column pairs
pub struct ForeignKeyAssembler;

impl CompositeFactory<SchemaContext, TableInfo, ForeignKeyInfo, ForeignKeyColumn>
    for ForeignKeyAssembler
{
    fn parent_key(&self, row: &MetaRow) -> Result<String> {
        row.text("TABLE_NAME")
    }

    fn object_key(&self, row: &MetaRow) -> Result<String> {
        row.text("CONSTRAINT_NAME")
    }

    fn make_object(
        &self,
        _owner: &SchemaContext,
        parent: &Arc<TableInfo>,
        row: &MetaRow,
    ) -> Result<ForeignKeyInfo> {
        Ok(ForeignKeyInfo {
            name: row.text("CONSTRAINT_NAME")?,
            table: parent.name.clone(),
            ref_table: row.text("REF_TABLE_NAME")?,
            delete_rule: row
                .text_opt("DELETE_RULE")
                .as_deref()
                .and_then(ForeignKeyRule::from_code)
                .unwrap_or_default(),
            enabled: row.flag("STATUS", true),
            columns: Vec::new(),
        })
    }

    fn make_details(
        &self,
        _owner: &SchemaContext,
        _object: &ForeignKeyInfo,
        row: &MetaRow,
    ) -> Result<Vec<ForeignKeyColumn>> {
        if row.has("COLUMN_LIST") {
            // Referencing and referenced columns arrive as two parallel
            // delimited lists; they must pair up position by position
            let names = split_delimited_list(&row.text("COLUMN_LIST")?, ',');
            let refs = split_delimited_list(&row.text("REF_COLUMN_LIST")?, ',');
            if names.len() != refs.len() {
                return Err(StelaError::bad_field(
                    "REF_COLUMN_LIST",
                    format!("{} columns paired with {} references", names.len(), refs.len()),
                ));
            }
            return Ok(names
                .into_iter()
                .zip(refs)
                .enumerate()
                .map(|(i, (name, ref_column))| ForeignKeyColumn {
                    name,
                    ref_column,
                    position: i as i64 + 1,
                })
                .collect());
        }
        Ok(vec![ForeignKeyColumn {
            name: row.text("COLUMN_NAME")?,
            ref_column: row.text("REF_COLUMN_NAME")?,
            position: row.int("POSITION")?,
        }])
    }

    fn detail_ordinal(&self, detail: &ForeignKeyColumn) -> Option<i64> {
        Some(detail.position)
    }

    fn finish(&self, mut object: ForeignKeyInfo, details: Vec<ForeignKeyColumn>) -> ForeignKeyInfo {
        object.columns = details;
        object
    }
}

#[cfg(test)]
mod tests;
