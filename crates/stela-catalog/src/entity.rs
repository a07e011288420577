//! Catalog entity types
//!
//! Plain data carriers for everything the browser displays. All of them
//! are obtained through the cache framework; none of them query on
//! their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stela_core::MetaObject;

/// Schema (namespace) information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub owner: Option<String>,
    pub default_tablespace: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Table information (basic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub tablespace: Option<String>,
    pub temporary: bool,
    /// Optimizer estimate, not an exact count
    pub row_count_estimate: Option<i64>,
    pub created: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Column information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub table: String,
    /// Declared position within the table
    pub ordinal: i64,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub comment: Option<String>,
}

/// View information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewInfo {
    pub schema: String,
    pub name: String,
    pub definition: Option<String>,
    pub updatable: bool,
    pub comment: Option<String>,
}

/// Index information, including its ordered column list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub table: String,
    pub unique: bool,
    pub index_type: String,
    pub tablespace: Option<String>,
    pub columns: Vec<IndexColumn>,
}

/// One column of an index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    pub position: i64,
    pub descending: bool,
}

/// Kind of a table constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Check,
    NotNull,
}

impl ConstraintKind {
    /// Decode the engine's single-letter catalog code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "P" | "PRIMARY KEY" => Some(ConstraintKind::PrimaryKey),
            "U" | "UNIQUE" => Some(ConstraintKind::Unique),
            "C" | "CHECK" => Some(ConstraintKind::Check),
            "N" | "NOT NULL" => Some(ConstraintKind::NotNull),
            _ => None,
        }
    }

    /// Convert to SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::Check => "CHECK",
            ConstraintKind::NotNull => "NOT NULL",
        }
    }
}

/// Table constraint with its ordered column list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintInfo {
    pub name: String,
    pub table: String,
    pub kind: ConstraintKind,
    /// Check condition text, for check constraints
    pub condition: Option<String>,
    pub enabled: bool,
    pub columns: Vec<ConstraintColumn>,
}

/// One constrained column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintColumn {
    pub name: String,
    pub position: i64,
}

/// Referential action on delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyRule {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    Restrict,
}

impl ForeignKeyRule {
    /// Decode the engine's catalog wording
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(ForeignKeyRule::NoAction),
            "CASCADE" => Some(ForeignKeyRule::Cascade),
            "SET NULL" => Some(ForeignKeyRule::SetNull),
            "RESTRICT" => Some(ForeignKeyRule::Restrict),
            _ => None,
        }
    }

    /// Convert to SQL clause
    pub fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyRule::NoAction => "NO ACTION",
            ForeignKeyRule::Cascade => "CASCADE",
            ForeignKeyRule::SetNull => "SET NULL",
            ForeignKeyRule::Restrict => "RESTRICT",
        }
    }
}

/// Foreign key with its ordered column pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: String,
    pub table: String,
    pub ref_table: String,
    pub delete_rule: ForeignKeyRule,
    pub enabled: bool,
    pub columns: Vec<ForeignKeyColumn>,
}

/// One referencing/referenced column pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyColumn {
    pub name: String,
    pub ref_column: String,
    pub position: i64,
}

/// When a trigger fires relative to the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    #[default]
    After,
    InsteadOf,
}

impl TriggerTiming {
    /// Decode the engine's catalog wording
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Some(TriggerTiming::Before),
            "AFTER" => Some(TriggerTiming::After),
            "INSTEAD OF" => Some(TriggerTiming::InsteadOf),
            _ => None,
        }
    }

    /// Convert to SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

/// Trigger information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub name: String,
    /// Owning table; schema-level triggers have none
    pub table: Option<String>,
    pub timing: TriggerTiming,
    /// Firing event list as reported (`INSERT OR UPDATE`, ...)
    pub event: String,
    pub for_each_row: bool,
    pub enabled: bool,
}

/// Sequence information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub name: String,
    pub start_value: Option<i64>,
    pub increment: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
    pub last_value: Option<i64>,
}

/// Kind of a stored routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PROCEDURE" => Some(RoutineKind::Procedure),
            "FUNCTION" => Some(RoutineKind::Function),
            _ => None,
        }
    }
}

/// Stored procedure or function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureInfo {
    pub name: String,
    /// Owning package for packaged routines
    pub package: Option<String>,
    pub kind: RoutineKind,
    pub language: Option<String>,
    pub return_type: Option<String>,
    pub deterministic: bool,
    pub valid: bool,
}

/// Direction of a routine parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterDirection {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(ParameterDirection::In),
            "OUT" => Some(ParameterDirection::Out),
            "IN OUT" | "INOUT" => Some(ParameterDirection::InOut),
            _ => None,
        }
    }
}

/// One routine parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureParameter {
    pub name: String,
    pub routine: String,
    pub position: i64,
    pub direction: ParameterDirection,
    pub data_type: String,
}

/// Package of stored routines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub valid: bool,
    pub created: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Database account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub created: Option<DateTime<Utc>>,
    pub locked: bool,
    pub default_tablespace: Option<String>,
    pub profile: Option<String>,
}

/// Role information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInfo {
    pub name: String,
    pub built_in: bool,
    pub comment: Option<String>,
}

/// Tablespace information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablespaceInfo {
    pub name: String,
    pub online: bool,
    pub total_bytes: Option<i64>,
    pub free_bytes: Option<i64>,
}

/// One data file backing a tablespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFileInfo {
    pub file_name: String,
    pub tablespace: String,
    pub size_bytes: Option<i64>,
    pub autoextend: bool,
    pub max_bytes: Option<i64>,
}

macro_rules! named_meta_object {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl MetaObject for $ty {
                fn object_name(&self) -> &str {
                    &self.$field
                }
            }
        )+
    };
}

named_meta_object! {
    SchemaInfo => name,
    TableInfo => name,
    ColumnInfo => name,
    ViewInfo => name,
    IndexInfo => name,
    ConstraintInfo => name,
    ForeignKeyInfo => name,
    TriggerInfo => name,
    SequenceInfo => name,
    ProcedureInfo => name,
    ProcedureParameter => name,
    PackageInfo => name,
    UserInfo => name,
    RoleInfo => name,
    TablespaceInfo => name,
    DataFileInfo => file_name,
}
