//! Error types for RELATA operations

use crate::{DataType, ParamId};
use thiserror::Error;

/// SQL generation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlError {
    #[error("Invalid argument {argument}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("Invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A placeholder was emitted for a parameter the command never declared.
    #[error("Command parameter {param} has not been declared on this command")]
    ParamNotFound { param: ParamId },

    #[error("Operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("Invalid {data_type} literal '{value}': {reason}")]
    InvalidLiteral {
        data_type: DataType,
        value: String,
        reason: String,
    },

    #[error("Unknown column: {name}")]
    UnknownColumn { name: String },
}

/// Schema metadata errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate {kind} '{name}'")]
    DuplicateObject { kind: String, name: String },

    #[error("Index '{index}' is already attached to table '{table}'")]
    IndexAlreadyAttached { index: String, table: String },

    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    #[error("Unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },

    #[error("Relation '{relation}' is inconsistent: {reason}")]
    RelationMismatch { relation: String, reason: String },

    #[error("{kind} '{name}' requires at least one column")]
    EmptyColumnList { kind: String, name: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    ParseFailed { reason: String },
}

/// Connection and transaction errors raised by the context seam.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("No connection available")]
    NoConnection,

    #[error("Statement has {placeholders} placeholders but {values} values")]
    ParamCountMismatch { placeholders: usize, values: usize },

    #[error("Statement failed: {reason}")]
    StatementFailed { sql: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Column not found in row: {column}")]
    ColumnNotFound { column: String },

    #[error("Table {table} has no primary key")]
    NoPrimaryKey { table: String },

    #[error("Record {key} not found in {table}")]
    RecordNotFound { table: String, key: String },

    #[error("Record of {table} is {state}, expected {expected}")]
    InvalidRecordState {
        table: String,
        state: String,
        expected: String,
    },

    #[error("Update of record {key} in {table} affected {affected} rows")]
    RecordUpdateFailed {
        table: String,
        key: String,
        affected: u64,
    },

    #[error("Field {column} is read-only")]
    FieldReadOnly { column: String },

    #[error("Field {column} must not be null")]
    FieldNotNull { column: String },

    #[error("Invalid value for field {column}: {value}")]
    FieldValueInvalid { column: String, value: String },
}

/// Master error type for all RELATA errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelataError {
    #[error("SQL error: {0}")]
    Sql(#[from] SqlError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

/// Result type alias for RELATA operations.
pub type RelataResult<T> = Result<T, RelataError>;

/// Result type alias for SQL generation.
pub type SqlResult<T> = Result<T, SqlError>;

// =============================================================================
// TESTS
// =============================================================================
