//! Declared SQL data types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a column, parameter or literal.
///
/// The type decides how a value is rendered into SQL text and how a command
/// parameter coerces the raw value it is given.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum DataType {
    /// Type not known; values are rendered in their display form
    #[default]
    Unknown,
    /// Integer number
    Integer,
    /// Auto-incremented integer key
    AutoInc,
    /// Variable length text
    Varchar,
    /// Calendar date without time
    Date,
    /// Time of day without date
    Time,
    /// Date and time of day
    DateTime,
    /// Date and time with sub-second precision
    Timestamp,
    /// Fixed length text
    Char,
    /// Floating point number
    Float,
    /// Fixed precision decimal number
    Decimal,
    /// Boolean flag
    Bool,
    /// Large text object
    Clob,
    /// Large binary object
    Blob,
    /// Globally unique identifier
    UniqueId,
}

impl DataType {
    /// Convert to the upper-case SQL-ish name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unknown => "UNKNOWN",
            DataType::Integer => "INTEGER",
            DataType::AutoInc => "AUTOINC",
            DataType::Varchar => "VARCHAR",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::DateTime => "DATETIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Char => "CHAR",
            DataType::Float => "FLOAT",
            DataType::Decimal => "DECIMAL",
            DataType::Bool => "BOOL",
            DataType::Clob => "CLOB",
            DataType::Blob => "BLOB",
            DataType::UniqueId => "UNIQUEID",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Varchar | DataType::Char | DataType::Clob)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Decimal | DataType::Float | DataType::AutoInc
        )
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::DateTime | DataType::Timestamp
        )
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Bool)
    }

    /// Large-object types are bound through holder objects.
    pub fn is_large_object(&self) -> bool {
        matches!(self, DataType::Blob | DataType::Clob)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when parsing an invalid data type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeParseError(pub String);

impl fmt::Display for DataTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid data type: {}", self.0)
    }
}

impl std::error::Error for DataTypeParseError {}

impl FromStr for DataType {
    type Err = DataTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UNKNOWN" => Ok(DataType::Unknown),
            "INTEGER" | "INT" => Ok(DataType::Integer),
            "AUTOINC" => Ok(DataType::AutoInc),
            // TEXT is the legacy spelling of VARCHAR
            "VARCHAR" | "TEXT" => Ok(DataType::Varchar),
            "DATE" => Ok(DataType::Date),
            "TIME" => Ok(DataType::Time),
            "DATETIME" => Ok(DataType::DateTime),
            "TIMESTAMP" => Ok(DataType::Timestamp),
            "CHAR" => Ok(DataType::Char),
            "FLOAT" | "DOUBLE" => Ok(DataType::Float),
            "DECIMAL" => Ok(DataType::Decimal),
            "BOOL" | "BOOLEAN" => Ok(DataType::Bool),
            "CLOB" => Ok(DataType::Clob),
            "BLOB" => Ok(DataType::Blob),
            "UNIQUEID" | "UUID" => Ok(DataType::UniqueId),
            _ => Err(DataTypeParseError(s.to_string())),
        }
    }
}
