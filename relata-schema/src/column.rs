//! Table and column references

use relata_core::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a table (optionally schema-qualified and aliased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Name used to qualify column references: the alias if set.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Schema-prefixed table name.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Reference to a column of a specific table.
///
/// Cheap to clone; expressions, indexes and relations all hold these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: TableRef,
    pub name: String,
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn new(table: TableRef, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table,
            name: name.into(),
            data_type,
        }
    }

    /// `qualifier.NAME`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table.qualifier(), self.name)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Column definition as declared on its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub column: ColumnRef,
    pub size: u32,
    pub required: bool,
    pub read_only: bool,
    pub default_value: Option<Value>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn data_type(&self) -> DataType {
        self.column.data_type
    }

    /// Check a value against the declaration: required columns reject null,
    /// text columns reject values longer than `size` (when size is non-zero).
    pub fn check_value(&self, value: &Value) -> bool {
        if value.is_null() {
            return !self.required;
        }
        match (self.data_type().is_text(), value) {
            (true, Value::Text(s)) if self.size > 0 => s.chars().count() <= self.size as usize,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier_prefers_alias() {
        let mut table = TableRef::new("EMPLOYEES");
        assert_eq!(table.qualifier(), "EMPLOYEES");
        table.alias = Some("t1".to_string());
        assert_eq!(table.qualifier(), "t1");
        let col = ColumnRef::new(table, "ID", DataType::AutoInc);
        assert_eq!(col.qualified_name(), "t1.ID");
    }

    #[test]
    fn test_full_name_is_schema_prefixed() {
        let mut table = TableRef::new("EMPLOYEES");
        assert_eq!(table.full_name(), "EMPLOYEES");
        table.schema = Some("HR".to_string());
        assert_eq!(table.full_name(), "HR.EMPLOYEES");
    }

    #[test]
    fn test_check_value() {
        let column = Column {
            column: ColumnRef::new(TableRef::new("T"), "NAME", DataType::Varchar),
            size: 3,
            required: true,
            read_only: false,
            default_value: None,
        };
        assert!(!column.check_value(&Value::Null));
        assert!(column.check_value(&Value::from("abc")));
        assert!(!column.check_value(&Value::from("abcd")));
    }
}
