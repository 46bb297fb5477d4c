//! Index descriptors

use crate::{ColumnRef, SchemaResult, TableRef};
use relata_core::SchemaError;
use serde::{Deserialize, Serialize};

/// Kind of index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    Standard,
    Unique,
    /// Unique among non-null values
    UniqueAllowNull,
    PrimaryKey,
}

impl IndexType {
    pub fn is_unique(&self) -> bool {
        !matches!(self, IndexType::Standard)
    }
}

/// Index over an ordered list of columns of one table.
///
/// The column set is fixed at construction. An index is attached to at most
/// one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    name: String,
    index_type: IndexType,
    columns: Vec<ColumnRef>,
    table: Option<TableRef>,
}

impl Index {
    pub fn new(
        name: impl Into<String>,
        index_type: IndexType,
        columns: Vec<ColumnRef>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(SchemaError::EmptyColumnList {
                kind: "index".to_string(),
                name,
            });
        }
        Ok(Self {
            name,
            index_type,
            columns,
            table: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn table(&self) -> Option<&TableRef> {
        self.table.as_ref()
    }

    /// Attach the index to its table. Re-attaching to the same table is a no-op.
    pub fn attach(&mut self, table: &TableRef) -> SchemaResult<()> {
        match &self.table {
            Some(current) if current.name != table.name => Err(SchemaError::IndexAlreadyAttached {
                index: self.name.clone(),
                table: current.name.clone(),
            }),
            _ => {
                self.table = Some(table.clone());
                Ok(())
            }
        }
    }

    /// Schema-prefixed index name.
    pub fn full_name(&self) -> String {
        match self.table.as_ref().and_then(|t| t.schema.as_deref()) {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn contains(&self, column: &ColumnRef) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// 0-based position of `column`, `None` when the index does not cover it.
    pub fn position_of(&self, column: &ColumnRef) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// True if `columns` equals the index's columns in the same order.
    pub fn compare_columns(&self, columns: &[ColumnRef]) -> bool {
        self.columns.as_slice() == columns
    }

    pub(crate) fn rebind_table(&mut self, table: &TableRef) {
        for column in &mut self.columns {
            column.table = table.clone();
        }
        self.table = Some(table.clone());
    }
}
