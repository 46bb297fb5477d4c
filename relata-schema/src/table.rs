//! Table definitions

use crate::{Column, ColumnRef, Index, IndexType, SchemaResult, TableRef};
use relata_core::{DataType, SchemaError, Value};
use serde::{Deserialize, Serialize};

/// A table with its columns, primary key and secondary indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    table_ref: TableRef,
    columns: Vec<Column>,
    primary_key: Option<Index>,
    indexes: Vec<Index>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table_ref: TableRef::new(name),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
        }
    }

    /// Set the alias used to qualify this table's columns in generated SQL.
    /// Call before adding columns.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_ref.alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.table_ref.name
    }

    pub fn table_ref(&self) -> &TableRef {
        &self.table_ref
    }

    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        size: u32,
        required: bool,
    ) -> SchemaResult<ColumnRef> {
        self.add_column_with_default(name, data_type, size, required, None)
    }

    pub fn add_column_with_default(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        size: u32,
        required: bool,
        default_value: Option<Value>,
    ) -> SchemaResult<ColumnRef> {
        let name = name.into();
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(SchemaError::DuplicateObject {
                kind: "column".to_string(),
                name: format!("{}.{}", self.name(), name),
            });
        }
        let column = ColumnRef::new(self.table_ref.clone(), name, data_type);
        self.columns.push(Column {
            column: column.clone(),
            size,
            required,
            read_only: data_type == DataType::AutoInc,
            default_value,
        });
        Ok(column)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<ColumnRef> {
        self.column_def(name).map(|c| c.column.clone())
    }

    pub fn column_def(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    fn require_own_columns(&self, kind: &str, columns: &[ColumnRef]) -> SchemaResult<()> {
        for column in columns {
            if column.table.name != self.table_ref.name || self.column_def(&column.name).is_none() {
                return Err(SchemaError::UnknownColumn {
                    table: self.name().to_string(),
                    column: format!("{} (in {})", column.name, kind),
                });
            }
        }
        Ok(())
    }

    /// Define the primary key as index `<TABLE>_PK`.
    pub fn set_primary_key(&mut self, columns: Vec<ColumnRef>) -> SchemaResult<&Index> {
        self.require_own_columns("primary key", &columns)?;
        let mut index = Index::new(
            format!("{}_PK", self.name()),
            IndexType::PrimaryKey,
            columns,
        )?;
        index.attach(&self.table_ref)?;
        Ok(self.primary_key.insert(index))
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.primary_key.as_ref()
    }

    pub fn is_key_column(&self, column: &ColumnRef) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| pk.contains(column))
    }

    pub fn add_index(
        &mut self,
        name: impl Into<String>,
        index_type: IndexType,
        columns: Vec<ColumnRef>,
    ) -> SchemaResult<&Index> {
        let name = name.into();
        if self.indexes.iter().any(|i| i.name() == name) {
            return Err(SchemaError::DuplicateObject {
                kind: "index".to_string(),
                name,
            });
        }
        self.require_own_columns("index", &columns)?;
        let mut index = Index::new(name, index_type, columns)?;
        index.attach(&self.table_ref)?;
        self.indexes.push(index);
        Ok(&self.indexes[self.indexes.len() - 1])
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Find the index (primary key included) covering exactly `columns`.
    pub fn find_index(&self, columns: &[ColumnRef]) -> Option<&Index> {
        self.primary_key
            .iter()
            .chain(self.indexes.iter())
            .find(|i| i.compare_columns(columns))
    }

    /// Move the table into `schema`, rewriting every reference it owns.
    pub(crate) fn set_schema(&mut self, schema: Option<String>) {
        self.table_ref.schema = schema;
        let table_ref = self.table_ref.clone();
        for column in &mut self.columns {
            column.column.table = table_ref.clone();
        }
        if let Some(pk) = &mut self.primary_key {
            pk.rebind_table(&table_ref);
        }
        for index in &mut self.indexes {
            index.rebind_table(&table_ref);
        }
    }
}
