//! Database: the registry of tables and relations

use crate::{CascadeAction, ColumnReference, Relation, SchemaResult, Table, TableRef};
use relata_core::{RelataConfig, SchemaError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A named schema holding tables and the relations between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    name: String,
    schema: Option<String>,
    tables: Vec<Table>,
    relations: Vec<Relation>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            tables: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Create a database using the configured schema prefix.
    pub fn with_config(name: impl Into<String>, config: &RelataConfig) -> Self {
        let mut db = Self::new(name);
        db.schema = config.schema.clone();
        db
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Register a table. The table takes the database's schema; column
    /// references must be fetched from the registered table afterwards.
    pub fn add_table(&mut self, mut table: Table) -> SchemaResult<&Table> {
        if self.table(table.name()).is_some() {
            return Err(SchemaError::DuplicateObject {
                kind: "table".to_string(),
                name: table.name().to_string(),
            });
        }
        table.set_schema(self.schema.clone());
        debug!(table = table.name(), database = %self.name, "table registered");
        self.tables.push(table);
        Ok(&self.tables[self.tables.len() - 1])
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    fn require_table(&self, table: &TableRef) -> SchemaResult<&Table> {
        self.table(&table.name).ok_or_else(|| SchemaError::UnknownTable {
            name: table.name.clone(),
        })
    }

    /// Register a foreign-key relation. Both tables and every column must
    /// already be registered.
    pub fn add_relation(
        &mut self,
        name: impl Into<String>,
        references: Vec<ColumnReference>,
        cascade_action: CascadeAction,
    ) -> SchemaResult<&Relation> {
        let mut relation = Relation::new(name, references, cascade_action)?;
        if self.relation(relation.name()).is_some() {
            return Err(SchemaError::DuplicateObject {
                kind: "relation".to_string(),
                name: relation.name().to_string(),
            });
        }
        let source = self.require_table(relation.source_table())?.table_ref().clone();
        let target = self.require_table(relation.target_table())?.table_ref().clone();
        for reference in relation.references() {
            for column in [&reference.source, &reference.target] {
                let table = self.require_table(&column.table)?;
                if table.column_def(&column.name).is_none() {
                    return Err(SchemaError::UnknownColumn {
                        table: table.name().to_string(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        relation.rebind_table(&source);
        relation.rebind_table(&target);
        self.relations.push(relation);
        Ok(&self.relations[self.relations.len() - 1])
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name() == name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.iter_mut().find(|r| r.name() == name)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Relations whose target is `table`, i.e. the tables depending on it.
    pub fn relations_referencing(&self, table: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.target_table().name == table)
            .collect()
    }
}
