//! Foreign-key relations

use crate::{ColumnRef, SchemaResult, TableRef};
use relata_core::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to dependent rows when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CascadeAction {
    /// Deletion is refused while dependent rows exist
    #[default]
    None,
    /// The database deletes dependent rows (ON DELETE CASCADE)
    Cascade,
    /// Dependent rows are deleted by application code before the parent
    CascadeRecords,
}

/// One source → target column pair of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnReference {
    pub source: ColumnRef,
    pub target: ColumnRef,
}

impl ColumnReference {
    pub fn new(source: ColumnRef, target: ColumnRef) -> Self {
        Self { source, target }
    }
}

/// Foreign-key relation between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    name: String,
    references: Vec<ColumnReference>,
    cascade_action: CascadeAction,
}

impl Relation {
    /// All sources must belong to one table and all targets to one table.
    pub fn new(
        name: impl Into<String>,
        references: Vec<ColumnReference>,
        cascade_action: CascadeAction,
    ) -> SchemaResult<Self> {
        let name = name.into();
        let Some(first) = references.first() else {
            return Err(SchemaError::EmptyColumnList {
                kind: "relation".to_string(),
                name,
            });
        };
        let source_table = &first.source.table.name;
        let target_table = &first.target.table.name;
        for reference in &references {
            if &reference.source.table.name != source_table {
                return Err(SchemaError::RelationMismatch {
                    relation: name,
                    reason: format!(
                        "source column {} is not on table {}",
                        reference.source.name, source_table
                    ),
                });
            }
            if &reference.target.table.name != target_table {
                return Err(SchemaError::RelationMismatch {
                    relation: name,
                    reason: format!(
                        "target column {} is not on table {}",
                        reference.target.name, target_table
                    ),
                });
            }
        }
        Ok(Self {
            name,
            references,
            cascade_action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn references(&self) -> &[ColumnReference] {
        &self.references
    }

    /// The table holding the foreign key.
    pub fn source_table(&self) -> &TableRef {
        &self.references[0].source.table
    }

    /// The referenced table.
    pub fn target_table(&self) -> &TableRef {
        &self.references[0].target.table
    }

    pub fn cascade_action(&self) -> CascadeAction {
        self.cascade_action
    }

    pub fn set_cascade_action(&mut self, action: CascadeAction) {
        self.cascade_action = action;
    }

    /// Schema-prefixed relation name.
    pub fn full_name(&self) -> String {
        match &self.source_table().schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub(crate) fn rebind_table(&mut self, table: &TableRef) {
        for reference in &mut self.references {
            if reference.source.table.name == table.name {
                reference.source.table = table.clone();
            }
            if reference.target.table.name == table.name {
                reference.target.table = table.clone();
            }
        }
    }
}

fn quoted_list(columns: impl Iterator<Item = String>) -> String {
    columns
        .map(|name| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" CONSTRAINT \"{}\" FOREIGN KEY ({}) REFERENCES \"{}\" ({})",
            self.source_table().name,
            self.name,
            quoted_list(self.references.iter().map(|r| r.source.name.clone())),
            self.target_table().name,
            quoted_list(self.references.iter().map(|r| r.target.name.clone())),
        )
    }
}
