//! Records: one table row with per-field change tracking
//!
//! ```text
//!             create            set_value              update
//!  Invalid ───────────► New ─────────────► New ─────────────────► Valid
//!     │                                                           │  ▲
//!     └──── read(key) ─────────────────────► Valid ── set_value ──┘  │
//!                                              │                     │
//!                                              └──► Modified ─update──┘
//! ```
//!
//! `update` writes a new record with an INSERT of its non-empty fields and a
//! modified record with an UPDATE of the changed columns only, restricted by
//! the primary key.

use crate::connection::{Connection, Row};
use crate::context::DbContext;
use relata_core::{ContextError, RelataResult, Value};
use relata_schema::{Column, ColumnRef, Table};
use relata_sql::{key_condition, Command, Expr};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

// ============================================================================
// RECORD STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    /// Closed or never loaded. Fields are not accessible.
    Invalid,
    /// Loaded and unchanged since the last read or update.
    Valid,
    /// Loaded with at least one changed field.
    Modified,
    /// Created in memory, not yet inserted.
    New,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Invalid => "invalid",
            RecordState::Valid => "valid",
            RecordState::Modified => "modified",
            RecordState::New => "new",
        };
        f.write_str(name)
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// The fields of one row, in the column order of its table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: Table,
    state: RecordState,
    fields: Vec<Value>,
    modified: Vec<bool>,
}

impl Record {
    /// An invalid record bound to `table`.
    pub fn new(table: &Table) -> Self {
        let count = table.columns().len();
        Self {
            table: table.clone(),
            state: RecordState::Invalid,
            fields: vec![Value::Null; count],
            modified: vec![false; count],
        }
    }

    /// A new record with every field at its column default.
    pub fn create(table: &Table) -> Self {
        let mut record = Self::new(table);
        record.fields = table
            .columns()
            .iter()
            .map(|c| c.default_value.clone().unwrap_or(Value::Null))
            .collect();
        record.state = RecordState::New;
        record
    }

    /// Load the row of `table` whose primary key equals `key`.
    pub fn read<C: Connection>(
        ctx: &mut DbContext<C>,
        table: &Table,
        key: &[Value],
    ) -> RelataResult<Self> {
        let key_columns = primary_key_columns(table)?;
        let mut cmd = Command::new();
        cmd.select_all(table.columns().iter().map(|c| Expr::Column(c.column.clone())))
            .where_(key_condition(&key_columns, key)?);
        let row = ctx
            .query_single_row(&mut cmd)?
            .ok_or_else(|| ContextError::RecordNotFound {
                table: table.name().to_string(),
                key: format_key(key),
            })?;
        let mut record = Self::new(table);
        record.load(&row)?;
        debug!(table = table.name(), key = %format_key(key), "record read");
        Ok(record)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state != RecordState::Invalid
    }

    pub fn is_new(&self) -> bool {
        self.state == RecordState::New
    }

    /// True for new records and for loaded records with changed fields.
    pub fn is_modified(&self) -> bool {
        matches!(self.state, RecordState::Modified | RecordState::New)
    }

    pub fn value(&self, column: &str) -> RelataResult<&Value> {
        self.require_valid()?;
        let index = self.index_of(column)?;
        Ok(&self.fields[index])
    }

    pub fn was_modified(&self, column: &str) -> RelataResult<bool> {
        self.require_valid()?;
        let index = self.index_of(column)?;
        Ok(self.modified[index])
    }

    /// Primary key values in key column order.
    pub fn key(&self) -> RelataResult<Vec<Value>> {
        self.require_valid()?;
        primary_key_columns(&self.table)?
            .iter()
            .map(|c| self.index_of(&c.name).map(|i| self.fields[i].clone()))
            .collect()
    }

    /// Change one field. Setting the current value again is a no-op.
    ///
    /// Read-only columns are never writable; key columns only while the
    /// record is new.
    pub fn set_value(&mut self, column: &str, value: impl Into<Value>) -> RelataResult<()> {
        self.require_valid()?;
        let index = self.index_of(column)?;
        let value = value.into();
        let def = &self.table.columns()[index];
        if def.read_only || (!self.is_new() && self.table.is_key_column(&def.column)) {
            return Err(ContextError::FieldReadOnly {
                column: def.column.qualified_name(),
            }
            .into());
        }
        validate(def, &value)?;
        if self.fields[index] == value {
            return Ok(());
        }
        self.fields[index] = value;
        self.modified[index] = true;
        if self.state == RecordState::Valid {
            self.state = RecordState::Modified;
        }
        Ok(())
    }

    /// Write pending changes. A valid, unchanged record is left alone.
    pub fn update<C: Connection>(&mut self, ctx: &mut DbContext<C>) -> RelataResult<()> {
        match self.state {
            RecordState::Invalid => Err(self.wrong_state("valid").into()),
            RecordState::Valid => {
                debug!(table = self.table.name(), "record unchanged, nothing to update");
                Ok(())
            }
            RecordState::New => self.insert(ctx),
            RecordState::Modified => self.update_modified(ctx),
        }
    }

    /// Delete the row and close the record. A new record has no row yet and
    /// is only closed.
    pub fn delete<C: Connection>(&mut self, ctx: &mut DbContext<C>) -> RelataResult<()> {
        match self.state {
            RecordState::Invalid => return Err(self.wrong_state("valid").into()),
            RecordState::New => {
                self.close();
                return Ok(());
            }
            RecordState::Valid | RecordState::Modified => {}
        }
        let key_columns = primary_key_columns(&self.table)?;
        let key = self.key()?;
        let mut cmd = Command::new();
        cmd.where_(key_condition(&key_columns, &key)?);
        let affected = ctx.execute_delete(&mut cmd, self.table.table_ref())?;
        if affected == 0 {
            return Err(ContextError::RecordNotFound {
                table: self.table.name().to_string(),
                key: format_key(&key),
            }
            .into());
        }
        info!(table = self.table.name(), key = %format_key(&key), "record deleted");
        self.close();
        Ok(())
    }

    /// Invalidate the record and drop its field values.
    pub fn close(&mut self) {
        self.fields.iter_mut().for_each(|v| *v = Value::Null);
        self.modified.iter_mut().for_each(|m| *m = false);
        self.state = RecordState::Invalid;
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    fn insert<C: Connection>(&mut self, ctx: &mut DbContext<C>) -> RelataResult<()> {
        let mut cmd = Command::new();
        for (def, value) in self.table.columns().iter().zip(&self.fields) {
            if value.is_empty() {
                // auto-increment values are assigned by the database
                if def.required && !def.read_only {
                    return Err(ContextError::FieldNotNull {
                        column: def.column.qualified_name(),
                    }
                    .into());
                }
                continue;
            }
            cmd.set(&def.column, value.clone());
        }
        let affected = ctx.execute_insert(&mut cmd, self.table.table_ref())?;
        self.check_affected(affected)?;
        info!(table = self.table.name(), "record inserted");
        self.mark_stored();
        Ok(())
    }

    fn update_modified<C: Connection>(&mut self, ctx: &mut DbContext<C>) -> RelataResult<()> {
        let key_columns = primary_key_columns(&self.table)?;
        let key = self.key()?;
        let mut cmd = Command::new();
        let mut changed = 0usize;
        for ((def, value), modified) in self
            .table
            .columns()
            .iter()
            .zip(&self.fields)
            .zip(&self.modified)
        {
            if *modified && !self.table.is_key_column(&def.column) {
                cmd.set(&def.column, value.clone());
                changed += 1;
            }
        }
        if changed == 0 {
            self.mark_stored();
            return Ok(());
        }
        cmd.where_(key_condition(&key_columns, &key)?);
        let affected = ctx.execute_update(&mut cmd, self.table.table_ref())?;
        self.check_affected(affected)?;
        info!(
            table = self.table.name(),
            key = %format_key(&key),
            columns = changed,
            "record updated"
        );
        self.mark_stored();
        Ok(())
    }

    fn check_affected(&self, affected: u64) -> RelataResult<()> {
        if affected == 1 {
            return Ok(());
        }
        let key = self.key().map(|k| format_key(&k)).unwrap_or_default();
        Err(ContextError::RecordUpdateFailed {
            table: self.table.name().to_string(),
            key,
            affected,
        }
        .into())
    }

    fn mark_stored(&mut self) {
        self.modified.iter_mut().for_each(|m| *m = false);
        self.state = RecordState::Valid;
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn load(&mut self, row: &Row) -> RelataResult<()> {
        for (field, def) in self.fields.iter_mut().zip(self.table.columns()) {
            *field = row.get(def.name())?.clone();
        }
        self.modified.iter_mut().for_each(|m| *m = false);
        self.state = RecordState::Valid;
        Ok(())
    }

    fn index_of(&self, column: &str) -> RelataResult<usize> {
        self.table
            .columns()
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                ContextError::ColumnNotFound {
                    column: format!("{}.{}", self.table.name(), column),
                }
                .into()
            })
    }

    fn require_valid(&self) -> RelataResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.wrong_state("valid").into())
        }
    }

    fn wrong_state(&self, expected: &str) -> ContextError {
        ContextError::InvalidRecordState {
            table: self.table.name().to_string(),
            state: self.state.to_string(),
            expected: expected.to_string(),
        }
    }
}

fn primary_key_columns(table: &Table) -> RelataResult<Vec<ColumnRef>> {
    table
        .primary_key()
        .map(|pk| pk.columns().to_vec())
        .ok_or_else(|| {
            ContextError::NoPrimaryKey {
                table: table.name().to_string(),
            }
            .into()
        })
}

fn validate(def: &Column, value: &Value) -> Result<(), ContextError> {
    if def.check_value(value) {
        return Ok(());
    }
    if value.is_null() {
        Err(ContextError::FieldNotNull {
            column: def.column.qualified_name(),
        })
    } else {
        Err(ContextError::FieldValueInvalid {
            column: def.column.qualified_name(),
            value: value.to_string(),
        })
    }
}

fn format_key(key: &[Value]) -> String {
    key.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockConnection;
    use relata_core::{DataType, RelataError};
    use relata_sql::GenericDialect;

    fn employees() -> Table {
        let mut table = Table::new("EMPLOYEES").with_alias("t1");
        let id = table.add_column("ID", DataType::AutoInc, 0, true).unwrap();
        table
            .add_column("LASTNAME", DataType::Varchar, 40, true)
            .unwrap();
        table
            .add_column("SALARY", DataType::Integer, 0, false)
            .unwrap();
        table
            .add_column_with_default("RETIRED", DataType::Bool, 0, true, Some(Value::Bool(false)))
            .unwrap();
        table.set_primary_key(vec![id]).unwrap();
        table
    }

    fn context_with_row() -> DbContext<MockConnection> {
        let mut conn = MockConnection::new();
        conn.push_result(
            &["ID", "LASTNAME", "SALARY", "RETIRED"],
            vec![vec![
                Value::Int(5),
                Value::from("Lovelace"),
                Value::Int(1000),
                Value::Bool(false),
            ]],
        );
        DbContext::new(conn, GenericDialect::new())
    }

    #[test]
    fn test_read_by_key() {
        let table = employees();
        let mut ctx = context_with_row();
        let record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();

        assert_eq!(record.state(), RecordState::Valid);
        assert_eq!(record.value("LASTNAME").unwrap(), &Value::from("Lovelace"));
        assert_eq!(record.key().unwrap(), vec![Value::Int(5)]);
        let executed = &ctx.connection().unwrap().executed()[0];
        assert_eq!(
            executed.sql,
            "SELECT t1.ID, t1.LASTNAME, t1.SALARY, t1.RETIRED\r\nFROM EMPLOYEES t1\r\nWHERE t1.ID=5"
        );
    }

    #[test]
    fn test_read_missing_row() {
        let table = employees();
        let mut ctx = DbContext::new(MockConnection::new(), GenericDialect::new());
        let err = Record::read(&mut ctx, &table, &[Value::Int(9)]).unwrap_err();
        assert_eq!(
            err,
            RelataError::Context(ContextError::RecordNotFound {
                table: "EMPLOYEES".to_string(),
                key: "9".to_string(),
            })
        );
    }

    #[test]
    fn test_set_value_tracks_modification() {
        let table = employees();
        let mut ctx = context_with_row();
        let mut record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();

        record.set_value("LASTNAME", "Lovelace").unwrap();
        assert_eq!(record.state(), RecordState::Valid);

        record.set_value("SALARY", 1200).unwrap();
        assert_eq!(record.state(), RecordState::Modified);
        assert!(record.was_modified("SALARY").unwrap());
        assert!(!record.was_modified("LASTNAME").unwrap());
    }

    #[test]
    fn test_set_value_rejections() {
        let table = employees();
        let mut ctx = context_with_row();
        let mut record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();

        assert!(matches!(
            record.set_value("ID", 6),
            Err(RelataError::Context(ContextError::FieldReadOnly { .. }))
        ));
        assert!(matches!(
            record.set_value("LASTNAME", Value::Null),
            Err(RelataError::Context(ContextError::FieldNotNull { .. }))
        ));
        assert!(matches!(
            record.set_value("LASTNAME", "x".repeat(41)),
            Err(RelataError::Context(ContextError::FieldValueInvalid { .. }))
        ));
        assert!(matches!(
            record.set_value("EMAIL", "a@b"),
            Err(RelataError::Context(ContextError::ColumnNotFound { .. }))
        ));
        assert_eq!(record.state(), RecordState::Valid);
    }

    #[test]
    fn test_update_writes_only_changed_columns() {
        let table = employees();
        let mut ctx = context_with_row();
        let mut record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();
        record.set_value("SALARY", 1200).unwrap();
        record.update(&mut ctx).unwrap();

        assert_eq!(record.state(), RecordState::Valid);
        assert!(!record.was_modified("SALARY").unwrap());
        let executed = ctx.connection().unwrap().executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[1].sql, "UPDATE EMPLOYEES\r\nSET SALARY=1200\r\nWHERE ID=5");
        assert!(executed[1].values.is_empty());
    }

    #[test]
    fn test_update_of_unchanged_record_is_skipped() {
        let table = employees();
        let mut ctx = context_with_row();
        let mut record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();
        record.update(&mut ctx).unwrap();
        assert_eq!(ctx.connection().unwrap().executed().len(), 1);
    }

    #[test]
    fn test_update_reports_missing_row() {
        let table = employees();
        let mut conn = MockConnection::new().with_affected_rows(0);
        conn.push_result(
            &["ID", "LASTNAME", "SALARY", "RETIRED"],
            vec![vec![
                Value::Int(5),
                Value::from("Lovelace"),
                Value::Null,
                Value::Bool(false),
            ]],
        );
        let mut ctx = DbContext::new(conn, GenericDialect::new());
        let mut record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();
        record.set_value("LASTNAME", "Byron").unwrap();

        let err = record.update(&mut ctx).unwrap_err();
        assert!(matches!(
            err,
            RelataError::Context(ContextError::RecordUpdateFailed { affected: 0, .. })
        ));
        assert_eq!(record.state(), RecordState::Modified);
    }

    #[test]
    fn test_insert_new_record() {
        let table = employees();
        let mut ctx = DbContext::new(MockConnection::new(), GenericDialect::new());
        let mut record = Record::create(&table);
        assert!(record.is_new());
        assert!(matches!(
            record.update(&mut ctx),
            Err(RelataError::Context(ContextError::FieldNotNull { .. }))
        ));

        record.set_value("LASTNAME", "Hopper").unwrap();
        record.update(&mut ctx).unwrap();
        assert_eq!(record.state(), RecordState::Valid);

        let executed = ctx.connection().unwrap().executed();
        assert_eq!(executed.len(), 1);
        assert!(executed[0]
            .sql
            .starts_with("INSERT INTO EMPLOYEES( LASTNAME, RETIRED) VALUES ( 'Hopper', "));
    }

    #[test]
    fn test_delete_closes_record() {
        let table = employees();
        let mut ctx = context_with_row();
        let mut record = Record::read(&mut ctx, &table, &[Value::Int(5)]).unwrap();
        record.delete(&mut ctx).unwrap();

        assert_eq!(record.state(), RecordState::Invalid);
        assert!(record.value("LASTNAME").is_err());
        let executed = ctx.connection().unwrap().executed();
        assert_eq!(executed[1].sql, "DELETE FROM EMPLOYEES\r\nWHERE ID=5");
    }

    #[test]
    fn test_table_without_primary_key() {
        let mut table = Table::new("AUDIT");
        table.add_column("NOTE", DataType::Varchar, 0, false).unwrap();
        let mut ctx = DbContext::new(MockConnection::new(), GenericDialect::new());
        assert!(matches!(
            Record::read(&mut ctx, &table, &[Value::Int(1)]),
            Err(RelataError::Context(ContextError::NoPrimaryKey { .. }))
        ));
    }
}
