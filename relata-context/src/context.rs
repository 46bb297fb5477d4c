//! Database context: one connection, its dialect and its transaction

use crate::connection::{Connection, Row};
use crate::rollback::{ReleaseAction, RollbackHandler, RollbackManager};
use crate::ContextResult;
use relata_core::{ContextError, RelataResult};
use relata_schema::TableRef;
use relata_sql::{Command, DialectHandler, QueryExpr, Statement};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Counters of the work done through a context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub statements: u64,
    pub queries: u64,
    pub rows_affected: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

/// Executes generated statements on a connection and manages the
/// transaction around them.
pub struct DbContext<C: Connection> {
    connection: Option<C>,
    dialect: Box<dyn DialectHandler>,
    rollback: Option<RollbackManager>,
    stats: ExecutionStats,
}

impl<C: Connection> std::fmt::Debug for DbContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbContext")
            .field("connected", &self.connection.is_some())
            .field("rollback", &self.rollback)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<C: Connection> DbContext<C> {
    /// Context with rollback handling enabled.
    pub fn new(connection: C, dialect: impl DialectHandler + 'static) -> Self {
        Self {
            connection: Some(connection),
            dialect: Box::new(dialect),
            rollback: Some(RollbackManager::new()),
            stats: ExecutionStats::default(),
        }
    }

    pub fn with_rollback_handling(mut self, enabled: bool) -> Self {
        self.rollback = enabled.then(RollbackManager::new);
        self
    }

    pub fn dialect(&self) -> &dyn DialectHandler {
        self.dialect.as_ref()
    }

    pub fn stats(&self) -> ExecutionStats {
        self.stats
    }

    pub fn is_rollback_handling_enabled(&self) -> bool {
        self.rollback.is_some()
    }

    pub fn connection(&self) -> Option<&C> {
        self.connection.as_ref()
    }

    pub fn connection_mut(&mut self) -> ContextResult<&mut C> {
        self.connection.as_mut().ok_or(ContextError::NoConnection)
    }

    /// Detach the connection. Pending rollback handlers are discarded.
    pub fn close(&mut self) -> Option<C> {
        if let Some(manager) = self.rollback.as_mut() {
            manager.release(ReleaseAction::Discard);
        }
        self.connection.take()
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Run a generated statement that returns no rows.
    pub fn execute(&mut self, statement: &Statement) -> ContextResult<u64> {
        check_placeholders(statement)?;
        debug!(sql = %statement.sql, values = statement.values.len(), "executing statement");
        let affected = self.connection_mut()?.execute(&statement.sql, &statement.values)?;
        self.stats.statements += 1;
        self.stats.rows_affected += affected;
        Ok(affected)
    }

    /// Run a generated query.
    pub fn query(&mut self, statement: &Statement) -> ContextResult<Vec<Row>> {
        check_placeholders(statement)?;
        debug!(sql = %statement.sql, values = statement.values.len(), "executing query");
        let rows = self.connection_mut()?.query(&statement.sql, &statement.values)?;
        self.stats.queries += 1;
        Ok(rows)
    }

    /// Generate and run a SELECT.
    pub fn query_rows(&mut self, query: &mut QueryExpr) -> RelataResult<Vec<Row>> {
        let statement = query.select_statement(self.dialect.as_ref())?;
        Ok(self.query(&statement)?)
    }

    /// Generate and run a SELECT expected to return at most one row.
    pub fn query_single_row(&mut self, command: &mut Command) -> RelataResult<Option<Row>> {
        let statement = command.select_statement(self.dialect.as_ref())?;
        let mut rows = self.query(&statement)?;
        if rows.len() > 1 {
            warn!(rows = rows.len(), "single-row query returned several rows");
        }
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    pub fn execute_insert(&mut self, command: &mut Command, table: &TableRef) -> RelataResult<u64> {
        let statement = command.insert_statement(self.dialect.as_ref(), table)?;
        Ok(self.execute(&statement)?)
    }

    pub fn execute_update(&mut self, command: &mut Command, table: &TableRef) -> RelataResult<u64> {
        let statement = command.update_statement(self.dialect.as_ref(), table)?;
        Ok(self.execute(&statement)?)
    }

    pub fn execute_delete(&mut self, command: &mut Command, table: &TableRef) -> RelataResult<u64> {
        let statement = command.delete_statement(self.dialect.as_ref(), table)?;
        Ok(self.execute(&statement)?)
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Commit and discard the rollback handlers. Without a connection there
    /// is nothing to commit.
    pub fn commit(&mut self) -> ContextResult<()> {
        let Some(connection) = self.connection.as_mut() else {
            info!("no connection to commit changes");
            return Ok(());
        };
        if !connection.is_auto_commit() {
            connection
                .commit()
                .map_err(|e| ContextError::TransactionFailed {
                    reason: e.to_string(),
                })?;
        }
        self.stats.commits += 1;
        if let Some(manager) = self.rollback.as_mut() {
            manager.release(ReleaseAction::Discard);
        }
        Ok(())
    }

    /// Roll back and restore every object with a registered handler.
    pub fn rollback(&mut self) -> ContextResult<()> {
        let Some(connection) = self.connection.as_mut() else {
            info!("no connection to rollback changes");
            return Ok(());
        };
        info!("database rollback issued");
        connection
            .rollback()
            .map_err(|e| ContextError::TransactionFailed {
                reason: e.to_string(),
            })?;
        self.stats.rollbacks += 1;
        if let Some(manager) = self.rollback.as_mut() {
            manager.release(ReleaseAction::Rollback);
        }
        Ok(())
    }

    /// Register a handler to run if the current transaction rolls back.
    pub fn append_rollback_handler(&mut self, handler: Box<dyn RollbackHandler>) {
        match self.rollback.as_mut() {
            Some(manager) => manager.append(handler),
            None => warn!(
                object = handler.object_key(),
                "rollback handling is disabled for this context; handler ignored"
            ),
        }
    }

    pub fn remove_rollback_handler(&mut self, object_key: &str) -> bool {
        match self.rollback.as_mut() {
            Some(manager) => manager.remove(object_key),
            None => {
                warn!(object = object_key, "rollback handling is disabled for this context");
                false
            }
        }
    }

    pub fn pending_rollback_handlers(&self) -> usize {
        self.rollback.as_ref().map_or(0, RollbackManager::len)
    }
}

fn check_placeholders(statement: &Statement) -> ContextResult<()> {
    let placeholders = statement.placeholder_count();
    if placeholders != statement.values.len() {
        return Err(ContextError::ParamCountMismatch {
            placeholders,
            values: statement.values.len(),
        });
    }
    Ok(())
}
