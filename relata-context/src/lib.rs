//! RELATA Context - Connection and Transaction Seam
//!
//! The SQL crates only produce `Statement { sql, values }`. This crate hands
//! those statements to a driver through the `Connection` trait and keeps the
//! transaction bookkeeping around them:
//! - `DbContext`: executes statements, commits and rolls back
//! - `RollbackHandler`: restores in-memory objects after a rollback
//! - `Record`: one table row with change tracking, read by key and written
//!   back with only its changed columns
//! - `MockConnection`: in-memory driver for tests

pub mod connection;
pub mod context;
pub mod record;
pub mod rollback;

pub use connection::{Connection, ExecutedStatement, MockConnection, Row};
pub use context::{DbContext, ExecutionStats};
pub use record::{Record, RecordState};
pub use rollback::{ReleaseAction, RollbackHandler, RollbackManager};

/// Result type alias for connection operations.
pub type ContextResult<T> = Result<T, relata_core::ContextError>;
