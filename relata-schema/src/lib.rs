//! RELATA Schema - Relational Metadata
//!
//! Static descriptors of a relational schema. SQL generation consults them;
//! they never talk to a database themselves.
//!
//! ```text
//! Database ─┬─ Table ─┬─ Column (ColumnRef)
//!           │         ├─ primary key (Index)
//!           │         └─ Index
//!           └─ Relation (source columns → target columns)
//! ```

pub mod column;
pub mod database;
pub mod index;
pub mod relation;
pub mod table;

pub use column::{Column, ColumnRef, TableRef};
pub use database::Database;
pub use index::{Index, IndexType};
pub use relation::{CascadeAction, ColumnReference, Relation};
pub use table::Table;

/// Result type alias for schema operations.
pub type SchemaResult<T> = Result<T, relata_core::SchemaError>;
