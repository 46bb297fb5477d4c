//! RELATA SQL - Parameterized SQL Composition
//!
//! Builds SQL text from an expression graph and collects the values bound to
//! its `?` placeholders:
//!
//! ```text
//! Command ──┬── Expr tree ──► SqlBuilder ──► DialectHandler (phrases, literals)
//!           └── CmdParamList ◄── notify_usage (placeholder order)
//!                      │
//!                      ▼
//!               Statement { sql, values }
//! ```
//!
//! Every generated `Statement` has exactly one value per placeholder, in
//! placeholder order. A parameter used twice is bound twice through a
//! temporary copy; the values of embedded sub-queries are spliced in where
//! the sub-query appears.

pub mod builder;
pub mod combined;
pub mod command;
pub mod dialect;
pub mod expr;
pub mod param;
pub mod param_list;

pub use builder::{count_placeholders, SqlBuilder};
pub use combined::{CombinedCommand, QueryExpr};
pub use command::{key_condition, Command, JoinExpr, JoinType, OrderByExpr, SetExpr, Statement};
pub use dialect::{format_literal, DialectHandler, GenericDialect, SqlPhrase};
pub use expr::{CompareOp, Expr, FuncTemplate, Operand, SqlContext};
pub use param::{CmdParam, ParamRef};
pub use param_list::CmdParamList;
