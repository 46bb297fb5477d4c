//! RELATA Core - Values, Types and Errors
//!
//! Pure data definitions shared by every other RELATA crate:
//! - `DataType`: the declared SQL type of a column, parameter or literal
//! - `Value`: a scalar value travelling from the object graph to a bound `?`
//! - `BlobData` / `ClobData`: large-object holders used for positional binding
//! - `RelataConfig`: explicit configuration, no ambient globals
//! - error enums aggregated into `RelataError`

pub mod config;
pub mod data_type;
pub mod error;
pub mod identity;
pub mod lob;
pub mod value;

pub use config::RelataConfig;
pub use data_type::DataType;
pub use error::{
    ConfigError, ContextError, RelataError, RelataResult, SchemaError, SqlError, SqlResult,
};
pub use identity::{CommandId, ParamId};
pub use lob::{BlobData, ClobData};
pub use value::{EnumValue, OptionEntry, SqlEnum, Value};
