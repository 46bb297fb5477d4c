//! Command parameters
//!
//! A parameter is one `?` placeholder bound to a typed value. Large-object
//! types wrap their value into holder objects as it is assigned.

use relata_core::{BlobData, ClobData, CommandId, DataType, ParamId, Value};
use serde::{Deserialize, Serialize};

/// A parameter held by a command's parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdParam {
    id: ParamId,
    owner: Option<CommandId>,
    data_type: DataType,
    value: Value,
}

impl CmdParam {
    /// Create a parameter owned by `owner`. `None` marks a temporary
    /// parameter, discarded on the next generation pass.
    pub fn new(owner: Option<CommandId>, data_type: DataType, value: impl Into<Value>) -> Self {
        Self {
            id: ParamId::now_v7(),
            owner,
            data_type,
            value: coerce(data_type, value.into()),
        }
    }

    pub(crate) fn anonymous(data_type: DataType, value: Value) -> Self {
        Self::new(None, data_type, value)
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn owner(&self) -> Option<CommandId> {
        self.owner
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the value, applying the same coercion as construction.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = coerce(self.data_type, value.into());
    }

    /// Handle used to emit this parameter into SQL.
    pub fn to_ref(&self) -> ParamRef {
        ParamRef {
            id: self.id,
            data_type: self.data_type,
        }
    }
}

/// Lightweight handle to a declared parameter, embedded in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamRef {
    pub id: ParamId,
    pub data_type: DataType,
}

/// Wrap large-object values into their holders. Null stays null.
pub fn coerce(data_type: DataType, value: Value) -> Value {
    match (data_type, value) {
        (_, Value::Null) => Value::Null,
        (DataType::Blob, Value::Blob(blob)) => Value::Blob(blob),
        (DataType::Blob, Value::Bytes(bytes)) => Value::Blob(BlobData::new(bytes)),
        (DataType::Blob, other) => Value::Blob(BlobData::from_text(&other.to_string())),
        (DataType::Clob, Value::Clob(clob)) => Value::Clob(clob),
        (DataType::Clob, other) => Value::Clob(ClobData::new(other.to_string())),
        (_, other) => other,
    }
}
