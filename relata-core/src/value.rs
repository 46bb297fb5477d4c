//! Scalar values bound to SQL literals and command parameters

use crate::{BlobData, ClobData};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An application enum constant captured by name and numeric value.
///
/// Rendered as its number when the declared type is numeric and as its
/// name otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

/// Implemented by application enums that can be stored in a column.
pub trait SqlEnum {
    fn sql_name(&self) -> &str;
    fn sql_ordinal(&self) -> i64;

    fn to_value(&self) -> Value {
        Value::Enum(EnumValue {
            name: self.sql_name().to_string(),
            ordinal: self.sql_ordinal(),
        })
    }
}

/// An entry of an option list: a stored value with a display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub value: Box<Value>,
    pub text: String,
}

impl OptionEntry {
    pub fn new(value: impl Into<Value>, text: impl Into<String>) -> Self {
        Self {
            value: Box::new(value.into()),
            text: text.into(),
        }
    }
}

/// A scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    Blob(BlobData),
    Clob(ClobData),
    Enum(EnumValue),
    Entry(OptionEntry),
    /// The database's current date/time, resolved by the dialect
    SysDate,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or empty text, which both render as SQL null.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Strip option entries down to their stored value.
    pub fn unwrap_entry(self) -> Value {
        match self {
            Value::Entry(entry) => entry.value.unwrap_entry(),
            other => other,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Clob(c) => Some(c.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Enum(e) => Some(e.ordinal),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", hex::encode(b)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Blob(b) => write!(f, "{}", b),
            Value::Clob(c) => write!(f, "{}", c),
            Value::Enum(e) => write!(f, "{}", e.name),
            Value::Entry(entry) => write!(f, "{}", entry.value),
            Value::SysDate => write!(f, "sysdate"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<BlobData> for Value {
    fn from(v: BlobData) -> Self {
        Value::Blob(v)
    }
}

impl From<ClobData> for Value {
    fn from(v: ClobData) -> Self {
        Value::Clob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
