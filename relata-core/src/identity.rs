//! Identity types for commands and command parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies the command that owns a parameter.
/// UUIDv7 keeps identifiers unique across every command in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh, timestamp-sortable id.
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a single declared command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(Uuid);

impl ParamId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ParamId::now_v7();
        let b = ParamId::now_v7();
        assert_ne!(a, b);

        let c = CommandId::now_v7();
        let d = CommandId::now_v7();
        assert_ne!(c, d);
    }

    #[test]
    fn test_display_matches_uuid() {
        let id = ParamId::new(Uuid::nil());
        assert_eq!(id.to_string(), Uuid::nil().to_string());
        assert_eq!(id.as_uuid(), Uuid::nil());
    }
}
