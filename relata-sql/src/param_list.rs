//! Parameter list with usage tracking
//!
//! The list keeps declared parameters plus a usage count, the *frontier*.
//! During generation every emitted placeholder notifies the list, which
//! moves the parameter to the frontier so that list order always matches
//! placeholder order in the SQL text:
//!
//! ```text
//! declared:  [a, b, c]      usage 0
//! emit b  -> [b, a, c]      usage 1
//! emit b  -> [b, b', a, c]  usage 2   (b' = temporary copy)
//! emit a  -> [b, b', a, c]  usage 3
//! ```
//!
//! Positions `[0, usage)` are the values to bind.

use crate::param::CmdParam;
use relata_core::{CommandId, DataType, ParamId, SqlError, SqlResult, Value};
use tracing::{debug, warn};

/// Ordered parameters of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CmdParamList {
    params: Vec<CmdParam>,
    usage: usize,
    warn_unused: bool,
}

impl Default for CmdParamList {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            usage: 0,
            warn_unused: true,
        }
    }
}

impl CmdParamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the warnings logged for declared-but-unused parameters.
    pub fn with_warn_unused(mut self, warn_unused: bool) -> Self {
        self.warn_unused = warn_unused;
        self
    }

    pub fn add(&mut self, param: CmdParam) {
        self.params.push(param);
    }

    /// Remove a parameter. Removing an unknown parameter only logs.
    pub fn remove(&mut self, id: ParamId) -> Option<CmdParam> {
        match self.position(id) {
            Some(index) => {
                if index < self.usage {
                    self.usage -= 1;
                }
                Some(self.params.remove(index))
            }
            None => {
                warn!(param = %id, "unable to remove command parameter: not found");
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.params.clear();
        self.usage = 0;
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of parameters emitted so far in the current pass.
    pub fn usage_count(&self) -> usize {
        self.usage
    }

    pub fn get(&self, id: ParamId) -> Option<&CmdParam> {
        self.params.iter().find(|p| p.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CmdParam> {
        self.params.iter()
    }

    pub fn set_value(&mut self, id: ParamId, value: impl Into<Value>) -> SqlResult<()> {
        let param = self
            .params
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or(SqlError::ParamNotFound { param: id })?;
        param.set_value(value);
        Ok(())
    }

    fn position(&self, id: ParamId) -> Option<usize> {
        self.params.iter().position(|p| p.id() == id)
    }

    /// Record that the placeholder of `id` was just emitted.
    pub fn notify_usage(&mut self, id: ParamId) -> SqlResult<()> {
        let index = self
            .position(id)
            .ok_or(SqlError::ParamNotFound { param: id })?;
        if index < self.usage {
            let original = &self.params[index];
            debug!(param = %id, position = self.usage, "parameter used twice, adding a temporary copy");
            let copy = CmdParam::anonymous(original.data_type(), original.value().clone());
            self.params.insert(self.usage, copy);
        } else if index > self.usage {
            let param = self.params.remove(index);
            self.params.insert(self.usage, param);
        }
        self.usage += 1;
        Ok(())
    }

    /// Values to bind, in placeholder order.
    pub fn bound_values(&self) -> Vec<Value> {
        if self.warn_unused && self.usage != self.params.len() {
            warn!(
                declared = self.params.len(),
                used = self.usage,
                "command parameter count does not match parameter use count"
            );
        }
        self.params[..self.usage]
            .iter()
            .map(|p| p.value().clone())
            .collect()
    }

    /// Start a generation pass: reset the frontier and drop every parameter
    /// not owned by `owner`.
    pub fn reset_usage(&mut self, owner: CommandId) {
        self.usage = 0;
        self.params.retain(|p| p.owner() == Some(owner));
    }

    /// Finish a generation pass: drop unused parameters not owned by `owner`.
    pub fn complete_usage(&mut self, owner: CommandId) {
        if self.usage >= self.params.len() {
            return;
        }
        if self.warn_unused {
            warn!(
                unused = self.params.len() - self.usage,
                "command has unused parameters"
            );
        }
        let mut index = self.usage;
        while index < self.params.len() {
            if self.params[index].owner() == Some(owner) {
                index += 1;
            } else {
                self.params.remove(index);
            }
        }
    }

    /// Splice the values bound by `other` in at the frontier.
    pub fn merge_sub_params(&mut self, other: &CmdParamList) {
        let values: Vec<Value> = other.params[..other.usage]
            .iter()
            .map(|p| p.value().clone())
            .collect();
        self.merge_values(values);
    }

    /// Splice already bound values in at the frontier as temporary
    /// `Unknown`-typed parameters.
    pub fn merge_values(&mut self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.params
                .insert(self.usage, CmdParam::anonymous(DataType::Unknown, value));
            self.usage += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(owner: CommandId, value: i64) -> CmdParam {
        CmdParam::new(Some(owner), DataType::Integer, value)
    }

    #[test]
    fn test_usage_reorders_to_frontier() {
        let cmd = CommandId::now_v7();
        let mut list = CmdParamList::new();
        let a = owned(cmd, 1);
        let b = owned(cmd, 2);
        let (ida, idb) = (a.id(), b.id());
        list.add(a);
        list.add(b);

        list.notify_usage(idb).unwrap();
        list.notify_usage(ida).unwrap();
        assert_eq!(list.bound_values(), vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_reuse_inserts_temporary_copy() {
        let cmd = CommandId::now_v7();
        let mut list = CmdParamList::new();
        let a = owned(cmd, 5);
        let ida = a.id();
        list.add(a);

        list.notify_usage(ida).unwrap();
        list.notify_usage(ida).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.usage_count(), 2);
        assert_eq!(list.bound_values(), vec![Value::Int(5), Value::Int(5)]);

        // the copy is temporary and disappears on the next pass
        list.reset_usage(cmd);
        assert_eq!(list.len(), 1);
        assert_eq!(list.usage_count(), 0);
    }

    #[test]
    fn test_undeclared_param_fails() {
        let mut list = CmdParamList::new();
        let stray = CmdParam::new(None, DataType::Integer, 1);
        let err = list.notify_usage(stray.id()).unwrap_err();
        assert_eq!(err, SqlError::ParamNotFound { param: stray.id() });
    }

    #[test]
    fn test_complete_usage_prunes_temporary_only() {
        let cmd = CommandId::now_v7();
        let mut list = CmdParamList::new();
        let a = owned(cmd, 1);
        let ida = a.id();
        list.add(a);
        list.add(owned(cmd, 2));
        list.add(CmdParam::new(None, DataType::Integer, 3));

        list.reset_usage(cmd);
        list.add(CmdParam::new(None, DataType::Integer, 4));
        list.notify_usage(ida).unwrap();
        list.complete_usage(cmd);

        assert_eq!(list.len(), 2);
        assert_eq!(list.bound_values(), vec![Value::Int(1)]);
    }

    #[test]
    fn test_merge_lands_at_frontier() {
        let cmd = CommandId::now_v7();
        let mut list = CmdParamList::new();
        let a = owned(cmd, 1);
        let b = owned(cmd, 2);
        let (ida, idb) = (a.id(), b.id());
        list.add(a);
        list.add(b);

        list.notify_usage(ida).unwrap();
        list.merge_values(vec![Value::from("x"), Value::from("y")]);
        list.notify_usage(idb).unwrap();

        assert_eq!(
            list.bound_values(),
            vec![Value::Int(1), Value::from("x"), Value::from("y"), Value::Int(2)]
        );
    }

    #[test]
    fn test_merge_sub_params_uses_bound_values() {
        let sub_cmd = CommandId::now_v7();
        let mut sub = CmdParamList::new();
        let used = owned(sub_cmd, 10);
        let used_id = used.id();
        sub.add(used);
        sub.add(owned(sub_cmd, 11));
        sub.notify_usage(used_id).unwrap();

        let mut outer = CmdParamList::new();
        outer.merge_sub_params(&sub);
        assert_eq!(outer.bound_values(), vec![Value::Int(10)]);
        assert_eq!(outer.iter().next().unwrap().data_type(), DataType::Unknown);
    }

    #[test]
    fn test_remove_and_set_value() {
        let cmd = CommandId::now_v7();
        let mut list = CmdParamList::new();
        let a = owned(cmd, 1);
        let ida = a.id();
        list.add(a);

        list.set_value(ida, 9).unwrap();
        assert_eq!(list.get(ida).unwrap().value(), &Value::Int(9));
        assert!(list.remove(ida).is_some());
        assert!(list.remove(ida).is_none());
        assert!(list.is_empty());
        assert!(list.set_value(ida, 1).is_err());
    }
}
