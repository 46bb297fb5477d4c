//! Driver seam: connections, result rows and an in-memory mock

use crate::ContextResult;
use relata_core::{ContextError, Value};
use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// CONNECTION TRAIT
// ============================================================================

/// A live database connection that binds values positionally.
///
/// `values[i]` binds to the i-th `?` of `sql`.
pub trait Connection: Send {
    /// Run a statement that returns no rows. Returns the affected row count.
    fn execute(&mut self, sql: &str, values: &[Value]) -> ContextResult<u64>;

    /// Run a query and collect its rows.
    fn query(&mut self, sql: &str, values: &[Value]) -> ContextResult<Vec<Row>>;

    fn commit(&mut self) -> ContextResult<()>;

    fn rollback(&mut self) -> ContextResult<()>;

    /// Auto-commit connections make `commit` a no-op.
    fn is_auto_commit(&self) -> bool {
        false
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// One result row. Rows of the same result share their column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a column, matched case-insensitively.
    pub fn get(&self, column: &str) -> ContextResult<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| ContextError::ColumnNotFound {
                column: column.to_string(),
            })
    }

    /// The row as a flat JSON object keyed by column name.
    ///
    /// Numbers and booleans stay native; every other value is rendered as
    /// text.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(column, value)| (column.clone(), value_to_json(value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Entry(entry) => value_to_json(&entry.value),
        other => serde_json::Value::String(other.to_string()),
    }
}

// ============================================================================
// MOCK CONNECTION
// ============================================================================

/// A statement as received by the mock connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

/// In-memory connection for testing.
///
/// Records every statement, answers queries from a queue of scripted
/// results and fails statements containing a configured fragment.
#[derive(Debug, Default)]
pub struct MockConnection {
    executed: Vec<ExecutedStatement>,
    results: VecDeque<Vec<Row>>,
    affected_rows: u64,
    fail_on: Option<String>,
    auto_commit: bool,
    commits: usize,
    rollbacks: usize,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            affected_rows: 1,
            ..Self::default()
        }
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Row count reported by every `execute`.
    pub fn with_affected_rows(mut self, affected_rows: u64) -> Self {
        self.affected_rows = affected_rows;
        self
    }

    /// Fail every statement whose SQL contains `fragment`.
    pub fn fail_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on = Some(fragment.into());
        self
    }

    /// Queue the rows returned by the next query.
    pub fn push_result(&mut self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        self.results.push_back(
            rows.into_iter()
                .map(|values| Row::new(Arc::clone(&columns), values))
                .collect(),
        );
    }

    pub fn executed(&self) -> &[ExecutedStatement] {
        &self.executed
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    fn record(&mut self, sql: &str, values: &[Value]) -> ContextResult<()> {
        let placeholders = relata_sql::count_placeholders(sql);
        if placeholders != values.len() {
            return Err(ContextError::ParamCountMismatch {
                placeholders,
                values: values.len(),
            });
        }
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(ContextError::StatementFailed {
                    sql: sql.to_string(),
                    reason: format!("injected failure on '{}'", fragment),
                });
            }
        }
        self.executed.push(ExecutedStatement {
            sql: sql.to_string(),
            values: values.to_vec(),
        });
        Ok(())
    }
}

impl Connection for MockConnection {
    fn execute(&mut self, sql: &str, values: &[Value]) -> ContextResult<u64> {
        self.record(sql, values)?;
        Ok(self.affected_rows)
    }

    fn query(&mut self, sql: &str, values: &[Value]) -> ContextResult<Vec<Row>> {
        self.record(sql, values)?;
        Ok(self.results.pop_front().unwrap_or_default())
    }

    fn commit(&mut self) -> ContextResult<()> {
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> ContextResult<()> {
        self.rollbacks += 1;
        Ok(())
    }

    fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        let columns: Arc<[String]> = vec!["ID".to_string(), "NAME".to_string()].into();
        Row::new(columns, vec![Value::Int(1), Value::from("Ada")])
    }

    #[test]
    fn test_row_lookup_ignores_case() {
        let row = row();
        assert_eq!(row.get("name").unwrap(), &Value::from("Ada"));
        assert_eq!(
            row.get("EMAIL").unwrap_err(),
            ContextError::ColumnNotFound {
                column: "EMAIL".to_string()
            }
        );
    }

    #[test]
    fn test_row_to_json() {
        let json = row().to_json();
        assert_eq!(json["ID"], serde_json::json!(1));
        assert_eq!(json["NAME"], serde_json::json!("Ada"));
    }

    #[test]
    fn test_mock_checks_placeholders() {
        let mut conn = MockConnection::new();
        let err = conn.execute("DELETE FROM T WHERE ID=?", &[]).unwrap_err();
        assert_eq!(
            err,
            ContextError::ParamCountMismatch {
                placeholders: 1,
                values: 0
            }
        );
        assert!(conn.executed().is_empty());
    }

    #[test]
    fn test_mock_scripted_results() {
        let mut conn = MockConnection::new();
        conn.push_result(&["ID"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
        let rows = conn.query("SELECT ID FROM T", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(conn.query("SELECT ID FROM T", &[]).unwrap().is_empty());
        assert_eq!(conn.executed().len(), 2);
    }

    #[test]
    fn test_mock_failure_injection() {
        let mut conn = MockConnection::new().fail_on("EMPLOYEES");
        assert!(matches!(
            conn.execute("DELETE FROM EMPLOYEES", &[]),
            Err(ContextError::StatementFailed { .. })
        ));
        assert_eq!(conn.execute("DELETE FROM DEPARTMENTS", &[]).unwrap(), 1);
    }
}
