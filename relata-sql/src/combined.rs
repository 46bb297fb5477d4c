//! Combined commands: UNION, UNION ALL, INTERSECT and EXCEPT
//!
//! Both sides are complete queries. Their bound values are merged into the
//! combined command's own parameter list in emission order, so the values
//! of the left side always precede those of the right side.

use crate::builder::SqlBuilder;
use crate::command::{Command, Statement};
use crate::dialect::DialectHandler;
use crate::expr::Expr;
use crate::param_list::CmdParamList;
use relata_core::{CommandId, SqlError, SqlResult, Value};
use relata_schema::ColumnRef;
use std::collections::BTreeSet;

/// A complete query: a plain SELECT command or a combination of queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Select(Command),
    Combined(CombinedCommand),
}

impl From<Command> for QueryExpr {
    fn from(cmd: Command) -> Self {
        QueryExpr::Select(cmd)
    }
}

impl From<CombinedCommand> for QueryExpr {
    fn from(cmd: CombinedCommand) -> Self {
        QueryExpr::Combined(cmd)
    }
}

impl QueryExpr {
    pub fn is_valid(&self) -> bool {
        match self {
            QueryExpr::Select(cmd) => cmd.is_valid(),
            QueryExpr::Combined(cmd) => cmd.is_valid(),
        }
    }

    pub fn select_exprs(&self) -> &[Expr] {
        match self {
            QueryExpr::Select(cmd) => cmd.select_exprs(),
            QueryExpr::Combined(cmd) => cmd.select_exprs(),
        }
    }

    pub fn param_values(&self) -> Vec<Value> {
        match self {
            QueryExpr::Select(cmd) => cmd.param_values(),
            QueryExpr::Combined(cmd) => cmd.param_values(),
        }
    }

    pub fn add_referenced_columns(&self, columns: &mut BTreeSet<ColumnRef>) {
        match self {
            QueryExpr::Select(cmd) => cmd.add_referenced_columns(columns),
            QueryExpr::Combined(cmd) => cmd.add_referenced_columns(columns),
        }
    }

    pub fn clear_order_by(&mut self) {
        match self {
            QueryExpr::Select(cmd) => {
                cmd.clear_order_by();
            }
            QueryExpr::Combined(cmd) => cmd.order_by.clear(),
        }
    }

    pub fn select_statement(&mut self, dialect: &dyn DialectHandler) -> SqlResult<Statement> {
        match self {
            QueryExpr::Select(cmd) => cmd.select_statement(dialect),
            QueryExpr::Combined(cmd) => cmd.select_statement(dialect),
        }
    }

    /// Render without modifying the query, for embedding as a sub-query.
    pub fn render(&self, dialect: &dyn DialectHandler) -> SqlResult<Statement> {
        match self {
            QueryExpr::Select(cmd) => cmd.render_select(dialect),
            QueryExpr::Combined(cmd) => cmd.render(dialect),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CombinedOrder {
    name: String,
    descending: bool,
}

/// Two queries joined by a set operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCommand {
    id: CommandId,
    left: Box<QueryExpr>,
    keyword: String,
    right: Box<QueryExpr>,
    params: CmdParamList,
    order_by: Vec<CombinedOrder>,
}

impl CombinedCommand {
    pub fn new(
        left: impl Into<QueryExpr>,
        keyword: impl Into<String>,
        right: impl Into<QueryExpr>,
    ) -> Self {
        Self {
            id: CommandId::now_v7(),
            left: Box::new(left.into()),
            keyword: keyword.into(),
            right: Box::new(right.into()),
            params: CmdParamList::new(),
            order_by: Vec::new(),
        }
    }

    pub fn union(left: impl Into<QueryExpr>, right: impl Into<QueryExpr>) -> Self {
        Self::new(left, "UNION", right)
    }

    pub fn union_all(left: impl Into<QueryExpr>, right: impl Into<QueryExpr>) -> Self {
        Self::new(left, "UNION ALL", right)
    }

    pub fn intersect(left: impl Into<QueryExpr>, right: impl Into<QueryExpr>) -> Self {
        Self::new(left, "INTERSECT", right)
    }

    pub fn except(left: impl Into<QueryExpr>, right: impl Into<QueryExpr>) -> Self {
        Self::new(left, "EXCEPT", right)
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn left(&self) -> &QueryExpr {
        &self.left
    }

    pub fn right(&self) -> &QueryExpr {
        &self.right
    }

    pub fn is_valid(&self) -> bool {
        self.left.is_valid() && self.right.is_valid()
    }

    /// The left side's select list names the result columns.
    pub fn select_exprs(&self) -> &[Expr] {
        self.left.select_exprs()
    }

    pub fn add_referenced_columns(&self, columns: &mut BTreeSet<ColumnRef>) {
        self.left.add_referenced_columns(columns);
        self.right.add_referenced_columns(columns);
    }

    /// Left values followed by right values, as bound by the last pass.
    pub fn param_values(&self) -> Vec<Value> {
        let mut values = self.left.param_values();
        values.extend(self.right.param_values());
        values
    }

    /// Order the combined result by a column of the left select list.
    ///
    /// The ORDER BY renders the column's output name, unqualified.
    pub fn order_by(&mut self, expr: &Expr, descending: bool) -> SqlResult<&mut Self> {
        let name = self
            .left
            .select_exprs()
            .iter()
            .find(|e| {
                *e == expr || matches!(e, Expr::Alias { expr: inner, .. } if **inner == *expr)
            })
            .and_then(Expr::output_name)
            .ok_or_else(|| SqlError::UnknownColumn {
                name: expr.output_name().unwrap_or("expression").to_string(),
            })?
            .to_string();
        self.order_by.push(CombinedOrder { name, descending });
        Ok(self)
    }

    pub fn select_statement(&mut self, dialect: &dyn DialectHandler) -> SqlResult<Statement> {
        let mut params = std::mem::take(&mut self.params);
        params.clear();
        let result = self.emit_into(&mut params, dialect);
        self.params = params;
        result
    }

    /// Render a copy, leaving this command untouched.
    pub fn render(&self, dialect: &dyn DialectHandler) -> SqlResult<Statement> {
        self.clone().select_statement(dialect)
    }

    fn emit_into(
        &mut self,
        params: &mut CmdParamList,
        dialect: &dyn DialectHandler,
    ) -> SqlResult<Statement> {
        let sql = {
            let mut b = SqlBuilder::with_params(dialect, params);
            self.emit_body(&mut b)?;
            if !self.order_by.is_empty() {
                b.append("\r\nORDER BY ");
                for (i, order) in self.order_by.iter().enumerate() {
                    if i > 0 {
                        b.append(", ");
                    }
                    b.append(&order.name);
                    if order.descending {
                        b.append(" DESC");
                    }
                }
            }
            b.into_string()
        };
        Ok(Statement {
            sql,
            values: params.bound_values(),
        })
    }

    fn emit_body(&mut self, b: &mut SqlBuilder<'_>) -> SqlResult<()> {
        emit_side(&mut self.left, b)?;
        b.append("\r\n").append(&self.keyword).append("\r\n");
        emit_side(&mut self.right, b)
    }
}

/// Plain queries are parenthesized, nested combinations emitted inline.
fn emit_side(side: &mut QueryExpr, b: &mut SqlBuilder<'_>) -> SqlResult<()> {
    side.clear_order_by();
    match side {
        QueryExpr::Select(cmd) => {
            let statement = cmd.select_statement(b.dialect())?;
            b.append_char('(').append(&statement.sql).append_char(')');
            b.merge_sub_values(statement.values)
        }
        QueryExpr::Combined(cmd) => cmd.emit_body(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;
    use relata_core::DataType;
    use relata_schema::TableRef;

    fn employees() -> TableRef {
        let mut t = TableRef::new("EMPLOYEES");
        t.alias = Some("t1".to_string());
        t
    }

    fn id_column() -> Expr {
        Expr::Column(ColumnRef::new(employees(), "ID", DataType::Integer))
    }

    fn name_column() -> Expr {
        Expr::Column(ColumnRef::new(employees(), "LASTNAME", DataType::Varchar))
    }

    fn query(values: &[i64]) -> Command {
        let mut cmd = Command::new();
        cmd.select(id_column()).select(name_column());
        let conditions: Vec<Expr> = values
            .iter()
            .map(|v| id_column().is_not(cmd.add_param(DataType::Integer, *v)))
            .collect();
        if let Some(condition) = conditions.into_iter().reduce(Expr::and) {
            cmd.where_(condition);
        }
        cmd
    }

    #[test]
    fn test_union_values_left_then_right() {
        let mut union = CombinedCommand::union(query(&[1, 2]), query(&[3]));
        let stmt = union.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(stmt.values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(stmt.placeholder_count(), 3);
        assert_eq!(union.param_values(), stmt.values);
        assert!(stmt.sql.starts_with("(SELECT "));
        assert!(stmt.sql.contains(")\r\nUNION\r\n(SELECT "));
        assert!(stmt.sql.ends_with(')'));
    }

    #[test]
    fn test_order_by_resolves_against_left_select_list() {
        let mut left = query(&[]);
        left.order_by(id_column(), false);
        let mut union = CombinedCommand::union_all(left, query(&[]));
        union.order_by(&name_column(), true).unwrap();
        let stmt = union.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.sql.ends_with(")\r\nORDER BY LASTNAME DESC"));
        // the sides lose their own ORDER BY
        assert_eq!(stmt.sql.matches("ORDER BY").count(), 1);
    }

    #[test]
    fn test_order_by_unknown_column() {
        let mut union = CombinedCommand::union(query(&[]), query(&[]));
        let other = Expr::Column(ColumnRef::new(employees(), "EMAIL", DataType::Varchar));
        let err = union.order_by(&other, false).unwrap_err();
        assert_eq!(
            err,
            SqlError::UnknownColumn {
                name: "EMAIL".to_string()
            }
        );
    }

    #[test]
    fn test_nested_combination_is_inline() {
        let inner = CombinedCommand::union(query(&[1]), query(&[2]));
        let mut outer = CombinedCommand::except(inner, query(&[3]));
        let stmt = outer.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.sql.starts_with("(SELECT "));
        assert_eq!(stmt.sql.matches("((").count(), 0);
        assert!(stmt.sql.contains("\r\nUNION\r\n"));
        assert!(stmt.sql.contains("\r\nEXCEPT\r\n"));
        assert_eq!(stmt.values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_validity_and_select_list() {
        let union = CombinedCommand::intersect(query(&[]), Command::new());
        assert!(!union.is_valid());
        assert_eq!(union.select_exprs().len(), 2);
        assert_eq!(union.keyword(), "INTERSECT");

        let mut columns = BTreeSet::new();
        union.add_referenced_columns(&mut columns);
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_repeated_generation_is_stable() {
        let mut union = CombinedCommand::union(query(&[1]), query(&[2]));
        let first = union.select_statement(&GenericDialect::new()).unwrap();
        let second = union.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(first, second);
    }
}
