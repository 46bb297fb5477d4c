//! Commands: SELECT, INSERT, UPDATE and DELETE statement builders
//!
//! A command owns its expressions and its parameter list. Every generation
//! pass resets the list, emits the statement and completes the list, so the
//! returned `Statement` carries exactly one value per `?`.

use crate::builder::{count_placeholders, SqlBuilder};
use crate::dialect::{DialectHandler, SqlPhrase};
use crate::expr::{CompareOp, Expr, Operand, SqlContext};
use crate::param::{CmdParam, ParamRef};
use crate::param_list::CmdParamList;
use relata_core::{CommandId, DataType, ParamId, RelataConfig, SqlError, SqlResult, Value};
use relata_schema::{ColumnRef, TableRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Generated SQL plus the values for its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Statement {
    /// Number of `?` placeholders in the SQL text, string literals excluded.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

/// Kind of join between two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN ",
            JoinType::Left => "LEFT JOIN ",
            JoinType::Right => "RIGHT JOIN ",
        }
    }
}

/// Join over a column pair plus optional extra conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinExpr {
    pub left: ColumnRef,
    pub right: ColumnRef,
    pub join_type: JoinType,
    pub conditions: Vec<Expr>,
}

impl JoinExpr {
    pub fn new(left: ColumnRef, right: ColumnRef, join_type: JoinType) -> Self {
        Self {
            left,
            right,
            join_type,
            conditions: Vec::new(),
        }
    }

    /// Add a condition to the ON clause.
    pub fn and(mut self, condition: Expr) -> Self {
        self.conditions.push(condition);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub descending: bool,
}

/// Column assignment of an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct SetExpr {
    pub column: ColumnRef,
    pub value: Operand,
}

#[derive(Clone, Copy)]
enum StatementKind<'t> {
    Select,
    Insert(&'t TableRef),
    Update(&'t TableRef),
    Delete(&'t TableRef),
}

/// Statement builder for one logical command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: CommandId,
    distinct: bool,
    select: Vec<Expr>,
    joins: Vec<JoinExpr>,
    where_: Vec<Expr>,
    group_by: Vec<Expr>,
    having: Vec<Expr>,
    order_by: Vec<OrderByExpr>,
    set: Vec<SetExpr>,
    params: CmdParamList,
    /// Parameters created by `prepare` and `set` rather than declared
    implicit_params: BTreeSet<ParamId>,
    auto_prepare: bool,
}

impl Default for Command {
    fn default() -> Self {
        Self::new()
    }
}

impl Command {
    pub fn new() -> Self {
        Self {
            id: CommandId::now_v7(),
            distinct: false,
            select: Vec::new(),
            joins: Vec::new(),
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            set: Vec::new(),
            params: CmdParamList::new(),
            implicit_params: BTreeSet::new(),
            auto_prepare: false,
        }
    }

    pub fn with_config(config: &RelataConfig) -> Self {
        let mut cmd = Self::new();
        cmd.auto_prepare = config.auto_prepare_statements;
        cmd.params = CmdParamList::new().with_warn_unused(config.warn_on_unused_params);
        cmd
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn is_auto_prepare(&self) -> bool {
        self.auto_prepare
    }

    pub fn set_auto_prepare(&mut self, auto_prepare: bool) {
        self.auto_prepare = auto_prepare;
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    /// Declare a parameter owned by this command.
    pub fn add_param(&mut self, data_type: DataType, value: impl Into<Value>) -> ParamRef {
        let param = CmdParam::new(Some(self.id), data_type, value);
        let param_ref = param.to_ref();
        self.params.add(param);
        param_ref
    }

    fn add_implicit_param(&mut self, data_type: DataType, value: Value) -> ParamRef {
        let param = self.add_param(data_type, value);
        self.implicit_params.insert(param.id);
        param
    }

    /// Drop implicit parameters no clause refers to any more.
    fn release_params(&mut self, removed: Vec<ParamId>) {
        if removed.is_empty() {
            return;
        }
        let mut in_use = Vec::new();
        self.add_referenced_params(&mut in_use);
        for id in removed {
            if !in_use.contains(&id) && self.implicit_params.remove(&id) {
                self.params.remove(id);
            }
        }
    }

    fn add_referenced_params(&self, params: &mut Vec<ParamId>) {
        for expr in self
            .select
            .iter()
            .chain(&self.where_)
            .chain(&self.group_by)
            .chain(&self.having)
            .chain(self.order_by.iter().map(|o| &o.expr))
            .chain(self.joins.iter().flat_map(|j| &j.conditions))
        {
            expr.add_referenced_params(params);
        }
        for set in &self.set {
            set.value.add_referenced_params(params);
        }
    }

    pub fn set_param_value(&mut self, param: ParamRef, value: impl Into<Value>) -> SqlResult<()> {
        self.params.set_value(param.id, value)
    }

    pub fn params(&self) -> &CmdParamList {
        &self.params
    }

    /// Values bound by the last generation pass.
    pub fn param_values(&self) -> Vec<Value> {
        self.params.bound_values()
    }

    // ========================================================================
    // CLAUSES
    // ========================================================================

    pub fn select(&mut self, expr: impl Into<Expr>) -> &mut Self {
        let expr = expr.into();
        if !self.select.contains(&expr) {
            self.select.push(expr);
        }
        self
    }

    pub fn select_all(&mut self, exprs: impl IntoIterator<Item = Expr>) -> &mut Self {
        for expr in exprs {
            self.select(expr);
        }
        self
    }

    pub fn select_distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    pub fn select_exprs(&self) -> &[Expr] {
        &self.select
    }

    pub fn join(&mut self, left: ColumnRef, right: ColumnRef, join_type: JoinType) -> &mut Self {
        self.join_with(JoinExpr::new(left, right, join_type))
    }

    pub fn join_with(&mut self, join: JoinExpr) -> &mut Self {
        let conditions = join
            .conditions
            .into_iter()
            .map(|c| self.prepare(c))
            .collect();
        self.joins.push(JoinExpr { conditions, ..join });
        self
    }

    /// Add a WHERE condition. Conditions are combined with AND; a
    /// condition on the same left-hand expression as an earlier one
    /// replaces it.
    pub fn where_(&mut self, condition: Expr) -> &mut Self {
        let condition = self.prepare(condition);
        let displaced = replace_constraint(&mut self.where_, condition);
        self.release_constraint(displaced);
        self
    }

    /// Remove the WHERE condition on `column`, if any.
    pub fn remove_where_on(&mut self, column: &ColumnRef) -> &mut Self {
        let removed = remove_constraint_on(&mut self.where_, column);
        self.release_constraint(removed);
        self
    }

    pub fn clear_where(&mut self) -> &mut Self {
        let removed = std::mem::take(&mut self.where_);
        self.release_exprs(&removed);
        self
    }

    fn release_constraint(&mut self, removed: Option<Expr>) {
        if let Some(removed) = removed {
            self.release_exprs(std::slice::from_ref(&removed));
        }
    }

    fn release_exprs(&mut self, removed: &[Expr]) {
        let mut ids = Vec::new();
        for expr in removed {
            expr.add_referenced_params(&mut ids);
        }
        self.release_params(ids);
    }

    pub fn group_by(&mut self, expr: impl Into<Expr>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    /// Add a HAVING condition, replacing one on the same expression.
    pub fn having(&mut self, condition: Expr) -> &mut Self {
        let condition = self.prepare(condition);
        let displaced = replace_constraint(&mut self.having, condition);
        self.release_constraint(displaced);
        self
    }

    pub fn clear_having(&mut self) -> &mut Self {
        let removed = std::mem::take(&mut self.having);
        self.release_exprs(&removed);
        self
    }

    pub fn order_by(&mut self, expr: impl Into<Expr>, descending: bool) -> &mut Self {
        self.order_by.push(OrderByExpr {
            expr: expr.into(),
            descending,
        });
        self
    }

    pub fn clear_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    /// Assign a value for INSERT/UPDATE.
    ///
    /// BLOB and CLOB values, and every scalar when auto-prepare is on, are
    /// bound as parameters. Setting a column twice replaces the value.
    pub fn set(&mut self, column: &ColumnRef, value: impl Into<Operand>) -> &mut Self {
        let value = value.into();
        let existing = self.set.iter().position(|s| &s.column == column);
        if let (Some(index), Operand::Scalar(scalar)) = (existing, &value) {
            if let Operand::Expr(expr) = &self.set[index].value {
                if let Expr::Param(param) = **expr {
                    // keep the placeholder, swap the value
                    if self.params.set_value(param.id, scalar.clone()).is_ok() {
                        return self;
                    }
                }
            }
        }
        let value = match value {
            Operand::Scalar(scalar)
                if self.auto_prepare || column.data_type.is_large_object() =>
            {
                Operand::from(self.add_implicit_param(column.data_type, scalar))
            }
            other => other,
        };
        match existing {
            Some(index) => {
                let displaced = std::mem::replace(&mut self.set[index].value, value);
                let mut ids = Vec::new();
                displaced.add_referenced_params(&mut ids);
                self.release_params(ids);
            }
            None => self.set.push(SetExpr {
                column: column.clone(),
                value,
            }),
        }
        self
    }

    pub fn clear_set(&mut self) -> &mut Self {
        let removed = std::mem::take(&mut self.set);
        let mut ids = Vec::new();
        for set in &removed {
            set.value.add_referenced_params(&mut ids);
        }
        self.release_params(ids);
        self
    }

    /// Bind comparison values as parameters when auto-prepare is on.
    fn prepare(&mut self, expr: Expr) -> Expr {
        if !self.auto_prepare {
            return expr;
        }
        match expr {
            Expr::Compare {
                left,
                op,
                right: Operand::Scalar(value),
            } if op.is_preparable() && !value.is_empty() && value != Value::SysDate => {
                let param = self.add_implicit_param(left.data_type(), value);
                Expr::Compare {
                    left,
                    op,
                    right: Operand::from(param),
                }
            }
            Expr::And(items) => Expr::And(items.into_iter().map(|e| self.prepare(e)).collect()),
            Expr::Or(items) => Expr::Or(items.into_iter().map(|e| self.prepare(e)).collect()),
            other => other,
        }
    }

    /// A command can produce a SELECT once it has a select list.
    pub fn is_valid(&self) -> bool {
        !self.select.is_empty()
    }

    /// Every column referenced anywhere in the query.
    pub fn add_referenced_columns(&self, columns: &mut BTreeSet<ColumnRef>) {
        for expr in self
            .select
            .iter()
            .chain(&self.where_)
            .chain(&self.group_by)
            .chain(&self.having)
            .chain(self.order_by.iter().map(|o| &o.expr))
        {
            expr.add_referenced_columns(columns);
        }
        for join in &self.joins {
            columns.insert(join.left.clone());
            columns.insert(join.right.clone());
            for condition in &join.conditions {
                condition.add_referenced_columns(columns);
            }
        }
    }

    // ========================================================================
    // GENERATION
    // ========================================================================

    pub fn select_statement(&mut self, dialect: &dyn DialectHandler) -> SqlResult<Statement> {
        self.generate(dialect, StatementKind::Select)
    }

    pub fn insert_statement(
        &mut self,
        dialect: &dyn DialectHandler,
        table: &TableRef,
    ) -> SqlResult<Statement> {
        self.generate(dialect, StatementKind::Insert(table))
    }

    pub fn update_statement(
        &mut self,
        dialect: &dyn DialectHandler,
        table: &TableRef,
    ) -> SqlResult<Statement> {
        self.generate(dialect, StatementKind::Update(table))
    }

    pub fn delete_statement(
        &mut self,
        dialect: &dyn DialectHandler,
        table: &TableRef,
    ) -> SqlResult<Statement> {
        self.generate(dialect, StatementKind::Delete(table))
    }

    /// Render the SELECT without touching this command's parameter list,
    /// as needed when the command is embedded in another statement.
    pub fn render_select(&self, dialect: &dyn DialectHandler) -> SqlResult<Statement> {
        let mut params = self.params.clone();
        self.generate_with(&mut params, dialect, StatementKind::Select)
    }

    fn generate(&mut self, dialect: &dyn DialectHandler, kind: StatementKind<'_>) -> SqlResult<Statement> {
        let mut params = std::mem::take(&mut self.params);
        let result = self.generate_with(&mut params, dialect, kind);
        self.params = params;
        result
    }

    fn generate_with(
        &self,
        params: &mut CmdParamList,
        dialect: &dyn DialectHandler,
        kind: StatementKind<'_>,
    ) -> SqlResult<Statement> {
        params.reset_usage(self.id);
        let sql = {
            let mut b = SqlBuilder::with_params(dialect, params);
            match kind {
                StatementKind::Select => self.emit_select(&mut b)?,
                StatementKind::Insert(table) => self.emit_insert(&mut b, table)?,
                StatementKind::Update(table) => self.emit_update(&mut b, table)?,
                StatementKind::Delete(table) => self.emit_delete(&mut b, table)?,
            }
            b.into_string()
        };
        params.complete_usage(self.id);
        Ok(Statement {
            sql,
            values: params.bound_values(),
        })
    }

    fn emit_select(&self, b: &mut SqlBuilder<'_>) -> SqlResult<()> {
        if self.select.is_empty() {
            return Err(SqlError::InvalidArgument {
                argument: "select".to_string(),
                reason: "command has no select expressions".to_string(),
            });
        }
        b.append("SELECT ");
        if self.distinct {
            b.append("DISTINCT ");
        }
        add_list(b, &self.select, SqlContext::ALL, ", ")?;
        self.emit_from(b)?;
        self.emit_where(b, SqlContext::DEFAULT)?;
        if !self.group_by.is_empty() {
            b.append("\r\nGROUP BY ");
            add_list(b, &self.group_by, SqlContext::DEFAULT, ", ")?;
        }
        if !self.having.is_empty() {
            b.append("\r\nHAVING ");
            add_list(b, &self.having, SqlContext::DEFAULT, " AND ")?;
        }
        if !self.order_by.is_empty() {
            b.append("\r\nORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    b.append(", ");
                }
                order.expr.add_sql(b, SqlContext::DEFAULT)?;
                if order.descending {
                    b.append(" DESC");
                }
            }
        }
        Ok(())
    }

    fn emit_from(&self, b: &mut SqlBuilder<'_>) -> SqlResult<()> {
        let mut columns = BTreeSet::new();
        self.add_referenced_columns(&mut columns);
        let join_tables: BTreeSet<&TableRef> = self
            .joins
            .iter()
            .flat_map(|j| [&j.left.table, &j.right.table])
            .collect();
        let mut plain_tables: Vec<&TableRef> = Vec::new();
        for column in &columns {
            if !join_tables.contains(&column.table) && !plain_tables.contains(&&column.table) {
                plain_tables.push(&column.table);
            }
        }
        if plain_tables.is_empty() && self.joins.is_empty() {
            return Ok(());
        }
        b.append("\r\nFROM ");
        for (i, table) in plain_tables.iter().enumerate() {
            if i > 0 {
                b.append(", ");
            }
            append_table(b, table);
        }
        let mut emitted: Vec<&TableRef> = Vec::new();
        for (i, join) in self.joins.iter().enumerate() {
            if i == 0 {
                if !plain_tables.is_empty() {
                    b.append(", ");
                }
                append_table(b, &join.left.table);
                emitted.push(&join.left.table);
            }
            let joined = match (
                emitted.contains(&&join.left.table),
                emitted.contains(&&join.right.table),
            ) {
                (true, false) => &join.right.table,
                (false, true) => &join.left.table,
                (left, _) => {
                    return Err(SqlError::InvalidArgument {
                        argument: "join".to_string(),
                        reason: format!(
                            "join of {} and {} must connect exactly one new table, {} already joined",
                            join.left.table.name,
                            join.right.table.name,
                            if left { "both are" } else { "neither is" }
                        ),
                    })
                }
            };
            b.append("\r\n").append(join.join_type.as_sql());
            append_table(b, joined);
            emitted.push(joined);
            b.append(" ON ")
                .append(&join.left.qualified_name())
                .append_char('=')
                .append(&join.right.qualified_name());
            for condition in &join.conditions {
                b.append(" AND ");
                condition.add_sql(b, SqlContext::DEFAULT)?;
            }
        }
        Ok(())
    }

    fn emit_where(&self, b: &mut SqlBuilder<'_>, ctx: SqlContext) -> SqlResult<()> {
        if !self.where_.is_empty() {
            b.append("\r\nWHERE ");
            add_list(b, &self.where_, ctx, " AND ")?;
        }
        Ok(())
    }

    fn set_for<'s>(&'s self, table: &TableRef) -> SqlResult<Vec<&'s SetExpr>> {
        let sets: Vec<&SetExpr> = self
            .set
            .iter()
            .filter(|s| s.column.table.name == table.name)
            .collect();
        if sets.is_empty() {
            return Err(SqlError::InvalidArgument {
                argument: "set".to_string(),
                reason: format!("no values set for table {}", table.name),
            });
        }
        Ok(sets)
    }

    fn emit_insert(&self, b: &mut SqlBuilder<'_>, table: &TableRef) -> SqlResult<()> {
        let sets = self.set_for(table)?;
        b.append("INSERT INTO ").append(&table.full_name()).append("( ");
        for (i, set) in sets.iter().enumerate() {
            if i > 0 {
                b.append(", ");
            }
            b.append(&set.column.name);
        }
        b.append(") VALUES ( ");
        for (i, set) in sets.iter().enumerate() {
            if i > 0 {
                b.append(", ");
            }
            b.append_value(set.column.data_type, &set.value, SqlContext::VALUE, None)?;
        }
        b.append(")");
        Ok(())
    }

    fn emit_update(&self, b: &mut SqlBuilder<'_>, table: &TableRef) -> SqlResult<()> {
        let sets = self.set_for(table)?;
        b.append("UPDATE ").append(&table.full_name()).append("\r\nSET ");
        for (i, set) in sets.iter().enumerate() {
            if i > 0 {
                b.append(", ");
            }
            b.append(&set.column.name).append_char('=');
            b.append_value(
                set.column.data_type,
                &set.value,
                SqlContext::NAME | SqlContext::VALUE,
                None,
            )?;
        }
        self.emit_where(b, SqlContext::NAME | SqlContext::VALUE)
    }

    fn emit_delete(&self, b: &mut SqlBuilder<'_>, table: &TableRef) -> SqlResult<()> {
        b.append("DELETE FROM ").append(&table.full_name());
        self.emit_where(b, SqlContext::NAME | SqlContext::VALUE)
    }
}

/// Put `condition` in place of a mutually exclusive one, or append it.
/// Returns the displaced condition.
fn replace_constraint(list: &mut Vec<Expr>, condition: Expr) -> Option<Expr> {
    match list.iter().position(|c| condition.is_mutually_exclusive(c)) {
        Some(index) => Some(std::mem::replace(&mut list[index], condition)),
        None => {
            list.push(condition);
            None
        }
    }
}

fn remove_constraint_on(list: &mut Vec<Expr>, column: &ColumnRef) -> Option<Expr> {
    let index = list.iter().position(|c| match c {
        Expr::Compare { left, .. } => matches!(&**left, Expr::Column(c) if c == column),
        _ => false,
    })?;
    Some(list.remove(index))
}

fn add_list(b: &mut SqlBuilder<'_>, exprs: &[Expr], ctx: SqlContext, separator: &str) -> SqlResult<()> {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            b.append(separator);
        }
        expr.add_sql(b, ctx)?;
    }
    Ok(())
}

fn append_table(b: &mut SqlBuilder<'_>, table: &TableRef) {
    b.append(&table.full_name());
    if let Some(alias) = &table.alias {
        b.append_phrase(SqlPhrase::RenameTable).append(alias);
    }
}

/// Equality conditions over key columns, combined with AND.
pub fn key_condition(columns: &[ColumnRef], values: &[Value]) -> SqlResult<Expr> {
    if columns.is_empty() || columns.len() != values.len() {
        return Err(SqlError::InvalidArgument {
            argument: "key".to_string(),
            reason: format!("{} key columns but {} values", columns.len(), values.len()),
        });
    }
    let mut conditions = columns
        .iter()
        .zip(values)
        .map(|(c, v)| Expr::Column(c.clone()).compare(CompareOp::Eq, v.clone()));
    let first = conditions.next().ok_or_else(|| SqlError::InvalidArgument {
        argument: "key".to_string(),
        reason: "empty key".to_string(),
    })?;
    Ok(conditions.fold(first, Expr::and))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;
    use relata_core::{BlobData, ClobData};

    fn table(name: &str, alias: &str) -> TableRef {
        let mut t = TableRef::new(name);
        t.alias = Some(alias.to_string());
        t
    }

    fn column(t: &TableRef, name: &str, data_type: DataType) -> ColumnRef {
        ColumnRef::new(t.clone(), name, data_type)
    }

    #[test]
    fn test_simple_select() {
        let emp = table("EMPLOYEES", "t1");
        let mut cmd = Command::new();
        cmd.select(column(&emp, "ID", DataType::Integer))
            .select(column(&emp, "LASTNAME", DataType::Varchar))
            .where_(Expr::Column(column(&emp, "ID", DataType::Integer)).is(5))
            .order_by(column(&emp, "LASTNAME", DataType::Varchar), true);
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT t1.ID, t1.LASTNAME\r\nFROM EMPLOYEES t1\r\nWHERE t1.ID=5\r\nORDER BY t1.LASTNAME DESC"
        );
        assert!(stmt.values.is_empty());
    }

    #[test]
    fn test_param_reuse_binds_twice() {
        let emp = table("EMPLOYEES", "t1");
        let mut cmd = Command::new();
        let p = cmd.add_param(DataType::Integer, 7);
        cmd.select(column(&emp, "ID", DataType::Integer))
            .where_(Expr::Column(column(&emp, "ID", DataType::Integer)).is(p))
            .where_(Expr::Column(column(&emp, "MANAGER_ID", DataType::Integer)).is(p));
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.sql.ends_with("WHERE t1.ID=? AND t1.MANAGER_ID=?"));
        assert_eq!(stmt.values, vec![Value::Int(7), Value::Int(7)]);

        // a second pass yields the same result, the copy does not accumulate
        cmd.set_param_value(p, 8).unwrap();
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(stmt.values, vec![Value::Int(8), Value::Int(8)]);
        assert_eq!(cmd.params().len(), 2);
        assert_eq!(cmd.param_values(), vec![Value::Int(8), Value::Int(8)]);
    }

    #[test]
    fn test_params_follow_placeholder_order() {
        let emp = table("EMPLOYEES", "t1");
        let mut cmd = Command::new();
        let first = cmd.add_param(DataType::Integer, 1);
        let second = cmd.add_param(DataType::Varchar, "b");
        cmd.select(column(&emp, "ID", DataType::Integer))
            .where_(Expr::Column(column(&emp, "NAME", DataType::Varchar)).is(second))
            .where_(Expr::Column(column(&emp, "ID", DataType::Integer)).is(first));
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(stmt.values, vec![Value::from("b"), Value::Int(1)]);
    }

    #[test]
    fn test_join_and_group_by() {
        let emp = table("EMPLOYEES", "t1");
        let dep = table("DEPARTMENTS", "t2");
        let mut cmd = Command::new();
        cmd.select(column(&dep, "NAME", DataType::Varchar))
            .select(
                Expr::Column(column(&emp, "SALARY", DataType::Decimal))
                    .sum()
                    .alias("TOTAL"),
            )
            .join(
                column(&emp, "DEPARTMENT_ID", DataType::Integer),
                column(&dep, "ID", DataType::Integer),
                JoinType::Inner,
            )
            .group_by(column(&dep, "NAME", DataType::Varchar));
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT t2.NAME, sum(t1.SALARY) AS TOTAL\r\nFROM EMPLOYEES t1\r\nINNER JOIN DEPARTMENTS t2 ON t1.DEPARTMENT_ID=t2.ID\r\nGROUP BY t2.NAME"
        );
    }

    #[test]
    fn test_insert_binds_large_objects() {
        let doc = TableRef::new("DOCUMENTS");
        let mut cmd = Command::new();
        cmd.set(&column(&doc, "ID", DataType::Integer), 1)
            .set(&column(&doc, "DATA", DataType::Blob), Value::Bytes(vec![1, 2]))
            .set(&column(&doc, "BODY", DataType::Clob), "text");
        let stmt = cmd.insert_statement(&GenericDialect::new(), &doc).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO DOCUMENTS( ID, DATA, BODY) VALUES ( 1, ?, ?)");
        assert_eq!(
            stmt.values,
            vec![
                Value::Blob(BlobData::new(vec![1u8, 2])),
                Value::Clob(ClobData::new("text"))
            ]
        );
    }

    #[test]
    fn test_update_with_auto_prepare() {
        let emp = TableRef::new("EMPLOYEES");
        let config = RelataConfig {
            auto_prepare_statements: true,
            ..RelataConfig::default()
        };
        let mut cmd = Command::with_config(&config);
        let salary = column(&emp, "SALARY", DataType::Decimal);
        cmd.set(&salary, 1000.0)
            .where_(Expr::Column(column(&emp, "ID", DataType::Integer)).is(3));
        // setting again replaces the bound value, not the placeholder
        cmd.set(&salary, 1200.0);
        let stmt = cmd.update_statement(&GenericDialect::new(), &emp).unwrap();
        assert_eq!(stmt.sql, "UPDATE EMPLOYEES\r\nSET SALARY=?\r\nWHERE ID=?");
        assert_eq!(stmt.values, vec![Value::Float(1200.0), Value::Int(3)]);
        assert_eq!(stmt.placeholder_count(), stmt.values.len());
    }

    #[test]
    fn test_delete() {
        let emp = TableRef::new("EMPLOYEES");
        let mut cmd = Command::new();
        cmd.where_(Expr::Column(column(&emp, "ID", DataType::Integer)).is(3));
        let stmt = cmd.delete_statement(&GenericDialect::new(), &emp).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM EMPLOYEES\r\nWHERE ID=3");
    }

    #[test]
    fn test_unused_params_pruned_but_owned_kept() {
        let emp = table("EMPLOYEES", "t1");
        let mut cmd = Command::new();
        let unused = cmd.add_param(DataType::Integer, 1);
        cmd.select(column(&emp, "ID", DataType::Integer));
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.values.is_empty());
        assert!(cmd.params().get(unused.id).is_some());
    }

    #[test]
    fn test_empty_commands_rejected() {
        let mut cmd = Command::new();
        assert!(!cmd.is_valid());
        assert!(cmd.select_statement(&GenericDialect::new()).is_err());
        assert!(cmd
            .insert_statement(&GenericDialect::new(), &TableRef::new("T"))
            .is_err());
    }

    #[test]
    fn test_key_condition() {
        let emp = table("EMPLOYEES", "t1");
        let key = [column(&emp, "A", DataType::Integer), column(&emp, "B", DataType::Integer)];
        let expr = key_condition(&key, &[Value::Int(1), Value::Int(2)]).unwrap();
        let mut cmd = Command::new();
        cmd.select(key[0].clone()).where_(expr);
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.sql.ends_with("WHERE t1.A=1 AND t1.B=2"));
        assert!(key_condition(&key, &[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_where_on_same_column_replaces() {
        let emp = table("EMPLOYEES", "t1");
        let id = || Expr::Column(column(&emp, "ID", DataType::Integer));
        let mut cmd = Command::new();
        cmd.select(column(&emp, "LASTNAME", DataType::Varchar))
            .where_(id().is(1))
            .where_(id().is(2));
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.sql.ends_with("WHERE t1.ID=2"));

        cmd.set_auto_prepare(true);
        cmd.where_(id().is_greater_than(3)).where_(id().is_greater_than(4));
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert!(stmt.sql.ends_with("WHERE t1.ID>?"));
        assert_eq!(stmt.values, vec![Value::Int(4)]);
        assert_eq!(cmd.params().len(), 1);

        cmd.remove_where_on(&column(&emp, "ID", DataType::Integer));
        assert!(cmd.params().is_empty());
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(stmt.sql, "SELECT t1.LASTNAME\r\nFROM EMPLOYEES t1");
    }

    #[test]
    fn test_clear_where_releases_implicit_params() {
        let emp = table("EMPLOYEES", "t1");
        let config = RelataConfig {
            auto_prepare_statements: true,
            ..RelataConfig::default()
        };
        let mut cmd = Command::with_config(&config);
        let declared = cmd.add_param(DataType::Integer, 0);
        cmd.select(column(&emp, "ID", DataType::Integer));
        for i in 1..=5i64 {
            cmd.clear_where()
                .where_(Expr::Column(column(&emp, "ID", DataType::Integer)).is(i));
            let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
            assert_eq!(stmt.values, vec![Value::Int(i)]);
            assert_eq!(cmd.params().len(), 2);
        }
        // declared parameters stay until the caller removes them
        cmd.clear_where();
        assert_eq!(cmd.params().len(), 1);
        assert!(cmd.params().get(declared.id).is_some());
    }

    #[test]
    fn test_clear_set_and_having_release_implicit_params() {
        let emp = TableRef::new("EMPLOYEES");
        let photo = column(&emp, "PHOTO", DataType::Blob);
        let mut cmd = Command::new();
        cmd.set(&photo, Value::Bytes(vec![1]));
        cmd.set(&photo, Value::Bytes(vec![2]));
        assert_eq!(cmd.params().len(), 1);
        cmd.set(&photo, Value::Null);
        cmd.clear_set();
        assert!(cmd.params().is_empty());

        let salary = Expr::Column(column(&emp, "SALARY", DataType::Decimal));
        cmd.set_auto_prepare(true);
        cmd.select(salary.clone().sum())
            .group_by(column(&emp, "DEPARTMENT_ID", DataType::Integer))
            .having(salary.sum().is_greater_than(100.0));
        assert_eq!(cmd.params().len(), 1);
        cmd.clear_having();
        assert!(cmd.params().is_empty());
    }

    #[test]
    fn test_join_chain() {
        let emp = table("EMPLOYEES", "t1");
        let dep = table("DEPARTMENTS", "t2");
        let loc = table("LOCATIONS", "t3");
        let mut cmd = Command::new();
        cmd.select(column(&emp, "ID", DataType::Integer))
            .join(
                column(&emp, "DEPARTMENT_ID", DataType::Integer),
                column(&dep, "ID", DataType::Integer),
                JoinType::Inner,
            )
            .join(
                column(&loc, "ID", DataType::Integer),
                column(&dep, "LOCATION_ID", DataType::Integer),
                JoinType::Left,
            );
        let stmt = cmd.select_statement(&GenericDialect::new()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT t1.ID\r\nFROM EMPLOYEES t1\r\nINNER JOIN DEPARTMENTS t2 ON t1.DEPARTMENT_ID=t2.ID\r\nLEFT JOIN LOCATIONS t3 ON t3.ID=t2.LOCATION_ID"
        );
    }

    #[test]
    fn test_disconnected_join_rejected() {
        let emp = table("EMPLOYEES", "t1");
        let dep = table("DEPARTMENTS", "t2");
        let loc = table("LOCATIONS", "t3");
        let reg = table("REGIONS", "t4");
        let mut cmd = Command::new();
        cmd.select(column(&emp, "ID", DataType::Integer))
            .join(
                column(&emp, "DEPARTMENT_ID", DataType::Integer),
                column(&dep, "ID", DataType::Integer),
                JoinType::Inner,
            )
            .join(
                column(&loc, "REGION_ID", DataType::Integer),
                column(&reg, "ID", DataType::Integer),
                JoinType::Inner,
            );
        let err = cmd.select_statement(&GenericDialect::new()).unwrap_err();
        assert!(matches!(err, SqlError::InvalidArgument { .. }));
    }
}
