//! Expression tree
//!
//! `Expr` is a closed set of SQL expression nodes. Every node can add its
//! SQL to a builder under a `SqlContext` and report the columns it
//! references, which is how a command works out its FROM clause.

use crate::builder::{split_subject, SqlBuilder};
use crate::combined::QueryExpr;
use crate::dialect::SqlPhrase;
use crate::param::ParamRef;
use bitflags::bitflags;
use relata_core::{DataType, ParamId, SqlError, SqlResult, Value};
use relata_schema::ColumnRef;
use std::collections::BTreeSet;

bitflags! {
    /// Which parts of an expression to render.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SqlContext: u32 {
        /// Column names
        const NAME = 0b0000_0001;
        /// Qualify column names with their table alias
        const FULLNAME = 0b0000_0010;
        /// Values of comparisons and assignments
        const VALUE = 0b0000_0100;
        /// Output aliases (`expr AS name`)
        const ALIAS = 0b0000_1000;
        /// Sub-queries and OR groups without enclosing parentheses
        const NO_PARENTHESES = 0b0001_0000;
        const DEFAULT = Self::NAME.bits() | Self::FULLNAME.bits() | Self::VALUE.bits();
        const ALL = Self::DEFAULT.bits() | Self::ALIAS.bits();
    }
}

// ============================================================================
// OPERAND
// ============================================================================

/// Right-hand side of a comparison, assignment or template argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Expr(Box<Expr>),
    Scalar(Value),
    /// Expanded element by element with a separator
    Sequence(Vec<Operand>),
}

impl Operand {
    /// Scalar operand. Option entries are reduced to their stored value.
    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Scalar(value.into().unwrap_entry())
    }

    pub fn sequence<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Operand::Sequence(values.into_iter().map(Operand::value).collect())
    }

    /// Null or empty scalar, compared with `IS NULL`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Operand::Scalar(v) if v.is_empty())
    }

    pub fn add_referenced_columns(&self, columns: &mut BTreeSet<ColumnRef>) {
        match self {
            Operand::Expr(expr) => expr.add_referenced_columns(columns),
            Operand::Sequence(items) => {
                for item in items {
                    item.add_referenced_columns(columns);
                }
            }
            Operand::Scalar(_) => {}
        }
    }

    pub fn add_referenced_params(&self, params: &mut Vec<ParamId>) {
        match self {
            Operand::Expr(expr) => expr.add_referenced_params(params),
            Operand::Sequence(items) => {
                for item in items {
                    item.add_referenced_params(params);
                }
            }
            Operand::Scalar(_) => {}
        }
    }
}

impl From<Expr> for Operand {
    fn from(expr: Expr) -> Self {
        Operand::Expr(Box::new(expr))
    }
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Operand::from(Expr::Column(column))
    }
}

impl From<ParamRef> for Operand {
    fn from(param: ParamRef) -> Self {
        Operand::from(Expr::Param(param))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::value(value)
    }
}

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Operand::sequence(values)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::value(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::value(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::value(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::value(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::value(value)
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::value(value)
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    /// Operator used when the right-hand side is null.
    fn null_variant(self) -> CompareOp {
        match self {
            CompareOp::NotEq
            | CompareOp::NotLike
            | CompareOp::NotIn
            | CompareOp::NotBetween
            | CompareOp::IsNotNull => CompareOp::IsNotNull,
            _ => CompareOp::IsNull,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Like => " LIKE ",
            CompareOp::NotLike => " NOT LIKE ",
            CompareOp::In => " IN (",
            CompareOp::NotIn => " NOT IN (",
            CompareOp::Between => " BETWEEN ",
            CompareOp::NotBetween => " NOT BETWEEN ",
            CompareOp::IsNull => " IS NULL",
            CompareOp::IsNotNull => " IS NOT NULL",
        }
    }

    /// Operators whose scalar value may be bound as a parameter.
    pub fn is_preparable(self) -> bool {
        matches!(
            self,
            CompareOp::Eq
                | CompareOp::NotEq
                | CompareOp::Lt
                | CompareOp::LtEq
                | CompareOp::Gt
                | CompareOp::GtEq
                | CompareOp::Like
                | CompareOp::NotLike
        )
    }
}

/// Function template: a dialect phrase or literal SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum FuncTemplate {
    Phrase(SqlPhrase),
    Custom(String),
}

/// A node of an SQL expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal {
        data_type: DataType,
        value: Value,
    },
    Param(ParamRef),
    /// `?` in the template is the subject, `{N}` the N-th argument
    Function {
        template: FuncTemplate,
        subject: Box<Expr>,
        args: Vec<Operand>,
        arg_types: Vec<DataType>,
        data_type: DataType,
    },
    /// `CASE subject WHEN .. THEN .. ELSE .. END`
    Decode {
        subject: Box<Expr>,
        cases: Vec<[Operand; 2]>,
        otherwise: Option<Operand>,
        data_type: DataType,
    },
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Operand,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    SubQuery(Box<QueryExpr>),
}

impl From<ColumnRef> for Expr {
    fn from(column: ColumnRef) -> Self {
        Expr::Column(column)
    }
}

impl From<ParamRef> for Expr {
    fn from(param: ParamRef) -> Self {
        Expr::Param(param)
    }
}

impl Expr {
    pub fn literal(data_type: DataType, value: impl Into<Value>) -> Self {
        Expr::Literal {
            data_type,
            value: value.into().unwrap_entry(),
        }
    }

    pub fn sub_query(query: impl Into<QueryExpr>) -> Self {
        Expr::SubQuery(Box::new(query.into()))
    }

    /// Function over `self` rendered from a dialect phrase. Arguments take
    /// the subject's data type.
    pub fn phrase_func(self, phrase: SqlPhrase, args: Vec<Operand>) -> Self {
        let data_type = self.data_type();
        self.func(FuncTemplate::Phrase(phrase), args, vec![data_type], data_type)
    }

    pub fn func(
        self,
        template: FuncTemplate,
        args: Vec<Operand>,
        arg_types: Vec<DataType>,
        data_type: DataType,
    ) -> Self {
        Expr::Function {
            template,
            subject: Box::new(self),
            args,
            arg_types,
            data_type,
        }
    }

    pub fn upper(self) -> Self {
        self.phrase_func(SqlPhrase::Upper, vec![])
    }

    pub fn lower(self) -> Self {
        self.phrase_func(SqlPhrase::Lower, vec![])
    }

    pub fn trim(self) -> Self {
        self.phrase_func(SqlPhrase::Trim, vec![])
    }

    pub fn length(self) -> Self {
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Length),
            vec![],
            vec![],
            DataType::Integer,
        )
    }

    pub fn abs(self) -> Self {
        self.phrase_func(SqlPhrase::Abs, vec![])
    }

    pub fn round(self, decimals: i32) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Round),
            vec![Operand::value(decimals)],
            vec![DataType::Integer],
            data_type,
        )
    }

    pub fn coalesce(self, fallback: impl Into<Operand>) -> Self {
        self.phrase_func(SqlPhrase::Coalesce, vec![fallback.into()])
    }

    pub fn substring(self, pos: i32, len: i32) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::SubstringEx),
            vec![Operand::value(pos), Operand::value(len)],
            vec![DataType::Integer],
            data_type,
        )
    }

    pub fn ltrim(self) -> Self {
        self.phrase_func(SqlPhrase::LTrim, vec![])
    }

    pub fn rtrim(self) -> Self {
        self.phrase_func(SqlPhrase::RTrim, vec![])
    }

    pub fn reverse(self) -> Self {
        self.phrase_func(SqlPhrase::Reverse, vec![])
    }

    pub fn replace(self, from: impl Into<Operand>, to: impl Into<Operand>) -> Self {
        self.phrase_func(SqlPhrase::Replace, vec![from.into(), to.into()])
    }

    /// Substring from a 1-based position to the end.
    pub fn substring_from(self, pos: i32) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Substring),
            vec![Operand::value(pos)],
            vec![DataType::Integer],
            data_type,
        )
    }

    /// Position of `needle` within the subject.
    pub fn index_of(self, needle: impl Into<Operand>) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::StrIndex),
            vec![needle.into()],
            vec![data_type],
            DataType::Integer,
        )
    }

    pub fn index_of_from(self, needle: impl Into<Operand>, from: i32) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::StrIndexFrom),
            vec![needle.into(), Operand::value(from)],
            vec![data_type, DataType::Integer],
            DataType::Integer,
        )
    }

    /// Escape character for a LIKE pattern, rendered verbatim.
    pub fn escape(self, escape: char) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Escape),
            vec![Operand::value(escape.to_string())],
            vec![DataType::Unknown],
            data_type,
        )
    }

    pub fn trunc(self, decimals: i32) -> Self {
        let data_type = self.data_type();
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Trunc),
            vec![Operand::value(decimals)],
            vec![DataType::Integer],
            data_type,
        )
    }

    pub fn floor(self) -> Self {
        self.phrase_func(SqlPhrase::Floor, vec![])
    }

    pub fn ceiling(self) -> Self {
        self.phrase_func(SqlPhrase::Ceiling, vec![])
    }

    pub fn modulo(self, divisor: impl Into<Operand>) -> Self {
        self.phrase_func(SqlPhrase::Modulo, vec![divisor.into()])
    }

    /// Format the subject with a dialect-specific pattern.
    pub fn format(self, pattern: &str) -> Self {
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Format),
            vec![Operand::value(pattern)],
            vec![],
            DataType::Varchar,
        )
    }

    pub fn day(self) -> Self {
        self.date_part(SqlPhrase::Day)
    }

    pub fn month(self) -> Self {
        self.date_part(SqlPhrase::Month)
    }

    pub fn year(self) -> Self {
        self.date_part(SqlPhrase::Year)
    }

    fn date_part(self, phrase: SqlPhrase) -> Self {
        self.func(FuncTemplate::Phrase(phrase), vec![], vec![], DataType::Integer)
    }

    /// Map subject values to results, `otherwise` for everything else.
    pub fn decode(
        self,
        cases: Vec<(Operand, Operand)>,
        otherwise: Option<Operand>,
        data_type: DataType,
    ) -> Self {
        Expr::Decode {
            subject: Box::new(self),
            cases: cases.into_iter().map(|(when, then)| [when, then]).collect(),
            otherwise,
            data_type,
        }
    }

    pub fn sum(self) -> Self {
        self.phrase_func(SqlPhrase::Sum, vec![])
    }

    pub fn max(self) -> Self {
        self.phrase_func(SqlPhrase::Max, vec![])
    }

    pub fn min(self) -> Self {
        self.phrase_func(SqlPhrase::Min, vec![])
    }

    pub fn avg(self) -> Self {
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Avg),
            vec![],
            vec![],
            DataType::Decimal,
        )
    }

    pub fn count(self) -> Self {
        self.func(
            FuncTemplate::Phrase(SqlPhrase::Count),
            vec![],
            vec![],
            DataType::Integer,
        )
    }

    pub fn alias(self, name: impl Into<String>) -> Self {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    pub fn compare(self, op: CompareOp, right: impl Into<Operand>) -> Self {
        Expr::Compare {
            left: Box::new(self),
            op,
            right: right.into(),
        }
    }

    pub fn is(self, right: impl Into<Operand>) -> Self {
        self.compare(CompareOp::Eq, right)
    }

    pub fn is_not(self, right: impl Into<Operand>) -> Self {
        self.compare(CompareOp::NotEq, right)
    }

    pub fn is_less_than(self, right: impl Into<Operand>) -> Self {
        self.compare(CompareOp::Lt, right)
    }

    pub fn is_greater_than(self, right: impl Into<Operand>) -> Self {
        self.compare(CompareOp::Gt, right)
    }

    pub fn like(self, pattern: impl Into<Operand>) -> Self {
        self.compare(CompareOp::Like, pattern)
    }

    pub fn in_list(self, values: impl Into<Operand>) -> Self {
        self.compare(CompareOp::In, values)
    }

    pub fn not_in(self, values: impl Into<Operand>) -> Self {
        self.compare(CompareOp::NotIn, values)
    }

    pub fn between(self, low: impl Into<Operand>, high: impl Into<Operand>) -> Self {
        self.compare(
            CompareOp::Between,
            Operand::Sequence(vec![low.into(), high.into()]),
        )
    }

    pub fn is_null(self) -> Self {
        self.compare(CompareOp::IsNull, Value::Null)
    }

    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut items) => {
                items.push(other);
                Expr::And(items)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut items) => {
                items.push(other);
                Expr::Or(items)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    /// Declared type of the expression's result.
    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Column(c) => c.data_type,
            Expr::Literal { data_type, .. } => *data_type,
            Expr::Param(p) => p.data_type,
            Expr::Function { data_type, .. } | Expr::Decode { data_type, .. } => *data_type,
            Expr::Compare { .. } | Expr::And(_) | Expr::Or(_) => DataType::Bool,
            Expr::Alias { expr, .. } => expr.data_type(),
            Expr::SubQuery(q) => q
                .select_exprs()
                .first()
                .map(Expr::data_type)
                .unwrap_or_default(),
        }
    }

    /// Name of the column this expression produces in a result set.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Expr::Column(c) => Some(&c.name),
            Expr::Alias { name, .. } => Some(name),
            Expr::Function { subject, .. } | Expr::Decode { subject, .. } => {
                subject.output_name()
            }
            _ => None,
        }
    }

    /// True if the expression contains an aggregate function.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Function {
                template, subject, ..
            } => {
                matches!(template, FuncTemplate::Phrase(p) if p.is_aggregate())
                    || subject.is_aggregate()
            }
            Expr::Decode { subject, .. } => subject.is_aggregate(),
            Expr::Alias { expr, .. } => expr.is_aggregate(),
            _ => false,
        }
    }

    pub fn add_referenced_columns(&self, columns: &mut BTreeSet<ColumnRef>) {
        match self {
            Expr::Column(c) => {
                columns.insert(c.clone());
            }
            Expr::Function { subject, args, .. } => {
                subject.add_referenced_columns(columns);
                for arg in args {
                    arg.add_referenced_columns(columns);
                }
            }
            Expr::Decode {
                subject,
                cases,
                otherwise,
                ..
            } => {
                subject.add_referenced_columns(columns);
                for operand in cases.iter().flatten().chain(otherwise) {
                    operand.add_referenced_columns(columns);
                }
            }
            Expr::Compare { left, right, .. } => {
                left.add_referenced_columns(columns);
                right.add_referenced_columns(columns);
            }
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.add_referenced_columns(columns);
                }
            }
            Expr::Alias { expr, .. } => expr.add_referenced_columns(columns),
            // a sub-query brings its own FROM clause
            Expr::Literal { .. } | Expr::Param(_) | Expr::SubQuery(_) => {}
        }
    }

    /// Ids of the parameters this expression emits. Sub-queries bind their
    /// own parameters and are not searched.
    pub fn add_referenced_params(&self, params: &mut Vec<ParamId>) {
        match self {
            Expr::Param(p) => params.push(p.id),
            Expr::Function { subject, args, .. } => {
                subject.add_referenced_params(params);
                for arg in args {
                    arg.add_referenced_params(params);
                }
            }
            Expr::Decode {
                subject,
                cases,
                otherwise,
                ..
            } => {
                subject.add_referenced_params(params);
                for operand in cases.iter().flatten().chain(otherwise) {
                    operand.add_referenced_params(params);
                }
            }
            Expr::Compare { left, right, .. } => {
                left.add_referenced_params(params);
                right.add_referenced_params(params);
            }
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.add_referenced_params(params);
                }
            }
            Expr::Alias { expr, .. } => expr.add_referenced_params(params),
            Expr::Column(_) | Expr::Literal { .. } | Expr::SubQuery(_) => {}
        }
    }

    /// True if `other` constrains the same thing and should replace this
    /// condition rather than be added next to it.
    pub fn is_mutually_exclusive(&self, other: &Expr) -> bool {
        match (self, other) {
            (Expr::Compare { left, .. }, Expr::Compare { left: other_left, .. }) => {
                left == other_left
            }
            (Expr::And(items), Expr::And(others)) | (Expr::Or(items), Expr::Or(others)) => {
                items.len() == others.len()
                    && items
                        .iter()
                        .zip(others)
                        .all(|(a, b)| a.is_mutually_exclusive(b))
            }
            _ => self == other,
        }
    }

    /// Add this expression's SQL to the builder.
    pub fn add_sql(&self, b: &mut SqlBuilder<'_>, ctx: SqlContext) -> SqlResult<()> {
        match self {
            Expr::Column(c) => {
                if ctx.contains(SqlContext::FULLNAME) {
                    b.append(&c.qualified_name());
                } else {
                    b.append(&c.name);
                }
                Ok(())
            }
            Expr::Literal { data_type, value } => b.append_literal(*data_type, value),
            Expr::Param(p) => b.append_param(*p),
            Expr::Function {
                template,
                subject,
                args,
                arg_types,
                ..
            } => {
                let template = match template {
                    FuncTemplate::Phrase(phrase) => b.phrase(*phrase).to_string(),
                    FuncTemplate::Custom(text) => text.clone(),
                };
                for (i, part) in split_subject(&template).into_iter().enumerate() {
                    if i > 0 {
                        subject.add_sql(b, ctx - SqlContext::ALIAS)?;
                    }
                    if part.contains('{') {
                        b.append_template(part, args, arg_types, ctx, None)?;
                    } else {
                        b.append(part);
                    }
                }
                Ok(())
            }
            Expr::Decode {
                subject,
                cases,
                otherwise,
                data_type,
            } => add_decode(b, subject, cases, otherwise.as_ref(), *data_type, ctx),
            Expr::Compare { left, op, right } => add_compare(b, left, *op, right, ctx),
            Expr::And(items) => {
                let inner = ctx - SqlContext::NO_PARENTHESES;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        b.append(" AND ");
                    }
                    item.add_sql(b, inner)?;
                }
                Ok(())
            }
            Expr::Or(items) => {
                let parentheses = !ctx.contains(SqlContext::NO_PARENTHESES);
                if parentheses {
                    b.append_char('(');
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        b.append(" OR ");
                    }
                    item.add_sql(b, ctx - SqlContext::NO_PARENTHESES)?;
                }
                if parentheses {
                    b.append_char(')');
                }
                Ok(())
            }
            Expr::Alias { expr, name } => {
                expr.add_sql(b, ctx - SqlContext::ALIAS)?;
                if ctx.contains(SqlContext::ALIAS) {
                    b.append_phrase(SqlPhrase::RenameColumn).append(name);
                }
                Ok(())
            }
            Expr::SubQuery(query) => {
                let parentheses = !ctx.contains(SqlContext::NO_PARENTHESES);
                if parentheses {
                    b.append_char('(');
                }
                b.append_query(query)?;
                if parentheses {
                    b.append_char(')');
                }
                Ok(())
            }
        }
    }
}

fn add_decode(
    b: &mut SqlBuilder<'_>,
    subject: &Expr,
    cases: &[[Operand; 2]],
    otherwise: Option<&Operand>,
    data_type: DataType,
    ctx: SqlContext,
) -> SqlResult<()> {
    if cases.is_empty() {
        return Err(SqlError::InvalidArgument {
            argument: "decode".to_string(),
            reason: "at least one case is required".to_string(),
        });
    }
    let types = [subject.data_type(), data_type];
    let separator = b.phrase(SqlPhrase::DecodeSep);
    let part = b.phrase(SqlPhrase::DecodePart);
    let otherwise_part = b.phrase(SqlPhrase::DecodeElse);
    for (i, segment) in split_subject(b.phrase(SqlPhrase::Decode)).into_iter().enumerate() {
        if i > 0 {
            subject.add_sql(b, ctx - SqlContext::ALIAS)?;
        }
        let Some((head, tail)) = segment.split_once("{0}") else {
            b.append(segment);
            continue;
        };
        b.append(head);
        for (n, case) in cases.iter().enumerate() {
            if n > 0 {
                b.append(separator);
            }
            b.append_template(part, case, &types, ctx, None)?;
        }
        if let Some(otherwise) = otherwise {
            b.append(separator);
            b.append_template(
                otherwise_part,
                std::slice::from_ref(otherwise),
                &[data_type],
                ctx,
                None,
            )?;
        }
        b.append(tail);
    }
    Ok(())
}

fn add_compare(
    b: &mut SqlBuilder<'_>,
    left: &Expr,
    op: CompareOp,
    right: &Operand,
    ctx: SqlContext,
) -> SqlResult<()> {
    let data_type = left.data_type();
    if !ctx.contains(SqlContext::VALUE) {
        return left.add_sql(b, ctx);
    }
    if !ctx.intersects(SqlContext::NAME | SqlContext::FULLNAME) {
        return b.append_value(data_type, right, ctx, None);
    }
    left.add_sql(b, ctx)?;
    let op = if right.is_empty() { op.null_variant() } else { op };
    b.append(op.as_sql());
    match op {
        CompareOp::IsNull | CompareOp::IsNotNull => Ok(()),
        CompareOp::Between | CompareOp::NotBetween => {
            match right {
                Operand::Sequence(items) if items.len() == 2 => {}
                _ => {
                    return Err(SqlError::InvalidArgument {
                        argument: "between".to_string(),
                        reason: "expected exactly two bounds".to_string(),
                    })
                }
            }
            b.append_value(data_type, right, ctx, Some(" AND "))
        }
        CompareOp::In | CompareOp::NotIn => {
            let inner = match right {
                Operand::Expr(e) if matches!(**e, Expr::SubQuery(_)) => {
                    ctx | SqlContext::NO_PARENTHESES
                }
                _ => ctx,
            };
            b.append_value(data_type, right, inner, Some(", "))?;
            b.append_char(')');
            Ok(())
        }
        _ => {
            let concat = b.phrase(SqlPhrase::Concat);
            let separator = if data_type.is_numeric() { "+" } else { concat };
            b.append_value(data_type, right, ctx, Some(separator))
        }
    }
}
