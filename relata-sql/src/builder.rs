//! SQL text builder
//!
//! Accumulates the text of one statement. Literal formatting goes through
//! the dialect; placeholders go through the command's parameter list so
//! that bound values stay in placeholder order.

use crate::combined::QueryExpr;
use crate::dialect::{DialectHandler, SqlPhrase};
use crate::expr::{Operand, SqlContext};
use crate::param::ParamRef;
use crate::param_list::CmdParamList;
use relata_core::{DataType, SqlError, SqlResult, Value};
use std::borrow::Cow;
use tracing::warn;

/// Builder for a single SQL statement.
pub struct SqlBuilder<'a> {
    dialect: &'a dyn DialectHandler,
    sql: String,
    params: Option<&'a mut CmdParamList>,
}

impl<'a> SqlBuilder<'a> {
    /// Builder without a parameter list. Emitting parameters fails.
    pub fn new(dialect: &'a dyn DialectHandler) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(64),
            params: None,
        }
    }

    pub fn with_params(dialect: &'a dyn DialectHandler, params: &'a mut CmdParamList) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(64),
            params: Some(params),
        }
    }

    pub fn dialect(&self) -> &'a dyn DialectHandler {
        self.dialect
    }

    pub fn phrase(&self, phrase: SqlPhrase) -> &'a str {
        self.dialect.phrase(phrase)
    }

    pub fn has_params(&self) -> bool {
        self.params.is_some()
    }

    pub fn len(&self) -> usize {
        self.sql.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Truncate back to a length previously read from `len()`.
    pub fn reset(&mut self, pos: usize) -> SqlResult<()> {
        if pos > self.sql.len() || !self.sql.is_char_boundary(pos) {
            return Err(SqlError::InvalidArgument {
                argument: "pos".to_string(),
                reason: format!("{} is not a boundary of the {} byte buffer", pos, self.sql.len()),
            });
        }
        self.sql.truncate(pos);
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn into_string(self) -> String {
        self.sql
    }

    // ========================================================================
    // PLAIN APPENDERS
    // ========================================================================

    pub fn append(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    pub fn append_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    pub fn append_int(&mut self, value: i64) -> &mut Self {
        self.sql.push_str(&value.to_string());
        self
    }

    pub fn append_float(&mut self, value: f64) -> &mut Self {
        self.sql.push_str(&value.to_string());
        self
    }

    /// Boolean rendered through the dialect's true/false phrases.
    pub fn append_bool(&mut self, value: bool) -> &mut Self {
        let phrase = if value {
            SqlPhrase::BooleanTrue
        } else {
            SqlPhrase::BooleanFalse
        };
        self.append_phrase(phrase)
    }

    pub fn append_phrase(&mut self, phrase: SqlPhrase) -> &mut Self {
        self.sql.push_str(self.dialect.phrase(phrase));
        self
    }

    // ========================================================================
    // VALUES
    // ========================================================================

    /// Append a scalar as a literal of `data_type`.
    ///
    /// Enum constants render as their number for numeric types and as
    /// their name otherwise.
    pub fn append_literal(&mut self, data_type: DataType, value: &Value) -> SqlResult<()> {
        let value = match value {
            Value::Enum(e) if data_type.is_numeric() => Cow::Owned(Value::Int(e.ordinal)),
            Value::Enum(e) => Cow::Owned(Value::Text(e.name.clone())),
            other => Cow::Borrowed(other),
        };
        let literal = self.dialect.value_to_literal(&value, data_type)?;
        self.sql.push_str(&literal);
        Ok(())
    }

    /// Append an operand. Expressions add their own SQL, sequences expand
    /// element by element with `separator` between elements.
    pub fn append_value(
        &mut self,
        data_type: DataType,
        operand: &Operand,
        ctx: SqlContext,
        separator: Option<&str>,
    ) -> SqlResult<()> {
        match operand {
            Operand::Expr(expr) => expr.add_sql(self, ctx),
            Operand::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        if let Some(sep) = separator {
                            self.sql.push_str(sep);
                        }
                    }
                    self.append_value(data_type, item, ctx, separator)?;
                }
                Ok(())
            }
            Operand::Scalar(value) => self.append_literal(data_type, value),
        }
    }

    /// Expand a template with `{N}` placeholders.
    ///
    /// `{N:TYPE}` renders argument N as TYPE. Otherwise argument N takes
    /// `types[N]`, falling back to `types[0]` and then `Unknown`.
    pub fn append_template(
        &mut self,
        template: &str,
        values: &[Operand],
        types: &[DataType],
        ctx: SqlContext,
        separator: Option<&str>,
    ) -> SqlResult<()> {
        let invalid = |reason: String| SqlError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };
        let mut pos = 0;
        let mut placeholders = 0;
        while let Some(offset) = template[pos..].find('{') {
            let begin = pos + offset;
            self.sql.push_str(&template[pos..begin]);
            let end = template[begin + 1..]
                .find('}')
                .map(|o| begin + 1 + o)
                .ok_or_else(|| invalid(format!("unterminated placeholder at {}", begin)))?;
            let placeholder = &template[begin + 1..end];
            let (index, type_override) = match placeholder.split_once(':') {
                Some((index, type_name)) => {
                    let data_type = type_name
                        .parse::<DataType>()
                        .map_err(|e| invalid(e.to_string()))?;
                    (index, Some(data_type))
                }
                None => (placeholder, None),
            };
            let index: usize = index
                .trim()
                .parse()
                .map_err(|_| invalid(format!("placeholder '{}' is not an index", placeholder)))?;
            let value = values.get(index).ok_or_else(|| {
                invalid(format!(
                    "placeholder {} out of range for {} values",
                    index,
                    values.len()
                ))
            })?;
            let data_type = type_override
                .or_else(|| types.get(index).copied())
                .or_else(|| types.first().copied())
                .unwrap_or_default();
            self.append_value(data_type, value, ctx, separator)?;
            placeholders += 1;
            pos = end + 1;
        }
        self.sql.push_str(&template[pos..]);
        if placeholders == 0 && !values.is_empty() {
            warn!(template, "no placeholder found in template");
        }
        Ok(())
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    /// Emit the placeholder of a declared parameter.
    pub fn append_param(&mut self, param: ParamRef) -> SqlResult<()> {
        let Some(params) = self.params.as_deref_mut() else {
            return Err(SqlError::NotSupported {
                operation: "command parameter in a builder without parameter list".to_string(),
            });
        };
        params.notify_usage(param.id)?;
        self.sql.push_str(self.dialect.phrase(SqlPhrase::Parameter));
        Ok(())
    }

    /// Splice values bound elsewhere in at the current position.
    pub fn merge_sub_values(&mut self, values: Vec<Value>) -> SqlResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        match self.params.as_deref_mut() {
            Some(params) => {
                params.merge_values(values);
                Ok(())
            }
            None => Err(SqlError::NotSupported {
                operation: "sub-query with parameters in a builder without parameter list"
                    .to_string(),
            }),
        }
    }

    /// Append a complete sub-query and merge its bound values.
    pub fn append_query(&mut self, query: &QueryExpr) -> SqlResult<()> {
        let statement = query.render(self.dialect)?;
        self.sql.push_str(&statement.sql);
        self.merge_sub_values(statement.values)
    }
}

/// Byte offsets of `target` outside single-quoted literals.
///
/// An escaped quote (`''`) toggles twice and leaves the scan inside the
/// literal.
pub(crate) fn unquoted_offsets(text: &str, target: char) -> impl Iterator<Item = usize> + '_ {
    let mut quoted = false;
    text.char_indices().filter_map(move |(i, c)| {
        if c == '\'' {
            quoted = !quoted;
            None
        } else if c == target && !quoted {
            Some(i)
        } else {
            None
        }
    })
}

/// Number of `?` placeholders in SQL text. Question marks inside string
/// literals are not placeholders.
pub fn count_placeholders(sql: &str) -> usize {
    unquoted_offsets(sql, '?').count()
}

/// Split a function template at every unquoted `?`.
pub(crate) fn split_subject(template: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for offset in unquoted_offsets(template, '?') {
        parts.push(&template[start..offset]);
        start = offset + 1;
    }
    parts.push(&template[start..]);
    parts
}
