//! Dialect seam
//!
//! A `DialectHandler` supplies the SQL phrases that differ between database
//! systems and turns values into SQL literals. `GenericDialect` carries the
//! default phrase table and accepts per-phrase overrides.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use relata_core::{DataType, SqlError, SqlResult, Value};
use std::collections::HashMap;
use tracing::error;

// ============================================================================
// PHRASES
// ============================================================================

/// SQL phrases a dialect may override.
///
/// Function phrases are templates: `?` stands for the subject expression
/// and `{N}` for the N-th argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlPhrase {
    Null,
    Parameter,
    RenameTable,
    RenameColumn,
    Concat,

    BooleanTrue,
    BooleanFalse,
    CurrentDate,
    DatePattern,
    DateTemplate,
    CurrentTime,
    TimePattern,
    TimeTemplate,
    CurrentDateTime,
    DateTimePattern,
    DateTimeTemplate,
    CurrentTimestamp,
    TimestampPattern,
    TimestampTemplate,

    Coalesce,
    Substring,
    SubstringEx,
    Replace,
    Reverse,
    StrIndex,
    StrIndexFrom,
    Length,
    Upper,
    Lower,
    Trim,
    LTrim,
    RTrim,
    Escape,

    Abs,
    Round,
    Trunc,
    Floor,
    Ceiling,
    Modulo,
    Format,

    Day,
    Month,
    Year,

    Sum,
    Max,
    Min,
    Avg,
    Count,

    Decode,
    DecodeSep,
    DecodePart,
    DecodeElse,
}

impl SqlPhrase {
    /// Text used when the dialect does not override the phrase.
    ///
    /// Date and time patterns are `chrono` format strings.
    pub fn default_text(&self) -> &'static str {
        match self {
            SqlPhrase::Null => "null",
            SqlPhrase::Parameter => "?",
            SqlPhrase::RenameTable => " ",
            SqlPhrase::RenameColumn => " AS ",
            SqlPhrase::Concat => "+",

            SqlPhrase::BooleanTrue => "1",
            SqlPhrase::BooleanFalse => "0",
            SqlPhrase::CurrentDate => "sysdate",
            SqlPhrase::DatePattern => "%Y-%m-%d",
            SqlPhrase::DateTemplate => "TO_DATE('{0}', 'YYYY-MM-DD')",
            SqlPhrase::CurrentTime => "sysdate",
            SqlPhrase::TimePattern => "%H:%M:%S",
            SqlPhrase::TimeTemplate => "TO_DATE('{0}', 'HH24:MI:SS')",
            SqlPhrase::CurrentDateTime => "sysdate",
            SqlPhrase::DateTimePattern => "%Y-%m-%d %H:%M:%S%.3f",
            SqlPhrase::DateTimeTemplate => "TO_DATE('{0}', 'YYYY-MM-DD HH24:MI:SS')",
            SqlPhrase::CurrentTimestamp => "systimestamp",
            SqlPhrase::TimestampPattern => "%Y-%m-%d %H:%M:%S%.3f",
            SqlPhrase::TimestampTemplate => "TO_TIMESTAMP('{0}', 'YYYY.MM.DD HH24:MI:SS.FF')",

            SqlPhrase::Coalesce => "coalesce(?, {0})",
            SqlPhrase::Substring => "substring(?,{0})",
            SqlPhrase::SubstringEx => "substring(?, {0}, {1})",
            SqlPhrase::Replace => "replace(?, {0}, {1})",
            SqlPhrase::Reverse => "reverse(?)",
            SqlPhrase::StrIndex => "charindex({0}, ?)",
            SqlPhrase::StrIndexFrom => "charindex({0}, ?, {1})",
            SqlPhrase::Length => "length(?)",
            SqlPhrase::Upper => "upper(?)",
            SqlPhrase::Lower => "lower(?)",
            SqlPhrase::Trim => "trim(?)",
            SqlPhrase::LTrim => "ltrim(?)",
            SqlPhrase::RTrim => "rtrim(?)",
            SqlPhrase::Escape => "? escape '{0}'",

            SqlPhrase::Abs => "abs(?)",
            SqlPhrase::Round => "round(?, {0})",
            SqlPhrase::Trunc => "trunc(?, {0})",
            SqlPhrase::Floor => "floor(?)",
            SqlPhrase::Ceiling => "ceiling(?)",
            SqlPhrase::Modulo => "((?) % {0})",
            SqlPhrase::Format => "format(?, {0:VARCHAR})",

            SqlPhrase::Day => "day(?)",
            SqlPhrase::Month => "month(?)",
            SqlPhrase::Year => "year(?)",

            SqlPhrase::Sum => "sum(?)",
            SqlPhrase::Max => "max(?)",
            SqlPhrase::Min => "min(?)",
            SqlPhrase::Avg => "avg(?)",
            SqlPhrase::Count => "count(?)",

            SqlPhrase::Decode => "case ? {0} end",
            SqlPhrase::DecodeSep => " ",
            SqlPhrase::DecodePart => "when {0} then {1}",
            SqlPhrase::DecodeElse => "else {0}",
        }
    }

    /// True for aggregate functions, which force a GROUP BY on other columns.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            SqlPhrase::Sum | SqlPhrase::Max | SqlPhrase::Min | SqlPhrase::Avg | SqlPhrase::Count
        )
    }
}

// ============================================================================
// DIALECT HANDLER
// ============================================================================

/// Database-specific SQL rendering.
pub trait DialectHandler: Send + Sync {
    /// Text for a phrase in this dialect.
    fn phrase(&self, phrase: SqlPhrase) -> &str;

    /// Render a value as an SQL literal of the given type.
    fn value_to_literal(&self, value: &Value, data_type: DataType) -> SqlResult<String> {
        format_literal(self, value, data_type)
    }
}

/// Default dialect with optional phrase overrides.
#[derive(Debug, Clone, Default)]
pub struct GenericDialect {
    overrides: HashMap<SqlPhrase, String>,
}

impl GenericDialect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a single phrase.
    pub fn with_phrase(mut self, phrase: SqlPhrase, text: impl Into<String>) -> Self {
        self.overrides.insert(phrase, text.into());
        self
    }
}

impl DialectHandler for GenericDialect {
    fn phrase(&self, phrase: SqlPhrase) -> &str {
        self.overrides
            .get(&phrase)
            .map(String::as_str)
            .unwrap_or_else(|| phrase.default_text())
    }
}

// ============================================================================
// LITERAL FORMATTING
// ============================================================================

/// Render `value` as a literal of `data_type` using `dialect`'s phrases.
///
/// Null and empty text render as the null phrase.
pub fn format_literal<D: DialectHandler + ?Sized>(
    dialect: &D,
    value: &Value,
    data_type: DataType,
) -> SqlResult<String> {
    if let Value::Entry(entry) = value {
        return format_literal(dialect, &entry.value, data_type);
    }
    if value.is_empty() {
        return Ok(dialect.phrase(SqlPhrase::Null).to_string());
    }
    match data_type {
        DataType::Date => date_time_literal(
            dialect,
            value,
            SqlPhrase::DateTemplate,
            SqlPhrase::DatePattern,
            SqlPhrase::CurrentDate,
        ),
        DataType::Time => date_time_literal(
            dialect,
            value,
            SqlPhrase::TimeTemplate,
            SqlPhrase::TimePattern,
            SqlPhrase::CurrentTime,
        ),
        DataType::DateTime => {
            // A bare date renders through the date template
            let date_only = match value {
                Value::Date(_) => true,
                Value::Text(s) => s.trim().chars().count() <= 10,
                _ => false,
            };
            if date_only {
                date_time_literal(
                    dialect,
                    value,
                    SqlPhrase::DateTemplate,
                    SqlPhrase::DatePattern,
                    SqlPhrase::CurrentTimestamp,
                )
            } else {
                date_time_literal(
                    dialect,
                    value,
                    SqlPhrase::DateTimeTemplate,
                    SqlPhrase::DateTimePattern,
                    SqlPhrase::CurrentDateTime,
                )
            }
        }
        DataType::Timestamp => date_time_literal(
            dialect,
            value,
            SqlPhrase::TimestampTemplate,
            SqlPhrase::TimestampPattern,
            SqlPhrase::CurrentTimestamp,
        ),
        DataType::Varchar | DataType::Char | DataType::Clob | DataType::UniqueId => {
            Ok(string_literal(&value.to_string()))
        }
        DataType::Bool => {
            let truthy = match value {
                Value::Bool(b) => *b,
                other => string_to_bool(&other.to_string()),
            };
            let phrase = if truthy {
                SqlPhrase::BooleanTrue
            } else {
                SqlPhrase::BooleanFalse
            };
            Ok(dialect.phrase(phrase).to_string())
        }
        DataType::Integer | DataType::Decimal | DataType::Float => {
            number_literal(value, data_type)
        }
        DataType::Blob => Err(SqlError::NotSupported {
            operation: "BLOB literal; bind the value as a command parameter".to_string(),
        }),
        DataType::AutoInc | DataType::Unknown => Ok(value.to_string()),
    }
}

/// Quote text, doubling embedded single quotes.
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push_str("''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// `1`, `true` and `y` (case-insensitive) are true, everything else false.
pub fn string_to_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("y")
}

fn number_literal(value: &Value, data_type: DataType) -> SqlResult<String> {
    match value {
        Value::Int(i) => return Ok(i.to_string()),
        Value::Float(f) => return Ok(f.to_string()),
        Value::Enum(e) => return Ok(e.ordinal.to_string()),
        _ => {}
    }
    let text = value.to_string();
    let integer_only = data_type == DataType::Integer;
    for (i, c) in text.char_indices() {
        if c.is_ascii_digit() || c == '-' || c == '+' {
            continue;
        }
        // trailing text after a space is cut off
        if c == ' ' && i > 0 {
            return Ok(text[..i].to_string());
        }
        if integer_only || (c != '.' && c != ',') {
            return Err(SqlError::InvalidLiteral {
                data_type,
                value: text.clone(),
                reason: "not a number".to_string(),
            });
        }
    }
    Ok(text)
}

fn date_time_literal<D: DialectHandler + ?Sized>(
    dialect: &D,
    value: &Value,
    template: SqlPhrase,
    pattern: SqlPhrase,
    current: SqlPhrase,
) -> SqlResult<String> {
    let timestamp = match value {
        Value::SysDate => return Ok(dialect.phrase(current).to_string()),
        Value::Date(d) => d.and_time(NaiveTime::MIN),
        Value::DateTime(dt) => *dt,
        Value::Time(t) => Local::now().date_naive().and_time(*t),
        other => parse_timestamp(&other.to_string()).ok_or_else(|| {
            error!(value = %other, "unable to parse date value");
            SqlError::InvalidLiteral {
                data_type: DataType::DateTime,
                value: other.to_string(),
                reason: "expected yyyy-mm-dd[ hh:mm:ss[.fff]]".to_string(),
            }
        })?,
    };
    let formatted = timestamp.format(dialect.phrase(pattern)).to_string();
    Ok(dialect.phrase(template).replace("{0}", &formatted))
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
