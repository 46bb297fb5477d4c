//! RELATA Test Utilities
//!
//! Shared test infrastructure for the RELATA workspace:
//! - Proptest generators for values, types and configuration
//! - A sample company schema
//! - Assertions over generated SQL
//! - Tracing setup for test binaries

// Re-export core types for convenience
pub use relata_core::{
    BlobData, ClobData, DataType, EnumValue, RelataConfig, RelataError, RelataResult, SqlError,
    Value,
};
pub use relata_schema::{
    CascadeAction, ColumnRef, ColumnReference, Database, Index, IndexType, Relation, Table,
    TableRef,
};

use tracing_subscriber::EnvFilter;

// ============================================================================
// TRACING
// ============================================================================

/// Install a `fmt` subscriber writing through the test harness.
///
/// Honors `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating RELATA values and types.

    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a plain SQL identifier.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9_]{0,15}"
    }

    /// Generate a DataType variant.
    pub fn arb_data_type() -> impl Strategy<Value = DataType> {
        prop::sample::select(vec![
            DataType::Unknown,
            DataType::Integer,
            DataType::AutoInc,
            DataType::Varchar,
            DataType::Date,
            DataType::Time,
            DataType::DateTime,
            DataType::Timestamp,
            DataType::Char,
            DataType::Float,
            DataType::Decimal,
            DataType::Bool,
            DataType::Clob,
            DataType::Blob,
            DataType::UniqueId,
        ])
    }

    /// Generate a DataType that renders as an SQL literal (no BLOB).
    pub fn arb_literal_type() -> impl Strategy<Value = DataType> {
        arb_data_type().prop_filter("BLOB has no literal form", |t| *t != DataType::Blob)
    }

    /// Generate a calendar date.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (1970i32..2100, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    /// Generate a time of day.
    pub fn arb_time() -> impl Strategy<Value = NaiveTime> {
        (0u32..24, 0u32..60, 0u32..60)
            .prop_map(|(h, m, s)| NaiveTime::from_hms_opt(h, m, s).unwrap_or_default())
    }

    /// Generate a text value, quotes included.
    pub fn arb_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 '?%]{0,24}"
    }

    /// Generate a scalar value of any kind bindable as a parameter.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e9f64..1.0e9).prop_map(Value::Float),
            arb_text().prop_map(Value::Text),
            prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
            arb_date().prop_map(Value::Date),
            arb_time().prop_map(Value::Time),
            any::<[u8; 16]>().prop_map(|b| Value::Uuid(Uuid::from_bytes(b))),
        ]
    }

    /// Generate a value together with a type it renders as a literal.
    pub fn arb_typed_literal() -> impl Strategy<Value = (DataType, Value)> {
        prop_oneof![
            any::<i64>().prop_map(|i| (DataType::Integer, Value::Int(i))),
            arb_text().prop_map(|s| (DataType::Varchar, Value::Text(s))),
            any::<bool>().prop_map(|b| (DataType::Bool, Value::Bool(b))),
            arb_date().prop_map(|d| (DataType::Date, Value::Date(d))),
            (-1.0e6f64..1.0e6).prop_map(|f| (DataType::Decimal, Value::Float(f))),
        ]
    }

    /// Generate a valid RelataConfig.
    pub fn arb_config() -> impl Strategy<Value = RelataConfig> {
        (any::<bool>(), any::<bool>(), prop::option::of(arb_identifier())).prop_map(
            |(auto_prepare_statements, warn_on_unused_params, schema)| RelataConfig {
                auto_prepare_statements,
                schema,
                warn_on_unused_params,
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built schema for common testing scenarios.

    use super::*;

    /// The sample company schema: DEPARTMENTS and EMPLOYEES with a foreign
    /// key from EMPLOYEES.DEPARTMENT_ID to DEPARTMENTS.ID.
    ///
    /// Panics on construction failure; test-only code.
    pub fn company_database(config: &RelataConfig) -> Database {
        let mut db = Database::with_config("company", config);

        let mut departments = Table::new("DEPARTMENTS").with_alias("t1");
        let id = departments
            .add_column("ID", DataType::AutoInc, 0, true)
            .expect("DEPARTMENTS.ID");
        departments
            .add_column("NAME", DataType::Varchar, 80, true)
            .expect("DEPARTMENTS.NAME");
        departments
            .add_column("BUSINESS_UNIT", DataType::Char, 4, true)
            .expect("DEPARTMENTS.BUSINESS_UNIT");
        departments.set_primary_key(vec![id]).expect("DEPARTMENTS pk");
        let name = departments.column("NAME").expect("DEPARTMENTS.NAME");
        departments
            .add_index("DEPARTMENT_NAME_IDX", IndexType::Unique, vec![name])
            .expect("DEPARTMENT_NAME_IDX");
        db.add_table(departments).expect("add DEPARTMENTS");

        let mut employees = Table::new("EMPLOYEES").with_alias("t2");
        let id = employees
            .add_column("ID", DataType::AutoInc, 0, true)
            .expect("EMPLOYEES.ID");
        for (name, data_type, size, required) in [
            ("FIRSTNAME", DataType::Varchar, 40, true),
            ("LASTNAME", DataType::Varchar, 40, true),
            ("DEPARTMENT_ID", DataType::Integer, 0, true),
            ("SALARY", DataType::Decimal, 10, false),
            ("DATE_OF_BIRTH", DataType::Date, 0, false),
            ("RETIRED", DataType::Bool, 0, true),
            ("PHOTO", DataType::Blob, 0, false),
            ("RESUME", DataType::Clob, 0, false),
        ] {
            employees
                .add_column(name, data_type, size, required)
                .expect("EMPLOYEES column");
        }
        employees.set_primary_key(vec![id]).expect("EMPLOYEES pk");
        let first = employees.column("FIRSTNAME").expect("FIRSTNAME");
        let last = employees.column("LASTNAME").expect("LASTNAME");
        employees
            .add_index("EMPLOYEE_NAME_IDX", IndexType::Standard, vec![last, first])
            .expect("EMPLOYEE_NAME_IDX");
        db.add_table(employees).expect("add EMPLOYEES");

        let source = column(&db, "EMPLOYEES", "DEPARTMENT_ID");
        let target = column(&db, "DEPARTMENTS", "ID");
        db.add_relation(
            "EMPLOYEES_DEPARTMENT_FK",
            vec![ColumnReference::new(source, target)],
            CascadeAction::None,
        )
        .expect("EMPLOYEES_DEPARTMENT_FK");
        db
    }

    /// Column reference of a registered table. Panics if absent.
    pub fn column(db: &Database, table: &str, name: &str) -> ColumnRef {
        db.table(table)
            .and_then(|t| t.column(name))
            .unwrap_or_else(|| panic!("no column {}.{}", table, name))
    }

    /// Table reference of a registered table. Panics if absent.
    pub fn table_ref(db: &Database, table: &str) -> TableRef {
        db.table(table)
            .map(|t| t.table_ref().clone())
            .unwrap_or_else(|| panic!("no table {}", table))
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over generated SQL.

    /// Assert that the SQL has one `?` per value. Question marks inside
    /// quoted literals do not count.
    #[track_caller]
    pub fn assert_placeholders_match<T: std::fmt::Debug>(sql: &str, values: &[T]) {
        let mut quoted = false;
        let placeholders = sql
            .chars()
            .filter(|c| {
                if *c == '\'' {
                    quoted = !quoted;
                }
                *c == '?' && !quoted
            })
            .count();
        assert_eq!(
            placeholders,
            values.len(),
            "{} placeholders but {} values in:\n{}\nvalues: {:?}",
            placeholders,
            values.len(),
            sql,
            values
        );
    }
}
