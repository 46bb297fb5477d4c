//! Running generated statements through a context over the mock driver.

use proptest::prelude::*;
use relata_context::{DbContext, MockConnection, Record, RecordState, RollbackHandler};
use relata_sql::{count_placeholders, Command, Expr, GenericDialect, QueryExpr};
use relata_test_utils::fixtures::{column, company_database, table_ref};
use relata_test_utils::{init_test_tracing, DataType, RelataConfig, RelataError, Value};
use std::sync::{Arc, Mutex};

struct RestoreName {
    key: String,
    name: Arc<Mutex<String>>,
    original: String,
}

impl RollbackHandler for RestoreName {
    fn object_key(&self) -> &str {
        &self.key
    }

    fn rollback(&mut self) {
        *self.name.lock().unwrap() = self.original.clone();
    }
}

fn context() -> DbContext<MockConnection> {
    DbContext::new(MockConnection::new(), GenericDialect::new())
}

#[test]
fn select_binds_values_and_returns_rows() {
    init_test_tracing();
    let db = company_database(&RelataConfig::default());
    let mut ctx = context();
    ctx.connection_mut()
        .unwrap()
        .push_result(&["ID", "LASTNAME"], vec![vec![Value::Int(7), Value::from("Hopper")]]);

    let mut cmd = Command::new();
    let last = cmd.add_param(DataType::Varchar, "Hopper");
    cmd.select(column(&db, "EMPLOYEES", "ID"))
        .select(column(&db, "EMPLOYEES", "LASTNAME"))
        .where_(Expr::from(column(&db, "EMPLOYEES", "LASTNAME")).is(last));
    let mut query = QueryExpr::from(cmd);

    let rows = ctx.query_rows(&mut query).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id").unwrap(), &Value::Int(7));
    assert_eq!(rows[0].to_json()["LASTNAME"], "Hopper");

    let executed = ctx.connection().unwrap().executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].sql.ends_with("WHERE t2.LASTNAME=?"));
    assert_eq!(executed[0].values, vec![Value::from("Hopper")]);
    assert_eq!(ctx.stats().queries, 1);
}

#[test]
fn question_mark_in_literal_is_not_a_placeholder() {
    let db = company_database(&RelataConfig::default());
    let mut ctx = context();
    ctx.connection_mut()
        .unwrap()
        .push_result(&["ID"], vec![vec![Value::Int(3)]]);

    let mut cmd = Command::new();
    let department = cmd.add_param(DataType::Integer, 2);
    cmd.select(column(&db, "EMPLOYEES", "ID"))
        .where_(Expr::from(column(&db, "EMPLOYEES", "LASTNAME")).like("Who?%"))
        .where_(Expr::from(column(&db, "EMPLOYEES", "DEPARTMENT_ID")).is(department));

    let row = ctx.query_single_row(&mut cmd).unwrap().unwrap();
    assert_eq!(row.get("ID").unwrap(), &Value::Int(3));
    let executed = &ctx.connection().unwrap().executed()[0];
    assert!(executed
        .sql
        .ends_with("WHERE t2.LASTNAME LIKE 'Who?%' AND t2.DEPARTMENT_ID=?"));
    assert_eq!(executed.values, vec![Value::Int(2)]);
}

#[test]
fn rollback_restores_registered_objects() {
    let db = company_database(&RelataConfig::default());
    let employees = table_ref(&db, "EMPLOYEES");
    let mut ctx = context();
    let name = Arc::new(Mutex::new("Lovelace".to_string()));

    *name.lock().unwrap() = "Byron".to_string();
    ctx.append_rollback_handler(Box::new(RestoreName {
        key: "EMPLOYEES:5".to_string(),
        name: Arc::clone(&name),
        original: "Lovelace".to_string(),
    }));

    let mut update = Command::new();
    update
        .set(&column(&db, "EMPLOYEES", "LASTNAME"), "Byron")
        .where_(Expr::from(column(&db, "EMPLOYEES", "ID")).is(5));
    assert_eq!(ctx.execute_update(&mut update, &employees).unwrap(), 1);

    ctx.rollback().unwrap();
    assert_eq!(*name.lock().unwrap(), "Lovelace");
    assert_eq!(ctx.pending_rollback_handlers(), 0);
    assert_eq!(ctx.connection().unwrap().rollbacks(), 1);
    assert_eq!(ctx.stats().rollbacks, 1);
}

#[test]
fn commit_discards_handlers() {
    let mut ctx = context();
    let name = Arc::new(Mutex::new("Byron".to_string()));
    ctx.append_rollback_handler(Box::new(RestoreName {
        key: "EMPLOYEES:5".to_string(),
        name: Arc::clone(&name),
        original: "Lovelace".to_string(),
    }));
    ctx.commit().unwrap();
    assert_eq!(ctx.pending_rollback_handlers(), 0);
    ctx.rollback().unwrap();
    assert_eq!(*name.lock().unwrap(), "Byron");
    assert_eq!(ctx.connection().unwrap().commits(), 1);
}

#[test]
fn disabled_rollback_handling_ignores_handlers() {
    let mut ctx = context().with_rollback_handling(false);
    ctx.append_rollback_handler(Box::new(RestoreName {
        key: "x".to_string(),
        name: Arc::default(),
        original: String::new(),
    }));
    assert_eq!(ctx.pending_rollback_handlers(), 0);
    assert!(!ctx.remove_rollback_handler("x"));
}

#[test]
fn driver_failure_is_reported() {
    let db = company_database(&RelataConfig::default());
    let departments = table_ref(&db, "DEPARTMENTS");
    let mut ctx = DbContext::new(
        MockConnection::new().fail_on("DEPARTMENTS"),
        GenericDialect::new(),
    );
    let mut delete = Command::new();
    delete.where_(Expr::from(column(&db, "DEPARTMENTS", "ID")).is(1));
    let err = ctx.execute_delete(&mut delete, &departments).unwrap_err();
    assert!(matches!(err, RelataError::Context(_)));
    assert_eq!(ctx.stats().statements, 0);
}

#[test]
fn record_update_writes_changed_columns_by_key() {
    init_test_tracing();
    let db = company_database(&RelataConfig::default());
    let employees = db.table("EMPLOYEES").unwrap();
    let mut ctx = context();
    ctx.connection_mut().unwrap().push_result(
        &[
            "ID",
            "FIRSTNAME",
            "LASTNAME",
            "DEPARTMENT_ID",
            "SALARY",
            "DATE_OF_BIRTH",
            "RETIRED",
            "PHOTO",
            "RESUME",
        ],
        vec![vec![
            Value::Int(5),
            Value::from("Ada"),
            Value::from("Lovelace"),
            Value::Int(2),
            Value::Null,
            Value::Null,
            Value::Bool(false),
            Value::Null,
            Value::Null,
        ]],
    );

    let mut record = Record::read(&mut ctx, employees, &[Value::Int(5)]).unwrap();
    record.set_value("FIRSTNAME", "Augusta").unwrap();
    record.set_value("LASTNAME", "Byron").unwrap();
    record.set_value("DEPARTMENT_ID", 2).unwrap();
    assert_eq!(record.state(), RecordState::Modified);
    record.update(&mut ctx).unwrap();

    let executed = ctx.connection().unwrap().executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[0].sql.ends_with("FROM EMPLOYEES t2\r\nWHERE t2.ID=5"));
    assert_eq!(
        executed[1].sql,
        "UPDATE EMPLOYEES\r\nSET FIRSTNAME='Augusta', LASTNAME='Byron'\r\nWHERE ID=5"
    );
    assert_eq!(record.state(), RecordState::Valid);
    assert_eq!(ctx.stats().statements, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Every insert reaching the driver has one value per placeholder.
    #[test]
    fn prop_inserts_reach_driver_consistent(
        first in "[A-Za-z]{1,12}",
        last in "[A-Za-z']{1,12}",
        photo in prop::collection::vec(any::<u8>(), 1..16),
        auto_prepare in any::<bool>(),
    ) {
        let config = RelataConfig { auto_prepare_statements: auto_prepare, ..RelataConfig::default() };
        let db = company_database(&config);
        let employees = table_ref(&db, "EMPLOYEES");
        let mut ctx = context();

        let mut insert = Command::with_config(&config);
        insert
            .set(&column(&db, "EMPLOYEES", "FIRSTNAME"), first)
            .set(&column(&db, "EMPLOYEES", "LASTNAME"), last)
            .set(&column(&db, "EMPLOYEES", "PHOTO"), Value::Bytes(photo));
        ctx.execute_insert(&mut insert, &employees).unwrap();

        let executed = &ctx.connection().unwrap().executed()[0];
        prop_assert_eq!(count_placeholders(&executed.sql), executed.values.len());
        prop_assert_eq!(executed.values.len(), if auto_prepare { 3 } else { 1 });
    }
}
