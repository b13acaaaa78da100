//! Unit tests for the statement wrapper.

use std::rc::{Rc, Weak};

use test_case::test_case;

use super::*;
use crate::ffi::RawDb;

fn open_with_table() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, val INTEGER);
         INSERT INTO t (id, val) VALUES (1, 10), (2, 20), (3, 30);",
    )
    .expect("create table");
    conn
}

fn single_value(stmt: &mut Statement) -> Variant {
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    stmt.row().swap_remove("v").expect("column v")
}

#[test_case(Variant::Nil, Variant::Nil ; "null")]
#[test_case(Variant::Bool(true), Variant::Int(1) ; "true as integer")]
#[test_case(Variant::Bool(false), Variant::Int(0) ; "false as integer")]
#[test_case(Variant::Int(i64::MIN), Variant::Int(i64::MIN) ; "integer")]
#[test_case(Variant::Float(-2.5), Variant::Float(-2.5) ; "float")]
#[test_case(Variant::from("héllo wörld ✓"), Variant::from("héllo wörld ✓") ; "non-ascii text")]
#[test_case(Variant::StringName("name".into()), Variant::from("name") ; "string name as text")]
#[test_case(Variant::Bytes(vec![0, 0xDE, 0xAD, 0]), Variant::Bytes(vec![0, 0xDE, 0xAD, 0]) ; "bytes")]
#[test_case(Variant::Bytes(Vec::new()), Variant::Nil ; "empty bytes as null")]
fn test_bind_round_trip(input: Variant, expected: Variant) {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v").expect("prepare");
    stmt.bind(0, &input).expect("bind");
    assert_eq!(single_value(&mut stmt), expected);
}

#[test]
fn test_decode_storage_classes() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn
        .prepare("SELECT 7 AS i, 1.5 AS f, 'a' || char(0) || 'b' AS s, x'00ff' AS b, x'' AS e, NULL AS n")
        .expect("prepare");
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    let row = stmt.row();
    assert_eq!(row["i"], Variant::Int(7));
    assert_eq!(row["f"], Variant::Float(1.5));
    assert_eq!(row["s"], Variant::from("a\0b"));
    assert_eq!(row["b"], Variant::Bytes(vec![0x00, 0xFF]));
    assert_eq!(row["e"], Variant::Bytes(Vec::new()));
    assert_eq!(row["n"], Variant::Nil);
}

#[test]
fn test_row_keeps_column_order_and_last_duplicate_wins() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT 3 AS z, 1 AS a, 2 AS z").expect("prepare");
    assert_eq!(stmt.column_names(), vec!["z", "a", "z"]);
    stmt.step().expect("step");
    let row = stmt.row();
    assert_eq!(row.len(), 2);
    assert_eq!(row.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    assert_eq!(row["z"], Variant::Int(2));
}

#[test]
fn test_bind_out_of_range_keeps_bindings() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v").expect("prepare");
    stmt.bind(0, &Variant::Int(5)).expect("bind");

    let err = stmt.bind(1, &Variant::Int(6)).unwrap_err();
    assert_eq!(err, StatementError::IndexOutOfRange { index: 1, count: 1 });
    assert_eq!(err.kind(), ErrorKind::Parameter);
    assert!(stmt.bind(-1, &Variant::Int(7)).is_err());

    assert_eq!(single_value(&mut stmt), Variant::Int(5));
}

#[test]
fn test_bind_unsupported_type_keeps_binding() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v").expect("prepare");
    stmt.bind(0, &Variant::from("kept")).expect("bind");

    let err = stmt.bind(0, &Variant::Array(Vec::new())).unwrap_err();
    assert_eq!(err, StatementError::UnsupportedType { type_name: "array" });
    assert_eq!(err.code(), codes::SQLITE_MISMATCH);
    assert!(stmt.error_message().contains("array"));

    assert_eq!(single_value(&mut stmt), Variant::from("kept"));
}

#[test]
fn test_bind_all_requires_enough_values() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 + ?2 AS v").expect("prepare");
    stmt.bind_all(params![1, 2]).expect("bind_all");

    let err = stmt.bind_all(params![100]).unwrap_err();
    assert_eq!(
        err,
        StatementError::InsufficientParameters {
            required: 2,
            provided: 1
        }
    );
    assert_eq!(single_value(&mut stmt), Variant::Int(3));
}

#[test]
fn test_bind_all_tolerates_extra_values_and_stops_at_unsupported() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v, ?2 AS w").expect("prepare");
    stmt.bind_all(params![1, 2, 3]).expect("bind_all with a surplus value");

    let values = [Variant::Int(9), Variant::Dictionary(Row::new()), Variant::Int(8)];
    assert!(stmt.bind_all(&values).is_err());
    stmt.step().expect("step");
    let row = stmt.row();
    assert_eq!(row["v"], Variant::Int(9));
    assert_eq!(row["w"], Variant::Int(2));
}

#[test]
fn test_bind_named_strips_sigils_and_ignores_extra_keys() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn
        .prepare("SELECT :a AS a, @b AS b, $c AS c, :a AS again")
        .expect("prepare");
    assert_eq!(stmt.parameter_count(), 3);
    assert_eq!(stmt.parameter_name(1).as_deref(), Some("@b"));

    let values: Row = [
        ("c".to_string(), Variant::from("see")),
        ("unrelated".to_string(), Variant::Array(Vec::new())),
        ("b".to_string(), Variant::Float(0.5)),
        ("a".to_string(), Variant::Int(1)),
    ]
    .into_iter()
    .collect();
    stmt.bind_named(&values).expect("bind_named");

    stmt.step().expect("step");
    let row = stmt.row();
    assert_eq!(row["a"], Variant::Int(1));
    assert_eq!(row["b"], Variant::Float(0.5));
    assert_eq!(row["c"], Variant::from("see"));
    assert_eq!(row["again"], Variant::Int(1));
}

#[test]
fn test_bind_named_missing_and_nameless() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT :a AS a, :b AS b").expect("prepare");
    let only_a: Row = [("a".to_string(), Variant::Int(1))].into_iter().collect();
    assert_eq!(
        stmt.bind_named(&only_a).unwrap_err(),
        StatementError::MissingNamedParameter {
            name: "b".to_string()
        }
    );

    let mut positional = conn.prepare("SELECT ? AS v").expect("prepare");
    assert_eq!(positional.parameter_name(0), None);
    assert_eq!(
        positional.bind_named(&only_a).unwrap_err(),
        StatementError::NamelessParameter { index: 0 }
    );
}

#[test]
fn test_clear_bindings_resets_to_null() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v").expect("prepare");
    stmt.bind(0, &Variant::Int(5)).expect("bind");
    stmt.clear_bindings().expect("clear_bindings");
    assert_eq!(single_value(&mut stmt), Variant::Nil);
}

#[test]
fn test_reset_restarts_iteration_with_bindings_kept() {
    let conn = open_with_table();
    let mut stmt = conn
        .prepare("SELECT val FROM t WHERE val > ?1 ORDER BY val")
        .expect("prepare");
    stmt.bind(0, &Variant::Int(10)).expect("bind");

    stmt.step().expect("step");
    stmt.step().expect("step");
    assert_eq!(stmt.row()["val"], Variant::Int(30));

    stmt.reset().expect("reset");
    assert!(stmt.row().is_empty());
    stmt.step().expect("step");
    assert_eq!(stmt.row()["val"], Variant::Int(20));
}

#[test]
fn test_fetch_all_returns_rows_in_order() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("SELECT id, val FROM t ORDER BY id").expect("prepare");
    let rows = stmt.fetch_all();
    let names = stmt.column_names();

    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.keys().cloned().collect::<Vec<_>>(), names);
        let id = i64::try_from(i + 1).expect("small index");
        assert_eq!(row["id"], Variant::Int(id));
        assert_eq!(row["val"], Variant::Int(id * 10));
    }
    assert!(stmt.row().is_empty());
    assert!(stmt.error_message().is_empty());
}

#[test]
fn test_fetch_all_keeps_rows_before_an_error() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn
        .prepare(
            "SELECT column1 AS v, abs(column1 - 9223372036854775807 - 4) AS w
             FROM (VALUES (1), (2), (3), (4))",
        )
        .expect("prepare");
    let rows = stmt.fetch_all();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["v"], Variant::Int(2));
    assert!(stmt.error_message().contains("integer overflow"));
    assert!(stmt.row().is_empty());
}

#[test]
fn test_step_error_passes_engine_code_through() {
    let conn = open_with_table();
    let mut stmt = conn
        .prepare("INSERT INTO t (id, val) VALUES (?1, 0)")
        .expect("prepare");
    stmt.bind(0, &Variant::Int(1)).expect("bind");

    let err = stmt.step().unwrap_err();
    assert_eq!(err.code(), codes::SQLITE_CONSTRAINT);
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(stmt.error_message().contains("UNIQUE constraint failed"));
}

#[test]
fn test_execute_runs_to_completion() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("UPDATE t SET val = val + 1").expect("prepare");
    stmt.execute().expect("execute");
    assert_eq!(conn.changes(), 3);

    let mut failing = conn
        .prepare("INSERT INTO t (id, val) VALUES (1, 0)")
        .expect("prepare");
    assert!(failing.execute().is_err());
}

#[test]
fn test_column_names_of_statement_without_columns() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("CREATE TABLE empty (x)").expect("prepare");
    assert!(stmt.column_names().is_empty());
    assert_eq!(stmt.column_count(), 0);
    stmt.execute().expect("execute");
    assert!(stmt.column_names().is_empty());
}

#[test]
fn test_uninitialized_statement_fails_closed() {
    let mut stmt = Statement::new();
    assert_eq!(stmt.status(), StatementStatus::Uninitialized);
    assert!(!stmt.is_valid());
    assert_eq!(stmt.parameter_count(), 0);
    assert!(stmt.column_names().is_empty());

    assert_eq!(stmt.bind(0, &Variant::Nil).unwrap_err(), StatementError::Uninitialized);
    let err = stmt.step().unwrap_err();
    assert_eq!(err.code(), codes::SQLITE_MISUSE);
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert!(stmt.fetch_all().is_empty());
    assert_eq!(stmt.error_message(), "statement is uninitialized");
}

#[test]
fn test_data_operations_fail_after_finalize() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("SELECT val FROM t WHERE id = ?1").expect("prepare");
    assert_eq!(stmt.column_names(), vec!["val"]);
    stmt.finalize();

    assert!(!stmt.is_valid());
    assert_eq!(stmt.status(), StatementStatus::Finalized);
    assert_eq!(stmt.bind(0, &Variant::Int(1)).unwrap_err(), StatementError::Finalized);
    assert!(stmt.bind_all(params![1]).is_err());
    assert!(stmt.reset().is_err());
    assert!(stmt.execute().is_err());
    assert_eq!(stmt.step().unwrap_err().code(), codes::SQLITE_MISUSE);
    assert!(stmt.fetch_all().is_empty());
    assert!(stmt.column_names().is_empty());
    assert!(!stmt.is_valid());
}

#[test]
fn test_double_finalize_keeps_error_message() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v").expect("prepare");
    assert!(stmt.bind(3, &Variant::Nil).is_err());
    let message = stmt.error_message();

    stmt.finalize();
    stmt.finalize();
    assert_eq!(stmt.status(), StatementStatus::Finalized);
    assert_eq!(stmt.error_message(), message);
}

#[test]
fn test_connection_teardown_notification() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("SELECT id FROM t ORDER BY id").expect("prepare");
    stmt.step().expect("step");
    assert!(!stmt.row().is_empty());

    stmt.connection_finalized();
    assert!(stmt.row().is_empty());
    assert_eq!(stmt.status(), StatementStatus::ConnectionFinalized);
    assert_eq!(i64::from(stmt.status()), 3);

    stmt.connection_finalized();
    stmt.finalize();
    assert_eq!(stmt.status(), StatementStatus::ConnectionFinalized);
    assert_eq!(stmt.step().unwrap_err(), StatementError::ConnectionGone);
}

#[test]
fn test_dropping_connection_orphans_statements() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("SELECT id FROM t").expect("prepare");
    let mut other = conn.prepare("SELECT val FROM t").expect("prepare");
    stmt.step().expect("step");
    conn.close();

    for statement in [&mut stmt, &mut other] {
        assert_eq!(statement.status(), StatementStatus::ConnectionFinalized);
        assert!(statement.row().is_empty());
        assert!(statement.reset().is_err());
    }
}

#[test]
fn test_prepare_into_reinitializes() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("SELECT id FROM t").expect("prepare");
    stmt.step().expect("step");
    assert_eq!(stmt.column_names(), vec!["id"]);

    conn.prepare_into(&mut stmt, "SELECT val, id FROM t ORDER BY id DESC")
        .expect("prepare_into");
    assert!(stmt.is_valid());
    assert!(stmt.row().is_empty());
    assert_eq!(stmt.column_names(), vec!["val", "id"]);
    assert_eq!(stmt.fetch_all().len(), 3);
}

#[test]
fn test_prepare_into_refuses_terminal_statement() {
    let conn = open_with_table();
    let mut stmt = conn.prepare("SELECT id FROM t").expect("prepare");
    stmt.finalize();
    assert_eq!(
        conn.prepare_into(&mut stmt, "SELECT 1").unwrap_err(),
        StatementError::Finalized
    );
    assert_eq!(stmt.status(), StatementStatus::Finalized);
}

#[test]
fn test_statement_moved_to_another_connection_survives_first_close() {
    let first = open_with_table();
    let second = open_with_table();
    let mut stmt = first.prepare("SELECT id FROM t").expect("prepare");
    second
        .prepare_into(&mut stmt, "SELECT val FROM t ORDER BY val")
        .expect("prepare_into");

    drop(first);
    assert!(stmt.is_valid());
    assert_eq!(stmt.fetch_all().len(), 3);

    drop(second);
    assert_eq!(stmt.status(), StatementStatus::ConnectionFinalized);
}

#[test]
fn test_initialize_requires_live_connection() {
    let db = RawDb::open(":memory:", ffi::SQLITE_OPEN_READWRITE).expect("open");
    let raw = db.prepare("SELECT 1").expect("prepare");
    let stmt = Statement::new();

    let err = stmt.initialize(&Weak::new(), raw).unwrap_err();
    assert_eq!(err, StatementError::Uninitialized);
    assert_eq!(stmt.status(), StatementStatus::Uninitialized);

    let db = Rc::new(db);
    let raw = db.prepare("SELECT 1").expect("prepare");
    stmt.initialize(&Rc::downgrade(&db), raw).expect("initialize");
    assert!(stmt.is_valid());
}

#[test]
fn test_error_message_is_sticky() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn.prepare("SELECT ?1 AS v").expect("prepare");
    assert!(stmt.bind(5, &Variant::Nil).is_err());
    let message = stmt.error_message();
    assert!(!message.is_empty());

    stmt.bind(0, &Variant::Int(1)).expect("bind");
    stmt.execute().expect("execute");
    assert_eq!(stmt.error_message(), message);
}

#[test]
fn test_prepare_rejects_empty_sql() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn.prepare("  -- nothing here").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(conn.prepare("SELEC 1").is_err());
}

fn failed_insert(conn: &Connection) -> Statement {
    let mut stmt = conn
        .prepare("INSERT INTO t (id, val) VALUES (1, 0)")
        .expect("prepare");
    assert!(stmt.step().is_err());
    assert!(stmt.bind(9, &Variant::Nil).is_err());
    assert!(stmt.error_message().contains("out of range"));
    stmt
}

#[test]
fn test_finalize_records_failed_disposal() {
    let conn = open_with_table();
    let mut stmt = failed_insert(&conn);

    stmt.finalize();
    assert_eq!(stmt.status(), StatementStatus::Finalized);
    assert_eq!(stmt.error_message(), "UNIQUE constraint failed: t.id");

    assert!(stmt.bind(0, &Variant::Nil).is_err());
    stmt.finalize();
    assert_eq!(stmt.status(), StatementStatus::Finalized);
    assert!(stmt.error_message().contains("explicitly finalized"));
}

#[test]
fn test_second_finalize_leaves_message_alone() {
    let conn = open_with_table();
    let mut stmt = failed_insert(&conn);
    stmt.finalize();
    let message = stmt.error_message();
    stmt.finalize();
    assert_eq!(stmt.error_message(), message);
}

#[test]
fn test_prepare_into_records_failed_disposal_of_previous_statement() {
    let conn = open_with_table();
    let mut stmt = failed_insert(&conn);

    conn.prepare_into(&mut stmt, "SELECT val FROM t")
        .expect("prepare_into");
    assert!(stmt.is_valid());
    assert_eq!(stmt.error_message(), "UNIQUE constraint failed: t.id");
    assert_eq!(stmt.fetch_all().len(), 3);
}

#[cfg(unix)]
#[test]
fn test_open_rejects_non_utf8_path() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(OsStr::from_bytes(b"db-\xff.sqlite"));
    let err = Connection::open(&path, OpenMode::ReadWrite).unwrap_err();
    assert_eq!(err.code.0, codes::SQLITE_CANTOPEN);
    assert!(!path.exists());
}
