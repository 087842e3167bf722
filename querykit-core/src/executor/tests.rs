use std::collections::VecDeque;

use super::*;
use crate::params;
use crate::value::{ParamType, Scalar};

/// Backend double that replays `rows` on every execution and records what
/// the engine asked of it.
#[derive(Debug, Default)]
struct ScriptedBackend {
    rows: Vec<Row>,
    changes: usize,
    pending: VecDeque<Row>,
    prepared: Vec<String>,
    bound: Vec<(String, Scalar, ParamType)>,
    executions: usize,
    has_statement: bool,
    fail_execute: Option<ErrorRecord>,
    reject_key: Option<String>,
    in_transaction: bool,
}

impl Backend for ScriptedBackend {
    fn binding_mode(&self) -> BindingMode {
        BindingMode::Prepared
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{name}`")
    }

    fn escape_string(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }

    fn prepare(&mut self, sql: &str) -> Result<(), ErrorRecord> {
        self.has_statement = false;
        self.bound.clear();
        if sql.contains("SYNTAX ERROR") {
            return Err(ErrorRecord::new(1, "near \"SYNTAX\": syntax error"));
        }
        self.prepared.push(sql.to_owned());
        self.has_statement = true;
        Ok(())
    }

    fn bind(&mut self, key: &str, value: &Scalar, param_type: ParamType) -> Result<(), ErrorRecord> {
        if !self.has_statement {
            return Err(ErrorRecord::new(21, "no statement prepared"));
        }
        if self.reject_key.as_deref() == Some(key) {
            return Err(ErrorRecord::new(25, format!("unknown parameter name: {key}")));
        }
        self.bound.retain(|(bound, _, _)| bound != key);
        self.bound.push((key.to_owned(), value.clone(), param_type));
        Ok(())
    }

    fn execute(&mut self) -> Result<(), ErrorRecord> {
        if let Some(err) = self.fail_execute.clone() {
            return Err(err);
        }
        self.executions += 1;
        self.pending = self.rows.iter().cloned().collect();
        Ok(())
    }

    fn fetch_row(&mut self) -> Result<Option<Row>, ErrorRecord> {
        Ok(self.pending.pop_front())
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>, ErrorRecord> {
        Ok(self.pending.drain(..).collect())
    }

    fn affected_rows(&self) -> usize {
        self.changes
    }

    fn last_insert_id(&self) -> i64 {
        42
    }

    fn begin_transaction(&mut self) -> Result<(), ErrorRecord> {
        if self.in_transaction {
            return Err(ErrorRecord::new(
                1,
                "cannot start a transaction within a transaction",
            ));
        }
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ErrorRecord> {
        if !self.in_transaction {
            return Err(ErrorRecord::new(1, "cannot commit - no transaction is active"));
        }
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ErrorRecord> {
        if !self.in_transaction {
            return Err(ErrorRecord::new(
                1,
                "cannot rollback - no transaction is active",
            ));
        }
        self.in_transaction = false;
        Ok(())
    }
}

fn row(pairs: &[(&str, Cell)]) -> Row {
    Row::from_pairs(pairs.iter().cloned())
}

fn scripted(rows: Vec<Row>, config: DatabaseConfig) -> Database<ScriptedBackend> {
    Database::with_backend(
        ScriptedBackend {
            rows,
            ..ScriptedBackend::default()
        },
        config,
    )
}

#[test]
fn test_render_inline_rewrites_tables_and_values() {
    let db = scripted(
        Vec::new(),
        DatabaseConfig::with_prefix("app_").binding_mode(BindingMode::Inline),
    );
    let bound = db.render("SELECT * FROM {t} WHERE id = :i", &params! { ":i" => 7 });
    assert_eq!(bound.sql, "SELECT * FROM `app_t` WHERE id = 7");
    assert!(bound.bindings.is_empty());

    let bound = db.render(
        "SELECT * FROM {t} WHERE id = :i",
        &params! { ":i" => None::<i64> },
    );
    assert!(bound.sql.contains("id IS NULL"));
    assert!(!bound.sql.contains("id = NULL"));
}

#[test]
fn test_prepared_bindings_reach_backend() {
    let mut db = scripted(Vec::new(), DatabaseConfig::with_prefix("app_"));
    db.backend_mut().changes = 2;
    let affected = db
        .execute(
            "UPDATE {t} SET name = :name WHERE id IN (:ids) AND deleted = :gone",
            &params! {
                ":name" => "x",
                ":ids" => vec![1, 2],
                ":gone" => None::<i64>,
                ":unused" => 1,
            },
        )
        .unwrap();
    assert_eq!(affected, 2);

    let backend = db.backend();
    assert_eq!(
        backend.prepared,
        vec!["UPDATE `app_t` SET name = :name WHERE id IN (:ids__0, :ids__1) AND deleted IS NULL"]
    );
    let keys: Vec<_> = backend.bound.iter().map(|(key, _, _)| key.as_str()).collect();
    assert_eq!(keys, vec![":name", ":ids__0", ":ids__1"]);
    assert_eq!(db.phase(), Phase::Executed);
    assert_eq!(db.row_count(), None);
}

#[test]
fn test_query_returns_rows_and_stats() {
    let rows = vec![
        row(&[("id", Cell::Integer(1)), ("name", Cell::Text("a".into()))]),
        row(&[("id", Cell::Integer(2)), ("name", Cell::Text("b".into()))]),
    ];
    let mut db = scripted(rows.clone(), DatabaseConfig::default());
    assert_eq!(db.query("SELECT id, name FROM {t}", &params! {}).unwrap(), rows);
    assert_eq!(db.row_count(), Some(2));
    assert_eq!(db.field_count(), Some(2));
    assert_eq!(db.phase(), Phase::Idle);

    let first = db.query_row("SELECT id, name FROM {t}", &params! {}).unwrap();
    assert_eq!(first, Some(rows[0].clone()));
    assert_eq!(db.row_count(), Some(1));
}

#[test]
fn test_query_column_records_rows_without_the_column() {
    let rows = vec![
        row(&[("a", Cell::Integer(1)), ("b", Cell::Integer(10))]),
        row(&[("a", Cell::Integer(2))]),
        row(&[("a", Cell::Integer(3)), ("b", Cell::Integer(30))]),
    ];
    let mut db = scripted(rows, DatabaseConfig::default());
    let fetch = db.query_column_at("SELECT a, b FROM {t}", &params! {}, 1).unwrap();

    let missing = ShapeError {
        row: Some(1),
        column: 1,
    };
    assert_eq!(fetch.values, vec![Cell::Integer(10), Cell::Integer(30)]);
    assert_eq!(fetch.errors, vec![missing]);
    assert_eq!(db.errors(), &[QueryError::Shape(missing)]);
    assert_eq!(db.last_error(), None);
    assert_eq!(db.row_count(), Some(3));
    assert_eq!(db.field_count(), Some(1));

    let first = db.query_column("SELECT a, b FROM {t}", &params! {}).unwrap();
    assert_eq!(first.values.len(), 3);
    assert!(first.errors.is_empty());
}

#[test]
fn test_cache_first_result_wins() {
    let mut db = scripted(
        vec![row(&[("n", Cell::Integer(1))])],
        DatabaseConfig::default().cache_results(true),
    );
    let template = "SELECT n FROM {t} WHERE id = :id";

    assert_eq!(db.query_scalar(template, &params! { ":id" => 1 }), Ok(Cell::Integer(1)));
    db.backend_mut().rows = vec![row(&[("n", Cell::Integer(2))])];
    assert_eq!(db.query_scalar(template, &params! { ":id" => 1 }), Ok(Cell::Integer(1)));
    assert_eq!(db.backend().executions, 1);
    assert_eq!(db.cached_statements(), 1);

    // Other values render to another statement.
    assert_eq!(db.query_scalar(template, &params! { ":id" => 2 }), Ok(Cell::Integer(2)));
    assert_eq!(db.backend().executions, 2);

    // Other shapes of the same statement have their own entry.
    let rows = db.query(template, &params! { ":id" => 1 }).unwrap();
    assert_eq!(rows[0].get(0), Some(&Cell::Integer(2)));
    assert_eq!(db.backend().executions, 3);
    assert_eq!(db.cached_statements(), 3);
}

#[test]
fn test_prepared_cache_keeps_value_types_apart() {
    let mut db = scripted(
        vec![row(&[("t", Cell::Text("integer".into()))])],
        DatabaseConfig::default().cache_results(true),
    );
    let template = "SELECT typeof(:v)";

    assert_eq!(
        db.query_scalar(template, &params! { ":v" => true }),
        Ok(Cell::Text("integer".into()))
    );
    db.backend_mut().rows = vec![row(&[("t", Cell::Text("text".into()))])];
    assert_eq!(
        db.query_scalar(template, &params! { ":v" => "1" }),
        Ok(Cell::Text("text".into()))
    );
    let tagged = ParameterSet::new().with_typed(":v", "1", "integer");
    db.backend_mut().rows = vec![row(&[("t", Cell::Text("integer".into()))])];
    assert_eq!(db.query_scalar(template, &tagged), Ok(Cell::Text("integer".into())));
    assert_eq!(db.backend().executions, 3);
    assert_eq!(db.cached_statements(), 3);

    assert_eq!(
        db.query_scalar(template, &params! { ":v" => "1" }),
        Ok(Cell::Text("text".into()))
    );
    assert_eq!(db.backend().executions, 3);
}

#[test]
fn test_without_cache_every_call_executes() {
    let mut db = scripted(vec![row(&[("n", Cell::Integer(1))])], DatabaseConfig::default());
    assert_eq!(db.query_scalar("SELECT n FROM {t}", &params! {}), Ok(Cell::Integer(1)));
    db.backend_mut().rows = vec![row(&[("n", Cell::Integer(2))])];
    assert_eq!(db.query_scalar("SELECT n FROM {t}", &params! {}), Ok(Cell::Integer(2)));
    assert_eq!(db.backend().executions, 2);
    assert_eq!(db.cached_statements(), 0);
}

#[test]
fn test_cache_hit_restores_stats_and_clears_error() {
    let rows = vec![
        row(&[("a", Cell::Integer(1)), ("b", Cell::Null)]),
        row(&[("a", Cell::Integer(2)), ("b", Cell::Null)]),
    ];
    let mut db = scripted(rows, DatabaseConfig::default().cache_results(true));
    db.query("SELECT a, b FROM {t}", &params! {}).unwrap();

    db.backend_mut().rows.clear();
    assert_eq!(
        db.query_scalar("SELECT a FROM {t} WHERE a > 5", &params! {}),
        Err(QueryError::NoRows)
    );
    assert_eq!(db.row_count(), Some(0));
    assert!(db.last_error().is_some());

    let cached = db.query("SELECT a, b FROM {t}", &params! {}).unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(db.row_count(), Some(2));
    assert_eq!(db.field_count(), Some(2));
    assert_eq!(db.last_error(), None);
    assert_eq!(db.backend().executions, 2);
}

#[test]
fn test_empty_single_row_result_is_cached() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default().cache_results(true));
    assert_eq!(db.query_row("SELECT * FROM {t}", &params! {}), Ok(None));
    db.backend_mut().rows = vec![row(&[("a", Cell::Integer(1))])];
    assert_eq!(db.query_row("SELECT * FROM {t}", &params! {}), Ok(None));
    assert_eq!(db.backend().executions, 1);
    assert_eq!(db.row_count(), Some(0));
}

#[test]
fn test_query_scalar_without_rows_fails() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default().cache_results(true));
    let result = db.query_scalar("SELECT n FROM {t}", &params! {});
    assert_eq!(result, Err(QueryError::NoRows));
    assert_eq!(db.last_error(), Some(&QueryError::NoRows));
    assert_eq!(db.errors().len(), 1);
    assert_eq!(db.cached_statements(), 0);
}

#[test]
fn test_query_scalar_missing_column_fails() {
    let mut db = scripted(vec![row(&[("n", Cell::Integer(1))])], DatabaseConfig::default());
    let result = db.query_scalar_at("SELECT n FROM {t}", &params! {}, 3);
    assert_eq!(
        result,
        Err(QueryError::Shape(ShapeError {
            row: None,
            column: 3
        }))
    );
    assert_eq!(db.field_count(), Some(1));
}

#[test]
fn test_query_scalar_null_is_a_value() {
    let mut db = scripted(vec![row(&[("n", Cell::Null)])], DatabaseConfig::default());
    assert_eq!(db.query_scalar("SELECT n FROM {t}", &params! {}), Ok(Cell::Null));
    assert_eq!(db.last_error(), None);
}

#[test]
fn test_prepare_bind_execute_fetch() {
    let mut db = scripted(
        vec![row(&[("id", Cell::Integer(5))])],
        DatabaseConfig::with_prefix("p_"),
    );
    db.prepare("SELECT id FROM {t} WHERE id = :id", &params! { ":id" => 1 })
        .unwrap();
    assert_eq!(db.phase(), Phase::Prepared);
    assert_eq!(db.backend().executions, 0);

    db.bind_value(":id", "5", Some("integer")).unwrap();
    assert_eq!(
        db.backend().bound,
        vec![(":id".to_owned(), Scalar::Text("5".into()), ParamType::Integer)]
    );
    let statement = db.last_statement().unwrap();
    assert_eq!(statement.sql, "SELECT id FROM `p_t` WHERE id = :id");
    assert_eq!(statement.bindings.len(), 1);
    assert_eq!(statement.bindings[0].value, Scalar::Text("5".into()));

    db.execute_prepared().unwrap();
    assert_eq!(db.phase(), Phase::Executed);
    let rows = db.fetch_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(db.phase(), Phase::Idle);
    assert_eq!(db.row_count(), Some(1));

    assert!(matches!(db.fetch_all(), Err(QueryError::Binding(_))));

    // The statement stays live and can run again.
    db.execute_prepared().unwrap();
    assert_eq!(db.fetch_row().unwrap(), Some(row(&[("id", Cell::Integer(5))])));
    assert_eq!(db.fetch_row().unwrap(), None);
    assert_eq!(db.phase(), Phase::Idle);
    assert_eq!(db.backend().executions, 2);
}

#[test]
fn test_unknown_type_tag_falls_back_to_inference() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default());
    db.prepare("SELECT :v", &params! {}).unwrap();
    db.bind_value(":v", true, Some("decimal")).unwrap();
    assert_eq!(db.backend().bound[0].2, ParamType::Boolean);
}

#[test]
fn test_binding_without_statement_fails() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default());
    assert_eq!(
        db.execute_prepared(),
        Err(QueryError::Binding("no valid statement set to execute".to_owned()))
    );
    assert!(matches!(
        db.bind_value(":id", 1, None),
        Err(QueryError::Binding(_))
    ));
    assert!(matches!(db.last_error(), Some(QueryError::Binding(_))));
    assert_eq!(db.errors().len(), 2);
}

#[test]
fn test_bind_value_rejects_lists() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default());
    db.prepare("SELECT * FROM t WHERE id IN (:ids)", &params! {}).unwrap();
    assert!(matches!(
        db.bind_value(":ids", vec![1, 2], None),
        Err(QueryError::Binding(_))
    ));
}

#[test]
fn test_refused_binding_discards_statement() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default());
    db.backend_mut().reject_key = Some(":id".to_owned());
    let result = db.execute("DELETE FROM t WHERE id = :id", &params! { ":id" => 1 });
    assert!(matches!(result, Err(QueryError::Binding(_))));
    assert_eq!(db.last_statement(), None);
    assert_eq!(db.phase(), Phase::Idle);
    assert!(matches!(db.execute_prepared(), Err(QueryError::Binding(_))));
    assert_eq!(db.backend().executions, 0);
}

#[test]
fn test_backend_failure_recorded_until_next_success() {
    let mut db = scripted(vec![row(&[("n", Cell::Integer(1))])], DatabaseConfig::default());
    db.backend_mut().fail_execute = Some(ErrorRecord::new(19, "UNIQUE constraint failed"));

    let err = db.execute("INSERT INTO {t} VALUES (1)", &params! {}).unwrap_err();
    assert_eq!(err.record().map(|record| record.code), Some(19));
    assert_eq!(db.last_error(), Some(&err));
    assert_eq!(err.code(), 300);

    db.backend_mut().fail_execute = None;
    db.query("SELECT n FROM {t}", &params! {}).unwrap();
    assert_eq!(db.last_error(), None);
    assert_eq!(db.errors().len(), 1);

    let drained = db.take_errors();
    assert_eq!(drained, vec![err]);
    assert!(db.errors().is_empty());
}

#[test]
fn test_prepare_failure_leaves_no_statement() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default());
    db.prepare("SELECT 1", &params! {}).unwrap();
    let err = db.prepare("SYNTAX ERROR", &params! {}).unwrap_err();
    assert!(matches!(err, QueryError::Backend(_)));
    assert_eq!(db.phase(), Phase::Idle);
    assert_eq!(db.last_statement(), None);
}

#[test]
fn test_transactions_report_success() {
    let mut db = scripted(Vec::new(), DatabaseConfig::default());
    assert!(db.begin_transaction());
    assert!(!db.begin_transaction());
    assert!(matches!(db.last_error(), Some(QueryError::Backend(_))));
    assert!(db.commit());
    assert_eq!(db.last_error(), None);
    assert!(!db.commit());
    assert!(!db.rollback());
    assert!(db.begin_transaction());
    assert!(db.rollback());
    assert_eq!(db.errors().len(), 3);
}

#[test]
fn test_accessors() {
    let db = scripted(Vec::new(), DatabaseConfig::with_prefix("app_"));
    assert_eq!(db.table_prefix(), "app_");
    assert_eq!(db.last_insert_id(), 42);
    assert_eq!(db.affected_rows(), 0);
    assert_eq!(db.row_count(), None);
    assert_eq!(db.field_count(), None);
    assert_eq!(db.binding_mode(), BindingMode::Prepared);
    assert_eq!(db.last_statement(), None);
    assert!(db.config().binding_mode.is_none());
}
