#![allow(dead_code)]

use sqlmapper_core::{
    CallResult, Configuration, Connection, DataSource, Error, IsolationLevel, ManagedTransaction,
    MappedStatement, ParameterMode, PreparedStatement, QueryError, QueryErrorKind, Result, Row,
    Transaction, Value,
};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str, &[Value]) -> Vec<Row> + Send + Sync;

#[derive(Debug, Default)]
pub struct ConnState {
    pub queries: Vec<(String, Vec<Value>)>,
    pub executes: Vec<(String, Vec<Value>)>,
    pub batches: Vec<Vec<(String, Vec<Value>)>>,
    pub calls: usize,
    pub prepared: usize,
    pub closed_statements: usize,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub timeouts: Vec<Option<u64>>,
    pub fail_next_query: bool,
    pub fail_rollback: bool,
    pub next_id: i64,
}

/// A connection double that records every round-trip.
pub struct RecordingConnection {
    pub state: Arc<Mutex<ConnState>>,
    responder: Box<Responder>,
}

impl RecordingConnection {
    pub fn new(responder: impl Fn(&str, &[Value]) -> Vec<Row> + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnState::default())),
            responder: Box::new(responder),
        }
    }

    /// Answers every query with `(id, name)` rows echoing the first parameter.
    pub fn echo() -> Self {
        Self::new(|_, params| {
            let id = params.first().cloned().unwrap_or(Value::Null);
            vec![Row::new(
                vec!["id".into(), "name".into()],
                vec![id, Value::from("row")],
            )]
        })
    }

    pub fn query_count(&self) -> usize {
        self.state.lock().unwrap().queries.len()
    }

    fn backend_error(sql: &str) -> Error {
        Error::Query(QueryError {
            kind: QueryErrorKind::Database,
            sql: Some(sql.to_string()),
            message: "simulated failure".to_string(),
            source: None,
        })
    }
}

impl Connection for RecordingConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_next_query {
                state.fail_next_query = false;
                return Err(Self::backend_error(sql));
            }
            state.queries.push((sql.to_string(), params.to_vec()));
        }
        Ok((self.responder)(sql, params))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.state
            .lock()
            .unwrap()
            .executes
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.executes.push((sql.to_string(), params.to_vec()));
        state.next_id += 1;
        Ok(state.next_id)
    }

    fn batch(&self, statements: &[(String, Vec<Value>)]) -> Result<Vec<u64>> {
        self.state.lock().unwrap().batches.push(statements.to_vec());
        Ok(vec![1; statements.len()])
    }

    fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let mut state = self.state.lock().unwrap();
        state.prepared += 1;
        Ok(PreparedStatement::new(
            state.prepared as u64,
            sql.to_string(),
            sql.matches('?').count(),
        ))
    }

    fn close_statement(&self, _stmt: &PreparedStatement) -> Result<()> {
        self.state.lock().unwrap().closed_statements += 1;
        Ok(())
    }

    fn call(&self, sql: &str, params: &[Value], modes: &[ParameterMode]) -> Result<CallResult> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.queries.push((sql.to_string(), params.to_vec()));
        let out_values = params
            .iter()
            .zip(modes)
            .map(|(value, mode)| {
                if mode.is_output() {
                    Value::Int(42)
                } else {
                    value.clone()
                }
            })
            .collect();
        Ok(CallResult {
            rows: Vec::new(),
            update_count: 0,
            out_values,
        })
    }

    fn begin_with(&self, _isolation: IsolationLevel) -> Result<()> {
        self.state.lock().unwrap().begins += 1;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.state.lock().unwrap().commits += 1;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_rollback {
            return Err(Self::backend_error("ROLLBACK"));
        }
        state.rollbacks += 1;
        Ok(())
    }

    fn set_timeout(&self, seconds: Option<u64>) {
        self.state.lock().unwrap().timeouts.push(seconds);
    }
}

pub struct SingleSource(pub Arc<RecordingConnection>);

impl DataSource for SingleSource {
    fn connection(&self) -> Result<Arc<dyn Connection>> {
        Ok(self.0.clone())
    }
}

pub fn transaction(conn: &Arc<RecordingConnection>, auto_commit: bool) -> Arc<dyn Transaction> {
    Arc::new(ManagedTransaction::new(
        Arc::new(SingleSource(Arc::clone(conn))),
        auto_commit,
    ))
}

pub fn register(config: &mut Configuration, statement: MappedStatement) -> Arc<MappedStatement> {
    let id = statement.id().to_string();
    config.add_statement(statement);
    config.mapped_statement(&id).unwrap()
}
