#![allow(dead_code)]

use sqlmapper_binding::SqlSessionFactory;
use sqlmapper_core::{
    Configuration, Connection, DataSource, IsolationLevel, Result, Row, Value,
};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str, &[Value]) -> Vec<Row> + Send + Sync;

#[derive(Debug, Default)]
pub struct Calls {
    pub queries: Vec<(String, Vec<Value>)>,
    pub executes: Vec<(String, Vec<Value>)>,
    pub batches: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub last_id: i64,
}

/// Answers queries through a responder and counts every round-trip.
pub struct FakeConnection {
    pub calls: Mutex<Calls>,
    responder: Box<Responder>,
}

impl FakeConnection {
    pub fn new(responder: impl Fn(&str, &[Value]) -> Vec<Row> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Calls::default()),
            responder: Box::new(responder),
        })
    }

    pub fn queries(&self) -> usize {
        self.calls.lock().unwrap().queries.len()
    }

    pub fn last_query(&self) -> Option<(String, Vec<Value>)> {
        self.calls.lock().unwrap().queries.last().cloned()
    }
}

impl Connection for FakeConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .unwrap()
            .queries
            .push((sql.to_string(), params.to_vec()));
        Ok((self.responder)(sql, params))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.calls
            .lock()
            .unwrap()
            .executes
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        let mut calls = self.calls.lock().unwrap();
        calls.executes.push((sql.to_string(), params.to_vec()));
        calls.last_id += 100;
        Ok(calls.last_id)
    }

    fn batch(&self, statements: &[(String, Vec<Value>)]) -> Result<Vec<u64>> {
        self.calls.lock().unwrap().batches += 1;
        Ok(vec![1; statements.len()])
    }

    fn begin_with(&self, _isolation: IsolationLevel) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.calls.lock().unwrap().commits += 1;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.calls.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

pub struct FakeSource(pub Arc<FakeConnection>);

impl DataSource for FakeSource {
    fn connection(&self) -> Result<Arc<dyn Connection>> {
        Ok(self.0.clone())
    }
}

/// Rows `(id, name)` where `id` echoes the first parameter.
pub fn echo_rows(_sql: &str, params: &[Value]) -> Vec<Row> {
    let id = params.first().cloned().unwrap_or(Value::Null);
    vec![Row::new(
        vec!["id".into(), "name".into()],
        vec![id, Value::from("ann")],
    )]
}

pub fn factory(
    config: Configuration,
    responder: impl Fn(&str, &[Value]) -> Vec<Row> + Send + Sync + 'static,
) -> (SqlSessionFactory, Arc<FakeConnection>) {
    let conn = FakeConnection::new(responder);
    let factory = SqlSessionFactory::new(config, Arc::new(FakeSource(Arc::clone(&conn))));
    (factory, conn)
}
