mod common;

use common::{echo_rows, factory};
use sqlmapper_binding::{
    Arg, MapperInterface, MapperProxy, MethodDecl, MethodResult, ParamDecl, SqlSession,
};
use sqlmapper_core::{
    BindingErrorKind, CollectingHandler, Configuration, ExecutorErrorKind, ExecutorType,
    MappedStatement, ResultHandlerRef, ResultMap, Row, RowBounds, ScalarType, SqlCommandType,
    TypeRef, Value,
};
use std::sync::{Arc, Mutex};

const ALL_USERS: &str = "SELECT id, name FROM users";

fn users(sql: &str, params: &[Value]) -> Vec<Row> {
    if sql.contains("count(*)") {
        vec![Row::new(vec!["n".into()], vec![Value::BigInt(3)])]
    } else if sql.contains("WHERE name") {
        Vec::new()
    } else if sql.contains("WHERE id") {
        echo_rows(sql, params)
    } else {
        ["a", "b", "c"]
            .iter()
            .zip(1i64..)
            .map(|(name, id)| {
                Row::new(
                    vec!["id".into(), "name".into()],
                    vec![Value::BigInt(id), Value::from(*name)],
                )
            })
            .collect()
    }
}

fn select(id: &str, sql: &str, result_map: Option<ResultMap>) -> MappedStatement {
    let builder = MappedStatement::builder(format!("app.UserMapper.{id}"), SqlCommandType::Select, sql);
    match result_map {
        Some(map) => builder.result_map(map),
        None => builder,
    }
    .build()
    .unwrap()
}

fn configuration() -> Configuration {
    let mut config = Configuration::default();
    let rows = || Some(ResultMap::map("UserRow"));
    for (id, sql) in [
        ("find", "SELECT id, name FROM users WHERE id = #{id}"),
        ("findAll", ALL_USERS),
        ("page", ALL_USERS),
        ("idSet", ALL_USERS),
        ("byId", ALL_USERS),
        ("stream", ALL_USERS),
        ("scan", ALL_USERS),
        ("findByName", "SELECT id, name FROM users WHERE name = #{name}"),
        (
            "findByIdAndName",
            "SELECT id, name FROM users WHERE id = #{param1} AND name = #{1}",
        ),
        (
            "findByIdAndAge",
            "SELECT id, name FROM users WHERE id = #{id} AND age = #{age}",
        ),
        (
            "findByExample",
            "SELECT id, name FROM users WHERE id = #{id} OR name = #{name}",
        ),
    ] {
        config.add_statement(select(id, sql, rows()));
    }
    config.add_statement(select(
        "count",
        "SELECT count(*) AS n FROM users",
        Some(ResultMap::scalar("n", ScalarType::Long)),
    ));
    config.add_statement(select(
        "ids",
        "SELECT id FROM users",
        Some(ResultMap::scalar("id", ScalarType::Int)),
    ));
    config.add_statement(select(
        "ageByName",
        "SELECT age FROM users WHERE name = #{name}",
        Some(ResultMap::scalar("age", ScalarType::Long)),
    ));
    for id in ["countText", "countInt"] {
        config.add_statement(select(
            id,
            "SELECT count(*) AS n FROM users",
            Some(ResultMap::scalar("n", ScalarType::Long)),
        ));
    }
    config.add_statement(select("scanRaw", ALL_USERS, None));
    for id in ["insert", "insertCount", "insertQuiet", "insertText"] {
        config.add_statement(
            MappedStatement::builder(
                format!("app.UserMapper.{id}"),
                SqlCommandType::Insert,
                "INSERT INTO users (name) VALUES (#{name})",
            )
            .key_property("id")
            .build()
            .unwrap(),
        );
    }
    config
}

fn user_mapper() -> MapperInterface {
    let user = || ParamDecl::named("user");
    MapperInterface::new("app.UserMapper")
        .method(MethodDecl::new("find", TypeRef::Map).param(ParamDecl::named("id")))
        .method(MethodDecl::new("findAll", TypeRef::list(TypeRef::Map)))
        .method(MethodDecl::new("page", TypeRef::list(TypeRef::Map)).param(ParamDecl::row_bounds()))
        .method(MethodDecl::new("ids", TypeRef::array(TypeRef::Primitive(ScalarType::Int))))
        .method(MethodDecl::new("idSet", TypeRef::collection("BTreeSet", TypeRef::Map)))
        .method(MethodDecl::new("byId", TypeRef::Map).map_key("id"))
        .method(MethodDecl::new("stream", TypeRef::cursor(TypeRef::Map)))
        .method(MethodDecl::new("count", TypeRef::Primitive(ScalarType::Long)))
        .method(MethodDecl::new("findByName", TypeRef::optional(TypeRef::Map)).param(ParamDecl::named("name")))
        .method(
            MethodDecl::new("ageByName", TypeRef::Primitive(ScalarType::Long))
                .param(ParamDecl::named("name")),
        )
        .method(
            MethodDecl::new("findByIdAndName", TypeRef::Map)
                .param(ParamDecl::value())
                .param(ParamDecl::value()),
        )
        .method(MethodDecl::new("findByIdAndAge", TypeRef::Map).param(ParamDecl::annotated("id")))
        .method(
            MethodDecl::new("findByExample", TypeRef::list(TypeRef::Map))
                .param(ParamDecl::named("example")),
        )
        .method(MethodDecl::new(
            "countText",
            TypeRef::optional(TypeRef::Scalar(ScalarType::Text)),
        ))
        .method(MethodDecl::new(
            "countInt",
            TypeRef::optional(TypeRef::Scalar(ScalarType::Int)),
        ))
        .method(MethodDecl::new("scan", TypeRef::Unit).param(ParamDecl::result_handler()))
        .method(MethodDecl::new("scanRaw", TypeRef::Unit).param(ParamDecl::result_handler()))
        .method(MethodDecl::new("insert", TypeRef::Primitive(ScalarType::Bool)).param(user()))
        .method(MethodDecl::new("insertCount", TypeRef::Primitive(ScalarType::Int)).param(user()))
        .method(MethodDecl::new("insertQuiet", TypeRef::Unit).param(user()))
        .method(MethodDecl::new("insertText", TypeRef::Scalar(ScalarType::Text)).param(user()))
        .method(MethodDecl::new("flush", TypeRef::list(TypeRef::Map)).flush())
        .method(MethodDecl::new("first", TypeRef::Map).default_body(|proxy, _args| {
            let all = proxy.call("findAll", Vec::new())?.into_list()?;
            Ok(MethodResult::Value(all.into_iter().next().unwrap_or_default()))
        }))
}

struct Fixture {
    conn: Arc<common::FakeConnection>,
    session: Arc<SqlSession>,
    mapper: MapperProxy,
}

fn fixture_with(executor_type: ExecutorType) -> Fixture {
    let (mut factory, conn) = factory(configuration(), users);
    factory.add_mapper(user_mapper()).unwrap();
    let session = factory.open_session_with(executor_type, false);
    let mapper = session.get_mapper("app.UserMapper").unwrap();
    Fixture {
        conn,
        session,
        mapper,
    }
}

fn fixture() -> Fixture {
    fixture_with(ExecutorType::Simple)
}

fn new_user(name: &str) -> Vec<Arg> {
    vec![Arg::value(Value::from_pairs([("name", name)]))]
}

#[test]
fn repeated_single_row_query_hits_the_backend_once() {
    let f = fixture();
    let first = f.mapper.call("find", vec![Arg::value(7)]).unwrap().into_value().unwrap();
    let second = f.mapper.call("find", vec![Arg::value(7)]).unwrap().into_value().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_map().unwrap()["id"], Value::Int(7));
    assert_eq!(f.conn.queries(), 1);
    assert_eq!(f.mapper.cached_methods(), 1);
}

#[test]
fn proxies_of_one_session_share_its_cache() {
    let f = fixture();
    let other = f.session.get_mapper("app.UserMapper").unwrap();
    f.mapper.call("find", vec![Arg::value(1)]).unwrap();
    other.call("find", vec![Arg::value(1)]).unwrap();
    assert_eq!(f.conn.queries(), 1);
    assert_ne!(f.mapper, other);
    assert_eq!(other.cached_methods(), 1);
}

#[test]
fn list_results_follow_the_declared_container() {
    let f = fixture();
    let all = f.mapper.call("findAll", Vec::new()).unwrap();
    assert!(matches!(&all, MethodResult::List(rows) if rows.len() == 3));

    let ids = f.mapper.call("ids", Vec::new()).unwrap();
    match ids {
        MethodResult::Array(values) => {
            assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        }
        other => panic!("expected an array, got {other:?}"),
    }

    let set = f.mapper.call("idSet", Vec::new()).unwrap();
    assert!(matches!(&set, MethodResult::Collection(Value::Array(rows)) if rows.len() == 3));
}

#[test]
fn row_bounds_argument_pages_the_result() {
    let f = fixture();
    let page = f
        .mapper
        .call("page", vec![Arg::RowBounds(RowBounds::new(1, 1))])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].as_map().unwrap()["name"], Value::from("b"));
}

#[test]
fn map_result_is_keyed_by_the_map_key() {
    let f = fixture();
    let by_id = f.mapper.call("byId", Vec::new()).unwrap().into_map().unwrap();
    assert_eq!(by_id.keys().map(String::as_str).collect::<Vec<_>>(), vec!["1", "2", "3"]);
    assert_eq!(by_id["2"].as_map().unwrap()["name"], Value::from("b"));
}

#[test]
fn cursor_streams_rows() {
    let f = fixture();
    let mut cursor = f.mapper.call("stream", Vec::new()).unwrap().into_cursor().unwrap();
    assert!(cursor.is_open());
    let first = cursor.next().unwrap().unwrap();
    assert_eq!(first.as_map().unwrap()["id"], Value::BigInt(1));
    assert_eq!(cursor.by_ref().count(), 2);
    assert!(cursor.is_consumed());
}

#[test]
fn optional_wraps_missing_rows() {
    let f = fixture();
    let found = f
        .mapper
        .call("findByName", vec![Arg::value("zed")])
        .unwrap()
        .into_optional()
        .unwrap();
    assert_eq!(found, None);
}

#[test]
fn null_into_primitive_is_rejected() {
    let f = fixture();
    let err = f.mapper.call("ageByName", vec![Arg::value("zed")]).unwrap_err();
    assert_eq!(err.binding_kind(), Some(BindingErrorKind::NullIntoPrimitive));
    assert_eq!(
        err.to_string(),
        "Mapper method 'app.UserMapper.ageByName' attempted to return null from a method with a primitive return type (i64)."
    );

    let count = f.mapper.call("count", Vec::new()).unwrap().get::<i64>().unwrap();
    assert_eq!(count, 3);
}

#[test]
fn optional_scalar_is_coerced_to_its_element_type() {
    let f = fixture();
    let text = f.mapper.call("countText", Vec::new()).unwrap().into_optional().unwrap();
    assert_eq!(text, Some(Value::from("3")));
    let int = f.mapper.call("countInt", Vec::new()).unwrap().into_optional().unwrap();
    assert_eq!(int, Some(Value::Int(3)));
}

#[test]
fn named_parameters_must_cover_every_placeholder() {
    let f = fixture();
    let err = f.mapper.call("findByIdAndAge", vec![Arg::value(4)]).unwrap_err();
    assert_eq!(err.binding_kind(), Some(BindingErrorKind::ParameterNotFound));
    assert_eq!(
        err.to_string(),
        "Parameter 'age' not found. Available parameters are [id, param1]"
    );
    assert_eq!(f.conn.queries(), 0);
}

#[test]
fn sole_map_argument_binds_absent_keys_as_null() {
    let f = fixture();
    let rows = f
        .mapper
        .call("findByExample", vec![Arg::value(Value::from_pairs([("id", 7)]))])
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(rows.len(), 1);
    let (_, params) = f.conn.last_query().unwrap();
    assert_eq!(params, vec![Value::Int(7), Value::Null]);
}

#[test]
fn unannotated_arguments_bind_by_index_and_generic_name() {
    let f = fixture();
    f.mapper
        .call("findByIdAndName", vec![Arg::value(4), Arg::value("dee")])
        .unwrap();
    let (_, params) = f.conn.last_query().unwrap();
    assert_eq!(params, vec![Value::Int(4), Value::from("dee")]);
}

#[test]
fn row_counts_follow_the_return_type() {
    let f = fixture();
    let inserted = f.mapper.call("insert", new_user("bo")).unwrap();
    assert!(inserted.get::<bool>().unwrap());

    let count = f.mapper.call("insertCount", new_user("cy")).unwrap();
    assert_eq!(count.into_value().unwrap(), Value::Int(1));

    assert!(f.mapper.call("insertQuiet", new_user("di")).unwrap().is_unit());

    let err = f.mapper.call("insertText", new_user("ed")).unwrap_err();
    assert_eq!(err.binding_kind(), Some(BindingErrorKind::UnsupportedReturnType));
    assert_eq!(
        err.to_string(),
        "Mapper method 'app.UserMapper.insertText' has an unsupported return type: Option<String>"
    );
}

#[test]
fn generated_keys_are_written_back_into_arguments() {
    let f = fixture();
    let mut args = new_user("bo");
    f.mapper.invoke("insert", &mut args).unwrap();
    let user = args[0].as_value().unwrap();
    assert_eq!(user.as_map().unwrap()["id"], Value::BigInt(100));
    assert!(f.session.is_dirty());
}

#[test]
fn result_handler_receives_rows() {
    let f = fixture();
    let collected = Arc::new(Mutex::new(CollectingHandler::default()));
    let handler: ResultHandlerRef = collected.clone();
    let result = f.mapper.call("scan", vec![Arg::ResultHandler(handler)]).unwrap();
    assert!(result.is_unit());
    assert_eq!(collected.lock().unwrap().rows.len(), 3);
}

#[test]
fn result_handler_needs_a_result_type() {
    let f = fixture();
    let handler: ResultHandlerRef = Arc::new(Mutex::new(CollectingHandler::default()));
    let err = f
        .mapper
        .call("scanRaw", vec![Arg::ResultHandler(handler)])
        .unwrap_err();
    assert_eq!(err.binding_kind(), Some(BindingErrorKind::MissingResultType));
    assert_eq!(f.conn.queries(), 0);
}

#[test]
fn flush_method_drains_the_batch() {
    let f = fixture_with(ExecutorType::Batch);
    f.mapper.call("insertQuiet", new_user("a")).unwrap();
    f.mapper.call("insertQuiet", new_user("b")).unwrap();
    let results = f.mapper.call("flush", Vec::new()).unwrap().into_batch().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].statement_id, "app.UserMapper.insertQuiet");
    assert_eq!(results[0].update_counts, vec![1, 1]);
    assert_eq!(f.conn.calls.lock().unwrap().batches, 1);
}

#[test]
fn default_method_calls_back_through_the_proxy() {
    let f = fixture();
    let first = f.mapper.call("first", Vec::new()).unwrap().into_value().unwrap();
    assert_eq!(first.as_map().unwrap()["name"], Value::from("a"));
    // only findAll was resolved; the default body itself is never cached
    assert_eq!(f.mapper.cached_methods(), 1);
}

#[test]
fn object_methods_are_answered_by_the_proxy() {
    let f = fixture();
    let text = f.mapper.call("to_string", Vec::new()).unwrap().get::<String>().unwrap();
    assert!(text.starts_with("MapperProxy<app.UserMapper>"));

    let hash = f.mapper.call("hash_code", Vec::new()).unwrap().into_value().unwrap();
    let same = f.mapper.call("equals", vec![Arg::Value(hash)]).unwrap();
    assert!(same.get::<bool>().unwrap());
    let other = f.mapper.call("equals", vec![Arg::value(-1i64)]).unwrap();
    assert!(!other.get::<bool>().unwrap());
    assert_eq!(f.conn.queries(), 0);
    assert_eq!(f.mapper.cached_methods(), 0);
}

#[test]
fn invocation_errors_surface_unchanged() {
    let f = fixture();
    let err = f.mapper.call("nope", Vec::new()).unwrap_err();
    assert_eq!(err.binding_kind(), Some(BindingErrorKind::MethodNotFound));

    let err = f.mapper.call("find", Vec::new()).unwrap_err();
    assert_eq!(err.binding_kind(), Some(BindingErrorKind::InvalidArgument));

    let err = f.session.get_mapper("app.Missing").unwrap_err();
    assert_eq!(err.to_string(), "Type app.Missing is not known to the MapperRegistry.");
}

#[test]
fn closed_session_rejects_mapper_calls() {
    let f = fixture();
    f.session.close();
    let err = f.mapper.call("find", vec![Arg::value(1)]).unwrap_err();
    assert!(err.is_executor_closed());
}

#[test]
fn commit_reaches_the_transaction_only_when_dirty_or_forced() {
    let f = fixture();
    f.mapper.call("find", vec![Arg::value(1)]).unwrap();
    f.session.commit(false).unwrap();
    assert_eq!(f.conn.calls.lock().unwrap().commits, 0);

    f.mapper.call("insertQuiet", new_user("a")).unwrap();
    f.session.commit(false).unwrap();
    assert_eq!(f.conn.calls.lock().unwrap().commits, 1);
    assert!(!f.session.is_dirty());

    f.mapper.call("insertQuiet", new_user("b")).unwrap();
    f.session.rollback(false).unwrap();
    assert_eq!(f.conn.calls.lock().unwrap().rollbacks, 1);
}

#[test]
fn select_one_rejects_many_rows() {
    let f = fixture();
    let err = f
        .session
        .select_one("app.UserMapper.findAll", &mut Value::Null)
        .unwrap_err();
    assert_eq!(err.executor_kind(), Some(ExecutorErrorKind::TooManyResults));
    assert_eq!(
        err.to_string(),
        "Expected one result (or null) to be returned by select_one(), but found: 3"
    );
}
