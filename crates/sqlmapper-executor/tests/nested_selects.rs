mod common;

use common::{RecordingConnection, register, transaction};
use sqlmapper_core::{
    Configuration, MappedStatement, RecordType, ResultMap, ResultObject, Row, RowBounds,
    SqlCommandType, TypeRef, Value,
};
use sqlmapper_executor::{Executor, SimpleExecutor, SimpleStrategy};
use std::sync::{Arc, Weak};

fn blog_rows(sql: &str, params: &[Value]) -> Vec<Row> {
    let id = params.first().cloned().unwrap_or(Value::Null);
    if sql.contains("FROM author") {
        vec![Row::new(
            vec!["id".into(), "name".into()],
            vec![id, Value::from("ann")],
        )]
    } else if sql.contains("FROM post") {
        vec![
            Row::new(
                vec!["id".into(), "author_id".into()],
                vec![Value::BigInt(10), id.clone()],
            ),
            Row::new(
                vec!["id".into(), "author_id".into()],
                vec![Value::BigInt(11), id],
            ),
        ]
    } else if sql.contains("FROM audit") {
        vec![Row::new(vec!["n".into()], vec![Value::Int(1)])]
    } else {
        Vec::new()
    }
}

struct Blog {
    conn: Arc<RecordingConnection>,
    executor: Arc<SimpleExecutor>,
    author: Arc<MappedStatement>,
    posts: Arc<MappedStatement>,
}

fn blog(audit_flushes: bool) -> Blog {
    let mut config = Configuration::default();
    let author = register(
        &mut config,
        MappedStatement::builder(
            "BlogMapper.author",
            SqlCommandType::Select,
            "SELECT id, name FROM author WHERE id = #{id}",
        )
        .result_map(
            ResultMap::record("AuthorMap", RecordType::new("Author", ["id", "name", "posts", "audit"]))
                .nested_select("posts", "id", "BlogMapper.postsByAuthor", TypeRef::list(TypeRef::Map))
                .nested_select("audit", "id", "BlogMapper.audit", TypeRef::Map),
        )
        .build()
        .unwrap(),
    );
    let posts = register(
        &mut config,
        MappedStatement::builder(
            "BlogMapper.postsByAuthor",
            SqlCommandType::Select,
            "SELECT id, author_id FROM post WHERE author_id = #{id}",
        )
        .result_map(
            ResultMap::record("PostMap", RecordType::new("Post", ["id", "author"]))
                .nested_select("author", "author_id", "BlogMapper.author", TypeRef::Map),
        )
        .build()
        .unwrap(),
    );
    register(
        &mut config,
        MappedStatement::builder(
            "BlogMapper.audit",
            SqlCommandType::Select,
            "SELECT count(*) AS n FROM audit WHERE author_id = #{id}",
        )
        .flush_cache(audit_flushes)
        .build()
        .unwrap(),
    );
    let conn = Arc::new(RecordingConnection::new(blog_rows));
    let executor = Arc::new(SimpleExecutor::new(
        Arc::new(config),
        transaction(&conn, true),
        SimpleStrategy,
    ));
    Blog {
        conn,
        executor,
        author,
        posts,
    }
}

#[test]
fn cyclic_nested_select_is_deferred_until_outer_query_finishes() {
    let b = blog(false);
    let authors = b
        .executor
        .query(&b.author, &mut Value::BigInt(1), RowBounds::DEFAULT, None)
        .unwrap();

    // author, posts and audit each hit the backend once; the back-reference
    // from posts to the author was served from the in-flight author entry
    assert_eq!(b.conn.query_count(), 3);
    assert_eq!(b.executor.pending_deferred_loads(), 0);
    assert_eq!(b.executor.query_depth(), 0);

    let author = authors[0].snapshot();
    let posts = author.as_map().unwrap()["posts"].as_array().unwrap().to_vec();
    assert_eq!(posts.len(), 2);

    // the cached post objects received the author once the queue drained
    let cached_posts = b
        .executor
        .query(&b.posts, &mut Value::BigInt(1), RowBounds::DEFAULT, None)
        .unwrap();
    assert_eq!(b.conn.query_count(), 3);
    for post in &cached_posts {
        assert_eq!(
            post.get_property("author.name"),
            Some(Value::from("ann"))
        );
    }
}

#[test]
fn defer_load_resolves_immediately_when_cached() {
    let b = blog(false);
    b.executor
        .query(&b.posts, &mut Value::BigInt(2), RowBounds::DEFAULT, None)
        .unwrap();
    let queries_before = b.conn.query_count();

    let mut param = Value::BigInt(2);
    let bound = b.posts.bound_sql(&param);
    let key = b
        .executor
        .create_cache_key(&b.posts, &param, RowBounds::DEFAULT, &bound)
        .unwrap();
    assert!(b.executor.is_cached(&b.posts, &key));

    let owner = ResultObject::new(Value::map());
    b.executor
        .defer_load(&b.posts, &owner, "posts", &key, &TypeRef::list(TypeRef::Map))
        .unwrap();
    assert_eq!(b.executor.pending_deferred_loads(), 0);
    assert_eq!(
        owner.get_property("posts").and_then(|v| v.as_array().map(<[Value]>::len)),
        Some(2)
    );
    assert_eq!(b.conn.query_count(), queries_before);

    // the cached rows are returned again without a round-trip
    b.executor
        .query(&b.posts, &mut param, RowBounds::DEFAULT, None)
        .unwrap();
    assert_eq!(b.conn.query_count(), queries_before);
}

#[test]
fn defer_load_on_missing_key_waits_for_drain() {
    let b = blog(false);
    let param = Value::BigInt(5);
    let bound = b.author.bound_sql(&param);
    let key = b
        .executor
        .create_cache_key(&b.author, &param, RowBounds::DEFAULT, &bound)
        .unwrap();
    let owner = ResultObject::new(Value::map());
    b.executor
        .defer_load(&b.author, &owner, "writer", &key, &TypeRef::Map)
        .unwrap();
    assert_eq!(b.executor.pending_deferred_loads(), 1);

    b.executor
        .query(&b.author, &mut Value::BigInt(5), RowBounds::DEFAULT, None)
        .unwrap();
    assert_eq!(b.executor.pending_deferred_loads(), 0);
    assert_eq!(owner.get_property("writer.name"), Some(Value::from("ann")));
}

#[test]
fn deferred_loads_drain_once_in_queue_order() {
    let mut config = Configuration::default();
    let name = register(
        &mut config,
        MappedStatement::builder(
            "BlogMapper.name",
            SqlCommandType::Select,
            "SELECT id, name FROM author WHERE id = #{id}",
        )
        .result_map(ResultMap::map("NameMap"))
        .build()
        .unwrap(),
    );
    let conn = Arc::new(RecordingConnection::new(blog_rows));
    let executor = Arc::new(SimpleExecutor::new(
        Arc::new(config),
        transaction(&conn, true),
        SimpleStrategy,
    ));
    let key_for = |id: i64| {
        let param = Value::BigInt(id);
        executor
            .create_cache_key(&name, &param, RowBounds::DEFAULT, &name.bound_sql(&param))
            .unwrap()
    };
    let (first, second) = (key_for(5), key_for(6));
    let owner = ResultObject::new(Value::map());

    // while the outer query runs, queue two loads for the same property and
    // fill both keys from nested queries
    let mut queued = false;
    let mut handler = |_: &mut sqlmapper_core::ResultContext| {
        if queued {
            return;
        }
        queued = true;
        for key in [&first, &second] {
            executor
                .defer_load(&name, &owner, "writer", key, &TypeRef::Map)
                .unwrap();
        }
        assert_eq!(executor.pending_deferred_loads(), 2);
        for id in [5, 6] {
            executor
                .query(&name, &mut Value::BigInt(id), RowBounds::DEFAULT, None)
                .unwrap();
        }
        assert_eq!(executor.pending_deferred_loads(), 2);
    };
    executor
        .query(&name, &mut Value::BigInt(1), RowBounds::DEFAULT, Some(&mut handler))
        .unwrap();
    assert!(queued);
    assert_eq!(conn.query_count(), 3);

    // the later load was applied last
    assert_eq!(executor.pending_deferred_loads(), 0);
    assert_eq!(owner.get_property("writer.id"), Some(Value::BigInt(6)));

    // a later top-level query finds nothing left to drain
    executor
        .query(&name, &mut Value::BigInt(5), RowBounds::DEFAULT, None)
        .unwrap();
    assert_eq!(conn.query_count(), 3);
    assert_eq!(owner.get_property("writer.id"), Some(Value::BigInt(6)));
}

#[test]
fn forced_flush_inside_nested_query_keeps_the_cache() {
    let b = blog(true);
    b.executor
        .query(&b.author, &mut Value::BigInt(1), RowBounds::DEFAULT, None)
        .unwrap();
    // author, posts and audit all remain cached
    assert_eq!(b.executor.local_cache_size(), 3);

    // at depth zero the flushing statement clears everything
    let audit = b
        .executor
        .query(
            &b.executor.configuration().mapped_statement("BlogMapper.audit").unwrap(),
            &mut Value::BigInt(1),
            RowBounds::DEFAULT,
            None,
        )
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(b.executor.local_cache_size(), 1);
}

#[test]
fn null_column_skips_the_nested_select() {
    let mut config = Configuration::default();
    let post = register(
        &mut config,
        MappedStatement::builder("M.post", SqlCommandType::Select, "SELECT id, author_id FROM orphan")
            .result_map(
                ResultMap::map("PostMap").nested_select("author", "author_id", "M.missing", TypeRef::Map),
            )
            .build()
            .unwrap(),
    );
    let conn = Arc::new(RecordingConnection::new(|_, _| {
        vec![Row::new(
            vec!["id".into(), "author_id".into()],
            vec![Value::Int(1), Value::Null],
        )]
    }));
    let executor = SimpleExecutor::new(Arc::new(config), transaction(&conn, true), SimpleStrategy);
    let rows = executor
        .query(&post, &mut Value::Null, RowBounds::DEFAULT, None)
        .unwrap();
    assert_eq!(rows[0].get_property("author_id"), Some(Value::Null));
    assert_eq!(conn.query_count(), 1);
}

#[test]
fn nested_selects_go_through_the_executor_wrapper() {
    let outer = blog(false);
    let inner = blog(false);
    let wrapper: Arc<dyn Executor> = inner.executor.clone();
    outer
        .executor
        .set_executor_wrapper(Arc::downgrade(&wrapper) as Weak<dyn Executor>);

    outer
        .executor
        .query(&outer.author, &mut Value::BigInt(1), RowBounds::DEFAULT, None)
        .unwrap();
    // only the top-level author query ran on the outer executor's connection
    assert_eq!(outer.conn.query_count(), 1);
    assert!(inner.conn.query_count() >= 2);
}
