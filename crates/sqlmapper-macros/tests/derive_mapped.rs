use sqlmapper_core::{Error, FromValue, Mapped, ToValue, Value};
use sqlmapper_macros::Mapped;

#[derive(Debug, PartialEq, Mapped)]
struct User {
    id: i64,
    #[mapped(name = "userName")]
    user_name: String,
    email: Option<String>,
    #[mapped(skip)]
    visits: u32,
}

#[derive(Debug, PartialEq, Mapped)]
#[mapped(type_name = "app.Post")]
struct Post {
    id: i64,
    author: Option<Value>,
}

#[test]
fn describes_the_record() {
    assert_eq!(User::TYPE_NAME, "User");
    assert_eq!(User::property_names(), &["id", "userName", "email"]);
    let record = Post::record_type();
    assert_eq!(record.name, "app.Post");
    assert_eq!(record.properties, vec!["id", "author"]);
}

#[test]
fn converts_to_a_property_map() {
    let user = User {
        id: 7,
        user_name: "ann".into(),
        email: None,
        visits: 3,
    };
    assert_eq!(
        user.to_value(),
        Value::from_pairs([
            ("email", Value::Null),
            ("id", Value::BigInt(7)),
            ("userName", Value::from("ann")),
        ])
    );
}

#[test]
fn reads_from_a_property_map() {
    let value = Value::from_pairs([("id", Value::Int(7)), ("userName", Value::from("ann"))]);
    let user = User::from_value(&value).unwrap();
    assert_eq!(
        user,
        User {
            id: 7,
            user_name: "ann".into(),
            email: None,
            visits: 0,
        }
    );
}

#[test]
fn missing_required_property_names_the_field() {
    let value = Value::from_pairs([("id", Value::Int(7))]);
    let err = User::from_value(&value).unwrap_err();
    match err {
        Error::Type(t) => assert_eq!(t.column.as_deref(), Some("userName")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(User::from_value(&Value::Int(1)).is_err());
}

#[test]
fn nested_values_pass_through() {
    let author = Value::from_pairs([("name", "bo")]);
    let value = Value::from_pairs([("id", Value::BigInt(1)), ("author", author.clone())]);
    let post = Post::from_value(&value).unwrap();
    assert_eq!(post.author, Some(author));
}
