//! Mapper binding for SQLMapper Rust.
//!
//! Mapper interfaces are declared as data ([`MapperInterface`],
//! [`MethodDecl`]). A [`MapperProxy`] obtained from a [`SqlSession`]
//! resolves each method to its registered statement once, binds the call's
//! arguments into a parameter object with [`ParamNameResolver`], and shapes
//! the executor's rows into the declared return type.
//!
//! ```ignore
//! let mut factory = SqlSessionFactory::new(config, data_source);
//! factory.add_mapper(
//!     MapperInterface::new("app.UserMapper")
//!         .method(MethodDecl::new("find", TypeRef::Map).param(ParamDecl::named("id"))),
//! )?;
//! let session = factory.open_session();
//! let users = session.get_mapper("app.UserMapper")?;
//! let user = users.call("find", vec![Arg::value(7)])?.into_value()?;
//! ```

pub mod args;
pub mod interface;
pub mod method;
pub mod param_names;
pub mod proxy;
pub mod session;

pub use args::{Arg, MethodResult};
pub use interface::{DefaultBody, MapperInterface, MethodDecl, MethodKey, OBJECT_TYPE, ParamDecl, ParamKind};
pub use method::{MapperMethod, MethodSignature, ReturnShape, SqlCommand};
pub use param_names::{BoundParams, GENERIC_NAME_PREFIX, ParamMap, ParamNameResolver};
pub use proxy::{MapperProxy, MapperRegistry};
pub use session::{SqlSession, SqlSessionFactory};
