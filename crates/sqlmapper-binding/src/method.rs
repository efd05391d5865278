//! Bound mapper methods.
//!
//! A [`MapperMethod`] pairs the statement a method runs ([`SqlCommand`])
//! with the shape of its arguments and return value ([`MethodSignature`]).
//! Both are resolved once, when the method is first called through a proxy.

use crate::args::{Arg, MethodResult};
use crate::interface::{MapperInterface, MethodDecl, ParamKind};
use crate::param_names::{BoundParams, ParamNameResolver};
use crate::session::SqlSession;
use sqlmapper_core::{
    BindingErrorKind, Configuration, Error, MappedStatement, Result, RowBounds, SqlCommandType,
    StatementType, TypeRef, Value,
};
use std::sync::{Arc, PoisonError};

/// The statement a mapper method runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCommand {
    /// Statement id; `None` for a flush method with no statement.
    name: Option<String>,
    command_type: SqlCommandType,
}

impl SqlCommand {
    /// Resolve the statement for `method` called through `interface`.
    ///
    /// The id `<interface>.<method>` is tried first, then the same id on each
    /// parent interface that descends from the method's declaring type. A
    /// method marked `flush` with no statement becomes a flush command.
    pub fn resolve(
        config: &Configuration,
        interface: &MapperInterface,
        method: &MethodDecl,
    ) -> Result<Self> {
        match resolve_mapped_statement(interface, &method.name, &method.declaring_type, config) {
            None if method.flush => Ok(Self {
                name: None,
                command_type: SqlCommandType::Flush,
            }),
            None => Err(Error::binding(
                BindingErrorKind::StatementNotFound,
                format!(
                    "Invalid bound statement (not found): {}.{}",
                    interface.name(),
                    method.name
                ),
            )),
            Some(ms) if ms.command_type() == SqlCommandType::Unknown => Err(Error::binding(
                BindingErrorKind::UnknownCommand,
                format!("Unknown execution method for: {}", ms.id()),
            )),
            Some(ms) => Ok(Self {
                name: Some(ms.id().to_string()),
                command_type: ms.command_type(),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn command_type(&self) -> SqlCommandType {
        self.command_type
    }
}

fn resolve_mapped_statement(
    interface: &MapperInterface,
    method_name: &str,
    declaring_type: &str,
    config: &Configuration,
) -> Option<Arc<MappedStatement>> {
    let statement_id = format!("{}.{}", interface.name(), method_name);
    if config.has_statement(&statement_id) {
        return config.mapped_statement(&statement_id).ok();
    }
    if interface.name() == declaring_type {
        return None;
    }
    interface
        .supers()
        .iter()
        .filter(|parent| parent.is_subtype_of(declaring_type))
        .find_map(|parent| resolve_mapped_statement(parent, method_name, declaring_type, config))
}

/// How a query method's result is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Void,
    Single,
    List,
    Map,
    Cursor,
    Optional,
}

/// Argument and return-value shape of a mapper method.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    return_type: TypeRef,
    shape: ReturnShape,
    map_key: Option<String>,
    row_bounds_index: Option<usize>,
    result_handler_index: Option<usize>,
    param_kinds: Vec<ParamKind>,
    param_names: ParamNameResolver,
}

impl MethodSignature {
    pub fn new(config: &Configuration, method: &MethodDecl) -> Result<Self> {
        let return_type = method.return_type.clone();
        let map_key = if return_type.is_map() {
            method.map_key.clone()
        } else {
            None
        };
        let factory = config.object_factory();
        let shape = match &return_type {
            TypeRef::Unit => ReturnShape::Void,
            t if factory.is_collection(t) || t.is_array() => ReturnShape::List,
            TypeRef::Cursor(_) => ReturnShape::Cursor,
            TypeRef::Optional(_) => ReturnShape::Optional,
            TypeRef::Map if map_key.is_some() => ReturnShape::Map,
            _ => ReturnShape::Single,
        };
        Ok(Self {
            row_bounds_index: unique_param_index(method, ParamKind::RowBounds)?,
            result_handler_index: unique_param_index(method, ParamKind::ResultHandler)?,
            param_kinds: method.params.iter().map(|p| p.kind).collect(),
            param_names: ParamNameResolver::new(config, method)?,
            return_type,
            shape,
            map_key,
        })
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    pub fn map_key(&self) -> Option<&str> {
        self.map_key.as_deref()
    }

    pub fn returns_void(&self) -> bool {
        self.shape == ReturnShape::Void
    }

    pub fn returns_many(&self) -> bool {
        self.shape == ReturnShape::List
    }

    pub fn returns_map(&self) -> bool {
        self.shape == ReturnShape::Map
    }

    pub fn returns_cursor(&self) -> bool {
        self.shape == ReturnShape::Cursor
    }

    pub fn returns_optional(&self) -> bool {
        self.shape == ReturnShape::Optional
    }

    pub fn has_row_bounds(&self) -> bool {
        self.row_bounds_index.is_some()
    }

    pub fn has_result_handler(&self) -> bool {
        self.result_handler_index.is_some()
    }

    pub fn param_names(&self) -> &ParamNameResolver {
        &self.param_names
    }

    pub fn convert_args_to_sql_command_param(&self, args: &[Arg]) -> Result<BoundParams> {
        self.param_names.named_params(args)
    }

    pub fn extract_row_bounds(&self, args: &[Arg]) -> RowBounds {
        match self.row_bounds_index.and_then(|i| args.get(i)) {
            Some(Arg::RowBounds(bounds)) => *bounds,
            _ => RowBounds::DEFAULT,
        }
    }

    pub fn extract_result_handler(&self, args: &[Arg]) -> Option<sqlmapper_core::ResultHandlerRef> {
        match self.result_handler_index.and_then(|i| args.get(i)) {
            Some(Arg::ResultHandler(handler)) => Some(Arc::clone(handler)),
            _ => None,
        }
    }

    /// Check the arguments against the declared parameters.
    fn check_args(&self, method: &str, args: &[Arg]) -> Result<()> {
        if args.len() != self.param_kinds.len() {
            return Err(Error::binding(
                BindingErrorKind::InvalidArgument,
                format!(
                    "Mapper method '{}' expects {} argument(s) but received {}",
                    method,
                    self.param_kinds.len(),
                    args.len()
                ),
            ));
        }
        for (index, (arg, kind)) in args.iter().zip(&self.param_kinds).enumerate() {
            let matches = matches!(
                (arg, kind),
                (Arg::Value(_), ParamKind::Value)
                    | (Arg::RowBounds(_), ParamKind::RowBounds)
                    | (Arg::ResultHandler(_), ParamKind::ResultHandler)
            );
            if !matches {
                return Err(Error::binding(
                    BindingErrorKind::InvalidArgument,
                    format!(
                        "Argument {} of mapper method '{}' must be a {}, got {}",
                        index,
                        method,
                        kind.type_name(),
                        arg.kind_name()
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn unique_param_index(method: &MethodDecl, kind: ParamKind) -> Result<Option<usize>> {
    let mut index = None;
    for (i, param) in method.params.iter().enumerate() {
        if param.kind == kind {
            if index.is_some() {
                return Err(Error::binding(
                    BindingErrorKind::DuplicateSpecialParameter,
                    format!("{} cannot have multiple {} parameters", method.name, kind.type_name()),
                ));
            }
            index = Some(i);
        }
    }
    Ok(index)
}

/// A resolved mapper method, ready to run against a session.
#[derive(Debug, Clone)]
pub struct MapperMethod {
    command: SqlCommand,
    signature: MethodSignature,
    /// Statement id, or `<interface>.<method>` for flush commands.
    display_name: String,
}

impl MapperMethod {
    pub fn new(config: &Configuration, interface: &MapperInterface, method: &MethodDecl) -> Result<Self> {
        let command = SqlCommand::resolve(config, interface, method)?;
        let signature = MethodSignature::new(config, method)?;
        let display_name = command
            .name()
            .map_or_else(|| format!("{}.{}", interface.name(), method.name), str::to_string);
        tracing::debug!(
            method = %display_name,
            command = %command.command_type(),
            shape = ?signature.shape(),
            "Resolved mapper method"
        );
        Ok(Self {
            command,
            signature,
            display_name,
        })
    }

    pub fn command(&self) -> &SqlCommand {
        &self.command
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Run the method. Values written into the statement parameter
    /// (generated keys, output parameters) are copied back into `args`.
    #[tracing::instrument(level = "debug", skip(self, session, args), fields(statement = %self.display_name))]
    pub fn execute(&self, session: &SqlSession, args: &mut [Arg]) -> Result<MethodResult> {
        self.signature.check_args(&self.display_name, args)?;
        let name = self.display_name.as_str();
        let result = match self.command.command_type() {
            SqlCommandType::Insert | SqlCommandType::Update | SqlCommandType::Delete => {
                let mut param = self.parameter_object(session, args)?;
                let count = match self.command.command_type() {
                    SqlCommandType::Insert => session.insert(name, &mut param)?,
                    SqlCommandType::Update => session.update(name, &mut param)?,
                    _ => session.delete(name, &mut param)?,
                };
                self.signature.param_names.write_back(param, args);
                self.row_count_result(count)?
            }
            SqlCommandType::Select => {
                if self.signature.returns_void() && self.signature.has_result_handler() {
                    self.execute_with_result_handler(session, args)?;
                    MethodResult::Unit
                } else if self.signature.returns_many() {
                    self.execute_for_many(session, args)?
                } else if self.signature.returns_map() {
                    self.execute_for_map(session, args)?
                } else if self.signature.returns_cursor() {
                    self.execute_for_cursor(session, args)?
                } else {
                    self.execute_for_one(session, args)?
                }
            }
            SqlCommandType::Flush => MethodResult::Batch(session.flush_statements()?),
            SqlCommandType::Unknown => {
                return Err(Error::binding(
                    BindingErrorKind::UnknownCommand,
                    format!("Unknown execution method for: {name}"),
                ));
            }
        };

        if matches!(result, MethodResult::Value(Value::Null)) && self.signature.return_type.is_primitive() {
            return Err(Error::binding(
                BindingErrorKind::NullIntoPrimitive,
                format!(
                    "Mapper method '{}' attempted to return null from a method with a primitive return type ({}).",
                    name, self.signature.return_type
                ),
            ));
        }
        Ok(result)
    }

    /// The statement parameter for one call. Named parameters must cover
    /// every placeholder of the statement.
    fn parameter_object(&self, session: &SqlSession, args: &[Arg]) -> Result<Value> {
        let params = self.signature.convert_args_to_sql_command_param(args)?;
        let ms = session.configuration().mapped_statement(&self.display_name)?;
        params.require(&ms)?;
        Ok(params.into_value())
    }

    fn row_count_result(&self, row_count: i64) -> Result<MethodResult> {
        let return_type = &self.signature.return_type;
        if return_type.is_unit() {
            return Ok(MethodResult::Unit);
        }
        match return_type.scalar() {
            Some(sqlmapper_core::ScalarType::Int) => Ok(MethodResult::Value(Value::Int(
                i32::try_from(row_count).unwrap_or(i32::MAX),
            ))),
            Some(sqlmapper_core::ScalarType::Long) => Ok(MethodResult::Value(Value::BigInt(row_count))),
            Some(sqlmapper_core::ScalarType::Bool) => Ok(MethodResult::Value(Value::Bool(row_count > 0))),
            _ => Err(Error::binding(
                BindingErrorKind::UnsupportedReturnType,
                format!(
                    "Mapper method '{}' has an unsupported return type: {}",
                    self.display_name, return_type
                ),
            )),
        }
    }

    fn execute_with_result_handler(&self, session: &SqlSession, args: &mut [Arg]) -> Result<()> {
        let ms = session.configuration().mapped_statement(&self.display_name)?;
        let has_result_type = ms.result_map().is_some_and(|map| !map.is_void());
        if ms.statement_type() != StatementType::Callable && !has_result_type {
            return Err(Error::binding(
                BindingErrorKind::MissingResultType,
                format!(
                    "method {} needs either a result map or a result type so a ResultHandler can be used as a parameter.",
                    self.display_name
                ),
            ));
        }
        let mut param = self.parameter_object(session, args)?;
        let bounds = self.signature.extract_row_bounds(args);
        if let Some(handler) = self.signature.extract_result_handler(args) {
            let mut guard = handler.lock().unwrap_or_else(PoisonError::into_inner);
            session.select(&self.display_name, &mut param, bounds, &mut *guard)?;
        }
        self.signature.param_names.write_back(param, args);
        Ok(())
    }

    fn execute_for_many(&self, session: &SqlSession, args: &mut [Arg]) -> Result<MethodResult> {
        let mut param = self.parameter_object(session, args)?;
        let bounds = self.signature.extract_row_bounds(args);
        let rows = session.select_list(&self.display_name, &mut param, bounds)?;
        self.signature.param_names.write_back(param, args);

        match &self.signature.return_type {
            TypeRef::List(_) => Ok(MethodResult::List(rows)),
            TypeRef::Array(element) => self.convert_to_array(element, rows),
            declared => self.convert_to_declared_collection(session, declared, rows),
        }
    }

    fn convert_to_array(&self, element: &TypeRef, rows: Vec<Value>) -> Result<MethodResult> {
        let Some(scalar) = element.scalar() else {
            return Ok(MethodResult::Array(rows));
        };
        rows.into_iter()
            .map(|row| {
                if row.is_null() && element.is_primitive() {
                    return Err(Error::binding(
                        BindingErrorKind::NullIntoPrimitive,
                        format!(
                            "Mapper method '{}' cannot store null in an array of {}",
                            self.display_name, element
                        ),
                    ));
                }
                scalar.coerce(row)
            })
            .collect::<Result<Vec<_>>>()
            .map(MethodResult::Array)
    }

    fn convert_to_declared_collection(
        &self,
        session: &SqlSession,
        declared: &TypeRef,
        rows: Vec<Value>,
    ) -> Result<MethodResult> {
        match session.configuration().object_factory().create(declared) {
            Value::Array(mut items) => {
                items.extend(rows);
                Ok(MethodResult::Collection(Value::Array(items)))
            }
            _ => Err(Error::binding(
                BindingErrorKind::UnsupportedReturnType,
                format!(
                    "Mapper method '{}' has an unsupported return type: {}",
                    self.display_name, declared
                ),
            )),
        }
    }

    fn execute_for_map(&self, session: &SqlSession, args: &mut [Arg]) -> Result<MethodResult> {
        let mut param = self.parameter_object(session, args)?;
        let bounds = self.signature.extract_row_bounds(args);
        let map_key = self.signature.map_key.as_deref().unwrap_or_default();
        let map = session.select_map(&self.display_name, &mut param, map_key, bounds)?;
        self.signature.param_names.write_back(param, args);
        Ok(MethodResult::Map(map))
    }

    fn execute_for_cursor(&self, session: &SqlSession, args: &mut [Arg]) -> Result<MethodResult> {
        let mut param = self.parameter_object(session, args)?;
        let bounds = self.signature.extract_row_bounds(args);
        let cursor = session.select_cursor(&self.display_name, &mut param, bounds)?;
        self.signature.param_names.write_back(param, args);
        Ok(MethodResult::Cursor(cursor))
    }

    fn execute_for_one(&self, session: &SqlSession, args: &mut [Arg]) -> Result<MethodResult> {
        let mut param = self.parameter_object(session, args)?;
        let row = session.select_one(&self.display_name, &mut param)?;
        self.signature.param_names.write_back(param, args);

        if self.signature.returns_optional() {
            if row.is_null() {
                return Ok(MethodResult::Optional(None));
            }
            let element = match &self.signature.return_type {
                TypeRef::Optional(element) => element.scalar(),
                _ => None,
            };
            let row = match element {
                Some(scalar) => scalar.coerce(row)?,
                None => row,
            };
            return Ok(MethodResult::Optional(Some(row)));
        }
        if self.signature.returns_void() {
            return Ok(MethodResult::Unit);
        }
        match self.signature.return_type.scalar() {
            Some(scalar) => Ok(MethodResult::Value(scalar.coerce(row)?)),
            None => Ok(MethodResult::Value(row)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ParamDecl;
    use sqlmapper_core::ScalarType;

    fn config() -> Configuration {
        let mut config = Configuration::default();
        for (id, kind) in [
            ("app.BaseMapper.count", SqlCommandType::Select),
            ("app.UserMapper.find", SqlCommandType::Select),
            ("app.UserMapper.broken", SqlCommandType::Unknown),
        ] {
            config.add_statement(MappedStatement::builder(id, kind, "SELECT 1").build().unwrap());
        }
        config
    }

    fn interfaces() -> (Arc<MapperInterface>, MapperInterface) {
        let base = Arc::new(
            MapperInterface::new("app.BaseMapper")
                .method(MethodDecl::new("count", TypeRef::Primitive(ScalarType::Long)))
                .method(MethodDecl::new("flush", TypeRef::list(TypeRef::Map)).flush()),
        );
        let user = MapperInterface::new("app.UserMapper")
            .extends(Arc::clone(&base))
            .method(MethodDecl::new("find", TypeRef::Map))
            .method(MethodDecl::new("missing", TypeRef::Map))
            .method(MethodDecl::new("broken", TypeRef::Unit));
        (base, user)
    }

    #[test]
    fn statement_id_prefers_the_called_interface() {
        let (_, user) = interfaces();
        let command = SqlCommand::resolve(&config(), &user, &user.find_method("find").unwrap()).unwrap();
        assert_eq!(command.name(), Some("app.UserMapper.find"));
        assert_eq!(command.command_type(), SqlCommandType::Select);
    }

    #[test]
    fn inherited_method_resolves_through_parent() {
        let (_, user) = interfaces();
        let command = SqlCommand::resolve(&config(), &user, &user.find_method("count").unwrap()).unwrap();
        assert_eq!(command.name(), Some("app.BaseMapper.count"));
    }

    #[test]
    fn inherited_method_prefers_child_statement() {
        let (_, user) = interfaces();
        let mut config = config();
        config.add_statement(
            MappedStatement::builder("app.UserMapper.count", SqlCommandType::Select, "SELECT 2")
                .build()
                .unwrap(),
        );
        let command = SqlCommand::resolve(&config, &user, &user.find_method("count").unwrap()).unwrap();
        assert_eq!(command.name(), Some("app.UserMapper.count"));
    }

    #[test]
    fn flush_marker_without_statement_becomes_flush() {
        let (_, user) = interfaces();
        let command = SqlCommand::resolve(&config(), &user, &user.find_method("flush").unwrap()).unwrap();
        assert_eq!(command.command_type(), SqlCommandType::Flush);
        assert_eq!(command.name(), None);
    }

    #[test]
    fn missing_and_unknown_statements_fail() {
        let (_, user) = interfaces();
        let err = SqlCommand::resolve(&config(), &user, &user.find_method("missing").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid bound statement (not found): app.UserMapper.missing");
        assert_eq!(err.binding_kind(), Some(BindingErrorKind::StatementNotFound));

        let err = SqlCommand::resolve(&config(), &user, &user.find_method("broken").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown execution method for: app.UserMapper.broken");
    }

    #[test]
    fn return_shapes() {
        let config = Configuration::default();
        let shape = |ty: TypeRef, map_key: Option<&str>| {
            let mut method = MethodDecl::new("m", ty);
            method.map_key = map_key.map(str::to_string);
            MethodSignature::new(&config, &method).unwrap().shape()
        };
        assert_eq!(shape(TypeRef::Unit, None), ReturnShape::Void);
        assert_eq!(shape(TypeRef::list(TypeRef::Map), None), ReturnShape::List);
        assert_eq!(shape(TypeRef::array(TypeRef::Primitive(ScalarType::Int)), None), ReturnShape::List);
        assert_eq!(shape(TypeRef::collection("Set", TypeRef::Map), None), ReturnShape::List);
        assert_eq!(shape(TypeRef::cursor(TypeRef::Map), None), ReturnShape::Cursor);
        assert_eq!(shape(TypeRef::optional(TypeRef::Map), None), ReturnShape::Optional);
        assert_eq!(shape(TypeRef::Map, Some("id")), ReturnShape::Map);
        assert_eq!(shape(TypeRef::Map, None), ReturnShape::Single);
        assert_eq!(shape(TypeRef::record("User"), Some("id")), ReturnShape::Single);
    }

    #[test]
    fn special_parameters_must_be_unique() {
        let method = MethodDecl::new("page", TypeRef::list(TypeRef::Map))
            .param(ParamDecl::row_bounds())
            .param(ParamDecl::row_bounds());
        let err = MethodSignature::new(&Configuration::default(), &method).unwrap_err();
        assert_eq!(err.to_string(), "page cannot have multiple RowBounds parameters");

        let method = MethodDecl::new("scan", TypeRef::Unit)
            .param(ParamDecl::result_handler())
            .param(ParamDecl::value())
            .param(ParamDecl::result_handler());
        let err = MethodSignature::new(&Configuration::default(), &method).unwrap_err();
        assert_eq!(err.binding_kind(), Some(BindingErrorKind::DuplicateSpecialParameter));
    }

    #[test]
    fn special_parameters_are_extracted_by_position() {
        let method = MethodDecl::new("page", TypeRef::list(TypeRef::Map))
            .param(ParamDecl::value())
            .param(ParamDecl::row_bounds());
        let signature = MethodSignature::new(&Configuration::default(), &method).unwrap();
        assert!(signature.has_row_bounds());
        assert!(!signature.has_result_handler());
        let args = [Arg::value(1), Arg::RowBounds(RowBounds::new(2, 3))];
        assert_eq!(signature.extract_row_bounds(&args), RowBounds::new(2, 3));
        assert_eq!(
            signature.convert_args_to_sql_command_param(&args).unwrap(),
            BoundParams::Object(Value::Int(1))
        );
        assert!(signature.check_args("page", &args[..1]).is_err());
        assert!(signature.check_args("page", &[Arg::value(1), Arg::value(2)]).is_err());
    }
}
