//! Runtime values produced by the interpreter.

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::ast::{self, Literal};
use crate::environment::{Scope, WeakScope};
use crate::error::CoreError;

/// Scope of runtime bindings.
pub type RuntimeScope = Scope<Value, Callable>;

/// Host function. Receives the interpreter's output writer and the
/// evaluated arguments.
pub type NativeFunction = dyn Fn(&mut dyn Write, Vec<Value>) -> Result<Value, CoreError>;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
    Iterable(Rc<Vec<Value>>),
    Object(Rc<Object>),
}

impl Value {
    /// Name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Character(_) => "Character",
            Value::String(_) => "String",
            Value::Iterable(_) => "IntegerIterable",
            Value::Object(_) => "Object",
        }
    }

    pub fn as_boolean(&self) -> Result<bool, CoreError> {
        match self {
            Value::Boolean(value) => Ok(*value),
            other => Err(CoreError::runtime(format!(
                "expected Boolean, received {}",
                other.kind_name()
            ))),
        }
    }

    pub fn integers(values: impl IntoIterator<Item = i64>) -> Self {
        Value::Iterable(Rc::new(
            values
                .into_iter()
                .map(|value| Value::Integer(BigInt::from(value)))
                .collect(),
        ))
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Boolean(value) => Value::Boolean(*value),
            Literal::Integer(value) => Value::Integer(value.clone()),
            Literal::Decimal(value) => Value::Decimal(value.clone()),
            Literal::Character(value) => Value::Character(*value),
            Literal::String(value) => Value::String(value.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(BigInt::from(value))
    }
}

/// Structural equality. Objects are equal only to themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Decimal(left), Value::Decimal(right)) => left == right,
            (Value::Character(left), Value::Character(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Iterable(left), Value::Iterable(right)) => left == right,
            (Value::Object(left), Value::Object(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("NIL"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Decimal(value) => write!(f, "{value}"),
            Value::Character(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::Iterable(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Value::Object(object) => f.write_str(&object.type_name),
        }
    }
}

/// A structured value. Field reads and writes and method calls on it go
/// through its own member scope.
pub struct Object {
    pub type_name: String,
    pub members: RuntimeScope,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Object {
            type_name: type_name.into(),
            members: RuntimeScope::root(),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .field("members", &self.members)
            .finish()
    }
}

#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    /// A PLC method closing over the scope it was defined in.
    Method {
        declaration: Rc<ast::Method>,
        closure: WeakScope<Value, Callable>,
    },
}

impl Callable {
    pub fn native(
        function: impl Fn(&mut dyn Write, Vec<Value>) -> Result<Value, CoreError> + 'static,
    ) -> Self {
        Callable::Native(Rc::new(function))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => f.debug_tuple("Native").field(&"fn").finish(),
            Callable::Method { declaration, .. } => {
                f.debug_tuple("Method").field(&declaration.name).finish()
            }
        }
    }
}
