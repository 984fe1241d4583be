//! PLC's named types and the assignability relation between them.
//!
//! The built-in types are fixed. Embedders may add structured object types
//! through [`TypeTable::register`]; those carry a member scope that method
//! calls and field accesses on receivers resolve against.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::environment::TypeScope;
use crate::error::CoreError;

#[derive(Debug, Clone)]
pub enum Type {
    Any,
    Nil,
    Comparable,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
    /// Type of a `FOR` loop's iteration source.
    IntegerIterable,
    Object(Rc<ObjectType>),
}

/// Every built-in type, in table order.
pub const BUILTIN_TYPES: &[Type] = &[
    Type::Any,
    Type::Nil,
    Type::Comparable,
    Type::Boolean,
    Type::Integer,
    Type::Decimal,
    Type::Character,
    Type::String,
    Type::IntegerIterable,
];

impl Type {
    /// Name as written in PLC source.
    pub fn name(&self) -> &str {
        match self {
            Type::Any => "Any",
            Type::Nil => "Nil",
            Type::Comparable => "Comparable",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::Character => "Character",
            Type::String => "String",
            Type::IntegerIterable => "IntegerIterable",
            Type::Object(object) => &object.name,
        }
    }

    /// Name used in generated Java.
    pub fn render_name(&self) -> &str {
        match self {
            Type::Any => "Object",
            Type::Nil => "Void",
            Type::Comparable => "Comparable",
            Type::Boolean => "boolean",
            Type::Integer => "int",
            Type::Decimal => "double",
            Type::Character => "char",
            Type::String => "String",
            Type::IntegerIterable => "Iterable<Integer>",
            Type::Object(object) => &object.render_name,
        }
    }

    /// Member scope for receiver lookups. Built-in types have no members.
    pub fn members(&self) -> TypeScope {
        match self {
            Type::Object(object) => object.members.clone(),
            _ => TypeScope::root(),
        }
    }

    /// The four built-in primitives that admit comparison operators.
    pub fn is_comparable_primitive(&self) -> bool {
        matches!(
            self,
            Type::Integer | Type::Decimal | Type::Character | Type::String
        )
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Object(left), Type::Object(right)) => left.name == right.name,
            (Type::Object(_), _) | (_, Type::Object(_)) => false,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured type registered by an embedder.
pub struct ObjectType {
    pub name: String,
    pub render_name: String,
    pub members: TypeScope,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, render_name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            render_name: render_name.into(),
            members: TypeScope::root(),
        }
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectType").field(&self.name).finish()
    }
}

/// Result of an assignability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignability {
    /// Source and target are the same type.
    Equal,
    /// Source widens to `Any` or `Comparable`.
    Widening,
    NotAssignable,
}

/// Can a value of type `ty` be stored where `target` is expected?
///
/// The relation is fixed and deliberately not transitive beyond its two
/// widening targets.
pub fn assignability(target: &Type, ty: &Type) -> Assignability {
    if target == ty {
        return Assignability::Equal;
    }
    match target {
        Type::Any => Assignability::Widening,
        Type::Comparable if ty.is_comparable_primitive() => Assignability::Widening,
        _ => Assignability::NotAssignable,
    }
}

pub fn is_assignable(target: &Type, ty: &Type) -> bool {
    assignability(target, ty) != Assignability::NotAssignable
}

pub fn require_assignable(target: &Type, ty: &Type) -> Result<(), CoreError> {
    if is_assignable(target, ty) {
        Ok(())
    } else {
        Err(CoreError::type_error(format!(
            "expected {target}, received {ty}"
        )))
    }
}

/// Name to type lookup used when resolving type annotations.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: HashMap<String, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        let types = BUILTIN_TYPES
            .iter()
            .map(|ty| (ty.name().to_string(), ty.clone()))
            .collect();
        TypeTable { types }
    }

    pub fn register(&mut self, ty: Type) -> Result<(), CoreError> {
        if self.types.contains_key(ty.name()) {
            return Err(CoreError::type_error(format!(
                "type '{}' is already defined",
                ty.name()
            )));
        }
        self.types.insert(ty.name().to_string(), ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Type, CoreError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::type_error(format!("unknown type '{name}'")))
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Type {
        Type::Object(Rc::new(ObjectType::new("Point", "Point")))
    }

    #[test]
    fn assignability_table_is_exact() {
        let mut types = BUILTIN_TYPES.to_vec();
        types.push(point());

        for target in &types {
            for ty in &types {
                let expected = if target == ty {
                    Assignability::Equal
                } else if *target == Type::Any
                    || (*target == Type::Comparable && ty.is_comparable_primitive())
                {
                    Assignability::Widening
                } else {
                    Assignability::NotAssignable
                };
                assert_eq!(
                    assignability(target, ty),
                    expected,
                    "{ty} -> {target}"
                );
            }
        }
    }

    #[test]
    fn comparable_is_not_transitive() {
        assert!(is_assignable(&Type::Comparable, &Type::Integer));
        assert!(!is_assignable(&Type::Comparable, &Type::Boolean));
        assert!(!is_assignable(&Type::Comparable, &Type::Any));
        assert!(!is_assignable(&Type::Integer, &Type::Comparable));
        assert!(!is_assignable(&Type::Decimal, &Type::Integer));
        assert!(is_assignable(&Type::Any, &Type::Nil));
    }

    #[test]
    fn require_assignable_reports_both_types() {
        let err = require_assignable(&Type::Integer, &Type::String).unwrap_err();
        assert_eq!(
            err,
            CoreError::type_error("expected Integer, received String")
        );
    }

    #[test]
    fn render_names_match_java() {
        let rendered: Vec<&str> = BUILTIN_TYPES.iter().map(Type::render_name).collect();
        assert_eq!(
            rendered,
            vec![
                "Object",
                "Void",
                "Comparable",
                "boolean",
                "int",
                "double",
                "char",
                "String",
                "Iterable<Integer>",
            ]
        );
    }

    #[test]
    fn object_types_compare_by_name() {
        assert_eq!(point(), point());
        assert_ne!(point(), Type::Any);
        assert_eq!(point().render_name(), "Point");
    }

    #[test]
    fn table_resolves_builtins_and_registered_types() {
        let mut table = TypeTable::new();
        assert_eq!(table.get("Integer").expect("builtin"), Type::Integer);
        assert!(matches!(table.get("Point"), Err(CoreError::TypeError(_))));

        table.register(point()).expect("register");
        assert_eq!(table.get("Point").expect("registered"), point());
        assert!(table.register(point()).is_err());
        assert!(table.register(Type::Integer).is_err());
    }
}
