//! Host-provided functions visible to PLC programs.
//!
//! The descriptor table is the single source of truth: the analyzer, the
//! interpreter and the generator all derive their view of a builtin from
//! it.

use std::io::Write;

use crate::ast::{Expr, ExprKind, Source, Stmt};
use crate::environment::{Function, TypeScope};
use crate::error::CoreError;
use crate::types::Type;
use crate::value::{Callable, RuntimeScope, Value};

/// Kind of builtin, used to pick the runtime implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Writes its argument's text and a newline to the program output.
    Print,
}

/// Metadata about a single builtin function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name at the PLC level.
    pub name: &'static str,
    /// Name in generated Java.
    pub render_name: &'static str,
    pub arity: usize,
    pub kind: BuiltinKind,
}

pub const BUILTINS: &[BuiltinDescriptor] = &[BuiltinDescriptor {
    name: "print",
    render_name: "System.out.println",
    arity: 1,
    kind: BuiltinKind::Print,
}];

impl BuiltinDescriptor {
    pub fn parameter_types(&self) -> Vec<Type> {
        match self.kind {
            BuiltinKind::Print => vec![Type::Any],
        }
    }

    pub fn return_type(&self) -> Type {
        match self.kind {
            BuiltinKind::Print => Type::Nil,
        }
    }

    /// Analysis-time binding for this builtin.
    pub fn function(&self) -> Function {
        Function {
            name: self.name.to_string(),
            render_name: self.render_name.to_string(),
            parameter_types: self.parameter_types(),
            return_type: self.return_type(),
        }
    }

    /// Runtime implementation for this builtin.
    pub fn callable(&self) -> Callable {
        match self.kind {
            BuiltinKind::Print => Callable::native(print),
        }
    }

    /// True when `function` is the binding this descriptor produces.
    fn describes(&self, function: &Function) -> bool {
        function.render_name == self.render_name && function.arity() == self.arity
    }
}

pub fn find_builtin(name: &str, arity: usize) -> Option<&'static BuiltinDescriptor> {
    BUILTINS
        .iter()
        .find(|builtin| builtin.name == name && builtin.arity == arity)
}

pub fn define_analysis_builtins(scope: &TypeScope) -> Result<(), CoreError> {
    for builtin in BUILTINS {
        scope
            .define_function(builtin.name, builtin.arity, builtin.function())
            .map_err(|_| redefined(builtin))?;
    }
    Ok(())
}

pub fn define_runtime_builtins(scope: &RuntimeScope) -> Result<(), CoreError> {
    for builtin in BUILTINS {
        scope
            .define_function(builtin.name, builtin.arity, builtin.callable())
            .map_err(|_| redefined(builtin))?;
    }
    Ok(())
}

fn redefined(builtin: &BuiltinDescriptor) -> CoreError {
    CoreError::runtime(format!(
        "builtin '{}/{}' is already defined",
        builtin.name, builtin.arity
    ))
}

fn print(out: &mut dyn Write, arguments: Vec<Value>) -> Result<Value, CoreError> {
    for argument in &arguments {
        writeln!(out, "{argument}")
            .map_err(|err| CoreError::runtime(format!("print failed: {err}")))?;
    }
    Ok(Value::Nil)
}

/// Builtins called anywhere in an analyzed program, in table order.
pub fn collect_builtins(source: &Source) -> Vec<&'static BuiltinDescriptor> {
    let mut used = Vec::new();
    for field in &source.fields {
        if let Some(value) = &field.value {
            collect_from_expr(value, &mut used);
        }
    }
    for method in &source.methods {
        collect_from_statements(&method.statements, &mut used);
    }
    BUILTINS
        .iter()
        .filter(|builtin| used.iter().any(|function| builtin.describes(function)))
        .collect()
}

fn collect_from_statements<'s>(statements: &'s [Stmt], used: &mut Vec<&'s Function>) {
    for statement in statements {
        match statement {
            Stmt::Expression(expr) | Stmt::Return(expr) => collect_from_expr(expr, used),
            Stmt::Declaration(declaration) => {
                if let Some(value) = &declaration.value {
                    collect_from_expr(value, used);
                }
            }
            Stmt::Assignment { receiver, value } => {
                collect_from_expr(receiver, used);
                collect_from_expr(value, used);
            }
            Stmt::If {
                condition,
                then_statements,
                else_statements,
            } => {
                collect_from_expr(condition, used);
                collect_from_statements(then_statements, used);
                collect_from_statements(else_statements, used);
            }
            Stmt::For {
                value, statements, ..
            } => {
                collect_from_expr(value, used);
                collect_from_statements(statements, used);
            }
            Stmt::While {
                condition,
                statements,
            } => {
                collect_from_expr(condition, used);
                collect_from_statements(statements, used);
            }
        }
    }
}

fn collect_from_expr<'s>(expr: &'s Expr, used: &mut Vec<&'s Function>) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Group(inner) => collect_from_expr(inner, used),
        ExprKind::Binary { left, right, .. } => {
            collect_from_expr(left, used);
            collect_from_expr(right, used);
        }
        ExprKind::Access(access) => {
            if let Some(receiver) = &access.receiver {
                collect_from_expr(receiver, used);
            }
        }
        ExprKind::Function(call) => {
            if let Some(receiver) = &call.receiver {
                collect_from_expr(receiver, used);
            }
            for argument in &call.arguments {
                collect_from_expr(argument, used);
            }
            if call.receiver.is_none() {
                if let Some(function) = &call.function {
                    used.push(function);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_is_registered_for_analysis() {
        let scope = TypeScope::root();
        define_analysis_builtins(&scope).expect("builtins");

        let print = scope.lookup_function("print", 1).expect("print/1");
        assert_eq!(print.render_name, "System.out.println");
        assert_eq!(print.parameter_types, vec![Type::Any]);
        assert_eq!(print.return_type, Type::Nil);
        assert!(scope.lookup_function("print", 0).is_none());
    }

    #[test]
    fn runtime_print_writes_a_line() {
        let scope = RuntimeScope::root();
        define_runtime_builtins(&scope).expect("builtins");

        let Some(Callable::Native(print)) = scope.lookup_function("print", 1) else {
            panic!("print/1 should be native");
        };
        let mut out = Vec::new();
        let result = print(&mut out, vec![Value::String("hi".into())]).expect("print");
        assert_eq!(result, Value::Nil);
        assert_eq!(String::from_utf8(out).unwrap(), "hi\n");
    }

    #[test]
    fn builtins_cannot_be_defined_twice_in_one_scope() {
        let scope = TypeScope::root();
        define_analysis_builtins(&scope).expect("builtins");
        assert!(define_analysis_builtins(&scope).is_err());
    }

    #[test]
    fn finds_builtins_by_name_and_arity() {
        assert_eq!(find_builtin("print", 1).map(|b| b.kind), Some(BuiltinKind::Print));
        assert!(find_builtin("print", 2).is_none());
        assert!(find_builtin("println", 1).is_none());
    }
}
