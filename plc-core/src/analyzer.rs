//! Semantic analysis for PLC.
//!
//! A single top-down walk over the `Source` tree. Names are resolved
//! against a scope chain, types are checked against the fixed
//! assignability relation, and every expression and name-reference node
//! has its annotation slot filled. The first violation aborts the walk with
//! a `TypeError`; the tree is then only partially annotated and must not be
//! used further.

use num_traits::ToPrimitive;
use tracing::{debug, trace};

use crate::ast::{
    self, Access, BinaryOp, Call, Declaration, Expr, ExprKind, Field, Literal, Source, Stmt,
};
use crate::builtins::define_analysis_builtins;
use crate::environment::{Function, Redefined, ScopeGuard, Scoped, TypeScope, Variable};
use crate::error::CoreError;
use crate::types::{Type, TypeTable, is_assignable, require_assignable};

pub struct Analyzer {
    scope: TypeScope,
    globals: TypeScope,
    /// Keeps the embedder's (or builtin) base scope alive.
    _base: TypeScope,
    types: TypeTable,
    /// Declared return type of the method whose body is being visited.
    return_type: Option<Type>,
}

impl Scoped for Analyzer {
    type Variable = Variable;
    type Function = Function;

    fn scope_slot(&mut self) -> &mut TypeScope {
        &mut self.scope
    }
}

impl Analyzer {
    /// Program-level bindings are placed in a child of `parent`. Without a
    /// parent, a fresh scope holding the builtins is used.
    pub fn new(parent: Option<&TypeScope>) -> Result<Self, CoreError> {
        let base = match parent {
            Some(parent) => parent.clone(),
            None => {
                let root = TypeScope::root();
                define_analysis_builtins(&root)?;
                root
            }
        };
        let globals = base.child();
        Ok(Analyzer {
            scope: globals.clone(),
            globals,
            _base: base,
            types: TypeTable::new(),
            return_type: None,
        })
    }

    /// Resolve type annotations against `types` instead of the built-ins
    /// alone.
    pub fn with_types(mut self, types: TypeTable) -> Self {
        self.types = types;
        self
    }

    /// The currently active scope.
    pub fn scope(&self) -> &TypeScope {
        &self.scope
    }

    /// The scope holding the program's fields and methods.
    pub fn globals(&self) -> &TypeScope {
        &self.globals
    }

    pub fn analyze(&mut self, source: &mut Source) -> Result<(), CoreError> {
        debug!(
            fields = source.fields.len(),
            methods = source.methods.len(),
            "analysis started"
        );
        for field in &mut source.fields {
            self.visit_field(field)?;
        }
        for method in &mut source.methods {
            self.visit_method(method)?;
        }

        let main = self
            .globals
            .lookup_function("main", 0)
            .ok_or_else(|| CoreError::type_error("main/0 is not defined"))?;
        if !is_assignable(&Type::Integer, &main.return_type) {
            return Err(CoreError::type_error(format!(
                "main/0 must return Integer, but returns {}",
                main.return_type
            )));
        }
        debug!("analysis finished");
        Ok(())
    }

    fn visit_field(&mut self, field: &mut Field) -> Result<(), CoreError> {
        let ty = self.types.get(&field.type_name)?;
        if let Some(value) = &mut field.value {
            let value_type = self.visit_expr(value)?;
            require_assignable(&ty, &value_type)?;
        }
        let variable = Variable::new(field.name.clone(), ty);
        self.scope
            .define_variable(field.name.clone(), variable.clone())
            .map_err(already_defined)?;
        ast::annotate(&mut field.variable, variable);
        Ok(())
    }

    fn visit_method(&mut self, method: &mut ast::Method) -> Result<(), CoreError> {
        trace!(name = %method.name, "analyzing method");
        let parameter_types = method
            .parameter_type_names
            .iter()
            .map(|name| self.types.get(name))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = match &method.return_type_name {
            Some(name) => self.types.get(name)?,
            None => Type::Nil,
        };

        let function = Function::new(method.name.clone(), parameter_types.clone(), return_type.clone());
        self.scope
            .define_function(method.name.clone(), parameter_types.len(), function.clone())
            .map_err(already_defined)?;
        ast::annotate(&mut method.function, function);

        let child = self.scope.child();
        let mut guard = ScopeGuard::enter(self, child);
        for (name, ty) in method.parameters.iter().zip(parameter_types) {
            guard
                .scope
                .define_variable(name.clone(), Variable::new(name.clone(), ty))
                .map_err(already_defined)?;
        }
        let enclosing = guard.return_type.replace(return_type);
        let result = guard.visit_statements(&mut method.statements);
        guard.return_type = enclosing;
        result
    }

    fn visit_statements(&mut self, statements: &mut [Stmt]) -> Result<(), CoreError> {
        statements
            .iter_mut()
            .try_for_each(|statement| self.visit_statement(statement))
    }

    /// Visit `statements` in a fresh child of the current scope.
    fn visit_block(&mut self, statements: &mut [Stmt]) -> Result<(), CoreError> {
        let child = self.scope.child();
        let mut guard = ScopeGuard::enter(self, child);
        guard.visit_statements(statements)
    }

    fn visit_statement(&mut self, statement: &mut Stmt) -> Result<(), CoreError> {
        match statement {
            Stmt::Expression(expr) => {
                if !expr.is_call() {
                    return Err(CoreError::type_error(
                        "expression statement must be a function call",
                    ));
                }
                self.visit_expr(expr)?;
                Ok(())
            }
            Stmt::Declaration(declaration) => self.visit_declaration(declaration),
            Stmt::Assignment { receiver, value } => {
                if !matches!(receiver.kind, ExprKind::Access(_)) {
                    return Err(CoreError::type_error(
                        "assignment target must be a variable or field",
                    ));
                }
                let target = self.visit_expr(receiver)?;
                let value_type = self.visit_expr(value)?;
                require_assignable(&target, &value_type)
            }
            Stmt::If {
                condition,
                then_statements,
                else_statements,
            } => {
                let condition_type = self.visit_expr(condition)?;
                require_assignable(&Type::Boolean, &condition_type)?;
                if then_statements.is_empty() {
                    return Err(CoreError::type_error("IF body must not be empty"));
                }
                self.visit_block(then_statements)?;
                self.visit_block(else_statements)
            }
            Stmt::For {
                name,
                value,
                statements,
            } => {
                let iterable = self.visit_expr(value)?;
                require_assignable(&Type::IntegerIterable, &iterable)?;
                if statements.is_empty() {
                    return Err(CoreError::type_error("FOR body must not be empty"));
                }
                let child = self.scope.child();
                let mut guard = ScopeGuard::enter(self, child);
                guard
                    .scope
                    .define_variable(name.clone(), Variable::new(name.clone(), Type::Integer))
                    .map_err(already_defined)?;
                guard.visit_statements(statements)
            }
            Stmt::While {
                condition,
                statements,
            } => {
                let condition_type = self.visit_expr(condition)?;
                require_assignable(&Type::Boolean, &condition_type)?;
                self.visit_block(statements)
            }
            Stmt::Return(value) => {
                let value_type = self.visit_expr(value)?;
                let return_type = self
                    .return_type
                    .clone()
                    .ok_or_else(|| CoreError::type_error("RETURN outside of a method"))?;
                require_assignable(&return_type, &value_type)
            }
        }
    }

    fn visit_declaration(&mut self, declaration: &mut Declaration) -> Result<(), CoreError> {
        let declared = match &declaration.type_name {
            Some(name) => Some(self.types.get(name)?),
            None => None,
        };
        let value_type = match &mut declaration.value {
            Some(value) => Some(self.visit_expr(value)?),
            None => None,
        };

        let ty = match (declared, value_type) {
            (Some(declared), Some(value_type)) => {
                require_assignable(&declared, &value_type)?;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(value_type)) => value_type,
            (None, None) => {
                return Err(CoreError::type_error(format!(
                    "declaration of '{}' needs a type or a value",
                    declaration.name
                )));
            }
        };

        let variable = Variable::new(declaration.name.clone(), ty);
        self.scope
            .define_variable(declaration.name.clone(), variable.clone())
            .map_err(already_defined)?;
        ast::annotate(&mut declaration.variable, variable);
        Ok(())
    }

    /// Resolve `expr`, fill its type slot and return the type.
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<Type, CoreError> {
        let ty = match &mut expr.kind {
            ExprKind::Literal(literal) => literal_type(literal)?,
            ExprKind::Group(inner) => {
                if !matches!(inner.kind, ExprKind::Binary { .. }) {
                    return Err(CoreError::type_error(
                        "grouped expression must be a binary expression",
                    ));
                }
                self.visit_expr(inner)?
            }
            ExprKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.visit_expr(left)?;
                let right = self.visit_expr(right)?;
                binary_type(*operator, &left, &right)?
            }
            ExprKind::Access(access) => self.visit_access(access)?,
            ExprKind::Function(call) => self.visit_call(call)?,
        };
        ast::annotate(&mut expr.ty, ty.clone());
        Ok(ty)
    }

    fn visit_access(&mut self, access: &mut Access) -> Result<Type, CoreError> {
        let variable = match &mut access.receiver {
            Some(receiver) => {
                let receiver_type = self.visit_expr(receiver)?;
                let variable = receiver_type
                    .members()
                    .lookup_variable(&access.name)
                    .ok_or_else(|| {
                        CoreError::type_error(format!(
                            "type {receiver_type} has no field '{}'",
                            access.name
                        ))
                    })?;
                if !self.scope.has_local_variable(&access.name) {
                    self.scope
                        .define_variable(access.name.clone(), variable.clone())
                        .map_err(already_defined)?;
                }
                variable
            }
            None => self.scope.lookup_variable(&access.name).ok_or_else(|| {
                CoreError::type_error(format!("undefined variable '{}'", access.name))
            })?,
        };
        let ty = variable.ty.clone();
        ast::annotate(&mut access.variable, variable);
        Ok(ty)
    }

    fn visit_call(&mut self, call: &mut Call) -> Result<Type, CoreError> {
        let argument_types = call
            .arguments
            .iter_mut()
            .map(|argument| self.visit_expr(argument))
            .collect::<Result<Vec<_>, _>>()?;

        // A receiver fills parameter slot 0; visible arguments start at 1.
        let (function, offset) = match &mut call.receiver {
            Some(receiver) => {
                let receiver_type = self.visit_expr(receiver)?;
                let function = receiver_type
                    .members()
                    .lookup_function(&call.name, argument_types.len() + 1)
                    .ok_or_else(|| {
                        CoreError::type_error(format!(
                            "type {receiver_type} has no method '{}/{}'",
                            call.name,
                            argument_types.len()
                        ))
                    })?;
                (function, 1)
            }
            None => {
                let function = self
                    .scope
                    .lookup_function(&call.name, argument_types.len())
                    .ok_or_else(|| {
                        CoreError::type_error(format!(
                            "undefined function '{}/{}'",
                            call.name,
                            argument_types.len()
                        ))
                    })?;
                (function, 0)
            }
        };

        for (parameter, argument) in function
            .parameter_types
            .iter()
            .skip(offset)
            .zip(&argument_types)
        {
            require_assignable(parameter, argument)?;
        }

        let ty = function.return_type.clone();
        ast::annotate(&mut call.function, function);
        Ok(ty)
    }
}

fn literal_type(literal: &Literal) -> Result<Type, CoreError> {
    match literal {
        Literal::Nil => Ok(Type::Nil),
        Literal::Boolean(_) => Ok(Type::Boolean),
        Literal::Integer(value) => match value.to_i32() {
            Some(_) => Ok(Type::Integer),
            None => Err(CoreError::type_error(format!(
                "integer literal {value} is out of 32-bit range"
            ))),
        },
        Literal::Decimal(value) => match value.to_f64() {
            Some(float) if float.is_finite() => Ok(Type::Decimal),
            _ => Err(CoreError::type_error(format!(
                "decimal literal {value} is out of 64-bit range"
            ))),
        },
        Literal::Character(_) => Ok(Type::Character),
        Literal::String(_) => Ok(Type::String),
    }
}

fn binary_type(operator: BinaryOp, left: &Type, right: &Type) -> Result<Type, CoreError> {
    let mismatch = || {
        CoreError::type_error(format!(
            "operator {} cannot be applied to {left} and {right}",
            operator.symbol()
        ))
    };

    if operator.is_logical() {
        require_assignable(&Type::Boolean, left)?;
        require_assignable(&Type::Boolean, right)?;
        return Ok(Type::Boolean);
    }
    if operator.is_comparison() {
        if left != right || !left.is_comparable_primitive() {
            return Err(mismatch());
        }
        return Ok(Type::Boolean);
    }

    match (operator, left, right) {
        (BinaryOp::Add, Type::String, _) | (BinaryOp::Add, _, Type::String) => Ok(Type::String),
        (_, Type::Integer, Type::Integer) => Ok(Type::Integer),
        (_, Type::Decimal, Type::Decimal) => Ok(Type::Decimal),
        _ => Err(mismatch()),
    }
}

fn already_defined(Redefined(name): Redefined) -> CoreError {
    CoreError::type_error(format!("'{name}' is already defined in this scope"))
}
