//! Tree-walking interpreter for analyzed PLC programs.
//!
//! Values live in a runtime scope chain that mirrors the analyzer's.
//! `RETURN` travels as [`Flow::Return`] through statement execution and is
//! caught at the invocation boundary in [`Interpreter::invoke`].

use std::cmp::Ordering;
use std::io::Write;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::{debug, trace};

use crate::ast::{Access, BinaryOp, Call, Expr, ExprKind, Source, Stmt};
use crate::builtins::define_runtime_builtins;
use crate::environment::{Redefined, ScopeGuard, Scoped};
use crate::error::CoreError;
use crate::value::{Callable, RuntimeScope, Value};

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Return(Value),
}

pub struct Interpreter<W: Write> {
    scope: RuntimeScope,
    globals: RuntimeScope,
    /// Keeps the embedder's (or builtin) base scope alive.
    _base: RuntimeScope,
    out: W,
}

impl<W: Write> Scoped for Interpreter<W> {
    type Variable = Value;
    type Function = Callable;

    fn scope_slot(&mut self) -> &mut RuntimeScope {
        &mut self.scope
    }
}

impl<W: Write> Interpreter<W> {
    /// Program-level bindings are placed in a child of `parent`. Without a
    /// parent, a fresh scope holding the builtins is used. `print` writes
    /// to `out`.
    pub fn new(parent: Option<&RuntimeScope>, out: W) -> Result<Self, CoreError> {
        let base = match parent {
            Some(parent) => parent.clone(),
            None => {
                let root = RuntimeScope::root();
                define_runtime_builtins(&root)?;
                root
            }
        };
        let globals = base.child();
        Ok(Interpreter {
            scope: globals.clone(),
            globals,
            _base: base,
            out,
        })
    }

    pub fn scope(&self) -> &RuntimeScope {
        &self.scope
    }

    pub fn globals(&self) -> &RuntimeScope {
        &self.globals
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Define the program's fields and methods, then run `main/0` and
    /// return its result.
    pub fn interpret(&mut self, source: &Source) -> Result<Value, CoreError> {
        debug!(
            fields = source.fields.len(),
            methods = source.methods.len(),
            "interpretation started"
        );
        for field in &source.fields {
            let value = match &field.value {
                Some(value) => self.evaluate(value)?,
                None => Value::Nil,
            };
            self.scope
                .define_variable(field.name.clone(), value)
                .map_err(already_defined)?;
        }
        for method in &source.methods {
            let callable = Callable::Method {
                declaration: Rc::new(method.clone()),
                closure: self.scope.downgrade(),
            };
            self.scope
                .define_function(method.name.clone(), method.parameters.len(), callable)
                .map_err(already_defined)?;
        }

        let main = self
            .scope
            .lookup_function("main", 0)
            .ok_or_else(|| CoreError::runtime("main/0 is not defined"))?;
        let result = self.invoke(&main, Vec::new())?;
        debug!(%result, "interpretation finished");
        Ok(result)
    }

    /// Call `callable` with already evaluated arguments.
    pub fn invoke(&mut self, callable: &Callable, arguments: Vec<Value>) -> Result<Value, CoreError> {
        match callable {
            Callable::Native(function) => function(&mut self.out, arguments),
            Callable::Method {
                declaration,
                closure,
            } => {
                trace!(name = %declaration.name, "invoking method");
                let defining = closure.upgrade().ok_or_else(|| {
                    CoreError::runtime(format!(
                        "scope of method '{}' no longer exists",
                        declaration.name
                    ))
                })?;
                let child = defining.child();
                for (name, value) in declaration.parameters.iter().zip(arguments) {
                    child
                        .define_variable(name.clone(), value)
                        .map_err(already_defined)?;
                }

                let mut guard = ScopeGuard::enter(self, child);
                match guard.execute_statements(&declaration.statements)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Continue => Ok(Value::Nil),
                }
            }
        }
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<Flow, CoreError> {
        for statement in statements {
            if let Flow::Return(value) = self.execute(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    /// Execute `statements` in a fresh child of the current scope.
    fn execute_block(&mut self, statements: &[Stmt]) -> Result<Flow, CoreError> {
        let child = self.scope.child();
        let mut guard = ScopeGuard::enter(self, child);
        guard.execute_statements(statements)
    }

    fn execute(&mut self, statement: &Stmt) -> Result<Flow, CoreError> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }
            Stmt::Declaration(declaration) => {
                let value = match &declaration.value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                self.scope
                    .define_variable(declaration.name.clone(), value)
                    .map_err(already_defined)?;
            }
            Stmt::Assignment { receiver, value } => {
                let ExprKind::Access(access) = &receiver.kind else {
                    return Err(CoreError::runtime(
                        "assignment target must be a variable or field",
                    ));
                };
                self.assign(access, value)?;
            }
            Stmt::If {
                condition,
                then_statements,
                else_statements,
            } => {
                let branch = if self.evaluate(condition)?.as_boolean()? {
                    then_statements
                } else {
                    else_statements
                };
                return self.execute_block(branch);
            }
            Stmt::For {
                name,
                value,
                statements,
            } => {
                let Value::Iterable(items) = self.evaluate(value)? else {
                    return Err(CoreError::runtime("FOR requires an iterable value"));
                };
                for item in items.iter() {
                    let child = self.scope.child();
                    child
                        .define_variable(name.clone(), item.clone())
                        .map_err(already_defined)?;
                    let mut guard = ScopeGuard::enter(self, child);
                    if let Flow::Return(value) = guard.execute_statements(statements)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::While {
                condition,
                statements,
            } => {
                while self.evaluate(condition)?.as_boolean()? {
                    if let Flow::Return(value) = self.execute_block(statements)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Return(value) => return Ok(Flow::Return(self.evaluate(value)?)),
        }
        Ok(Flow::Continue)
    }

    fn assign(&mut self, access: &Access, value: &Expr) -> Result<(), CoreError> {
        match &access.receiver {
            Some(receiver) => {
                let receiver = self.evaluate(receiver)?;
                let value = self.evaluate(value)?;
                let Value::Object(object) = receiver else {
                    return Err(CoreError::runtime(format!(
                        "{} value has no field '{}'",
                        receiver.kind_name(),
                        access.name
                    )));
                };
                if !object.members.assign_variable(&access.name, value) {
                    return Err(CoreError::runtime(format!(
                        "{} has no field '{}'",
                        object.type_name, access.name
                    )));
                }
            }
            None => {
                let value = self.evaluate(value)?;
                if !self.scope.assign_variable(&access.name, value) {
                    return Err(CoreError::runtime(format!(
                        "undefined variable '{}'",
                        access.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, CoreError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Value::from(literal)),
            ExprKind::Group(inner) => self.evaluate(inner),
            ExprKind::Binary {
                operator,
                left,
                right,
            } => self.evaluate_binary(*operator, left, right),
            ExprKind::Access(access) => self.evaluate_access(access),
            ExprKind::Function(call) => self.evaluate_call(call),
        }
    }

    fn evaluate_binary(
        &mut self,
        operator: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Value, CoreError> {
        let left = self.evaluate(left)?;
        match operator {
            BinaryOp::And => {
                if !left.as_boolean()? {
                    return Ok(Value::Boolean(false));
                }
                return Ok(Value::Boolean(self.evaluate(right)?.as_boolean()?));
            }
            BinaryOp::Or => {
                if left.as_boolean()? {
                    return Ok(Value::Boolean(true));
                }
                return Ok(Value::Boolean(self.evaluate(right)?.as_boolean()?));
            }
            _ => {}
        }

        let right = self.evaluate(right)?;
        let mismatch = || {
            CoreError::runtime(format!(
                "operator {} cannot be applied to {} and {}",
                operator.symbol(),
                left.kind_name(),
                right.kind_name()
            ))
        };

        match operator {
            BinaryOp::Equal => Ok(Value::Boolean(left == right)),
            BinaryOp::NotEqual => Ok(Value::Boolean(left != right)),
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let ordering = match (&left, &right) {
                    (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
                    (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
                    _ => return Err(mismatch()),
                };
                let result = match operator {
                    BinaryOp::Less => ordering == Ordering::Less,
                    BinaryOp::LessEqual => ordering != Ordering::Greater,
                    BinaryOp::Greater => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Boolean(result))
            }
            BinaryOp::Add => match (&left, &right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{left}{right}")))
                }
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
                (Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a + b)),
                _ => Err(mismatch()),
            },
            BinaryOp::Sub => match (&left, &right) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a - b)),
                (Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a - b)),
                _ => Err(mismatch()),
            },
            BinaryOp::Mul => match (&left, &right) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
                (Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a * b)),
                _ => Err(mismatch()),
            },
            BinaryOp::Div => match (&left, &right) {
                (Value::Integer(a), Value::Integer(b)) => {
                    if b.is_zero() {
                        return Err(CoreError::runtime("division by zero"));
                    }
                    Ok(Value::Integer(a / b))
                }
                (Value::Decimal(a), Value::Decimal(b)) => {
                    if b.is_zero() {
                        return Err(CoreError::runtime("division by zero"));
                    }
                    Ok(Value::Decimal(divide_decimal(a, b)))
                }
                _ => Err(mismatch()),
            },
            BinaryOp::And | BinaryOp::Or => Err(mismatch()),
        }
    }

    fn evaluate_access(&mut self, access: &Access) -> Result<Value, CoreError> {
        match &access.receiver {
            Some(receiver) => match self.evaluate(receiver)? {
                Value::Object(object) => {
                    object.members.lookup_variable(&access.name).ok_or_else(|| {
                        CoreError::runtime(format!(
                            "{} has no field '{}'",
                            object.type_name, access.name
                        ))
                    })
                }
                other => Err(CoreError::runtime(format!(
                    "{} value has no field '{}'",
                    other.kind_name(),
                    access.name
                ))),
            },
            None => self.scope.lookup_variable(&access.name).ok_or_else(|| {
                CoreError::runtime(format!("undefined variable '{}'", access.name))
            }),
        }
    }

    fn evaluate_call(&mut self, call: &Call) -> Result<Value, CoreError> {
        let receiver = match &call.receiver {
            Some(receiver) => Some(self.evaluate(receiver)?),
            None => None,
        };
        let mut arguments = call
            .arguments
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect::<Result<Vec<_>, _>>()?;

        let callable = match receiver {
            Some(Value::Object(object)) => {
                let callable = object
                    .members
                    .lookup_function(&call.name, arguments.len() + 1)
                    .ok_or_else(|| {
                        CoreError::runtime(format!(
                            "{} has no method '{}/{}'",
                            object.type_name,
                            call.name,
                            arguments.len()
                        ))
                    })?;
                // The receiver is passed as the first argument.
                arguments.insert(0, Value::Object(object));
                callable
            }
            Some(other) => {
                return Err(CoreError::runtime(format!(
                    "{} value has no method '{}'",
                    other.kind_name(),
                    call.name
                )));
            }
            None => self
                .scope
                .lookup_function(&call.name, arguments.len())
                .ok_or_else(|| {
                    CoreError::runtime(format!(
                        "undefined function '{}/{}'",
                        call.name,
                        arguments.len()
                    ))
                })?,
        };
        self.invoke(&callable, arguments)
    }
}

/// `dividend / divisor` rounded half-to-even at the dividend's scale.
fn divide_decimal(dividend: &BigDecimal, divisor: &BigDecimal) -> BigDecimal {
    let (dividend_digits, scale) = dividend.as_bigint_and_exponent();
    let (divisor_digits, divisor_scale) = divisor.as_bigint_and_exponent();

    // dividend / divisor = (dd * 10^-scale) / (vd * 10^-divisor_scale)
    //                    = (dd * 10^divisor_scale / vd) * 10^-scale
    let (numerator, denominator) = if divisor_scale >= 0 {
        (dividend_digits * power_of_ten(divisor_scale), divisor_digits)
    } else {
        (dividend_digits, divisor_digits * power_of_ten(-divisor_scale))
    };
    BigDecimal::new(divide_half_even(&numerator, &denominator), scale)
}

fn power_of_ten(exponent: i64) -> BigInt {
    num_traits::pow(BigInt::from(10), exponent.unsigned_abs() as usize)
}

/// Integer division rounding to the nearest quotient, ties to even.
fn divide_half_even(numerator: &BigInt, denominator: &BigInt) -> BigInt {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.is_zero() {
        return quotient;
    }

    let twice_remainder = remainder.abs() * 2u32;
    let round_away = match twice_remainder.cmp(&denominator.abs()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => !(&quotient % 2u32).is_zero(),
    };
    if !round_away {
        quotient
    } else if numerator.is_negative() != denominator.is_negative() {
        quotient - 1u32
    } else {
        quotient + 1u32
    }
}

fn already_defined(Redefined(name): Redefined) -> CoreError {
    CoreError::runtime(format!("'{name}' is already defined in this scope"))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::analyzer::Analyzer;
    use crate::environment::Scope;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::value::Object;

    /// Lex, parse and analyze `input`.
    fn prepare(input: &str) -> Source {
        let mut source = parse(&lex(input).expect("lex")).expect("parse");
        Analyzer::new(None)
            .expect("analyzer")
            .analyze(&mut source)
            .expect("analyze");
        source
    }

    /// Run `input`, returning the result and everything printed.
    fn run(input: &str) -> (Result<Value, CoreError>, String) {
        let source = prepare(input);
        let mut interpreter = Interpreter::new(None, Vec::new()).expect("interpreter");
        let result = interpreter.interpret(&source);
        let printed = String::from_utf8(interpreter.into_output()).expect("utf8");
        (result, printed)
    }

    /// Run `RETURN <expr>;` from a main typed `Any`.
    fn eval(expr: &str) -> Result<Value, CoreError> {
        let source = parse(&lex(&format!("DEF main(): Any DO RETURN {expr}; END")).expect("lex"))
            .expect("parse");
        Interpreter::new(None, Vec::new())
            .expect("interpreter")
            .interpret(&source)
    }

    fn decimal(text: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(text).unwrap())
    }

    #[test]
    fn returns_field_from_main() {
        let (result, printed) = run("LET x: Integer = 5; DEF main(): Integer DO RETURN x; END");
        assert_eq!(result, Ok(Value::from(5)));
        assert_eq!(printed, "");
    }

    #[test]
    fn prints_inside_branch() {
        let (result, printed) =
            run("DEF main(): Integer DO IF TRUE DO print(\"hi\"); END RETURN 0; END");
        assert_eq!(result, Ok(Value::from(0)));
        assert_eq!(printed, "hi\n");
    }

    #[test]
    fn integer_division_by_zero_fails() {
        let (result, _) = run("DEF main(): Integer DO RETURN 1 / 0; END");
        assert!(matches!(result, Err(CoreError::RuntimeError(_))));
    }

    #[test]
    fn decimal_division_by_zero_fails() {
        assert!(matches!(eval("1.5 / 0.0"), Err(CoreError::RuntimeError(_))));
        assert!(matches!(eval("1.5 / 0.000"), Err(CoreError::RuntimeError(_))));
    }

    #[test]
    fn decimal_division_rounds_half_even_at_dividend_scale() {
        assert_eq!(eval("1.0 / 3.0"), Ok(decimal("0.3")));
        assert_eq!(eval("2.5 / 2.0"), Ok(decimal("1.2")));
        assert_eq!(eval("3.5 / 2.0"), Ok(decimal("1.8")));
        assert_eq!(eval("1.00 / 8.0"), Ok(decimal("0.12")));
        assert_eq!(eval("-2.5 / 2.0"), Ok(decimal("-1.2")));
        assert_eq!(eval("-3.5 / 2.0"), Ok(decimal("-1.8")));
        assert_eq!(eval("7.0 / 0.5"), Ok(decimal("14.0")));
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(eval("7 / 2"), Ok(Value::from(3)));
        assert_eq!(eval("-7 / 2"), Ok(Value::from(-3)));
    }

    #[test]
    fn arithmetic_uses_arbitrary_precision() {
        assert_eq!(
            eval("2147483647 * 2147483647"),
            Ok(Value::Integer(BigInt::from(2_147_483_647i64 * 2_147_483_647i64)))
        );
        assert_eq!(eval("0.1 + 0.2"), Ok(decimal("0.3")));
        assert_eq!(eval("1.5 * 2.0"), Ok(decimal("3.00")));
        assert_eq!(eval("10 - 15"), Ok(Value::from(-5)));
    }

    #[test]
    fn string_concatenation_uses_display() {
        assert_eq!(eval("\"n=\" + 1"), Ok(Value::String("n=1".into())));
        assert_eq!(eval("'c' + \"s\""), Ok(Value::String("cs".into())));
        assert_eq!(eval("\"\" + NIL"), Ok(Value::String("NIL".into())));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("1 < 2"), Ok(Value::Boolean(true)));
        assert_eq!(eval("2 <= 2"), Ok(Value::Boolean(true)));
        assert_eq!(eval("1.5 > 2.5"), Ok(Value::Boolean(false)));
        assert_eq!(eval("3 >= 4"), Ok(Value::Boolean(false)));
        assert_eq!(eval("\"a\" == \"a\""), Ok(Value::Boolean(true)));
        assert_eq!(eval("1.0 == 1.00"), Ok(Value::Boolean(true)));
        assert_eq!(eval("'a' != 'b'"), Ok(Value::Boolean(true)));
        assert_eq!(eval("1 == \"1\""), Ok(Value::Boolean(false)));
        assert!(matches!(eval("'a' < 'b'"), Err(CoreError::RuntimeError(_))));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(eval("FALSE AND 1 / 0 == 0"), Ok(Value::Boolean(false)));
        assert_eq!(eval("TRUE OR 1 / 0 == 0"), Ok(Value::Boolean(true)));
        assert!(matches!(eval("TRUE AND 1 / 0 == 0"), Err(CoreError::RuntimeError(_))));
        assert!(matches!(eval("1 OR TRUE"), Err(CoreError::RuntimeError(_))));
    }

    #[test]
    fn loops_and_assignment() {
        let (result, printed) = run(
            "DEF main(): Integer DO \
                LET i = 0; LET total = 0; \
                WHILE i < 4 DO total = total + i; i = i + 1; END \
                print(total); \
                RETURN total; \
             END",
        );
        assert_eq!(result, Ok(Value::from(6)));
        assert_eq!(printed, "6\n");
    }

    #[test]
    fn recursion_and_early_return() {
        let (result, _) = run(
            "DEF fact(n: Integer): Integer DO \
                IF n <= 1 DO RETURN 1; END \
                RETURN n * fact(n - 1); \
             END \
             DEF main(): Integer DO RETURN fact(10); END",
        );
        assert_eq!(result, Ok(Value::from(3_628_800)));
    }

    #[test]
    fn return_inside_while_unwinds_to_caller() {
        let (result, _) = run(
            "DEF first(): Integer DO WHILE TRUE DO RETURN 7; END RETURN 0; END \
             DEF main(): Integer DO RETURN first() + 1; END",
        );
        assert_eq!(result, Ok(Value::from(8)));
    }

    #[test]
    fn method_without_return_yields_nil() {
        let (result, printed) = run(
            "DEF log(x: Any) DO print(x); END \
             DEF main(): Integer DO log(1.5); RETURN 0; END",
        );
        assert_eq!(result, Ok(Value::from(0)));
        assert_eq!(printed, "1.5\n");
    }

    #[test]
    fn methods_close_over_defining_scope() {
        let (result, _) = run(
            "LET counter: Integer = 0; \
             DEF bump(): Integer DO counter = counter + 1; RETURN counter; END \
             DEF main(): Integer DO LET counter = 100; bump(); RETURN bump(); END",
        );
        assert_eq!(result, Ok(Value::from(2)));
    }

    #[test]
    fn missing_main_is_a_runtime_error() {
        let source = parse(&lex("DEF helper(): Integer DO RETURN 1; END").expect("lex"))
            .expect("parse");
        let err = Interpreter::new(None, Vec::new())
            .expect("interpreter")
            .interpret(&source)
            .unwrap_err();
        assert_eq!(err, CoreError::runtime("main/0 is not defined"));
    }

    #[test]
    fn for_iterates_embedder_iterables() {
        let parent = RuntimeScope::root();
        define_runtime_builtins(&parent).unwrap();
        parent
            .define_function(
                "range",
                1,
                Callable::native(|_, arguments| match arguments.as_slice() {
                    [Value::Integer(n)] => {
                        let n = i64::try_from(n.clone())
                            .map_err(|_| CoreError::runtime("range too large"))?;
                        Ok(Value::integers(0..n))
                    }
                    _ => Err(CoreError::runtime("range expects an Integer")),
                }),
            )
            .unwrap();

        let source = parse(
            &lex("DEF main(): Integer DO \
                    LET total = 0; \
                    FOR i IN range(5) DO print(i); total = total + i; END \
                    RETURN total; \
                  END")
            .expect("lex"),
        )
        .expect("parse");
        let mut interpreter = Interpreter::new(Some(&parent), Vec::new()).expect("interpreter");
        assert_eq!(interpreter.interpret(&source), Ok(Value::from(10)));
        assert_eq!(
            String::from_utf8(interpreter.into_output()).unwrap(),
            "0\n1\n2\n3\n4\n"
        );
    }

    #[test]
    fn receiver_calls_pass_receiver_first() {
        let object = Rc::new(Object::new("Point"));
        object.members.define_variable("x", Value::from(3)).unwrap();
        object
            .members
            .define_function(
                "scale",
                2,
                Callable::native(|_, arguments| match arguments.as_slice() {
                    [Value::Object(point), Value::Integer(factor)] => {
                        let Some(Value::Integer(x)) = point.members.lookup_variable("x") else {
                            return Err(CoreError::runtime("missing x"));
                        };
                        Ok(Value::Integer(x * factor))
                    }
                    _ => Err(CoreError::runtime("bad arguments")),
                }),
            )
            .unwrap();

        let parent = RuntimeScope::root();
        parent
            .define_variable("p", Value::Object(object.clone()))
            .unwrap();

        let source = parse(
            &lex("DEF main(): Integer DO p.x = p.x + 1; RETURN p.scale(5); END").expect("lex"),
        )
        .expect("parse");
        let mut interpreter = Interpreter::new(Some(&parent), Vec::new()).expect("interpreter");
        assert_eq!(interpreter.interpret(&source), Ok(Value::from(20)));
        assert_eq!(object.members.lookup_variable("x"), Some(Value::from(4)));
    }

    #[test]
    fn members_of_primitives_are_runtime_errors() {
        assert!(matches!(eval("1.x"), Err(CoreError::RuntimeError(_))));
    }

    #[test]
    fn scope_is_restored_after_errors() {
        let source = prepare(
            "DEF fail(): Integer DO IF TRUE DO WHILE TRUE DO RETURN 1 / 0; END END RETURN 0; END \
             DEF main(): Integer DO RETURN fail(); END",
        );
        let mut interpreter = Interpreter::new(None, Vec::new()).expect("interpreter");
        let globals: Scope<_, _> = interpreter.globals().clone();
        assert!(interpreter.interpret(&source).is_err());
        assert!(interpreter.scope().ptr_eq(&globals));
    }

    #[test]
    fn scope_is_restored_after_return() {
        let source = prepare(
            "DEF main(): Integer DO IF TRUE DO IF TRUE DO RETURN 3; END END RETURN 0; END",
        );
        let mut interpreter = Interpreter::new(None, Vec::new()).expect("interpreter");
        assert_eq!(interpreter.interpret(&source), Ok(Value::from(3)));
        assert!(interpreter.scope().ptr_eq(interpreter.globals()));
    }
}
