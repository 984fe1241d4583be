//! Abstract syntax tree for PLC programs.
//!
//! Nodes own their children. Name-reference and expression nodes carry
//! annotation slots that start empty and are filled in exactly once by the
//! analyzer; later stages read them back.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::environment::{Function, Variable};
use crate::types::Type;

/// A whole program: fields first, then methods.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

/// Top-level `LET name: Type (= value)?;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub value: Option<Expr>,
    pub variable: Option<Variable>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, value: Option<Expr>) -> Self {
        Field {
            name: name.into(),
            type_name: type_name.into(),
            value,
            variable: None,
        }
    }
}

/// `DEF name(params): Return DO ... END`.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub statements: Vec<Stmt>,
    pub function: Option<Function>,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<(String, String)>,
        return_type_name: Option<String>,
        statements: Vec<Stmt>,
    ) -> Self {
        let (parameters, parameter_type_names) = parameters.into_iter().unzip();
        Method {
            name: name.into(),
            parameters,
            parameter_type_names,
            return_type_name,
            statements,
            function: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A bare expression followed by `;`. Only calls are accepted by the
    /// analyzer.
    Expression(Expr),
    Declaration(Declaration),
    Assignment {
        receiver: Expr,
        value: Expr,
    },
    If {
        condition: Expr,
        then_statements: Vec<Stmt>,
        else_statements: Vec<Stmt>,
    },
    For {
        name: String,
        value: Expr,
        statements: Vec<Stmt>,
    },
    While {
        condition: Expr,
        statements: Vec<Stmt>,
    },
    Return(Expr),
}

/// Local `LET name (: Type)? (= value)?;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<Expr>,
    pub variable: Option<Variable>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, type_name: Option<String>, value: Option<Expr>) -> Self {
        Declaration {
            name: name.into(),
            type_name,
            value,
            variable: None,
        }
    }
}

/// Expression node with its resolved-type slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Group(Box<Expr>),
    Binary {
        operator: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Access(Access),
    Function(Call),
}

/// Literal payload, decided by the parser from the token kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// The operator as written in PLC source.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }
}

/// `name` or `receiver.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    pub variable: Option<Variable>,
}

/// `name(args)` or `receiver.name(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    pub arguments: Vec<Expr>,
    pub function: Option<Function>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind, ty: None }
    }

    pub fn literal(literal: Literal) -> Self {
        Expr::new(ExprKind::Literal(literal))
    }

    pub fn group(inner: Expr) -> Self {
        Expr::new(ExprKind::Group(Box::new(inner)))
    }

    pub fn binary(operator: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn access(receiver: Option<Expr>, name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Access(Access {
            receiver: receiver.map(Box::new),
            name: name.into(),
            variable: None,
        }))
    }

    pub fn call(receiver: Option<Expr>, name: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Function(Call {
            receiver: receiver.map(Box::new),
            name: name.into(),
            arguments,
            function: None,
        }))
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Function(_))
    }
}

/// Fill an annotation slot. Slots are written once, by the analyzer.
pub(crate) fn annotate<T>(slot: &mut Option<T>, value: T) {
    debug_assert!(slot.is_none(), "annotation slot written twice");
    *slot = Some(value);
}
