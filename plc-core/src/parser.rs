//! Recursive-descent parser for PLC.
//!
//! Each grammar rule has its own method. Expression precedence is an
//! explicit chain of levels, lowest binding first:
//!
//!   logical (AND OR) -> equality (< <= > >= == !=) -> additive (+ -)
//!     -> multiplicative (* /) -> secondary (.member) -> primary
//!
//! There is no error recovery; the first unmet expectation aborts parsing.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use tracing::debug;

use crate::ast::{BinaryOp, Declaration, Expr, Field, Literal, Method, Source, Stmt};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};

pub fn parse(tokens: &[Token]) -> Result<Source, CoreError> {
    let mut parser = Parser { tokens, index: 0 };
    let source = parser.parse_source()?;
    debug!(
        fields = source.fields.len(),
        methods = source.methods.len(),
        "parsed source"
    );
    Ok(source)
}

/// Something a token can be matched against: its kind or its exact text.
trait TokenPattern {
    fn accepts(&self, token: &Token) -> bool;
}

impl TokenPattern for TokenKind {
    fn accepts(&self, token: &Token) -> bool {
        token.kind == *self
    }
}

impl TokenPattern for &str {
    fn accepts(&self, token: &Token) -> bool {
        token.literal == *self
    }
}

const EQUALITY_OPERATORS: &[(&str, BinaryOp)] = &[
    ("<", BinaryOp::Less),
    ("<=", BinaryOp::LessEqual),
    (">", BinaryOp::Greater),
    (">=", BinaryOp::GreaterEqual),
    ("==", BinaryOp::Equal),
    ("!=", BinaryOp::NotEqual),
];

struct Parser<'t> {
    tokens: &'t [Token],
    index: usize,
}

impl<'t> Parser<'t> {
    fn parse_source(&mut self) -> Result<Source, CoreError> {
        let mut source = Source::default();

        while self.matches(&[&"LET"]) {
            source.fields.push(self.parse_field()?);
        }
        while self.matches(&[&"DEF"]) {
            source.methods.push(self.parse_method()?);
        }

        if self.has(0) {
            return Err(self.error("expected LET or DEF"));
        }
        Ok(source)
    }

    /// `LET` has already been consumed.
    fn parse_field(&mut self) -> Result<Field, CoreError> {
        let name = self.expect_identifier("expected field name")?;
        self.expect(":", "expected ':' before field type")?;
        let type_name = self.expect_identifier("expected field type")?;
        let value = if self.matches(&[&"="]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(";", "expected ';' after field")?;
        Ok(Field::new(name, type_name, value))
    }

    /// `DEF` has already been consumed.
    fn parse_method(&mut self) -> Result<Method, CoreError> {
        let name = self.expect_identifier("expected method name")?;
        self.expect("(", "expected '(' after method name")?;

        let mut parameters = Vec::new();
        if !self.peek(&[&")"]) {
            loop {
                let parameter = self.expect_identifier("expected parameter name")?;
                self.expect(":", "expected ':' before parameter type")?;
                let type_name = self.expect_identifier("expected parameter type")?;
                parameters.push((parameter, type_name));
                if !self.matches(&[&","]) {
                    break;
                }
            }
        }
        self.expect(")", "expected ')' after parameters")?;

        let return_type_name = if self.matches(&[&":"]) {
            Some(self.expect_identifier("expected return type")?)
        } else {
            None
        };

        self.expect("DO", "expected DO before method body")?;
        let statements = self.parse_block(&["END"])?;
        self.expect("END", "expected END after method body")?;

        Ok(Method::new(name, parameters, return_type_name, statements))
    }

    /// Statements up to (not including) one of `terminators`. Stray `;`
    /// separators are skipped.
    fn parse_block(&mut self, terminators: &[&str]) -> Result<Vec<Stmt>, CoreError> {
        let mut statements = Vec::new();
        loop {
            if terminators.iter().any(|terminator| self.peek(&[terminator])) {
                return Ok(statements);
            }
            if self.matches(&[&";"]) {
                continue;
            }
            if !self.has(0) {
                return Err(self.error(format!("expected {}", terminators.join(" or "))));
            }
            statements.push(self.parse_statement()?);
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, CoreError> {
        if self.matches(&[&"LET"]) {
            self.parse_declaration_statement()
        } else if self.matches(&[&"IF"]) {
            self.parse_if_statement()
        } else if self.matches(&[&"FOR"]) {
            self.parse_for_statement()
        } else if self.matches(&[&"WHILE"]) {
            self.parse_while_statement()
        } else if self.matches(&[&"RETURN"]) {
            self.parse_return_statement()
        } else {
            let expression = self.parse_expression()?;
            if self.matches(&[&"="]) {
                let value = self.parse_expression()?;
                self.expect(";", "expected ';' after assignment")?;
                Ok(Stmt::Assignment {
                    receiver: expression,
                    value,
                })
            } else {
                self.expect(";", "expected ';' after expression")?;
                Ok(Stmt::Expression(expression))
            }
        }
    }

    fn parse_declaration_statement(&mut self) -> Result<Stmt, CoreError> {
        let name = self.expect_identifier("expected variable name")?;
        let type_name = if self.matches(&[&":"]) {
            Some(self.expect_identifier("expected variable type")?)
        } else {
            None
        };
        let value = if self.matches(&[&"="]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(";", "expected ';' after declaration")?;
        Ok(Stmt::Declaration(Declaration::new(name, type_name, value)))
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, CoreError> {
        let condition = self.parse_expression()?;
        self.expect("DO", "expected DO after IF condition")?;
        let then_statements = self.parse_block(&["ELSE", "END"])?;
        let else_statements = if self.matches(&[&"ELSE"]) {
            self.parse_block(&["END"])?
        } else {
            Vec::new()
        };
        self.expect("END", "expected END after IF")?;
        Ok(Stmt::If {
            condition,
            then_statements,
            else_statements,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Stmt, CoreError> {
        let name = self.expect_identifier("expected loop variable")?;
        self.expect("IN", "expected IN after loop variable")?;
        let value = self.parse_expression()?;
        self.expect("DO", "expected DO after FOR iterable")?;
        let statements = self.parse_block(&["END"])?;
        self.expect("END", "expected END after FOR")?;
        Ok(Stmt::For {
            name,
            value,
            statements,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, CoreError> {
        let condition = self.parse_expression()?;
        self.expect("DO", "expected DO after WHILE condition")?;
        let statements = self.parse_block(&["END"])?;
        self.expect("END", "expected END after WHILE")?;
        Ok(Stmt::While {
            condition,
            statements,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, CoreError> {
        let value = self.parse_expression()?;
        self.expect(";", "expected ';' after RETURN value")?;
        Ok(Stmt::Return(value))
    }

    fn parse_expression(&mut self) -> Result<Expr, CoreError> {
        self.parse_logical_expression()
    }

    fn parse_logical_expression(&mut self) -> Result<Expr, CoreError> {
        self.parse_binary_chain(
            &[("AND", BinaryOp::And), ("OR", BinaryOp::Or)],
            Self::parse_equality_expression,
        )
    }

    fn parse_equality_expression(&mut self) -> Result<Expr, CoreError> {
        self.parse_binary_chain(EQUALITY_OPERATORS, Self::parse_additive_expression)
    }

    fn parse_additive_expression(&mut self) -> Result<Expr, CoreError> {
        self.parse_binary_chain(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative_expression,
        )
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expr, CoreError> {
        self.parse_binary_chain(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div)],
            Self::parse_secondary_expression,
        )
    }

    /// Left-associative chain: `next (op next)*`.
    fn parse_binary_chain(
        &mut self,
        operators: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, CoreError>,
    ) -> Result<Expr, CoreError> {
        let mut expression = next(self)?;
        while let Some(operator) = self.match_operator(operators) {
            let right = next(self)?;
            expression = Expr::binary(operator, expression, right);
        }
        Ok(expression)
    }

    fn match_operator(&mut self, operators: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        let operator = operators
            .iter()
            .find(|(symbol, _)| self.peek(&[symbol]))
            .map(|&(_, operator)| operator)?;
        self.index += 1;
        Some(operator)
    }

    fn parse_secondary_expression(&mut self) -> Result<Expr, CoreError> {
        let mut expression = self.parse_primary_expression()?;
        while self.matches(&[&"."]) {
            let name = self.expect_identifier("expected member name after '.'")?;
            expression = if self.matches(&[&"("]) {
                let arguments = self.parse_arguments()?;
                Expr::call(Some(expression), name, arguments)
            } else {
                Expr::access(Some(expression), name)
            };
        }
        Ok(expression)
    }

    fn parse_primary_expression(&mut self) -> Result<Expr, CoreError> {
        if self.matches(&[&"NIL"]) {
            Ok(Expr::literal(Literal::Nil))
        } else if self.matches(&[&"TRUE"]) {
            Ok(Expr::literal(Literal::Boolean(true)))
        } else if self.matches(&[&"FALSE"]) {
            Ok(Expr::literal(Literal::Boolean(false)))
        } else if self.matches(&[&TokenKind::Integer]) {
            let token = self.previous();
            let value = BigInt::from_str(token.literal.trim_start_matches('+'))
                .map_err(|_| CoreError::parse(token.index, "invalid integer literal"))?;
            Ok(Expr::literal(Literal::Integer(value)))
        } else if self.matches(&[&TokenKind::Decimal]) {
            let token = self.previous();
            let value = BigDecimal::from_str(token.literal.trim_start_matches('+'))
                .map_err(|_| CoreError::parse(token.index, "invalid decimal literal"))?;
            Ok(Expr::literal(Literal::Decimal(value)))
        } else if self.matches(&[&TokenKind::Character]) {
            let token = self.previous();
            let text = unescape(strip_quotes(&token.literal));
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(Expr::literal(Literal::Character(ch))),
                _ => Err(CoreError::parse(token.index, "invalid character literal")),
            }
        } else if self.matches(&[&TokenKind::String]) {
            let token = self.previous();
            Ok(Expr::literal(Literal::String(unescape(strip_quotes(
                &token.literal,
            )))))
        } else if self.peek(&[&TokenKind::Identifier]) {
            let name = self.expect_identifier("expected identifier")?;
            if self.matches(&[&"("]) {
                let arguments = self.parse_arguments()?;
                Ok(Expr::call(None, name, arguments))
            } else {
                Ok(Expr::access(None, name))
            }
        } else if self.matches(&[&"("]) {
            let expression = self.parse_expression()?;
            self.expect(")", "expected ')' after grouped expression")?;
            Ok(Expr::group(expression))
        } else {
            Err(self.error("expected expression"))
        }
    }

    /// Comma-separated arguments; the opening `(` has been consumed.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, CoreError> {
        let mut arguments = Vec::new();
        if !self.peek(&[&")"]) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.matches(&[&","]) {
                    break;
                }
            }
        }
        self.expect(")", "expected ')' after arguments")?;
        Ok(arguments)
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String, CoreError> {
        if !self.peek(&[&TokenKind::Identifier]) {
            return Err(self.error(message));
        }
        let token = &self.tokens[self.index];
        if token.literal.starts_with(|ch: char| ch.is_ascii_digit()) {
            return Err(CoreError::parse(token.index, "identifier starts with a digit"));
        }
        self.index += 1;
        Ok(token.literal.clone())
    }

    fn expect(&mut self, literal: &str, message: &str) -> Result<(), CoreError> {
        if self.matches(&[&literal]) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    /// True when the next tokens match `patterns` one for one.
    fn peek(&self, patterns: &[&dyn TokenPattern]) -> bool {
        patterns.iter().enumerate().all(|(offset, pattern)| {
            self.tokens
                .get(self.index + offset)
                .is_some_and(|token| pattern.accepts(token))
        })
    }

    /// Like `peek`, advancing past the matched tokens only on a full match.
    fn matches(&mut self, patterns: &[&dyn TokenPattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            self.index += patterns.len();
        }
        matched
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.tokens.len()
    }

    fn previous(&self) -> &'t Token {
        &self.tokens[self.index - 1]
    }

    /// Error at the current token, or just past the last token when the
    /// stream is exhausted.
    fn error(&self, message: impl Into<String>) -> CoreError {
        let index = match self.tokens.get(self.index) {
            Some(token) => token.index,
            None => self.tokens.last().map_or(0, Token::end),
        };
        CoreError::parse(index, message)
    }
}

fn strip_quotes(literal: &str) -> &str {
    &literal[1..literal.len() - 1]
}

/// Replace the escape sequences the lexer admits with the characters they
/// stand for.
pub fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('b') => result.push('\u{8}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}
