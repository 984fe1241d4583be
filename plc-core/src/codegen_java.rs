//! Java source generation from an analyzed PLC program.
//!
//! The output layout is exact: one `Main` class, fields first, then the
//! `main(String[])` entry block, then each method, with four-space
//! indentation. Names come from the analyzer's bindings where present and
//! fall back to the source text otherwise, so unannotated trees still
//! render.

use tracing::debug;

use crate::ast::{BinaryOp, Declaration, Expr, ExprKind, Field, Literal, Method, Source, Stmt};
use crate::types::BUILTIN_TYPES;

const INDENT: &str = "    ";

pub fn generate(source: &Source) -> String {
    let mut generator = Generator::new();
    generator.generate_source(source);
    let java = generator.finish();
    debug!(bytes = java.len(), "generated java");
    java
}

pub struct Generator {
    indent: usize,
    out: String,
}

impl Generator {
    pub fn new() -> Self {
        Generator {
            indent: 0,
            out: String::new(),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn generate_source(&mut self, source: &Source) {
        self.emit("public class Main {");
        self.emit("\n");
        self.indent += 1;

        for field in &source.fields {
            self.newline();
            self.generate_field(field);
        }
        if !source.fields.is_empty() {
            self.emit("\n");
        }

        self.newline();
        self.emit("public static void main(String[] args) {");
        self.indent += 1;
        self.newline();
        self.emit("System.exit(new Main().main());");
        self.indent -= 1;
        self.newline();
        self.emit("}");

        for method in &source.methods {
            self.emit("\n");
            self.newline();
            self.generate_method(method);
        }

        self.indent -= 1;
        self.emit("\n\n}");
    }

    fn generate_field(&mut self, field: &Field) {
        let type_name = match &field.variable {
            Some(variable) => variable.ty.render_name().to_string(),
            None => render_type_name(&field.type_name),
        };
        let name = field
            .variable
            .as_ref()
            .map_or(field.name.as_str(), |variable| variable.render_name.as_str());
        self.generate_variable(&type_name, name, field.value.as_ref());
    }

    fn generate_method(&mut self, method: &Method) {
        let (return_type, parameter_types, name) = match &method.function {
            Some(function) => (
                function.return_type.render_name().to_string(),
                function
                    .parameter_types
                    .iter()
                    .map(|ty| ty.render_name().to_string())
                    .collect::<Vec<_>>(),
                function.render_name.as_str(),
            ),
            None => (
                method
                    .return_type_name
                    .as_deref()
                    .map_or_else(|| "Void".to_string(), render_type_name),
                method
                    .parameter_type_names
                    .iter()
                    .map(|name| render_type_name(name))
                    .collect(),
                method.name.as_str(),
            ),
        };

        self.emit(&return_type);
        self.emit(" ");
        self.emit(name);
        self.emit("(");
        for (index, (parameter, ty)) in method.parameters.iter().zip(&parameter_types).enumerate() {
            if index > 0 {
                self.emit(", ");
            }
            self.emit(ty);
            self.emit(" ");
            self.emit(parameter);
        }
        self.emit(") ");
        self.generate_block(&method.statements);
    }

    /// `{` + one indented line per statement + `}`; `{}` when empty.
    fn generate_block(&mut self, statements: &[Stmt]) {
        if statements.is_empty() {
            self.emit("{}");
            return;
        }
        self.emit("{");
        self.indent += 1;
        for statement in statements {
            self.newline();
            self.generate_statement(statement);
        }
        self.indent -= 1;
        self.newline();
        self.emit("}");
    }

    fn generate_statement(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Expression(expr) => {
                self.generate_expr(expr);
                self.emit(";");
            }
            Stmt::Declaration(declaration) => self.generate_declaration(declaration),
            Stmt::Assignment { receiver, value } => {
                self.generate_expr(receiver);
                self.emit(" = ");
                self.generate_expr(value);
                self.emit(";");
            }
            Stmt::If {
                condition,
                then_statements,
                else_statements,
            } => {
                self.emit("if (");
                self.generate_expr(condition);
                self.emit(") ");
                self.generate_block(then_statements);
                if !else_statements.is_empty() {
                    self.emit(" else ");
                    self.generate_block(else_statements);
                }
            }
            Stmt::For {
                name,
                value,
                statements,
            } => {
                self.emit("for (int ");
                self.emit(name);
                self.emit(" : ");
                self.generate_expr(value);
                self.emit(") ");
                self.generate_block(statements);
            }
            Stmt::While {
                condition,
                statements,
            } => {
                self.emit("while (");
                self.generate_expr(condition);
                self.emit(") ");
                self.generate_block(statements);
            }
            Stmt::Return(value) => {
                self.emit("return ");
                self.generate_expr(value);
                self.emit(";");
            }
        }
    }

    fn generate_declaration(&mut self, declaration: &Declaration) {
        let type_name = match (&declaration.variable, &declaration.type_name) {
            (Some(variable), _) => variable.ty.render_name().to_string(),
            (None, Some(type_name)) => render_type_name(type_name),
            (None, None) => "var".to_string(),
        };
        let name = declaration
            .variable
            .as_ref()
            .map_or(declaration.name.as_str(), |variable| {
                variable.render_name.as_str()
            });
        self.generate_variable(&type_name, name, declaration.value.as_ref());
    }

    /// `<type> <name>[ = <value>];`
    fn generate_variable(&mut self, type_name: &str, name: &str, value: Option<&Expr>) {
        self.emit(type_name);
        self.emit(" ");
        self.emit(name);
        if let Some(value) = value {
            self.emit(" = ");
            self.generate_expr(value);
        }
        self.emit(";");
    }

    fn generate_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(literal) => self.generate_literal(literal),
            ExprKind::Group(inner) => {
                self.emit("(");
                self.generate_expr(inner);
                self.emit(")");
            }
            ExprKind::Binary {
                operator,
                left,
                right,
            } => {
                self.generate_expr(left);
                self.emit(" ");
                self.emit(match operator {
                    BinaryOp::And => "&&",
                    BinaryOp::Or => "||",
                    other => other.symbol(),
                });
                self.emit(" ");
                self.generate_expr(right);
            }
            ExprKind::Access(access) => {
                if let Some(receiver) = &access.receiver {
                    self.generate_expr(receiver);
                    self.emit(".");
                }
                let name = access
                    .variable
                    .as_ref()
                    .map_or(access.name.as_str(), |variable| variable.render_name.as_str());
                self.emit(name);
            }
            ExprKind::Function(call) => {
                if let Some(receiver) = &call.receiver {
                    self.generate_expr(receiver);
                    self.emit(".");
                }
                let name = call
                    .function
                    .as_ref()
                    .map_or(call.name.as_str(), |function| function.render_name.as_str());
                self.emit(name);
                self.emit("(");
                for (index, argument) in call.arguments.iter().enumerate() {
                    if index > 0 {
                        self.emit(", ");
                    }
                    self.generate_expr(argument);
                }
                self.emit(")");
            }
        }
    }

    fn generate_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Nil => self.emit("null"),
            Literal::Boolean(value) => self.emit(if *value { "true" } else { "false" }),
            Literal::Integer(value) => self.emit(&value.to_string()),
            Literal::Decimal(value) => self.emit(&value.to_string()),
            Literal::Character(value) => {
                self.emit("'");
                self.emit(&escape(&value.to_string(), '\''));
                self.emit("'");
            }
            Literal::String(value) => {
                self.emit("\"");
                self.emit(&escape(value, '"'));
                self.emit("\"");
            }
        }
    }

    fn emit(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Start a new line at the current indentation.
    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

/// Render name of a built-in type written in source, or the name itself.
fn render_type_name(name: &str) -> String {
    BUILTIN_TYPES
        .iter()
        .find(|ty| ty.name() == name)
        .map_or(name, |ty| ty.render_name())
        .to_string()
}

/// Inverse of the parser's unescaping for a literal delimited by `quote`.
fn escape(text: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{8}' => escaped.push_str("\\b"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\\' => escaped.push_str("\\\\"),
            ch if ch == quote => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ch => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::lexer::{TokenKind, lex};
    use crate::parser::parse;

    fn generate_text(input: &str) -> String {
        let mut source = parse(&lex(input).expect("lex")).expect("parse");
        Analyzer::new(None)
            .expect("analyzer")
            .analyze(&mut source)
            .expect("analyze");
        generate(&source)
    }

    #[test]
    fn renders_field_entry_block_and_method() {
        assert_eq!(
            generate_text("LET x: Integer = 5; DEF main(): Integer DO RETURN x; END"),
            "public class Main {\n\
             \n    int x = 5;\n\
             \n    public static void main(String[] args) {\n\
             \x20       System.exit(new Main().main());\n\
             \x20   }\n\
             \n    int main() {\n\
             \x20       return x;\n\
             \x20   }\n\
             \n}"
        );
    }

    #[test]
    fn renders_without_fields() {
        assert_eq!(
            generate_text("DEF main(): Integer DO IF TRUE DO print(\"hi\"); END RETURN 0; END"),
            [
                "public class Main {",
                "",
                "    public static void main(String[] args) {",
                "        System.exit(new Main().main());",
                "    }",
                "",
                "    int main() {",
                "        if (true) {",
                "            System.out.println(\"hi\");",
                "        }",
                "        return 0;",
                "    }",
                "",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn renders_statements() {
        let java = generate_text(
            "LET name: String; LET ratio: Decimal = 0.5; \
             DEF area(w: Decimal, h: Decimal): Decimal DO RETURN w * h; END \
             DEF loop(xs: IntegerIterable) DO \
                LET total: Comparable = 0; \
                LET flag = TRUE OR FALSE AND TRUE; \
                FOR x IN xs DO print(x); END \
                WHILE flag DO flag = FALSE; END \
                IF flag DO print(NIL); ELSE print('c'); END \
                WHILE FALSE DO END \
             END \
             DEF main(): Integer DO RETURN (1 + 2) * 3; END",
        );
        assert_eq!(
            java,
            [
                "public class Main {",
                "",
                "    String name;",
                "    double ratio = 0.5;",
                "",
                "    public static void main(String[] args) {",
                "        System.exit(new Main().main());",
                "    }",
                "",
                "    double area(double w, double h) {",
                "        return w * h;",
                "    }",
                "",
                "    Void loop(Iterable<Integer> xs) {",
                "        Comparable total = 0;",
                "        boolean flag = true || false && true;",
                "        for (int x : xs) {",
                "            System.out.println(x);",
                "        }",
                "        while (flag) {",
                "            flag = false;",
                "        }",
                "        if (flag) {",
                "            System.out.println(null);",
                "        } else {",
                "            System.out.println('c');",
                "        }",
                "        while (false) {}",
                "    }",
                "",
                "    int main() {",
                "        return (1 + 2) * 3;",
                "    }",
                "",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn empty_method_body_closes_inline() {
        let source = parse(&lex("DEF noop() DO END").expect("lex")).expect("parse");
        assert!(generate(&source).contains("\n    Void noop() {}\n\n}"));
    }

    #[test]
    fn unanalyzed_trees_fall_back_to_source_names() {
        let source = parse(
            &lex("LET n: Integer = 1; DEF main(): Integer DO LET s: String = \"a\"; print(n); RETURN n; END")
                .expect("lex"),
        )
        .expect("parse");
        let java = generate(&source);
        assert!(java.contains("    int n = 1;\n"));
        assert!(java.contains("        String s = \"a\";\n"));
        assert!(java.contains("        print(n);\n"));
    }

    #[test]
    fn raw_newlines_in_strings_render_escaped() {
        let java = generate_text("DEF main(): Integer DO print(\"two\nlines\"); RETURN 0; END");
        assert!(java.contains("        System.out.println(\"two\\nlines\");\n"));
    }

    #[test]
    fn literal_escapes_round_trip_through_the_lexer() {
        let input = r#"DEF main(): Integer DO print("a\b\n\r\t\'\"\\z"); print('\''); print('\\'); RETURN 0; END"#;
        let original = parse(&lex(input).expect("lex")).expect("parse");
        let java = generate_text(input);

        let rendered: Vec<_> = lex(&java)
            .expect("generated literals lex")
            .into_iter()
            .filter(|token| matches!(token.kind, TokenKind::String | TokenKind::Character))
            .collect();
        assert_eq!(rendered.len(), 3);

        let reparsed = parse(
            &lex(&format!(
                "DEF main(): Integer DO print({}); print({}); print({}); RETURN 0; END",
                rendered[0].literal, rendered[1].literal, rendered[2].literal
            ))
            .expect("lex"),
        )
        .expect("parse");
        assert_eq!(reparsed, original);
    }
}
