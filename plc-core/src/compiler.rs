use std::io::Write;

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::ast::Source;
use crate::builtins::{self, BuiltinDescriptor};
use crate::codegen_java;
use crate::error::CoreError;
use crate::interpreter::Interpreter;
use crate::lexer::{Token, lex};
use crate::parser::parse;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifact {
    pub java: String,
    /// Host builtins the program calls.
    pub builtins: Vec<&'static BuiltinDescriptor>,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, CoreError> {
    lex(source)
}

pub fn parse_source(source: &str) -> Result<Source, CoreError> {
    parse(&lex(source)?)
}

/// Lex, parse and analyze `source`, returning the annotated tree.
pub fn analyze_source(source: &str) -> Result<Source, CoreError> {
    let mut program = parse_source(source)?;
    Analyzer::new(None)?.analyze(&mut program)?;
    Ok(program)
}

pub fn compile_java(source: &str) -> Result<CompilationArtifact, CoreError> {
    let program = analyze_source(source)?;
    let builtins = builtins::collect_builtins(&program);
    debug!(builtins = builtins.len(), "compiling to java");
    Ok(CompilationArtifact {
        java: codegen_java::generate(&program),
        builtins,
    })
}

/// Analyze and interpret `source`; `print` output goes to `out`. Returns the
/// value of `main()`.
pub fn run_source(source: &str, out: impl Write) -> Result<Value, CoreError> {
    let program = analyze_source(source)?;
    Interpreter::new(None, out)?.interpret(&program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltinKind;

    #[test]
    fn scenario_field_returned_from_main() {
        let source = "LET x: Integer = 5; DEF main(): Integer DO RETURN x; END";

        let mut out = Vec::new();
        assert_eq!(run_source(source, &mut out), Ok(Value::from(5)));
        assert!(out.is_empty());

        let artifact = compile_java(source).expect("compile");
        assert!(artifact.java.contains("\n    int x = 5;\n"));
        assert!(artifact.java.contains("System.exit(new Main().main());"));
        assert!(artifact.java.contains("\n    int main() {\n        return x;\n    }\n"));
        assert!(artifact.builtins.is_empty());
    }

    #[test]
    fn scenario_print_in_branch() {
        let source = "DEF main(): Integer DO IF TRUE DO print(\"hi\"); END RETURN 0; END";

        let mut out = Vec::new();
        assert_eq!(run_source(source, &mut out), Ok(Value::from(0)));
        assert_eq!(String::from_utf8(out).unwrap(), "hi\n");

        let artifact = compile_java(source).expect("compile");
        assert_eq!(artifact.builtins.len(), 1);
        assert_eq!(artifact.builtins[0].kind, BuiltinKind::Print);
    }

    #[test]
    fn scenario_missing_field_type() {
        let err = compile_java("LET x = 5;").unwrap_err();
        assert!(matches!(err, CoreError::ParseError { index: 6, .. }));
    }

    #[test]
    fn scenario_division_by_zero_is_a_runtime_error() {
        let source = "DEF main(): Integer DO RETURN 1 / 0; END";
        analyze_source(source).expect("analysis accepts division by zero");
        compile_java(source).expect("generation accepts division by zero");

        let err = run_source(source, Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::RuntimeError(_)));
    }

    #[test]
    fn integer_literals_round_trip_up_to_32_bits() {
        for value in [0i64, 1, -1, 42, 2_147_483_647, -2_147_483_648] {
            let source = format!("DEF main(): Integer DO RETURN {value}; END");
            assert_eq!(run_source(&source, Vec::new()), Ok(Value::from(value)));
        }
        for value in [2_147_483_648i64, -2_147_483_649] {
            let source = format!("DEF main(): Integer DO RETURN {value}; END");
            assert!(parse_source(&source).is_ok());
            assert!(matches!(
                analyze_source(&source),
                Err(CoreError::TypeError(_))
            ));
        }
    }

    #[test]
    fn stage_errors_surface_unchanged() {
        assert!(matches!(tokenize("\"open"), Err(CoreError::LexError { index: 5, .. })));
        assert!(matches!(
            compile_java("DEF main(): Integer DO RETURN TRUE; END"),
            Err(CoreError::TypeError(_))
        ));
    }
}
