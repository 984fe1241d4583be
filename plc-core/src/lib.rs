//! Core toolchain for the PLC language.
//!
//! The pipeline is:
//!
//!   source text
//!     -> lexer        (tokens)
//!     -> parser       (Source AST)
//!     -> analyzer     (names resolved, types checked, AST annotated)
//!     -> interpreter  (runs main/0)  or  codegen_java (Java source)
//!
//! Higher-level tools (the CLI, embedders) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, scopes, analysis
// ---------------------------------------------------------------------

pub mod types;
pub mod environment;
pub mod analyzer;

// ---------------------------------------------------------------------
// Builtins and runtime
// ---------------------------------------------------------------------

pub mod builtins;
pub mod value;
pub mod interpreter;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_java;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{
    CompilationArtifact, analyze_source, compile_java, parse_source, run_source, tokenize,
};
pub use error::CoreError;
pub use value::Value;
