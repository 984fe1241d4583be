use thiserror::Error;

/// Error raised by any stage of the pipeline.
///
/// Every stage is terminal on its first failure: lexing and parsing report
/// the offending source offset, analysis and interpretation report a
/// description of the violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("lex error at byte {index}: {message}")]
    LexError { index: usize, message: String },
    #[error("parse error at byte {index}: {message}")]
    ParseError { index: usize, message: String },
    #[error("type error: {0}")]
    TypeError(String),
    #[error("runtime error: {0}")]
    RuntimeError(String),
}

impl CoreError {
    pub fn lex(index: usize, message: impl Into<String>) -> Self {
        CoreError::LexError {
            index,
            message: message.into(),
        }
    }

    pub fn parse(index: usize, message: impl Into<String>) -> Self {
        CoreError::ParseError {
            index,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        CoreError::TypeError(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        CoreError::RuntimeError(message.into())
    }

    /// Source offset carried by lex and parse errors.
    pub fn index(&self) -> Option<usize> {
        match self {
            CoreError::LexError { index, .. } | CoreError::ParseError { index, .. } => Some(*index),
            _ => None,
        }
    }
}
