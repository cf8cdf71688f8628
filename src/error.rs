//! Error types for the MML compiler and runtime

use thiserror::Error;

/// Result type for value engine and front-end operations
pub type MmlResult<T> = Result<T, MmlError>;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Result type for program execution
pub type RunResult<T> = Result<T, RuntimeError>;

/// Every failure the lexer, parser, generator or value engine can report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MmlError {
    #[error("Malformed matrix literal: {message}")]
    MalformedLiteral { message: String },

    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("Unbalanced braces")]
    UnbalancedBraces,

    #[error("Cannot resolve the number of arguments of '{name}'")]
    UnresolvedArity { name: String },

    #[error("Parser error: {message}")]
    ParseError { message: String },

    #[error("Shape mismatch in {op}: {lhs} and {rhs}")]
    ShapeMismatch { op: String, lhs: String, rhs: String },

    #[error("Cannot concatenate {lhs} with {rhs}")]
    IncompatibleConcat { lhs: String, rhs: String },

    #[error("Division by zero")]
    DivideByZero,

    #[error("{context} requires a scalar, got {shape}")]
    NonScalarContext { context: String, shape: String },

    #[error("Undeclared variable: {name}")]
    UndeclaredReference { name: String },

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl MmlError {
    pub fn parse_error(msg: impl Into<String>) -> Self {
        MmlError::ParseError { message: msg.into() }
    }

    pub fn malformed_literal(msg: impl Into<String>) -> Self {
        MmlError::MalformedLiteral { message: msg.into() }
    }

    pub fn undeclared(name: impl Into<String>) -> Self {
        MmlError::UndeclaredReference { name: name.into() }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        MmlError::InvalidArgument { message: msg.into() }
    }

    pub fn non_scalar(context: impl Into<String>, shape: impl ToString) -> Self {
        MmlError::NonScalarContext {
            context: context.into(),
            shape: shape.to_string(),
        }
    }

    pub fn shape_mismatch(op: impl Into<String>, lhs: impl ToString, rhs: impl ToString) -> Self {
        MmlError::ShapeMismatch {
            op: op.into(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    /// Attach the originating source line for compile-time reporting
    pub fn at_line(self, line: usize) -> CompileError {
        CompileError { line, cause: self }
    }
}

/// A front-end failure tagged with the source line it came from
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Compile error in line {line}: {cause}")]
pub struct CompileError {
    pub line: usize,
    #[source]
    pub cause: MmlError,
}

/// A failure raised while running a compiled program
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Runtime error in line {line}: {cause}")]
pub struct RuntimeError {
    pub line: usize,
    #[source]
    pub cause: MmlError,
}

/// Either stage failing, for callers that compile and run in one go
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
