use crate::span::Pos;
use thiserror::Error;

/// Lexing or parsing failure, with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        ParseError {
            message: message.into(),
            line: pos.line,
            column: pos.column,
        }
    }
}

/// Script evaluation failures. Each kind is distinct; none shares a
/// representation with the parse error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Undefined identifier, or an attempt to re-declare a `const`.
    #[error("name error: {0}")]
    Name(String),

    /// A native called with the wrong number or kind of arguments.
    #[error("argument error in {function}: expected {expected}, got {actual}")]
    Argument {
        function: String,
        expected: String,
        actual: String,
    },

    /// Method lookup failed on a native object, or a value refused a cast.
    #[error("type error: {0}")]
    Type(String),

    /// The library loader does not know the requested name.
    #[error("import error: no library named \"{0}\"")]
    Import(String),

    /// Rational arithmetic failed inside a native binding.
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] cadenza_core::ArithmeticError),
}

impl RuntimeError {
    pub fn argument(
        function: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        RuntimeError::Argument {
            function: function.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Anything a script run can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
