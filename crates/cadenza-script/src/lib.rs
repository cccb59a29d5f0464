//! Script language and runtime for building cadenza patterns.
//!
//! The crate provides a hand-rolled lexer and recursive-descent parser for a
//! small expression language (arrow functions, object/array literals,
//! imports), a tree-walking interpreter with lexical scoping, and the native
//! bindings that turn script calls into [`cadenza_core::Pattern`] values.
//!
//! # Examples
//!
//! ```
//! use cadenza_core::{Fraction, QueryContext};
//! use cadenza_script::{bindings, Engine};
//!
//! let mut engine = Engine::with_defaults();
//! let result = engine.eval(r#"seq("bd", "sd").fast(2)"#).unwrap();
//! let pattern = bindings::as_pattern(&result).unwrap();
//! let events = pattern.query_arc(Fraction::ZERO, Fraction::ONE, &QueryContext::new());
//! assert_eq!(events.len(), 4);
//! ```

pub mod ast;
pub mod bindings;
pub mod engine;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod stdlib;
pub mod value;

#[cfg(test)]
mod runtime_tests;

pub use ast::{ArrowBody, BinaryOp, Expr, ImportSpec, Program, Stmt, UnaryOp};
pub use engine::{Engine, Library, LibraryBuilder};
pub use error::{ParseError, RuntimeError, ScriptError};
pub use lexer::{Lexer, Token};
pub use parser::{parse, Parser};
pub use span::Pos;
pub use value::{Arity, Value};
