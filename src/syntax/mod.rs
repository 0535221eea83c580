//! Lexer, parser, and AST for the source language.
//!
//! The front end is deliberately resilient: [`parser::parse_file`] always
//! returns a syntax tree, accumulating errors instead of failing, because
//! editor requests arrive against half-typed sources.

pub mod ast;
pub mod parser;
pub mod token;
pub mod walk;

pub use ast::*;
pub use parser::{parse_file, ParseError};
pub use walk::{enclosing_path, Node};
