//! # Enso Parser
//!
//! Lossless parser for the Enso subset handled by the sync core. The result is
//! a span-annotated concrete tree ([`Tree`]) that reproduces the input exactly
//! when printed; malformed input is kept in `Invalid` trees.

pub mod cache;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use cache::ParseCache;
pub use error::{ParseError, ParseResult};
pub use lexer::lex;
pub use parser::{parse_block, parse_expression, parse_module, Parser};
pub use tree::{Item, Span, Token, TokenKind, Tree, TreeKind};
