//! The front-end: expression tokenizing/parsing and statement-line parsing.

pub mod expr;
pub mod source;

pub use expr::{tokenize_expression, BinOp, ExprError, Token};
pub use source::{parse_line, Comparison, LineError, SourceLine, Stmt};
