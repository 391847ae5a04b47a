//! The middle end: symbol table, expression code generation, and the
//! statement compiler that ties the front end's parsed lines together into
//! a linked memory image.

pub mod codegen;
pub mod compiler;
pub mod pending;
pub mod symtab;

pub use compiler::{CompileError, Compiler};
pub use pending::{Operand, PendingInstruction};
pub use symtab::{Kind, Symbol, SymbolError, SymbolTable};
