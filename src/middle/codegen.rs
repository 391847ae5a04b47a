//! Expression code generation: walks a postfix token stream and emits
//! `load`/arithmetic/`store` instructions that evaluate it, materializing
//! intermediate results in the software-managed evaluation stack rather
//! than in a hardware stack the machine doesn't have.
//!
//! The caller always receives the final value's [`Operand`] location, not
//! a guarantee that it is already in the accumulator; a single-token
//! expression emits no code at all; the caller is responsible for a final
//! `load` if it needs the value in the accumulator.

use crate::front::expr::{BinOp, Token};
use crate::middle::pending::{Operand, PendingInstruction};
use crate::middle::symtab::{SymbolError, SymbolTable};
use crate::word::{Opcode, MEMORY_SIZE};
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CodegenError {
    #[display("expression is malformed: operand stack did not reduce to one value")]
    MalformedExpression,
    #[display("{_0}")]
    Symbol(SymbolError),
}

impl std::error::Error for CodegenError {}

impl From<SymbolError> for CodegenError {
    fn from(e: SymbolError) -> Self {
        CodegenError::Symbol(e)
    }
}

fn opcode_for(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Subtract,
        BinOp::Mul => Opcode::Multiply,
        BinOp::Div => Opcode::Divide,
        BinOp::Rem => Opcode::Remainder,
        BinOp::Pow => Opcode::Power,
    }
}

/// Compile a postfix token stream into code, returning where the final
/// result ends up (a symbol address if the expression was a bare
/// variable/constant, or a stack slot if any arithmetic happened).
pub fn compile_postfix(
    tokens: &[Token],
    symtab: &mut SymbolTable,
) -> Result<(Vec<PendingInstruction>, Operand), CodegenError> {
    let mut code = Vec::new();
    let mut locations: Vec<Operand> = Vec::new();
    let mut depth: usize = 0;
    let mut max_depth: usize = 0;

    for token in tokens {
        match token {
            Token::Number(value) => {
                let sym = symtab.search_or_add_const(*value)?;
                locations.push(Operand::Data(sym.address));
            }
            Token::Var(name) => {
                let sym = symtab.search_or_add_var(*name)?;
                locations.push(Operand::Data(sym.address));
            }
            Token::Op(op) => {
                let rhs = locations.pop().ok_or(CodegenError::MalformedExpression)?;
                let lhs = locations.pop().ok_or(CodegenError::MalformedExpression)?;
                code.push(PendingInstruction::new(Opcode::Load, lhs));
                code.push(PendingInstruction::new(opcode_for(*op), rhs));
                let slot = Operand::StackSlot(depth);
                code.push(PendingInstruction::new(Opcode::Store, slot));
                depth += 1;
                max_depth = max_depth.max(depth);
                locations.push(slot);
            }
        }
    }

    let result = locations.pop().ok_or(CodegenError::MalformedExpression)?;
    if !locations.is_empty() {
        return Err(CodegenError::MalformedExpression);
    }

    if max_depth > 0 {
        let floor = (MEMORY_SIZE - max_depth) as u16;
        symtab.note_stack_depth(floor)?;
    }

    Ok((code, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Id;

    fn var(name: &str) -> Token {
        Token::Var(Id::from(name.to_string()))
    }

    #[test]
    fn bare_variable_emits_no_code() {
        let mut symtab = SymbolTable::new();
        let (code, result) = compile_postfix(&[var("x")], &mut symtab).unwrap();
        assert!(code.is_empty());
        match result {
            Operand::Data(_) => {}
            other => panic!("expected a data-region operand, got {other:?}"),
        }
    }

    #[test]
    fn single_operator_emits_load_op_store() {
        let mut symtab = SymbolTable::new();
        let tokens = [var("a"), var("b"), Token::Op(BinOp::Add)];
        let (code, result) = compile_postfix(&tokens, &mut symtab).unwrap();
        assert_eq!(code.len(), 3);
        assert_eq!(code[0].opcode, Opcode::Load);
        assert_eq!(code[1].opcode, Opcode::Add);
        assert_eq!(code[2].opcode, Opcode::Store);
        assert_eq!(result, Operand::StackSlot(0));
    }

    #[test]
    fn nested_expression_reuses_growing_stack_slots() {
        let mut symtab = SymbolTable::new();
        // (a+b)*c -> depth 0 used for a+b, depth 1 used for the product
        let tokens = [var("a"), var("b"), Token::Op(BinOp::Add), var("c"), Token::Op(BinOp::Mul)];
        let (_, result) = compile_postfix(&tokens, &mut symtab).unwrap();
        assert_eq!(result, Operand::StackSlot(1));
    }

    #[test]
    fn malformed_postfix_is_rejected() {
        let tokens = [var("a"), Token::Op(BinOp::Add)];
        let mut symtab = SymbolTable::new();
        assert_eq!(compile_postfix(&tokens, &mut symtab).unwrap_err(), CodegenError::MalformedExpression);
    }
}
