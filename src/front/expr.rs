//! Expression tokenizing: raw text to a postfix token stream.
//!
//! Splits an expression into operators, identifiers and integer literals,
//! rewrites unary `+`/`-` into a multiplication by `-1`/`1`, then runs the
//! shunting-yard algorithm to produce postfix order. The statement compiler
//! (`middle::codegen`) walks the postfix stream directly; it never sees
//! parentheses or precedence.

use crate::common::{self, Id};
use derive_more::Display;

/// A binary arithmetic operator, in the source's surface syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum BinOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Rem,
    #[display("^")]
    Pow,
}

impl BinOp {
    fn from_char(c: char) -> Option<BinOp> {
        Some(match c {
            '+' => BinOp::Add,
            '-' => BinOp::Sub,
            '*' => BinOp::Mul,
            '/' => BinOp::Div,
            '%' => BinOp::Rem,
            '^' => BinOp::Pow,
            _ => return None,
        })
    }

    /// Higher binds tighter. `^` alone is right-associative.
    fn precedence(self) -> u8 {
        match self {
            BinOp::Pow => 3,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 2,
            BinOp::Add | BinOp::Sub => 1,
        }
    }

    fn is_right_associative(self) -> bool {
        matches!(self, BinOp::Pow)
    }
}

/// One element of a postfix expression: a value to push, or an operator to
/// apply to the top two values on the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Number(i32),
    Var(Id),
    Op(BinOp),
}

/// A raw, not-yet-classified lexeme read from the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Lexeme {
    Word(String),
    Op(char),
    LParen,
    RParen,
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[display("empty expression")]
    Empty,
    #[display("unmatched parenthesis")]
    UnmatchedParen,
    #[display("'{_0}' is not a valid identifier or integer")]
    BadOperand(String),
    #[display("expression has a missing or misplaced operand")]
    DanglingOperator,
    #[display("expression has a stray operand with no operator")]
    DanglingOperand,
}

impl std::error::Error for ExprError {}

/// Split `src` into raw lexemes: runs of identifier/digit characters are one
/// [`Lexeme::Word`], and each of `+-*/%^()` is its own lexeme.
fn lex(src: &str) -> Vec<Lexeme> {
    let mut out = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '(' {
            out.push(Lexeme::LParen);
            chars.next();
        } else if c == ')' {
            out.push(Lexeme::RParen);
            chars.next();
        } else if "+-*/%^".contains(c) {
            out.push(Lexeme::Op(c));
            chars.next();
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' || "+-*/%^".contains(c) {
                    break;
                }
                word.push(c);
                chars.next();
            }
            out.push(Lexeme::Word(word));
        }
    }
    out
}

/// Does an operator at this position act as a binary operator (following a
/// value) rather than a unary sign (leading, or following another operator
/// or an open paren)?
fn is_binary_position(prev: Option<&Lexeme>) -> bool {
    matches!(prev, Some(Lexeme::Word(_)) | Some(Lexeme::RParen))
}

/// Rewrite a leading/unary `-x` as `(-1) * x` and a unary `+x` as just `x`,
/// leaving binary occurrences untouched. Mirrors the original's sign
/// handling without its reliance on scanning raw characters.
fn rewrite_unary(lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let mut out = Vec::with_capacity(lexemes.len());
    let mut prev: Option<Lexeme> = None;
    for lex in lexemes {
        match &lex {
            Lexeme::Op('-') if !is_binary_position(prev.as_ref()) => {
                out.push(Lexeme::Word("-1".to_string()));
                out.push(Lexeme::Op('*'));
            }
            Lexeme::Op('+') if !is_binary_position(prev.as_ref()) => {
                // unary plus contributes nothing
            }
            _ => out.push(lex.clone()),
        }
        prev = Some(lex);
    }
    out
}

fn operand_token(word: &str) -> Result<Token, ExprError> {
    if common::is_integer(word) {
        let value: i32 = word.parse().map_err(|_| ExprError::BadOperand(word.to_string()))?;
        Ok(Token::Number(value))
    } else if common::is_identifier(word) {
        Ok(Token::Var(Id::from(word.to_string())))
    } else {
        Err(ExprError::BadOperand(word.to_string()))
    }
}

/// Tokenize and reorder `src` into postfix, applying the shunting-yard
/// algorithm with `^` right-associative and binding tighter than `* / %`,
/// which in turn bind tighter than `+ -`.
pub fn tokenize_expression(src: &str) -> Result<Vec<Token>, ExprError> {
    let lexemes = rewrite_unary(lex(src));
    if lexemes.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut output = Vec::new();
    let mut operators: Vec<Lexeme> = Vec::new();

    for lexeme in lexemes {
        match lexeme {
            Lexeme::Word(ref word) => output.push(operand_token(word)?),
            Lexeme::Op(c) => {
                let op = BinOp::from_char(c).expect("lex only emits known operator chars");
                while let Some(Lexeme::Op(top)) = operators.last() {
                    let top_op = BinOp::from_char(*top).unwrap();
                    let pops = top_op.precedence() > op.precedence()
                        || (top_op.precedence() == op.precedence() && !op.is_right_associative());
                    if !pops {
                        break;
                    }
                    output.push(Token::Op(top_op));
                    operators.pop();
                }
                operators.push(Lexeme::Op(c));
            }
            Lexeme::LParen => operators.push(Lexeme::LParen),
            Lexeme::RParen => {
                loop {
                    match operators.pop() {
                        Some(Lexeme::LParen) => break,
                        Some(Lexeme::Op(c)) => output.push(Token::Op(BinOp::from_char(c).unwrap())),
                        _ => return Err(ExprError::UnmatchedParen),
                    }
                }
            }
        }
    }
    while let Some(top) = operators.pop() {
        match top {
            Lexeme::Op(c) => output.push(Token::Op(BinOp::from_char(c).unwrap())),
            Lexeme::LParen => return Err(ExprError::UnmatchedParen),
            Lexeme::RParen => unreachable!("never pushed onto the operator stack"),
        }
    }

    validate_postfix(&output)?;
    Ok(output)
}

/// A well-formed postfix stream never lets the running operand count drop to
/// zero or below before an operator, and ends with exactly one value left.
fn validate_postfix(tokens: &[Token]) -> Result<(), ExprError> {
    let mut depth: i32 = 0;
    for token in tokens {
        match token {
            Token::Number(_) | Token::Var(_) => depth += 1,
            Token::Op(_) => {
                depth -= 1;
                if depth < 1 {
                    return Err(ExprError::DanglingOperator);
                }
            }
        }
    }
    if depth != 1 {
        return Err(ExprError::DanglingOperand);
    }
    Ok(())
}
