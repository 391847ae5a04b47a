//! Statement-line parsing: one line of line-numbered source to a [`Stmt`].
//!
//! Each physical line is `<line number> <keyword> <rest...>`. Keyword
//! dispatch and per-keyword parsing mirror the original compiler's
//! `parse_line`/`parse_*` family, but word-boundary matching replaces the
//! original's raw `strstr` substring search for `goto`/`to`/`step` so that,
//! say, a variable named `stop` can't be mistaken for the keyword `to`.

use crate::common::{self, Id};
use crate::front::expr::{tokenize_expression, ExprError, Token};
use derive_more::Display;

/// A relational operator appearing in an `if`. Tried in this exact order
/// during parsing (`<=`/`>=` before `<`/`>`) so that the two-character forms
/// are never mis-split into a single-character comparison plus garbage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Comparison {
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
}

impl Comparison {
    const ORDER: [(&'static str, Comparison); 6] = [
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
    ];
}

/// A `for` loop bound: either a literal integer or a variable to load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForBound {
    Number(i32),
    Var(Id),
}

/// One item in a `print` list: a bare variable or a full expression.
pub type PrintItem = Vec<Token>;

/// One parsed statement, independent of its line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    Rem,
    Input(Vec<Id>),
    Let(Id, Vec<Token>),
    Print(Vec<PrintItem>),
    Goto(u32),
    If {
        lhs: Vec<Token>,
        cmp: Comparison,
        rhs: Vec<Token>,
        target: u32,
    },
    For {
        var: Id,
        start: ForBound,
        end: ForBound,
        step: Option<ForBound>,
    },
    Next(Option<Id>),
    End,
}

/// A fully parsed source line: its number and its statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub number: u32,
    pub stmt: Stmt,
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum LineError {
    #[display("line is empty")]
    Empty,
    #[display("line does not start with a line number")]
    MissingLineNumber,
    #[display("line number {_0} is out of range")]
    LineNumberOutOfRange(String),
    #[display("line has no statement after the line number")]
    MissingStatement,
    #[display("'{_0}' is not a recognized statement keyword")]
    UnknownKeyword(String),
    #[display("'{_0}' is not a valid identifier")]
    BadIdentifier(String),
    #[display("'{_0}' is not a valid integer or identifier")]
    BadBound(String),
    #[display("expected '=' in a let statement")]
    MissingEquals,
    #[display("expected 'goto' followed by a line number")]
    MalformedGoto,
    #[display("expected 'to' in a for statement")]
    MissingTo,
    #[display("'{_0}' is not a valid target line number")]
    BadTargetLine(String),
    #[display("if statement has no recognized comparison operator")]
    MissingComparison,
    #[display("{_0}")]
    Expr(ExprError),
}

impl std::error::Error for LineError {}

impl From<ExprError> for LineError {
    fn from(e: ExprError) -> Self {
        LineError::Expr(e)
    }
}

fn parse_identifier(word: &str) -> Result<Id, LineError> {
    if common::is_identifier(word) {
        Ok(Id::from(word.to_string()))
    } else {
        Err(LineError::BadIdentifier(word.to_string()))
    }
}

fn parse_bound(word: &str) -> Result<ForBound, LineError> {
    if common::is_integer(word) {
        word.parse()
            .map(ForBound::Number)
            .map_err(|_| LineError::BadBound(word.to_string()))
    } else if common::is_identifier(word) {
        Ok(ForBound::Var(Id::from(word.to_string())))
    } else {
        Err(LineError::BadBound(word.to_string()))
    }
}

fn parse_line_number(word: &str) -> Result<u32, LineError> {
    word.parse().map_err(|_| LineError::LineNumberOutOfRange(word.to_string()))
}

/// Comma-separated identifier list, as used by `input` and the variable form
/// of `print`.
fn parse_id_list(rest: &str) -> Result<Vec<Id>, LineError> {
    rest.split(',').map(|w| parse_identifier(w.trim())).collect()
}

/// `let <id> = <expr>`
fn parse_let(rest: &str) -> Result<Stmt, LineError> {
    let (name, expr) = rest.split_once('=').ok_or(LineError::MissingEquals)?;
    let var = parse_identifier(name.trim())?;
    let tokens = tokenize_expression(expr.trim())?;
    Ok(Stmt::Let(var, tokens))
}

/// `print <expr> [, <expr>]*`
fn parse_print(rest: &str) -> Result<Stmt, LineError> {
    let items = rest
        .split(',')
        .map(|item| tokenize_expression(item.trim()).map_err(LineError::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stmt::Print(items))
}

/// `goto <line>`
fn parse_goto(rest: &str) -> Result<Stmt, LineError> {
    let target = rest.trim();
    if target.is_empty() {
        return Err(LineError::MalformedGoto);
    }
    target.parse().map(Stmt::Goto).map_err(|_| LineError::BadTargetLine(target.to_string()))
}

/// `next [id]` — the variable name is an optional assertion, not a required
/// token; a bare `next` just pops the innermost open `for`.
fn parse_next(rest: &str) -> Result<Stmt, LineError> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        Ok(Stmt::Next(None))
    } else {
        parse_identifier(trimmed).map(|id| Stmt::Next(Some(id)))
    }
}

/// `for <id> = <bound> to <bound> [step <bound>]`
///
/// `to`/`step` are matched as whole words (split on ASCII whitespace), never
/// as a substring, so an identifier that merely contains "to" is never
/// mistaken for the keyword.
fn parse_for(rest: &str) -> Result<Stmt, LineError> {
    let (head, after_eq) = rest.split_once('=').ok_or(LineError::MissingEquals)?;
    let var = parse_identifier(head.trim())?;

    let words: Vec<&str> = after_eq.split_whitespace().collect();
    let to_pos = words.iter().position(|w| w.eq_ignore_ascii_case("to")).ok_or(LineError::MissingTo)?;
    let start = parse_bound(&words[..to_pos].join(""))?;

    let step_pos = words.iter().position(|w| w.eq_ignore_ascii_case("step"));
    let end_words = &words[to_pos + 1..step_pos.unwrap_or(words.len())];
    let end = parse_bound(&end_words.join(""))?;

    let step = match step_pos {
        Some(pos) => Some(parse_bound(&words[pos + 1..].join(""))?),
        None => None,
    };

    Ok(Stmt::For { var, start, end, step })
}

/// `if <expr> <cmp> <expr> goto <line>`
///
/// Comparison operators are tried in [`Comparison::ORDER`] — the two
/// character forms first — so `<=` is never split into `<` followed by a
/// dangling `=`.
fn parse_if(rest: &str) -> Result<Stmt, LineError> {
    let (condition, goto_clause) =
        split_on_word(rest, "goto").ok_or(LineError::MalformedGoto)?;
    let target = parse_line_number(goto_clause.trim())?;

    let (op_str, cmp) = Comparison::ORDER
        .iter()
        .filter_map(|(s, c)| condition.find(*s).map(|pos| (pos, *s, *c)))
        .min_by_key(|(pos, _, _)| *pos)
        .map(|(_, s, c)| (s, c))
        .ok_or(LineError::MissingComparison)?;

    let (lhs_str, rhs_str) = condition.split_once(op_str).expect("operator located above");
    let lhs = tokenize_expression(lhs_str.trim())?;
    let rhs = tokenize_expression(rhs_str.trim())?;

    Ok(Stmt::If { lhs, cmp, rhs, target })
}

/// Find `keyword` as a whole word in `text` (case-insensitive), returning
/// the text before it and the text after it.
fn split_on_word<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let pos = words.iter().position(|w| w.eq_ignore_ascii_case(keyword))?;
    let before_end = text.find(words[pos])?;
    let after_start = before_end + words[pos].len();
    Some((&text[..before_end], &text[after_start..]))
}

/// Parse one physical line: `<number> <keyword> <rest>`.
pub fn parse_line(line: &str) -> Result<SourceLine, LineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(LineError::Empty);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let number_str = parts.next().ok_or(LineError::MissingLineNumber)?;
    let number = parse_line_number(number_str)?;
    let rest = parts.next().unwrap_or("").trim_start();
    if rest.is_empty() {
        return Err(LineError::MissingStatement);
    }

    let mut stmt_parts = rest.splitn(2, char::is_whitespace);
    let keyword = stmt_parts.next().unwrap_or("");
    let body = stmt_parts.next().unwrap_or("").trim();

    let stmt = match keyword.to_ascii_lowercase().as_str() {
        "rem" | "remark" => Stmt::Rem,
        "input" => Stmt::Input(parse_id_list(body)?),
        "let" => parse_let(body)?,
        "print" => parse_print(body)?,
        "goto" => parse_goto(body)?,
        "if" => parse_if(body)?,
        "for" => parse_for(body)?,
        "next" => parse_next(body)?,
        "end" => Stmt::End,
        other => return Err(LineError::UnknownKeyword(other.to_string())),
    };

    Ok(SourceLine { number, stmt })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::expr::BinOp;

    fn id(name: &str) -> Id {
        Id::from(name.to_string())
    }

    #[test]
    fn parses_let() {
        let line = parse_line("10 let x = a + 1").unwrap();
        assert_eq!(line.number, 10);
        assert_eq!(
            line.stmt,
            Stmt::Let(id("x"), vec![Token::Var(id("a")), Token::Number(1), Token::Op(BinOp::Add)])
        );
    }

    #[test]
    fn parses_input_list() {
        let line = parse_line("20 input a, b, c").unwrap();
        assert_eq!(line.stmt, Stmt::Input(vec![id("a"), id("b"), id("c")]));
    }

    #[test]
    fn parses_goto() {
        let line = parse_line("30 goto 10").unwrap();
        assert_eq!(line.stmt, Stmt::Goto(10));
    }

    #[test]
    fn parses_if_with_two_char_comparison_first() {
        let line = parse_line("40 if a <= b goto 10").unwrap();
        match line.stmt {
            Stmt::If { cmp, target, .. } => {
                assert_eq!(cmp, Comparison::Le);
                assert_eq!(target, 10);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_not_equal() {
        let line = parse_line("41 if a != b goto 10").unwrap();
        match line.stmt {
            Stmt::If { cmp, .. } => assert_eq!(cmp, Comparison::Ne),
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn for_with_step() {
        let line = parse_line("50 for i = 1 to 10 step 2").unwrap();
        assert_eq!(
            line.stmt,
            Stmt::For {
                var: id("i"),
                start: ForBound::Number(1),
                end: ForBound::Number(10),
                step: Some(ForBound::Number(2)),
            }
        );
    }

    #[test]
    fn for_without_step() {
        let line = parse_line("51 for i = a to b").unwrap();
        assert_eq!(
            line.stmt,
            Stmt::For { var: id("i"), start: ForBound::Var(id("a")), end: ForBound::Var(id("b")), step: None }
        );
    }

    #[test]
    fn variable_named_stop_is_not_mistaken_for_step() {
        // "stop" contains "to" as a substring; word-boundary matching must
        // not treat it as the `to` keyword.
        let line = parse_line("52 for i = 1 to stop").unwrap();
        assert_eq!(
            line.stmt,
            Stmt::For { var: id("i"), start: ForBound::Number(1), end: ForBound::Var(id("stop")), step: None }
        );
    }

    #[test]
    fn parses_next() {
        let line = parse_line("60 next i").unwrap();
        assert_eq!(line.stmt, Stmt::Next(Some(id("i"))));
    }

    #[test]
    fn parses_bare_next() {
        let line = parse_line("61 next").unwrap();
        assert_eq!(line.stmt, Stmt::Next(None));
    }

    #[test]
    fn parses_rem_and_end() {
        assert_eq!(parse_line("5 rem a comment").unwrap().stmt, Stmt::Rem);
        assert_eq!(parse_line("99 end").unwrap().stmt, Stmt::End);
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert_eq!(
            parse_line("1 frobnicate x").unwrap_err(),
            LineError::UnknownKeyword("frobnicate".to_string())
        );
    }

    #[test]
    fn rejects_missing_line_number() {
        assert_eq!(parse_line("let x = 1").unwrap_err(), LineError::LineNumberOutOfRange("let".to_string()));
    }
}
