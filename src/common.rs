//! Common definitions shared between the translator and the machine.

use regex::Regex;
use std::sync::OnceLock;

/// Identifiers (variable names). Interned so that equality is a pointer
/// comparison and tokens can be copied around cheaply during compilation.
pub type Id = internment::Intern<String>;

/// Maximum length of a variable identifier (§3, `N_id`).
pub const MAX_IDENT_LEN: usize = 31;

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

fn integer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?[0-9]+$").unwrap())
}

/// Does `text` match `[A-Za-z_][A-Za-z0-9_]*` and fit within [`MAX_IDENT_LEN`]?
pub fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.len() <= MAX_IDENT_LEN && identifier_pattern().is_match(text)
}

/// Does `text` look like an optionally-signed decimal integer literal?
pub fn is_integer(text: &str) -> bool {
    integer_pattern().is_match(text)
}
