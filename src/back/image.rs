//! The on-disk memory image format: one line per word, each word written as
//! an unsigned hexadecimal value padded to `WORD_BITS / 4` digits. Matches
//! the original compiler's `sprintf(..., "%*X\n", WORD_BITS / 4, ...)`
//! exactly, so images produced by either toolchain round-trip identically.

use crate::word::{Word, MEMORY_SIZE, WORD_BITS};
use derive_more::Display;

const DIGITS: usize = (WORD_BITS / 4) as usize;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[display("line {line}: '{text}' is not a valid hexadecimal word")]
    BadWord { line: usize, text: String },
    #[display("image has {found} words, expected exactly {MEMORY_SIZE}")]
    WrongLength { found: usize },
}

impl std::error::Error for ImageError {}

/// Render a full `MEMORY_SIZE`-word image as text, one hex word per line.
pub fn encode_image(words: &[Word]) -> String {
    let mut out = String::with_capacity(words.len() * (DIGITS + 1));
    for &word in words {
        out.push_str(&format!("{:>width$X}\n", word as u16, width = DIGITS));
    }
    out
}

/// Parse a full image back into words, requiring exactly `MEMORY_SIZE`
/// lines.
pub fn decode_image(text: &str) -> Result<Vec<Word>, ImageError> {
    let mut words = Vec::with_capacity(MEMORY_SIZE);
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = u16::from_str_radix(trimmed, 16)
            .map_err(|_| ImageError::BadWord { line: index + 1, text: trimmed.to_string() })?;
        words.push(value as Word);
    }
    if words.len() != MEMORY_SIZE {
        return Err(ImageError::WrongLength { found: words.len() });
    }
    Ok(words)
}
