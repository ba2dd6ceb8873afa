//! Whitespace tokenizer with a single level of quoting.
//!
//! The tokenizer owns its buffer: upstream hooks may rewrite the working
//! text between phases, so tokens cannot borrow from the original line.

use crate::error::TokenError;

/// Quote pairs recognized when quoted tokenization is requested.
const QUOTES: &[char] = &['"', '\''];

/// A cursor over a command line, yielding whitespace-delimited tokens.
///
/// A quoted run (`"foo bar"` or `'foo bar'`) is returned as a single token
/// with the quotes stripped, provided the closing quote is followed by
/// whitespace or the end of input. An unterminated quote falls back to
/// plain tokenization.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    buf: String,
    pos: usize,
}

impl Tokenizer {
    /// Create a tokenizer over a copy of `input`.
    pub fn new(input: &str) -> Self {
        Self {
            buf: input.to_string(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.buf[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Yield the next token.
    ///
    /// With `quoted`, a token opening with a quote character consumes up to
    /// the matching close quote and is returned without the quotes.
    pub fn next_token(&mut self, quoted: bool) -> Result<String, TokenError> {
        self.skip_whitespace();
        if self.pos >= self.buf.len() {
            return Err(TokenError::EndOfInput);
        }

        if quoted {
            if let Some((token, consumed)) = self.scan_quoted() {
                self.pos += consumed;
                return Ok(token);
            }
        }

        let rest = &self.buf[self.pos..];
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let token = rest[..end].to_string();
        self.pos += end;
        Ok(token)
    }

    /// Scan for a quoted run at the cursor; returns the unquoted token and
    /// the number of bytes it spans.
    fn scan_quoted(&self) -> Option<(String, usize)> {
        let rest = &self.buf[self.pos..];
        let open = rest.chars().next()?;
        if !QUOTES.contains(&open) {
            return None;
        }
        let body = &rest[open.len_utf8()..];
        for (i, c) in body.char_indices() {
            if c != open {
                continue;
            }
            // Closing quote must end the token: followed by whitespace or EOS.
            let after = &body[i + c.len_utf8()..];
            if after.is_empty() || after.starts_with(|c: char| c.is_whitespace()) {
                let consumed = open.len_utf8() + i + c.len_utf8();
                return Some((body[..i].to_string(), consumed));
            }
        }
        None
    }

    /// Collect the next `n` tokens (quote-aware).
    pub fn next_n(&mut self, n: usize) -> Result<Vec<String>, TokenError> {
        (0..n).map(|_| self.next_token(true)).collect()
    }

    /// The unconsumed remainder of the input, trimmed.
    pub fn rest(&self) -> &str {
        self.buf[self.pos..].trim()
    }

    /// Consume and return the remainder of the input, trimmed.
    pub fn take_rest(&mut self) -> String {
        let rest = self.rest().to_string();
        self.pos = self.buf.len();
        rest
    }

    /// Whether any non-whitespace input remains.
    pub fn is_exhausted(&self) -> bool {
        self.rest().is_empty()
    }
}
