use super::Lexer;
use crate::{ParseResult, Token};

/// Emit the pending identifier or number literal, if any.
fn flush(
    tokens: &mut Vec<Token>,
    value: &mut String,
    numeric: bool,
    start: usize,
    end: usize,
) -> Result<(), ParseResult> {
    if value.is_empty() {
        return Ok(());
    }
    if numeric {
        let parsed = value
            .parse::<u64>()
            .map_err(|_| ParseResult::new(2, start, 1))?;
        tokens.push(Token::number(parsed, value.as_str(), start, end - start));
    } else {
        tokens.push(Token::variable(value.as_str(), start, end - start));
    }
    value.clear();
    Ok(())
}

impl Lexer {
    /// Split one expression line into tokens.
    ///
    /// Blanks are skipped but never terminate the token being accumulated, so
    /// `A 0` reads as the single identifier `A0`. Failure statuses:
    /// `1` invalid character, `2` identifier starting with a digit,
    /// `3` identifier starting with an underscore.
    pub fn analyse(&self, expression: &str) -> Result<Vec<Token>, ParseResult> {
        let mut tokens: Vec<Token> = Vec::new();
        // text, kind and byte range of the token being accumulated
        let mut value = String::new();
        let mut numeric = false;
        let mut start = 0usize;
        let mut end = 0usize;

        for (index, c) in expression.char_indices() {
            match c {
                ' ' | '\t' | '\r' => continue,
                '(' | ')' | '&' | '|' | '=' | '/' => {
                    flush(&mut tokens, &mut value, numeric, start, end)?;
                    tokens.push(Token::operator(c, index));
                }
                'A'..='Z' | 'a'..='z' => {
                    if value.is_empty() {
                        start = index;
                        numeric = false;
                    } else if numeric {
                        return Err(ParseResult::new(2, start, 1));
                    }
                    value.push(c);
                    end = index + 1;
                }
                '0'..='9' => {
                    if value.is_empty() {
                        start = index;
                        numeric = true;
                    }
                    value.push(c);
                    end = index + 1;
                }
                '_' => {
                    if value.is_empty() {
                        return Err(ParseResult::new(3, index, 1));
                    }
                    if numeric {
                        return Err(ParseResult::new(2, start, 1));
                    }
                    value.push(c);
                    end = index + 1;
                }
                _ => return Err(ParseResult::new(1, index, 1)),
            }
        }
        flush(&mut tokens, &mut value, numeric, start, end)?;
        Ok(tokens)
    }
}
