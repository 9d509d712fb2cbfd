use crate::ParseResult;
use colored::Colorize;
use std::fmt::{Display, Formatter, Write};

/// Render the line with the range `[position, position + length)` highlighted in red.
fn error_word(line: &str, position: usize, length: usize) -> String {
    let position = position.min(line.len());
    let end = (position + length).min(line.len());
    format!(
        "  {}{}{}\n",
        &line[..position],
        line[position..end].red(),
        &line[end..]
    )
}

fn error_character(line: &str, position: usize) -> String {
    error_word(line, position, 1)
}

impl ParseResult {
    /// Create a new result from a status and the offending byte range.
    pub fn new(status: i32, position: usize, length: usize) -> Self {
        Self {
            status,
            position,
            length,
        }
    }

    /// The success result.
    pub fn success() -> Self {
        Self::new(0, 0, 0)
    }

    /// Whether this line compiled successfully.
    pub fn ok(&self) -> bool {
        self.status == 0
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Render a human readable diagnostic for the line this result was produced from.
    ///
    /// The offending range is wrapped in ANSI red so a terminal shows the exact
    /// characters the status refers to. Success renders as the empty string.
    pub fn message(&self, line: &str) -> String {
        if self.ok() {
            return String::new();
        }
        let range = {
            let start = self.position.min(line.len());
            let end = (self.position + self.length).min(line.len());
            &line[start..end]
        };
        let mut out = String::from("[Error] ");
        let body = match self.status {
            1 => format!(
                "Invalid character {} at {}\n{}",
                line.as_bytes().get(self.position).copied().unwrap_or(b'?') as char,
                self.position,
                error_character(line, self.position)
            ),
            2 => format!(
                "Variable can't start with digits, position {}\n{}",
                self.position,
                error_character(line, self.position)
            ),
            3 => format!(
                "Variable can't start with underscore '_', position {}\n{}",
                self.position,
                error_character(line, self.position)
            ),
            101 => format!(
                "Syntax error, invalid token: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            102 => format!(
                "Syntax error, this token can't be shifted: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            103 => format!(
                "Syntax error, invalid token type: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            104 => format!(
                "Syntax error, invalid action type when looking: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            201 => format!("Size of token is less than 3.\n{}\n", line),
            202 => format!(
                "Invalid type of token: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            203 => format!(
                "Multiple source of output: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            204 => format!(
                "Input and output in the same port: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            205 => format!(
                "Invalid scaler input: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            206 => format!(
                "Port defined as LEMO and LVDS at the same time: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            207 => format!(
                "Undefined variable: {}\n{}",
                range,
                error_word(line, self.position, self.length)
            ),
            208 => "Unable to parse nested downscale expression.\n".to_string(),
            209 => format!(
                "Invalid external clock source.\n{}",
                error_word(line, self.position, self.length)
            ),
            300 => format!("Generate error.\n  {}\n", line),
            status => format!("Undefined error: {}\n", status),
        };
        let _ = write!(out, "{}", body);
        out
    }
}

impl Display for ParseResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.ok() {
            write!(f, "Ok")
        } else {
            write!(
                f,
                "Error(status {}, position {}, length {})",
                self.status, self.position, self.length
            )
        }
    }
}
