use crate::{GrammarError, ReadError};
use std::fmt::{Display, Formatter};

impl GrammarError {
    pub fn new(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            message: message.into(),
        }
    }
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GrammarError: {}-{}", self.what, self.message)
    }
}

impl std::error::Error for GrammarError {}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        ReadError::Io(err)
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(err) => write!(f, "ReadError: {}", err),
            ReadError::Parse {
                line_number,
                line,
                result,
            } => {
                write!(f, "ReadError at line {}:\n{}", line_number, result.message(line))
            }
        }
    }
}

impl std::error::Error for ReadError {}
