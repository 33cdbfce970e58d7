use std::fmt::{Display, Formatter};
use thiserror::Error;
use crate::interpreter::lexer::{LexerError, TokenPos};
use crate::interpreter::parser::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Unbound identifier, or assignment to a name that was never defined.
    NameError,
    /// Operand kind mismatch, or calling something that is not a function.
    TypeError,
    ArityError,
    DivisionByZeroError,
    /// Call depth exceeded the evaluator's limit.
    StackOverflow,
    /// The output sink of `print` failed.
    OutputError,
}

impl RuntimeErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            RuntimeErrorKind::NameError => "NameError",
            RuntimeErrorKind::TypeError => "TypeError",
            RuntimeErrorKind::ArityError => "ArityError",
            RuntimeErrorKind::DivisionByZeroError => "DivisionByZeroError",
            RuntimeErrorKind::StackOverflow => "StackOverflow",
            RuntimeErrorKind::OutputError => "OutputError",
        }
    }
}

impl Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{pos} {kind}: {message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub pos: TokenPos,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, pos: TokenPos, message: impl Into<String>) -> RuntimeError {
        RuntimeError { kind, pos, message: message.into() }
    }

    pub fn undefined(pos: TokenPos, name: &str) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::NameError, pos, format!("Undefined variable '{}'", name))
    }

    pub fn type_error(pos: TokenPos, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::TypeError, pos, message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Runtime,
}

/// Any failure of the lexer, parser or evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Lex(_) => Stage::Lex,
            Error::Parse(_) => Stage::Parse,
            Error::Runtime(_) => Stage::Runtime,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::Lex(_) => "LexError",
            Error::Parse(_) => "ParseError",
            Error::Runtime(error) => error.kind.name(),
        }
    }

    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            Error::Runtime(error) => Some(error.kind),
            _ => None,
        }
    }

    pub fn pos(&self) -> TokenPos {
        match self {
            Error::Lex(error) => error.get_pos(),
            Error::Parse(error) => error.pos,
            Error::Runtime(error) => error.pos,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::Lex(error) => error.message(),
            Error::Parse(error) => error.message(),
            Error::Runtime(error) => error.message.clone(),
        }
    }
}

/// An [`Error`] attributed to the named source unit it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub unit: String,
    pub error: Error,
}

impl Diagnostic {
    pub fn new(unit: impl Into<String>, error: impl Into<Error>) -> Diagnostic {
        Diagnostic { unit: unit.into(), error: error.into() }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pos = self.error.pos();
        write!(f, "[{}:{}:{}] {}: {}", self.unit, pos.line, pos.column, self.error.kind(), self.error.message())
    }
}

impl std::error::Error for Diagnostic {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn diagnostic_format() {
        let error = RuntimeError::new(RuntimeErrorKind::DivisionByZeroError, TokenPos::new(3, 7), "Division by zero");
        let diagnostic = Diagnostic::new("main.xa", error);

        assert_eq!(diagnostic.to_string(), "[main.xa:3:7] DivisionByZeroError: Division by zero");
        assert_eq!(diagnostic.error.stage(), Stage::Runtime);
    }

    #[test]
    fn lexer_errors_keep_their_stage() {
        let error = Error::from(LexerError::UnterminatedString { pos: TokenPos::new(1, 4) });

        assert_eq!(error.stage(), Stage::Lex);
        assert_eq!(error.kind(), "LexError");
        assert_eq!(error.runtime_kind(), None);
        assert_eq!(Diagnostic::new("<stdin>", error).to_string(), "[<stdin>:1:4] LexError: Unterminated string");
    }
}
