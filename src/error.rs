use std::fmt;

/// Result type for this crate with specific error enum.
pub type Result<T> = ::std::result::Result<T, Error>;

pub type ParseErrorPosition = usize;

/// An error as the result of parsing, compiling or running a regex.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An error as a result of parsing a regex pattern, with the position where the error occurred
    ParseError(ParseErrorPosition, ParseError),
    /// An error as a result of compiling a regex or a pattern set
    CompileError(CompileError),
    /// An error as a result of running a regex
    RuntimeError(RuntimeError),
}

/// An error for the result of parsing a regex pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// General parsing error
    GeneralParseError(String),
    /// Opening parenthesis without closing parenthesis, e.g. `(a|b`
    UnclosedOpenParen,
    /// Closing parenthesis without opening parenthesis, e.g. `a)b`
    UnmatchedCloseParen,
    /// Invalid repeat syntax, e.g. `a{3,2}`
    InvalidRepeat,
    /// Quantifier without anything to repeat, e.g. `*a` or `a**`
    TargetNotRepeatable,
    /// Pattern too deeply nested
    RecursionExceeded,
    /// Backslash without following character
    TrailingBackslash,
    /// Invalid escape
    InvalidEscape(String),
    /// Invalid hex escape
    InvalidHex,
    /// Invalid codepoint for hex escape
    InvalidCodepointValue,
    /// Unterminated character class
    InvalidClass,
    /// Character class range whose end is before its start, e.g. `[z-a]`
    InvalidClassRange,
    /// Unknown group flag, e.g. `(?P<x>...)`
    UnknownGroupFlag(String),
    /// Back reference to a group that has not been opened yet
    InvalidBackref,
}

/// An error as the result of compiling a regex or a pattern set.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum CompileError {
    /// A pattern in a pattern set failed to compile
    InvalidPattern {
        /// The caller supplied id of the pattern
        id: usize,
        /// The error of the pattern
        error: Box<Error>,
    },
}

/// An error as the result of executing a regex.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Max stack size exceeded for backtracking while executing regex.
    StackOverflow,
    /// Max limit for backtracking count exceeded while executing the regex.
    /// Configure using
    /// [`RegexBuilder::backtrack_limit`](../struct.RegexBuilder.html#method.backtrack_limit).
    BacktrackLimitExceeded,
    /// The scan was aborted through its cancellation flag.
    Cancelled,
}

impl Error {
    /// Returns true if the search was aborted before it could decide whether
    /// the text matches.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::RuntimeError(_))
    }
}

impl std::error::Error for Error {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::GeneralParseError(s) => write!(f, "General parsing error: {}", s),
            ParseError::UnclosedOpenParen => {
                write!(f, "Opening parenthesis without closing parenthesis")
            }
            ParseError::UnmatchedCloseParen => {
                write!(f, "Closing parenthesis without opening parenthesis")
            }
            ParseError::InvalidRepeat => write!(f, "Invalid repeat syntax"),
            ParseError::TargetNotRepeatable => write!(f, "Target of repeat operator is invalid"),
            ParseError::RecursionExceeded => write!(f, "Pattern too deeply nested"),
            ParseError::TrailingBackslash => write!(f, "Backslash without following character"),
            ParseError::InvalidEscape(s) => write!(f, "Invalid escape: {}", s),
            ParseError::InvalidHex => write!(f, "Invalid hex escape"),
            ParseError::InvalidCodepointValue => {
                write!(f, "Invalid codepoint for hex escape")
            }
            ParseError::InvalidClass => write!(f, "Invalid character class"),
            ParseError::InvalidClassRange => write!(f, "Invalid character class range"),
            ParseError::UnknownGroupFlag(s) => write!(f, "Unknown group flag: {}", s),
            ParseError::InvalidBackref => write!(f, "Invalid back reference"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidPattern { id, error } => {
                write!(f, "Pattern {} failed to compile: {}", id, error)
            }
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "Max stack size exceeded for backtracking"),
            RuntimeError::BacktrackLimitExceeded => {
                write!(f, "Max limit for backtracking count exceeded")
            }
            RuntimeError::Cancelled => write!(f, "Scan was cancelled"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseError(position, parse_error) => {
                write!(f, "Parsing error at position {}: {}", position, parse_error)
            }
            Error::CompileError(compile_error) => {
                write!(f, "Error compiling regex: {}", compile_error)
            }
            Error::RuntimeError(runtime_error) => {
                write!(f, "Error executing regex: {}", runtime_error)
            }
        }
    }
}

impl From<CompileError> for Error {
    fn from(compile_error: CompileError) -> Self {
        Error::CompileError(compile_error)
    }
}

impl From<RuntimeError> for Error {
    fn from(runtime_error: RuntimeError) -> Self {
        Error::RuntimeError(runtime_error)
    }
}
