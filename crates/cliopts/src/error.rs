//! Errors produced while parsing an argument vector.

use thiserror::Error;

/// Failure returned by a custom option filter.
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

pub type ParseResult<T> = Result<T, ParseError>;

/// The first violation found while parsing. Parsing stops there and no
/// partial result is produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// `-`, `--` or `--=value`.
    #[error("found an empty option")]
    EmptyOption,

    #[error("unknown option '-{0}'")]
    UnknownShort(char),

    #[error("unknown option '--{0}'")]
    UnknownLong(String),

    /// The option was given without a value but is not declared as a flag.
    #[error("option '--{0}' is not a flag")]
    NotFlag(String),

    /// A value was given for a flag that does not allow one.
    #[error("option '--{0}' is a flag")]
    IsFlag(String),

    #[error("option '--{0}' must be an integer")]
    NotInteger(String),

    #[error("option '--{0}' must be a positive integer")]
    NotPositiveInteger(String),

    #[error("duplicate option '--{0}'")]
    Duplicate(String),

    #[error("required option '--{0}'")]
    Required(String),

    /// A custom filter rejected the value. Displays the filter's own message.
    #[error("{source}")]
    Filter {
        name: String,
        #[source]
        source: FilterError,
    },
}

/// Broad category of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Resolution,
    Shape,
    Type,
    Completeness,
    Filter,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyOption => ErrorKind::Syntax,
            Self::UnknownShort(_) | Self::UnknownLong(_) => ErrorKind::Resolution,
            Self::NotFlag(_) | Self::IsFlag(_) | Self::Duplicate(_) => ErrorKind::Shape,
            Self::NotInteger(_) | Self::NotPositiveInteger(_) => ErrorKind::Type,
            Self::Required(_) => ErrorKind::Completeness,
            Self::Filter { .. } => ErrorKind::Filter,
        }
    }

    /// Long name of the offending option, when the error concerns a known one.
    pub fn option(&self) -> Option<&str> {
        match self {
            Self::EmptyOption | Self::UnknownShort(_) => None,
            Self::UnknownLong(name)
            | Self::NotFlag(name)
            | Self::IsFlag(name)
            | Self::NotInteger(name)
            | Self::NotPositiveInteger(name)
            | Self::Duplicate(name)
            | Self::Required(name)
            | Self::Filter { name, .. } => Some(name.as_str()),
        }
    }
}
