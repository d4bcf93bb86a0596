use crate::{events::EventError, index::IndexError, parser::FilterParseError};
use thiserror::Error;

/// Errors surfaced by lexing and parsing filter expressions.
#[derive(Error, PartialEq, Debug)]
pub enum ParserError {
    #[error("invalid token at {0}..{1}")]
    InvalidToken(usize, usize),
    #[error(transparent)]
    Event(EventError),
}

/// Top-level error for engine operations.
#[derive(Error, PartialEq, Debug)]
pub enum FilterError<'a> {
    #[error("failed to parse the expression with {0:?}")]
    Parse(FilterParseError<'a>),
    #[error("failed with {0:?}")]
    Event(EventError),
    #[error(transparent)]
    Index(IndexError),
    #[error("no value bound for placeholder '${0}'")]
    UnboundPlaceholder(String),
    #[error("the value bound for '${placeholder}' cannot apply to attribute '{attribute}'")]
    MismatchedBinding {
        placeholder: String,
        attribute: String,
    },
}

impl<'a> From<EventError> for FilterError<'a> {
    fn from(error: EventError) -> Self {
        Self::Event(error)
    }
}

impl<'a> From<IndexError> for FilterError<'a> {
    fn from(error: IndexError) -> Self {
        Self::Index(error)
    }
}
