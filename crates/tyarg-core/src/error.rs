use crate::types::TypeId;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown type id {0}")]
    UnknownType(TypeId),
    #[error("type id {0} was reserved but never defined")]
    Undefined(TypeId),
    #[error("local types were allocated against an arena of {expected} nodes, found {found}")]
    StaleOverlay { expected: usize, found: usize },
    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Generic(s.to_string())
    }
}
