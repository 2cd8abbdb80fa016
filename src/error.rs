use std::error::Error;
use std::fmt;
use std::io;
use std::num::ParseFloatError;
use std::str::Utf8Error;

use skiplist::SkipListError;

#[derive(Debug)]
pub enum OperationError {
    /// A score or bound is not a number.
    ValueError,
    OutOfMemory,
    /// The self-check found the ordered index in a broken state.
    Inconsistent(String),
    IOError(io::Error),
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            OperationError::ValueError => f.write_str("value is not a valid float"),
            OperationError::OutOfMemory => f.write_str("out of memory"),
            OperationError::Inconsistent(ref reason) => write!(f, "inconsistent sorted set: {}", reason),
            OperationError::IOError(ref e) => e.fmt(f),
        }
    }
}

impl Error for OperationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            OperationError::IOError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<SkipListError> for OperationError {
    fn from(e: SkipListError) -> OperationError {
        match e {
            SkipListError::OutOfMemory => OperationError::OutOfMemory,
            SkipListError::Inconsistent(reason) => OperationError::Inconsistent(reason),
        }
    }
}

impl From<Utf8Error> for OperationError {
    fn from(_: Utf8Error) -> OperationError { OperationError::ValueError }
}

impl From<ParseFloatError> for OperationError {
    fn from(_: ParseFloatError) -> OperationError { OperationError::ValueError }
}

impl From<io::Error> for OperationError {
    fn from(e: io::Error) -> OperationError { OperationError::IOError(e) }
}
