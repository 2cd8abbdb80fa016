use std::error::Error;
use std::fmt;

/// Failures reported by the skiplist itself.
///
/// Missing or duplicated entries are not errors: those are reported through
/// plain `bool`/`Option` results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipListError {
    /// A node or its link array could not be allocated. The list was left
    /// unmodified.
    OutOfMemory,
    /// The structure failed a self-check. This is a defect in the list, not a
    /// caller error.
    Inconsistent(String),
}

impl fmt::Display for SkipListError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SkipListError::OutOfMemory => write!(f, "out of memory allocating a skiplist node"),
            SkipListError::Inconsistent(ref reason) => write!(f, "inconsistent skiplist: {}", reason),
        }
    }
}

impl Error for SkipListError {}
