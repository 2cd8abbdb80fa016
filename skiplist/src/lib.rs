//! A skiplist is a way of storing elements in such a way that elements can be efficiently
//! accessed, inserted and removed, all in `O(log(n))` on average.
//!
//! This skiplist stores `(member, score)` entries ordered by score, then by member, and every
//! link records how many level-0 steps it skips.  Summing those spans along a search gives the
//! rank of an entry, and following them lets the list jump straight to the n-th entry:
//!
//! ```text
//! <head> -2-------> [b] -3-------------------------------> None
//! <head> -2-------> [b] -2-------------> [d] -1-> [e] -0-> None
//! <head> -1-> [a] -1-> [b] -1-> [c] -1-> [d] -1-> [e] -0-> None
//! ```
//!
//! A link without a successor spans the entries remaining after its node, so the head of an
//! unused level spans the whole list.
//!
//! Nodes live in an arena and are addressed by `NodeId` handles, which go stale once the node is
//! removed.  Heights are drawn from a `LevelGenerator`; the default one is geometric with `p =
//! 1/4` over 32 levels and can be seeded for reproducible shapes.
//!
//! The score and member orderings **must** be well-behaved.  Specifically, given some ordering
//! function `f(a, b)`, it must satisfy the following properties:
//!
//! - Be well defined: `f(a, b)` should always return the same value
//! - Be anti-symmetric: `f(a, b) == Greater` iff `f(b, a) == Less` and `f(a, b) == Equal == f(b, a)`.
//! - By transitive: If `f(a, b) == Greater` and `f(b, c) == Greater` then `f(a, c) == Greater`.
//!
//! Failure to satisfy these properties leaves the list in an unspecified order; `check()` will
//! report it.

mod arena;
mod error;
mod level_generator;
pub mod ranked_skiplist;
mod skipnode;

pub use crate::error::SkipListError;
pub use crate::level_generator::{GeometricalLevelGenerator, LevelGenerator, MAX_LEVEL, P};
pub use crate::ranked_skiplist::{Compare, Iter, RankedSkipList};
pub use crate::skipnode::{Link, NodeId, SkipNode};
