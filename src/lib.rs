//! A sorted set of binary members ordered by float score, in the style of a key-value store's
//! sorted-set value.
//!
//! Lookups by member go through a hash map, and everything that depends on order (ranks, score
//! ranges, positional slices) goes through a rank-augmented skiplist from the `skiplist` crate.
//! Configuration comes from the `config` crate and diagnostics go through the `logger` crate.

pub mod error;
pub mod zset;

pub use crate::error::OperationError;
pub use crate::zset::{normalize_position, parse_bound, SortedSet};
