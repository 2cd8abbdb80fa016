use std::collections::HashMap;
use std::ops::Bound;
use std::str::from_utf8;

use config::Config;
use logger::{log, Logger};
use skiplist::{GeometricalLevelGenerator, Iter, NodeId, RankedSkipList};

use crate::error::OperationError;

/// Converts a redis-style position (negative counts from the end) into an index.
///
/// `Err(0)` means the position is before the first element, `Err(len)` that it is past the last
/// one.
///
/// # Examples
/// ```
/// use sortedset::normalize_position;
///
/// assert_eq!(normalize_position(0, 10), Ok(0));
/// assert_eq!(normalize_position(-1, 10), Ok(9));
/// assert_eq!(normalize_position(10, 10), Err(10));
/// assert_eq!(normalize_position(-11, 10), Err(0));
/// ```
pub fn normalize_position(position: i64, len: usize) -> Result<usize, usize> {
    let ilen = len as i64;
    let mut pos = position;
    if pos < 0 {
        pos += ilen;
    }
    if pos < 0 {
        return Err(0);
    }
    if pos >= ilen {
        return Err(len);
    }
    Ok(pos as usize)
}

/// Parses a score bound: `1.5` is inclusive and `(1.5` exclusive.  `-inf`, `inf` and `+inf` are
/// the infinite scores, so `-inf` as a maximum or `+inf` as a minimum only matches members
/// stored with that score.
///
/// # Examples
/// ```
/// use sortedset::parse_bound;
/// use std::f64::{INFINITY, NEG_INFINITY};
/// use std::ops::Bound;
///
/// assert_eq!(parse_bound(b"2").unwrap(), Bound::Included(2.0));
/// assert_eq!(parse_bound(b"(2").unwrap(), Bound::Excluded(2.0));
/// assert_eq!(parse_bound(b"-inf").unwrap(), Bound::Included(NEG_INFINITY));
/// assert_eq!(parse_bound(b"(+inf").unwrap(), Bound::Excluded(INFINITY));
/// assert!(parse_bound(b"nan").is_err());
/// ```
pub fn parse_bound(s: &[u8]) -> Result<Bound<f64>, OperationError> {
    let s = from_utf8(s)?;
    if let Some(rest) = s.strip_prefix('(') {
        return Ok(Bound::Excluded(canonical(rest.parse()?)?));
    }
    Ok(Bound::Included(canonical(s.parse()?)?))
}

/// Rejects NaN and folds `-0.0` into `0.0`, so scores compare the same under `total_cmp` and
/// `==`.
fn canonical(score: f64) -> Result<f64, OperationError> {
    if score.is_nan() {
        Err(OperationError::ValueError)
    } else if score == 0.0 {
        Ok(0.0)
    } else {
        Ok(score)
    }
}

fn canonical_bound(bound: Bound<f64>) -> Result<Bound<f64>, OperationError> {
    Ok(match bound {
        Bound::Included(f) => Bound::Included(canonical(f)?),
        Bound::Excluded(f) => Bound::Excluded(canonical(f)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

fn bound_ref(bound: &Bound<f64>) -> Bound<&f64> {
    match *bound {
        Bound::Included(ref f) => Bound::Included(f),
        Bound::Excluded(ref f) => Bound::Excluded(f),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn reply(entries: Vec<(&Vec<u8>, &f64)>, withscores: bool, rev: bool) -> Vec<Vec<u8>> {
    let mut r = Vec::with_capacity(if withscores { entries.len() * 2 } else { entries.len() });
    let mut push = |(member, score): (&Vec<u8>, &f64)| {
        r.push(member.clone());
        if withscores {
            r.push(format!("{}", score).into_bytes());
        }
    };
    if rev {
        entries.into_iter().rev().for_each(&mut push);
    } else {
        entries.into_iter().for_each(&mut push);
    }
    r
}

/// A set of binary members, each with a float score, answering rank and score-range queries.
///
/// Members are indexed twice: a hash map gives the score of a member and a ranked skiplist keeps
/// `(score, member)` pairs in order.  Both always hold the same entries.
#[derive(Clone, Debug)]
pub struct SortedSet {
    skiplist: RankedSkipList<Vec<u8>, f64>,
    hmap: HashMap<Vec<u8>, f64>,
    verify_invariants: bool,
    logger: Option<Logger>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::with_level_generator(GeometricalLevelGenerator::default())
    }

    pub fn with_level_generator(level_generator: GeometricalLevelGenerator) -> Self {
        SortedSet {
            skiplist: RankedSkipList::with_comparators(
                level_generator,
                |a: &f64, b: &f64| a.total_cmp(b),
                |a: &Vec<u8>, b: &Vec<u8>| a.cmp(b),
            ),
            hmap: HashMap::new(),
            verify_invariants: false,
            logger: None,
        }
    }

    /// Builds an empty set shaped and logged as `config` describes.
    pub fn with_config(config: &Config) -> Self {
        let mut zset = Self::with_level_generator(config.level_generator());
        zset.verify_invariants = config.verify_invariants;
        zset.logger = Some(config.logger.clone());
        zset
    }

    /// Runs `check` after every mutation when enabled.
    pub fn set_verify_invariants(&mut self, verify_invariants: bool) {
        self.verify_invariants = verify_invariants;
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = Some(logger);
    }

    /// Adds `el` with score `s`, or changes its score.
    ///
    /// `nx` only adds new members, `xx` only updates existing ones and `incr` adds `s` to the
    /// current score.  Returns whether the member was added, or whether anything changed when
    /// `ch` is set.
    ///
    /// # Errors
    ///
    /// `ValueError` if the score (or the incremented score) is not a number.
    ///
    /// # Examples
    /// ```
    /// use sortedset::SortedSet;
    ///
    /// let mut zset = SortedSet::new();
    /// assert!(zset.zadd(1.0, b"a".to_vec(), false, false, false, false).unwrap());
    /// assert!(!zset.zadd(2.0, b"a".to_vec(), false, false, false, false).unwrap());
    /// assert!(zset.zadd(3.0, b"a".to_vec(), false, false, true, false).unwrap());
    /// assert_eq!(zset.zscore(b"a"), Some(3.0));
    /// ```
    pub fn zadd(
        &mut self,
        s: f64,
        el: Vec<u8>,
        nx: bool,
        xx: bool,
        ch: bool,
        incr: bool,
    ) -> Result<bool, OperationError> {
        let s = canonical(s)?;
        match self.hmap.get(&el).cloned() {
            Some(_) if nx => Ok(false),
            None if xx => Ok(false),
            Some(val) => {
                let score = if incr { canonical(val + s)? } else { s };
                if score == val {
                    return Ok(false);
                }
                self.update(&el, val, score)?;
                self.hmap.insert(el, score);
                self.verify()?;
                Ok(ch)
            }
            None => {
                self.skiplist.insert(s, el.clone())?;
                self.hmap.insert(el, s);
                self.verify()?;
                Ok(true)
            }
        }
    }

    pub fn zcard(&self) -> usize {
        self.hmap.len()
    }

    pub fn zscore(&self, element: &[u8]) -> Option<f64> {
        self.hmap.get(element).cloned()
    }

    /// Adds `increment` to the score of `member` (0 when absent) and returns the new score.
    pub fn zincrby(&mut self, increment: f64, member: Vec<u8>) -> Result<f64, OperationError> {
        let increment = canonical(increment)?;
        let score = match self.hmap.get(&member).cloned() {
            Some(val) => {
                let score = canonical(val + increment)?;
                if score != val {
                    self.update(&member, val, score)?;
                    self.hmap.insert(member, score);
                }
                score
            }
            None => {
                self.skiplist.insert(increment, member.clone())?;
                self.hmap.insert(member, increment);
                increment
            }
        };
        self.verify()?;
        Ok(score)
    }

    pub fn zrem(&mut self, member: &[u8]) -> Result<bool, OperationError> {
        let (member, score) = match self.hmap.remove_entry(member) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        if !self.skiplist.erase(&score, &member) {
            return Err(self.inconsistent(format!(
                "{} missing from the ordered index",
                String::from_utf8_lossy(&member)
            )));
        }
        self.verify()?;
        Ok(true)
    }

    /// 0-based position of `member`, lowest score first.
    pub fn zrank(&self, member: &[u8]) -> Option<usize> {
        let (member, score) = self.hmap.get_key_value(member)?;
        self.skiplist.rank(score, member)
    }

    /// 0-based position of `member`, highest score first.
    pub fn zrevrank(&self, member: &[u8]) -> Option<usize> {
        self.zrank(member).map(|rank| self.skiplist.len() - 1 - rank)
    }

    /// Number of members whose score is inside the interval.
    ///
    /// # Examples
    /// ```
    /// use sortedset::SortedSet;
    /// use std::ops::Bound::{Excluded, Included, Unbounded};
    ///
    /// let mut zset = SortedSet::new();
    /// for (score, member) in &[(1.0, "a"), (2.0, "b"), (3.0, "c")] {
    ///     zset.zadd(*score, member.as_bytes().to_vec(), false, false, false, false).unwrap();
    /// }
    /// assert_eq!(zset.zcount(Excluded(1.0), Unbounded).unwrap(), 2);
    /// assert_eq!(zset.zcount(Included(5.0), Unbounded).unwrap(), 0);
    /// ```
    pub fn zcount(&self, min: Bound<f64>, max: Bound<f64>) -> Result<usize, OperationError> {
        Ok(match self.rank_range(min, max)? {
            Some((first, last)) => last - first + 1,
            None => 0,
        })
    }

    /// Members between positions `start` and `stop` (both included, negative counting from the
    /// end), optionally followed by their scores.  `rev` counts positions from the highest score.
    pub fn zrange(&self, start: i64, stop: i64, withscores: bool, rev: bool) -> Vec<Vec<u8>> {
        match self.normalize_range(start, stop, rev) {
            Some((start, stop)) => reply(self.slice(start, stop - start + 1), withscores, rev),
            None => vec![],
        }
    }

    /// Members whose score is inside the interval, skipping `offset` and returning at most
    /// `count` of them.  With `rev` the first bound is the maximum and members come highest
    /// score first.
    pub fn zrangebyscore(
        &self,
        min: Bound<f64>,
        max: Bound<f64>,
        withscores: bool,
        offset: usize,
        count: usize,
        rev: bool,
    ) -> Result<Vec<Vec<u8>>, OperationError> {
        let (min, max) = if rev { (max, min) } else { (min, max) };
        let (first, last) = match self.rank_range(min, max)? {
            Some(range) => range,
            None => return Ok(vec![]),
        };
        let matched = last - first + 1;
        if offset >= matched {
            return Ok(vec![]);
        }
        let take = count.min(matched - offset);
        let start = if rev { last + 1 - offset - take } else { first + offset };
        Ok(reply(self.slice(start, take), withscores, rev))
    }

    /// Removes every member whose score is inside the interval and returns how many there were.
    pub fn zremrangebyscore(&mut self, min: Bound<f64>, max: Bound<f64>) -> Result<usize, OperationError> {
        let (min, max) = (canonical_bound(min)?, canonical_bound(max)?);
        let removed = self
            .skiplist
            .remove_range_by_score(bound_ref(&min), bound_ref(&max));
        self.forget(&removed, "score");
        self.verify()?;
        Ok(removed.len())
    }

    /// Removes the members between positions `start` and `stop` (both included, negative counting
    /// from the end) and returns how many there were.
    pub fn zremrangebyrank(&mut self, start: i64, stop: i64) -> Result<usize, OperationError> {
        let (start, stop) = match self.normalize_range(start, stop, false) {
            Some(range) => range,
            None => return Ok(0),
        };
        let removed = self.skiplist.remove_range_by_rank(start, stop);
        self.forget(&removed, "rank");
        self.verify()?;
        Ok(removed.len())
    }

    /// Whether any member has a score inside the interval.
    pub fn zany(&self, min: Bound<f64>, max: Bound<f64>) -> Result<bool, OperationError> {
        let (min, max) = (canonical_bound(min)?, canonical_bound(max)?);
        Ok(self.skiplist.contains_any_in_range(bound_ref(&min), bound_ref(&max)))
    }

    /// Iterates over `(member, score)` pairs, lowest score first.
    pub fn iter(&self) -> Iter<Vec<u8>, f64> {
        self.skiplist.iter()
    }

    /// Checks the ordered index and that it holds exactly the members of the score map.
    pub fn check(&self) -> Result<(), OperationError> {
        self.skiplist.check()?;
        if self.skiplist.len() != self.hmap.len() {
            return Err(OperationError::Inconsistent(format!(
                "{} ordered entries for {} members",
                self.skiplist.len(),
                self.hmap.len()
            )));
        }
        for (member, score) in &self.skiplist {
            if self.hmap.get(member) != Some(score) {
                return Err(OperationError::Inconsistent(format!(
                    "{} has score {} in the ordered index only",
                    String::from_utf8_lossy(member),
                    score
                )));
            }
        }
        Ok(())
    }

    fn verify(&self) -> Result<(), OperationError> {
        if !self.verify_invariants {
            return Ok(());
        }
        self.check().map_err(|e| {
            if let Some(ref logger) = self.logger {
                log!(logger, Warning, "sorted set failed its self-check: {}", e);
            }
            e
        })
    }

    fn inconsistent(&self, reason: String) -> OperationError {
        if let Some(ref logger) = self.logger {
            log!(logger, Warning, "sorted set is inconsistent: {}", reason);
        }
        OperationError::Inconsistent(reason)
    }

    /// Moves `member` from `current` to `score` in the ordered index.
    fn update(&mut self, member: &Vec<u8>, current: f64, score: f64) -> Result<(), OperationError> {
        let before = match self.logger {
            Some(_) => self.node_of(member, current),
            None => None,
        };
        match self.skiplist.update_score(member, &current, score)? {
            Some(after) => {
                if let (Some(before), Some(logger)) = (before, &self.logger) {
                    if before != after {
                        log!(
                            logger,
                            Debug,
                            "repositioned {} from {} to {}",
                            String::from_utf8_lossy(member),
                            current,
                            score
                        );
                    }
                }
                Ok(())
            }
            None => Err(self.inconsistent(format!(
                "{} missing from the ordered index",
                String::from_utf8_lossy(member)
            ))),
        }
    }

    fn node_of(&self, member: &Vec<u8>, score: f64) -> Option<NodeId> {
        let rank = self.skiplist.rank(&score, member)?;
        self.skiplist.get_by_rank(rank)
    }

    /// Drops members removed from the ordered index from the score map.
    fn forget(&mut self, removed: &[(Vec<u8>, f64)], by: &str) {
        for (member, _) in removed {
            self.hmap.remove(member);
        }
        if removed.is_empty() {
            return;
        }
        if let Some(ref logger) = self.logger {
            log!(logger, Debug, "removed {} members by {}", removed.len(), by);
        }
    }

    /// Ranks of the first and last members inside a score interval.
    fn rank_range(&self, min: Bound<f64>, max: Bound<f64>) -> Result<Option<(usize, usize)>, OperationError> {
        let (min, max) = (canonical_bound(min)?, canonical_bound(max)?);
        let (min, max) = (bound_ref(&min), bound_ref(&max));
        let first = self.skiplist.first_in_range(min, max).and_then(|id| self.skiplist.rank_of(id));
        let last = self.skiplist.last_in_range(min, max).and_then(|id| self.skiplist.rank_of(id));
        Ok(match (first, last) {
            (Some(first), Some(last)) if first <= last => Some((first, last)),
            _ => None,
        })
    }

    /// Turns redis-style positions into an inclusive range of ranks, `None` when empty.
    fn normalize_range(&self, start: i64, stop: i64, rev: bool) -> Option<(usize, usize)> {
        let len = self.skiplist.len();
        if len == 0 {
            return None;
        }
        let (start, stop) = if rev {
            ((-1i64).saturating_sub(stop), (-1i64).saturating_sub(start))
        } else {
            (start, stop)
        };
        let start = match normalize_position(start, len) {
            Ok(i) => i,
            Err(0) => 0,
            Err(_) => return None,
        };
        let stop = match normalize_position(stop, len) {
            Ok(i) => i,
            Err(0) => return None,
            Err(_) => len - 1,
        };
        if stop < start {
            None
        } else {
            Some((start, stop))
        }
    }

    fn slice(&self, start: usize, count: usize) -> Vec<(&Vec<u8>, &f64)> {
        self.skiplist.iter_from_rank(start).take(count).collect()
    }
}

impl Default for SortedSet {
    fn default() -> Self {
        SortedSet::new()
    }
}

impl PartialEq for SortedSet {
    fn eq(&self, other: &Self) -> bool {
        self.skiplist == other.skiplist
    }
}
