use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::mem;
use std::ops::Bound;
use std::sync::Arc;

use crate::arena::NodeArena;
use crate::error::SkipListError;
use crate::level_generator::{GeometricalLevelGenerator, LevelGenerator, MAX_LEVEL, P};
use crate::skipnode::{allocate_links, Link, NodeId, SkipNode};

/// Comparison function shared between a list and its copies.
pub type Compare<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

// /////////////////////////////////////////////////////////////////////////////////////////////////
// RankedSkipList
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// An ordered set of `(member, score)` entries kept sorted by score, with ties broken by member.
///
/// Every link carries a span (how many level-0 steps it skips), which makes the rank of any entry
/// available in `O(log n)` while searching for it.  Members must be unique; scores may repeat.
///
/// The list is a plain sequential data structure.  Sharing it across threads requires external
/// synchronization around every mutating call.
///
/// Both comparators **must** be well-behaved: consistent, anti-symmetric and transitive.
/// Failure to satisfy these properties leaves the list in an unspecified (but memory-safe) state.
pub struct RankedSkipList<K, V, G = GeometricalLevelGenerator> {
    arena: NodeArena<K, V>,
    head: NodeId,
    tail: Option<NodeId>,
    len: usize,
    // tallest level currently holding a node, at least 1
    levels: usize,
    level_generator: G,
    score_cmp: Compare<V>,
    member_cmp: Compare<K>,
}

/// Outcome of a top-down walk towards a `(score, member)` probe.
///
/// `frontier[i]` is the last node at level `i` that strictly precedes the probe and `rank[i]` its
/// position (the head is at 0, the first entry at 1).  `found` is the node equal to the probe, if
/// any, and the height at which it was first seen.
struct Search {
    frontier: Vec<NodeId>,
    rank: Vec<usize>,
    found: Option<(NodeId, usize)>,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<K, V> RankedSkipList<K, V>
where
    K: Ord + 'static,
    V: Ord + 'static,
{
    /// Create a new list ordered by `Ord` on scores and members, with 32 levels and a `1/4`
    /// promotion probability.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::RankedSkipList;
    ///
    /// let mut list: RankedSkipList<&str, u32> = RankedSkipList::new();
    /// assert!(list.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_level_generator(GeometricalLevelGenerator::new(MAX_LEVEL, P))
    }

    /// Same as `new` but with a reproducible shape.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_level_generator(GeometricalLevelGenerator::with_seed(MAX_LEVEL, P, seed))
    }
}

impl<K, V, G> RankedSkipList<K, V, G>
where
    K: Ord + 'static,
    V: Ord + 'static,
    G: LevelGenerator,
{
    pub fn with_level_generator(level_generator: G) -> Self {
        Self::with_comparators(level_generator, |a: &V, b: &V| a.cmp(b), |a: &K, b: &K| a.cmp(b))
    }
}

impl<K, V, G> RankedSkipList<K, V, G>
where
    G: LevelGenerator,
{
    /// Create a new list using `score_cmp` as the primary ordering and `member_cmp` to break ties
    /// between equal scores.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::{GeometricalLevelGenerator, RankedSkipList};
    ///
    /// let mut list = RankedSkipList::with_comparators(
    ///     GeometricalLevelGenerator::with_seed(16, 0.25, 1),
    ///     |a: &f64, b: &f64| a.total_cmp(b),
    ///     |a: &String, b: &String| a.cmp(b),
    /// );
    /// list.insert(1.5, "b".to_owned()).unwrap();
    /// list.insert(1.5, "a".to_owned()).unwrap();
    /// assert_eq!(list.rank(&1.5, &"a".to_owned()), Some(0));
    /// ```
    pub fn with_comparators<S, M>(level_generator: G, score_cmp: S, member_cmp: M) -> Self
    where
        S: Fn(&V, &V) -> Ordering + Send + Sync + 'static,
        M: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        Self::from_parts(level_generator, Arc::new(score_cmp), Arc::new(member_cmp))
    }

    fn from_parts(level_generator: G, score_cmp: Compare<V>, member_cmp: Compare<K>) -> Self {
        let arena = Self::empty_arena(level_generator.total());
        RankedSkipList {
            head: arena.head(),
            arena,
            tail: None,
            len: 0,
            levels: 1,
            level_generator,
            score_cmp,
            member_cmp,
        }
    }

    fn empty_arena(total: usize) -> NodeArena<K, V> {
        match NodeArena::with_capacity(total, 0) {
            Ok(arena) => arena,
            Err(e) => panic!("cannot allocate skiplist head: {}", e),
        }
    }

    /// Removes every entry.  Handles to removed nodes go stale.
    pub fn clear(&mut self) {
        self.arena = Self::empty_arena(self.level_generator.total());
        self.head = self.arena.head();
        self.tail = None;
        self.len = 0;
        self.levels = 1;
    }

    /// Insert `member` with `score`.
    ///
    /// Returns `(true, node)` for the new node.  Members are expected to be unique; if an equal
    /// `(score, member)` entry is already present nothing changes and `(false, existing)` is
    /// returned.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the node cannot be allocated, in which case the list is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::RankedSkipList;
    ///
    /// let mut list = RankedSkipList::new();
    /// let (added, a) = list.insert(10, "a").unwrap();
    /// assert!(added);
    /// assert_eq!(list.insert(10, "a").unwrap(), (false, a));
    /// assert_eq!(list.len(), 1);
    /// ```
    pub fn insert(&mut self, score: V, member: K) -> Result<(bool, NodeId), SkipListError> {
        let search = self.search(&score, &member);
        if let Some((existing, _)) = search.found {
            return Ok((false, existing));
        }
        let links = allocate_links(self.random_height())?;
        self.arena.reserve()?;
        Ok((true, self.link_node(search, score, member, links)))
    }

    /// Removes the entry equal to `(score, member)`.  Returns `false` if there is none.
    pub fn erase(&mut self, score: &V, member: &K) -> bool {
        self.remove(score, member).is_some()
    }

    /// Removes the entry equal to `(score, member)` and hands it back.
    pub fn remove(&mut self, score: &V, member: &K) -> Option<(K, V)> {
        let search = self.search(score, member);
        let (node, _) = search.found?;
        self.unlink(node, &search.frontier)
    }

    /// Changes the score of `member` from `current` to `new_score`.
    ///
    /// When the new score keeps the node between its level-0 neighbours the score is overwritten
    /// in place and the same handle is returned.  Otherwise the entry is removed and inserted
    /// again, and the handle of the new node is returned.  Returns `None` and leaves the list
    /// untouched if `member` is not stored with `current`, or if `(new_score, member)` is already
    /// stored.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if repositioning needs a node that cannot be allocated, in which case the
    /// list is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::RankedSkipList;
    ///
    /// let mut list = RankedSkipList::new();
    /// let (_, a) = list.insert(1, "a").unwrap();
    /// list.insert(10, "b").unwrap();
    ///
    /// // still before "b": updated in place
    /// assert_eq!(list.update_score(&"a", &1, 5).unwrap(), Some(a));
    /// // moves past "b": repositioned
    /// let moved = list.update_score(&"a", &5, 20).unwrap().unwrap();
    /// assert_ne!(moved, a);
    /// assert_eq!(list.rank(&20, &"a"), Some(1));
    /// ```
    pub fn update_score(
        &mut self,
        member: &K,
        current: &V,
        new_score: V,
    ) -> Result<Option<NodeId>, SkipListError> {
        let search = self.search(current, member);
        let node = match search.found {
            Some((node, _)) => node,
            None => return Ok(None),
        };

        let in_place = match (self.score_cmp)(&new_score, current) {
            Ordering::Greater => match self.arena[node].links()[0].next {
                Some(next) => self.compare_node(next, &new_score, member) == Ordering::Greater,
                None => true,
            },
            Ordering::Less => match self.arena[node].prev() {
                Some(prev) => self.compare_node(prev, &new_score, member) == Ordering::Less,
                None => true,
            },
            Ordering::Equal => true,
        };
        if in_place {
            self.arena[node].set_score(new_score);
            return Ok(Some(node));
        }

        if self.search(&new_score, member).found.is_some() {
            return Ok(None);
        }

        // Allocate before touching the list; the slot freed by unlink is reused.
        let links = allocate_links(self.random_height())?;
        let (member, _) = match self.unlink(node, &search.frontier) {
            Some(entry) => entry,
            None => return Err(SkipListError::Inconsistent("matched node vanished".to_owned())),
        };
        let search = self.search(&new_score, &member);
        if search.found.is_some() {
            return Err(SkipListError::Inconsistent("entry appeared while repositioning".to_owned()));
        }
        Ok(Some(self.link_node(search, new_score, member, links)))
    }

    /// Returns `true` if any entry has a score inside the interval.
    ///
    /// This only compares the interval against the smallest and largest scores.  An empty list
    /// or an interval that no value can satisfy (`min > max`, or `min == max` with either side
    /// excluded) gives `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::RankedSkipList;
    /// use std::ops::Bound::{Excluded, Included};
    ///
    /// let mut list = RankedSkipList::new();
    /// for (score, member) in [(1, "a"), (5, "b"), (9, "c")] {
    ///     list.insert(score, member).unwrap();
    /// }
    /// assert!(list.contains_any_in_range(Included(&5), Included(&5)));
    /// assert!(!list.contains_any_in_range(Excluded(&5), Excluded(&5)));
    /// assert!(!list.contains_any_in_range(Included(&10), Included(&20)));
    /// ```
    pub fn contains_any_in_range(&self, min: Bound<&V>, max: Bound<&V>) -> bool {
        if self.is_empty() || !self.is_valid_range(min, max) {
            return false;
        }
        let lowest = self.first().and_then(|id| self.arena[id].score());
        let highest = self.tail.and_then(|id| self.arena[id].score());
        match (lowest, highest) {
            (Some(lowest), Some(highest)) => {
                self.value_gte_min(highest, min) && self.value_lte_max(lowest, max)
            }
            _ => false,
        }
    }

    /// The first node whose score is inside the interval.
    pub fn first_in_range(&self, min: Bound<&V>, max: Bound<&V>) -> Option<NodeId> {
        if !self.contains_any_in_range(min, max) {
            return None;
        }
        let mut x = self.head;
        for level in (0..self.levels).rev() {
            while let Some(next) = self.arena[x].links()[level].next {
                match self.arena[next].score() {
                    Some(score) if !self.value_gte_min(score, min) => x = next,
                    _ => break,
                }
            }
        }
        let candidate = self.arena[x].links()[0].next?;
        let score = self.arena[candidate].score()?;
        if self.value_lte_max(score, max) {
            Some(candidate)
        } else {
            None
        }
    }

    /// The last node whose score is inside the interval.
    pub fn last_in_range(&self, min: Bound<&V>, max: Bound<&V>) -> Option<NodeId> {
        if !self.contains_any_in_range(min, max) {
            return None;
        }
        let mut x = self.head;
        for level in (0..self.levels).rev() {
            while let Some(next) = self.arena[x].links()[level].next {
                match self.arena[next].score() {
                    Some(score) if self.value_lte_max(score, max) => x = next,
                    _ => break,
                }
            }
        }
        let score = self.arena[x].score()?;
        if self.value_gte_min(score, min) {
            Some(x)
        } else {
            None
        }
    }

    /// 0-based position of `(score, member)` in the list.
    pub fn rank(&self, score: &V, member: &K) -> Option<usize> {
        let search = self.search(score, member);
        search.found.map(|_| search.rank[0])
    }

    /// 0-based position of the node behind `id`.
    pub fn rank_of(&self, id: NodeId) -> Option<usize> {
        let (member, score) = self.arena.get(id)?.entry()?;
        self.rank(score, member)
    }

    /// Iterates from the node behind `id` (included) to the end.  Empty if the handle is stale.
    pub fn iter_from(&self, id: NodeId) -> Iter<K, V> {
        match self.rank_of(id) {
            Some(rank) => self.iter_at(id, rank),
            None => self.iter_at(self.head, self.len),
        }
    }

    /// Iterates from 0-based position `rank` to the end.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::RankedSkipList;
    ///
    /// let mut list = RankedSkipList::new();
    /// for i in 0..10 {
    ///     list.insert(i, i).unwrap();
    /// }
    /// let tail: Vec<_> = list.iter_from_rank(7).map(|(m, _)| *m).collect();
    /// assert_eq!(tail, vec![7, 8, 9]);
    /// assert_eq!(list.iter_from_rank(10).len(), 0);
    /// ```
    pub fn iter_from_rank(&self, rank: usize) -> Iter<K, V> {
        match self.get_by_rank(rank) {
            Some(id) => self.iter_at(id, rank),
            None => self.iter_at(self.head, self.len),
        }
    }

    fn iter_at(&self, id: NodeId, rank: usize) -> Iter<K, V> {
        let size = self.len - rank;
        Iter {
            arena: &self.arena,
            front: if size == 0 { None } else { Some(id) },
            back: if size == 0 { None } else { self.tail },
            size,
        }
    }

    /// The node at 0-based position `rank`, found by following spans.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::RankedSkipList;
    ///
    /// let mut list = RankedSkipList::new();
    /// for i in 0..100 {
    ///     list.insert(i * 2, i).unwrap();
    /// }
    /// let node = list.get_by_rank(42).unwrap();
    /// assert_eq!(list.entry(node), Some((&42, &84)));
    /// assert_eq!(list.get_by_rank(100), None);
    /// ```
    pub fn get_by_rank(&self, rank: usize) -> Option<NodeId> {
        if rank >= self.len {
            return None;
        }
        let target = rank + 1;
        let mut traversed = 0;
        let mut x = self.head;
        for level in (0..self.levels).rev() {
            loop {
                let link = self.arena[x].links()[level];
                match link.next {
                    Some(next) if traversed + link.span <= target => {
                        traversed += link.span;
                        x = next;
                    }
                    _ => break,
                }
            }
            if traversed == target {
                return Some(x);
            }
        }
        None
    }

    /// Removes every entry whose score is inside the interval, returning them in order.
    pub fn remove_range_by_score(&mut self, min: Bound<&V>, max: Bound<&V>) -> Vec<(K, V)> {
        let mut removed = Vec::new();
        if !self.contains_any_in_range(min, max) {
            return removed;
        }
        let mut frontier = vec![self.head; self.levels];
        let mut x = self.head;
        for level in (0..self.levels).rev() {
            while let Some(next) = self.arena[x].links()[level].next {
                match self.arena[next].score() {
                    Some(score) if !self.value_gte_min(score, min) => x = next,
                    _ => break,
                }
            }
            frontier[level] = x;
        }

        let mut cursor = self.arena[x].links()[0].next;
        while let Some(node) = cursor {
            match self.arena[node].score() {
                Some(score) if self.value_lte_max(score, max) => (),
                _ => break,
            }
            cursor = self.arena[node].links()[0].next;
            if let Some(entry) = self.unlink(node, &frontier) {
                removed.push(entry);
            }
        }
        removed
    }

    /// Removes the entries at 0-based positions `start..=end`, returning them in order.  `end` is
    /// clamped to the last position.
    pub fn remove_range_by_rank(&mut self, start: usize, end: usize) -> Vec<(K, V)> {
        let mut removed = Vec::new();
        if start >= self.len || start > end {
            return removed;
        }
        let end = end.min(self.len - 1);

        let mut frontier = vec![self.head; self.levels];
        let mut traversed = 0;
        let mut x = self.head;
        for level in (0..self.levels).rev() {
            loop {
                let link = self.arena[x].links()[level];
                match link.next {
                    Some(next) if traversed + link.span <= start => {
                        traversed += link.span;
                        x = next;
                    }
                    _ => break,
                }
            }
            frontier[level] = x;
        }

        let mut cursor = self.arena[x].links()[0].next;
        for _ in start..=end {
            let node = match cursor {
                Some(node) => node,
                None => break,
            };
            cursor = self.arena[node].links()[0].next;
            if let Some(entry) = self.unlink(node, &frontier) {
                removed.push(entry);
            }
        }
        removed
    }

    /// Swaps the whole contents of two lists, generators and comparators included.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Builds an independent copy with the same heights and spans.  The copy is built by walking
    /// level 0 once, never by searching.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if any node of the copy cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, SkipListError>
    where
        K: Clone,
        V: Clone,
        G: Clone,
    {
        let total = self.arena[self.head].height();
        let mut arena = NodeArena::with_capacity(total, self.len)?;
        let head = arena.head();

        // last node copied at each level, with its position
        let mut frontier = vec![(head, 0); total];
        let mut tail = None;
        let mut position = 0;
        let mut cursor = self.arena[self.head].links()[0].next;
        while let Some(id) = cursor {
            let source = &self.arena[id];
            let (member, score) = match source.entry() {
                Some(entry) => entry,
                None => return Err(SkipListError::Inconsistent("head reached at level 0".to_owned())),
            };
            position += 1;
            let copy = arena.alloc(SkipNode::new(
                member.clone(),
                score.clone(),
                allocate_links(source.height())?,
            ));
            for (level, last) in frontier.iter_mut().enumerate().take(source.height()) {
                arena[last.0].links_mut()[level] = Link {
                    next: Some(copy),
                    span: position - last.1,
                };
                *last = (copy, position);
            }
            arena[copy].set_prev(tail);
            tail = Some(copy);
            cursor = source.links()[0].next;
        }
        for (level, last) in frontier.iter().enumerate().take(self.levels) {
            arena[last.0].links_mut()[level].span = self.len - last.1;
        }

        Ok(RankedSkipList {
            arena,
            head,
            tail,
            len: self.len,
            levels: self.levels,
            level_generator: self.level_generator.clone(),
            score_cmp: Arc::clone(&self.score_cmp),
            member_cmp: Arc::clone(&self.member_cmp),
        })
    }

    /// Replaces the contents of `self` with a copy of `other`.  If the copy fails `self` is left
    /// untouched.
    pub fn assign_from(&mut self, other: &Self) -> Result<(), SkipListError>
    where
        K: Clone,
        V: Clone,
        G: Clone,
    {
        let mut copy = other.try_clone()?;
        self.swap(&mut copy);
        Ok(())
    }
}

impl<K, V, G> RankedSkipList<K, V, G> {
    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The tallest level currently holding a node (at least 1).
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// The tallest a node may be.
    pub fn max_level(&self) -> usize {
        self.arena[self.head].height()
    }

    /// The node holding the lowest entry.
    pub fn first(&self) -> Option<NodeId> {
        self.arena[self.head].links()[0].next
    }

    /// The node holding the highest entry.
    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.link(0)?.next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.prev()
    }

    pub fn node(&self, id: NodeId) -> Option<&SkipNode<K, V>> {
        self.arena.get(id)
    }

    /// The `(member, score)` held by `id`, or `None` if the handle is stale.
    pub fn entry(&self, id: NodeId) -> Option<(&K, &V)> {
        self.arena.get(id)?.entry()
    }

    /// Iterates over `(member, score)` entries in ascending order.
    pub fn iter(&self) -> Iter<K, V> {
        Iter {
            arena: &self.arena,
            front: self.first(),
            back: self.tail,
            size: self.len,
        }
    }
}

// ///////////////////////////////////////////////
// Internal methods
// ///////////////////////////////////////////////

impl<K, V, G> RankedSkipList<K, V, G>
where
    G: LevelGenerator,
{
    fn random_height(&mut self) -> usize {
        let max = self.arena[self.head].height();
        self.level_generator.random().max(1).min(max)
    }

    /// Orders the node behind `id` against `(score, member)`.  The head precedes everything.
    fn compare_node(&self, id: NodeId, score: &V, member: &K) -> Ordering {
        match self.arena[id].entry() {
            Some((m, s)) => (self.score_cmp)(s, score).then_with(|| (self.member_cmp)(m, member)),
            None => Ordering::Less,
        }
    }

    /// Walks from the top level down, recording at each level the last node strictly before the
    /// probe and the rank it sits at.
    fn search(&self, score: &V, member: &K) -> Search {
        let mut frontier = vec![self.head; self.levels];
        let mut rank = vec![0; self.levels];
        let mut found = None;

        let mut x = self.head;
        let mut traversed = 0;
        for level in (0..self.levels).rev() {
            loop {
                let link = self.arena[x].links()[level];
                let next = match link.next {
                    Some(next) => next,
                    None => break,
                };
                match self.compare_node(next, score, member) {
                    Ordering::Less => {
                        traversed += link.span;
                        x = next;
                    }
                    Ordering::Equal => {
                        if found.is_none() {
                            found = Some((next, level + 1));
                        }
                        break;
                    }
                    Ordering::Greater => break,
                }
            }
            frontier[level] = x;
            rank[level] = traversed;
        }
        Search {
            frontier,
            rank,
            found,
        }
    }

    /// Splices a new node in after the search frontier.  `links` decides its height; the arena
    /// must already have room for it.
    fn link_node(&mut self, mut search: Search, score: V, member: K, links: Vec<Link>) -> NodeId {
        let height = links.len();
        if height > self.levels {
            for level in self.levels..height {
                search.frontier.push(self.head);
                search.rank.push(0);
                self.arena[self.head].links_mut()[level] = Link {
                    next: None,
                    span: self.len,
                };
            }
            self.levels = height;
        }

        let id = self.arena.alloc(SkipNode::new(member, score, links));
        let insert_rank = search.rank[0];
        for level in 0..height {
            let pred = search.frontier[level];
            let pred_link = self.arena[pred].links()[level];
            let distance = insert_rank - search.rank[level];
            debug_assert!(pred_link.span >= distance);
            self.arena[id].links_mut()[level] = Link {
                next: pred_link.next,
                span: pred_link.span.saturating_sub(distance),
            };
            self.arena[pred].links_mut()[level] = Link {
                next: Some(id),
                span: distance + 1,
            };
        }
        for level in height..self.levels {
            self.arena[search.frontier[level]].links_mut()[level].span += 1;
        }

        let pred = search.frontier[0];
        self.arena[id].set_prev(if pred == self.head { None } else { Some(pred) });
        match self.arena[id].links()[0].next {
            Some(next) => self.arena[next].set_prev(Some(id)),
            None => self.tail = Some(id),
        }
        self.len += 1;
        id
    }

    /// Unlinks `node` given, for every level, the last node before it, and frees it.
    fn unlink(&mut self, node: NodeId, frontier: &[NodeId]) -> Option<(K, V)> {
        for level in 0..self.levels {
            let pred = frontier[level];
            let pred_link = self.arena[pred].links()[level];
            if pred_link.next == Some(node) {
                let node_link = self.arena[node].links()[level];
                self.arena[pred].links_mut()[level] = Link {
                    next: node_link.next,
                    span: pred_link.span + node_link.span - 1,
                };
            } else {
                debug_assert!(pred_link.span > 0);
                self.arena[pred].links_mut()[level].span = pred_link.span.saturating_sub(1);
            }
        }

        let next = self.arena[node].links()[0].next;
        let prev = self.arena[node].prev();
        match next {
            Some(next) => self.arena[next].set_prev(prev),
            None => self.tail = prev,
        }

        while self.levels > 1 && self.arena[self.head].links()[self.levels - 1].next.is_none() {
            self.arena[self.head].links_mut()[self.levels - 1] = Link::EMPTY;
            self.levels -= 1;
        }
        self.len -= 1;
        self.arena.free(node).and_then(SkipNode::into_entry)
    }

    fn is_valid_range(&self, min: Bound<&V>, max: Bound<&V>) -> bool {
        match (min, max) {
            (Bound::Included(a), Bound::Included(b)) => (self.score_cmp)(a, b) != Ordering::Greater,
            (Bound::Included(a), Bound::Excluded(b))
            | (Bound::Excluded(a), Bound::Included(b))
            | (Bound::Excluded(a), Bound::Excluded(b)) => (self.score_cmp)(a, b) == Ordering::Less,
            _ => true,
        }
    }

    fn value_gte_min(&self, value: &V, min: Bound<&V>) -> bool {
        match min {
            Bound::Included(m) => (self.score_cmp)(value, m) != Ordering::Less,
            Bound::Excluded(m) => (self.score_cmp)(value, m) == Ordering::Greater,
            Bound::Unbounded => true,
        }
    }

    fn value_lte_max(&self, value: &V, max: Bound<&V>) -> bool {
        match max {
            Bound::Included(m) => (self.score_cmp)(value, m) != Ordering::Greater,
            Bound::Excluded(m) => (self.score_cmp)(value, m) == Ordering::Less,
            Bound::Unbounded => true,
        }
    }

    /// Checks the integrity of the skiplist: level-0 order and back links, size, tail, the span
    /// of every link and the level count.
    pub fn check(&self) -> Result<(), SkipListError> {
        let inconsistent = |reason: String| Err(SkipListError::Inconsistent(reason));

        let head = match self.arena.get(self.head) {
            Some(head) if head.is_head() && head.prev().is_none() => head,
            _ => return inconsistent("head is missing or holds an entry".to_owned()),
        };
        if self.levels == 0 || self.levels > head.height() {
            return inconsistent(format!("{} levels for a head of {}", self.levels, head.height()));
        }

        let mut positions = HashMap::with_capacity(self.len);
        let mut count = 0;
        let mut prev: Option<NodeId> = None;
        let mut cursor = head.links()[0].next;
        while let Some(id) = cursor {
            let node = match self.arena.get(id) {
                Some(node) if !node.is_head() => node,
                _ => return inconsistent(format!("dangling level-0 link to {:?}", id)),
            };
            count += 1;
            if count > self.len {
                return inconsistent(format!("more than {} nodes on level 0", self.len));
            }
            if node.prev() != prev {
                return inconsistent(format!("node {} has the wrong back link", count));
            }
            if node.height() > self.levels {
                return inconsistent(format!("node {} is taller than the list", count));
            }
            if let (Some(p), Some((member, score))) = (prev, node.entry()) {
                if self.compare_node(p, score, member) != Ordering::Less {
                    return inconsistent(format!("node {} is out of order", count));
                }
            }
            positions.insert(id, count);
            prev = Some(id);
            cursor = node.links()[0].next;
        }
        if count != self.len {
            return inconsistent(format!("counted {} nodes, expected {}", count, self.len));
        }
        if prev != self.tail {
            return inconsistent("tail is not the last node".to_owned());
        }

        for level in 0..self.levels {
            let mut x = self.head;
            let mut position = 0;
            loop {
                let link = match self.arena.get(x).and_then(|n| n.link(level)) {
                    Some(link) => link,
                    None => return inconsistent(format!("node at {} lacks level {}", position, level)),
                };
                match link.next {
                    Some(next) => {
                        let next_position = match positions.get(&next) {
                            Some(&p) if p > position => p,
                            _ => return inconsistent(format!("bad link at level {}", level)),
                        };
                        if link.span != next_position - position {
                            return inconsistent(format!(
                                "span {} at level {} from {}, expected {}",
                                link.span,
                                level,
                                position,
                                next_position - position
                            ));
                        }
                        x = next;
                        position = next_position;
                    }
                    None => {
                        if link.span != self.len - position {
                            return inconsistent(format!(
                                "trailing span {} at level {} from {}, expected {}",
                                link.span,
                                level,
                                position,
                                self.len - position
                            ));
                        }
                        break;
                    }
                }
            }
        }
        if self.levels > 1 && head.links()[self.levels - 1].next.is_none() {
            return inconsistent(format!("top level {} is empty", self.levels));
        }
        if head.links()[self.levels..].iter().any(|l| *l != Link::EMPTY) {
            return inconsistent("head links above the top level are in use".to_owned());
        }
        Ok(())
    }
}

impl<K, V, G> RankedSkipList<K, V, G>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    /// Renders the internal structure, top level first, for debugging purposes.
    pub fn debug_structure(&self) -> String {
        let mut rows: Vec<String> = iter::repeat(String::new()).take(self.levels).collect();
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            let node = &self.arena[id];
            let label = format!("{:?}", node);
            let cells: Vec<String> = (0..self.levels)
                .map(|level| match node.link(level) {
                    Some(link) => format!("{} -{}-> ", label, link.span),
                    None => String::new(),
                })
                .collect();
            let width = cells.iter().map(String::len).max().unwrap_or(0);
            for (row, cell) in rows.iter_mut().zip(cells.iter()) {
                row.push_str(&format!("{:-<width$}", cell, width = width));
            }
            cursor = node.links()[0].next;
        }
        rows.reverse();
        rows.join("\n")
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<K, V> Default for RankedSkipList<K, V>
where
    K: Ord + 'static,
    V: Ord + 'static,
{
    fn default() -> Self {
        RankedSkipList::new()
    }
}

impl<K, V, G> Clone for RankedSkipList<K, V, G>
where
    K: Clone,
    V: Clone,
    G: LevelGenerator + Clone,
{
    /// # Panics
    ///
    /// Panics if the copy cannot be allocated; use `try_clone` to handle that case.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(list) => list,
            Err(e) => panic!("cannot clone skiplist: {}", e),
        }
    }
}

impl<K, V, G> PartialEq for RankedSkipList<K, V, G>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K, V, G> fmt::Debug for RankedSkipList<K, V, G>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, K, V, G> iter::IntoIterator for &'a RankedSkipList<K, V, G> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

// ///////////////////////////////////////////////
// Extra structs
// ///////////////////////////////////////////////

/// Double-ended iterator over `(member, score)` entries.
pub struct Iter<'a, K, V> {
    arena: &'a NodeArena<K, V>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    size: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.size == 0 {
            return None;
        }
        let node = self.arena.get(self.front?)?;
        self.front = node.link(0).and_then(|l| l.next);
        self.size -= 1;
        node.entry()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        if self.size == 0 {
            return None;
        }
        let node = self.arena.get(self.back?)?;
        self.back = node.prev();
        self.size -= 1;
        node.entry()
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

// /////////////////////////////////////////////////////////////////////////////////////////////////
// Tests
// /////////////////////////////////////////////////////////////////////////////////////////////////
