use std::fmt;

use crate::error::SkipListError;

// /////////////////////////////////////////////////////////////////////////////////////////////////
// NodeId
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// Handle to a node stored in a skiplist.
///
/// Handles are only meaningful for the list that produced them.  Once the node is removed the
/// handle goes stale: every lookup through it returns `None`, even after the slot is reused by a
/// newer node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u64,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u64) -> Self {
        NodeId { index, generation }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

// /////////////////////////////////////////////////////////////////////////////////////////////////
// Link
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// A forward link at one level of a node.
///
/// `span` is the number of level-0 steps from the owning node to `next`.  When `next` is `None`
/// the span counts the nodes remaining after the owning node, so the head of an empty level
/// spans the whole list and the last node spans nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub next: Option<NodeId>,
    pub span: usize,
}

impl Link {
    pub const EMPTY: Link = Link {
        next: None,
        span: 0,
    };
}

/// Allocates the link array for a node of the given height, every link empty.
pub(crate) fn allocate_links(height: usize) -> Result<Vec<Link>, SkipListError> {
    let mut links = Vec::new();
    links
        .try_reserve_exact(height)
        .map_err(|_| SkipListError::OutOfMemory)?;
    links.resize(height, Link::EMPTY);
    Ok(links)
}

// /////////////////////////////////////////////////////////////////////////////////////////////////
// SkipNode
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// SkipNodes make up the skiplist.  Each one holds a single `(member, score)` entry, except for
/// the head which holds nothing.
///
/// The height of a node is the length of its link array and never changes after creation.
/// `prev` points at the previous node on level 0 and is `None` for the first node; it is a
/// navigation aid only, the list owns every node.
///
/// Nodes are neither `Clone` nor `Copy`: only the list knows how to rebuild links when copying.
pub struct SkipNode<K, V> {
    entry: Option<(K, V)>,
    links: Vec<Link>,
    prev: Option<NodeId>,
}

impl<K, V> SkipNode<K, V> {
    /// Create a new head node reaching `total_levels`.
    pub(crate) fn head(links: Vec<Link>) -> Self {
        SkipNode {
            entry: None,
            links,
            prev: None,
        }
    }

    /// Create a new node holding `member` with `score`.  Its height is the length of `links`,
    /// which must all be empty.
    pub(crate) fn new(member: K, score: V, links: Vec<Link>) -> Self {
        debug_assert!(!links.is_empty());
        debug_assert!(links.iter().all(|l| *l == Link::EMPTY));
        SkipNode {
            entry: Some((member, score)),
            links,
            prev: None,
        }
    }

    /// Consumes the node returning the entry it contains.
    pub(crate) fn into_entry(self) -> Option<(K, V)> {
        self.entry
    }

    /// Returns `true` if the node is the head of the list.
    pub fn is_head(&self) -> bool {
        self.entry.is_none()
    }

    pub fn member(&self) -> Option<&K> {
        self.entry.as_ref().map(|e| &e.0)
    }

    pub fn score(&self) -> Option<&V> {
        self.entry.as_ref().map(|e| &e.1)
    }

    pub fn entry(&self) -> Option<(&K, &V)> {
        self.entry.as_ref().map(|e| (&e.0, &e.1))
    }

    /// How many levels the node reaches.
    pub fn height(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The link at `level`, or `None` if the node does not reach that level.
    pub fn link(&self, level: usize) -> Option<Link> {
        self.links.get(level).copied()
    }

    /// The level-0 predecessor, `None` for the first node and for the head.
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub(crate) fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    pub(crate) fn set_prev(&mut self, prev: Option<NodeId>) {
        self.prev = prev;
    }

    /// Overwrites the score.  Only valid when the new score keeps the node between its
    /// neighbours.
    pub(crate) fn set_score(&mut self, score: V) {
        if let Some(ref mut entry) = self.entry {
            entry.1 = score;
        }
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<K, V> fmt::Debug for SkipNode<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.entry {
            Some((ref member, ref score)) => write!(f, "[{:?}@{:?}]", member, score),
            None => write!(f, "[]"),
        }
    }
}
