//! Slot storage for skiplist nodes.
//!
//! Nodes refer to each other through `NodeId`s instead of pointers.  Slot 0 always holds the
//! head.  Freed slots are recycled through a free list and their generation is bumped so stale
//! handles never resolve to the node that reused the slot.

use std::ops::{Index, IndexMut};

use crate::error::SkipListError;
use crate::skipnode::{allocate_links, NodeId, SkipNode};

struct Slot<K, V> {
    generation: u64,
    node: Option<SkipNode<K, V>>,
}

pub(crate) struct NodeArena<K, V> {
    slots: Vec<Slot<K, V>>,
    free_list: Vec<usize>,
}

impl<K, V> NodeArena<K, V> {
    /// Creates an arena holding only a head node of `total_levels`, with room for `capacity`
    /// further nodes.
    pub fn with_capacity(total_levels: usize, capacity: usize) -> Result<Self, SkipListError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity + 1)
            .map_err(|_| SkipListError::OutOfMemory)?;
        slots.push(Slot {
            generation: 0,
            node: Some(SkipNode::head(allocate_links(total_levels)?)),
        });
        Ok(NodeArena {
            slots,
            free_list: Vec::new(),
        })
    }

    pub fn head(&self) -> NodeId {
        NodeId::new(0, 0)
    }

    /// Makes sure the next `alloc` will not need to grow the slot vector.
    pub fn reserve(&mut self) -> Result<(), SkipListError> {
        if self.free_list.is_empty() {
            self.slots
                .try_reserve(1)
                .map_err(|_| SkipListError::OutOfMemory)?;
        }
        Ok(())
    }

    pub fn alloc(&mut self, node: SkipNode<K, V>) -> NodeId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len();
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    /// Removes a node, invalidating every handle to it.  The head cannot be freed.
    pub fn free(&mut self, id: NodeId) -> Option<SkipNode<K, V>> {
        if id.index() == 0 || self.get(id).is_none() {
            return None;
        }
        let slot = &mut self.slots[id.index()];
        slot.generation += 1;
        let node = slot.node.take();
        self.free_list.push(id.index());
        node
    }

    pub fn get(&self, id: NodeId) -> Option<&SkipNode<K, V>> {
        match self.slots.get(id.index()) {
            Some(slot) if slot.generation == id.generation() => slot.node.as_ref(),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SkipNode<K, V>> {
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.generation == id.generation() => slot.node.as_mut(),
            _ => None,
        }
    }
}

/// Indexing is for handles the list itself keeps in its links; a stale one there means the
/// list is corrupt, so it panics.
impl<K, V> Index<NodeId> for NodeArena<K, V> {
    type Output = SkipNode<K, V>;

    fn index(&self, id: NodeId) -> &SkipNode<K, V> {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node handle {:?}", id),
        }
    }
}

impl<K, V> IndexMut<NodeId> for NodeArena<K, V> {
    fn index_mut(&mut self, id: NodeId) -> &mut SkipNode<K, V> {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node handle {:?}", id),
        }
    }
}
