//! Binary min-heap of [`NodeIndex`]es ordered by [`SearchNode::total`](crate::SearchNode::total).
//!
//! The heap does not own the nodes. Every operation takes the [`NodePool`] the indices point
//! into and keeps the heap position stored in each node up to date, so a node whose total
//! changed can be repositioned with [`OpenList::fix`].

use crate::{NodeIndex, NodePool};

/// The frontier of a search.
#[derive(Debug, Clone, Default)]
pub struct OpenList {
    heap: Vec<NodeIndex>,
}

impl OpenList {
    /// Creates an empty open list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
        }
    }

    /// Removes all nodes.
    #[inline]
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Returns `true` if the open list holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The number of nodes in the open list.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns the node with the lowest total without removing it.
    #[inline]
    pub fn peek(&self) -> Option<NodeIndex> {
        self.heap.first().copied()
    }

    /// Inserts a node that is not yet in the open list.
    pub fn push(&mut self, pool: &mut NodePool, node: NodeIndex) {
        self.heap.push(node);
        self.bubble_up(pool, self.heap.len() - 1, node);
    }

    /// Removes and returns the node with the lowest total.
    pub fn pop(&mut self, pool: &mut NodePool) -> Option<NodeIndex> {
        let top = self.peek()?;
        let last = self.heap.pop()?;
        if !self.heap.is_empty() {
            self.trickle_down(pool, 0, last);
        }
        Some(top)
    }

    /// Restores the heap order after the total of `node` changed.
    /// `node` must be in the open list.
    pub fn fix(&mut self, pool: &mut NodePool, node: NodeIndex) {
        let index = pool[node].heap_index;
        debug_assert_eq!(self.heap.get(index), Some(&node));
        self.bubble_up(pool, index, node);
        let index = pool[node].heap_index;
        self.trickle_down(pool, index, node);
    }

    fn bubble_up(&mut self, pool: &mut NodePool, mut index: usize, node: NodeIndex) {
        let total = pool[node].total;
        while index > 0 {
            let parent_index = (index - 1) / 2;
            let parent = self.heap[parent_index];
            if pool[parent].total <= total {
                break;
            }
            self.place(pool, index, parent);
            index = parent_index;
        }
        self.place(pool, index, node);
    }

    fn trickle_down(&mut self, pool: &mut NodePool, mut index: usize, node: NodeIndex) {
        let total = pool[node].total;
        let len = self.heap.len();
        loop {
            let mut child_index = 2 * index + 1;
            if child_index >= len {
                break;
            }
            if child_index + 1 < len
                && pool[self.heap[child_index + 1]].total < pool[self.heap[child_index]].total
            {
                child_index += 1;
            }
            let child = self.heap[child_index];
            if total <= pool[child].total {
                break;
            }
            self.place(pool, index, child);
            index = child_index;
        }
        self.place(pool, index, node);
    }

    #[inline]
    fn place(&mut self, pool: &mut NodePool, index: usize, node: NodeIndex) {
        self.heap[index] = node;
        pool[node].heap_index = index;
    }
}
