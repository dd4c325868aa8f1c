//! Fixed-capacity storage for the per-query search state of polygons.
//!
//! Nodes are looked up by [`PolygonRef`] through a chained hash table whose links are node
//! indices. The pool never grows: once [`NodePool::capacity`] nodes are in use, allocating a
//! node for a new polygon fails, which the search treats as a soft limit.

use std::ops::{Index, IndexMut};

use glam::Vec3A;

use crate::PolygonRef;

bitflags::bitflags! {
    /// The search state of a [`SearchNode`]. Empty while the node is unvisited.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(transparent)]
    pub struct NodeFlags: u8 {
        /// The node is in the open list.
        const OPEN = 1;
        /// The node has been expanded.
        const CLOSED = 2;
    }
}

/// Index of a [`SearchNode`] inside its [`NodePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// The slot of the node in the pool.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The search state of a single polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchNode {
    /// The position the search uses for this polygon. The midpoint of the portal it was
    /// first entered through, or the start position for the root.
    pub position: Vec3A,
    /// The accumulated cost from the start to [`SearchNode::position`].
    pub cost: f32,
    /// [`SearchNode::cost`] plus the heuristic estimate to the goal.
    pub total: f32,
    /// The node this one was reached from. `None` for the root.
    pub parent: Option<NodeIndex>,
    /// The search state.
    pub flags: NodeFlags,
    /// The polygon this node belongs to.
    pub polygon: PolygonRef,
    /// Position in the open list, only meaningful while [`NodeFlags::OPEN`] is set.
    pub(crate) heap_index: usize,
    /// Next node in the same hash bucket.
    next: Option<NodeIndex>,
}

impl SearchNode {
    fn new(polygon: PolygonRef, next: Option<NodeIndex>) -> Self {
        Self {
            position: Vec3A::ZERO,
            cost: 0.0,
            total: 0.0,
            parent: None,
            flags: NodeFlags::empty(),
            polygon,
            heap_index: 0,
            next,
        }
    }
}

/// A fixed-capacity hash table from [`PolygonRef`] to [`SearchNode`].
#[derive(Debug, Clone)]
pub struct NodePool {
    nodes: Vec<SearchNode>,
    /// Head of the chain of each hash bucket.
    buckets: Vec<Option<NodeIndex>>,
    capacity: usize,
}

impl NodePool {
    /// Creates a pool holding at least `max_nodes` nodes.
    ///
    /// The capacity is rounded up to the next power of two.
    pub fn new(max_nodes: usize) -> Self {
        let capacity = max_nodes
            .clamp(1, u32::MAX as usize / 2 + 1)
            .next_power_of_two();
        let bucket_count = (capacity / 4).max(1);
        Self {
            nodes: Vec::with_capacity(capacity),
            buckets: vec![None; bucket_count],
            capacity,
        }
    }

    /// The maximum number of nodes the pool can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of nodes currently in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is in use.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forgets all nodes. Keeps the allocated storage.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.buckets.fill(None);
    }

    #[inline]
    fn bucket(&self, polygon: PolygonRef) -> usize {
        hash_ref(polygon) as usize & (self.buckets.len() - 1)
    }

    /// Forgets all nodes and allocates an unvisited node for `root` in the first slot.
    ///
    /// Every pool has room for at least one node, so this cannot fail.
    pub fn reset(&mut self, root: PolygonRef) -> NodeIndex {
        self.clear();
        self.insert(root)
    }

    /// Returns the node of `polygon`, if one has been allocated since the last [`NodePool::clear`].
    pub fn find(&self, polygon: PolygonRef) -> Option<NodeIndex> {
        let mut next = self.buckets[self.bucket(polygon)];
        while let Some(index) = next {
            let node = &self[index];
            if node.polygon == polygon {
                return Some(index);
            }
            next = node.next;
        }
        None
    }

    /// Returns the node of `polygon`, allocating an unvisited one if there is none yet.
    ///
    /// Returns `None` if `polygon` has no node and the pool is full.
    pub fn get_or_allocate(&mut self, polygon: PolygonRef) -> Option<NodeIndex> {
        if let Some(index) = self.find(polygon) {
            return Some(index);
        }
        if self.nodes.len() >= self.capacity {
            return None;
        }
        Some(self.insert(polygon))
    }

    /// Appends a node for `polygon` to its bucket chain. The caller checks the capacity.
    fn insert(&mut self, polygon: PolygonRef) -> NodeIndex {
        let bucket = self.bucket(polygon);
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(SearchNode::new(polygon, self.buckets[bucket]));
        self.buckets[bucket] = Some(index);
        index
    }

    /// Returns the node at `index`, `None` if there is no node or `index` is `None`.
    #[inline]
    pub fn get(&self, index: Option<NodeIndex>) -> Option<&SearchNode> {
        self.nodes.get(index?.index())
    }
}

impl Index<NodeIndex> for NodePool {
    type Output = SearchNode;

    #[inline]
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.index()]
    }
}

impl IndexMut<NodeIndex> for NodePool {
    #[inline]
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index.index()]
    }
}

/// Integer hash spreading consecutive polygon references over the buckets.
#[inline]
fn hash_ref(polygon: PolygonRef) -> u32 {
    let mut a = polygon.0;
    a = a.wrapping_add(!(a << 15));
    a ^= a >> 10;
    a = a.wrapping_add(a << 3);
    a ^= a >> 6;
    a = a.wrapping_add(!(a << 11));
    a ^= a >> 16;
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_rounded_to_power_of_two() {
        assert_eq!(NodePool::new(100).capacity(), 128);
        assert_eq!(NodePool::new(64).capacity(), 64);
        assert_eq!(NodePool::new(0).capacity(), 1);
    }

    #[test]
    fn allocation_fails_only_when_full() {
        let mut pool = NodePool::new(100);
        let capacity = pool.capacity();
        let indices: Vec<_> = (0..capacity as u32)
            .map(|i| pool.get_or_allocate(PolygonRef(i * 7)).unwrap())
            .collect();
        assert_eq!(pool.len(), capacity);

        assert_eq!(pool.get_or_allocate(PolygonRef(1)), None);

        // Existing nodes are still returned when the pool is full.
        for (i, index) in indices.iter().enumerate() {
            let polygon = PolygonRef(i as u32 * 7);
            assert_eq!(pool.get_or_allocate(polygon), Some(*index));
            assert_eq!(pool[*index].polygon, polygon);
        }
    }

    #[test]
    fn new_nodes_are_unvisited() {
        let mut pool = NodePool::new(8);
        let index = pool.get_or_allocate(PolygonRef(3)).unwrap();
        let node = &pool[index];
        assert!(node.flags.is_empty());
        assert_eq!(node.parent, None);
        assert_eq!(node.polygon, PolygonRef(3));
    }

    #[test]
    fn colliding_polygons_get_distinct_nodes() {
        // A single bucket forces every node into the same chain.
        let mut pool = NodePool::new(4);
        assert_eq!(pool.buckets.len(), 1);
        let a = pool.get_or_allocate(PolygonRef(10)).unwrap();
        let b = pool.get_or_allocate(PolygonRef(20)).unwrap();
        let c = pool.get_or_allocate(PolygonRef(30)).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(pool.find(PolygonRef(10)), Some(a));
        assert_eq!(pool.find(PolygonRef(20)), Some(b));
        assert_eq!(pool.find(PolygonRef(30)), Some(c));
        assert_eq!(pool.find(PolygonRef(40)), None);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut pool = NodePool::new(16);
        for i in 0..16 {
            pool.get_or_allocate(PolygonRef(i)).unwrap();
        }
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.find(PolygonRef(3)), None);
        let index = pool.get_or_allocate(PolygonRef(3)).unwrap();
        assert_eq!(index.index(), 0);
        assert!(pool.nodes.capacity() >= 16);
    }

    #[test]
    fn reset_allocates_root_in_full_pool() {
        let mut pool = NodePool::new(1);
        let old = pool.get_or_allocate(PolygonRef(5)).unwrap();
        pool[old].flags = NodeFlags::CLOSED;
        assert_eq!(pool.get_or_allocate(PolygonRef(6)), None);

        let root = pool.reset(PolygonRef(6));
        assert_eq!(root.index(), 0);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.find(PolygonRef(6)), Some(root));
        assert_eq!(pool.find(PolygonRef(5)), None);
        assert!(pool[root].flags.is_empty());
        assert_eq!(pool.get_or_allocate(PolygonRef(6)), Some(root));
    }

    #[test]
    fn get_parent_index() {
        let mut pool = NodePool::new(8);
        let root = pool.get_or_allocate(PolygonRef(0)).unwrap();
        let child = pool.get_or_allocate(PolygonRef(1)).unwrap();
        pool[child].parent = Some(root);

        let parent = pool.get(pool[child].parent).unwrap();
        assert_eq!(parent.polygon, PolygonRef(0));
        assert_eq!(pool.get(pool[root].parent), None);
    }
}
