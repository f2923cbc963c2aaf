//! Nested key tree backing a memo cache.
//!
//! ## Architecture
//!
//! ```text
//!   depth = 2, entries (1,1) (1,2) (2,1)
//!
//!   root ─► Branch { 1 ─► Branch { 1 ─► Leaf(v11)
//!                                  2 ─► Leaf(v12) }
//!                    2 ─► Branch { 1 ─► Leaf(v21) } }
//!
//!   remove_prefix([1])  drops the whole `1` subtree
//!   remove_prefix([])   drops the root
//! ```
//!
//! Each level is an `FxHashMap<KeySlot, Node<V>>`. Object keys are held
//! weakly (see [`crate::key`]); `purge` drops entries whose object is gone.
//!
//! ## Core Operations
//!
//! | Operation       | Description                               | Complexity      |
//! |-----------------|-------------------------------------------|-----------------|
//! | `get`           | Walk the full path, return the leaf       | O(depth)        |
//! | `insert`        | Walk/create the path, write the leaf      | O(depth)        |
//! | `remove_prefix` | Detach the subtree under a partial path   | O(prefix)       |
//! | `purge`         | Drop dead object keys and empty branches  | O(nodes)        |
//! | `len`           | Count reachable leaves                    | O(nodes)        |
//!
//! The tree is not synchronized; [`MemoCache`](crate::memo::MemoCache)
//! wraps it in a mutex.

use rustc_hash::FxHashMap;

use crate::key::KeySlot;

type Level<V> = FxHashMap<KeySlot, Node<V>>;

#[derive(Debug)]
enum Node<V> {
    Branch(Level<V>),
    Leaf(V),
}

impl<V> Node<V> {
    fn empty_branch() -> Self {
        Node::Branch(Level::default())
    }

    /// Returns this node's level, turning a stray leaf into an empty branch.
    fn level_mut(&mut self) -> &mut Level<V> {
        if let Node::Leaf(_) = self {
            *self = Node::empty_branch();
        }
        match self {
            Node::Branch(level) => level,
            Node::Leaf(_) => unreachable!(),
        }
    }

    fn into_leaf(self) -> Option<V> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }
}

/// Fixed-depth tree of weak-keyed levels.
#[derive(Debug)]
pub(crate) struct KeyTree<V> {
    root: Option<Node<V>>,
    depth: usize,
}

impl<V> KeyTree<V> {
    /// Creates an empty tree with `depth` keyed levels.
    pub(crate) fn new(depth: usize) -> Self {
        Self { root: None, depth }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the leaf at `path`, if every level on the way exists.
    pub(crate) fn get(&self, path: &[KeySlot]) -> Option<&V> {
        debug_assert_eq!(path.len(), self.depth);
        let mut node = self.root.as_ref()?;
        for key in path {
            match node {
                Node::Branch(level) => node = level.get(key)?,
                Node::Leaf(_) => return None,
            }
        }
        match node {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    /// Writes `value` at `path`, creating missing levels. Only the final
    /// level receives a leaf. Returns the value it replaced.
    pub(crate) fn insert(&mut self, path: Vec<KeySlot>, value: V) -> Option<V> {
        debug_assert_eq!(path.len(), self.depth);
        let mut keys = path.into_iter();
        let Some(mut key) = keys.next() else {
            return self.root.replace(Node::Leaf(value)).and_then(Node::into_leaf);
        };

        let mut level = self.root.get_or_insert_with(Node::empty_branch).level_mut();
        for next in keys {
            level = level.entry(key).or_insert_with(Node::empty_branch).level_mut();
            key = next;
        }
        level.insert(key, Node::Leaf(value)).and_then(Node::into_leaf)
    }

    /// Detaches everything under `prefix`. An empty prefix clears the tree.
    ///
    /// Returns `false` when the path does not exist.
    pub(crate) fn remove_prefix(&mut self, prefix: &[KeySlot]) -> bool {
        debug_assert!(prefix.len() <= self.depth);
        let Some((last, path)) = prefix.split_last() else {
            return self.root.take().is_some();
        };
        let Some(mut node) = self.root.as_mut() else {
            return false;
        };
        for key in path {
            node = match node {
                Node::Branch(level) => match level.get_mut(key) {
                    Some(child) => child,
                    None => return false,
                },
                Node::Leaf(_) => return false,
            };
        }
        match node {
            Node::Branch(level) => level.remove(last).is_some(),
            Node::Leaf(_) => false,
        }
    }

    /// Drops every entry.
    pub(crate) fn clear(&mut self) {
        self.root = None;
    }

    /// Removes entries keyed by dead objects, plus branches left empty.
    ///
    /// Returns the number of dead keys removed (each may have carried a
    /// whole subtree).
    pub(crate) fn purge(&mut self) -> usize {
        let Some(Node::Branch(level)) = self.root.as_mut() else {
            return 0;
        };
        let removed = purge_level(level);
        if level.is_empty() {
            self.root = None;
        }
        removed
    }

    /// Number of leaves reachable through live keys.
    pub(crate) fn len(&self) -> usize {
        self.root.as_ref().map_or(0, count_leaves)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        fn walk<V>(node: &Node<V>, remaining: usize) {
            match node {
                Node::Leaf(_) => assert_eq!(remaining, 0, "leaf above the final level"),
                Node::Branch(level) => {
                    assert!(remaining > 0, "branch at the final level");
                    for child in level.values() {
                        walk(child, remaining - 1);
                    }
                },
            }
        }
        if let Some(root) = &self.root {
            walk(root, self.depth);
        }
    }
}

fn purge_level<V>(level: &mut Level<V>) -> usize {
    let mut removed = 0;
    level.retain(|key, node| {
        if !key.is_live() {
            removed += 1;
            return false;
        }
        match node {
            Node::Branch(child) => {
                removed += purge_level(child);
                !child.is_empty()
            },
            Node::Leaf(_) => true,
        }
    });
    removed
}

fn count_leaves<V>(node: &Node<V>) -> usize {
    match node {
        Node::Leaf(_) => 1,
        Node::Branch(level) => level
            .iter()
            .filter(|(key, _)| key.is_live())
            .map(|(_, child)| count_leaves(child))
            .sum(),
    }
}
