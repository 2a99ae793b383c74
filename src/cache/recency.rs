//! Recency Index Module
//!
//! Doubly linked recency ordering plus a key lookup, giving O(1) insertion,
//! promotion, and removal of any entry.

use std::collections::HashMap;

use crate::error::{CacheError, Result};

// == Handle ==
/// Position of an entry in the index.
///
/// A handle stays valid until its entry is removed. The slot may then be
/// reused by a later insertion, so handles must not be kept across removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

struct Node<T> {
    key: String,
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency Index ==
/// Tracks entries from most recently used to least recently used.
///
/// - Front (head) = Most recently used
/// - Back (tail) = Least recently used, the next eviction candidate
///
/// Nodes live in a slot arena linked by index; freed slots are recycled.
pub struct RecencyIndex<T> {
    nodes: Vec<Option<Node<T>>>,
    lookup: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
}

impl<T> RecencyIndex<T> {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty index with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            free: Vec::new(),
        }
    }

    // == Lookup ==
    /// Returns the handle of `key` if it is tracked.
    pub fn find(&self, key: &str) -> Option<Handle> {
        self.lookup.get(key).copied().map(Handle)
    }

    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup.contains_key(key)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.node(handle.0).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.nodes
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .map(|node| &mut node.value)
    }

    pub fn key(&self, handle: Handle) -> Option<&str> {
        self.node(handle.0).map(|node| node.key.as_str())
    }

    // == Push Front ==
    /// Inserts a new most recently used entry.
    ///
    /// Fails with `KeyExists` if `key` is already tracked; the caller is
    /// expected to check with [`find`](Self::find) first.
    pub fn push_front(&mut self, key: String, value: T) -> Result<Handle> {
        if self.lookup.contains_key(&key) {
            return Err(CacheError::KeyExists(key));
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.link_front(idx);
        self.lookup.insert(key, idx);

        Ok(Handle(idx))
    }

    // == Move To Front ==
    /// Marks an entry as most recently used. No-op if already at the front.
    pub fn move_to_front(&mut self, handle: Handle) {
        let idx = handle.0;
        if self.head == Some(idx) || self.node(idx).is_none() {
            return;
        }

        self.unlink(idx);
        self.link_front(idx);
    }

    // == Remove ==
    /// Removes an arbitrary entry, returning its key and value.
    pub fn remove(&mut self, handle: Handle) -> Option<(String, T)> {
        let idx = handle.0;
        self.node(idx)?;

        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.lookup.remove(&node.key);
        self.free.push(idx);

        Some((node.key, node.value))
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    ///
    /// Returns None if the index is empty.
    pub fn pop_back(&mut self) -> Option<(String, T)> {
        let tail = self.tail?;
        self.remove(Handle(tail))
    }

    /// Returns the least recently used entry without removing it.
    pub fn back(&self) -> Option<Handle> {
        self.tail.map(Handle)
    }

    /// Returns the most recently used entry.
    pub fn front(&self) -> Option<Handle> {
        self.head.map(Handle)
    }

    // == Length ==
    /// Returns the number of tracked entries.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    // == Keys ==
    /// Iterates over tracked keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lookup.keys().map(String::as_str)
    }

    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            index: self,
            cursor: self.head,
        }
    }

    /// Mutable access to every value, in no particular order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.nodes.iter_mut().flatten().map(|node| &mut node.value)
    }

    // == Drain ==
    /// Removes every entry, returning them from most to least recently used.
    pub fn drain(&mut self) -> Vec<(String, T)> {
        let mut drained = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match self.nodes.get_mut(idx).and_then(Option::take) {
                Some(node) => {
                    cursor = node.next;
                    drained.push((node.key, node.value));
                }
                None => break,
            }
        }

        self.nodes.clear();
        self.lookup.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;

        drained
    }

    // == Internal Linking ==
    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }

        match old_head.and_then(|h| self.nodes[h].as_mut()) {
            Some(head) => head.prev = Some(idx),
            None => self.tail = Some(idx),
        }

        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.node(idx).map(|n| (n.prev, n.next)) else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.nodes[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(n) => {
                if let Some(node) = self.nodes[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }
}

impl<T> Default for RecencyIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for RecencyIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(key, _)| key))
            .finish()
    }
}

// == Iterator ==
/// Recency-ordered iterator over `(key, value)` pairs.
pub struct Iter<'a, T> {
    index: &'a RecencyIndex<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (&'a str, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.index.node(self.cursor?)?;
        self.cursor = node.next;
        Some((node.key.as_str(), &node.value))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn order<T>(index: &RecencyIndex<T>) -> Vec<&str> {
        index.iter().map(|(k, _)| k).collect()
    }

    fn filled(keys: &[&str]) -> RecencyIndex<u32> {
        let mut index = RecencyIndex::new();
        for (i, key) in keys.iter().enumerate() {
            index.push_front(key.to_string(), i as u32).unwrap();
        }
        index
    }

    #[test]
    fn test_index_new() {
        let index: RecencyIndex<u32> = RecencyIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.back().is_none());
        assert!(index.front().is_none());
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let index = filled(&["a", "b", "c"]);

        assert_eq!(index.len(), 3);
        assert_eq!(order(&index), vec!["c", "b", "a"]);
        assert_eq!(index.key(index.back().unwrap()), Some("a"));
        assert_eq!(index.key(index.front().unwrap()), Some("c"));
    }

    #[test]
    fn test_push_front_rejects_duplicate() {
        let mut index = filled(&["a"]);

        let result = index.push_front("a".to_string(), 9);
        assert_eq!(result, Err(CacheError::KeyExists("a".to_string())));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(index.find("a").unwrap()), Some(&0));
    }

    #[test]
    fn test_move_to_front() {
        let mut index = filled(&["a", "b", "c"]);

        let a = index.find("a").unwrap();
        index.move_to_front(a);
        assert_eq!(order(&index), vec!["a", "c", "b"]);

        // Already at front
        index.move_to_front(a);
        assert_eq!(order(&index), vec!["a", "c", "b"]);

        // Middle entry
        let c = index.find("c").unwrap();
        index.move_to_front(c);
        assert_eq!(order(&index), vec!["c", "a", "b"]);
        assert_eq!(index.key(index.back().unwrap()), Some("b"));
    }

    #[test]
    fn test_pop_back() {
        let mut index = filled(&["a", "b", "c"]);

        assert_eq!(index.pop_back(), Some(("a".to_string(), 0)));
        assert_eq!(index.pop_back(), Some(("b".to_string(), 1)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.pop_back(), Some(("c".to_string(), 2)));
        assert_eq!(index.pop_back(), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_arbitrary() {
        let mut index = filled(&["a", "b", "c"]);

        let b = index.find("b").unwrap();
        assert_eq!(index.remove(b), Some(("b".to_string(), 1)));
        assert_eq!(order(&index), vec!["c", "a"]);
        assert!(!index.contains("b"));

        // Removing again through the stale handle is a no-op
        assert_eq!(index.remove(b), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_remove_head_and_tail() {
        let mut index = filled(&["a", "b", "c"]);

        let head = index.front().unwrap();
        index.remove(head);
        assert_eq!(order(&index), vec!["b", "a"]);

        let tail = index.back().unwrap();
        index.remove(tail);
        assert_eq!(order(&index), vec!["b"]);
        assert_eq!(index.front(), index.back());
    }

    #[test]
    fn test_slots_are_recycled() {
        let mut index = filled(&["a", "b"]);

        index.pop_back();
        index.push_front("c".to_string(), 2).unwrap();

        assert_eq!(index.nodes.len(), 2);
        assert_eq!(order(&index), vec!["c", "b"]);
    }

    #[test]
    fn test_get_mut_changes_value_in_place() {
        let mut index = filled(&["a", "b"]);

        let a = index.find("a").unwrap();
        *index.get_mut(a).unwrap() = 42;

        assert_eq!(index.get(a), Some(&42));
        assert_eq!(order(&index), vec!["b", "a"]);
    }

    #[test]
    fn test_drain_returns_all_in_recency_order() {
        let mut index = filled(&["a", "b", "c"]);

        let drained: Vec<String> = index.drain().into_iter().map(|(k, _)| k).collect();
        assert_eq!(drained, vec!["c", "b", "a"]);
        assert!(index.is_empty());
        assert!(index.front().is_none());

        // Usable after drain
        index.push_front("d".to_string(), 3).unwrap();
        assert_eq!(order(&index), vec!["d"]);
    }

    #[test]
    fn test_keys_cover_all_entries() {
        let index = filled(&["x", "y", "z"]);

        let mut keys: Vec<&str> = index.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }
}
