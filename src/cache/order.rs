//! Insertion Order Module
//!
//! Tracks the order in which keys were first inserted, for FIFO eviction.

use std::collections::VecDeque;

// == Insertion Order ==
/// Remembers keys in first-insertion order.
///
/// Keys are stored in a VecDeque where:
/// - Front = earliest inserted
/// - Back = most recently inserted
///
/// Re-inserting a tracked key keeps its position, and reads never move a
/// key, so eviction is first-in first-out rather than least-recently-used.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<String>,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Insert ==
    /// Appends a key unless it is already tracked.
    pub fn insert(&mut self, key: &str) {
        if !self.contains(key) {
            self.order.push_back(key.to_string());
        }
    }

    // == Remove ==
    /// Stops tracking a key.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Pop Oldest ==
    /// Returns and removes the earliest-inserted key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    // == Peek Oldest ==
    /// Returns the earliest-inserted key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    /// Iterates keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = InsertionOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
        assert_eq!(order.peek_oldest(), None);
    }

    #[test]
    fn test_pop_oldest_is_fifo() {
        let mut order = InsertionOrder::new();

        order.insert("key1");
        order.insert("key2");
        order.insert("key3");

        assert_eq!(order.pop_oldest(), Some("key1".to_string()));
        assert_eq!(order.pop_oldest(), Some("key2".to_string()));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut order = InsertionOrder::new();

        order.insert("a");
        order.insert("b");
        order.insert("a");

        assert_eq!(order.len(), 2);
        assert_eq!(order.peek_oldest(), Some(&"a".to_string()));
    }

    #[test]
    fn test_remove_then_insert_moves_to_back() {
        let mut order = InsertionOrder::new();

        order.insert("a");
        order.insert("b");
        order.remove("a");
        order.insert("a");

        let keys: Vec<&String> = order.iter().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut order = InsertionOrder::new();

        order.insert("key1");
        order.remove("nonexistent");

        assert_eq!(order.len(), 1);
        assert!(order.contains("key1"));
    }

    #[test]
    fn test_pop_empty() {
        let mut order = InsertionOrder::new();
        assert_eq!(order.pop_oldest(), None);
    }

    #[test]
    fn test_clear() {
        let mut order = InsertionOrder::new();
        order.insert("a");
        order.insert("b");
        order.clear();
        assert!(order.is_empty());
    }
}
