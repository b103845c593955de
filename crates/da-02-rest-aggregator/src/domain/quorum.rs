//! # Quorum Tally
//!
//! Groups responses by a key and reports when a group reaches the threshold.
//! Used by the reader (key = content hash) and the writer
//! (key = `(hash, expiration)`).

use std::collections::HashMap;
use std::hash::Hash;

/// Responses grouped by key, with a fixed quorum threshold.
#[derive(Debug)]
pub struct QuorumTally<K, V> {
    threshold: usize,
    groups: HashMap<K, Vec<V>>,
    order: Vec<K>,
}

impl<K: Eq + Hash + Clone, V> QuorumTally<K, V> {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Add a response; returns the group's new size.
    pub fn add(&mut self, key: K, value: V) -> usize {
        let group = self.groups.entry(key.clone()).or_insert_with(|| {
            self.order.push(key);
            Vec::new()
        });
        group.push(value);
        group.len()
    }

    pub fn count(&self, key: &K) -> usize {
        self.groups.get(key).map_or(0, Vec::len)
    }

    pub fn reached(&self, key: &K) -> bool {
        self.count(key) >= self.threshold
    }

    pub fn members(&self, key: &K) -> &[V] {
        self.groups.get(key).map_or(&[], Vec::as_slice)
    }

    /// Keys whose group reached the threshold, in first-seen order.
    pub fn quorum_keys(&self) -> Vec<&K> {
        self.order.iter().filter(|k| self.reached(k)).collect()
    }

    /// Size of the largest group.
    pub fn largest(&self) -> usize {
        self.groups.values().map(Vec::len).max().unwrap_or(0)
    }

    /// True when no group can reach the threshold even if every one of the
    /// `outstanding` responses joined the largest group.
    pub fn unreachable(&self, outstanding: usize) -> bool {
        self.largest() + outstanding < self.threshold
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
