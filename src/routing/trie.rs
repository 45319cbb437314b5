//! Byte-wise prefix trie for literal routes.

use std::collections::BTreeMap;

/// Prefix tree keyed by string bytes.
#[derive(Debug)]
pub struct Trie<V> {
    root: TrieNode<V>,
    len: usize,
}

#[derive(Debug)]
struct TrieNode<V> {
    children: BTreeMap<u8, TrieNode<V>>,
    value: Option<V>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            value: None,
        }
    }
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mutable access to the value under `key`, inserting a default first.
    pub fn get_or_default(&mut self, key: &str) -> &mut V
    where
        V: Default,
    {
        let node = self.node_mut(key);
        if node.value.is_none() {
            self.len += 1;
        }
        let node = self.node_mut(key);
        node.value.get_or_insert_with(V::default)
    }

    /// Every stored key that is a prefix of `path`, as `(key length, value)`,
    /// longest first.
    pub fn prefixes(&self, path: &str) -> Vec<(usize, &V)> {
        let mut found = Vec::new();
        let mut node = &self.root;
        if let Some(value) = &node.value {
            found.push((0, value));
        }

        for (index, byte) in path.bytes().enumerate() {
            match node.children.get(&byte) {
                Some(child) => node = child,
                None => break,
            }
            if let Some(value) = &node.value {
                found.push((index + 1, value));
            }
        }

        found.reverse();
        found
    }

    /// All entries in byte order of their keys.
    pub fn entries(&self) -> Vec<(String, &V)> {
        let mut entries = Vec::with_capacity(self.len);
        let mut key = Vec::new();
        collect(&self.root, &mut key, &mut entries);
        entries
    }

    fn node_mut(&mut self, key: &str) -> &mut TrieNode<V> {
        let mut node = &mut self.root;
        for byte in key.bytes() {
            node = node.children.entry(byte).or_default();
        }
        node
    }
}

fn collect<'a, V>(node: &'a TrieNode<V>, key: &mut Vec<u8>, out: &mut Vec<(String, &'a V)>) {
    if let Some(value) = &node.value {
        out.push((String::from_utf8_lossy(key).into_owned(), value));
    }
    for (byte, child) in &node.children {
        key.push(*byte);
        collect(child, key, out);
        key.pop();
    }
}
