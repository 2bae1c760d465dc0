use std::hash::Hash;

use ahash::{HashMap, HashMapExt};
use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K, T> {
  key: K,
  item: T,
  next: Option<Index>,
  prev: Option<Index>,
}

/// A map that remembers the order in which its keys were last touched.
///
/// Nodes live in an arena and are threaded into a doubly linked list; the
/// head is the most recently used entry, the tail the least.
#[derive(Debug)]
pub(super) struct RecencyMap<K, T> {
  nodes: Arena<Node<K, T>>,
  lookup: HashMap<K, Index>,
  head: Option<Index>,
  tail: Option<Index>,
}

impl<K: Eq + Hash + Clone, T> RecencyMap<K, T> {
  pub fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::new(),
      head: None,
      tail: None,
    }
  }

  // Does not touch the arena or the lookup map.
  fn unlink(&mut self, index: Index) {
    let (prev, next) = {
      let node = &self.nodes[index];
      (node.prev, node.next)
    };

    match prev {
      Some(prev_idx) => self.nodes[prev_idx].next = next,
      None => self.head = next,
    }
    match next {
      Some(next_idx) => self.nodes[next_idx].prev = prev,
      None => self.tail = prev,
    }
  }

  fn link_front(&mut self, index: Index) {
    let old_head = self.head;
    self.nodes[index].next = old_head;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head {
      self.nodes[old_head].prev = Some(index);
    }
    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  pub fn len(&self) -> usize {
    self.lookup.len()
  }

  /// Returns the item for `key` and marks it most recently used.
  pub fn touch(&mut self, key: &K) -> Option<&T> {
    let index = *self.lookup.get(key)?;
    if self.head != Some(index) {
      self.unlink(index);
      self.link_front(index);
    }
    Some(&self.nodes[index].item)
  }

  /// Inserts or replaces `key` at the front. Returns the replaced item.
  pub fn insert(&mut self, key: K, item: T) -> Option<T> {
    if let Some(&index) = self.lookup.get(&key) {
      let previous = std::mem::replace(&mut self.nodes[index].item, item);
      if self.head != Some(index) {
        self.unlink(index);
        self.link_front(index);
      }
      return Some(previous);
    }

    let index = self.nodes.insert(Node {
      key: key.clone(),
      item,
      next: None,
      prev: None,
    });
    self.lookup.insert(key, index);
    self.link_front(index);
    None
  }

  pub fn remove(&mut self, key: &K) -> Option<T> {
    let index = self.lookup.remove(key)?;
    self.unlink(index);
    self.nodes.remove(index).map(|node| node.item)
  }

  /// Removes the least recently used entry.
  pub fn pop_back(&mut self) -> Option<(K, T)> {
    let tail = self.tail?;
    self.unlink(tail);
    let node = self.nodes.remove(tail)?;
    self.lookup.remove(&node.key);
    Some((node.key, node.item))
  }

  /// Removes the least recently used entry that passes `evictable`.
  pub fn pop_back_where(&mut self, evictable: impl Fn(&K, &T) -> bool) -> Option<(K, T)> {
    let mut current = self.tail;
    while let Some(index) = current {
      let node = &self.nodes[index];
      if evictable(&node.key, &node.item) {
        self.unlink(index);
        let node = self.nodes.remove(index)?;
        self.lookup.remove(&node.key);
        return Some((node.key, node.item));
      }
      current = self.nodes[index].prev;
    }
    None
  }

  pub fn drain(&mut self) -> Vec<(K, T)> {
    let mut drained = Vec::with_capacity(self.len());
    while let Some(entry) = self.pop_back() {
      drained.push(entry);
    }
    drained
  }

  #[cfg(test)]
  fn keys_front_to_back(&self) -> Vec<K> {
    let mut keys = Vec::new();
    let mut current = self.head;
    while let Some(index) = current {
      keys.push(self.nodes[index].key.clone());
      current = self.nodes[index].next;
    }
    keys
  }
}
