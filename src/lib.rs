//! # simkey-dict
//!
//! A dictionary with exact-key lookup plus lookup by *similarity*.
//!
//! Every entry lives in two places: a `HashMap` for O(1) exact access, and a
//! sorted `Vec` of `(simkey, key)` tuples, where `simkey` is the result of a
//! caller-supplied similarity function. Similar keys (equal SimKeys) and nearby
//! keys (close SimKeys) are found by binary search over the sorted index.
//! Inserting or removing a key costs O(n) for the shift in the index; similarity
//! queries cost O(log n + k).
//!
//! ## Example
//!
//! ```rust
//! use simkey_dict::SimilarKeyDict;
//!
//! let mut dict = SimilarKeyDict::with_similarity(|k: &String| k.to_lowercase());
//! dict.insert("Cat".to_string(), 1);
//! dict.insert("cat".to_string(), 2);
//! dict.insert("Dog".to_string(), 3);
//!
//! assert_eq!(dict.get(&"cat".to_string()), Some(&2));
//! let similar = dict.get_similar_keys(&"CAT".to_string(), None);
//! assert_eq!(similar, vec!["Cat", "cat"]);
//! ```
//!
//! The structure is single-threaded and carries no internal locking. Mutation
//! requires `&mut self`, so the borrow checker already rules out mutating
//! while an iterator is live.

use std::borrow::Borrow;
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Index;

use tracing::{debug, warn};

mod error;
mod similarity;
mod string;

pub use error::{Error, Result};
pub use similarity::{Batched, Identity, Similarity};
pub use string::StringSimilarityDict;

// =============================================================================
// SimilarKeyDict
// =============================================================================

/// A map from `K` to `V` with an auxiliary index sorted by `(F::Key, K)`.
///
/// Invariants, holding after every mutation:
/// - `index.len() == map.len()`
/// - every key `k` in `map` has exactly one `(similarity(k), k)` in `index`
/// - `index` is strictly increasing under tuple order
pub struct SimilarKeyDict<K, V, F = Identity>
where
    F: Similarity<K>,
{
    similarity: F,
    map: HashMap<K, V>,
    index: Vec<(F::Key, K)>,
}

impl<K, V> SimilarKeyDict<K, V, Identity>
where
    K: Eq + Hash + Ord + Clone,
{
    /// Creates an empty dictionary where every key is its own SimKey.
    pub fn new() -> Self {
        Self::with_similarity(Identity)
    }
}

impl<K, V, F> SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    F: Similarity<K>,
{
    pub fn with_similarity(similarity: F) -> Self {
        Self {
            similarity,
            map: HashMap::new(),
            index: Vec::new(),
        }
    }

    pub fn with_capacity(similarity: F, capacity: usize) -> Self {
        Self {
            similarity,
            map: HashMap::with_capacity(capacity),
            index: Vec::with_capacity(capacity),
        }
    }

    /// Builds a dictionary from existing entries.
    ///
    /// The index is built once, with a single batched similarity call and one
    /// sort, instead of inserting entries one by one. Later duplicates of a key
    /// overwrite earlier ones.
    pub fn from_items<I>(similarity: F, items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let map: HashMap<K, V> = items.into_iter().collect();
        Self::from_map(similarity, map)
    }

    fn from_map(similarity: F, map: HashMap<K, V>) -> Self {
        let mut dict = Self {
            similarity,
            map,
            index: Vec::new(),
        };
        dict.rebuild_index();
        dict
    }

    fn rebuild_index(&mut self) {
        let keys: Vec<&K> = self.map.keys().collect();
        let simkeys = self.similarity.map_simkeys(&keys);
        let mut index: Vec<(F::Key, K)> = simkeys
            .into_iter()
            .zip(keys.into_iter().cloned())
            .collect();
        // Keys are unique, so tuples are too.
        index.sort_unstable();
        debug!(entries = index.len(), "rebuilt sorted index");
        self.index = index;
        debug_assert!(self.index_is_consistent());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The similarity function this dictionary sorts by.
    #[inline]
    pub fn similarity(&self) -> &F {
        &self.similarity
    }

    // -------------------------------------------------------------------------
    // Exact-key access
    // -------------------------------------------------------------------------

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_mut(key)
    }

    /// Like [`get`](Self::get), but an absent key is an error.
    pub fn try_get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).ok_or(Error::KeyNotFound)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Inserts or updates an entry, returning the previous value.
    ///
    /// Updating an existing key only replaces the value; the index is left
    /// untouched since the key itself did not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.map.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }

        let simkey = self.similarity.simkey(&key);
        match self.index_position(&simkey, &key) {
            Ok(pos) => {
                debug_assert!(false, "absent key already has an index entry");
                self.index[pos] = (simkey, key.clone());
            }
            Err(pos) => self.index.insert(pos, (simkey, key.clone())),
        }
        self.map.insert(key, value);
        None
    }

    /// Removes an entry, returning its value if the key was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        let simkey = self.similarity.simkey(key);
        match self.index_position(&simkey, key) {
            Ok(pos) => {
                self.index.remove(pos);
            }
            Err(_) => {
                // The similarity function returned a different SimKey than when
                // the key was inserted.
                warn!("index entry not found by SimKey, falling back to a linear scan");
                if let Some(pos) = self.index.iter().position(|(_, k)| k == key) {
                    self.index.remove(pos);
                }
            }
        }
        debug_assert_eq!(self.index.len(), self.map.len());
        Some(value)
    }

    /// Removes an entry; an absent key is an error.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        self.remove(key).map(drop).ok_or(Error::KeyNotFound)
    }

    /// Removes an entry and returns its value; an absent key is an error.
    pub fn pop(&mut self, key: &K) -> Result<V> {
        self.remove(key).ok_or(Error::KeyNotFound)
    }

    /// Removes an entry and returns its value, or `default` if absent.
    pub fn pop_or(&mut self, key: &K, default: V) -> V {
        self.remove(key).unwrap_or(default)
    }

    /// Removes and returns the entry that sorts last in the index.
    ///
    /// "Last" is the greatest `(simkey, key)` tuple, not the most recently
    /// inserted entry.
    pub fn pop_item(&mut self) -> Result<(K, V)> {
        let (_, key) = self.index.pop().ok_or(Error::Empty)?;
        match self.map.remove(&key) {
            Some(value) => Ok((key, value)),
            None => {
                debug_assert!(false, "index entry without a map entry");
                Err(Error::KeyNotFound)
            }
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.index.clear();
    }

    /// Inserts many entries.
    ///
    /// Existing keys have their value replaced. New keys are mapped with one
    /// batched similarity call and merged into the index with a single sort.
    pub fn update<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut fresh: Vec<K> = Vec::new();
        for (key, value) in items {
            match self.map.entry(key) {
                hash_map::Entry::Occupied(mut e) => {
                    e.insert(value);
                }
                hash_map::Entry::Vacant(e) => {
                    fresh.push(e.key().clone());
                    e.insert(value);
                }
            }
        }
        if fresh.is_empty() {
            return;
        }

        let refs: Vec<&K> = fresh.iter().collect();
        let simkeys = self.similarity.map_simkeys(&refs);
        self.index.reserve(fresh.len());
        self.index.extend(simkeys.into_iter().zip(fresh));
        // The existing prefix is already a sorted run; the stable sort merges it
        // with the appended tail.
        self.index.sort();
        debug!(
            entries = self.index.len(),
            "merged new keys into sorted index"
        );
        debug_assert!(self.index_is_consistent());
    }

    // -------------------------------------------------------------------------
    // Similarity queries
    // -------------------------------------------------------------------------

    /// Returns the keys whose SimKey equals the SimKey of `key`, in index
    /// order, at most `limit` of them.
    ///
    /// `key` does not have to be in the dictionary.
    pub fn get_similar_keys(&self, key: &K, limit: Option<usize>) -> Vec<&K> {
        self.similar_range(key, limit).map(|(_, k)| k).collect()
    }

    /// Like [`get_similar_keys`](Self::get_similar_keys), with values.
    pub fn get_similar_items(&self, key: &K, limit: Option<usize>) -> Vec<(&K, &V)> {
        self.similar_range(key, limit)
            .filter_map(|(_, k)| self.map.get_key_value(k))
            .collect()
    }

    fn similar_range(
        &self,
        key: &K,
        limit: Option<usize>,
    ) -> impl Iterator<Item = &(F::Key, K)> + '_ {
        let simkey = self.similarity.simkey(key);
        let start = self.lower_bound(&simkey);
        self.index[start..]
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .take_while(move |(sk, _)| *sk == simkey)
    }

    /// Returns a window of `count` keys around where `key` sorts.
    ///
    /// The window is centered on `key`'s position and shifted inwards when it
    /// would run past either end, so it always holds `min(count, len)` keys.
    pub fn get_nearby_keys(&self, key: &K, count: usize) -> Vec<&K> {
        let simkey = self.similarity.simkey(key);
        let pos = match self.index_position(&simkey, key) {
            Ok(pos) | Err(pos) => pos,
        };
        let len = self.index.len();
        let start = pos
            .saturating_sub(count / 2)
            .min(len.saturating_sub(count));
        let end = start.saturating_add(count).min(len);
        self.index[start..end].iter().map(|(_, k)| k).collect()
    }

    // -------------------------------------------------------------------------
    // Index search
    // -------------------------------------------------------------------------

    /// Exact position of `(simkey, key)`, or where it would be inserted.
    fn index_position(&self, simkey: &F::Key, key: &K) -> std::result::Result<usize, usize> {
        self.index
            .binary_search_by(|(sk, k)| sk.cmp(simkey).then_with(|| k.cmp(key)))
    }

    /// First position whose SimKey is not less than `simkey`.
    #[inline]
    fn lower_bound(&self, simkey: &F::Key) -> usize {
        self.index.partition_point(|(sk, _)| sk < simkey)
    }

    fn index_is_consistent(&self) -> bool {
        self.index.len() == self.map.len()
            && self.index.windows(2).all(|w| w[0] < w[1])
            && self.index.iter().all(|(_, k)| self.map.contains_key(k))
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// Entries in arbitrary (hash) order.
    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.map.iter()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, K, V> {
        self.map.keys()
    }

    pub fn values(&self) -> hash_map::Values<'_, K, V> {
        self.map.values()
    }

    pub fn values_mut(&mut self) -> hash_map::ValuesMut<'_, K, V> {
        self.map.values_mut()
    }

    /// Entries in index order: by SimKey, then by key.
    pub fn iter_sorted(&self) -> SortedIter<'_, K, V, F> {
        SortedIter {
            dict: self,
            inner: self.index.iter(),
        }
    }

    /// Keys in index order.
    pub fn sorted_keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.index.iter().map(|(_, k)| k)
    }

    /// `(simkey, key)` pairs in index order.
    pub fn sorted_index(&self) -> &[(F::Key, K)] {
        &self.index
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<K, V> Default for SimilarKeyDict<K, V, Identity>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Copies entries and rebuilds the index from them, so the copy and the
/// original can be mutated independently.
impl<K, V, F> Clone for SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    V: Clone,
    F: Similarity<K> + Clone,
{
    fn clone(&self) -> Self {
        Self::from_map(self.similarity.clone(), self.map.clone())
    }
}

impl<K, V, F> fmt::Debug for SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone + fmt::Debug,
    V: fmt::Debug,
    F: Similarity<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter_sorted()).finish()
    }
}

/// Two dictionaries are equal when they hold the same entries.
impl<K, V, F, G> PartialEq<SimilarKeyDict<K, V, G>> for SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    V: PartialEq,
    F: Similarity<K>,
    G: Similarity<K>,
{
    fn eq(&self, other: &SimilarKeyDict<K, V, G>) -> bool {
        self.map == other.map
    }
}

impl<K, V> FromIterator<(K, V)> for SimilarKeyDict<K, V, Identity>
where
    K: Eq + Hash + Ord + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_items(Identity, iter)
    }
}

impl<K, V, F> Extend<(K, V)> for SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    F: Similarity<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.update(iter);
    }
}

impl<'a, K, V, F> IntoIterator for &'a SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    F: Similarity<K>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

/// Panics if the key is absent, like `HashMap`.
impl<K, V, F> Index<&K> for SimilarKeyDict<K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    F: Similarity<K>,
{
    type Output = V;

    fn index(&self, key: &K) -> &V {
        match self.map.get(key) {
            Some(value) => value,
            None => panic!("key not found in SimilarKeyDict"),
        }
    }
}

/// Iterator over entries in index order. See [`SimilarKeyDict::iter_sorted`].
pub struct SortedIter<'a, K, V, F>
where
    F: Similarity<K>,
{
    dict: &'a SimilarKeyDict<K, V, F>,
    inner: std::slice::Iter<'a, (F::Key, K)>,
}

impl<'a, K, V, F> Iterator for SortedIter<'a, K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    F: Similarity<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (_, key) = self.inner.next()?;
        self.dict.map.get_key_value(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, F> DoubleEndedIterator for SortedIter<'a, K, V, F>
where
    K: Eq + Hash + Ord + Clone,
    F: Similarity<K>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let (_, key) = self.inner.next_back()?;
        self.dict.map.get_key_value(key)
    }
}


#[cfg(test)]
mod proptests;
