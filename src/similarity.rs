//! Similarity functions: the mapping from a key to the value it is sorted and
//! grouped by.

/// Maps a key to its *SimKey*.
///
/// Keys with equal SimKeys are "similar"; keys with close SimKeys are
/// "nearby". The mapping must be pure: the same key has to produce the same
/// SimKey on every call. A function that breaks this leaves the sorted index
/// out of order and later lookups will miss entries. This is not checked in
/// release builds.
///
/// Implemented for [`Identity`], for [`Batched`], and for every closure or
/// function `Fn(&K) -> S` with `S: Ord`.
pub trait Similarity<K> {
    /// The SimKey type.
    type Key: Ord;

    fn simkey(&self, key: &K) -> Self::Key;

    /// Maps a batch of keys at once, in order.
    ///
    /// Used when the index is built or extended in bulk. Override it when a
    /// batch can be mapped faster than one key at a time.
    fn map_simkeys(&self, keys: &[&K]) -> Vec<Self::Key> {
        keys.iter().map(|k| self.simkey(k)).collect()
    }
}

/// The default similarity: every key is its own SimKey.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Identity;

impl<K: Ord + Clone> Similarity<K> for Identity {
    type Key = K;

    #[inline]
    fn simkey(&self, key: &K) -> K {
        key.clone()
    }
}

impl<K, S, F> Similarity<K> for F
where
    S: Ord,
    F: Fn(&K) -> S,
{
    type Key = S;

    #[inline]
    fn simkey(&self, key: &K) -> S {
        self(key)
    }
}

/// A per-key similarity function paired with a bulk variant.
///
/// `bulk` receives keys in order and must return exactly one SimKey per key,
/// each equal to what `single` returns for that key.
#[derive(Clone, Copy, Debug)]
pub struct Batched<F, M> {
    single: F,
    bulk: M,
}

impl<F, M> Batched<F, M> {
    pub fn new(single: F, bulk: M) -> Self {
        Self { single, bulk }
    }
}

impl<K, S, F, M> Similarity<K> for Batched<F, M>
where
    S: Ord,
    F: Fn(&K) -> S,
    M: Fn(&[&K]) -> Vec<S>,
{
    type Key = S;

    #[inline]
    fn simkey(&self, key: &K) -> S {
        (self.single)(key)
    }

    fn map_simkeys(&self, keys: &[&K]) -> Vec<S> {
        let out = (self.bulk)(keys);
        debug_assert_eq!(
            out.len(),
            keys.len(),
            "bulk similarity must return one SimKey per key"
        );
        out
    }
}
