//! Ordered map: a red-black tree of `(key, value)` pairs keyed by the first
//! element.

use core::fmt;
use core::iter::FusedIterator;

use crate::tree::{self, Comparator, FirstOfPair, Natural, RbTree};

/// Key-ordered map backed by [`RbTree`].
///
/// Keys are kept unique under the comparison policy `C`; iteration yields
/// entries in ascending key order. Lookup, insertion, and removal are
/// O(log n).
///
/// # Example
///
/// ```
/// use sylva_collections::TreeMap;
///
/// let mut ports = TreeMap::new();
/// ports.insert(443, "https");
/// ports.insert(22, "ssh");
/// ports.insert(80, "http");
///
/// assert_eq!(ports.get(&22), Some(&"ssh"));
/// let names: Vec<_> = ports.values().copied().collect();
/// assert_eq!(names, ["ssh", "http", "https"]);
/// ```
pub struct TreeMap<K, V, C = Natural>
where
    C: Comparator<K>,
{
    tree: RbTree<(K, V), FirstOfPair, C>,
}

impl<K: Ord, V> TreeMap<K, V, Natural> {
    /// Empty map with the default comparator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<K, V, C> Default for TreeMap<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C> TreeMap<K, V, C>
where
    C: Comparator<K>,
{
    /// Empty map ordering keys with `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(cmp),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Inserts `value` under `key`. An existing entry keeps its position;
    /// its value is replaced and returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.insert_unique((key, value)) {
            Ok(_) => None,
            Err((existing, (_, value))) => {
                Some(core::mem::replace(&mut self.tree.value_mut(existing).1, value))
            }
        }
    }

    /// Inserts only if `key` is absent; otherwise hands the pair back.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(), (K, V)> {
        match self.tree.insert_unique((key, value)) {
            Ok(_) => Ok(()),
            Err((_, pair)) => Err(pair),
        }
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.find(key).map(|id| &self.tree.value(id).1)
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.tree.find(key)?;
        Some(&mut self.tree.value_mut(id).1)
    }

    /// The value under `key`, inserting `default()` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let id = match self.tree.find(&key) {
            Some(id) => id,
            None => match self.tree.insert_unique((key, default())) {
                Ok(id) | Err((id, _)) => id,
            },
        };
        &mut self.tree.value_mut(id).1
    }

    /// Whether an entry with `key` exists.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.find(key).is_some()
    }

    /// Removes the entry under `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.tree.find(key)?;
        Some(self.tree.erase(id).1)
    }

    /// Entry with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|id| Self::entry(self.tree.value(id)))
    }

    /// Entry with the largest key.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|id| Self::entry(self.tree.value(id)))
    }

    /// First entry whose key is not less than `key`.
    #[must_use]
    pub fn lower_bound(&self, key: &K) -> Option<(&K, &V)> {
        self.tree
            .lower_bound(key)
            .map(|id| Self::entry(self.tree.value(id)))
    }

    /// First entry whose key is strictly greater than `key`.
    #[must_use]
    pub fn upper_bound(&self, key: &K) -> Option<(&K, &V)> {
        self.tree
            .upper_bound(key)
            .map(|id| Self::entry(self.tree.value(id)))
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Iterates keys in ascending order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates values in ascending key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.iter().map(|(_, v)| v)
    }

    fn entry(pair: &(K, V)) -> (&K, &V) {
        (&pair.0, &pair.1)
    }
}

/// Borrowing iterator over a [`TreeMap`], in ascending key order.
pub struct Iter<'a, K, V, C>
where
    C: Comparator<K>,
{
    inner: tree::Iter<'a, (K, V), FirstOfPair, C>,
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C>
where
    C: Comparator<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        self.inner.next().map(|pair| (&pair.0, &pair.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C> DoubleEndedIterator for Iter<'_, K, V, C>
where
    C: Comparator<K>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|pair| (&pair.0, &pair.1))
    }
}

impl<K, V, C> ExactSizeIterator for Iter<'_, K, V, C> where C: Comparator<K> {}
impl<K, V, C> FusedIterator for Iter<'_, K, V, C> where C: Comparator<K> {}

impl<K, V, C> Clone for Iter<'_, K, V, C>
where
    C: Comparator<K>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a TreeMap<K, V, C>
where
    C: Comparator<K>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, C> Clone for TreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K, V, C> PartialEq for TreeMap<K, V, C>
where
    K: PartialEq,
    V: PartialEq,
    C: Comparator<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, V, C> fmt::Debug for TreeMap<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C> Extend<(K, V)> for TreeMap<K, V, C>
where
    C: Comparator<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }
}

impl<K, V, C> FromIterator<(K, V)> for TreeMap<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        let mut map = Self::default();
        map.extend(entries);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_and_returns_the_old_value() {
        let mut map = TreeMap::new();
        assert_eq!(map.insert("k", 1), None);
        assert_eq!(map.insert("k", 2), Some(1));
        assert_eq!(map.get(&"k"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn try_insert_rejects_duplicates() {
        let mut map = TreeMap::new();
        map.insert(1, "a");
        assert_eq!(map.try_insert(1, "b"), Err((1, "b")));
        assert_eq!(map.get(&1), Some(&"a"));
    }

    #[test]
    fn get_or_insert_with_is_the_indexing_operation() {
        let mut map: TreeMap<&str, Vec<i32>> = TreeMap::new();
        map.get_or_insert_with("list", Vec::new).push(1);
        map.get_or_insert_with("list", Vec::new).push(2);
        assert_eq!(map.get(&"list"), Some(&vec![1, 2]));
    }

    #[test]
    fn iteration_is_key_ordered() {
        let map: TreeMap<i32, char> = [(3, 'c'), (1, 'a'), (2, 'b')].into_iter().collect();
        let entries: Vec<(i32, char)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries, vec![(1, 'a'), (2, 'b'), (3, 'c')]);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn bounds_and_extremes() {
        let map: TreeMap<i32, ()> = [(10, ()), (20, ()), (30, ())].into_iter().collect();
        assert_eq!(map.first().map(|(k, ())| *k), Some(10));
        assert_eq!(map.last().map(|(k, ())| *k), Some(30));
        assert_eq!(map.lower_bound(&25).map(|(k, ())| *k), Some(30));
        assert_eq!(map.upper_bound(&30), None);
    }

    #[test]
    fn remove_roundtrip() {
        let mut map = TreeMap::new();
        for i in 0..32 {
            map.insert(i, i * 10);
        }
        for i in (0..32).rev() {
            assert_eq!(map.remove(&i), Some(i * 10));
        }
        assert!(map.is_empty());
        assert_eq!(map.remove(&0), None);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a: TreeMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
        let b: TreeMap<i32, i32> = [(2, 20), (1, 10)].into_iter().collect();
        assert!(a == b);
        assert_eq!(format!("{a:?}"), "{1: 10, 2: 20}");
    }
}
