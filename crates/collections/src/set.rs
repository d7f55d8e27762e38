//! Ordered set: a red-black tree whose values are their own keys.

use core::fmt;

use crate::tree::{self, Comparator, Identity, Natural, RbTree};

/// Key-ordered set backed by [`RbTree`].
///
/// Elements are unique under the comparison policy `C` and iterate in
/// ascending order. Membership, insertion, and removal are O(log n).
///
/// # Example
///
/// ```
/// use sylva_collections::TreeSet;
///
/// let mut primes = TreeSet::new();
/// for p in [7, 2, 5, 3, 2] {
///     primes.insert(p);
/// }
///
/// assert_eq!(primes.len(), 4);
/// assert_eq!(primes.iter().copied().collect::<Vec<_>>(), [2, 3, 5, 7]);
/// ```
pub struct TreeSet<T, C = Natural>
where
    C: Comparator<T>,
{
    tree: RbTree<T, Identity, C>,
}

/// Borrowing iterator over a [`TreeSet`], in ascending order.
pub type Iter<'a, T, C = Natural> = tree::Iter<'a, T, Identity, C>;

impl<T: Ord> TreeSet<T, Natural> {
    /// Empty set with the default comparator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<T, C> Default for TreeSet<T, C>
where
    C: Comparator<T> + Default,
{
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T, C> TreeSet<T, C>
where
    C: Comparator<T>,
{
    /// Empty set ordering elements with `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(cmp),
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the set holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Inserts `value`; `false` if an equivalent element was already
    /// present (the set is unchanged and `value` is dropped).
    pub fn insert(&mut self, value: T) -> bool {
        self.tree.insert_unique(value).is_ok()
    }

    /// Whether an element equivalent to `value` is present.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.tree.find(value).is_some()
    }

    /// Borrows the stored element equivalent to `value`.
    #[must_use]
    pub fn get(&self, value: &T) -> Option<&T> {
        self.tree.find(value).map(|id| self.tree.value(id))
    }

    /// Removes the element equivalent to `value`; `false` if absent.
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes and returns the stored element equivalent to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let id = self.tree.find(value)?;
        Some(self.tree.erase(id))
    }

    /// Smallest element.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.tree.first().map(|id| self.tree.value(id))
    }

    /// Largest element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tree.last().map(|id| self.tree.value(id))
    }

    /// First element not less than `value`.
    #[must_use]
    pub fn lower_bound(&self, value: &T) -> Option<&T> {
        self.tree.lower_bound(value).map(|id| self.tree.value(id))
    }

    /// First element strictly greater than `value`.
    #[must_use]
    pub fn upper_bound(&self, value: &T) -> Option<&T> {
        self.tree.upper_bound(value).map(|id| self.tree.value(id))
    }

    /// Iterates elements in ascending order.
    pub fn iter(&self) -> Iter<'_, T, C> {
        self.tree.iter()
    }
}

impl<'a, T, C> IntoIterator for &'a TreeSet<T, C>
where
    C: Comparator<T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, C> Clone for TreeSet<T, C>
where
    T: Clone,
    C: Comparator<T> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<T, C> PartialEq for TreeSet<T, C>
where
    T: PartialEq,
    C: Comparator<T>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T, C> fmt::Debug for TreeSet<T, C>
where
    T: fmt::Debug,
    C: Comparator<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, C> Extend<T> for TreeSet<T, C>
where
    C: Comparator<T>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for value in values {
            self.insert(value);
        }
    }
}

impl<T, C> FromIterator<T> for TreeSet<T, C>
where
    C: Comparator<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(values: I) -> Self {
        let mut set = Self::default();
        set.extend(values);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_reports_false() {
        let mut set = TreeSet::new();
        assert!(set.insert(5));
        assert!(!set.insert(5));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn membership_and_removal() {
        let mut set: TreeSet<i32> = (0..16).collect();
        assert!(set.contains(&7));
        assert!(set.remove(&7));
        assert!(!set.contains(&7));
        assert!(!set.remove(&7));
        assert_eq!(set.len(), 15);
    }

    #[test]
    fn take_returns_the_stored_element() {
        let mut set = TreeSet::new();
        set.insert(String::from("a"));
        assert_eq!(set.take(&String::from("a")), Some(String::from("a")));
        assert!(set.is_empty());
    }

    #[test]
    fn extremes_and_bounds() {
        let set: TreeSet<i32> = [10, 20, 30].into_iter().collect();
        assert_eq!(set.first(), Some(&10));
        assert_eq!(set.last(), Some(&30));
        assert_eq!(set.lower_bound(&20), Some(&20));
        assert_eq!(set.upper_bound(&20), Some(&30));
        assert_eq!(set.lower_bound(&25), Some(&30));
        assert_eq!(set.upper_bound(&30), None);
    }

    #[test]
    fn debug_and_equality() {
        let a: TreeSet<i32> = [3, 1, 2].into_iter().collect();
        let b: TreeSet<i32> = [2, 3, 1].into_iter().collect();
        assert!(a == b);
        assert_eq!(format!("{a:?}"), "{1, 2, 3}");
    }
}
