use std::fmt::{self, Display, Formatter};

/// Transparent type that represents an index into a [Slab].
///
/// Indexes are handed out in increasing order and never reused, so an index that outlives
/// its item can only ever observe "removed".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct SlabIndex(pub(super) usize);
impl SlabIndex {
    /// Returns the position of the slot in the slab.
    pub fn position(&self) -> usize {
        self.0
    }

    /// Returns a new [SlabIndex] pointing at slot `position`.
    ///
    /// The slot may be empty or out of bounds, [Slab] accessors return [None] in that case.
    pub fn from_position(position: usize) -> Self {
        Self(position)
    }
}
impl Display for SlabIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append only arena. Removing an item leaves a hole behind and its index is retired.
///
/// Iteration visits items in insertion order.
///
/// # Example
///
/// ```
/// # use tensorgraph_prune::data_structures::Slab;
/// let mut s = Slab::new();
///
/// let index = s.insert(5);
/// assert_eq!(s.get(index), Some(&5));
///
/// assert_eq!(s.remove(index), Some(5));
///
/// assert_eq!(s.get(index), None);
/// assert_eq!(s.remove(index), None);
/// ```
#[derive(Debug, Clone)]
pub struct Slab<T: Sized> {
    data: Vec<Option<T>>,
    removed: usize,
}
impl<T: Sized> Slab<T> {
    /// Returns an empty [Slab].
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            removed: 0,
        }
    }

    /// Inserts an item at the end of the slab and returns its index.
    pub fn insert(&mut self, item: T) -> SlabIndex {
        let index = SlabIndex(self.data.len());
        self.data.push(Some(item));
        index
    }

    /// Returns a mutable reference to the item at `index`.
    ///
    /// Returns [None] if `index` has been removed.
    pub fn get_mut(&mut self, index: SlabIndex) -> Option<&mut T> {
        self.data.get_mut(index.0).and_then(Option::as_mut)
    }

    /// Return a reference to the item at `index`.
    ///
    /// Returns [None] if `index` has been removed.
    pub fn get(&self, index: SlabIndex) -> Option<&T> {
        self.data.get(index.0).and_then(Option::as_ref)
    }

    /// Returns true if `index` points at a live item.
    pub fn contains(&self, index: SlabIndex) -> bool {
        self.get(index).is_some()
    }

    /// Removes an item from the Slab and returns it.
    ///
    /// Returns [None] if `index` has already been removed or was never handed out.
    pub fn remove(&mut self, index: SlabIndex) -> Option<T> {
        let item = self.data.get_mut(index.0)?.take();
        if item.is_some() {
            self.removed += 1;
        }
        item
    }

    /// Returns the number of items in the slab.
    ///
    /// This is different from the number of allocated slots in the slab, see [Slab::total_len]
    pub fn len(&self) -> usize {
        self.data.len() - self.removed
    }

    /// Returns true if the number of items in the slab is 0.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of allocated slots in the slab, some of them could be empty.
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Returns an iterator over pairs of ```(SlabIndex, [&T])``` in insertion order.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            iter: self.data.iter().enumerate(),
        }
    }

    /// Returns an iterator over pairs of ```(SlabIndex, [&mut T])``` in insertion order.
    pub fn iter_mut(&mut self) -> IterMut<T> {
        IterMut {
            iter: self.data.iter_mut().enumerate(),
        }
    }

    /// Returns the live indexes of the slab in insertion order.
    pub fn indexes(&self) -> impl Iterator<Item = SlabIndex> + '_ {
        self.iter().map(|(i, _)| i)
    }
}

/// [Iterator] for [Slab]
pub struct Iter<'a, T> {
    iter: std::iter::Enumerate<std::slice::Iter<'a, Option<T>>>,
}
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlabIndex, &'a T);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (i, item) = self.iter.next()?;
            if let Some(item) = item {
                return Some((SlabIndex(i), item));
            }
        }
    }
}

/// Mutable [Iterator] for [Slab]
pub struct IterMut<'a, T> {
    iter: std::iter::Enumerate<std::slice::IterMut<'a, Option<T>>>,
}
impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (SlabIndex, &'a mut T);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (i, item) = self.iter.next()?;
            if let Some(item) = item {
                return Some((SlabIndex(i), item));
            }
        }
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut s: Slab<_> = Default::default();

        assert_eq!(s.get(SlabIndex(0)), None);

        let index = s.insert(1);
        assert_eq!(*s.get(index).unwrap(), 1);
        assert_eq!(s.get(SlabIndex(1)), None);

        s.remove(index);
        assert_eq!(s.get(index), None);
        assert!(!s.contains(index));
    }

    #[test]
    fn test_get_mut() {
        let mut s: Slab<_> = Default::default();

        assert_eq!(s.get_mut(SlabIndex(0)), None);

        let index = s.insert(1);
        *s.get_mut(index).unwrap() = 7;
        assert_eq!(s.get(index), Some(&7));

        s.remove(index);
        assert_eq!(s.get_mut(index), None);
    }

    #[test]
    fn test_removed_index_is_retired() {
        let mut s = Slab::new();

        assert_eq!(s.remove(SlabIndex(0)), None);

        let index = s.insert(1);
        assert_eq!(s.remove(index), Some(1));
        assert_eq!(s.remove(index), None);

        let new_index = s.insert(2);
        assert_ne!(index, new_index);
        assert_eq!(s.get(index), None);
        assert_eq!(s.get(new_index), Some(&2));
    }

    #[test]
    fn test_len() {
        let mut s = Slab::new();

        assert_eq!(s.len(), 0);
        assert!(s.is_empty());
        assert_eq!(s.total_len(), 0);

        let index = s.insert(1);
        assert_eq!(s.len(), 1);
        assert!(!s.is_empty());
        assert_eq!(s.total_len(), 1);

        s.remove(index);
        s.remove(index);
        assert_eq!(s.len(), 0);
        assert!(s.is_empty());
        assert_eq!(s.total_len(), 1);
    }

    #[test]
    fn test_iter_skips_holes_in_order() {
        let mut s = Slab::new();
        for i in 0..10 {
            s.insert(i);
        }
        for i in (1..10).step_by(2) {
            s.remove(SlabIndex(i));
        }
        let seen: Vec<_> = s.iter().map(|(i, n)| (i.0, *n)).collect();
        assert_eq!(seen, vec![(0, 0), (2, 2), (4, 4), (6, 6), (8, 8)]);
        assert_eq!(s.indexes().count(), 5);
    }

    #[test]
    fn test_iter_mut() {
        let mut s = Slab::new();
        for i in 0..4 {
            s.insert(i);
        }
        s.remove(SlabIndex(2));
        for (_, n) in s.iter_mut() {
            *n *= 10;
        }
        let values: Vec<_> = s.iter().map(|(_, n)| *n).collect();
        assert_eq!(values, vec![0, 10, 30]);
    }
}
