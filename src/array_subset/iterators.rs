use std::iter::FusedIterator;

use crate::array::{unravel_index, ArrayIndices};

use super::ArraySubset;

/// An iterator over the indices in an array subset.
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// For example, consider a 4x3 array with element indices
/// ```text
/// (0, 0)  (0, 1)  (0, 2)
/// (1, 0)  (1, 1)  (1, 2)
/// (2, 0)  (2, 1)  (2, 2)
/// (3, 0)  (3, 1)  (3, 2)
/// ```
/// An iterator with an array subset corresponding to the lower right 2x2 region will produce `[(2, 1), (2, 2), (3, 1), (3, 2)]`.
#[derive(Debug, Clone)]
pub struct IndicesIterator {
    subset: ArraySubset,
    index_front: u64,
    index_back: u64,
}

impl IndicesIterator {
    /// Create a new indices iterator.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        let index_back = subset.num_elements();
        Self {
            subset,
            index_front: 0,
            index_back,
        }
    }

    fn indices_at(&self, index: u64) -> ArrayIndices {
        let indices = unravel_index(index, self.subset.shape());
        std::iter::zip(indices, self.subset.start())
            .map(|(index, start)| index + start)
            .collect()
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index_front < self.index_back {
            let indices = self.indices_at(self.index_front);
            self.index_front += 1;
            Some(indices)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let length = usize::try_from(self.index_back - self.index_front).unwrap_or(usize::MAX);
        (length, Some(length))
    }
}

impl DoubleEndedIterator for IndicesIterator {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.index_back > self.index_front {
            self.index_back -= 1;
            Some(self.indices_at(self.index_back))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for IndicesIterator {}

impl FusedIterator for IndicesIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_iterator() {
        let subset = ArraySubset::new_with_ranges(&[2..4, 1..3]);
        let indices: Vec<_> = subset.indices().collect();
        assert_eq!(indices, vec![vec![2, 1], vec![2, 2], vec![3, 1], vec![3, 2]]);
        let mut iter = subset.indices();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next_back(), Some(vec![3, 2]));
        assert_eq!(iter.len(), 3);
    }

    #[test]
    fn indices_iterator_empty() {
        let subset = ArraySubset::new_with_ranges(&[0..0, 1..3]);
        assert_eq!(subset.indices().count(), 0);
    }

    #[test]
    fn indices_iterator_zero_dimensional() {
        let subset = ArraySubset::new_with_shape(vec![]);
        assert_eq!(subset.indices().collect::<Vec<_>>(), vec![Vec::<u64>::new()]);
    }
}
