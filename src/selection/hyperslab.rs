use derive_more::Display;
use itertools::izip;

/// A regular hyperslab.
///
/// Per dimension, `count` blocks of `block` consecutive elements are selected, with block origins `stride` elements apart starting at `start`.
/// A hyperslab is only constructed through [`Selection::hyperslab`](super::Selection::hyperslab), which validates it against a dataspace.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("start {start:?} stride {stride:?} count {count:?} block {block:?}")]
pub struct Hyperslab {
    pub(super) start: Vec<u64>,
    pub(super) stride: Vec<u64>,
    pub(super) count: Vec<u64>,
    pub(super) block: Vec<u64>,
}

impl Hyperslab {
    /// A hyperslab covering every element of `dims`.
    pub(super) fn whole(dims: &[u64]) -> Self {
        Self {
            start: vec![0; dims.len()],
            stride: vec![1; dims.len()],
            count: dims.to_vec(),
            block: vec![1; dims.len()],
        }
    }

    /// Return the block origin of the first block.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the distance between block origins.
    #[must_use]
    pub fn stride(&self) -> &[u64] {
        &self.stride
    }

    /// Return the number of blocks.
    #[must_use]
    pub fn count(&self) -> &[u64] {
        &self.count
    }

    /// Return the block size.
    #[must_use]
    pub fn block(&self) -> &[u64] {
        &self.block
    }

    /// Return the number of selected elements along each dimension.
    #[must_use]
    pub fn shape(&self) -> Vec<u64> {
        std::iter::zip(&self.count, &self.block)
            .map(|(count, block)| count * block)
            .collect()
    }

    /// Return the number of selected elements.
    ///
    /// This does not exceed the number of elements of the dataspace the hyperslab was validated against.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        std::iter::zip(&self.count, &self.block)
            .map(|(count, block)| count * block)
            .product()
    }

    /// Return the dataspace index along dimension `dim` of the `position`th selected element in that dimension.
    fn index(&self, dim: usize, position: u64) -> u64 {
        let block = self.block[dim];
        self.start[dim] + (position / block) * self.stride[dim] + position % block
    }
}

/// An iterator over the indices of the elements in a [`Hyperslab`].
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// For example, a hyperslab over a 1D dataspace with start 2, stride 5, count 3 and block 2 produces `[2], [3], [7], [8], [12], [13]`.
#[derive(Clone, Debug)]
pub struct HyperslabIndicesIterator {
    hyperslab: Hyperslab,
    shape: Vec<u64>,
    index: u64,
    length: u64,
}

impl HyperslabIndicesIterator {
    /// Create a new hyperslab indices iterator.
    #[must_use]
    pub fn new(hyperslab: Hyperslab) -> Self {
        let shape = hyperslab.shape();
        let length = hyperslab.num_elements();
        Self {
            hyperslab,
            shape,
            index: 0,
            length,
        }
    }
}

impl Iterator for HyperslabIndicesIterator {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.length {
            return None;
        }
        let mut current = self.index;
        let mut indices = vec![0; self.shape.len()];
        for (dim, out, &size) in izip!(
            (0..self.shape.len()).rev(),
            indices.iter_mut().rev(),
            self.shape.iter().rev()
        ) {
            *out = self.hyperslab.index(dim, current % size);
            current /= size;
        }
        self.index += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HyperslabIndicesIterator {}

impl std::iter::FusedIterator for HyperslabIndicesIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyperslab_indices_iterator_1d() {
        let hyperslab = Hyperslab {
            start: vec![2],
            stride: vec![5],
            count: vec![3],
            block: vec![2],
        };
        assert_eq!(hyperslab.num_elements(), 6);
        let indices: Vec<_> = HyperslabIndicesIterator::new(hyperslab).collect();
        assert_eq!(
            indices,
            vec![vec![2], vec![3], vec![7], vec![8], vec![12], vec![13]]
        );
    }

    #[test]
    fn hyperslab_indices_iterator_2d() {
        let hyperslab = Hyperslab {
            start: vec![1, 0],
            stride: vec![2, 3],
            count: vec![2, 2],
            block: vec![1, 1],
        };
        let iter = HyperslabIndicesIterator::new(hyperslab);
        assert_eq!(iter.len(), 4);
        assert_eq!(
            iter.collect::<Vec<_>>(),
            vec![vec![1, 0], vec![1, 3], vec![3, 0], vec![3, 3]]
        );
    }

    #[test]
    fn hyperslab_indices_iterator_empty() {
        let hyperslab = Hyperslab {
            start: vec![0, 0],
            stride: vec![1, 1],
            count: vec![0, 4],
            block: vec![1, 1],
        };
        assert_eq!(HyperslabIndicesIterator::new(hyperslab).next(), None);
    }

    #[test]
    fn hyperslab_whole_scalar() {
        let mut iter = HyperslabIndicesIterator::new(Hyperslab::whole(&[]));
        assert_eq!(iter.next(), Some(vec![]));
        assert_eq!(iter.next(), None);
    }
}
