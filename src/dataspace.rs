//! Dataspaces.
//!
//! A [`Dataspace`] describes the shape of a dataset or attribute: its rank and the extent of each dimension.
//! A rank 0 dataspace is a scalar with a single element.

use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The maximum rank of a dataspace that can be selected from and referenced.
pub const MAX_RANK: usize = 32;

/// The shape of a dataset or attribute.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[display("[{}]", dims.iter().format(", "))]
#[serde(transparent)]
pub struct Dataspace {
    dims: Vec<u64>,
}

impl Dataspace {
    /// Create a new simple dataspace with dimensions `dims`.
    #[must_use]
    pub fn new(dims: Vec<u64>) -> Self {
        Self { dims }
    }

    /// Create a new scalar dataspace.
    #[must_use]
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    /// Return the dimensions.
    #[must_use]
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    /// Return the rank (number of dimensions).
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Return the number of elements.
    ///
    /// Equal to the product of the dimensions, or 1 for a scalar dataspace.
    /// Returns [`None`] if the number of elements exceeds [`u64::MAX`].
    #[must_use]
    pub fn num_elements(&self) -> Option<u64> {
        self.dims
            .iter()
            .try_fold(1u64, |num_elements, dim| num_elements.checked_mul(*dim))
    }

    /// Returns true if `indices` has the rank of the dataspace and lies within its extents.
    #[must_use]
    pub fn contains(&self, indices: &[u64]) -> bool {
        indices.len() == self.rank()
            && std::iter::zip(indices, &self.dims).all(|(index, dim)| index < dim)
    }

    /// Return the row-major linear index of `indices`.
    ///
    /// Returns [`None`] if `indices` is not [contained](Dataspace::contains) in the dataspace, or the linear index exceeds [`u64::MAX`].
    #[must_use]
    pub fn linearise(&self, indices: &[u64]) -> Option<u64> {
        if !self.contains(indices) {
            return None;
        }
        std::iter::zip(indices, &self.dims).try_fold(0u64, |linear, (index, dim)| {
            linear.checked_mul(*dim)?.checked_add(*index)
        })
    }
}

impl From<Vec<u64>> for Dataspace {
    fn from(dims: Vec<u64>) -> Self {
        Self::new(dims)
    }
}

impl From<&[u64]> for Dataspace {
    fn from(dims: &[u64]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataspace() {
        let dataspace = Dataspace::new(vec![4, 5]);
        assert_eq!(dataspace.rank(), 2);
        assert_eq!(dataspace.num_elements(), Some(20));
        assert!(dataspace.contains(&[3, 4]));
        assert!(!dataspace.contains(&[4, 0]));
        assert!(!dataspace.contains(&[0]));
        assert_eq!(dataspace.linearise(&[2, 3]), Some(13));
        assert_eq!(dataspace.linearise(&[2, 5]), None);
        assert_eq!(dataspace.to_string(), "[4, 5]");
        assert_eq!(Dataspace::scalar().num_elements(), Some(1));
    }

    #[test]
    fn dataspace_overflow() {
        let dataspace = Dataspace::new(vec![1 << 40, 1 << 40]);
        assert_eq!(dataspace.num_elements(), None);
        assert_eq!(dataspace.linearise(&[1 << 39, 1]), None);
        assert_eq!(dataspace.linearise(&[0, 5]), Some(5));
        assert_eq!(Dataspace::new(vec![0, u64::MAX, u64::MAX]).num_elements(), Some(0));
    }
}
