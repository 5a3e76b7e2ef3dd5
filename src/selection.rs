//! Dataspace selections.
//!
//! A [`Selection`] identifies a set of elements of a [`Dataspace`]:
//!  - [`Selection::all`]: every element,
//!  - [`Selection::hyperslab`]: a regular pattern of blocks (see [`Hyperslab`]), or
//!  - [`Selection::points`]: an ordered list of element coordinates.
//!
//! Selections are validated against the dataspace on construction, so every element a selection addresses lies within its dataspace.
//!
//! ## Encoding
//! Selections are encoded in region references as
//! `u8 kind (0 all, 1 hyperslab, 2 points)`, `u8 rank`, then
//!  - hyperslab: `start, stride, count, block` per dimension as u64 LE, or
//!  - points: `u64 n` then `n * rank` coordinates as u64 LE.

mod hyperslab;

pub use hyperslab::{Hyperslab, HyperslabIndicesIterator};

use thiserror::Error;

use crate::{
    dataspace::{Dataspace, MAX_RANK},
    wire::{UnexpectedEofError, WireReader},
};

const KIND_ALL: u8 = 0;
const KIND_HYPERSLAB: u8 = 1;
const KIND_POINTS: u8 = 2;

/// A selection error (a range error).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// A selection vector or coordinate does not match the dataspace rank.
    #[error("selection has dimensionality {_0}, expected {_1}")]
    IncompatibleDimensionality(usize, usize),
    /// The dataspace rank exceeds [`MAX_RANK`].
    #[error("dataspace rank {_0} exceeds the maximum selectable rank {MAX_RANK}")]
    RankTooLarge(usize),
    /// The number of elements of the dataspace exceeds [`u64::MAX`].
    #[error("dataspace {_0} has more than u64::MAX elements")]
    TooManyElements(Dataspace),
    /// A point selection of a scalar dataspace.
    #[error("point selections require a dataspace of rank 1 or more")]
    ScalarPoints,
    /// A hyperslab stride is zero.
    #[error("hyperslab stride must be at least 1 in dimension {_0}")]
    InvalidStride(usize),
    /// A hyperslab block is zero.
    #[error("hyperslab block must be at least 1 in dimension {_0}")]
    InvalidBlock(usize),
    /// Hyperslab blocks overlap.
    #[error("hyperslab blocks overlap in dimension {dim}: stride {stride} is less than block {block}")]
    OverlappingBlocks {
        /// The dimension.
        dim: usize,
        /// The stride.
        stride: u64,
        /// The block.
        block: u64,
    },
    /// A hyperslab extends beyond the dataspace.
    #[error("hyperslab extends to {end} in dimension {dim}, beyond extent {extent}")]
    OutOfBounds {
        /// The dimension.
        dim: usize,
        /// The last selected index, saturated on overflow.
        end: u64,
        /// The dataspace extent.
        extent: u64,
    },
    /// A point lies outside of the dataspace.
    #[error("point {index} {point:?} is outside of dataspace {dataspace}")]
    PointOutOfBounds {
        /// The position of the point in the selection.
        index: usize,
        /// The point coordinates.
        point: Vec<u64>,
        /// The dataspace.
        dataspace: Dataspace,
    },
    /// A selection is applied to a dataset with a different dataspace.
    #[error("selection of dataspace {selection} does not apply to dataspace {dataset}")]
    DataspaceMismatch {
        /// The dataspace of the selection.
        selection: Dataspace,
        /// The dataspace of the dataset.
        dataset: Dataspace,
    },
    /// An encoded selection is invalid.
    #[error("invalid selection encoding: {_0}")]
    InvalidEncoding(String),
}

impl From<UnexpectedEofError> for SelectionError {
    fn from(err: UnexpectedEofError) -> Self {
        Self::InvalidEncoding(err.to_string())
    }
}

/// The selected elements of a [`Selection`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    /// Every element.
    All,
    /// A regular hyperslab.
    Hyperslab(Hyperslab),
    /// An ordered list of points. Duplicates are permitted.
    Points(Vec<Vec<u64>>),
}

/// A validated selection of elements of a [`Dataspace`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    dataspace: Dataspace,
    kind: SelectionKind,
}

fn validate_dataspace(dataspace: &Dataspace) -> Result<(), SelectionError> {
    if dataspace.rank() > MAX_RANK {
        Err(SelectionError::RankTooLarge(dataspace.rank()))
    } else if dataspace.num_elements().is_none() {
        Err(SelectionError::TooManyElements(dataspace.clone()))
    } else {
        Ok(())
    }
}

impl Selection {
    /// Select every element of `dataspace`.
    ///
    /// # Errors
    /// Returns [`SelectionError::RankTooLarge`] if the rank of `dataspace` exceeds [`MAX_RANK`], or [`SelectionError::TooManyElements`] if its number of elements exceeds [`u64::MAX`].
    pub fn all(dataspace: &Dataspace) -> Result<Self, SelectionError> {
        validate_dataspace(dataspace)?;
        Ok(Self {
            dataspace: dataspace.clone(),
            kind: SelectionKind::All,
        })
    }

    /// Select a regular hyperslab of `dataspace`.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if
    ///  - `dataspace` is not selectable (see [`Selection::all`]),
    ///  - any of `start`, `stride`, `count` or `block` does not have the rank of `dataspace`,
    ///  - a `stride` or `block` is zero,
    ///  - a `stride` is less than its `block` where `count > 1`, or
    ///  - the last selected index `start + stride * (count - 1) + block - 1` is beyond the extent of a dimension with a nonzero `count`.
    pub fn hyperslab(
        dataspace: &Dataspace,
        start: &[u64],
        stride: &[u64],
        count: &[u64],
        block: &[u64],
    ) -> Result<Self, SelectionError> {
        validate_dataspace(dataspace)?;
        let rank = dataspace.rank();
        for vector in [start, stride, count, block] {
            if vector.len() != rank {
                return Err(SelectionError::IncompatibleDimensionality(
                    vector.len(),
                    rank,
                ));
            }
        }
        for (dim, &extent) in dataspace.dims().iter().enumerate() {
            let (start, stride, count, block) = (start[dim], stride[dim], count[dim], block[dim]);
            if stride == 0 {
                return Err(SelectionError::InvalidStride(dim));
            }
            if block == 0 {
                return Err(SelectionError::InvalidBlock(dim));
            }
            if count > 1 && stride < block {
                return Err(SelectionError::OverlappingBlocks { dim, stride, block });
            }
            if count > 0 {
                let end = stride
                    .checked_mul(count - 1)
                    .and_then(|offset| offset.checked_add(start))
                    .and_then(|origin| origin.checked_add(block - 1));
                match end {
                    Some(end) if end < extent => {}
                    _ => {
                        return Err(SelectionError::OutOfBounds {
                            dim,
                            end: end.unwrap_or(u64::MAX),
                            extent,
                        })
                    }
                }
            }
        }
        Ok(Self {
            dataspace: dataspace.clone(),
            kind: SelectionKind::Hyperslab(Hyperslab {
                start: start.to_vec(),
                stride: stride.to_vec(),
                count: count.to_vec(),
                block: block.to_vec(),
            }),
        })
    }

    /// Select an ordered list of points of `dataspace`.
    ///
    /// The order of `points` is preserved and duplicates are permitted.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if `dataspace` is scalar or not selectable (see [`Selection::all`]), or a point does not have the rank of `dataspace` or lies outside of it.
    pub fn points(dataspace: &Dataspace, points: Vec<Vec<u64>>) -> Result<Self, SelectionError> {
        validate_dataspace(dataspace)?;
        if dataspace.rank() == 0 {
            return Err(SelectionError::ScalarPoints);
        }
        for (index, point) in points.iter().enumerate() {
            if point.len() != dataspace.rank() {
                return Err(SelectionError::IncompatibleDimensionality(
                    point.len(),
                    dataspace.rank(),
                ));
            }
            if !dataspace.contains(point) {
                return Err(SelectionError::PointOutOfBounds {
                    index,
                    point: point.clone(),
                    dataspace: dataspace.clone(),
                });
            }
        }
        Ok(Self {
            dataspace: dataspace.clone(),
            kind: SelectionKind::Points(points),
        })
    }

    /// Return the dataspace the selection was validated against.
    #[must_use]
    pub fn dataspace(&self) -> &Dataspace {
        &self.dataspace
    }

    /// Return the selected elements.
    #[must_use]
    pub fn kind(&self) -> &SelectionKind {
        &self.kind
    }

    /// Return the rank of the selection.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dataspace.rank()
    }

    /// Return the number of selected elements.
    ///
    /// Duplicate points are counted each time they appear.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        match &self.kind {
            // the element count of the dataspace is validated on construction
            SelectionKind::All => self.dataspace.num_elements().unwrap_or(u64::MAX),
            SelectionKind::Hyperslab(hyperslab) => hyperslab.num_elements(),
            SelectionKind::Points(points) => points.len() as u64,
        }
    }

    /// Return an iterator over the indices of the selected elements.
    ///
    /// Hyperslab and all selections iterate in row-major order, point selections in their given order.
    #[must_use]
    pub fn iter_indices(&self) -> SelectionIndicesIterator<'_> {
        match &self.kind {
            SelectionKind::All => SelectionIndicesIterator::Hyperslab(
                HyperslabIndicesIterator::new(Hyperslab::whole(self.dataspace.dims())),
            ),
            SelectionKind::Hyperslab(hyperslab) => SelectionIndicesIterator::Hyperslab(
                HyperslabIndicesIterator::new(hyperslab.clone()),
            ),
            SelectionKind::Points(points) => SelectionIndicesIterator::Points(points.iter()),
        }
    }

    /// Return an iterator over the row-major linearised indices of the selected elements.
    pub fn iter_linearised_indices(&self) -> impl Iterator<Item = u64> + '_ {
        let dims = self.dataspace.dims();
        self.iter_indices().map(move |indices| {
            std::iter::zip(&indices, dims).fold(0, |linear, (index, dim)| linear * dim + index)
        })
    }

    /// Append the encoded selection to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let kind = match &self.kind {
            SelectionKind::All => KIND_ALL,
            SelectionKind::Hyperslab(_) => KIND_HYPERSLAB,
            SelectionKind::Points(_) => KIND_POINTS,
        };
        // The rank is bounded by MAX_RANK on construction
        #[allow(clippy::cast_possible_truncation)]
        let rank = self.rank() as u8;
        out.extend_from_slice(&[kind, rank]);
        match &self.kind {
            SelectionKind::All => {}
            SelectionKind::Hyperslab(hyperslab) => {
                for dim in 0..self.rank() {
                    for value in [
                        hyperslab.start[dim],
                        hyperslab.stride[dim],
                        hyperslab.count[dim],
                        hyperslab.block[dim],
                    ] {
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
            SelectionKind::Points(points) => {
                out.extend_from_slice(&(points.len() as u64).to_le_bytes());
                for value in points.iter().flatten() {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    /// Encode the selection.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Decode a selection of `dataspace` from `bytes`.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if the encoding is invalid, has trailing bytes, or is not a valid selection of `dataspace`.
    pub fn decode(bytes: &[u8], dataspace: &Dataspace) -> Result<Self, SelectionError> {
        let mut reader = WireReader::new(bytes);
        let selection = Self::decode_from(&mut reader, dataspace)?;
        if reader.remaining() == 0 {
            Ok(selection)
        } else {
            Err(SelectionError::InvalidEncoding(format!(
                "{} trailing bytes",
                reader.remaining()
            )))
        }
    }

    pub(crate) fn decode_from(
        reader: &mut WireReader,
        dataspace: &Dataspace,
    ) -> Result<Self, SelectionError> {
        let kind = reader.read_u8()?;
        let rank = usize::from(reader.read_u8()?);
        if rank != dataspace.rank() {
            return Err(SelectionError::IncompatibleDimensionality(
                rank,
                dataspace.rank(),
            ));
        }
        match kind {
            KIND_ALL => Self::all(dataspace),
            KIND_HYPERSLAB => {
                let mut vectors = [
                    Vec::with_capacity(rank),
                    Vec::with_capacity(rank),
                    Vec::with_capacity(rank),
                    Vec::with_capacity(rank),
                ];
                for _ in 0..rank {
                    for vector in &mut vectors {
                        vector.push(reader.read_u64()?);
                    }
                }
                let [start, stride, count, block] = vectors;
                Self::hyperslab(dataspace, &start, &stride, &count, &block)
            }
            KIND_POINTS if rank == 0 => Err(SelectionError::ScalarPoints),
            KIND_POINTS => {
                let num_points = reader.read_u64()?;
                let num_values = usize::try_from(num_points)
                    .ok()
                    .and_then(|num_points| num_points.checked_mul(rank))
                    .filter(|num_values| {
                        num_values
                            .checked_mul(8)
                            .is_some_and(|len| len <= reader.remaining())
                    })
                    .ok_or_else(|| {
                        SelectionError::InvalidEncoding(format!(
                            "{num_points} points do not fit in the remaining {} bytes",
                            reader.remaining()
                        ))
                    })?;
                let mut points = Vec::with_capacity(num_values / rank);
                for _ in 0..num_points {
                    let point = (0..rank)
                        .map(|_| reader.read_u64())
                        .collect::<Result<Vec<_>, _>>()?;
                    points.push(point);
                }
                Self::points(dataspace, points)
            }
            _ => Err(SelectionError::InvalidEncoding(format!(
                "unknown selection kind {kind}"
            ))),
        }
    }
}

/// An iterator over the indices of the elements of a [`Selection`].
///
/// See [`Selection::iter_indices`].
pub enum SelectionIndicesIterator<'a> {
    /// Iterates over a hyperslab (or all elements).
    Hyperslab(HyperslabIndicesIterator),
    /// Iterates over points in order.
    Points(std::slice::Iter<'a, Vec<u64>>),
}

impl Iterator for SelectionIndicesIterator<'_> {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Hyperslab(iter) => iter.next(),
            Self::Points(iter) => iter.next().cloned(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Hyperslab(iter) => iter.size_hint(),
            Self::Points(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for SelectionIndicesIterator<'_> {}

impl std::iter::FusedIterator for SelectionIndicesIterator<'_> {}
