use thiserror::Error;

use super::{DataType, DataTypeSize};

/// Fixed or variable length element bytes.
///
/// Offsets are only present if the bytes are composed of variable sized elements.
/// Element `i` of variable length bytes is `bytes[offsets[i]..offsets[i + 1]]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayBytes {
    /// Bytes of fixed size elements.
    Fixed(Vec<u8>),
    /// Bytes and element byte offsets of variable sized elements.
    Variable(Vec<u8>, Vec<usize>),
}

/// Errors related to [`ArrayBytes`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArrayBytesError {
    /// Invalid use of a fixed length method.
    #[error("used a fixed length method on variable length bytes")]
    ExpectedFixedLengthBytes,
    /// Invalid use of a variable length method.
    #[error("used a variable length method on fixed length bytes")]
    ExpectedVariableLengthBytes,
    /// The bytes have an unexpected length.
    #[error("expected {1} bytes, got {0}")]
    UnexpectedLength(usize, usize),
    /// The element offsets are invalid.
    #[error("invalid variable length element offsets")]
    InvalidOffsets,
    /// The stored representation is malformed.
    #[error("malformed stored element bytes")]
    Malformed,
    /// The size of the elements in bytes exceeds [`usize::MAX`].
    #[error("{0} elements of {1} bytes exceed the addressable size")]
    SizeOverflow(usize, usize),
}

impl ArrayBytes {
    /// Create new fixed length bytes from `bytes`.
    #[must_use]
    pub fn new_flen(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Fixed(bytes.into())
    }

    /// Create new variable length bytes from `bytes` and `offsets`.
    #[must_use]
    pub fn new_vlen(bytes: impl Into<Vec<u8>>, offsets: impl Into<Vec<usize>>) -> Self {
        Self::Variable(bytes.into(), offsets.into())
    }

    /// Create variable length bytes from a sequence of elements.
    #[must_use]
    pub fn from_elements<'a>(elements: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut bytes = Vec::new();
        let mut offsets = vec![0];
        for element in elements {
            bytes.extend_from_slice(element);
            offsets.push(bytes.len());
        }
        Self::Variable(bytes, offsets)
    }

    /// Create zeroed bytes for `num_elements` of `data_type`.
    ///
    /// Variable sized elements are empty.
    ///
    /// # Errors
    /// Returns [`ArrayBytesError::SizeOverflow`] if the size of the elements exceeds [`usize::MAX`].
    pub fn new_zeroed(num_elements: usize, data_type: &DataType) -> Result<Self, ArrayBytesError> {
        match data_type.size() {
            DataTypeSize::Fixed(size) => Ok(Self::Fixed(vec![0; fixed_size(num_elements, size)?])),
            DataTypeSize::Variable => {
                let num_offsets = num_elements
                    .checked_add(1)
                    .ok_or(ArrayBytesError::SizeOverflow(num_elements, 0))?;
                Ok(Self::Variable(Vec::new(), vec![0; num_offsets]))
            }
        }
    }

    /// Convert into fixed size bytes.
    ///
    /// # Errors
    /// Returns [`ArrayBytesError::ExpectedFixedLengthBytes`] if the bytes are variable length.
    pub fn into_fixed(self) -> Result<Vec<u8>, ArrayBytesError> {
        match self {
            Self::Fixed(bytes) => Ok(bytes),
            Self::Variable(_, _) => Err(ArrayBytesError::ExpectedFixedLengthBytes),
        }
    }

    /// Convert into variable sized bytes and element byte offsets.
    ///
    /// # Errors
    /// Returns [`ArrayBytesError::ExpectedVariableLengthBytes`] if the bytes are fixed length.
    pub fn into_variable(self) -> Result<(Vec<u8>, Vec<usize>), ArrayBytesError> {
        match self {
            Self::Fixed(_) => Err(ArrayBytesError::ExpectedVariableLengthBytes),
            Self::Variable(bytes, offsets) => Ok((bytes, offsets)),
        }
    }

    /// Returns the size (in bytes) of the underlying element bytes.
    ///
    /// This does not include the element offsets of variable sized bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Fixed(bytes) | Self::Variable(bytes, _) => bytes.len(),
        }
    }

    /// Return the elements of variable sized bytes.
    ///
    /// # Errors
    /// Returns [`ArrayBytesError::ExpectedVariableLengthBytes`] if the bytes are fixed length, or [`ArrayBytesError::InvalidOffsets`] if an element lies outside of the bytes.
    pub fn variable_elements(&self) -> Result<Vec<&[u8]>, ArrayBytesError> {
        match self {
            Self::Fixed(_) => Err(ArrayBytesError::ExpectedVariableLengthBytes),
            Self::Variable(bytes, offsets) => offsets
                .windows(2)
                .map(|window| {
                    bytes
                        .get(window[0]..window[1])
                        .ok_or(ArrayBytesError::InvalidOffsets)
                })
                .collect(),
        }
    }

    /// Validate the bytes for `num_elements` of `data_type`.
    ///
    /// Fixed length bytes must match the expected size.
    /// Variable length offsets must number `num_elements + 1`, be monotonically increasing, and end at the length of the bytes.
    ///
    /// # Errors
    /// Returns an [`ArrayBytesError`] if the bytes are not valid.
    pub fn validate(&self, num_elements: usize, data_type: &DataType) -> Result<(), ArrayBytesError> {
        match (self, data_type.size()) {
            (Self::Fixed(bytes), DataTypeSize::Fixed(size)) => {
                let expected = fixed_size(num_elements, size)?;
                if bytes.len() == expected {
                    Ok(())
                } else {
                    Err(ArrayBytesError::UnexpectedLength(bytes.len(), expected))
                }
            }
            (Self::Variable(bytes, offsets), DataTypeSize::Variable) => {
                validate_offsets(bytes, offsets, num_elements)
            }
            (Self::Fixed(_), DataTypeSize::Variable) => {
                Err(ArrayBytesError::ExpectedVariableLengthBytes)
            }
            (Self::Variable(_, _), DataTypeSize::Fixed(_)) => {
                Err(ArrayBytesError::ExpectedFixedLengthBytes)
            }
        }
    }

    /// Encode the bytes for storage in a container data segment.
    ///
    /// Fixed length bytes are stored as is.
    /// Variable length bytes are stored as the element count (u64 LE), the offsets (u64 LE), then the bytes.
    #[must_use]
    pub fn to_stored_bytes(&self) -> Vec<u8> {
        match self {
            Self::Fixed(bytes) => bytes.clone(),
            Self::Variable(bytes, offsets) => {
                let mut out = Vec::with_capacity(8 * (offsets.len() + 1) + bytes.len());
                let num_elements = offsets.len().saturating_sub(1) as u64;
                out.extend_from_slice(&num_elements.to_le_bytes());
                for offset in offsets {
                    out.extend_from_slice(&(*offset as u64).to_le_bytes());
                }
                out.extend_from_slice(bytes);
                out
            }
        }
    }

    /// Decode bytes produced by [`to_stored_bytes`](ArrayBytes::to_stored_bytes) for elements of `data_type`.
    ///
    /// # Errors
    /// Returns [`ArrayBytesError::Malformed`] if the stored bytes are malformed.
    pub fn from_stored_bytes(stored: &[u8], data_type: &DataType) -> Result<Self, ArrayBytesError> {
        match data_type.size() {
            DataTypeSize::Fixed(_) => Ok(Self::Fixed(stored.to_vec())),
            DataTypeSize::Variable => {
                let mut words = stored.chunks_exact(8).map(|word| {
                    let word: [u8; 8] = word.try_into().map_err(|_| ArrayBytesError::Malformed)?;
                    usize::try_from(u64::from_le_bytes(word)).map_err(|_| ArrayBytesError::Malformed)
                });
                let num_elements = words.next().ok_or(ArrayBytesError::Malformed)??;
                let num_offsets = num_elements.checked_add(1).ok_or(ArrayBytesError::Malformed)?;
                let header = num_offsets
                    .checked_add(1)
                    .and_then(|words| words.checked_mul(8))
                    .filter(|header| *header <= stored.len())
                    .ok_or(ArrayBytesError::Malformed)?;
                let offsets = words.take(num_offsets).collect::<Result<Vec<_>, _>>()?;
                let bytes = stored[header..].to_vec();
                validate_offsets(&bytes, &offsets, num_elements)
                    .map_err(|_| ArrayBytesError::Malformed)?;
                Ok(Self::Variable(bytes, offsets))
            }
        }
    }
}

/// The size in bytes of `num_elements` elements of `size` bytes.
fn fixed_size(num_elements: usize, size: usize) -> Result<usize, ArrayBytesError> {
    num_elements
        .checked_mul(size)
        .ok_or(ArrayBytesError::SizeOverflow(num_elements, size))
}

fn validate_offsets(
    bytes: &[u8],
    offsets: &[usize],
    num_elements: usize,
) -> Result<(), ArrayBytesError> {
    if num_elements.checked_add(1) != Some(offsets.len()) {
        return Err(ArrayBytesError::InvalidOffsets);
    }
    let mut offset_last = 0;
    for offset in offsets {
        if *offset < offset_last || *offset > bytes.len() {
            return Err(ArrayBytesError::InvalidOffsets);
        }
        offset_last = *offset;
    }
    if offset_last == bytes.len() {
        Ok(())
    } else {
        Err(ArrayBytesError::InvalidOffsets)
    }
}
