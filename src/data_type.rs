//! Element data types of datasets and attributes.
//!
//! A [`DataType`] is stored in container metadata by its identifier (e.g. `uint8`, `string[60]`, `region_reference`).
//! The elements of a dataset or attribute are held as [`ArrayBytes`].

mod array_bytes;

pub use array_bytes::{ArrayBytes, ArrayBytesError};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::ReferenceEncoding;

/// The size in bytes of a legacy region reference token.
pub const LEGACY_REGION_REFERENCE_SIZE: usize = 12;

/// A data type.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[rustfmt::skip]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    #[display("int8")]
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    #[display("int16")]
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    #[display("float32")]
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    #[display("float64")]
    Float64,
    /// `string[N]` A NUL padded character string of `N` bytes.
    #[display("string[{_0}]")]
    FixedString(usize),
    /// A dataset region reference in the given encoding.
    ///
    /// `region_reference_legacy` is a fixed size token, `region_reference` is variable sized.
    #[display("{}", region_reference_identifier(*_0))]
    RegionReference(ReferenceEncoding),
}

const fn region_reference_identifier(encoding: ReferenceEncoding) -> &'static str {
    match encoding {
        ReferenceEncoding::Legacy => "region_reference_legacy",
        ReferenceEncoding::Revised => "region_reference",
    }
}

/// The size of a data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataTypeSize {
    /// Fixed size (in bytes).
    Fixed(usize),
    /// Variable sized.
    Variable,
}

/// An unsupported data type error.
#[derive(Clone, Debug, Error)]
#[error("data type {0} is not supported")]
pub struct UnsupportedDataTypeError(String);

impl DataType {
    /// Returns the [`DataTypeSize`].
    #[must_use]
    pub const fn size(&self) -> DataTypeSize {
        match self {
            Self::Int8 | Self::UInt8 => DataTypeSize::Fixed(1),
            Self::Int16 | Self::UInt16 => DataTypeSize::Fixed(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => DataTypeSize::Fixed(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => DataTypeSize::Fixed(8),
            Self::FixedString(size) => DataTypeSize::Fixed(*size),
            Self::RegionReference(ReferenceEncoding::Legacy) => {
                DataTypeSize::Fixed(LEGACY_REGION_REFERENCE_SIZE)
            }
            Self::RegionReference(ReferenceEncoding::Revised) => DataTypeSize::Variable,
        }
    }

    /// Returns the size in bytes of a fixed-size data type, otherwise returns [`None`].
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self.size() {
            DataTypeSize::Fixed(size) => Some(size),
            DataTypeSize::Variable => None,
        }
    }

    /// Returns true if the data type can hold character data (a fixed string or an 8-bit integer).
    #[must_use]
    pub const fn is_character(&self) -> bool {
        matches!(self, Self::FixedString(_) | Self::Int8 | Self::UInt8)
    }

    /// Returns the reference encoding if this is a region reference data type.
    #[must_use]
    pub const fn reference_encoding(&self) -> Option<ReferenceEncoding> {
        match self {
            Self::RegionReference(encoding) => Some(*encoding),
            _ => None,
        }
    }

    /// Create a data type from its identifier.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `identifier` is not a known data type.
    pub fn from_identifier(identifier: &str) -> Result<Self, UnsupportedDataTypeError> {
        Ok(match identifier {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "region_reference_legacy" => Self::RegionReference(ReferenceEncoding::Legacy),
            "region_reference" => Self::RegionReference(ReferenceEncoding::Revised),
            _ => {
                let size = identifier
                    .strip_prefix("string[")
                    .and_then(|s| s.strip_suffix(']'))
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|size| *size > 0)
                    .ok_or_else(|| UnsupportedDataTypeError(identifier.to_string()))?;
                Self::FixedString(size)
            }
        })
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.to_string()
    }
}

impl TryFrom<String> for DataType {
    type Error = UnsupportedDataTypeError;

    fn try_from(identifier: String) -> Result<Self, Self::Error> {
        Self::from_identifier(&identifier)
    }
}
