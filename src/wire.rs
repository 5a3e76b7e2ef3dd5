//! Little-endian wire primitives shared by the superblock, selection, and reference codecs.

use thiserror::Error;

/// A truncated wire value.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("unexpected end of input: needed {expected} bytes, {available} available")]
pub struct UnexpectedEofError {
    /// The number of bytes required.
    pub expected: usize,
    /// The number of bytes available.
    pub available: usize,
}

/// A cursor over little-endian encoded bytes.
pub(crate) struct WireReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub(crate) fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], UnexpectedEofError> {
        if length > self.remaining() {
            return Err(UnexpectedEofError {
                expected: self.position + length,
                available: self.bytes.len(),
            });
        }
        let bytes = &self.bytes[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], UnexpectedEofError> {
        let mut array = [0; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, UnexpectedEofError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, UnexpectedEofError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, UnexpectedEofError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, UnexpectedEofError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}
