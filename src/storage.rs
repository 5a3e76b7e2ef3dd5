//! Container storage ([stores](store) and [storage adapters](storage_adapter)).
//!
//! A container is persisted as a single value (a file image).
//! A [store] is a system that can hold that value, for example a file on a filesystem or a buffer in memory.
//! A [storage adapter](storage_adapter) wraps a store and has the same interface as a store.

pub mod storage_adapter;
pub mod store;

use std::{ops::Range, sync::Arc};

use thiserror::Error;

/// Bytes of a stored value.
pub type Bytes = Vec<u8>;

/// An optional [`Bytes`], [`None`] if the value does not exist.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped readable and writable storage.
pub type ReadableWritableStorage = Arc<dyn ReadableWritableStorageTraits>;

/// Readable storage traits.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the stored value.
    ///
    /// Returns [`None`] if no value is stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self) -> Result<MaybeBytes, StorageError>;

    /// Retrieve the bytes of the stored value within `byte_range`.
    ///
    /// Returns [`None`] if no value is stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error or `byte_range` extends beyond the end of the value.
    fn get_range(&self, byte_range: Range<u64>) -> Result<MaybeBytes, StorageError> {
        let Some(bytes) = self.get()? else {
            return Ok(None);
        };
        let size = bytes.len() as u64;
        if byte_range.start > byte_range.end || byte_range.end > size {
            return Err(StorageError::InvalidByteRange(byte_range, size));
        }
        // Both ends are within `bytes`, so they fit in a usize
        #[allow(clippy::cast_possible_truncation)]
        let (start, end) = (byte_range.start as usize, byte_range.end as usize);
        Ok(Some(bytes[start..end].to_vec()))
    }

    /// Return the size in bytes of the stored value.
    ///
    /// Returns [`None`] if no value is stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size(&self) -> Result<Option<u64>, StorageError>;

    /// A description of where the value is stored, for diagnostics.
    fn location(&self) -> String;
}

/// Writable storage traits.
pub trait WritableStorageTraits: Send + Sync {
    /// Store `value`, replacing any existing value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set(&self, value: &[u8]) -> Result<(), StorageError>;

    /// Erase the stored value.
    ///
    /// Succeeds if no value is stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self) -> Result<(), StorageError>;

    /// Returns true if the storage rejects writes.
    fn readonly(&self) -> bool {
        false
    }
}

/// A supertrait of [`ReadableStorageTraits`] and [`WritableStorageTraits`].
pub trait ReadableWritableStorageTraits: ReadableStorageTraits + WritableStorageTraits {}

impl<T> ReadableWritableStorageTraits for T where T: ReadableStorageTraits + WritableStorageTraits {}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// Access to the underlying storage was denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid byte range.
    #[error("invalid byte range {0:?} for value of length {1}")]
    InvalidByteRange(Range<u64>, u64),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{store::MemoryStore, *};

    #[test]
    fn readable_get_range() {
        let store = MemoryStore::new();
        assert!(store.get_range(0..4).unwrap().is_none());
        store.set(&[0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(store.get_range(1..4).unwrap(), Some(vec![1, 2, 3]));
        assert!(matches!(
            store.get_range(4..8),
            Err(StorageError::InvalidByteRange(_, 6))
        ));
    }
}
