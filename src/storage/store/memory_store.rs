//! An in-memory store.

use parking_lot::RwLock;

use crate::storage::{MaybeBytes, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Option<Vec<u8>>>,
    readonly: bool,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new memory store holding `value`.
    #[must_use]
    pub fn new_with_value(value: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(Some(value)),
            readonly: false,
        }
    }

    /// Makes the store reject writes.
    #[must_use]
    pub fn into_readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self) -> Result<MaybeBytes, StorageError> {
        Ok(self.data.read().clone())
    }

    fn size(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.data.read().as_ref().map(|data| data.len() as u64))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, value: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        *self.data.write() = Some(value.to_vec());
        Ok(())
    }

    fn erase(&self) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        *self.data.write() = None;
        Ok(())
    }

    fn readonly(&self) -> bool {
        self.readonly
    }
}
