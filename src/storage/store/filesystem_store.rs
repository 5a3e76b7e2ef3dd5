//! A single file store.

use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    ops::Range,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use thiserror::Error;

use crate::storage::{MaybeBytes, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// A synchronous store holding a container image in a single file.
#[derive(Debug)]
pub struct FilesystemStore {
    path: PathBuf,
    readonly: bool,
    lock: RwLock<()>,
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid path.
    #[error("path {0} is not valid")]
    InvalidPath(PathBuf),
    /// The path points to a directory.
    #[error("path {0} is a directory")]
    IsDirectory(PathBuf),
}

impl FilesystemStore {
    /// Create a new file system store for the file at `path`.
    ///
    /// The file does not need to exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `path`:
    ///   - is not valid UTF-8, or
    ///   - points to a directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, FilesystemStoreCreateError> {
        let path = path.as_ref().to_path_buf();
        if path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidPath(path));
        }

        let readonly = match std::fs::metadata(&path) {
            Ok(md) if md.is_dir() => return Err(FilesystemStoreCreateError::IsDirectory(path)),
            Ok(md) => md.permissions().readonly(),
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            readonly,
            lock: RwLock::default(),
        })
    }

    /// Returns the path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_read(&self) -> Result<Option<File>, StorageError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(file)),
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Ok(None),
                ErrorKind::PermissionDenied => Err(StorageError::PermissionDenied(
                    self.path.to_string_lossy().to_string(),
                )),
                _ => Err(err.into()),
            },
        }
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self) -> Result<MaybeBytes, StorageError> {
        let _lock = self.lock.read();
        let Some(mut file) = self.open_read()? else {
            return Ok(None);
        };
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn get_range(&self, byte_range: Range<u64>) -> Result<MaybeBytes, StorageError> {
        let _lock = self.lock.read();
        let Some(mut file) = self.open_read()? else {
            return Ok(None);
        };
        let size = file.metadata()?.len();
        if byte_range.start > byte_range.end || byte_range.end > size {
            return Err(StorageError::InvalidByteRange(byte_range, size));
        }
        let length = usize::try_from(byte_range.end - byte_range.start)
            .map_err(|_| StorageError::InvalidByteRange(byte_range.clone(), size))?;
        file.seek(SeekFrom::Start(byte_range.start))?;
        let mut buffer = vec![0; length];
        file.read_exact(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn size(&self) -> Result<Option<u64>, StorageError> {
        let _lock = self.lock.read();
        match std::fs::metadata(&self.path) {
            Ok(md) => Ok(Some(md.len())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn location(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, value: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let _lock = self.lock.write();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|err| {
                if err.kind() == ErrorKind::PermissionDenied {
                    StorageError::PermissionDenied(self.path.to_string_lossy().to_string())
                } else {
                    err.into()
                }
            })?;
        file.write_all(value)?;
        file.sync_all()?;
        Ok(())
    }

    fn erase(&self) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let _lock = self.lock.write();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn readonly(&self) -> bool {
        self.readonly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_set_get() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(dir.path().join("nested/file.bin"))?;
        assert!(store.get()?.is_none());
        assert!(store.size()?.is_none());
        store.set(&[0, 1, 2, 3])?;
        assert_eq!(store.get()?, Some(vec![0, 1, 2, 3]));
        assert_eq!(store.get_range(2..4)?, Some(vec![2, 3]));
        assert_eq!(store.size()?, Some(4));
        assert!(store.get_range(2..5).is_err());
        store.erase()?;
        assert!(store.get()?.is_none());
        Ok(())
    }

    #[test]
    fn filesystem_directory_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        assert!(matches!(
            FilesystemStore::new(dir.path()),
            Err(FilesystemStoreCreateError::IsDirectory(_))
        ));
        Ok(())
    }
}
