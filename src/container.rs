//! Containers.
//!
//! A [`Container`] is an open session on a single-file hierarchical container held in [storage](crate::storage).
//! It is opened with an [`AccessMode`] and a pair of [`VersionBounds`], which are resolved once by [`VersionPolicy::resolve`] into the [`ResolvedVersionPolicy`] consulted by every reference operation of the session.
//!
//! The container image is read into memory on open and written back to storage on [`flush`](Container::flush) and [`close`](Container::close).
//! Objects are located with [`Container::locate`], which returns an [`ObjectHandle`] borrowing the container.
//! Handles must be released before the container can be closed.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! # use refcontainer::container::{AccessMode, Container};
//! # use refcontainer::storage::store::MemoryStore;
//! # use refcontainer::version::VersionBounds;
//! let store = Arc::new(MemoryStore::new());
//! let mut container = Container::create(store.clone(), VersionBounds::latest())?;
//! container.root()?.create_group("g4")?;
//! container.close()?;
//!
//! let mut container = Container::open(store, AccessMode::ReadOnly, VersionBounds::latest())?;
//! let g4 = container.locate("/g4")?;
//! assert_eq!(g4.path().as_str(), "/g4");
//! g4.release();
//! container.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{collections::BTreeSet, path::Path, sync::Arc};

use derive_more::Display;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::global_config,
    data_type::ArrayBytesError,
    format::{
        ContainerImage, FormatError, LinkMetadata, ObjectAddress, ObjectMetadata, Superblock,
        SUPERBLOCK_SIZE,
    },
    node::{NodeNameError, NodePath, NodePathError, ObjectHandle},
    reference::ReferenceWriter,
    selection::SelectionError,
    storage::{
        store::{FilesystemStore, FilesystemStoreCreateError},
        ReadableWritableStorage, StorageError,
    },
    version::{ResolvedVersionPolicy, VersionBounds, VersionBoundsError, VersionPolicy},
};

/// The access mode of a container session.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Read only access.
    #[display("read-only")]
    ReadOnly,
    /// Read and write access.
    #[display("read-write")]
    ReadWrite,
}

/// A container error.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Invalid or incompatible version bounds.
    #[error(transparent)]
    Configuration(#[from] VersionBoundsError),
    /// A container, object, link, or attribute does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Access was denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The container image is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// A selection is out of range.
    #[error(transparent)]
    Range(#[from] SelectionError),
    /// An object, element, or reference has an unexpected type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// An underlying storage error.
    #[error(transparent)]
    IOError(StorageError),
    /// The container has been closed.
    #[error("the container has been closed")]
    UseAfterClose,
    /// An invalid node path.
    #[error(transparent)]
    InvalidPath(#[from] NodePathError),
    /// An invalid link or attribute name.
    #[error(transparent)]
    InvalidName(#[from] NodeNameError),
    /// A link or attribute already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// The number of elements does not match.
    #[error("expected {expected} elements, got {got}")]
    ElementCountMismatch {
        /// The expected number of elements.
        expected: u64,
        /// The number of elements given.
        got: u64,
    },
    /// A value does not fit.
    #[error("a value of {got} bytes does not fit in {expected} bytes")]
    ValueSizeMismatch {
        /// The size available.
        expected: usize,
        /// The size of the value.
        got: usize,
    },
    /// Element bytes are malformed.
    #[error(transparent)]
    InvalidElementBytes(#[from] ArrayBytesError),
    /// A reference element has not been written.
    #[error("reference element {0} is null")]
    NullReference(usize),
    /// A reference token is malformed or does not resolve.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    /// The legacy reference heap has no free indices.
    #[error("the legacy reference heap of {0} is exhausted")]
    HeapExhausted(String),
}

impl From<StorageError> for ContainerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ReadOnly => Self::PermissionDenied(err.to_string()),
            StorageError::PermissionDenied(location) => Self::PermissionDenied(location),
            StorageError::IOError(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(err.to_string())
            }
            err => Self::IOError(err),
        }
    }
}

impl From<FilesystemStoreCreateError> for ContainerError {
    fn from(err: FilesystemStoreCreateError) -> Self {
        match err {
            FilesystemStoreCreateError::IOError(err) => StorageError::IOError(err).into(),
            FilesystemStoreCreateError::InvalidPath(_)
            | FilesystemStoreCreateError::IsDirectory(_) => {
                Self::IOError(StorageError::Other(err.to_string()))
            }
        }
    }
}

/// The in-memory state of an open session.
#[derive(Debug)]
struct OpenSession {
    image: ContainerImage,
    dirty: bool,
}

#[derive(Debug)]
enum Session {
    Open(OpenSession),
    Closed,
}

/// An open container session.
///
/// A read-write container that is dropped without being [closed](Container::close) is flushed on drop.
/// Errors on drop are logged but otherwise ignored, so prefer an explicit [`close`](Container::close).
pub struct Container {
    storage: ReadableWritableStorage,
    mode: AccessMode,
    policy: ResolvedVersionPolicy,
    session: RwLock<Session>,
}

impl core::fmt::Debug for Container {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Container")
            .field("location", &self.storage.location())
            .field("mode", &self.mode)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Open the container held in `storage` with `mode` and version `bounds`.
    ///
    /// # Errors
    /// Returns
    ///  - [`ContainerError::Configuration`] if `bounds` are inconsistent or do not permit the container's superblock version,
    ///  - [`ContainerError::NotFound`] if `storage` holds no container,
    ///  - [`ContainerError::PermissionDenied`] if `mode` is [`AccessMode::ReadWrite`] and `storage` is read only, or access is denied,
    ///  - [`ContainerError::Format`] if the container image is malformed, or
    ///  - [`ContainerError::IOError`] on any other storage error.
    pub fn open(
        storage: ReadableWritableStorage,
        mode: AccessMode,
        bounds: VersionBounds,
    ) -> Result<Self, ContainerError> {
        let policy = VersionPolicy::resolve(bounds)?;
        if mode == AccessMode::ReadWrite && storage.readonly() {
            return Err(ContainerError::PermissionDenied(format!(
                "{} is read only",
                storage.location()
            )));
        }
        let not_found = || ContainerError::NotFound(storage.location());
        let validate_checksums = global_config().validate_checksums();

        // Reject incompatible containers before reading the whole image
        let size = storage.size()?.ok_or_else(not_found)?;
        if size >= SUPERBLOCK_SIZE as u64 {
            let superblock = storage
                .get_range(0..SUPERBLOCK_SIZE as u64)?
                .ok_or_else(not_found)?;
            let superblock = Superblock::decode(&superblock, validate_checksums)?;
            policy.check_superblock_version(superblock.version)?;
        }

        let bytes = storage.get()?.ok_or_else(not_found)?;
        let (superblock, image) = ContainerImage::decode(&bytes, validate_checksums)?;
        policy.check_superblock_version(superblock.version)?;

        debug!(
            target: "refcontainer::container",
            location = %storage.location(),
            %mode,
            bounds = %policy.bounds(),
            encoding = %policy.encoding(),
            superblock_version = superblock.version,
            "container opened"
        );
        Ok(Self {
            storage,
            mode,
            policy,
            session: RwLock::new(Session::Open(OpenSession {
                image,
                dirty: false,
            })),
        })
    }

    /// Open the container file at `path` with `mode` and version `bounds`.
    ///
    /// # Errors
    /// See [`Container::open`].
    pub fn open_path<P: AsRef<Path>>(
        path: P,
        mode: AccessMode,
        bounds: VersionBounds,
    ) -> Result<Self, ContainerError> {
        let store = Arc::new(FilesystemStore::new(path)?);
        Self::open(store, mode, bounds)
    }

    /// Open the container file at `path` with `mode` and the [default version bounds](crate::config::Config#default-version-bounds).
    ///
    /// # Errors
    /// See [`Container::open`].
    pub fn open_path_default<P: AsRef<Path>>(
        path: P,
        mode: AccessMode,
    ) -> Result<Self, ContainerError> {
        let bounds = global_config().default_version_bounds();
        Self::open_path(path, mode, bounds)
    }

    /// Create a new empty container in `storage` with version `bounds`, replacing any existing value.
    ///
    /// The container is opened read-write and holds an empty root group.
    ///
    /// # Errors
    /// Returns [`ContainerError::Configuration`] if `bounds` are inconsistent, or a storage error if the container cannot be written.
    pub fn create(
        storage: ReadableWritableStorage,
        bounds: VersionBounds,
    ) -> Result<Self, ContainerError> {
        let policy = VersionPolicy::resolve(bounds)?;
        if storage.readonly() {
            return Err(ContainerError::PermissionDenied(format!(
                "{} is read only",
                storage.location()
            )));
        }
        let container = Self {
            storage,
            mode: AccessMode::ReadWrite,
            policy,
            session: RwLock::new(Session::Open(OpenSession {
                image: ContainerImage::new(),
                dirty: true,
            })),
        };
        container.flush()?;
        debug!(
            target: "refcontainer::container",
            location = %container.storage.location(),
            bounds = %policy.bounds(),
            encoding = %policy.encoding(),
            "container created"
        );
        Ok(container)
    }

    /// Create a new empty container file at `path` with version `bounds`, truncating any existing file.
    ///
    /// # Errors
    /// See [`Container::create`].
    pub fn create_path<P: AsRef<Path>>(
        path: P,
        bounds: VersionBounds,
    ) -> Result<Self, ContainerError> {
        let store = Arc::new(FilesystemStore::new(path)?);
        Self::create(store, bounds)
    }

    /// Return the access mode.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Return the resolved version policy of the session.
    #[must_use]
    pub fn version_policy(&self) -> ResolvedVersionPolicy {
        self.policy
    }

    /// Return a description of where the container is stored.
    #[must_use]
    pub fn location(&self) -> String {
        self.storage.location()
    }

    /// Returns true if the container has not been closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(*self.session.read(), Session::Open(_))
    }

    /// Return a [`ReferenceWriter`] using the reference encoding of the session.
    #[must_use]
    pub fn reference_writer(&self) -> ReferenceWriter {
        ReferenceWriter::new(self.policy.encoding())
    }

    /// Locate the object at the absolute `path`.
    ///
    /// Soft links are followed up to the [max link traversals](crate::config::Config#max-link-traversals) and hard links alias the object they target.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidPath`] if `path` is not a valid absolute path, [`ContainerError::NotFound`] if it does not resolve to an object, or [`ContainerError::UseAfterClose`] if the container is closed.
    pub fn locate(&self, path: &str) -> Result<ObjectHandle<'_>, ContainerError> {
        ObjectHandle::open(self, NodePath::new(path)?)
    }

    /// Locate the root group.
    ///
    /// # Errors
    /// Returns [`ContainerError::UseAfterClose`] if the container is closed.
    pub fn root(&self) -> Result<ObjectHandle<'_>, ContainerError> {
        ObjectHandle::open(self, NodePath::root())
    }

    /// Write the in-memory container image to storage.
    ///
    /// The data segment is compacted first.
    /// The superblock version is the lowest able to describe the container contents, so a session with revised version bounds only raises it when revised region references are stored.
    /// This is a no-op for read-only sessions and sessions without modifications.
    ///
    /// # Errors
    /// Returns [`ContainerError::UseAfterClose`] if the container is closed, or an error if the image cannot be encoded or stored.
    pub fn flush(&self) -> Result<(), ContainerError> {
        let mut session = self.session.write();
        let Session::Open(open) = &mut *session else {
            return Err(ContainerError::UseAfterClose);
        };
        if self.mode == AccessMode::ReadOnly || !open.dirty {
            return Ok(());
        }
        open.image.compact()?;
        let superblock_version = open.image.metadata().superblock_version();
        let bytes = open.image.encode(superblock_version, self.policy.bounds())?;
        self.storage.set(&bytes)?;
        open.dirty = false;
        debug!(
            target: "refcontainer::container",
            location = %self.storage.location(),
            size = bytes.len(),
            superblock_version,
            "container flushed"
        );
        Ok(())
    }

    /// Flush and close the container.
    ///
    /// The session is closed even if the final flush fails.
    ///
    /// # Errors
    /// Returns [`ContainerError::UseAfterClose`] if the container is already closed, or the error of the final [`flush`](Container::flush).
    pub fn close(&mut self) -> Result<(), ContainerError> {
        if !self.is_open() {
            return Err(ContainerError::UseAfterClose);
        }
        let result = self.flush();
        *self.session.get_mut() = Session::Closed;
        debug!(
            target: "refcontainer::container",
            location = %self.storage.location(),
            ok = result.is_ok(),
            "container closed"
        );
        result
    }

    /// Return a tree representation of the container hierarchy as a string.
    ///
    /// Datasets are annotated with their shape and data type, named datatypes with their data type, and soft links with their target.
    /// A group reached again through a hard link is not expanded a second time.
    /// For example:
    /// ```text
    /// /
    ///   g1
    ///     g1.1
    ///       dset1 [10, 10] int32
    ///   g2
    ///     dtype1 datatype float32
    ///   g5
    ///     slink1 -> /g4/dset2
    /// ```
    ///
    /// # Errors
    /// Returns [`ContainerError::UseAfterClose`] if the container is closed.
    pub fn hierarchy_tree(&self) -> Result<String, ContainerError> {
        fn update_tree(
            string: &mut String,
            image: &ContainerImage,
            address: ObjectAddress,
            depth: usize,
            visited: &mut BTreeSet<ObjectAddress>,
        ) {
            let Some(ObjectMetadata::Group(group)) = image.metadata().objects.get(&address) else {
                return;
            };
            if !visited.insert(address) {
                return;
            }
            for (name, link) in &group.links {
                string.push_str(&" ".repeat(depth * 2));
                string.push_str(name);
                match link {
                    LinkMetadata::Soft { target } => {
                        string.push_str(&format!(" -> {target}\n"));
                    }
                    LinkMetadata::Hard { address } => {
                        match image.metadata().objects.get(address) {
                            Some(ObjectMetadata::Dataset(dataset)) => {
                                string.push_str(&format!(
                                    " {} {}",
                                    dataset.shape, dataset.data_type
                                ));
                            }
                            Some(ObjectMetadata::Datatype(datatype)) => {
                                string.push_str(&format!(" datatype {}", datatype.data_type));
                            }
                            Some(ObjectMetadata::Group(_)) | None => {}
                        }
                        string.push('\n');
                        update_tree(string, image, *address, depth + 1, visited);
                    }
                }
            }
        }

        self.read_image(|image| {
            let mut string = "/\n".to_string();
            let mut visited = BTreeSet::new();
            update_tree(
                &mut string,
                image,
                image.metadata().root,
                1,
                &mut visited,
            );
            Ok(string)
        })
    }

    /// Run `f` on the container image.
    pub(crate) fn read_image<T>(
        &self,
        f: impl FnOnce(&ContainerImage) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        match &*self.session.read() {
            Session::Open(open) => f(&open.image),
            Session::Closed => Err(ContainerError::UseAfterClose),
        }
    }

    /// Run `f` on the mutable container image and mark the image as modified if `f` succeeds.
    ///
    /// `f` must leave the image unmodified if it fails.
    pub(crate) fn write_image<T>(
        &self,
        f: impl FnOnce(&mut ContainerImage) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        if self.mode == AccessMode::ReadOnly {
            return Err(ContainerError::PermissionDenied(format!(
                "{} is open read-only",
                self.storage.location()
            )));
        }
        match &mut *self.session.write() {
            Session::Open(open) => {
                let result = f(&mut open.image)?;
                open.dirty = true;
                Ok(result)
            }
            Session::Closed => Err(ContainerError::UseAfterClose),
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        let dirty = matches!(self.session.get_mut(), Session::Open(open) if open.dirty);
        if !dirty || std::thread::panicking() {
            return;
        }
        if let Err(err) = self.flush() {
            warn!(
                target: "refcontainer::container",
                location = %self.storage.location(),
                error = %err,
                "failed to flush container on drop"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_type::DataType,
        dataspace::Dataspace,
        storage::{store::MemoryStore, ReadableStorageTraits},
        version::{LibraryVersion, ReferenceEncoding},
    };

    #[test]
    fn container_create_open_close() {
        let store = Arc::new(MemoryStore::new());
        let mut container = Container::create(store.clone(), VersionBounds::latest()).unwrap();
        assert!(store.get().unwrap().is_some());
        assert_eq!(container.mode(), AccessMode::ReadWrite);
        container.close().unwrap();
        assert!(!container.is_open());
        assert!(matches!(
            container.close(),
            Err(ContainerError::UseAfterClose)
        ));
        assert!(matches!(
            container.locate("/"),
            Err(ContainerError::UseAfterClose)
        ));
        assert!(matches!(
            container.flush(),
            Err(ContainerError::UseAfterClose)
        ));

        let mut container =
            Container::open(store, AccessMode::ReadOnly, VersionBounds::latest()).unwrap();
        assert_eq!(container.hierarchy_tree().unwrap(), "/\n");
        container.close().unwrap();
    }

    #[test]
    fn container_open_not_found() {
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            Container::open(store, AccessMode::ReadOnly, VersionBounds::latest()),
            Err(ContainerError::NotFound(_))
        ));
    }

    #[test]
    fn container_open_format_error() {
        let store = Arc::new(MemoryStore::new_with_value(b"not a container".to_vec()));
        assert!(matches!(
            Container::open(store, AccessMode::ReadOnly, VersionBounds::latest()),
            Err(ContainerError::Format(FormatError::InvalidSignature))
        ));
    }

    #[test]
    fn container_open_inconsistent_bounds() {
        let store = Arc::new(MemoryStore::new());
        Container::create(store.clone(), VersionBounds::latest()).unwrap();
        assert!(matches!(
            Container::open(
                store,
                AccessMode::ReadOnly,
                VersionBounds::new(LibraryVersion::V114, LibraryVersion::V18)
            ),
            Err(ContainerError::Configuration(
                VersionBoundsError::Inconsistent(..)
            ))
        ));
    }

    #[test]
    fn container_open_incompatible_superblock() {
        let store = Arc::new(MemoryStore::new());
        let container = Container::create(store.clone(), VersionBounds::latest()).unwrap();
        container
            .root()
            .unwrap()
            .create_dataset(
                "refs",
                DataType::RegionReference(ReferenceEncoding::Revised),
                Dataspace::new(vec![1]),
            )
            .unwrap();
        drop(container);
        assert!(matches!(
            Container::open(store.clone(), AccessMode::ReadOnly, VersionBounds::legacy()),
            Err(ContainerError::Configuration(
                VersionBoundsError::IncompatibleContainer(1, _)
            ))
        ));

        // a legacy container remains readable by a revised session
        let store = Arc::new(MemoryStore::new());
        Container::create(store.clone(), VersionBounds::legacy()).unwrap();
        assert!(Container::open(store, AccessMode::ReadOnly, VersionBounds::latest()).is_ok());
    }

    #[test]
    fn container_revised_session_keeps_legacy_superblock() {
        let store = Arc::new(MemoryStore::new());
        Container::create(store.clone(), VersionBounds::latest())
            .unwrap()
            .close()
            .unwrap();
        let superblock_version = |store: &MemoryStore| {
            let bytes = store.get().unwrap().unwrap();
            Superblock::decode(&bytes, true).unwrap().version
        };
        assert_eq!(superblock_version(&store), 0);

        let mut container =
            Container::open(store.clone(), AccessMode::ReadWrite, VersionBounds::latest()).unwrap();
        let root = container.root().unwrap();
        root.create_dataset("legacy", DataType::UInt8, Dataspace::new(vec![4]))
            .unwrap()
            .write(&crate::data_type::ArrayBytes::new_flen(vec![1, 2, 3, 4]))
            .unwrap();
        root.release();
        container.close().unwrap();
        assert_eq!(superblock_version(&store), 0);
        let container =
            Container::open(store.clone(), AccessMode::ReadOnly, VersionBounds::legacy()).unwrap();
        assert!(container.locate("/legacy").is_ok());
        drop(container);

        let mut container =
            Container::open(store.clone(), AccessMode::ReadWrite, VersionBounds::latest()).unwrap();
        let writer = container.reference_writer();
        container
            .root()
            .unwrap()
            .create_dataset("refs", writer.data_type(), Dataspace::new(vec![1]))
            .unwrap();
        container.close().unwrap();
        assert_eq!(superblock_version(&store), 1);
    }

    #[test]
    fn container_read_only() {
        let store = Arc::new(MemoryStore::new());
        Container::create(store.clone(), VersionBounds::latest()).unwrap();
        let container =
            Container::open(store.clone(), AccessMode::ReadOnly, VersionBounds::latest()).unwrap();
        assert!(matches!(
            container.root().unwrap().create_group("g1"),
            Err(ContainerError::PermissionDenied(_))
        ));

        let bytes = store.get().unwrap().unwrap();
        let readonly = Arc::new(MemoryStore::new_with_value(bytes).into_readonly());
        assert!(matches!(
            Container::open(readonly, AccessMode::ReadWrite, VersionBounds::latest()),
            Err(ContainerError::PermissionDenied(_))
        ));
    }

    #[test]
    fn container_flush_on_drop() {
        let store = Arc::new(MemoryStore::new());
        {
            let container = Container::create(store.clone(), VersionBounds::latest()).unwrap();
            container.root().unwrap().create_group("g1").unwrap();
        }
        let container =
            Container::open(store.clone(), AccessMode::ReadOnly, VersionBounds::latest()).unwrap();
        assert!(container.locate("/g1").is_ok());
    }

    #[test]
    fn container_hierarchy_tree() {
        let store = Arc::new(MemoryStore::new());
        let container = Container::create(store, VersionBounds::latest()).unwrap();
        let root = container.root().unwrap();
        let g1 = root.create_group("g1").unwrap();
        g1.create_dataset(
            "dset1",
            crate::data_type::DataType::Int32,
            crate::dataspace::Dataspace::new(vec![10, 10]),
        )
        .unwrap();
        g1.link_hard("again", "/g1").unwrap();
        root.link_soft("slink1", "/g1/dset1").unwrap();
        assert_eq!(
            container.hierarchy_tree().unwrap(),
            "/\n  g1\n    again\n    dset1 [10, 10] int32\n  slink1 -> /g1/dset1\n"
        );
    }
}
