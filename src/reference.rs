//! Dataset region references.
//!
//! A [`Reference`] names a target dataset and a [`Selection`] of its elements.
//! References are stored in datasets of [`DataType::RegionReference`] in one of two encodings:
//!  - [`ReferenceEncoding::Legacy`]: a fixed 12 byte token holding the target object address (`u64`) and the index (`u32`) of a heap entry holding the encoded selection.
//!    Legacy tokens are only meaningful within the container they were written to.
//!  - [`ReferenceEncoding::Revised`]: a self-describing variable length token holding the target path and the encoded selection.
//!
//! The encoding of a session is fixed by its [`ResolvedVersionPolicy`](crate::version::ResolvedVersionPolicy) and every reference operation goes through a [`ReferenceWriter`] of that encoding.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! # use refcontainer::container::Container;
//! # use refcontainer::data_type::DataType;
//! # use refcontainer::dataspace::Dataspace;
//! # use refcontainer::selection::Selection;
//! # use refcontainer::storage::store::MemoryStore;
//! # use refcontainer::version::VersionBounds;
//! let container = Container::create(Arc::new(MemoryStore::new()), VersionBounds::latest())?;
//! let root = container.root()?;
//! let dataset = root.create_dataset("data", DataType::UInt8, Dataspace::new(vec![100]))?;
//! let writer = container.reference_writer();
//! root.create_dataset("refs", writer.data_type(), Dataspace::new(vec![1]))?;
//!
//! let selection = Selection::hyperslab(&dataset.dataspace()?, &[2], &[5], &[15], &[2])?;
//! let reference = writer.encode(&dataset, selection)?;
//! writer.write(&container, "/refs", &[reference])?;
//!
//! let references = writer.read(&container, "/refs")?;
//! let (target, selection) = references[0].resolve(&container)?;
//! assert_eq!(target.path().as_str(), "/data");
//! assert_eq!(selection.num_elements(), 30);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use tracing::{debug, trace};

use crate::{
    config::global_config,
    container::{Container, ContainerError},
    data_type::{ArrayBytes, DataType, LEGACY_REGION_REFERENCE_SIZE},
    dataspace::Dataspace,
    format::{ContainerImage, HeapIndex, ObjectAddress, ObjectMetadata},
    node::{dataspace_num_elements, find_path, resolve, NodePath, ObjectHandle, ObjectKind},
    selection::{Selection, SelectionError},
    version::ReferenceEncoding,
    wire::{UnexpectedEofError, WireReader},
};

/// The version of the revised token layout.
const REVISED_TOKEN_VERSION: u8 = 1;

/// The revised token type of a dataset region reference.
const REVISED_TOKEN_TYPE_REGION: u8 = 2;

/// A dataset region reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reference {
    /// A legacy reference, bound to an object address of one container.
    Legacy {
        /// The address of the target dataset.
        address: ObjectAddress,
        /// The selection of the target dataset.
        selection: Selection,
    },
    /// A revised reference.
    Revised {
        /// The path of the target dataset.
        path: NodePath,
        /// The selection of the target dataset.
        selection: Selection,
    },
}

impl Reference {
    /// Return the encoding of the reference.
    #[must_use]
    pub fn encoding(&self) -> ReferenceEncoding {
        match self {
            Self::Legacy { .. } => ReferenceEncoding::Legacy,
            Self::Revised { .. } => ReferenceEncoding::Revised,
        }
    }

    /// Return the selection of the target dataset.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        match self {
            Self::Legacy { selection, .. } | Self::Revised { selection, .. } => selection,
        }
    }

    /// Return the path of the target dataset in `container`.
    ///
    /// The path of a legacy reference is the shortest path of hard links to its target.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidReference`] if the target of a legacy reference is not reachable in `container`.
    pub fn object_path(&self, container: &Container) -> Result<NodePath, ContainerError> {
        match self {
            Self::Legacy { address, .. } => container.read_image(|image| {
                find_path(image.metadata(), *address).ok_or_else(|| {
                    ContainerError::InvalidReference(format!(
                        "object {address} is not reachable from the root group"
                    ))
                })
            }),
            Self::Revised { path, .. } => Ok(path.clone()),
        }
    }

    /// Locate the target dataset in `container` and return it with the selection.
    ///
    /// # Errors
    /// Returns
    ///  - [`ContainerError::NotFound`] or [`ContainerError::InvalidReference`] if the target does not exist,
    ///  - [`ContainerError::TypeMismatch`] if the target is not a dataset, or
    ///  - [`ContainerError::Range`] if the selection does not match the dataspace of the target.
    pub fn resolve<'c>(
        &self,
        container: &'c Container,
    ) -> Result<(ObjectHandle<'c>, Selection), ContainerError> {
        let path = self.object_path(container)?;
        let target = container.locate(path.as_str())?;
        if target.kind() != ObjectKind::Dataset {
            return Err(ContainerError::TypeMismatch(format!(
                "reference target {path} is a {}, not a dataset",
                target.kind()
            )));
        }
        check_dataspace(self.selection(), &target.dataspace()?)?;
        trace!(target: "refcontainer::reference", %path, encoding = %self.encoding(), "reference resolved");
        Ok((target, self.selection().clone()))
    }

    /// Destroy the reference, releasing the buffers it owns.
    ///
    /// A legacy reference owns no buffers, so this is a no-op.
    pub fn destroy(self) {
        trace!(target: "refcontainer::reference", encoding = %self.encoding(), "reference destroyed");
    }
}

fn check_dataspace(selection: &Selection, dataspace: &Dataspace) -> Result<(), SelectionError> {
    if selection.dataspace() == dataspace {
        Ok(())
    } else {
        Err(SelectionError::DataspaceMismatch {
            selection: selection.dataspace().clone(),
            dataset: dataspace.clone(),
        })
    }
}

/// Encodes, writes, and reads [`Reference`]s of one [`ReferenceEncoding`].
///
/// Use [`Container::reference_writer`] for the writer of a container session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceWriter {
    encoding: ReferenceEncoding,
}

impl ReferenceWriter {
    /// Create a reference writer for `encoding`.
    #[must_use]
    pub const fn new(encoding: ReferenceEncoding) -> Self {
        Self { encoding }
    }

    /// Return the reference encoding.
    #[must_use]
    pub const fn encoding(&self) -> ReferenceEncoding {
        self.encoding
    }

    /// Return the data type of datasets holding references of this encoding.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        DataType::RegionReference(self.encoding)
    }

    /// Create a reference to `selection` of the `target` dataset.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if `target` is not a dataset, or [`ContainerError::Range`] if `selection` is not a selection of the dataspace of `target`.
    pub fn encode(
        &self,
        target: &ObjectHandle<'_>,
        selection: Selection,
    ) -> Result<Reference, ContainerError> {
        if target.kind() != ObjectKind::Dataset {
            return Err(ContainerError::TypeMismatch(format!(
                "reference target {} is a {}, not a dataset",
                target.path(),
                target.kind()
            )));
        }
        check_dataspace(&selection, &target.dataspace()?)?;
        Ok(match self.encoding {
            ReferenceEncoding::Legacy => Reference::Legacy {
                address: target.address(),
                selection,
            },
            ReferenceEncoding::Revised => Reference::Revised {
                path: target.path().clone(),
                selection,
            },
        })
    }

    /// Check that `dataset` holds references of this encoding.
    fn check_dataset(&self, dataset: &ObjectHandle<'_>) -> Result<(), ContainerError> {
        let data_type = dataset.data_type()?;
        if dataset.kind() == ObjectKind::Dataset && data_type == self.data_type() {
            Ok(())
        } else {
            Err(ContainerError::TypeMismatch(format!(
                "{} has data type {data_type}, expected {}",
                dataset.path(),
                self.data_type()
            )))
        }
    }

    /// Write `references` to the dataset at `dataset_path`, one reference per element.
    ///
    /// Legacy references store their selection in the container heap.
    ///
    /// # Errors
    /// Returns
    ///  - [`ContainerError::TypeMismatch`] if the dataset does not hold references of this encoding or a reference has another encoding,
    ///  - [`ContainerError::ElementCountMismatch`] if the number of references is not the number of dataset elements,
    ///  - [`ContainerError::InvalidReference`] if the target of a legacy reference is not a dataset of `container`,
    ///  - [`ContainerError::HeapExhausted`] if the heap has no indices left for legacy references, or
    ///  - [`ContainerError::PermissionDenied`] if the container is read only.
    pub fn write(
        &self,
        container: &Container,
        dataset_path: &str,
        references: &[Reference],
    ) -> Result<(), ContainerError> {
        let dataset = container.locate(dataset_path)?;
        self.check_dataset(&dataset)?;
        if let Some(reference) = references.iter().find(|r| r.encoding() != self.encoding) {
            return Err(ContainerError::TypeMismatch(format!(
                "cannot write a {} reference with a {} reference writer",
                reference.encoding(),
                self.encoding
            )));
        }
        let num_elements = dataspace_num_elements(&dataset.dataspace()?)?;
        if references.len() as u64 != num_elements {
            return Err(ContainerError::ElementCountMismatch {
                expected: num_elements,
                got: references.len() as u64,
            });
        }

        match self.encoding {
            ReferenceEncoding::Legacy => write_legacy(container, &dataset, references)?,
            ReferenceEncoding::Revised => {
                let tokens: Vec<Vec<u8>> = references
                    .iter()
                    .filter_map(|reference| match reference {
                        Reference::Revised { path, selection } => {
                            Some(encode_revised(path, selection))
                        }
                        Reference::Legacy { .. } => None,
                    })
                    .collect();
                dataset.write(&ArrayBytes::from_elements(tokens.iter().map(Vec::as_slice)))?;
            }
        }
        debug!(
            target: "refcontainer::reference",
            path = %dataset.path(),
            encoding = %self.encoding,
            count = references.len(),
            "references written"
        );
        Ok(())
    }

    /// Read the references held by the dataset at `dataset_path`.
    ///
    /// # Errors
    /// Returns
    ///  - [`ContainerError::TypeMismatch`] if the dataset does not hold references of this encoding,
    ///  - [`ContainerError::NullReference`] if an element has never been written, or
    ///  - [`ContainerError::InvalidReference`] or [`ContainerError::Range`] if an element is not a valid reference.
    pub fn read(
        &self,
        container: &Container,
        dataset_path: &str,
    ) -> Result<Vec<Reference>, ContainerError> {
        let dataset = container.locate(dataset_path)?;
        self.check_dataset(&dataset)?;
        let bytes = dataset.read()?;
        let references = container.read_image(|image| match self.encoding {
            ReferenceEncoding::Legacy => bytes
                .into_fixed()?
                .chunks(LEGACY_REGION_REFERENCE_SIZE)
                .enumerate()
                .map(|(i, token)| decode_legacy(image, i, token))
                .collect::<Result<Vec<_>, _>>(),
            ReferenceEncoding::Revised => bytes
                .variable_elements()?
                .into_iter()
                .enumerate()
                .map(|(i, token)| decode_revised(image, i, token))
                .collect::<Result<Vec<_>, _>>(),
        })?;
        trace!(
            target: "refcontainer::reference",
            path = %dataset.path(),
            encoding = %self.encoding,
            count = references.len(),
            "references read"
        );
        Ok(references)
    }
}

/// Store the selections of legacy `references` in the heap and write their tokens to `dataset`.
fn write_legacy(
    container: &Container,
    dataset: &ObjectHandle<'_>,
    references: &[Reference],
) -> Result<(), ContainerError> {
    container.write_image(|image| {
        for reference in references {
            if let Reference::Legacy { address, selection } = reference {
                let target = target_dataspace(image, *address).ok_or_else(|| {
                    ContainerError::InvalidReference(format!(
                        "object {address} is not a dataset of {}",
                        container.location()
                    ))
                })?;
                check_dataspace(selection, target)?;
            }
        }
        let exhausted = || ContainerError::HeapExhausted(container.location());
        if references.len() as u64 > image.metadata().heap_entries_available() {
            return Err(exhausted());
        }

        let mut tokens = Vec::with_capacity(references.len() * LEGACY_REGION_REFERENCE_SIZE);
        for reference in references {
            if let Reference::Legacy { address, selection } = reference {
                let extent = image.append_data(&selection.encode());
                let heap_index = image
                    .metadata_mut()
                    .insert_heap_entry(extent)
                    .ok_or_else(exhausted)?;
                tokens.extend_from_slice(&encode_legacy(*address, heap_index));
            }
        }
        let extent = image.append_data(&tokens);
        match image.metadata_mut().objects.get_mut(&dataset.address()) {
            Some(ObjectMetadata::Dataset(metadata)) => {
                metadata.data = extent;
                Ok(())
            }
            _ => Err(ContainerError::NotFound(dataset.path().to_string())),
        }
    })
}

/// Return the dataspace of the dataset at `address`.
fn target_dataspace(image: &ContainerImage, address: ObjectAddress) -> Option<&Dataspace> {
    match image.metadata().objects.get(&address) {
        Some(ObjectMetadata::Dataset(dataset)) => Some(&dataset.shape),
        _ => None,
    }
}

fn encode_legacy(address: ObjectAddress, heap_index: HeapIndex) -> [u8; LEGACY_REGION_REFERENCE_SIZE] {
    let mut token = [0; LEGACY_REGION_REFERENCE_SIZE];
    token[..8].copy_from_slice(&address.to_le_bytes());
    token[8..].copy_from_slice(&heap_index.to_le_bytes());
    token
}

/// Decode the legacy token of element `index`.
///
/// The root group can never be a reference target, so a zero address is a null reference.
fn decode_legacy(
    image: &ContainerImage,
    index: usize,
    token: &[u8],
) -> Result<Reference, ContainerError> {
    let invalid = |message: String| {
        ContainerError::InvalidReference(format!("element {index}: {message}"))
    };
    let mut reader = WireReader::new(token);
    let address = reader
        .read_u64()
        .map_err(|err| invalid(err.to_string()))?;
    let heap_index = reader
        .read_u32()
        .map_err(|err| invalid(err.to_string()))?;
    if address == image.metadata().root {
        return Err(ContainerError::NullReference(index));
    }
    let dataspace = target_dataspace(image, address)
        .ok_or_else(|| invalid(format!("object {address} is not a dataset")))?;
    let extent = image
        .metadata()
        .heap
        .get(&heap_index)
        .ok_or_else(|| invalid(format!("heap entry {heap_index} does not exist")))?;
    let selection = Selection::decode(image.data(*extent)?, dataspace)?;
    Ok(Reference::Legacy { address, selection })
}

fn encode_revised(path: &NodePath, selection: &Selection) -> Vec<u8> {
    let path = path.as_str();
    let mut token = vec![REVISED_TOKEN_VERSION, REVISED_TOKEN_TYPE_REGION];
    token.extend_from_slice(&0u16.to_le_bytes());
    // Node paths are far shorter than 4 GiB
    #[allow(clippy::cast_possible_truncation)]
    token.extend_from_slice(&(path.len() as u32).to_le_bytes());
    token.extend_from_slice(path.as_bytes());
    selection.encode_into(&mut token);
    token
}

/// Read the version, type, flags, and path length of a revised token.
fn read_revised_header(
    reader: &mut WireReader<'_>,
) -> Result<(u8, u8, u16, u32), UnexpectedEofError> {
    Ok((
        reader.read_u8()?,
        reader.read_u8()?,
        reader.read_u16()?,
        reader.read_u32()?,
    ))
}

/// Decode the revised token of element `index`.
///
/// An empty token is a null reference.
fn decode_revised(
    image: &ContainerImage,
    index: usize,
    token: &[u8],
) -> Result<Reference, ContainerError> {
    if token.is_empty() {
        return Err(ContainerError::NullReference(index));
    }
    let invalid = |message: String| {
        ContainerError::InvalidReference(format!("element {index}: {message}"))
    };
    let mut reader = WireReader::new(token);
    let (version, token_type, flags, path_length) =
        read_revised_header(&mut reader).map_err(|err| invalid(err.to_string()))?;
    if version != REVISED_TOKEN_VERSION {
        return Err(invalid(format!("unsupported token version {version}")));
    }
    if token_type != REVISED_TOKEN_TYPE_REGION || flags != 0 {
        return Err(invalid(format!(
            "token type {token_type} with flags {flags:#06x} is not a dataset region reference"
        )));
    }
    let path = reader
        .read_bytes(path_length as usize)
        .map_err(|err| invalid(err.to_string()))?;
    let path = std::str::from_utf8(path).map_err(|err| invalid(err.to_string()))?;
    let path = NodePath::new(path).map_err(|err| invalid(err.to_string()))?;

    let metadata = image.metadata();
    let address = resolve(
        metadata,
        metadata.root,
        path.as_str(),
        path.as_str(),
        global_config().max_link_traversals(),
    )?;
    let dataspace = target_dataspace(image, address)
        .ok_or_else(|| invalid(format!("{path} is not a dataset")))?;
    let selection = Selection::decode(&token[reader.position()..], dataspace)?;
    Ok(Reference::Revised { path, selection })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        storage::store::MemoryStore,
        version::{LibraryVersion, VersionBounds},
    };

    const POINTS: [u64; 10] = [16, 22, 38, 41, 52, 63, 70, 89, 97, 3];

    fn container(bounds: VersionBounds) -> Container {
        let container = Container::create(Arc::new(MemoryStore::new()), bounds).unwrap();
        let group = container.root().unwrap().create_group("Group").unwrap();
        group
            .create_dataset("Dataset", DataType::UInt8, Dataspace::new(vec![100]))
            .unwrap();
        container
    }

    fn selections(dataspace: &Dataspace) -> [Selection; 2] {
        [
            Selection::hyperslab(dataspace, &[2], &[5], &[15], &[2]).unwrap(),
            Selection::points(dataspace, POINTS.iter().map(|p| vec![*p]).collect()).unwrap(),
        ]
    }

    fn round_trip(bounds: VersionBounds, encoding: ReferenceEncoding) {
        let container = container(bounds);
        let writer = container.reference_writer();
        assert_eq!(writer.encoding(), encoding);
        container
            .root()
            .unwrap()
            .create_dataset("refs", writer.data_type(), Dataspace::new(vec![2]))
            .unwrap();

        let dataset = container.locate("/Group/Dataset").unwrap();
        let dataspace = dataset.dataspace().unwrap();
        let references = selections(&dataspace)
            .map(|selection| writer.encode(&dataset, selection).unwrap());
        assert!(references.iter().all(|r| r.encoding() == encoding));
        writer.write(&container, "/refs", &references).unwrap();

        let references_read = writer.read(&container, "/refs").unwrap();
        assert_eq!(references_read, references);
        for (reference, selection) in references_read.iter().zip(selections(&dataspace)) {
            let (target, selection_resolved) = reference.resolve(&container).unwrap();
            assert_eq!(target.address(), dataset.address());
            assert_eq!(target.path().as_str(), "/Group/Dataset");
            assert_eq!(selection_resolved, selection);
        }
        let points: Vec<u64> = references_read[1]
            .selection()
            .iter_linearised_indices()
            .collect();
        assert_eq!(points, POINTS);
        references.into_iter().for_each(Reference::destroy);
    }

    #[test]
    fn reference_round_trip_revised() {
        round_trip(VersionBounds::latest(), ReferenceEncoding::Revised);
    }

    #[test]
    fn reference_round_trip_legacy() {
        round_trip(VersionBounds::legacy(), ReferenceEncoding::Legacy);
    }

    #[test]
    fn reference_legacy_token() {
        let container = container(VersionBounds::legacy());
        let writer = container.reference_writer();
        let root = container.root().unwrap();
        let refs = root
            .create_dataset("refs", writer.data_type(), Dataspace::new(vec![1]))
            .unwrap();
        let dataset = container.locate("/Group/Dataset").unwrap();
        let selection = Selection::all(&dataset.dataspace().unwrap()).unwrap();
        let reference = writer.encode(&dataset, selection).unwrap();
        writer.write(&container, "/refs", &[reference]).unwrap();
        let token = refs.read().unwrap().into_fixed().unwrap();
        assert_eq!(token.len(), LEGACY_REGION_REFERENCE_SIZE);
        assert_eq!(token[..8], dataset.address().to_le_bytes());
    }

    #[test]
    fn reference_type_mismatch() {
        let container = container(VersionBounds::legacy());
        let writer = container.reference_writer();
        let root = container.root().unwrap();
        assert!(matches!(
            root.create_dataset(
                "revised",
                DataType::RegionReference(ReferenceEncoding::Revised),
                Dataspace::new(vec![2]),
            ),
            Err(ContainerError::TypeMismatch(_))
        ));
        root.create_dataset("ints", DataType::Int32, Dataspace::new(vec![2]))
            .unwrap();
        root.create_dataset("legacy", writer.data_type(), Dataspace::new(vec![2]))
            .unwrap();

        let dataset = container.locate("/Group/Dataset").unwrap();
        let references =
            selections(&dataset.dataspace().unwrap()).map(|s| writer.encode(&dataset, s).unwrap());
        assert!(matches!(
            writer.write(&container, "/ints", &references),
            Err(ContainerError::TypeMismatch(_))
        ));
        assert!(matches!(
            writer.write(&container, "/legacy", &references[..1]),
            Err(ContainerError::ElementCountMismatch {
                expected: 2,
                got: 1
            })
        ));

        let revised = ReferenceWriter::new(ReferenceEncoding::Revised)
            .encode(&dataset, references[0].selection().clone())
            .unwrap();
        assert!(matches!(
            writer.write(&container, "/legacy", &[references[0].clone(), revised.clone()]),
            Err(ContainerError::TypeMismatch(_))
        ));
        assert!(matches!(
            ReferenceWriter::new(ReferenceEncoding::Revised).write(
                &container,
                "/legacy",
                &[revised.clone(), revised]
            ),
            Err(ContainerError::TypeMismatch(_))
        ));
        assert!(matches!(
            writer.encode(&root, references[0].selection().clone()),
            Err(ContainerError::TypeMismatch(_))
        ));
    }

    #[test]
    fn reference_legacy_heap_exhausted() {
        let container = container(VersionBounds::legacy());
        let writer = container.reference_writer();
        let refs = container
            .root()
            .unwrap()
            .create_dataset("refs", writer.data_type(), Dataspace::new(vec![2]))
            .unwrap();
        let dataset = container.locate("/Group/Dataset").unwrap();
        let references =
            selections(&dataset.dataspace().unwrap()).map(|s| writer.encode(&dataset, s).unwrap());
        container
            .write_image(|image| {
                image.metadata_mut().next_heap_index = HeapIndex::MAX - 1;
                Ok(())
            })
            .unwrap();
        let stored = refs.read().unwrap();
        assert!(matches!(
            writer.write(&container, "/refs", &references),
            Err(ContainerError::HeapExhausted(_))
        ));
        assert_eq!(refs.read().unwrap(), stored);
        let heap_len = container
            .read_image(|image| Ok(image.metadata().heap.len()))
            .unwrap();
        assert_eq!(heap_len, 0);
    }

    #[test]
    fn reference_legacy_overwrite_reclaims_heap() {
        let store = Arc::new(MemoryStore::new());
        let container = Container::create(store.clone(), VersionBounds::legacy()).unwrap();
        let root = container.root().unwrap();
        let dataset = root
            .create_dataset("data", DataType::UInt8, Dataspace::new(vec![100]))
            .unwrap();
        let writer = container.reference_writer();
        root.create_dataset("refs", writer.data_type(), Dataspace::new(vec![2]))
            .unwrap();
        let references =
            selections(&dataset.dataspace().unwrap()).map(|s| writer.encode(&dataset, s).unwrap());
        for _ in 0..3 {
            writer.write(&container, "/refs", &references).unwrap();
        }
        container.flush().unwrap();
        let heap: Vec<HeapIndex> = container
            .read_image(|image| Ok(image.metadata().heap.keys().copied().collect()))
            .unwrap();
        assert_eq!(heap, [4, 5]);
        assert_eq!(writer.read(&container, "/refs").unwrap(), references);
        drop((dataset, root));
        drop(container);

        let container = Container::open(
            store,
            crate::container::AccessMode::ReadOnly,
            VersionBounds::legacy(),
        )
        .unwrap();
        assert_eq!(
            container.reference_writer().read(&container, "/refs").unwrap(),
            references
        );
    }

    #[test]
    fn reference_null() {
        for bounds in [VersionBounds::legacy(), VersionBounds::latest()] {
            let container = container(bounds);
            let writer = container.reference_writer();
            container
                .root()
                .unwrap()
                .create_dataset("refs", writer.data_type(), Dataspace::new(vec![3]))
                .unwrap();
            assert!(matches!(
                writer.read(&container, "/refs"),
                Err(ContainerError::NullReference(0))
            ));
        }
    }

    #[test]
    fn reference_selection_mismatch() {
        let container = container(VersionBounds::new(LibraryVersion::V18, LibraryVersion::V110));
        let writer = container.reference_writer();
        let dataset = container.locate("/Group/Dataset").unwrap();
        let selection = Selection::all(&Dataspace::new(vec![10, 10])).unwrap();
        assert!(matches!(
            writer.encode(&dataset, selection),
            Err(ContainerError::Range(SelectionError::DataspaceMismatch { .. }))
        ));
    }

    #[test]
    fn reference_revised_invalid_token() {
        let container = container(VersionBounds::latest());
        let root = container.root().unwrap();
        let refs = root
            .create_dataset(
                "refs",
                DataType::RegionReference(ReferenceEncoding::Revised),
                Dataspace::new(vec![1]),
            )
            .unwrap();
        let writer = container.reference_writer();
        for token in [
            vec![2, 2, 0, 0, 0, 0, 0, 0],
            vec![1, 2, 0, 0, 255, 0, 0, 0, b'/'],
            vec![1, 2, 0, 0, 8, 0, 0, 0, b'/', b'm', b'i', b's', b's', b'i', b'n', b'g', 0, 1],
        ] {
            refs.write(&ArrayBytes::from_elements([token.as_slice()]))
                .unwrap();
            assert!(writer.read(&container, "/refs").is_err());
        }
    }
}
