//! The container file format.
//!
//! A container image is a [`Superblock`], followed by a JSON [`ContainerMetadata`] block, followed by a data segment holding the raw bytes of datasets, attributes, and legacy reference heap entries.
//! Each region is covered by a crc32c checksum held in the superblock.
//!
//! The data segment is append-only while a container is open.
//! It is compacted to the extents still referenced by the metadata when the image is encoded.
//! Legacy reference heap entries no longer referenced by a legacy region reference token are dropped on compaction.

mod metadata;
mod superblock;

pub use metadata::{
    AttributeMetadata, ContainerMetadata, DatasetMetadata, Extent, GroupMetadata, HeapIndex,
    LinkMetadata, NamedDatatypeMetadata, ObjectAddress, ObjectMetadata,
};
pub use superblock::{Superblock, SIGNATURE, SUPERBLOCK_SIZE, SUPERBLOCK_VERSION_MAX};
pub use crate::wire::UnexpectedEofError;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    data_type::{DataType, LEGACY_REGION_REFERENCE_SIZE},
    version::{ReferenceEncoding, VersionBounds},
    wire::WireReader,
};

/// A container format error.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The container signature is missing or invalid.
    #[error("invalid container signature")]
    InvalidSignature,
    /// The container image is truncated.
    #[error("container image is truncated: {0}")]
    Truncated(#[from] UnexpectedEofError),
    /// The container image is larger than described by its superblock.
    #[error("container image has {0} trailing bytes")]
    TrailingBytes(u64),
    /// The superblock version is not supported.
    #[error("unsupported superblock version {0}")]
    UnsupportedSuperblockVersion(u8),
    /// A library version code is not known.
    #[error("unknown library version code {0}")]
    UnknownLibraryVersion(u8),
    /// A checksum does not match.
    #[error("{region} checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// The checksummed region.
        region: &'static str,
        /// The stored checksum.
        stored: u32,
        /// The computed checksum.
        computed: u32,
    },
    /// The metadata block is invalid.
    #[error("invalid container metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
    /// The metadata references a missing object or an object of the wrong kind.
    #[error("inconsistent container metadata: {0}")]
    InconsistentMetadata(String),
    /// An extent lies outside of the data segment.
    #[error("extent {extent} is outside of the data segment of length {data_length}")]
    InvalidExtent {
        /// The extent.
        extent: Extent,
        /// The length of the data segment.
        data_length: u64,
    },
}

/// An in-memory container image: metadata and the data segment.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ContainerImage {
    metadata: ContainerMetadata,
    data: Vec<u8>,
}

impl ContainerImage {
    /// Create an image of an empty container with a root group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the metadata.
    #[must_use]
    pub fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    /// Return the mutable metadata.
    pub fn metadata_mut(&mut self) -> &mut ContainerMetadata {
        &mut self.metadata
    }

    /// Return the length of the data segment.
    #[must_use]
    pub fn data_length(&self) -> u64 {
        self.data.len() as u64
    }

    /// Append `bytes` to the data segment and return their extent.
    pub fn append_data(&mut self, bytes: &[u8]) -> Extent {
        let extent = Extent {
            offset: self.data_length(),
            length: bytes.len() as u64,
        };
        self.data.extend_from_slice(bytes);
        extent
    }

    /// Return the bytes of `extent` in the data segment.
    ///
    /// # Errors
    /// Returns [`FormatError::InvalidExtent`] if the extent is outside of the data segment.
    pub fn data(&self, extent: Extent) -> Result<&[u8], FormatError> {
        let invalid = || FormatError::InvalidExtent {
            extent,
            data_length: self.data_length(),
        };
        let start = usize::try_from(extent.offset).map_err(|_| invalid())?;
        let end = usize::try_from(extent.length)
            .ok()
            .and_then(|length| start.checked_add(length))
            .filter(|end| *end <= self.data.len())
            .ok_or_else(invalid)?;
        Ok(&self.data[start..end])
    }

    /// Rewrite the data segment to hold only the extents referenced by the metadata.
    ///
    /// Heap entries that are not referenced by a legacy region reference held in a dataset or attribute are removed.
    ///
    /// # Errors
    /// Returns [`FormatError::InvalidExtent`] if the metadata references an extent outside of the data segment.
    pub fn compact(&mut self) -> Result<(), FormatError> {
        let referenced = self.referenced_heap_indices()?;
        let mut metadata = self.metadata.clone();
        metadata.heap.retain(|index, _| referenced.contains(index));
        let mut data = Vec::new();
        for extent in metadata.extents_mut() {
            let bytes = self.data(*extent)?;
            extent.offset = data.len() as u64;
            data.extend_from_slice(bytes);
        }
        self.metadata = metadata;
        self.data = data;
        Ok(())
    }

    /// Return the heap indices held by the legacy region reference tokens of datasets and attributes.
    fn referenced_heap_indices(&self) -> Result<BTreeSet<HeapIndex>, FormatError> {
        let legacy = DataType::RegionReference(ReferenceEncoding::Legacy);
        let mut indices = BTreeSet::new();
        for object in self.metadata.objects.values() {
            let dataset = match object {
                ObjectMetadata::Dataset(dataset) if dataset.data_type == legacy => Some(dataset.data),
                _ => None,
            };
            let attributes = object
                .attributes()
                .values()
                .filter(|attribute| attribute.data_type == legacy)
                .map(|attribute| attribute.data);
            for extent in dataset.into_iter().chain(attributes) {
                // tokens are a u64 object address followed by a u32 heap index
                for token in self.data(extent)?.chunks_exact(LEGACY_REGION_REFERENCE_SIZE) {
                    let mut index = [0; 4];
                    index.copy_from_slice(&token[8..]);
                    indices.insert(HeapIndex::from_le_bytes(index));
                }
            }
        }
        Ok(indices)
    }

    /// Encode the image with a superblock of `superblock_version` recording `bounds`.
    ///
    /// The data segment is encoded as is, call [`compact`](ContainerImage::compact) first to drop unreferenced bytes.
    ///
    /// # Errors
    /// Returns [`FormatError::InvalidMetadata`] if the metadata cannot be serialised.
    pub fn encode(
        &self,
        superblock_version: u8,
        bounds: VersionBounds,
    ) -> Result<Vec<u8>, FormatError> {
        let metadata = serde_json::to_vec_pretty(&self.metadata)?;
        let superblock = Superblock {
            version: superblock_version,
            bounds,
            metadata_length: metadata.len() as u64,
            data_length: self.data_length(),
            metadata_checksum: crc32c::crc32c(&metadata),
            data_checksum: crc32c::crc32c(&self.data),
        };
        let mut bytes = Vec::with_capacity(SUPERBLOCK_SIZE + metadata.len() + self.data.len());
        bytes.extend_from_slice(&superblock.encode());
        bytes.extend_from_slice(&metadata);
        bytes.extend_from_slice(&self.data);
        Ok(bytes)
    }

    /// Decode an image.
    ///
    /// Checksums are validated if `validate_checksums` is true.
    ///
    /// # Errors
    /// Returns a [`FormatError`] if the image is invalid.
    pub fn decode(bytes: &[u8], validate_checksums: bool) -> Result<(Superblock, Self), FormatError> {
        let superblock = Superblock::decode(bytes, validate_checksums)?;
        let mut reader = WireReader::new(bytes);
        reader.read_bytes(SUPERBLOCK_SIZE)?;
        let metadata = read_region(&mut reader, superblock.metadata_length)?;
        let data = read_region(&mut reader, superblock.data_length)?;
        if reader.remaining() > 0 {
            return Err(FormatError::TrailingBytes(reader.remaining() as u64));
        }
        if validate_checksums {
            validate_checksum("metadata", metadata, superblock.metadata_checksum)?;
            validate_checksum("data", data, superblock.data_checksum)?;
        }

        let image = Self {
            metadata: serde_json::from_slice(metadata)?,
            data: data.to_vec(),
        };
        image.validate()?;
        Ok((superblock, image))
    }

    /// Validate the consistency of the metadata.
    fn validate(&self) -> Result<(), FormatError> {
        let metadata = &self.metadata;
        if !matches!(
            metadata.objects.get(&metadata.root),
            Some(ObjectMetadata::Group(_))
        ) {
            return Err(FormatError::InconsistentMetadata(format!(
                "root group {} does not exist",
                metadata.root
            )));
        }
        for (address, object) in &metadata.objects {
            if *address >= metadata.next_address {
                return Err(FormatError::InconsistentMetadata(format!(
                    "object address {address} is not below the next address {}",
                    metadata.next_address
                )));
            }
            if let ObjectMetadata::Group(group) = object {
                for (name, link) in &group.links {
                    if let LinkMetadata::Hard { address: target } = link {
                        if !metadata.objects.contains_key(target) {
                            return Err(FormatError::InconsistentMetadata(format!(
                                "link {name} of object {address} targets missing object {target}"
                            )));
                        }
                    }
                }
            }
            let extents = match object {
                ObjectMetadata::Dataset(dataset) => Some(dataset.data),
                _ => None,
            }
            .into_iter()
            .chain(object.attributes().values().map(|attribute| attribute.data));
            for extent in extents {
                self.data(extent)?;
            }
        }
        for (index, extent) in &metadata.heap {
            if *index >= metadata.next_heap_index {
                return Err(FormatError::InconsistentMetadata(format!(
                    "heap index {index} is not below the next heap index {}",
                    metadata.next_heap_index
                )));
            }
            self.data(*extent)?;
        }
        Ok(())
    }
}

fn read_region<'a>(
    reader: &mut WireReader<'a>,
    length: u64,
) -> Result<&'a [u8], FormatError> {
    let length = usize::try_from(length).unwrap_or(usize::MAX);
    Ok(reader.read_bytes(length)?)
}

fn validate_checksum(region: &'static str, bytes: &[u8], stored: u32) -> Result<(), FormatError> {
    let computed = crc32c::crc32c(bytes);
    if computed == stored {
        Ok(())
    } else {
        Err(FormatError::ChecksumMismatch {
            region,
            stored,
            computed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::dataspace::Dataspace;

    fn image_with_dataset() -> ContainerImage {
        let mut image = ContainerImage::new();
        let stale = image.append_data(&[9; 16]);
        let data = image.append_data(&[1, 2, 3, 4]);
        let metadata = image.metadata_mut();
        let address = metadata.insert_object(ObjectMetadata::Dataset(DatasetMetadata {
            data_type: DataType::UInt8,
            shape: Dataspace::new(vec![4]),
            data,
            attributes: BTreeMap::new(),
        }));
        let ObjectMetadata::Group(root) = metadata.objects.get_mut(&metadata.root).unwrap() else {
            panic!()
        };
        root.links
            .insert("dataset".to_string(), LinkMetadata::Hard { address });
        assert_eq!(stale.length, 16);
        image
    }

    #[test]
    fn container_image_compact_encode_decode() {
        let mut image = image_with_dataset();
        assert_eq!(image.data_length(), 20);
        image.compact().unwrap();
        assert_eq!(image.data_length(), 4);

        let bytes = image.encode(1, VersionBounds::latest()).unwrap();
        let (superblock, image_decoded) = ContainerImage::decode(&bytes, true).unwrap();
        assert_eq!(superblock.version, 1);
        assert_eq!(superblock.bounds, VersionBounds::latest());
        assert_eq!(image_decoded, image);
        let ObjectMetadata::Dataset(dataset) = &image_decoded.metadata().objects[&1] else {
            panic!()
        };
        assert_eq!(image_decoded.data(dataset.data).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn container_image_corrupt() {
        let mut image = image_with_dataset();
        image.compact().unwrap();
        let bytes = image.encode(0, VersionBounds::legacy()).unwrap();

        let mut corrupt = bytes.clone();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xff;
        assert!(matches!(
            ContainerImage::decode(&corrupt, true),
            Err(FormatError::ChecksumMismatch { region: "data", .. })
        ));
        assert!(ContainerImage::decode(&corrupt, false).is_ok());

        assert!(matches!(
            ContainerImage::decode(&bytes[..bytes.len() - 1], true),
            Err(FormatError::Truncated(_))
        ));
        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            ContainerImage::decode(&trailing, true),
            Err(FormatError::TrailingBytes(1))
        ));
        assert!(matches!(
            ContainerImage::decode(b"not a container", true),
            Err(FormatError::InvalidSignature)
        ));
    }

    #[test]
    fn container_image_invalid_extent() {
        let mut image = ContainerImage::new();
        assert!(matches!(
            image.data(Extent {
                offset: 2,
                length: 1
            }),
            Err(FormatError::InvalidExtent { .. })
        ));
        image.metadata_mut().insert_object(ObjectMetadata::Dataset(DatasetMetadata {
            data_type: DataType::UInt8,
            shape: Dataspace::new(vec![8]),
            data: Extent {
                offset: 0,
                length: 8,
            },
            attributes: BTreeMap::new(),
        }));
        assert!(matches!(
            image.compact(),
            Err(FormatError::InvalidExtent { .. })
        ));
    }

    #[test]
    fn container_image_compact_heap() {
        let mut image = ContainerImage::new();
        let mut tokens = Vec::new();
        for selection in [[0u8; 2], [1; 2], [2; 2]] {
            let extent = image.append_data(&selection);
            let index = image.metadata_mut().insert_heap_entry(extent).unwrap();
            if index != 1 {
                tokens.extend_from_slice(&1u64.to_le_bytes());
                tokens.extend_from_slice(&index.to_le_bytes());
            }
        }
        let data = image.append_data(&tokens);
        image
            .metadata_mut()
            .insert_object(ObjectMetadata::Dataset(DatasetMetadata {
                data_type: DataType::RegionReference(ReferenceEncoding::Legacy),
                shape: Dataspace::new(vec![2]),
                data,
                attributes: BTreeMap::new(),
            }));
        image.compact().unwrap();

        let metadata = image.metadata();
        assert_eq!(metadata.heap.keys().copied().collect::<Vec<_>>(), [0, 2]);
        assert_eq!(metadata.next_heap_index, 3);
        assert_eq!(image.data(metadata.heap[&2]).unwrap(), &[2, 2]);
        assert_eq!(image.data_length(), 4 + 24);
    }

    #[test]
    fn container_image_heap_index_inconsistent() {
        let mut image = ContainerImage::new();
        let extent = image.append_data(&[0; 2]);
        image.metadata_mut().heap.insert(4, extent);
        let bytes = image.encode(0, VersionBounds::legacy()).unwrap();
        assert!(matches!(
            ContainerImage::decode(&bytes, true),
            Err(FormatError::InconsistentMetadata(_))
        ));
    }
}
