use std::collections::BTreeMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{data_type::DataType, dataspace::Dataspace, version::ReferenceEncoding};

/// The address of an object within a container.
pub type ObjectAddress = u64;

/// The index of an entry in the legacy reference heap.
pub type HeapIndex = u32;

/// A byte extent within the data segment of a container.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default, Display)]
#[display("offset {offset} length {length}")]
pub struct Extent {
    /// The offset of the extent from the start of the data segment.
    pub offset: u64,
    /// The length of the extent.
    pub length: u64,
}

/// Container metadata, stored as JSON in the metadata block of a container.
///
/// An example `JSON` document for a container with a single dataset:
/// ```json
/// {
///     "root": 0,
///     "next_address": 2,
///     "objects": {
///         "0": {
///             "node_type": "group",
///             "links": {
///                 "Dataset": { "link_type": "hard", "address": 1 }
///             }
///         },
///         "1": {
///             "node_type": "dataset",
///             "data_type": "uint8",
///             "shape": [100],
///             "data": { "offset": 0, "length": 100 }
///         }
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct ContainerMetadata {
    /// The address of the root group.
    pub root: ObjectAddress,
    /// The address assigned to the next created object.
    pub next_address: ObjectAddress,
    /// Objects by address.
    pub objects: BTreeMap<ObjectAddress, ObjectMetadata>,
    /// Legacy reference heap entries (encoded selections) by index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub heap: BTreeMap<HeapIndex, Extent>,
    /// The index assigned to the next heap entry.
    #[serde(default)]
    pub next_heap_index: HeapIndex,
}

/// The metadata of an object.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum ObjectMetadata {
    /// A group.
    Group(GroupMetadata),
    /// A dataset.
    Dataset(DatasetMetadata),
    /// A named (committed) datatype.
    Datatype(NamedDatatypeMetadata),
}

/// A link from a group to an object.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(tag = "link_type", rename_all = "snake_case")]
pub enum LinkMetadata {
    /// A hard link to an object address.
    Hard {
        /// The target object address.
        address: ObjectAddress,
    },
    /// A soft link to an absolute or relative path.
    Soft {
        /// The target path.
        target: String,
    },
}

/// Group metadata.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
pub struct GroupMetadata {
    /// Links by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, LinkMetadata>,
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeMetadata>,
}

/// Dataset metadata.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct DatasetMetadata {
    /// The element data type.
    pub data_type: DataType,
    /// The dataset shape.
    pub shape: Dataspace,
    /// The stored elements.
    pub data: Extent,
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeMetadata>,
}

/// Named datatype metadata.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct NamedDatatypeMetadata {
    /// The committed data type.
    pub data_type: DataType,
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeMetadata>,
}

/// Attribute metadata.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct AttributeMetadata {
    /// The element data type.
    pub data_type: DataType,
    /// The attribute shape.
    pub shape: Dataspace,
    /// The stored elements.
    pub data: Extent,
}

impl ObjectMetadata {
    /// Return the attributes of the object.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, AttributeMetadata> {
        match self {
            Self::Group(group) => &group.attributes,
            Self::Dataset(dataset) => &dataset.attributes,
            Self::Datatype(datatype) => &datatype.attributes,
        }
    }

    /// Return the mutable attributes of the object.
    pub fn attributes_mut(&mut self) -> &mut BTreeMap<String, AttributeMetadata> {
        match self {
            Self::Group(group) => &mut group.attributes,
            Self::Dataset(dataset) => &mut dataset.attributes,
            Self::Datatype(datatype) => &mut datatype.attributes,
        }
    }

    /// Return the extents of the data segment referenced by the object.
    pub(crate) fn extents_mut(&mut self) -> impl Iterator<Item = &mut Extent> {
        let (data, attributes) = match self {
            Self::Group(group) => (None, &mut group.attributes),
            Self::Dataset(dataset) => (Some(&mut dataset.data), &mut dataset.attributes),
            Self::Datatype(datatype) => (None, &mut datatype.attributes),
        };
        data.into_iter()
            .chain(attributes.values_mut().map(|attribute| &mut attribute.data))
    }
}

impl ContainerMetadata {
    /// Create container metadata with an empty root group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: 0,
            next_address: 1,
            objects: BTreeMap::from([(0, ObjectMetadata::Group(GroupMetadata::default()))]),
            heap: BTreeMap::new(),
            next_heap_index: 0,
        }
    }

    /// Insert `object` at a newly allocated address and return the address.
    pub fn insert_object(&mut self, object: ObjectMetadata) -> ObjectAddress {
        let address = self.next_address;
        self.next_address += 1;
        self.objects.insert(address, object);
        address
    }

    /// Return the number of heap entries that can still be inserted.
    ///
    /// Heap indices are never reused.
    #[must_use]
    pub fn heap_entries_available(&self) -> u64 {
        u64::from(HeapIndex::MAX - self.next_heap_index)
    }

    /// Insert a heap entry holding `extent` and return its index.
    ///
    /// Returns [`None`] if the heap indices are exhausted.
    pub fn insert_heap_entry(&mut self, extent: Extent) -> Option<HeapIndex> {
        let index = self.next_heap_index;
        self.next_heap_index = index.checked_add(1)?;
        self.heap.insert(index, extent);
        Some(index)
    }

    /// Returns true if a dataset, attribute, or named datatype holds elements of `data_type`.
    #[must_use]
    pub fn holds_data_type(&self, data_type: DataType) -> bool {
        self.objects.values().any(|object| {
            let object_data_type = match object {
                ObjectMetadata::Group(_) => None,
                ObjectMetadata::Dataset(dataset) => Some(dataset.data_type),
                ObjectMetadata::Datatype(datatype) => Some(datatype.data_type),
            };
            object_data_type == Some(data_type)
                || object
                    .attributes()
                    .values()
                    .any(|attribute| attribute.data_type == data_type)
        })
    }

    /// Return the superblock version required to describe the container.
    ///
    /// This is the version of the revised reference encoding if the container holds revised region references, otherwise the version of the legacy encoding.
    #[must_use]
    pub fn superblock_version(&self) -> u8 {
        if self.holds_data_type(DataType::RegionReference(ReferenceEncoding::Revised)) {
            ReferenceEncoding::Revised.superblock_version()
        } else {
            ReferenceEncoding::Legacy.superblock_version()
        }
    }

    /// Return all extents of the data segment referenced by the metadata.
    pub(crate) fn extents_mut(&mut self) -> impl Iterator<Item = &mut Extent> {
        self.objects
            .values_mut()
            .flat_map(ObjectMetadata::extents_mut)
            .chain(self.heap.values_mut())
    }
}

impl Default for ContainerMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_metadata_json() {
        let mut metadata = ContainerMetadata::new();
        let dataset = metadata.insert_object(ObjectMetadata::Dataset(DatasetMetadata {
            data_type: DataType::UInt8,
            shape: Dataspace::new(vec![100]),
            data: Extent {
                offset: 0,
                length: 100,
            },
            attributes: BTreeMap::new(),
        }));
        let ObjectMetadata::Group(root) = metadata.objects.get_mut(&0).unwrap() else {
            panic!()
        };
        root.links
            .insert("Dataset".to_string(), LinkMetadata::Hard { address: dataset });
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "root": 0,
                "next_address": 2,
                "objects": {
                    "0": {
                        "node_type": "group",
                        "links": {
                            "Dataset": { "link_type": "hard", "address": 1 }
                        }
                    },
                    "1": {
                        "node_type": "dataset",
                        "data_type": "uint8",
                        "shape": [100],
                        "data": { "offset": 0, "length": 100 }
                    }
                },
                "next_heap_index": 0
            })
        );
        let metadata_decoded: ContainerMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(metadata_decoded, metadata);
    }

    #[test]
    fn container_metadata_extents() {
        let mut metadata = ContainerMetadata::new();
        metadata.insert_heap_entry(Extent {
            offset: 4,
            length: 2,
        });
        metadata.insert_object(ObjectMetadata::Datatype(NamedDatatypeMetadata {
            data_type: DataType::Float32,
            attributes: BTreeMap::from([(
                "units".to_string(),
                AttributeMetadata {
                    data_type: DataType::FixedString(2),
                    shape: Dataspace::scalar(),
                    data: Extent {
                        offset: 0,
                        length: 2,
                    },
                },
            )]),
        }));
        assert_eq!(metadata.extents_mut().count(), 2);
        assert_eq!(metadata.next_heap_index, 1);
        assert_eq!(metadata.superblock_version(), 0);
    }

    #[test]
    fn container_metadata_heap_exhausted() {
        let mut metadata = ContainerMetadata::new();
        assert_eq!(metadata.heap_entries_available(), u64::from(u32::MAX));
        metadata.next_heap_index = HeapIndex::MAX - 1;
        assert_eq!(metadata.heap_entries_available(), 1);
        assert_eq!(
            metadata.insert_heap_entry(Extent::default()),
            Some(HeapIndex::MAX - 1)
        );
        assert_eq!(metadata.heap_entries_available(), 0);
        assert_eq!(metadata.insert_heap_entry(Extent::default()), None);
        assert_eq!(metadata.next_heap_index, HeapIndex::MAX);
        assert_eq!(metadata.heap.len(), 1);
    }

    #[test]
    fn container_metadata_superblock_version() {
        let revised = DataType::RegionReference(ReferenceEncoding::Revised);
        let mut metadata = ContainerMetadata::new();
        metadata.insert_object(ObjectMetadata::Dataset(DatasetMetadata {
            data_type: DataType::RegionReference(ReferenceEncoding::Legacy),
            shape: Dataspace::new(vec![2]),
            data: Extent::default(),
            attributes: BTreeMap::new(),
        }));
        assert_eq!(metadata.superblock_version(), 0);

        let mut with_attribute = metadata.clone();
        with_attribute
            .objects
            .get_mut(&0)
            .unwrap()
            .attributes_mut()
            .insert(
                "refs".to_string(),
                AttributeMetadata {
                    data_type: revised,
                    shape: Dataspace::new(vec![1]),
                    data: Extent::default(),
                },
            );
        assert!(with_attribute.holds_data_type(revised));
        assert_eq!(with_attribute.superblock_version(), 1);

        metadata.insert_object(ObjectMetadata::Dataset(DatasetMetadata {
            data_type: revised,
            shape: Dataspace::new(vec![2]),
            data: Extent::default(),
            attributes: BTreeMap::new(),
        }));
        assert_eq!(metadata.superblock_version(), 1);
    }

    #[test]
    fn extent_display() {
        let extent = Extent {
            offset: u64::MAX,
            length: 1,
        };
        assert_eq!(extent.to_string(), format!("offset {} length 1", u64::MAX));
    }
}
