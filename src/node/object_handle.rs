use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::{
    config::global_config,
    container::{Container, ContainerError},
    data_type::{ArrayBytes, ArrayBytesError, DataType, DataTypeSize},
    dataspace::Dataspace,
    format::{
        AttributeMetadata, ContainerImage, DatasetMetadata, Extent, GroupMetadata, LinkMetadata,
        NamedDatatypeMetadata, ObjectAddress, ObjectMetadata,
    },
    selection::{Selection, SelectionError},
    version::ReferenceEncoding,
};

use super::{resolve, validate_link_target, AttributeHandle, NodeName, NodePath, ObjectKind};

/// A located group, dataset, or named datatype.
///
/// A handle borrows its [`Container`], so it cannot outlive it and must be released before the container is closed.
/// Handles are released by [`release`](ObjectHandle::release) or on drop.
#[derive(Debug)]
pub struct ObjectHandle<'c> {
    container: &'c Container,
    path: NodePath,
    address: ObjectAddress,
    kind: ObjectKind,
}

/// Return the number of elements of `dataspace`.
pub(crate) fn dataspace_num_elements(dataspace: &Dataspace) -> Result<u64, ContainerError> {
    dataspace
        .num_elements()
        .ok_or_else(|| SelectionError::TooManyElements(dataspace.clone()).into())
}

/// Convert an element count to a [`usize`].
pub(crate) fn num_elements_usize(num_elements: u64) -> Result<usize, ContainerError> {
    usize::try_from(num_elements).map_err(|_| ContainerError::ElementCountMismatch {
        expected: num_elements,
        got: usize::MAX as u64,
    })
}

/// Validate that `bytes` holds `num_elements` elements of `data_type`.
pub(crate) fn validate_elements(
    bytes: &ArrayBytes,
    num_elements: u64,
    data_type: &DataType,
) -> Result<(), ContainerError> {
    let got = match (bytes, data_type.size()) {
        (ArrayBytes::Fixed(bytes), DataTypeSize::Fixed(size))
            if size > 0 && bytes.len() % size == 0 =>
        {
            Some((bytes.len() / size) as u64)
        }
        (ArrayBytes::Variable(_, offsets), DataTypeSize::Variable) => {
            Some(offsets.len().saturating_sub(1) as u64)
        }
        _ => None,
    };
    if let Some(got) = got {
        if got != num_elements {
            return Err(ContainerError::ElementCountMismatch {
                expected: num_elements,
                got,
            });
        }
    }
    bytes.validate(num_elements_usize(num_elements)?, data_type)?;
    Ok(())
}

impl<'c> ObjectHandle<'c> {
    /// Locate the object at the absolute `path` in `container`.
    pub(crate) fn open(container: &'c Container, path: NodePath) -> Result<Self, ContainerError> {
        let max_link_traversals = global_config().max_link_traversals();
        let (address, kind) = container.read_image(|image| {
            let metadata = image.metadata();
            let address = resolve(
                metadata,
                metadata.root,
                path.as_str(),
                path.as_str(),
                max_link_traversals,
            )?;
            let kind = metadata
                .objects
                .get(&address)
                .map(ObjectKind::from)
                .ok_or_else(|| ContainerError::NotFound(path.to_string()))?;
            Ok((address, kind))
        })?;
        trace!(target: "refcontainer::node", %path, address, %kind, "object located");
        Ok(Self {
            container,
            path,
            address,
            kind,
        })
    }

    /// Return the container of the object.
    #[must_use]
    pub fn container(&self) -> &'c Container {
        self.container
    }

    /// Return the path the object was located by.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the address of the object within its container.
    ///
    /// Objects reached through different hard links share an address.
    #[must_use]
    pub fn address(&self) -> ObjectAddress {
        self.address
    }

    /// Return the kind of the object.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Release the handle.
    pub fn release(self) {
        trace!(target: "refcontainer::node", path = %self.path, "object released");
    }

    /// Locate the object at `path` relative to this group.
    ///
    /// An absolute `path` is located from the root group.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidPath`] if `path` is not valid, or [`ContainerError::NotFound`] if this object is not a group or `path` does not resolve to an object.
    pub fn locate(&self, path: &str) -> Result<ObjectHandle<'c>, ContainerError> {
        let path_resolved = self.path.resolve(path)?;
        if self.kind != ObjectKind::Group {
            return Err(ContainerError::NotFound(path_resolved.to_string()));
        }
        let max_link_traversals = global_config().max_link_traversals();
        let (address, kind) = self.container.read_image(|image| {
            let metadata = image.metadata();
            let address = resolve(
                metadata,
                self.address,
                path,
                path_resolved.as_str(),
                max_link_traversals,
            )?;
            let kind = metadata
                .objects
                .get(&address)
                .map(ObjectKind::from)
                .ok_or_else(|| ContainerError::NotFound(path_resolved.to_string()))?;
            Ok((address, kind))
        })?;
        trace!(target: "refcontainer::node", path = %path_resolved, address, %kind, "object located");
        Ok(ObjectHandle {
            container: self.container,
            path: path_resolved,
            address,
            kind,
        })
    }

    /// Run `f` on the metadata of the object.
    pub(crate) fn with_metadata<T>(
        &self,
        f: impl FnOnce(&ObjectMetadata, &ContainerImage) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        self.container.read_image(|image| {
            let metadata = image
                .metadata()
                .objects
                .get(&self.address)
                .ok_or_else(|| ContainerError::NotFound(self.path.to_string()))?;
            f(metadata, image)
        })
    }

    fn dataset_metadata<T>(
        &self,
        f: impl FnOnce(&DatasetMetadata, &ContainerImage) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        self.with_metadata(|metadata, image| match metadata {
            ObjectMetadata::Dataset(dataset) => f(dataset, image),
            _ => Err(self.type_mismatch(ObjectKind::Dataset)),
        })
    }

    fn type_mismatch(&self, expected: ObjectKind) -> ContainerError {
        ContainerError::TypeMismatch(format!(
            "{} is a {}, not a {expected}",
            self.path, self.kind
        ))
    }

    /// Check that elements of `data_type` can be stored in the session.
    ///
    /// Revised region references are not permitted by legacy version bounds.
    fn check_data_type(&self, data_type: DataType) -> Result<(), ContainerError> {
        let policy = self.container.version_policy();
        if data_type == DataType::RegionReference(ReferenceEncoding::Revised)
            && policy.encoding() == ReferenceEncoding::Legacy
        {
            Err(ContainerError::TypeMismatch(format!(
                "data type {data_type} is not permitted by the version bounds {}",
                policy.bounds()
            )))
        } else {
            Ok(())
        }
    }

    /// Return the names of the links of this group.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the object is not a group.
    pub fn link_names(&self) -> Result<Vec<String>, ContainerError> {
        self.with_metadata(|metadata, _| match metadata {
            ObjectMetadata::Group(group) => Ok(group.links.keys().cloned().collect()),
            _ => Err(self.type_mismatch(ObjectKind::Group)),
        })
    }

    /// Return the names of the attributes of the object.
    ///
    /// # Errors
    /// Returns [`ContainerError::UseAfterClose`] if the container is closed.
    pub fn attribute_names(&self) -> Result<Vec<String>, ContainerError> {
        self.with_metadata(|metadata, _| Ok(metadata.attributes().keys().cloned().collect()))
    }

    /// Add a link `name` to this group, creating `object` with `data` in the data segment.
    fn create_child(
        &self,
        name: &str,
        object: impl FnOnce(Option<Extent>) -> ObjectMetadata,
        data: Option<Vec<u8>>,
    ) -> Result<ObjectHandle<'c>, ContainerError> {
        let name = NodeName::new(name)?;
        let path = self.path.join(&name);
        let object = self.container.write_image(|image| {
            self.check_new_link(image, &name, &path)?;
            let extent = data.map(|data| image.append_data(&data));
            let object = object(extent);
            let kind = ObjectKind::from(&object);
            let metadata = image.metadata_mut();
            let address = metadata.insert_object(object);
            self.insert_link(image, name, LinkMetadata::Hard { address })?;
            Ok((address, kind))
        });
        let (address, kind) = object?;
        debug!(target: "refcontainer::node", %path, address, %kind, "object created");
        Ok(ObjectHandle {
            container: self.container,
            path,
            address,
            kind,
        })
    }

    fn check_new_link(
        &self,
        image: &ContainerImage,
        name: &NodeName,
        path: &NodePath,
    ) -> Result<(), ContainerError> {
        match image.metadata().objects.get(&self.address) {
            Some(ObjectMetadata::Group(group)) => {
                if group.links.contains_key(name.as_str()) {
                    Err(ContainerError::AlreadyExists(path.to_string()))
                } else {
                    Ok(())
                }
            }
            Some(_) => Err(self.type_mismatch(ObjectKind::Group)),
            None => Err(ContainerError::NotFound(self.path.to_string())),
        }
    }

    fn insert_link(
        &self,
        image: &mut ContainerImage,
        name: NodeName,
        link: LinkMetadata,
    ) -> Result<(), ContainerError> {
        match image.metadata_mut().objects.get_mut(&self.address) {
            Some(ObjectMetadata::Group(group)) => {
                group.links.insert(name.as_str().to_string(), link);
                Ok(())
            }
            _ => Err(self.type_mismatch(ObjectKind::Group)),
        }
    }

    /// Create a group `name` in this group.
    ///
    /// # Errors
    /// Returns
    ///  - [`ContainerError::InvalidName`] if `name` is not a valid [`NodeName`],
    ///  - [`ContainerError::TypeMismatch`] if this object is not a group,
    ///  - [`ContainerError::AlreadyExists`] if the group already has a link `name`, or
    ///  - [`ContainerError::PermissionDenied`] if the container is read only.
    pub fn create_group(&self, name: &str) -> Result<ObjectHandle<'c>, ContainerError> {
        self.create_child(
            name,
            |_| ObjectMetadata::Group(GroupMetadata::default()),
            None,
        )
    }

    /// Create a dataset `name` in this group with elements of `data_type` and shape `dataspace`.
    ///
    /// Fixed size elements are zero initialised, variable sized elements (e.g. revised region references) are empty.
    ///
    /// # Errors
    /// Returns
    ///  - [`ContainerError::TypeMismatch`] if `data_type` holds revised region references and the session has legacy version bounds,
    ///  - [`ContainerError::Range`] if `dataspace` has more than [`u64::MAX`] elements,
    ///  - [`ContainerError::InvalidElementBytes`] if the size of the elements exceeds [`usize::MAX`], or
    ///  - otherwise see [`create_group`](ObjectHandle::create_group).
    pub fn create_dataset(
        &self,
        name: &str,
        data_type: DataType,
        dataspace: Dataspace,
    ) -> Result<ObjectHandle<'c>, ContainerError> {
        self.check_data_type(data_type)?;
        let num_elements = num_elements_usize(dataspace_num_elements(&dataspace)?)?;
        let data = ArrayBytes::new_zeroed(num_elements, &data_type)?.to_stored_bytes();
        self.create_child(
            name,
            |extent| {
                ObjectMetadata::Dataset(DatasetMetadata {
                    data_type,
                    shape: dataspace,
                    data: extent.unwrap_or_default(),
                    attributes: BTreeMap::new(),
                })
            },
            Some(data),
        )
    }

    /// Commit `data_type` as a named datatype `name` in this group.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if `data_type` holds revised region references and the session has legacy version bounds, otherwise see [`create_group`](ObjectHandle::create_group).
    pub fn commit_datatype(
        &self,
        name: &str,
        data_type: DataType,
    ) -> Result<ObjectHandle<'c>, ContainerError> {
        self.check_data_type(data_type)?;
        self.create_child(
            name,
            |_| {
                ObjectMetadata::Datatype(NamedDatatypeMetadata {
                    data_type,
                    attributes: BTreeMap::new(),
                })
            },
            None,
        )
    }

    /// Create a hard link `name` in this group to the object at `target`.
    ///
    /// `target` is resolved relative to this group, or from the root group if it is absolute.
    ///
    /// # Errors
    /// Returns [`ContainerError::NotFound`] if `target` does not resolve to an object, otherwise see [`create_group`](ObjectHandle::create_group).
    pub fn link_hard(&self, name: &str, target: &str) -> Result<(), ContainerError> {
        let name = NodeName::new(name)?;
        let path = self.path.join(&name);
        let target_path = self.path.resolve(target)?;
        let max_link_traversals = global_config().max_link_traversals();
        self.container.write_image(|image| {
            self.check_new_link(image, &name, &path)?;
            let address = resolve(
                image.metadata(),
                self.address,
                target,
                target_path.as_str(),
                max_link_traversals,
            )?;
            self.insert_link(image, name, LinkMetadata::Hard { address })
        })?;
        debug!(target: "refcontainer::node", %path, link_target = %target_path, "hard link created");
        Ok(())
    }

    /// Create a soft link `name` in this group to `target`.
    ///
    /// The target is resolved on access, relative to this group if it is not absolute, and need not exist.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidPath`] if `target` is not a valid path, otherwise see [`create_group`](ObjectHandle::create_group).
    pub fn link_soft(&self, name: &str, target: &str) -> Result<(), ContainerError> {
        let name = NodeName::new(name)?;
        let path = self.path.join(&name);
        validate_link_target(target)?;
        self.container.write_image(|image| {
            self.check_new_link(image, &name, &path)?;
            self.insert_link(
                image,
                name,
                LinkMetadata::Soft {
                    target: target.to_string(),
                },
            )
        })?;
        debug!(target: "refcontainer::node", %path, link_target = target, "soft link created");
        Ok(())
    }

    /// Create an attribute `name` on the object with elements of `data_type` and shape `dataspace`.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidName`] if `name` is not a valid [`NodeName`], [`ContainerError::AlreadyExists`] if the attribute exists, [`ContainerError::PermissionDenied`] if the container is read only, [`ContainerError::TypeMismatch`] if `data_type` is not permitted by the version bounds, or [`ContainerError::Range`] if `dataspace` has more than [`u64::MAX`] elements.
    pub fn create_attribute(
        &self,
        name: &str,
        data_type: DataType,
        dataspace: Dataspace,
    ) -> Result<AttributeHandle<'_>, ContainerError> {
        let name = NodeName::new(name)?;
        self.check_data_type(data_type)?;
        let num_elements = num_elements_usize(dataspace_num_elements(&dataspace)?)?;
        let data = ArrayBytes::new_zeroed(num_elements, &data_type)?.to_stored_bytes();
        self.container.write_image(|image| {
            let exists = image
                .metadata()
                .objects
                .get(&self.address)
                .ok_or_else(|| ContainerError::NotFound(self.path.to_string()))?
                .attributes()
                .contains_key(name.as_str());
            if exists {
                return Err(ContainerError::AlreadyExists(format!(
                    "attribute {} of {}",
                    name.as_str(),
                    self.path
                )));
            }
            let extent = image.append_data(&data);
            if let Some(object) = image.metadata_mut().objects.get_mut(&self.address) {
                object.attributes_mut().insert(
                    name.as_str().to_string(),
                    AttributeMetadata {
                        data_type,
                        shape: dataspace,
                        data: extent,
                    },
                );
            }
            Ok(())
        })?;
        debug!(target: "refcontainer::node", path = %self.path, attribute = name.as_str(), "attribute created");
        Ok(AttributeHandle::new(self, name))
    }

    /// Open the attribute `name` of the object.
    ///
    /// # Errors
    /// Returns [`ContainerError::NotFound`] if the attribute does not exist.
    pub fn attribute(&self, name: &str) -> Result<AttributeHandle<'_>, ContainerError> {
        let name = NodeName::new(name)?;
        let exists = self.with_metadata(|metadata, _| {
            Ok(metadata.attributes().contains_key(name.as_str()))
        })?;
        if exists {
            trace!(target: "refcontainer::node", path = %self.path, attribute = name.as_str(), "attribute opened");
            Ok(AttributeHandle::new(self, name))
        } else {
            Err(ContainerError::NotFound(format!(
                "attribute {} of {}",
                name.as_str(),
                self.path
            )))
        }
    }

    /// Return the data type of a dataset or named datatype.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the object is a group.
    pub fn data_type(&self) -> Result<DataType, ContainerError> {
        self.with_metadata(|metadata, _| match metadata {
            ObjectMetadata::Dataset(dataset) => Ok(dataset.data_type),
            ObjectMetadata::Datatype(datatype) => Ok(datatype.data_type),
            ObjectMetadata::Group(_) => Err(self.type_mismatch(ObjectKind::Dataset)),
        })
    }

    /// Return the dataspace of a dataset.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the object is not a dataset.
    pub fn dataspace(&self) -> Result<Dataspace, ContainerError> {
        self.dataset_metadata(|dataset, _| Ok(dataset.shape.clone()))
    }

    /// Read the elements of a dataset.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the object is not a dataset, or [`ContainerError::InvalidElementBytes`] if the stored elements are malformed.
    pub fn read(&self) -> Result<ArrayBytes, ContainerError> {
        self.dataset_metadata(|dataset, image| {
            let stored = image.data(dataset.data)?;
            Ok(ArrayBytes::from_stored_bytes(stored, &dataset.data_type)?)
        })
    }

    /// Read the elements of a dataset in `selection`, in selection order.
    ///
    /// # Errors
    /// Returns [`ContainerError::Range`] if `selection` is not a selection of the dataspace of the dataset, otherwise see [`read`](ObjectHandle::read).
    pub fn read_elements(&self, selection: &Selection) -> Result<ArrayBytes, ContainerError> {
        let (dataspace, data_type) =
            self.dataset_metadata(|dataset, _| Ok((dataset.shape.clone(), dataset.data_type)))?;
        if selection.dataspace() != &dataspace {
            return Err(SelectionError::DataspaceMismatch {
                selection: selection.dataspace().clone(),
                dataset: dataspace,
            }
            .into());
        }
        let bytes = self.read()?;
        let linear_indices = selection
            .iter_linearised_indices()
            .map(|index| usize::try_from(index).map_err(|_| ArrayBytesError::Malformed));
        match (bytes, data_type.size()) {
            (ArrayBytes::Fixed(bytes), DataTypeSize::Fixed(size)) => {
                let mut out = Vec::with_capacity(selection.iter_indices().len() * size);
                for index in linear_indices {
                    let element = bytes
                        .get(index? * size..)
                        .and_then(|element| element.get(..size))
                        .ok_or(ArrayBytesError::Malformed)?;
                    out.extend_from_slice(element);
                }
                Ok(ArrayBytes::new_flen(out))
            }
            (bytes, _) => {
                let elements = bytes.variable_elements()?;
                let selected = linear_indices
                    .map(|index| elements.get(index?).copied().ok_or(ArrayBytesError::Malformed))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ArrayBytes::from_elements(selected))
            }
        }
    }

    /// Write the elements of a dataset.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the object is not a dataset, [`ContainerError::ElementCountMismatch`] or [`ContainerError::InvalidElementBytes`] if `bytes` are not valid elements of the dataset, or [`ContainerError::PermissionDenied`] if the container is read only.
    pub fn write(&self, bytes: &ArrayBytes) -> Result<(), ContainerError> {
        self.container.write_image(|image| {
            let Some(ObjectMetadata::Dataset(dataset)) =
                image.metadata().objects.get(&self.address)
            else {
                return Err(self.type_mismatch(ObjectKind::Dataset));
            };
            validate_elements(bytes, dataspace_num_elements(&dataset.shape)?, &dataset.data_type)?;
            let extent = image.append_data(&bytes.to_stored_bytes());
            if let Some(ObjectMetadata::Dataset(dataset)) =
                image.metadata_mut().objects.get_mut(&self.address)
            {
                dataset.data = extent;
            }
            Ok(())
        })?;
        debug!(target: "refcontainer::node", path = %self.path, size = bytes.size(), "dataset written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{storage::store::MemoryStore, version::VersionBounds};

    fn container() -> Container {
        Container::create(Arc::new(MemoryStore::new()), VersionBounds::latest()).unwrap()
    }

    #[test]
    fn object_handle_create_locate() {
        let container = container();
        let root = container.root().unwrap();
        let g1 = root.create_group("g1").unwrap();
        let g11 = g1.create_group("g1.1").unwrap();
        let dset1 = g11
            .create_dataset("dset1", DataType::Int32, Dataspace::new(vec![10, 10]))
            .unwrap();
        assert_eq!(dset1.path().as_str(), "/g1/g1.1/dset1");
        assert_eq!(dset1.kind(), ObjectKind::Dataset);

        let g12 = g1.create_group("g1.2").unwrap();
        g12.link_hard("hlink1", "/g1/g1.1/dset1").unwrap();
        let hlink1 = container.locate("/g1/g1.2/hlink1").unwrap();
        assert_eq!(hlink1.address(), dset1.address());
        assert_eq!(hlink1.path().as_str(), "/g1/g1.2/hlink1");

        let relative = g1.locate("g1.1/dset1").unwrap();
        assert_eq!(relative.address(), dset1.address());
        assert_eq!(relative.path().as_str(), "/g1/g1.1/dset1");

        assert!(matches!(
            g1.create_group("g1.1"),
            Err(ContainerError::AlreadyExists(path)) if path == "/g1/g1.1"
        ));
        assert!(matches!(
            dset1.create_group("child"),
            Err(ContainerError::TypeMismatch(_))
        ));
        assert!(matches!(
            dset1.locate("child"),
            Err(ContainerError::NotFound(_))
        ));
        assert!(matches!(
            root.create_group("a/b"),
            Err(ContainerError::InvalidName(_))
        ));
        assert!(matches!(
            container.locate("g1"),
            Err(ContainerError::InvalidPath(_))
        ));
        assert_eq!(g1.link_names().unwrap(), ["g1.1", "g1.2"]);
    }

    #[test]
    fn object_handle_create_too_many_elements() {
        let container = container();
        let root = container.root().unwrap();
        let huge = Dataspace::new(vec![1 << 40, 1 << 40]);
        assert!(matches!(
            root.create_dataset("huge", DataType::UInt8, huge.clone()),
            Err(ContainerError::Range(SelectionError::TooManyElements(_)))
        ));
        assert!(matches!(
            root.create_attribute("huge", DataType::UInt8, huge),
            Err(ContainerError::Range(SelectionError::TooManyElements(_)))
        ));
        assert!(matches!(
            root.create_dataset("wide", DataType::UInt64, Dataspace::new(vec![1 << 62])),
            Err(ContainerError::InvalidElementBytes(
                ArrayBytesError::SizeOverflow(..)
            ) | ContainerError::ElementCountMismatch { .. })
        ));
        assert!(root.link_names().unwrap().is_empty());
    }

    #[test]
    fn object_handle_soft_links() {
        let container = container();
        let root = container.root().unwrap();
        let g4 = root.create_group("g4").unwrap();
        let dset2 = g4
            .create_dataset("dset2", DataType::UInt8, Dataspace::new(vec![4]))
            .unwrap();
        let g5 = root.create_group("g5").unwrap();
        g5.link_soft("slink1", "/g4/dset2").unwrap();
        g5.link_soft("dangling", "missing").unwrap();
        assert_eq!(
            container.locate("/g5/slink1").unwrap().address(),
            dset2.address()
        );
        assert!(matches!(
            container.locate("/g5/dangling"),
            Err(ContainerError::NotFound(_))
        ));
        assert!(matches!(
            g5.link_soft("bad", "/g4/"),
            Err(ContainerError::InvalidPath(_))
        ));

        root.link_soft("cycle", "/cycle").unwrap();
        assert!(matches!(
            container.locate("/cycle"),
            Err(ContainerError::NotFound(_))
        ));
    }

    #[test]
    fn object_handle_dataset_io() {
        let container = container();
        let root = container.root().unwrap();
        let dataset = root
            .create_dataset("data", DataType::UInt16, Dataspace::new(vec![2, 2]))
            .unwrap();
        assert_eq!(dataset.dataspace().unwrap(), Dataspace::new(vec![2, 2]));
        assert_eq!(dataset.data_type().unwrap(), DataType::UInt16);
        assert_eq!(dataset.read().unwrap(), ArrayBytes::new_flen(vec![0; 8]));

        let elements: Vec<u8> = [1u16, 2, 3, 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        dataset.write(&ArrayBytes::new_flen(elements.clone())).unwrap();
        assert_eq!(dataset.read().unwrap(), ArrayBytes::new_flen(elements));

        let selection = Selection::points(dataset.dataspace().as_ref().unwrap(), vec![
            vec![1, 1],
            vec![0, 0],
        ])
        .unwrap();
        assert_eq!(
            dataset.read_elements(&selection).unwrap(),
            ArrayBytes::new_flen(vec![4, 0, 1, 0])
        );
        let other = Selection::all(&Dataspace::new(vec![4])).unwrap();
        assert!(matches!(
            dataset.read_elements(&other),
            Err(ContainerError::Range(SelectionError::DataspaceMismatch { .. }))
        ));

        assert!(matches!(
            dataset.write(&ArrayBytes::new_flen(vec![0; 6])),
            Err(ContainerError::ElementCountMismatch {
                expected: 4,
                got: 3
            })
        ));
        assert!(matches!(
            dataset.write(&ArrayBytes::new_flen(vec![0; 7])),
            Err(ContainerError::InvalidElementBytes(_))
        ));
        assert!(matches!(
            root.read(),
            Err(ContainerError::TypeMismatch(_))
        ));
    }

    #[test]
    fn object_handle_variable_dataset() {
        let container = container();
        let root = container.root().unwrap();
        let dataset = root
            .create_dataset(
                "refs",
                DataType::RegionReference(ReferenceEncoding::Revised),
                Dataspace::new(vec![2]),
            )
            .unwrap();
        let bytes = dataset.read().unwrap();
        assert_eq!(bytes.variable_elements().unwrap(), vec![b"".as_slice(), b""]);
        assert!(matches!(
            dataset.write(&ArrayBytes::from_elements([b"a".as_slice()])),
            Err(ContainerError::ElementCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn object_handle_named_datatype() {
        let container = container();
        let root = container.root().unwrap();
        let g2 = root.create_group("g2").unwrap();
        let dtype1 = g2.commit_datatype("dtype1", DataType::Float32).unwrap();
        assert_eq!(dtype1.kind(), ObjectKind::NamedDatatype);
        assert_eq!(dtype1.data_type().unwrap(), DataType::Float32);
        assert!(matches!(
            dtype1.dataspace(),
            Err(ContainerError::TypeMismatch(_))
        ));
        dtype1
            .create_attribute("units", DataType::FixedString(8), Dataspace::scalar())
            .unwrap();
        assert_eq!(dtype1.attribute_names().unwrap(), ["units"]);
    }
}
