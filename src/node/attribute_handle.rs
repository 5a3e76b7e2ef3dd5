use tracing::{debug, trace};

use crate::{
    container::ContainerError,
    data_type::{ArrayBytes, ArrayBytesError, DataType},
    dataspace::Dataspace,
    format::{AttributeMetadata, ContainerImage, ObjectMetadata},
};

use super::{
    object_handle::{dataspace_num_elements, num_elements_usize, validate_elements},
    NodeName, ObjectHandle,
};

/// An attribute of an object.
///
/// An attribute handle borrows the [`ObjectHandle`] it was opened from.
#[derive(Debug)]
pub struct AttributeHandle<'a> {
    object: &'a ObjectHandle<'a>,
    name: NodeName,
}

impl<'a> AttributeHandle<'a> {
    pub(super) fn new(object: &'a ObjectHandle<'a>, name: NodeName) -> Self {
        Self { object, name }
    }

    /// Return the name of the attribute.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Return the object holding the attribute.
    #[must_use]
    pub fn object(&self) -> &'a ObjectHandle<'a> {
        self.object
    }

    /// Release the handle.
    pub fn release(self) {
        trace!(
            target: "refcontainer::node",
            path = %self.object.path(),
            attribute = self.name.as_str(),
            "attribute released"
        );
    }

    fn not_found(&self) -> ContainerError {
        ContainerError::NotFound(format!(
            "attribute {} of {}",
            self.name.as_str(),
            self.object.path()
        ))
    }

    fn with_metadata<T>(
        &self,
        f: impl FnOnce(&AttributeMetadata, &ContainerImage) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        self.object.with_metadata(|metadata, image| {
            let attribute = metadata
                .attributes()
                .get(self.name.as_str())
                .ok_or_else(|| self.not_found())?;
            f(attribute, image)
        })
    }

    /// Return the data type of the attribute.
    ///
    /// # Errors
    /// Returns [`ContainerError::NotFound`] if the attribute no longer exists.
    pub fn data_type(&self) -> Result<DataType, ContainerError> {
        self.with_metadata(|attribute, _| Ok(attribute.data_type))
    }

    /// Return the dataspace of the attribute.
    ///
    /// # Errors
    /// Returns [`ContainerError::NotFound`] if the attribute no longer exists.
    pub fn dataspace(&self) -> Result<Dataspace, ContainerError> {
        self.with_metadata(|attribute, _| Ok(attribute.shape.clone()))
    }

    /// Read the elements of the attribute.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidElementBytes`] if the stored elements are malformed.
    pub fn read(&self) -> Result<ArrayBytes, ContainerError> {
        self.with_metadata(|attribute, image| {
            let stored = image.data(attribute.data)?;
            Ok(ArrayBytes::from_stored_bytes(stored, &attribute.data_type)?)
        })
    }

    /// Read a character attribute as a string, with trailing NUL bytes removed.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the attribute does not hold character data or is not valid UTF-8.
    pub fn read_string(&self) -> Result<String, ContainerError> {
        let data_type = self.data_type()?;
        if !data_type.is_character() {
            return Err(ContainerError::TypeMismatch(format!(
                "attribute {} has data type {data_type}, not a character type",
                self.name.as_str()
            )));
        }
        let mut bytes = self.read()?.into_fixed()?;
        let length = bytes.iter().rposition(|byte| *byte != 0).map_or(0, |i| i + 1);
        bytes.truncate(length);
        String::from_utf8(bytes).map_err(|err| {
            ContainerError::TypeMismatch(format!(
                "attribute {} is not valid UTF-8: {err}",
                self.name.as_str()
            ))
        })
    }

    /// Write the elements of the attribute.
    ///
    /// # Errors
    /// Returns [`ContainerError::ElementCountMismatch`] or [`ContainerError::InvalidElementBytes`] if `bytes` are not valid elements of the attribute, or [`ContainerError::PermissionDenied`] if the container is read only.
    pub fn write(&self, bytes: &ArrayBytes) -> Result<(), ContainerError> {
        let address = self.object.address();
        self.object.container().write_image(|image| {
            let attribute = image
                .metadata()
                .objects
                .get(&address)
                .and_then(|object| object.attributes().get(self.name.as_str()))
                .ok_or_else(|| self.not_found())?;
            validate_elements(
                bytes,
                dataspace_num_elements(&attribute.shape)?,
                &attribute.data_type,
            )?;
            let extent = image.append_data(&bytes.to_stored_bytes());
            if let Some(attribute) = image
                .metadata_mut()
                .objects
                .get_mut(&address)
                .map(ObjectMetadata::attributes_mut)
                .and_then(|attributes| attributes.get_mut(self.name.as_str()))
            {
                attribute.data = extent;
            }
            Ok(())
        })?;
        debug!(
            target: "refcontainer::node",
            path = %self.object.path(),
            attribute = self.name.as_str(),
            size = bytes.size(),
            "attribute written"
        );
        Ok(())
    }

    /// Write `value` to a character attribute, padded with NUL bytes to the size of the attribute.
    ///
    /// # Errors
    /// Returns [`ContainerError::TypeMismatch`] if the attribute does not hold character data, or [`ContainerError::ValueSizeMismatch`] if `value` is longer than the attribute.
    pub fn write_string(&self, value: &str) -> Result<(), ContainerError> {
        let (data_type, dataspace) =
            self.with_metadata(|attribute, _| Ok((attribute.data_type, attribute.shape.clone())))?;
        let element_size = match data_type.fixed_size() {
            Some(size) if data_type.is_character() => size,
            _ => {
                return Err(ContainerError::TypeMismatch(format!(
                    "attribute {} has data type {data_type}, not a character type",
                    self.name.as_str()
                )))
            }
        };
        let num_elements = num_elements_usize(dataspace_num_elements(&dataspace)?)?;
        let size = num_elements
            .checked_mul(element_size)
            .ok_or(ArrayBytesError::SizeOverflow(num_elements, element_size))?;
        if value.len() > size {
            return Err(ContainerError::ValueSizeMismatch {
                expected: size,
                got: value.len(),
            });
        }
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(size, 0);
        self.write(&ArrayBytes::new_flen(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{container::Container, storage::store::MemoryStore, version::VersionBounds};

    #[test]
    fn attribute_string() {
        let container =
            Container::create(Arc::new(MemoryStore::new()), VersionBounds::latest()).unwrap();
        let root = container.root().unwrap();
        let dset2 = root
            .create_dataset("dset2", DataType::Int32, Dataspace::new(vec![4]))
            .unwrap();
        dset2
            .create_attribute("attr00001", DataType::Int8, Dataspace::new(vec![60]))
            .unwrap()
            .release();

        let attr = dset2.attribute("attr00001").unwrap();
        assert_eq!(attr.read_string().unwrap(), "");
        attr.write_string("attr00001").unwrap();
        assert_eq!(attr.read_string().unwrap(), "attr00001");
        let bytes = attr.read().unwrap().into_fixed().unwrap();
        assert_eq!(bytes.len(), 60);
        assert_eq!(&bytes[..10], b"attr00001\0");

        assert!(matches!(
            attr.write_string(&"x".repeat(61)),
            Err(ContainerError::ValueSizeMismatch {
                expected: 60,
                got: 61
            })
        ));
        attr.release();

        assert!(matches!(
            dset2.attribute("missing"),
            Err(ContainerError::NotFound(_))
        ));
        assert!(matches!(
            dset2.create_attribute("attr00001", DataType::Int8, Dataspace::scalar()),
            Err(ContainerError::AlreadyExists(_))
        ));
    }

    #[test]
    fn attribute_typed() {
        let container =
            Container::create(Arc::new(MemoryStore::new()), VersionBounds::latest()).unwrap();
        let root = container.root().unwrap();
        let attr = root
            .create_attribute("scale", DataType::Float64, Dataspace::scalar())
            .unwrap();
        assert_eq!(attr.dataspace().unwrap(), Dataspace::scalar());
        attr.write(&ArrayBytes::new_flen(2.5f64.to_le_bytes().to_vec()))
            .unwrap();
        assert_eq!(
            attr.read().unwrap(),
            ArrayBytes::new_flen(2.5f64.to_le_bytes().to_vec())
        );
        assert!(matches!(
            attr.write_string("2.5"),
            Err(ContainerError::TypeMismatch(_))
        ));
        assert!(matches!(
            attr.read_string(),
            Err(ContainerError::TypeMismatch(_))
        ));
    }
}
