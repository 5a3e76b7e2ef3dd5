//! Container hierarchy nodes.
//!
//! A container hierarchy is a graph of objects rooted at the root group:
//!  - groups hold named links to other objects,
//!  - datasets hold a multidimensional array of elements, and
//!  - named datatypes hold a committed [`DataType`](crate::data_type::DataType).
//!
//! Any object can carry named attributes.
//!
//! Links are either hard (aliasing an object address) or soft (naming a target path, resolved on access).
//! Objects are located by a [`NodePath`] and accessed through an [`ObjectHandle`].
//! Attributes are accessed through an [`AttributeHandle`].

mod attribute_handle;
mod node_name;
mod node_path;
mod object_handle;

pub use attribute_handle::AttributeHandle;
pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};
pub use object_handle::ObjectHandle;
pub(crate) use object_handle::dataspace_num_elements;

use std::collections::{BTreeSet, VecDeque};

use derive_more::Display;

use crate::{
    container::ContainerError,
    format::{ContainerMetadata, LinkMetadata, ObjectAddress, ObjectMetadata},
};

/// The kind of an object.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A group.
    #[display("group")]
    Group,
    /// A dataset.
    #[display("dataset")]
    Dataset,
    /// A named datatype.
    #[display("named datatype")]
    NamedDatatype,
}

impl From<&ObjectMetadata> for ObjectKind {
    fn from(metadata: &ObjectMetadata) -> Self {
        match metadata {
            ObjectMetadata::Group(_) => Self::Group,
            ObjectMetadata::Dataset(_) => Self::Dataset,
            ObjectMetadata::Datatype(_) => Self::NamedDatatype,
        }
    }
}

/// Resolve `path` from the group at `start` to an object address.
///
/// `path` is relative to `start`, or relative to the root group if it starts with `/`.
/// Soft links are resolved relative to the group holding the link, at most `max_link_traversals` times.
/// `display_path` is reported in errors.
pub(crate) fn resolve(
    metadata: &ContainerMetadata,
    start: ObjectAddress,
    path: &str,
    display_path: &str,
    max_link_traversals: usize,
) -> Result<ObjectAddress, ContainerError> {
    let not_found = || ContainerError::NotFound(display_path.to_string());

    let mut address = if path.starts_with('/') {
        metadata.root
    } else {
        start
    };
    let mut pending: VecDeque<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut traversals = 0;
    while let Some(segment) = pending.pop_front() {
        let Some(ObjectMetadata::Group(group)) = metadata.objects.get(&address) else {
            return Err(not_found());
        };
        match group.links.get(segment).ok_or_else(not_found)? {
            LinkMetadata::Hard { address: target } => address = *target,
            LinkMetadata::Soft { target } => {
                traversals += 1;
                if traversals > max_link_traversals {
                    return Err(not_found());
                }
                if target.starts_with('/') {
                    address = metadata.root;
                }
                for segment in target.split('/').filter(|s| !s.is_empty()).rev() {
                    pending.push_front(segment);
                }
            }
        }
    }
    if metadata.objects.contains_key(&address) {
        Ok(address)
    } else {
        Err(not_found())
    }
}

/// Find a path of hard links from the root group to the object at `address`.
///
/// Groups are searched breadth first, so the shortest path is returned.
pub(crate) fn find_path(metadata: &ContainerMetadata, address: ObjectAddress) -> Option<NodePath> {
    let mut visited = BTreeSet::from([metadata.root]);
    let mut queue = VecDeque::from([(metadata.root, NodePath::root())]);
    while let Some((group_address, group_path)) = queue.pop_front() {
        if group_address == address {
            return Some(group_path);
        }
        let Some(ObjectMetadata::Group(group)) = metadata.objects.get(&group_address) else {
            continue;
        };
        for (name, link) in &group.links {
            let LinkMetadata::Hard { address: child } = link else {
                continue;
            };
            if visited.insert(*child) {
                let Ok(name) = NodeName::new(name) else {
                    continue;
                };
                queue.push_back((*child, group_path.join(&name)));
            }
        }
    }
    None
}

/// Validate the target of a soft link: an absolute [`NodePath`] or a relative path of valid [`NodeName`]s.
pub(crate) fn validate_link_target(target: &str) -> Result<(), NodePathError> {
    if target.starts_with('/') {
        NodePath::new(target).map(|_| ())
    } else {
        NodePath::root().resolve(target).map(|_| ())
    }
}
