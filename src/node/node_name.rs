use thiserror::Error;

/// The name of a link from a group, or of an attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid node name {0}")]
pub struct NodeNameError(String);

impl NodeName {
    /// Create a new node name from `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeNameError`] if `name` is not valid according to [`NodeName::validate`()].
    pub fn new(name: &str) -> Result<Self, NodeNameError> {
        if Self::validate(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NodeNameError(name.to_string()))
        }
    }

    /// Extracts a string slice containing the node name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a node name. A name
    /// - must not be the empty string (""),
    /// - must not include the character "/", and
    /// - must not be a string composed only of period characters, e.g. "." or "..".
    #[must_use]
    pub fn validate(node_name: &str) -> bool {
        !node_name.is_empty()
            && !node_name.contains('/')
            && !node_name.chars().all(|c| c == '.')
    }
}

impl TryFrom<&str> for NodeName {
    type Error = NodeNameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}
