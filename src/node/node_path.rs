use derive_more::Display;
use thiserror::Error;

use super::NodeName;

/// An absolute path to an object in a container hierarchy.
///
/// Paths are slash-delimited names starting at the root group, e.g. `/g1/g1.1/dset1`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display("{_0}")]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`()].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root group.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice containing the node path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a path:
    /// - a path always starts with `/`,
    /// - a non-root path cannot end with `/`, and
    /// - every segment between slashes is a valid [`NodeName`].
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/")
            || path
                .strip_prefix('/')
                .is_some_and(|relative| relative.split('/').all(NodeName::validate))
    }

    /// Indicates if the path is the root group.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.eq("/")
    }

    /// Return an iterator over the names along the path, excluding the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Returns the name of the last segment, or [`None`] for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Returns the path of the parent group, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let (parent, _) = self.0.rsplit_once('/')?;
        Some(if parent.is_empty() {
            Self::root()
        } else {
            Self(parent.to_string())
        })
    }

    /// Append a child `name` to the path.
    #[must_use]
    pub fn join(&self, name: &NodeName) -> Self {
        if self.is_root() {
            Self(format!("/{}", name.as_str()))
        } else {
            Self(format!("{}/{}", self.0, name.as_str()))
        }
    }

    /// Resolve `path` relative to this path.
    ///
    /// An absolute `path` is returned as is.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if the resolved path is not valid.
    pub fn resolve(&self, path: &str) -> Result<Self, NodePathError> {
        if path.starts_with('/') {
            return Self::new(path);
        }
        let joined = if self.is_root() {
            format!("/{path}")
        } else {
            format!("{}/{path}", self.0)
        };
        Self::new(&joined).map_err(|_| NodePathError(path.to_string()))
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert_eq!(NodePath::new("/a/b").unwrap().to_string(), "/a/b");
        assert!(NodePath::new("/a/b/").is_err());
        assert_eq!(
            NodePath::new("/a/b/").unwrap_err().to_string(),
            "invalid node path /a/b/"
        );
        assert!(NodePath::new("/a//b").is_err());
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("").is_err());
        assert!(NodePath::new("/g1/..").is_err());
    }

    #[test]
    fn node_path_navigation() {
        let path = NodePath::new("/g1/g1.1/dset1").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), ["g1", "g1.1", "dset1"]);
        assert_eq!(path.name(), Some("dset1"));
        assert_eq!(path.parent().unwrap().as_str(), "/g1/g1.1");
        assert_eq!(NodePath::new("/g1").unwrap().parent(), Some(NodePath::root()));
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(NodePath::root().name(), None);
        let g4 = NodePath::new("/g4").unwrap();
        assert_eq!(g4.resolve("dset2").unwrap().as_str(), "/g4/dset2");
        assert_eq!(g4.resolve("/g1").unwrap().as_str(), "/g1");
        assert!(g4.resolve("dset2/").is_err());
        assert_eq!(
            NodePath::root()
                .join(&NodeName::new("Group").unwrap())
                .as_str(),
            "/Group"
        );
    }
}
