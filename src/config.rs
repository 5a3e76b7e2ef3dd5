//! Global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::version::VersionBounds;

/// Global configuration options for the refcontainer crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Validate Checksums
///  > default: [`true`]
///
/// If enabled, the superblock, metadata, and data checksums of a container are validated when it is opened, otherwise validation is skipped.
/// The superblock signature is always checked.
///
/// ## Default Version Bounds
///  > default: [`VersionBounds::latest`]
///
/// The version bounds used by [`Container::open_path_default`](crate::container::Container::open_path_default) and the scenario programs when no bounds are given explicitly.
///
/// ## Max Link Traversals
///  > default: `16`
///
/// The maximum number of soft links followed while resolving a single path.
/// Paths that need more traversals (e.g. soft link cycles) are reported as not found.
#[derive(Debug)]
pub struct Config {
    validate_checksums: bool,
    default_version_bounds: VersionBounds,
    max_link_traversals: usize,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            validate_checksums: true,
            default_version_bounds: VersionBounds::latest(),
            max_link_traversals: 16,
        }
    }
}

impl Config {
    /// Get the [validate checksums](#validate-checksums) configuration.
    #[must_use]
    pub fn validate_checksums(&self) -> bool {
        self.validate_checksums
    }

    /// Set the [validate checksums](#validate-checksums) configuration.
    pub fn set_validate_checksums(&mut self, validate_checksums: bool) {
        self.validate_checksums = validate_checksums;
    }

    /// Get the [default version bounds](#default-version-bounds) configuration.
    #[must_use]
    pub fn default_version_bounds(&self) -> VersionBounds {
        self.default_version_bounds
    }

    /// Set the [default version bounds](#default-version-bounds) configuration.
    pub fn set_default_version_bounds(&mut self, version_bounds: VersionBounds) {
        self.default_version_bounds = version_bounds;
    }

    /// Get the [max link traversals](#max-link-traversals) configuration.
    #[must_use]
    pub fn max_link_traversals(&self) -> usize {
        self.max_link_traversals
    }

    /// Set the [max link traversals](#max-link-traversals) configuration.
    pub fn set_max_link_traversals(&mut self, max_link_traversals: usize) {
        self.max_link_traversals = max_link_traversals;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global refcontainer configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global refcontainer configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
