//! Library versions, version bounds, and the reference encoding policy.
//!
//! A container session declares a pair of [`VersionBounds`] (earliest and latest library release the file must remain readable by).
//! [`VersionPolicy::resolve`] turns the requested bounds into a [`ResolvedVersionPolicy`], which fixes the [`ReferenceEncoding`] used by every reference operation in that session.
//!
//! | requested `high`           | encoding                      | resolved bounds            |
//! |----------------------------|-------------------------------|----------------------------|
//! | `> LEGACY_THRESHOLD`       | [`ReferenceEncoding::Revised`] | `(LEGACY_THRESHOLD, high)` |
//! | `<= LEGACY_THRESHOLD`      | [`ReferenceEncoding::Legacy`]  | `(high, high)`             |

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A library release that a container may be bound to.
#[derive(
    Copy, Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LibraryVersion {
    /// The earliest possible format for storing objects.
    #[display("earliest")]
    Earliest,
    /// Release 1.8.
    #[display("v18")]
    V18,
    /// Release 1.10.
    #[display("v110")]
    V110,
    /// Release 1.12, which introduced the revised reference type.
    #[display("v112")]
    V112,
    /// Release 1.14.
    #[display("v114")]
    V114,
}

impl LibraryVersion {
    /// The latest library release known to this crate.
    pub const LATEST: Self = Self::V114;

    /// The "version 1" threshold. Bounds whose high value does not exceed this must use the legacy reference encoding.
    pub const LEGACY_THRESHOLD: Self = Self::V18;

    /// The on-disk code of the version.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Create a version from its on-disk code.
    ///
    /// Returns [`None`] if `code` is not a known version.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Earliest),
            1 => Some(Self::V18),
            2 => Some(Self::V110),
            3 => Some(Self::V112),
            4 => Some(Self::V114),
            _ => None,
        }
    }
}

/// The release of this crate's container format, as `(major, minor, release)`.
#[must_use]
pub const fn library_version() -> (u32, u32, u32) {
    (1, 14, 0)
}

/// A pair of `(low, high)` library version bounds.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("({low}, {high})")]
pub struct VersionBounds {
    low: LibraryVersion,
    high: LibraryVersion,
}

/// Invalid version bounds.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum VersionBoundsError {
    /// The low bound is greater than the high bound.
    #[error("version bound low {0} is greater than high {1}")]
    Inconsistent(LibraryVersion, LibraryVersion),
    /// A container was written with a format that the requested bounds do not permit.
    #[error("container superblock version {0} is not permitted by the version bounds {1}")]
    IncompatibleContainer(u8, VersionBounds),
}

impl VersionBounds {
    /// Create a new pair of version bounds.
    ///
    /// The bounds are not validated until they are resolved by [`VersionPolicy::resolve`].
    #[must_use]
    pub const fn new(low: LibraryVersion, high: LibraryVersion) -> Self {
        Self { low, high }
    }

    /// Bounds that admit the legacy encoding only, `(LEGACY_THRESHOLD, LEGACY_THRESHOLD)`.
    #[must_use]
    pub const fn legacy() -> Self {
        Self::new(
            LibraryVersion::LEGACY_THRESHOLD,
            LibraryVersion::LEGACY_THRESHOLD,
        )
    }

    /// Bounds from the legacy threshold up to the latest release.
    #[must_use]
    pub const fn latest() -> Self {
        Self::new(LibraryVersion::LEGACY_THRESHOLD, LibraryVersion::LATEST)
    }

    /// The low bound.
    #[must_use]
    pub const fn low(&self) -> LibraryVersion {
        self.low
    }

    /// The high bound.
    #[must_use]
    pub const fn high(&self) -> LibraryVersion {
        self.high
    }
}

impl Default for VersionBounds {
    fn default() -> Self {
        Self::latest()
    }
}

/// The encoding of dataset region references.
///
/// The two encodings are mutually exclusive within a session and are never mixed within one dataset.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceEncoding {
    /// A fixed size token tied to the addressing of a single container.
    #[display("legacy")]
    Legacy,
    /// A self-describing variable length token.
    #[display("revised")]
    Revised,
}

impl ReferenceEncoding {
    /// The superblock version of containers holding region references of this encoding.
    #[must_use]
    pub const fn superblock_version(self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::Revised => 1,
        }
    }
}

/// Maps requested version bounds to the reference encoding of a session.
#[derive(Copy, Clone, Debug, Default)]
pub struct VersionPolicy;

/// The outcome of [`VersionPolicy::resolve`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedVersionPolicy {
    bounds: VersionBounds,
    encoding: ReferenceEncoding,
}

impl VersionPolicy {
    /// Resolve `requested` bounds into the effective bounds and reference encoding of a session.
    ///
    /// # Errors
    /// Returns [`VersionBoundsError::Inconsistent`] if the low bound is greater than the high bound.
    pub fn resolve(requested: VersionBounds) -> Result<ResolvedVersionPolicy, VersionBoundsError> {
        if requested.low > requested.high {
            return Err(VersionBoundsError::Inconsistent(
                requested.low,
                requested.high,
            ));
        }
        let resolved = if requested.high > LibraryVersion::LEGACY_THRESHOLD {
            ResolvedVersionPolicy {
                bounds: VersionBounds::new(LibraryVersion::LEGACY_THRESHOLD, requested.high),
                encoding: ReferenceEncoding::Revised,
            }
        } else {
            ResolvedVersionPolicy {
                bounds: VersionBounds::new(requested.high, requested.high),
                encoding: ReferenceEncoding::Legacy,
            }
        };
        Ok(resolved)
    }
}

impl ResolvedVersionPolicy {
    /// The effective version bounds.
    #[must_use]
    pub const fn bounds(&self) -> VersionBounds {
        self.bounds
    }

    /// The reference encoding.
    #[must_use]
    pub const fn encoding(&self) -> ReferenceEncoding {
        self.encoding
    }

    /// Check that a container with `superblock_version` can be opened under this policy.
    ///
    /// # Errors
    /// Returns [`VersionBoundsError::IncompatibleContainer`] if the superblock version is newer than the policy permits.
    pub fn check_superblock_version(&self, superblock_version: u8) -> Result<(), VersionBoundsError> {
        if superblock_version > self.encoding.superblock_version() {
            Err(VersionBoundsError::IncompatibleContainer(
                superblock_version,
                self.bounds,
            ))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LibraryVersion; 5] = [
        LibraryVersion::Earliest,
        LibraryVersion::V18,
        LibraryVersion::V110,
        LibraryVersion::V112,
        LibraryVersion::V114,
    ];

    #[test]
    fn policy_revised_above_threshold() {
        for low in ALL {
            for high in ALL {
                if low > high || high <= LibraryVersion::LEGACY_THRESHOLD {
                    continue;
                }
                let policy = VersionPolicy::resolve(VersionBounds::new(low, high)).unwrap();
                assert_eq!(policy.encoding(), ReferenceEncoding::Revised);
                assert_eq!(policy.bounds().low(), LibraryVersion::LEGACY_THRESHOLD);
                assert_eq!(policy.bounds().high(), high);
            }
        }
    }

    #[test]
    fn policy_legacy_at_threshold() {
        for low in [LibraryVersion::Earliest, LibraryVersion::V18] {
            let policy = VersionPolicy::resolve(VersionBounds::new(
                low,
                LibraryVersion::LEGACY_THRESHOLD,
            ))
            .unwrap();
            assert_eq!(policy.encoding(), ReferenceEncoding::Legacy);
            assert_eq!(policy.bounds(), VersionBounds::legacy());
        }
    }

    #[test]
    fn policy_below_threshold_collapses() {
        let policy = VersionPolicy::resolve(VersionBounds::new(
            LibraryVersion::Earliest,
            LibraryVersion::Earliest,
        ))
        .unwrap();
        assert_eq!(policy.encoding(), ReferenceEncoding::Legacy);
        assert_eq!(
            policy.bounds(),
            VersionBounds::new(LibraryVersion::Earliest, LibraryVersion::Earliest)
        );
    }

    #[test]
    fn policy_inconsistent_bounds() {
        let err = VersionPolicy::resolve(VersionBounds::new(
            LibraryVersion::V112,
            LibraryVersion::V110,
        ))
        .unwrap_err();
        assert_eq!(
            err,
            VersionBoundsError::Inconsistent(LibraryVersion::V112, LibraryVersion::V110)
        );
        assert_eq!(
            err.to_string(),
            "version bound low v112 is greater than high v110"
        );
    }

    #[test]
    fn policy_superblock_compatibility() {
        let legacy = VersionPolicy::resolve(VersionBounds::legacy()).unwrap();
        assert!(legacy.check_superblock_version(0).is_ok());
        assert!(legacy.check_superblock_version(1).is_err());
        let revised = VersionPolicy::resolve(VersionBounds::latest()).unwrap();
        assert!(revised.check_superblock_version(0).is_ok());
        assert!(revised.check_superblock_version(1).is_ok());
    }

    #[test]
    fn library_version_codes() {
        for version in ALL {
            assert_eq!(LibraryVersion::from_code(version.code()), Some(version));
        }
        assert_eq!(LibraryVersion::from_code(5), None);
    }
}
