//! A rust library for single-file hierarchical containers with versioned dataset region references.
//!
//! A container holds a hierarchy of groups, datasets, and named datatypes joined by hard and soft links.
//! Any object can carry attributes.
//! Datasets of a region reference data type hold [references](reference) to a [selection](selection) of the elements of another dataset.
//!
//! References have two wire encodings.
//! The encoding is chosen once per [`Container`](container::Container) session from the [version bounds](version::VersionBounds) it is opened with:
//!  - bounds with a high bound above [`LibraryVersion::LEGACY_THRESHOLD`](version::LibraryVersion::LEGACY_THRESHOLD) use the self-describing revised encoding, and
//!  - all other bounds use the legacy encoding, which ties a reference to an object address of one container.
//!
//! ## Getting Started
//! - [`container::Container`], [`node::ObjectHandle`], and [`reference::ReferenceWriter`] are good places to start.
//! - The `latest_mod_attr` and `ref_region` binaries are complete usage examples. `make_compat_files` writes the containers they expect.
//!
//! ## Example
//! ```rust
//! # use refcontainer::container::{AccessMode, Container};
//! # use refcontainer::data_type::DataType;
//! # use refcontainer::dataspace::Dataspace;
//! # use refcontainer::selection::Selection;
//! # use refcontainer::version::VersionBounds;
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("ref_compat.h5");
//! let mut container = Container::create_path(&path, VersionBounds::latest())?;
//! let group = container.root()?.create_group("Group")?;
//! group.create_dataset("Dataset", DataType::UInt8, Dataspace::new(vec![100]))?;
//! group.release();
//! container.close()?;
//!
//! let mut container = Container::open_path(&path, AccessMode::ReadWrite, VersionBounds::latest())?;
//! let writer = container.reference_writer();
//! let dataset = container.locate("/Group/Dataset")?;
//! let selection = Selection::hyperslab(&dataset.dataspace()?, &[2], &[5], &[15], &[2])?;
//! let reference = writer.encode(&dataset, selection)?;
//! container
//!     .root()?
//!     .create_dataset("refs", writer.data_type(), Dataspace::new(vec![1]))?;
//! writer.write(&container, "/refs", &[reference])?;
//! dataset.release();
//! container.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//! The library emits [`tracing`] events under the `refcontainer` target.
//! Storage calls can be logged with the [`UsageLogStorageAdapter`](storage::storage_adapter::usage_log::UsageLogStorageAdapter).
//!
//! ## Licence
//! `refcontainer` is licensed under either of
//!  - the Apache License, Version 2.0 [LICENSE-APACHE](./LICENCE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license [LICENSE-MIT](./LICENCE-MIT) or <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
// #![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod container;
pub mod data_type;
pub mod dataspace;
pub mod format;
pub mod node;
pub mod reference;
pub mod selection;
pub mod storage;
pub mod version;

mod wire;
