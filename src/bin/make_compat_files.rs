//! Write the `compat.h5` and `ref_compat.h5` containers read by `latest_mod_attr` and `ref_region`.
//!
//! `compat.h5` is written with legacy bounds so that it can be opened by sessions with any bounds.
//!
//! Usage: `make_compat_files [DIRECTORY]`

use std::{error::Error, path::PathBuf};

use refcontainer::{
    container::Container,
    data_type::{ArrayBytes, DataType},
    dataspace::Dataspace,
    version::VersionBounds,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

fn init_tracing() {
    let level = if std::env::var_os("REFCONTAINER_DEBUG").is_some() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(level))
        .try_init();
}

/// Write the hierarchy
/// ```text
/// /
///   g1
///     g1.1
///       dset1 [10, 10] int32
///     g1.2
///       hlink1 -> /g1/g1.1/dset1 (hard)
///   g2
///     dtype1 datatype float32
///   g3
///     hlink2 -> /g4/dset2 (hard)
///   g4
///     dset2 [10] int32, with attribute attr00001 [60] int8
///   g5
///     slink1 -> /g4/dset2 (soft)
/// ```
fn write_compat(path: PathBuf) -> Result<(), Box<dyn Error>> {
    let mut container = Container::create_path(&path, VersionBounds::legacy())?;
    let root = container.root()?;

    let g1 = root.create_group("g1")?;
    let g11 = g1.create_group("g1.1")?;
    let dset1 = g11.create_dataset("dset1", DataType::Int32, Dataspace::new(vec![10, 10]))?;
    let elements: Vec<u8> = (0..100i32).flat_map(i32::to_le_bytes).collect();
    dset1.write(&ArrayBytes::new_flen(elements))?;
    g1.create_group("g1.2")?.link_hard("hlink1", "/g1/g1.1/dset1")?;

    root.create_group("g2")?
        .commit_datatype("dtype1", DataType::Float32)?;

    let g4 = root.create_group("g4")?;
    let dset2 = g4.create_dataset("dset2", DataType::Int32, Dataspace::new(vec![10]))?;
    let attribute = dset2.create_attribute("attr00001", DataType::Int8, Dataspace::new(vec![60]))?;
    attribute.write_string("attr00001 original")?;
    attribute.release();

    root.create_group("g3")?.link_hard("hlink2", "/g4/dset2")?;
    root.create_group("g5")?.link_soft("slink1", "/g4/dset2")?;

    info!(location = %container.location(), "wrote hierarchy\n{}", container.hierarchy_tree()?);
    dset2.release();
    g4.release();
    dset1.release();
    g11.release();
    g1.release();
    root.release();
    container.close()?;
    Ok(())
}

/// Write `/Group/Dataset`, 100 `uint8` elements counting up from 0.
fn write_ref_compat(path: PathBuf) -> Result<(), Box<dyn Error>> {
    let mut container = Container::create_path(&path, VersionBounds::legacy())?;
    let group = container.root()?.create_group("Group")?;
    let dataset = group.create_dataset("Dataset", DataType::UInt8, Dataspace::new(vec![100]))?;
    dataset.write(&ArrayBytes::new_flen((0..100u8).collect::<Vec<_>>()))?;
    info!(location = %container.location(), path = %dataset.path(), "wrote dataset");
    dataset.release();
    group.release();
    container.close()?;
    Ok(())
}

fn make_compat_files() -> Result<(), Box<dyn Error>> {
    let directory: PathBuf = std::env::args().nth(1).unwrap_or_else(|| ".".to_string()).into();
    write_compat(directory.join("compat.h5"))?;
    write_ref_compat(directory.join("ref_compat.h5"))?;
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = make_compat_files() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
