//! Write a hyperslab and a point region reference to `/Group/Dataset` of `ref_compat.h5`.
//!
//! The reference dataset and encoding follow the default version bounds of the configuration:
//! `Add_revised_ref_region` holds revised references, `Add_old_ref_reg` holds legacy references.
//!
//! Usage: `ref_region [PATH] [--usage-log]`

use std::{
    error::Error,
    sync::{Arc, Mutex},
};

use refcontainer::{
    config::global_config,
    container::{AccessMode, Container},
    dataspace::Dataspace,
    selection::Selection,
    storage::{
        storage_adapter::usage_log::UsageLogStorageAdapter, store::FilesystemStore,
        ReadableWritableStorage,
    },
    version::ReferenceEncoding,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

const FILENAME: &str = "ref_compat.h5";
const DATASET_NAME: &str = "/Group/Dataset";
const REVISED_REF_DATASET: &str = "Add_revised_ref_region";
const LEGACY_REF_DATASET: &str = "Add_old_ref_reg";

const POINTS: [u64; 10] = [16, 22, 38, 41, 52, 63, 70, 89, 97, 3];

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

fn ref_region() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| FILENAME.to_string());
    let mut store: ReadableWritableStorage = Arc::new(FilesystemStore::new(&path)?);
    if std::env::args().any(|arg| arg == "--usage-log") {
        let log_writer = Arc::new(Mutex::new(std::io::stdout()));
        store = Arc::new(UsageLogStorageAdapter::new(store, log_writer, || {
            "[ref_region] ".to_string()
        }));
    }

    let bounds = global_config().default_version_bounds();
    let mut container = Container::open(store, AccessMode::ReadWrite, bounds)?;
    let writer = container.reference_writer();
    let ref_dataset_name = match writer.encoding() {
        ReferenceEncoding::Revised => REVISED_REF_DATASET,
        ReferenceEncoding::Legacy => LEGACY_REF_DATASET,
    };
    info!(
        location = %container.location(),
        bounds = %container.version_policy().bounds(),
        encoding = %writer.encoding(),
        "opened container"
    );

    let root = container.root()?;
    let ref_dataset =
        root.create_dataset(ref_dataset_name, writer.data_type(), Dataspace::new(vec![2]))?;

    let dataset = container.locate(DATASET_NAME)?;
    let dataspace = dataset.dataspace()?;
    let hyperslab = Selection::hyperslab(&dataspace, &[2], &[5], &[15], &[2])?;
    let points = Selection::points(&dataspace, POINTS.iter().map(|point| vec![*point]).collect())?;
    let references = [
        writer.encode(&dataset, hyperslab)?,
        writer.encode(&dataset, points)?,
    ];
    writer.write(&container, ref_dataset.path().as_str(), &references)?;
    info!(
        path = %ref_dataset.path(),
        referenced = %dataset.path(),
        hyperslab_elements = references[0].selection().num_elements(),
        point_elements = references[1].selection().num_elements(),
        "wrote region references"
    );
    references.into_iter().for_each(|reference| reference.destroy());

    dataset.release();
    ref_dataset.release();
    root.release();
    container.close()?;
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = ref_region() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
