//! Rewrite the string attribute `/g4/dset2/attr00001` of `compat.h5` in a session bounded by `(v18, latest)`.
//!
//! Usage: `latest_mod_attr [PATH] [--usage-log]`

use std::{
    error::Error,
    sync::{Arc, Mutex},
};

use refcontainer::{
    container::{AccessMode, Container},
    storage::{
        storage_adapter::usage_log::UsageLogStorageAdapter, store::FilesystemStore,
        ReadableWritableStorage,
    },
    version::{LibraryVersion, VersionBounds},
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

const FILENAME: &str = "compat.h5";
const GROUP_NAME: &str = "/g4";
const DATASET_NAME: &str = "dset2";
const ATTRIBUTE_NAME: &str = "attr00001";

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

fn latest_mod_attr() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| FILENAME.to_string());
    let mut store: ReadableWritableStorage = Arc::new(FilesystemStore::new(&path)?);
    if std::env::args().any(|arg| arg == "--usage-log") {
        let log_writer = Arc::new(Mutex::new(std::io::stdout()));
        store = Arc::new(UsageLogStorageAdapter::new(store, log_writer, || {
            "[latest_mod_attr] ".to_string()
        }));
    }

    let bounds = VersionBounds::new(LibraryVersion::V18, LibraryVersion::LATEST);
    let mut container = Container::open(store, AccessMode::ReadWrite, bounds)?;
    info!(
        location = %container.location(),
        encoding = %container.version_policy().encoding(),
        "opened container"
    );

    let group = container.locate(GROUP_NAME)?;
    let dataset = group.locate(DATASET_NAME)?;
    let attribute = dataset.attribute(ATTRIBUTE_NAME)?;
    attribute.write_string(ATTRIBUTE_NAME)?;
    info!(
        path = %dataset.path(),
        attribute = attribute.name(),
        value = attribute.read_string()?,
        "rewrote attribute"
    );

    attribute.release();
    dataset.release();
    group.release();
    container.close()?;
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = latest_mod_attr() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
