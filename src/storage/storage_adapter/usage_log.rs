//! A storage adapter which logs function calls.

use std::{
    io::Write,
    ops::Range,
    sync::{Arc, Mutex},
};

use crate::storage::{MaybeBytes, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// The usage log storage adapter. Logs storage method calls.
///
/// It is intended to aid in debugging by revealing how a container reads and writes its storage.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::{Arc, Mutex};
/// # use refcontainer::storage::store::MemoryStore;
/// # use refcontainer::storage::storage_adapter::usage_log::UsageLogStorageAdapter;
/// let store = Arc::new(MemoryStore::new());
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let store = Arc::new(UsageLogStorageAdapter::new(store, log_writer, || {
///     chrono::Utc::now().format("[%T%.3f] ").to_string()
/// }));
/// ```
///
/// Opening, modifying and closing a container through the above adapter prints outputs like:
/// ```text
/// [23:41:19.885] get_range(memory, 0..48) -> len=Ok(48)
/// [23:41:19.885] get(memory) -> len=Ok(1315)
/// [23:41:19.887] set(memory, len=1420) -> Ok(())
/// ```
pub struct UsageLogStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl<TStorage: ?Sized> core::fmt::Debug for UsageLogStorageAdapter<TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "usage log")
    }
}

impl<TStorage: ?Sized> UsageLogStorageAdapter<TStorage> {
    /// Create a new usage log storage adapter.
    pub fn new(
        storage: Arc<TStorage>,
        handle: Arc<Mutex<dyn Write + Send + Sync>>,
        prefix_func: fn() -> String,
    ) -> Self {
        Self {
            storage,
            handle,
            prefix_func,
        }
    }

    fn log(&self, message: std::fmt::Arguments) -> Result<(), StorageError> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|_| StorageError::from("usage log handle is poisoned"))?;
        writeln!(handle, "{}{message}", (self.prefix_func)())?;
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> ReadableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn get(&self) -> Result<MaybeBytes, StorageError> {
        let result = self.storage.get();
        self.log(format_args!(
            "get({}) -> len={:?}",
            self.storage.location(),
            result.as_ref().map(|v| v.as_ref().map_or(0, Vec::len))
        ))?;
        result
    }

    fn get_range(&self, byte_range: Range<u64>) -> Result<MaybeBytes, StorageError> {
        let result = self.storage.get_range(byte_range.clone());
        self.log(format_args!(
            "get_range({}, {byte_range:?}) -> len={:?}",
            self.storage.location(),
            result.as_ref().map(|v| v.as_ref().map_or(0, Vec::len))
        ))?;
        result
    }

    fn size(&self) -> Result<Option<u64>, StorageError> {
        let result = self.storage.size();
        self.log(format_args!(
            "size({}) -> {result:?}",
            self.storage.location()
        ))?;
        result
    }

    fn location(&self) -> String {
        self.storage.location()
    }
}

impl<TStorage: ?Sized + WritableStorageTraits + ReadableStorageTraits> WritableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn set(&self, value: &[u8]) -> Result<(), StorageError> {
        let result = self.storage.set(value);
        self.log(format_args!(
            "set({}, len={}) -> {result:?}",
            self.storage.location(),
            value.len()
        ))?;
        result
    }

    fn erase(&self) -> Result<(), StorageError> {
        let result = self.storage.erase();
        self.log(format_args!(
            "erase({}) -> {result:?}",
            self.storage.location()
        ))?;
        result
    }

    fn readonly(&self) -> bool {
        self.storage.readonly()
    }
}
