//! Storage adapters. Includes a [usage log](usage_log::UsageLogStorageAdapter) for debugging storage access.

pub mod usage_log;
