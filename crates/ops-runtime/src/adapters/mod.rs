//! # Adapters
//!
//! Host-provided backends for the subsystem ports.
//!
//! The RocksDB event store is feature-gated: journal storage covers the
//! common single-operator install, RocksDB the large multi-operation
//! archives.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

#[cfg(feature = "rocksdb")]
pub use rocksdb_store::RocksDbEventStore;
