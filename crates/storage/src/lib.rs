//! Storage abstraction and implementations for HBNB.
//!
//! This crate provides a trait-based storage interface with two backends: a
//! JSON snapshot file and a relational database. [`open_storage`] picks one
//! from the configuration at startup.

#![warn(missing_docs)]

pub mod config;
pub mod db_storage;
pub mod file_storage;
pub mod relations;
pub mod trait_;

pub use config::{open_storage, Backend, StorageConfig};
pub use db_storage::DbStorage;
pub use file_storage::FileStorage;
pub use trait_::{Index, RecordKey, Result, Storage, StorageError};
