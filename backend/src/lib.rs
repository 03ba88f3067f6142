//! Business-records storage for customers, inventory and orders.
//!
//! [`config`] reads which medium to use, [`storage`] provides the one contract
//! over all of them, and [`domain`] holds the services built on top.

pub mod config;
pub mod domain;
pub mod storage;

pub use config::{AppConfig, DatabaseKind};
pub use storage::{Storage, StorageBackend, StorageError};
