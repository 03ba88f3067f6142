//! # SQLite Storage Module
//!
//! Embedded SQL variant: every logical table lives in one local SQLite file.
//! The file and the four tables are created on first use, so a fresh path is a
//! valid empty store.

pub mod connection;

pub use connection::SqliteBackend;
