//! # MySQL Storage Module
//!
//! Networked SQL variant. The server is expected to already hold the four
//! logical tables; this module never creates or alters schema on a shared
//! server. Statements are the same ones the embedded variant issues.

pub mod connection;

pub use connection::MySqlBackend;
