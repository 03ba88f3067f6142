//! # Delimited-Text Storage
//!
//! One file per logical table, `<Table>.csv`, inside a single data directory.
//!
//! ## File Format
//!
//! No header row, fields in attribute order, `\n` line endings, reals with two
//! decimals:
//! ```csv
//! 1,Acme,Widget,Small Widget,10.00,10
//! 2,Acme,Gadget,"Large, blue",4.50,3
//! ```
//!
//! Every field is read back as text; typed records coerce it on construction.

pub mod backend;
pub mod connection;

pub use backend::CsvBackend;
pub use connection::{CsvConnection, TableFile};
