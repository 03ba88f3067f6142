//! # Domain Module
//!
//! Services that own the in-memory record collections and persist them through
//! [`Storage`](crate::storage::Storage), plus the pure helpers they share:
//! identifier allocation, column ordering, search and CSV transfer.

pub mod identifier;
pub mod order_service;
pub mod ordering;
pub mod record_service;
pub mod transfer_service;

pub use identifier::{next_identifier, next_record_identifier};
pub use order_service::{LineRequest, OrderService};
pub use ordering::{search_records, sort_by_column, sort_records};
pub use record_service::RecordService;

use shared::{Customer, Item};

pub type CustomerService = RecordService<Customer>;
pub type InventoryService = RecordService<Item>;
