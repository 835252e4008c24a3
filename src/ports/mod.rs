//! Ports - Interfaces for external collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the hub and the outside world. Adapters implement these ports.
//!
//! - `HistoryStore` - Append-only room history (`append` / `query_last`)
//! - `CustomerRoster` - Known customers for the operator inbox
//! - `OrderRepository` - Order existence, status projection and timeline

mod customer_roster;
mod history_store;
mod order_repository;

pub use customer_roster::CustomerRoster;
pub use history_store::HistoryStore;
pub use order_repository::OrderRepository;
