//! Dispatch Hub - Realtime event distribution for a logistics marketplace
//!
//! Routes chat messages and order status transitions into rooms
//! (`order:<id>`, `guest:<customerId>`, `support`), suppresses duplicate
//! deliveries per connection, replays history on join and keeps the
//! operator inbox current.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
