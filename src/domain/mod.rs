//! Domain layer containing the hub's vocabulary and pure rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine trait)
//! - `room` - Room identifiers and per-room metadata
//! - `message` - Chat messages, order status events and the hub event envelope
//! - `order` - Order status state machine
//! - `inbox` - Operator triage list read model

pub mod foundation;
pub mod inbox;
pub mod message;
pub mod order;
pub mod room;
