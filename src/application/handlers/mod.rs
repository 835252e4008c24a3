//! Application handlers.
//!
//! Command handlers and background services that orchestrate the hub.

mod inbox;
mod transition_order;

pub use inbox::{InboxAggregator, InboxAggregatorConfig};
pub use transition_order::{TransitionOrderCommand, TransitionOrderHandler, TransitionOrderResult};
