//! Messages and order status events flowing through rooms.

mod event;
mod role;

pub use event::{
    Actor, ChatMessage, HubEvent, HubPayload, OrderStatusEvent, MAX_TEXT_CHARS,
};
pub use role::SenderRole;
