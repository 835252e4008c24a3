//! Rooms: identifiers and per-room metadata.

mod meta;
mod room_id;

pub use meta::{RoomMeta, PLACEHOLDER_NAME};
pub use room_id::{RoomId, RoomKind};
