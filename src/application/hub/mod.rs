//! Realtime hub: membership, dedup, fan-out and backfill.
//!
//! # Components
//!
//! - [`registry`] - live connections and the rooms each joined
//! - [`directory`] - rooms with per-room lock, metadata and members
//! - [`dedup`] - per-connection two-tier duplicate suppression
//! - [`backfill`] - history replay through the `HistoryStore` port
//! - [`fanout`] - the [`Hub`] tying the above together

pub mod backfill;
pub mod connection;
pub mod dedup;
pub mod directory;
pub mod fanout;
pub mod registry;

pub use backfill::{BackfillAdapter, DEFAULT_BACKFILL_LIMIT};
pub use connection::{ConnectionHandle, ConnectionSpec, DeliveryError, Outbound};
pub use dedup::{DedupConfig, DedupFilter, DEFAULT_DEDUP_CAPACITY, DEFAULT_DEDUP_WINDOW};
pub use directory::{Room, RoomDirectory, RoomState};
pub use fanout::{Hub, HubError, HubOptions, JoinOutcome, Registration, RoomActivity};
pub use registry::{ConnectionRegistry, RoomAdded};
