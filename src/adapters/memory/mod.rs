//! In-memory implementations of the hub's ports.
//!
//! Used by the binary when no external collaborators are configured, and
//! by the test suites.

mod history;
mod orders;
mod roster;
mod seed;

pub use history::{InMemoryHistoryStore, DEFAULT_ROOM_RETENTION};
pub use orders::InMemoryOrderRepository;
pub use roster::InMemoryCustomerRoster;
pub use seed::{SeedData, SeedError};
