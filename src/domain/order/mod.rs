//! Order status state machine.

mod errors;
mod policy;
mod record;
mod status;

pub use errors::TransitionError;
pub use policy::TransitionPolicy;
pub use record::OrderRecord;
pub use status::OrderStatus;
