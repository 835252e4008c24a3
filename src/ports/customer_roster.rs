//! CustomerRoster port - Known customers from the user directory.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::inbox::KnownCustomer;

/// Port for listing every customer the seller side should see in the inbox,
/// whether or not they have ever written.
///
/// Consumed only by the inbox aggregator.
#[async_trait]
pub trait CustomerRoster: Send + Sync {
    async fn list_known_customers(&self) -> Result<Vec<KnownCustomer>, DomainError>;
}
