//! In-memory customer roster.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::foundation::{CustomerId, DomainError};
use crate::domain::inbox::KnownCustomer;
use crate::ports::CustomerRoster;

#[derive(Default)]
pub struct InMemoryCustomerRoster {
    customers: DashMap<CustomerId, KnownCustomer>,
    fail: AtomicBool,
}

impl InMemoryCustomerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: impl IntoIterator<Item = KnownCustomer>) -> Self {
        let roster = Self::new();
        for customer in customers {
            roster.upsert(customer);
        }
        roster
    }

    pub fn upsert(&self, customer: KnownCustomer) {
        self.customers.insert(customer.id.clone(), customer);
    }

    /// Makes every subsequent listing fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CustomerRoster for InMemoryCustomerRoster {
    async fn list_known_customers(&self) -> Result<Vec<KnownCustomer>, DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::storage("customer directory unavailable"));
        }
        let mut customers: Vec<KnownCustomer> = self
            .customers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        customers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(customers)
    }
}
