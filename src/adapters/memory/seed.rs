//! Seed data for the in-memory adapters.
//!
//! ```json
//! {
//!   "orders": [{ "orderId": "42", "status": "ACCEPTED", "customerName": "Ana" }],
//!   "customers": [{ "id": "u1", "displayName": "Ana" }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::inbox::KnownCustomer;
use crate::domain::order::OrderRecord;

use super::{InMemoryCustomerRoster, InMemoryOrderRepository};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
    #[serde(default)]
    pub customers: Vec<KnownCustomer>,
}

impl SeedData {
    pub fn from_json(path: &str, raw: &str) -> Result<Self, SeedError> {
        serde_json::from_str(raw).map_err(|source| SeedError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&display, &raw)
    }

    pub fn apply(self, orders: &InMemoryOrderRepository, roster: &InMemoryCustomerRoster) {
        for order in self.orders {
            orders.insert(order);
        }
        for customer in self.customers {
            roster.upsert(customer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;
    use crate::domain::order::OrderStatus;
    use crate::ports::{CustomerRoster, OrderRepository};

    #[tokio::test]
    async fn applies_orders_and_customers() {
        let seed = SeedData::from_json(
            "inline",
            r#"{
                "orders": [{ "orderId": "42", "status": "ACCEPTED", "customerName": "Ana" }],
                "customers": [{ "id": "u1", "displayName": "Ana" }]
            }"#,
        )
        .unwrap();
        let orders = InMemoryOrderRepository::new();
        let roster = InMemoryCustomerRoster::new();
        seed.apply(&orders, &roster);

        let order = orders.find(&OrderId::new("42").unwrap()).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(roster.list_known_customers().await.unwrap().len(), 1);
    }

    #[test]
    fn rejects_invalid_order_ids() {
        let result = SeedData::from_json("inline", r#"{ "orders": [{ "orderId": "", "status": "PENDING" }] }"#);
        assert!(matches!(result, Err(SeedError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            SeedData::load("/nonexistent/dispatch-seed.json"),
            Err(SeedError::Io { .. })
        ));
    }
}
