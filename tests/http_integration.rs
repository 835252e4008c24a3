//! Integration tests for the HTTP read endpoints.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use dispatch_hub::adapters::memory::{
    InMemoryCustomerRoster, InMemoryHistoryStore, InMemoryOrderRepository,
};
use dispatch_hub::adapters::{hub_routes, HttpState};
use dispatch_hub::application::handlers::{
    InboxAggregator, TransitionOrderCommand, TransitionOrderHandler,
};
use dispatch_hub::application::hub::{Hub, HubOptions};
use dispatch_hub::domain::foundation::{CustomerId, OrderId};
use dispatch_hub::domain::inbox::KnownCustomer;
use dispatch_hub::domain::message::{Actor, SenderRole};
use dispatch_hub::domain::order::{OrderRecord, OrderStatus, TransitionPolicy};

struct Fixture {
    state: HttpState,
    roster: Arc<InMemoryCustomerRoster>,
    transitions: TransitionOrderHandler,
}

fn setup() -> Fixture {
    let orders = Arc::new(InMemoryOrderRepository::new());
    orders.insert(OrderRecord::new(OrderId::new("42").unwrap(), OrderStatus::Accepted));
    let roster = Arc::new(InMemoryCustomerRoster::with_customers([KnownCustomer::new(
        CustomerId::new("u1").unwrap(),
        "Ana",
    )]));
    let hub = Arc::new(Hub::new(
        HubOptions::default(),
        Arc::new(InMemoryHistoryStore::new()),
        orders.clone(),
    ));
    let inbox = Arc::new(InboxAggregator::new(hub.clone(), roster.clone()));
    let transitions =
        TransitionOrderHandler::new(orders.clone(), hub.clone(), TransitionPolicy::Permissive);
    Fixture {
        state: HttpState { hub, inbox, orders },
        roster,
        transitions,
    }
}

async fn get(state: HttpState, uri: &str) -> (StatusCode, Value) {
    let response = hub_routes(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_counts() {
    let fx = setup();
    let (status, body) = get(fx.state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn inbox_lists_roster_customers() {
    let fx = setup();
    let (status, body) = get(fx.state, "/api/inbox").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["roomId"], "guest:u1");
    assert_eq!(body[0]["displayName"], "Ana");
    assert_eq!(body[0]["unreadCount"], 0);
}

#[tokio::test]
async fn inbox_roster_outage_is_503() {
    let fx = setup();
    fx.roster.fail(true);
    let (status, body) = get(fx.state, "/api/inbox").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["code"].is_string());
}

#[tokio::test]
async fn order_timeline_lists_transitions() {
    let fx = setup();
    fx.transitions
        .handle(TransitionOrderCommand {
            order_id: OrderId::new("42").unwrap(),
            requested: OrderStatus::OnTheWay,
            actor: Actor::new(SenderRole::Operator, "Dispatch"),
            note: Some("left the depot".to_string()),
        })
        .await
        .unwrap();

    let (status, body) = get(fx.state, "/api/orders/42/timeline").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ON_THE_WAY");
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_order_timeline_is_404() {
    let fx = setup();
    let (status, body) = get(fx.state, "/api/orders/999/timeline").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ORDER_NOT_FOUND");
}
