use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod fleet;
pub mod tickets;
pub mod users;

/// Every endpoint, relative to the `/api` prefix.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(tickets::routes())
        .merge(fleet::routes())
        .merge(admin::routes())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::database::memory_store::MemoryStore;
    use crate::database::store::Store;
    use crate::models::ticket::PaymentStatus;
    use crate::services::razorpay_service::MockPaymentGateway;
    use crate::services::signature;
    use crate::test_support::{
        capture_webhook, gateway_with_order, memory_state, sign_webhook, TEST_KEY_SECRET,
    };

    fn app(gateway: MockPaymentGateway) -> (Router, Arc<MemoryStore>, AppState) {
        let (state, store) = memory_state(gateway);
        let router = Router::new()
            .nest("/api", api_routes())
            .with_state(state.clone());
        (router, store, state)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_order(router: &Router) -> Value {
        let (status, body) = call(
            router,
            "POST",
            "/api/create-order",
            Some(json!({
                "passengers": 2,
                "fromStop": "Majestic Bus Stand",
                "toStop": "Whitefield",
                "userEmail": "rider@example.com"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }

    #[tokio::test]
    async fn health_reports_storage_backend() {
        let (router, _, _) = app(MockPaymentGateway::new());
        let (status, body) = call(&router, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["storage"], "memory");
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (router, _, _) = app(MockPaymentGateway::new());
        let user = json!({"name": "Asha", "email": "asha@example.com", "phone": "9000000001"});

        let (status, body) = call(&router, "POST", "/api/register", Some(user.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "asha@example.com");

        let (status, body) = call(&router, "POST", "/api/register", Some(user)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn registration_requires_valid_email() {
        let (router, _, _) = app(MockPaymentGateway::new());
        let (status, _) = call(
            &router,
            "POST",
            "/api/register",
            Some(json!({"name": "Asha", "email": "not-an-email", "phone": "9000000001"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn order_then_callback_issues_ticket() {
        let (router, _, state) = app(gateway_with_order("order_1", 5000));
        let order = create_order(&router).await;
        assert_eq!(order["orderId"], "order_1");
        assert_eq!(order["amount"], 5000);
        assert_eq!(order["fareDetails"]["totalFare"], 50);
        assert_eq!(order["key"], "rzp_test_key");

        let ticket_id = order["ticketId"].as_str().unwrap().to_string();
        let signature = signature::payment_signature(TEST_KEY_SECRET, "order_1", "pay_1").unwrap();
        let (status, body) = call(
            &router,
            "POST",
            "/api/verify-payment",
            Some(json!({
                "razorpay_order_id": "order_1",
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": signature,
                "ticketId": ticket_id,
            })),
        )
        .await;
        state.workflow.drain_notifications().await;

        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);
        assert!(body["qrCode"].is_string());
        let download_link = format!("/api/ticket/download/{}", ticket_id);
        assert_eq!(body["downloadLink"], download_link.as_str());
        let (status, _) = call(&router, "GET", &download_link, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, ticket) = call(&router, "GET", &format!("/api/ticket/{}", ticket_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ticket["paymentStatus"], "paid");
        assert_eq!(ticket["fare"], 50);

        let (status, stats) = call(&router, "GET", "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["stats"]["totalTickets"], 1);
        assert_eq!(stats["stats"]["totalRevenue"], 50);
    }

    #[tokio::test]
    async fn forged_callback_returns_400_and_fails_ticket() {
        let (router, store, _) = app(gateway_with_order("order_1", 5000));
        let order = create_order(&router).await;
        let ticket_id = order["ticketId"].as_str().unwrap().to_string();

        let (status, body) = call(
            &router,
            "POST",
            "/api/verify-payment",
            Some(json!({
                "orderId": "order_1",
                "paymentId": "pay_1",
                "signature": "forged",
                "ticketId": ticket_id,
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["downloadLink"].is_null());
        let ticket = store.find_ticket(&ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn webhook_always_acknowledges() {
        let (router, store, _) = app(gateway_with_order("order_1", 5000));
        let order = create_order(&router).await;
        let ticket_id = order["ticketId"].as_str().unwrap().to_string();
        let body = capture_webhook("payment.captured", "order_1", "pay_1", 5000);

        let forged = Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header("x-razorpay-signature", "forged")
            .body(Body::from(body.clone()))
            .unwrap();
        let response = router.clone().oneshot(forged).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap())
                .unwrap();
        assert_eq!(ack, json!({"status": "OK"}));
        let ticket = store.find_ticket(&ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.payment_status, PaymentStatus::Pending);

        let signed = Request::builder()
            .method("POST")
            .uri("/api/razorpay-webhook")
            .header("x-razorpay-signature", sign_webhook(&body))
            .body(Body::from(body))
            .unwrap();
        let response = router.clone().oneshot(signed).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ticket = store.find_ticket(&ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn unpaid_ticket_has_no_qr_code() {
        let (router, _, _) = app(gateway_with_order("order_1", 5000));
        let order = create_order(&router).await;
        let ticket_id = order["ticketId"].as_str().unwrap();

        let (status, ticket) = call(&router, "GET", &format!("/api/ticket/{}", ticket_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ticket["ticketId"], ticket_id);
        assert_eq!(ticket["paymentStatus"], "pending");
        assert!(ticket["qrCode"].is_null());
    }

    #[tokio::test]
    async fn malformed_order_body_gets_json_error() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_order().never();
        let (router, store, _) = app(gateway);

        for body in [
            json!({"fromStop": "Majestic Bus Stand", "toStop": "Whitefield"}),
            json!({"passengers": "two", "fromStop": "Majestic Bus Stand", "toStop": "Whitefield"}),
        ] {
            let (status, error) = call(&router, "POST", "/api/create-order", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error["success"], false);
            assert_eq!(error["error"], "Validation failed");
        }
        assert_eq!(store.count_tickets(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_ticket_is_404() {
        let (router, _, _) = app(MockPaymentGateway::new());
        let (status, body) = call(&router, "GET", "/api/ticket/TKTNOPE", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = call(&router, "GET", "/api/ticket/download/TKTNOPE", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn receipt_download_is_html() {
        let (router, _, _) = app(gateway_with_order("order_1", 5000));
        let order = create_order(&router).await;
        let ticket_id = order["ticketId"].as_str().unwrap();

        let request = Request::builder()
            .uri(format!("/api/ticket/download/{}", ticket_id))
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let html = String::from_utf8(
            to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec(),
        )
        .unwrap();
        assert!(html.contains(ticket_id));
    }

    #[tokio::test]
    async fn seeded_fleet_can_be_simulated_and_reported() {
        let (router, store, _) = app(MockPaymentGateway::new());

        let (status, _) = call(&router, "POST", "/api/admin/seed-data", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, live) = call(&router, "GET", "/api/live-buses", None).await;
        assert_eq!(live["count"], 5);

        let (_, moved) = call(&router, "POST", "/api/admin/simulate-buses", None).await;
        assert_eq!(moved["updatedCount"], 5);
        let (_, filled) = call(&router, "POST", "/api/simulate-capacity", None).await;
        assert_eq!(filled["updatedCount"], 5);

        for bus in store.list_active_buses(None).await.unwrap() {
            assert!(bus.current_passengers <= bus.capacity);
            assert_eq!(bus.available_seats, bus.capacity - bus.current_passengers);
            assert!(bus.eta >= 1);
        }

        let (status, report) = call(
            &router,
            "POST",
            "/api/submit-report",
            Some(json!({"type": "vendor", "stop": "Jayanagar", "description": "cart on path"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(report["reportId"].as_str().unwrap().starts_with("REP"));

        let (_, stops) = call(&router, "GET", "/api/bus-stops", None).await;
        let jayanagar = stops["stops"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == "Jayanagar")
            .unwrap()
            .clone();
        assert_eq!(jayanagar["vendorBlocked"], true);
    }
}
