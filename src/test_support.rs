//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::database::memory_store::MemoryStore;
use crate::database::store::Store;
use crate::errors::{AppError, Result};
use crate::models::{
    bus::{Bus, BusMovement, BusOccupancy},
    bus_stop::{BusStop, StopReport},
    ticket::{PaymentStatus, Ticket, TicketTransition},
    transaction::{Transaction, TransactionStatus, TransactionType},
    user::User,
};
use crate::services::notifier::TicketNotifier;
use crate::services::razorpay_service::{GatewayOrder, MockPaymentGateway};
use crate::services::signature;
use crate::services::ticket_workflow::TicketWorkflow;
use crate::state::AppState;
use mongodb::bson::oid::ObjectId;

pub const TEST_KEY_SECRET: &str = "test_key_secret";
pub const TEST_WEBHOOK_SECRET: &str = "test_webhook_secret";

/// Two passengers at the default base fare, awaiting payment.
pub fn pending_ticket(ticket_id: &str, order_id: &str, user_id: Option<ObjectId>) -> Ticket {
    let now = Utc::now();
    Ticket {
        id: None,
        ticket_id: ticket_id.to_string(),
        user_id,
        user_name: "Guest".to_string(),
        user_email: "rider@example.com".to_string(),
        user_phone: "9000000000".to_string(),
        from_stop: "Majestic Bus Stand".to_string(),
        to_stop: "Electronic City".to_string(),
        passengers: 2,
        fare: 50,
        gateway_order_id: order_id.to_string(),
        gateway_payment_id: None,
        payment_status: PaymentStatus::Pending,
        booking_time: now,
        travel_date: now,
        qr_code_data: None,
        is_active: true,
        confirmation_applied: false,
    }
}

pub fn pending_transaction(order_id: &str) -> Transaction {
    Transaction {
        id: None,
        transaction_id: format!("TXN-{}", order_id),
        user_id: None,
        amount: 50,
        transaction_type: TransactionType::TicketPurchase,
        gateway_order_id: order_id.to_string(),
        gateway_payment_id: None,
        status: TransactionStatus::Pending,
        description: "test purchase".to_string(),
        created_at: Utc::now(),
    }
}

/// Gateway mock that hands out `order_id` for any request of `amount` subunits.
pub fn gateway_with_order(order_id: &str, amount: i64) -> MockPaymentGateway {
    let order_id = order_id.to_string();
    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_key_id()
        .return_const("rzp_test_key".to_string());
    gateway
        .expect_create_order()
        .withf(move |req| req.amount == amount)
        .returning(move |req| {
            Ok(GatewayOrder {
                id: order_id.clone(),
                amount: req.amount,
                currency: req.currency.clone(),
                receipt: Some(req.receipt.clone()),
                status: Some("created".to_string()),
            })
        });
    gateway
}

pub fn capture_webhook(event: &str, order_id: &str, payment_id: &str, amount: i64) -> Vec<u8> {
    serde_json::json!({
        "entity": "event",
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "amount": amount,
                    "currency": "INR",
                    "status": "captured"
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

pub fn sign_webhook(body: &[u8]) -> String {
    signature::sign(TEST_WEBHOOK_SECRET, body).unwrap()
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: AtomicUsize,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketNotifier for RecordingNotifier {
    async fn ticket_confirmed(&self, _ticket: &Ticket) -> Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl TicketNotifier for FailingNotifier {
    async fn ticket_confirmed(&self, _ticket: &Ticket) -> Result<()> {
        Err(AppError::notification("smtp unreachable"))
    }
}

/// Application state over a fresh memory store.
pub fn memory_state(gateway: MockPaymentGateway) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = Arc::new(AppConfig::for_tests());
    let dyn_store: Arc<dyn Store> = store.clone();
    let workflow = Arc::new(TicketWorkflow::new(
        dyn_store.clone(),
        Arc::new(gateway),
        Arc::new(RecordingNotifier::default()),
        &config,
    ));
    (AppState::new(dyn_store, workflow, config), store)
}

/// Memory store that fails the next transaction update or booking increment once when armed.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_transaction_update: AtomicBool,
    fail_booking_increment: AtomicBool,
}

impl FlakyStore {
    pub fn fail_next_transaction_update(&self) {
        self.fail_transaction_update.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_booking_increment(&self) {
        self.fail_booking_increment.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_email_or_phone(&self, email: &str, phone: &str) -> Result<Option<User>> {
        self.inner.find_user_by_email_or_phone(email, phone).await
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        self.inner.insert_user(user).await
    }

    async fn increment_user_bookings(&self, id: &ObjectId) -> Result<()> {
        if self.fail_booking_increment.swap(false, Ordering::SeqCst) {
            return Err(AppError::internal("users collection unavailable"));
        }
        self.inner.increment_user_bookings(id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.inner.count_users().await
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.inner.insert_ticket(ticket).await
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        self.inner.find_ticket(ticket_id).await
    }

    async fn find_ticket_by_order(&self, order_id: &str) -> Result<Option<Ticket>> {
        self.inner.find_ticket_by_order(order_id).await
    }

    async fn transition_ticket(
        &self,
        ticket_id: &str,
        transition: &TicketTransition,
    ) -> Result<Option<Ticket>> {
        self.inner.transition_ticket(ticket_id, transition).await
    }

    async fn mark_confirmation_applied(&self, ticket_id: &str, applied: bool) -> Result<bool> {
        self.inner.mark_confirmation_applied(ticket_id, applied).await
    }

    async fn count_tickets(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        self.inner.count_tickets(since).await
    }

    async fn paid_revenue(&self, since: Option<DateTime<Utc>>) -> Result<i64> {
        self.inner.paid_revenue(since).await
    }

    async fn recent_tickets(&self, limit: i64) -> Result<Vec<Ticket>> {
        self.inner.recent_tickets(limit).await
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        self.inner.insert_transaction(transaction).await
    }

    async fn find_transaction_by_order(&self, order_id: &str) -> Result<Option<Transaction>> {
        self.inner.find_transaction_by_order(order_id).await
    }

    async fn transition_transaction(
        &self,
        order_id: &str,
        to: TransactionStatus,
        payment_id: Option<String>,
    ) -> Result<bool> {
        if self.fail_transaction_update.swap(false, Ordering::SeqCst) {
            return Err(AppError::internal("transactions collection unavailable"));
        }
        self.inner.transition_transaction(order_id, to, payment_id).await
    }

    async fn list_active_buses(&self, limit: Option<i64>) -> Result<Vec<Bus>> {
        self.inner.list_active_buses(limit).await
    }

    async fn count_active_buses(&self) -> Result<u64> {
        self.inner.count_active_buses().await
    }

    async fn update_bus_movement(&self, bus_id: &str, movement: &BusMovement) -> Result<()> {
        self.inner.update_bus_movement(bus_id, movement).await
    }

    async fn update_bus_occupancy(&self, bus_id: &str, occupancy: &BusOccupancy) -> Result<()> {
        self.inner.update_bus_occupancy(bus_id, occupancy).await
    }

    async fn list_stops(&self) -> Result<Vec<BusStop>> {
        self.inner.list_stops().await
    }

    async fn count_stops(&self) -> Result<u64> {
        self.inner.count_stops().await
    }

    async fn record_stop_report(&self, stop: &str, report: StopReport) -> Result<bool> {
        self.inner.record_stop_report(stop, report).await
    }

    async fn replace_fleet(&self, buses: Vec<Bus>, stops: Vec<BusStop>) -> Result<()> {
        self.inner.replace_fleet(buses, stops).await
    }
}
