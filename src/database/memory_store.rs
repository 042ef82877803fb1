//! In-process store used for demo deployments and tests.
//!
//! Every operation takes the single lock for its whole duration, so the
//! conditional transitions are as atomic here as `find_one_and_update` is in
//! MongoDB. The lock is never held across an await outside this module.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use tokio::sync::Mutex;

use crate::database::store::Store;
use crate::errors::{AppError, Result};
use crate::models::{
    bus::{Bus, BusMovement, BusOccupancy, BusStatus},
    bus_stop::{BusStop, CrowdLevel, StopReport},
    ticket::{PaymentStatus, Ticket, TicketTransition},
    transaction::{Transaction, TransactionStatus},
    user::User,
};

#[derive(Default)]
struct Collections {
    users: HashMap<ObjectId, User>,
    tickets: HashMap<String, Ticket>,
    transactions: Vec<Transaction>,
    buses: Vec<Bus>,
    stops: Vec<BusStop>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn booked_since(ticket: &Ticket, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |since| ticket.booking_time >= since)
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    async fn find_user_by_email_or_phone(&self, email: &str, phone: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.email == email || u.phone == phone)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let taken = inner
            .users
            .values()
            .any(|u| u.email == user.email || u.phone == user.phone);
        if taken {
            return Err(AppError::DuplicateUser);
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn increment_user_bookings(&self, id: &ObjectId) -> Result<()> {
        if let Some(user) = self.inner.lock().await.users.get_mut(id) {
            user.total_bookings += 1;
        }
        Ok(())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.inner.lock().await.users.len() as u64)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let clash = inner.tickets.contains_key(&ticket.ticket_id)
            || inner
                .tickets
                .values()
                .any(|t| t.gateway_order_id == ticket.gateway_order_id);
        if clash {
            return Err(AppError::DuplicateKey);
        }
        inner.tickets.insert(ticket.ticket_id.clone(), ticket.clone());
        Ok(())
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        Ok(self.inner.lock().await.tickets.get(ticket_id).cloned())
    }

    async fn find_ticket_by_order(&self, order_id: &str) -> Result<Option<Ticket>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .values()
            .find(|t| t.gateway_order_id == order_id)
            .cloned())
    }

    async fn transition_ticket(
        &self,
        ticket_id: &str,
        transition: &TicketTransition,
    ) -> Result<Option<Ticket>> {
        if !transition.from.can_transition_to(transition.to) {
            return Err(AppError::internal(format!(
                "illegal ticket transition {} -> {}",
                transition.from.as_str(),
                transition.to.as_str()
            )));
        }

        let mut inner = self.inner.lock().await;
        match inner.tickets.get_mut(ticket_id) {
            Some(ticket) if ticket.payment_status == transition.from => {
                transition.apply(ticket);
                Ok(Some(ticket.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_confirmation_applied(&self, ticket_id: &str, applied: bool) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.tickets.get_mut(ticket_id) {
            Some(ticket)
                if ticket.payment_status == PaymentStatus::Paid
                    && ticket.confirmation_applied != applied =>
            {
                ticket.confirmation_applied = applied;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_tickets(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .values()
            .filter(|t| booked_since(t, since))
            .count() as u64)
    }

    async fn paid_revenue(&self, since: Option<DateTime<Utc>>) -> Result<i64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .values()
            .filter(|t| t.payment_status == PaymentStatus::Paid && booked_since(t, since))
            .map(|t| t.fare)
            .sum())
    }

    async fn recent_tickets(&self, limit: i64) -> Result<Vec<Ticket>> {
        let inner = self.inner.lock().await;
        let mut tickets: Vec<Ticket> = inner.tickets.values().cloned().collect();
        tickets.sort_by(|a, b| b.booking_time.cmp(&a.booking_time));
        tickets.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(tickets)
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let clash = inner.transactions.iter().any(|t| {
            t.transaction_id == transaction.transaction_id
                || t.gateway_order_id == transaction.gateway_order_id
        });
        if clash {
            return Err(AppError::DuplicateKey);
        }
        inner.transactions.push(transaction.clone());
        Ok(())
    }

    async fn find_transaction_by_order(&self, order_id: &str) -> Result<Option<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .find(|t| t.gateway_order_id == order_id)
            .cloned())
    }

    async fn transition_transaction(
        &self,
        order_id: &str,
        to: TransactionStatus,
        payment_id: Option<String>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let pending = inner.transactions.iter_mut().find(|t| {
            t.gateway_order_id == order_id && t.status == TransactionStatus::Pending
        });

        match pending {
            Some(transaction) => {
                transaction.status = to;
                if payment_id.is_some() {
                    transaction.gateway_payment_id = payment_id;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_active_buses(&self, limit: Option<i64>) -> Result<Vec<Bus>> {
        let inner = self.inner.lock().await;
        let active = inner
            .buses
            .iter()
            .filter(|b| b.status == BusStatus::Active)
            .cloned();
        Ok(match limit.and_then(|l| usize::try_from(l).ok()) {
            Some(limit) => active.take(limit).collect(),
            None => active.collect(),
        })
    }

    async fn count_active_buses(&self) -> Result<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .buses
            .iter()
            .filter(|b| b.status == BusStatus::Active)
            .count() as u64)
    }

    async fn update_bus_movement(&self, bus_id: &str, movement: &BusMovement) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(bus) = inner.buses.iter_mut().find(|b| b.bus_id == bus_id) {
            bus.current_location = movement.location;
            bus.eta = movement.eta;
            bus.next_stop = movement.next_stop.clone();
            bus.last_updated = Utc::now();
        }
        Ok(())
    }

    async fn update_bus_occupancy(&self, bus_id: &str, occupancy: &BusOccupancy) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(bus) = inner.buses.iter_mut().find(|b| b.bus_id == bus_id) {
            bus.current_passengers = occupancy.current_passengers;
            bus.available_seats = occupancy.available_seats;
            bus.occupancy_rate = occupancy.occupancy_rate;
            bus.last_updated = Utc::now();
        }
        Ok(())
    }

    async fn list_stops(&self) -> Result<Vec<BusStop>> {
        Ok(self.inner.lock().await.stops.clone())
    }

    async fn count_stops(&self) -> Result<u64> {
        Ok(self.inner.lock().await.stops.len() as u64)
    }

    async fn record_stop_report(&self, stop: &str, report: StopReport) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.stops.iter_mut().find(|s| s.name == stop) {
            Some(bus_stop) => {
                match report {
                    StopReport::Crowd => bus_stop.crowd_level = CrowdLevel::High,
                    StopReport::Vendor => bus_stop.vendor_blocked = true,
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_fleet(&self, buses: Vec<Bus>, stops: Vec<BusStop>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.buses = buses;
        inner.stops = stops;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pending_ticket;

    #[tokio::test]
    async fn transition_only_applies_from_expected_status() {
        let store = MemoryStore::new();
        store.insert_ticket(&pending_ticket("TKT1", "order_1", None)).await.unwrap();

        let first = store
            .transition_ticket("TKT1", &TicketTransition::settle_paid("pay_1", None))
            .await
            .unwrap();
        assert_eq!(first.unwrap().payment_status, PaymentStatus::Paid);

        let second = store
            .transition_ticket("TKT1", &TicketTransition::settle_failed())
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = store.find_ticket("TKT1").await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.gateway_payment_id.as_deref(), Some("pay_1"));
    }

    #[tokio::test]
    async fn confirmation_flag_is_claimed_once_and_only_when_paid() {
        let store = MemoryStore::new();
        store.insert_ticket(&pending_ticket("TKT1", "order_1", None)).await.unwrap();

        assert!(!store.mark_confirmation_applied("TKT1", true).await.unwrap());

        store
            .transition_ticket("TKT1", &TicketTransition::settle_paid("pay_1", None))
            .await
            .unwrap();
        assert!(store.mark_confirmation_applied("TKT1", true).await.unwrap());
        assert!(!store.mark_confirmation_applied("TKT1", true).await.unwrap());

        assert!(store.mark_confirmation_applied("TKT1", false).await.unwrap());
        assert!(store.mark_confirmation_applied("TKT1", true).await.unwrap());
        assert!(!store.mark_confirmation_applied("missing", true).await.unwrap());
    }

    #[tokio::test]
    async fn transition_rejects_illegal_moves() {
        let store = MemoryStore::new();
        let refund_from_pending = TicketTransition {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Refunded,
            payment_id: None,
            qr_code_data: None,
        };
        assert!(store
            .transition_ticket("TKT1", &refund_from_pending)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn duplicate_email_or_phone_is_rejected() {
        let store = MemoryStore::new();
        let first = User::new("Asha".into(), "asha@example.com".into(), "9000000001".into());
        store.insert_user(&first).await.unwrap();

        let same_phone = User::new("Ravi".into(), "ravi@example.com".into(), "9000000001".into());
        assert!(matches!(
            store.insert_user(&same_phone).await,
            Err(AppError::DuplicateUser)
        ));
    }

    #[tokio::test]
    async fn second_ticket_for_same_order_is_rejected() {
        let store = MemoryStore::new();
        store.insert_ticket(&pending_ticket("TKT1", "order_1", None)).await.unwrap();
        let result = store.insert_ticket(&pending_ticket("TKT2", "order_1", None)).await;
        assert!(matches!(result, Err(AppError::DuplicateKey)));
    }

    #[tokio::test]
    async fn revenue_counts_only_paid_tickets() {
        let store = MemoryStore::new();
        store.insert_ticket(&pending_ticket("TKT1", "order_1", None)).await.unwrap();
        store.insert_ticket(&pending_ticket("TKT2", "order_2", None)).await.unwrap();
        store
            .transition_ticket("TKT2", &TicketTransition::settle_paid("pay_2", None))
            .await
            .unwrap();

        assert_eq!(store.paid_revenue(None).await.unwrap(), 50);
        assert_eq!(store.count_tickets(None).await.unwrap(), 2);
    }
}
