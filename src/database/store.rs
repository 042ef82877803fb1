//! Persistence seam shared by the MongoDB and in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use mongodb::bson::oid::ObjectId;

use crate::errors::Result;
use crate::models::{
    bus::{Bus, BusMovement, BusOccupancy},
    bus_stop::{BusStop, StopReport},
    ticket::{Ticket, TicketTransition},
    transaction::{Transaction, TransactionStatus},
    user::User,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>>;

    async fn find_user_by_email_or_phone(&self, email: &str, phone: &str) -> Result<Option<User>>;

    /// Fails with `AppError::DuplicateUser` when the email or phone is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn increment_user_bookings(&self, id: &ObjectId) -> Result<()>;

    async fn count_users(&self) -> Result<u64>;

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()>;

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>>;

    async fn find_ticket_by_order(&self, order_id: &str) -> Result<Option<Ticket>>;

    /// Applies `transition` only if the ticket is currently in `transition.from`.
    ///
    /// Returns the updated ticket when this call performed the write, `None`
    /// when the ticket is missing or was already in another state.
    async fn transition_ticket(
        &self,
        ticket_id: &str,
        transition: &TicketTransition,
    ) -> Result<Option<Ticket>>;

    /// Flips `confirmation_applied` on a paid ticket to `applied` if it is not
    /// already there. Returns whether this call made the change.
    async fn mark_confirmation_applied(&self, ticket_id: &str, applied: bool) -> Result<bool>;

    /// Counts tickets booked at or after `since` (all tickets when `None`).
    async fn count_tickets(&self, since: Option<DateTime<Utc>>) -> Result<u64>;

    /// Sum of fares over paid tickets booked at or after `since`.
    async fn paid_revenue(&self, since: Option<DateTime<Utc>>) -> Result<i64>;

    async fn recent_tickets(&self, limit: i64) -> Result<Vec<Ticket>>;

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()>;

    async fn find_transaction_by_order(&self, order_id: &str) -> Result<Option<Transaction>>;

    /// Moves the order's transaction out of `pending`. Returns whether a write happened.
    async fn transition_transaction(
        &self,
        order_id: &str,
        to: TransactionStatus,
        payment_id: Option<String>,
    ) -> Result<bool>;

    async fn list_active_buses(&self, limit: Option<i64>) -> Result<Vec<Bus>>;

    async fn count_active_buses(&self) -> Result<u64>;

    async fn update_bus_movement(&self, bus_id: &str, movement: &BusMovement) -> Result<()>;

    async fn update_bus_occupancy(&self, bus_id: &str, occupancy: &BusOccupancy) -> Result<()>;

    async fn list_stops(&self) -> Result<Vec<BusStop>>;

    async fn count_stops(&self) -> Result<u64>;

    /// Returns false when no stop has that name.
    async fn record_stop_report(&self, stop: &str, report: StopReport) -> Result<bool>;

    /// Drops all buses and stops and inserts the given sets.
    async fn replace_fleet(&self, buses: Vec<Bus>, stops: Vec<BusStop>) -> Result<()>;
}
