use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection, Database,
};

use crate::database::store::Store;
use crate::errors::{AppError, Result};
use crate::models::{
    bus::{Bus, BusMovement, BusOccupancy},
    bus_stop::{BusStop, StopReport},
    ticket::{PaymentStatus, Ticket, TicketTransition},
    transaction::{Transaction, TransactionStatus},
    user::User,
};

const DUPLICATE_KEY_CODE: i32 = 11000;
const ACTIVE_BUS: &str = "active";

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn tickets(&self) -> Collection<Ticket> {
        self.db.collection("tickets")
    }

    fn transactions(&self) -> Collection<Transaction> {
        self.db.collection("transactions")
    }

    fn buses(&self) -> Collection<Bus> {
        self.db.collection("buses")
    }

    fn stops(&self) -> Collection<BusStop> {
        self.db.collection("bus_stops")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn booked_since(filter: &mut Document, since: Option<DateTime<Utc>>) {
    if let Some(since) = since {
        filter.insert(
            "booking_time",
            doc! { "$gte": BsonDateTime::from_chrono(since) },
        );
    }
}

#[async_trait]
impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": *id }).await?)
    }

    async fn find_user_by_email_or_phone(&self, email: &str, phone: &str) -> Result<Option<User>> {
        let filter = doc! {
            "$or": [
                { "email": email },
                { "phone": phone }
            ]
        };
        Ok(self.users().find_one(filter).await?)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::DuplicateUser),
            Err(e) => Err(e.into()),
        }
    }

    async fn increment_user_bookings(&self, id: &ObjectId) -> Result<()> {
        self.users()
            .update_one(doc! { "_id": *id }, doc! { "$inc": { "total_bookings": 1 } })
            .await?;
        Ok(())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.users().count_documents(doc! {}).await?)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        match self.tickets().insert_one(ticket).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::DuplicateKey),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        Ok(self.tickets().find_one(doc! { "ticket_id": ticket_id }).await?)
    }

    async fn find_ticket_by_order(&self, order_id: &str) -> Result<Option<Ticket>> {
        Ok(self
            .tickets()
            .find_one(doc! { "gateway_order_id": order_id })
            .await?)
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

        let mut set = doc! { "payment_status": transition.to.as_str() };
        if let Some(payment_id) = &transition.payment_id {
            set.insert("gateway_payment_id", payment_id.as_str());
        }
        if let Some(qr) = &transition.qr_code_data {
            set.insert("qr_code_data", qr.as_str());
        }

        // The status predicate makes this a compare-and-swap: racing writers see None.
        let filter = doc! {
            "ticket_id": ticket_id,
            "payment_status": transition.from.as_str(),
        };

        Ok(self
            .tickets()
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn mark_confirmation_applied(&self, ticket_id: &str, applied: bool) -> Result<bool> {
        // `$ne` also matches documents written before the flag existed.
        let filter = doc! {
            "ticket_id": ticket_id,
            "payment_status": PaymentStatus::Paid.as_str(),
            "confirmation_applied": { "$ne": applied },
        };
        let result = self
            .tickets()
            .update_one(filter, doc! { "$set": { "confirmation_applied": applied } })
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn count_tickets(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        let mut filter = doc! {};
        booked_since(&mut filter, since);
        Ok(self.tickets().count_documents(filter).await?)
    }

    async fn paid_revenue(&self, since: Option<DateTime<Utc>>) -> Result<i64> {
        let mut filter = doc! { "payment_status": PaymentStatus::Paid.as_str() };
        booked_since(&mut filter, since);

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": null, "total": { "$sum": "$fare" } } },
        ];

        let mut cursor = self.tickets().aggregate(pipeline).await?;
        let total = match cursor.try_next().await? {
            Some(group) => group
                .get_i64("total")
                .or_else(|_| group.get_i32("total").map(i64::from))
                .unwrap_or(0),
            None => 0,
        };
        Ok(total)
    }

    async fn recent_tickets(&self, limit: i64) -> Result<Vec<Ticket>> {
        let cursor = self
            .tickets()
            .find(doc! {})
            .sort(doc! { "booking_time": -1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        match self.transactions().insert_one(transaction).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::DuplicateKey),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_transaction_by_order(&self, order_id: &str) -> Result<Option<Transaction>> {
        Ok(self
            .transactions()
            .find_one(doc! { "gateway_order_id": order_id })
            .await?)
    }

    async fn transition_transaction(
        &self,
        order_id: &str,
        to: TransactionStatus,
        payment_id: Option<String>,
    ) -> Result<bool> {
        let mut set = doc! { "status": to.as_str() };
        if let Some(payment_id) = payment_id {
            set.insert("gateway_payment_id", payment_id);
        }

        let filter = doc! {
            "gateway_order_id": order_id,
            "status": TransactionStatus::Pending.as_str(),
        };

        let result = self
            .transactions()
            .update_one(filter, doc! { "$set": set })
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn list_active_buses(&self, limit: Option<i64>) -> Result<Vec<Bus>> {
        // A limit of 0 is unbounded.
        let cursor = self
            .buses()
            .find(doc! { "status": ACTIVE_BUS })
            .limit(limit.unwrap_or(0))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_active_buses(&self) -> Result<u64> {
        Ok(self
            .buses()
            .count_documents(doc! { "status": ACTIVE_BUS })
            .await?)
    }

    async fn update_bus_movement(&self, bus_id: &str, movement: &BusMovement) -> Result<()> {
        let update = doc! {
            "$set": {
                "current_location": {
                    "lat": movement.location.lat,
                    "lon": movement.location.lon,
                },
                "eta": movement.eta,
                "next_stop": movement.next_stop.clone(),
                "last_updated": BsonDateTime::now(),
            }
        };
        self.buses()
            .update_one(doc! { "bus_id": bus_id }, update)
            .await?;
        Ok(())
    }

    async fn update_bus_occupancy(&self, bus_id: &str, occupancy: &BusOccupancy) -> Result<()> {
        let update = doc! {
            "$set": {
                "current_passengers": occupancy.current_passengers,
                "available_seats": occupancy.available_seats,
                "occupancy_rate": occupancy.occupancy_rate,
                "last_updated": BsonDateTime::now(),
            }
        };
        self.buses()
            .update_one(doc! { "bus_id": bus_id }, update)
            .await?;
        Ok(())
    }

    async fn list_stops(&self) -> Result<Vec<BusStop>> {
        let cursor = self.stops().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_stops(&self) -> Result<u64> {
        Ok(self.stops().count_documents(doc! {}).await?)
    }

    async fn record_stop_report(&self, stop: &str, report: StopReport) -> Result<bool> {
        let set = match report {
            StopReport::Crowd => doc! { "crowd_level": "High" },
            StopReport::Vendor => doc! { "vendor_blocked": true },
        };
        let result = self
            .stops()
            .update_one(doc! { "name": stop }, doc! { "$set": set })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn replace_fleet(&self, buses: Vec<Bus>, stops: Vec<BusStop>) -> Result<()> {
        self.buses().delete_many(doc! {}).await?;
        self.stops().delete_many(doc! {}).await?;

        if !stops.is_empty() {
            self.stops().insert_many(stops).await?;
        }
        if !buses.is_empty() {
            self.buses().insert_many(buses).await?;
        }
        Ok(())
    }
}
