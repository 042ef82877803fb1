use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::transaction::TransactionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Legal moves: pending settles once, and only a paid ticket can be refunded.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }

    /// Status the backing transaction must carry once this ticket status is reached.
    pub fn mirrored_transaction_status(&self) -> Option<TransactionStatus> {
        match self {
            PaymentStatus::Pending => None,
            PaymentStatus::Paid => Some(TransactionStatus::Completed),
            PaymentStatus::Failed => Some(TransactionStatus::Failed),
            PaymentStatus::Refunded => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub ticket_id: String,
    pub user_id: Option<ObjectId>,

    // Contact snapshot taken at booking time.
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,

    pub from_stop: String,
    pub to_stop: String,
    pub passengers: i64,
    pub fare: i64,

    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub payment_status: PaymentStatus,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub booking_time: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub travel_date: DateTime<Utc>,

    pub qr_code_data: Option<String>,
    pub is_active: bool,

    /// Set once the paid-ticket follow-ups (booking count, confirmation) have been claimed.
    #[serde(default)]
    pub confirmation_applied: bool,
}

/// A settlement applied to a ticket by compare-and-swap on its current status.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketTransition {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub payment_id: Option<String>,
    pub qr_code_data: Option<String>,
}

impl TicketTransition {
    pub fn settle_paid(payment_id: impl Into<String>, qr_code_data: Option<String>) -> Self {
        TicketTransition {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Paid,
            payment_id: Some(payment_id.into()),
            qr_code_data,
        }
    }

    pub fn settle_failed() -> Self {
        TicketTransition {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Failed,
            payment_id: None,
            qr_code_data: None,
        }
    }

    pub fn apply(&self, ticket: &mut Ticket) {
        ticket.payment_status = self.to;
        if let Some(payment_id) = &self.payment_id {
            ticket.gateway_payment_id = Some(payment_id.clone());
        }
        if let Some(qr) = &self.qr_code_data {
            ticket.qr_code_data = Some(qr.clone());
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub ticket_id: String,
    pub from_stop: String,
    pub to_stop: String,
    pub passengers: i64,
    pub fare: i64,
    pub payment_status: PaymentStatus,
    pub booking_time: DateTime<Utc>,
    pub travel_date: DateTime<Utc>,
    pub qr_code: Option<String>,
    pub user_name: String,
    pub user_phone: String,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        TicketView {
            ticket_id: ticket.ticket_id,
            from_stop: ticket.from_stop,
            to_stop: ticket.to_stop,
            passengers: ticket.passengers,
            fare: ticket.fare,
            payment_status: ticket.payment_status,
            booking_time: ticket.booking_time,
            travel_date: ticket.travel_date,
            qr_code: ticket.qr_code_data,
            user_name: ticket.user_name,
            user_phone: ticket.user_phone,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub ticket_id: String,
    pub from_stop: String,
    pub to_stop: String,
    pub fare: i64,
    pub payment_status: PaymentStatus,
    pub booking_time: DateTime<Utc>,
}

impl From<Ticket> for TicketSummary {
    fn from(ticket: Ticket) -> Self {
        TicketSummary {
            ticket_id: ticket.ticket_id,
            from_stop: ticket.from_stop,
            to_stop: ticket.to_stop,
            fare: ticket.fare,
            payment_status: ticket.payment_status,
            booking_time: ticket.booking_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_is_only_reachable_from_paid() {
        assert!(PaymentStatus::Paid.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Refunded));
    }

    #[test]
    fn terminal_states_do_not_settle_again() {
        for status in [PaymentStatus::Paid, PaymentStatus::Failed] {
            assert!(!status.can_transition_to(PaymentStatus::Paid));
            assert!(!status.can_transition_to(PaymentStatus::Failed));
        }
    }

    #[test]
    fn ticket_and_transaction_statuses_mirror() {
        assert_eq!(
            PaymentStatus::Paid.mirrored_transaction_status(),
            Some(TransactionStatus::Completed)
        );
        assert_eq!(
            PaymentStatus::Failed.mirrored_transaction_status(),
            Some(TransactionStatus::Failed)
        );
        assert_eq!(PaymentStatus::Pending.mirrored_transaction_status(), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&PaymentStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");
    }
}
