//! Order creation and payment reconciliation for bus tickets.
//!
//! A purchase moves through `pending -> paid | failed` exactly once. Two
//! independent confirmation paths race to settle it: the checkout callback
//! (`verify_payment`) and the gateway webhook (`handle_webhook`). Both settle
//! through the store's conditional transition, so only one caller wins the
//! status change. The booking count and confirmation email are claimed
//! separately through a per-ticket flag: the winner normally takes them, and
//! a later confirmation finishes them if the winner stopped part way.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::store::Store;
use crate::errors::{AppError, Result};
use crate::models::{
    ticket::{PaymentStatus, Ticket, TicketTransition},
    transaction::{Transaction, TransactionStatus, TransactionType},
    user::User,
};
use crate::services::{
    notifier::TicketNotifier,
    qr_service,
    razorpay_service::{GatewayOrder, OrderRequest, PaymentGateway},
    signature,
};

pub const CAPTURED_EVENT: &str = "payment.captured";

/// Paise per rupee.
pub const SUBUNITS_PER_UNIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct FarePolicy {
    pub base_fare: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FareQuote {
    pub base_fare: i64,
    pub passengers: i64,
    pub fare: i64,
    pub amount_subunits: i64,
}

impl FarePolicy {
    pub fn quote(&self, passengers: i64) -> Result<FareQuote> {
        if passengers <= 0 {
            return Err(AppError::invalid_data("passengers must be at least 1"));
        }

        let fare = passengers
            .checked_mul(self.base_fare)
            .ok_or_else(|| AppError::invalid_data("passenger count too large"))?;
        let amount_subunits = fare
            .checked_mul(SUBUNITS_PER_UNIT)
            .ok_or_else(|| AppError::invalid_data("passenger count too large"))?;

        Ok(FareQuote {
            base_fare: self.base_fare,
            passengers,
            fare,
            amount_subunits,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub passengers: i64,
    pub from_stop: String,
    pub to_stop: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderCreated {
    pub order: GatewayOrder,
    pub ticket: Ticket,
    pub transaction_id: String,
    pub quote: FareQuote,
    pub key_id: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub ticket_id: String,
}

#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// `newly_settled` is false when an earlier confirmation already won.
    Paid { ticket: Ticket, newly_settled: bool },
    Failed { ticket_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    Settled { ticket_id: String },
    AlreadySettled { ticket_id: String, status: PaymentStatus },
    Ignored { reason: String },
    Rejected,
}

enum Settlement {
    Applied(Ticket),
    AlreadySettled(Ticket),
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    #[serde(default)]
    payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
struct PaymentWrapper {
    entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
}

struct Contact {
    name: String,
    email: String,
    phone: String,
}

impl Contact {
    // Caller-supplied fields win; a registered user fills the gaps.
    fn resolve(order: &NewOrder, user: Option<&User>) -> Self {
        let pick = |given: &Option<String>, stored: Option<&String>| {
            given
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| stored.cloned())
        };

        Contact {
            name: pick(&order.user_name, user.map(|u| &u.name))
                .unwrap_or_else(|| "Guest".to_string()),
            email: pick(&order.user_email, user.map(|u| &u.email)).unwrap_or_default(),
            phone: pick(&order.user_phone, user.map(|u| &u.phone)).unwrap_or_default(),
        }
    }
}

fn new_reference(prefix: &str) -> String {
    format!(
        "{}{}",
        prefix,
        Uuid::new_v4().simple().to_string().to_uppercase()
    )
}

pub struct TicketWorkflow {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn TicketNotifier>,
    fares: FarePolicy,
    key_secret: String,
    webhook_secret: String,
    notifications: TaskTracker,
}

impl TicketWorkflow {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn TicketNotifier>,
        config: &AppConfig,
    ) -> Self {
        TicketWorkflow {
            store,
            gateway,
            notifier,
            fares: FarePolicy {
                base_fare: config.base_fare,
                currency: config.currency.clone(),
            },
            key_secret: config.razorpay_key_secret.clone(),
            webhook_secret: config.razorpay_webhook_secret.clone(),
            notifications: TaskTracker::new(),
        }
    }

    pub async fn create_order(&self, order: NewOrder) -> Result<OrderCreated> {
        let quote = self.fares.quote(order.passengers)?;

        let from_stop = order.from_stop.trim().to_string();
        let to_stop = order.to_stop.trim().to_string();
        if from_stop.is_empty() || to_stop.is_empty() {
            return Err(AppError::invalid_data("fromStop and toStop are required"));
        }

        let user = match order.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let id = ObjectId::parse_str(raw)?;
                let user = self
                    .store
                    .find_user(&id)
                    .await?
                    .ok_or_else(|| AppError::invalid_data(format!("unknown user {}", raw)))?;
                Some(user)
            }
            None => None,
        };
        let contact = Contact::resolve(&order, user.as_ref());

        let ticket_id = new_reference("TKT");
        let transaction_id = new_reference("TXN");

        let mut notes = BTreeMap::new();
        notes.insert("ticketId".to_string(), ticket_id.clone());
        notes.insert("fromStop".to_string(), from_stop.clone());
        notes.insert("toStop".to_string(), to_stop.clone());
        notes.insert("passengers".to_string(), quote.passengers.to_string());
        notes.insert(
            "userId".to_string(),
            user.as_ref()
                .map(|u| u.id.to_hex())
                .unwrap_or_else(|| "guest".to_string()),
        );
        notes.insert("userName".to_string(), contact.name.clone());
        notes.insert("userEmail".to_string(), contact.email.clone());
        notes.insert("userPhone".to_string(), contact.phone.clone());

        let request = OrderRequest {
            amount: quote.amount_subunits,
            currency: self.fares.currency.clone(),
            receipt: ticket_id.clone(),
            notes,
            payment_capture: 1,
        };

        // Nothing is written until the gateway has an order for us.
        let gateway_order = self.gateway.create_order(&request).await?;

        let now = Utc::now();
        let ticket = Ticket {
            id: None,
            ticket_id: ticket_id.clone(),
            user_id: user.as_ref().map(|u| u.id),
            user_name: contact.name,
            user_email: contact.email,
            user_phone: contact.phone,
            from_stop: from_stop.clone(),
            to_stop: to_stop.clone(),
            passengers: quote.passengers,
            fare: quote.fare,
            gateway_order_id: gateway_order.id.clone(),
            gateway_payment_id: None,
            payment_status: PaymentStatus::Pending,
            booking_time: now,
            travel_date: now,
            qr_code_data: None,
            is_active: true,
            confirmation_applied: false,
        };
        self.store.insert_ticket(&ticket).await?;

        let transaction = Transaction {
            id: None,
            transaction_id: transaction_id.clone(),
            user_id: ticket.user_id,
            amount: quote.fare,
            transaction_type: TransactionType::TicketPurchase,
            gateway_order_id: gateway_order.id.clone(),
            gateway_payment_id: None,
            status: TransactionStatus::Pending,
            description: format!(
                "Bus ticket from {} to {} for {} passenger(s)",
                from_stop, to_stop, quote.passengers
            ),
            created_at: now,
        };

        if let Err(e) = self.store.insert_transaction(&transaction).await {
            error!(
                ticket_id = %ticket_id,
                order_id = %gateway_order.id,
                "Transaction insert failed, failing ticket: {}",
                e
            );
            if let Err(undo) = self
                .store
                .transition_ticket(&ticket_id, &TicketTransition::settle_failed())
                .await
            {
                error!(ticket_id = %ticket_id, "Could not fail orphaned ticket: {}", undo);
            }
            return Err(e);
        }

        info!(
            ticket_id = %ticket_id,
            order_id = %gateway_order.id,
            fare = quote.fare,
            "Order created"
        );

        Ok(OrderCreated {
            order: gateway_order,
            ticket,
            transaction_id,
            quote,
            key_id: self.gateway.key_id(),
        })
    }

    pub async fn verify_payment(&self, confirmation: PaymentConfirmation) -> Result<PaymentOutcome> {
        let ticket = self
            .store
            .find_ticket(&confirmation.ticket_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket"))?;

        if ticket.gateway_order_id != confirmation.order_id {
            warn!(
                ticket_id = %ticket.ticket_id,
                order_id = %confirmation.order_id,
                "Confirmation order does not match ticket"
            );
            return Err(AppError::invalid_data("order does not belong to this ticket"));
        }

        let valid = signature::verify_payment_signature(
            &self.key_secret,
            &confirmation.order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        )?;

        if !valid {
            warn!(
                ticket_id = %ticket.ticket_id,
                order_id = %confirmation.order_id,
                "Payment signature mismatch"
            );
            self.settle_failed(&ticket).await?;
            return Ok(PaymentOutcome::Failed {
                ticket_id: ticket.ticket_id,
            });
        }

        let settlement = self
            .settle_paid(&ticket.ticket_id, &confirmation.order_id, &confirmation.payment_id)
            .await?;

        Ok(match settlement {
            Settlement::Applied(ticket) => PaymentOutcome::Paid {
                ticket,
                newly_settled: true,
            },
            Settlement::AlreadySettled(ticket) if ticket.payment_status == PaymentStatus::Paid => {
                PaymentOutcome::Paid {
                    ticket,
                    newly_settled: false,
                }
            }
            Settlement::AlreadySettled(ticket) => PaymentOutcome::Failed {
                ticket_id: ticket.ticket_id,
            },
        })
    }

    /// Never fails for reasons the sender can fix; the handler acknowledges regardless.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookDisposition> {
        let Some(supplied) = signature_header else {
            warn!("Webhook without signature header");
            return Ok(WebhookDisposition::Rejected);
        };

        if !signature::verify_webhook_signature(&self.webhook_secret, body, supplied)? {
            warn!("Webhook signature mismatch");
            return Ok(WebhookDisposition::Rejected);
        }

        let event: WebhookEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                warn!("Malformed webhook payload: {}", e);
                return Ok(ignored("malformed payload"));
            }
        };

        if event.event != CAPTURED_EVENT {
            info!(event = %event.event, "Ignoring webhook event");
            return Ok(ignored(format!("event {}", event.event)));
        }

        let Some(payment) = event.payload.and_then(|p| p.payment).map(|p| p.entity) else {
            warn!("Captured webhook without payment entity");
            return Ok(ignored("missing payment entity"));
        };
        let Some(order_id) = payment.order_id else {
            warn!(payment_id = %payment.id, "Captured payment has no order id");
            return Ok(ignored("payment without order"));
        };

        let Some(ticket) = self.store.find_ticket_by_order(&order_id).await? else {
            warn!(order_id = %order_id, "Captured payment for unknown order");
            return Ok(ignored("unknown order"));
        };

        if let Some(amount) = payment.amount {
            let expected = ticket.fare.saturating_mul(SUBUNITS_PER_UNIT);
            if amount != expected {
                error!(
                    order_id = %order_id,
                    amount,
                    expected,
                    "Captured amount does not match ticket fare"
                );
                return Ok(ignored("amount mismatch"));
            }
        }

        match self.settle_paid(&ticket.ticket_id, &order_id, &payment.id).await? {
            Settlement::Applied(ticket) => {
                info!(
                    ticket_id = %ticket.ticket_id,
                    payment_id = %payment.id,
                    "Webhook: payment captured"
                );
                Ok(WebhookDisposition::Settled {
                    ticket_id: ticket.ticket_id,
                })
            }
            Settlement::AlreadySettled(ticket) => {
                if ticket.payment_status == PaymentStatus::Failed {
                    warn!(
                        ticket_id = %ticket.ticket_id,
                        payment_id = %payment.id,
                        "Captured payment for a failed ticket; manual refund required"
                    );
                }
                Ok(WebhookDisposition::AlreadySettled {
                    ticket_id: ticket.ticket_id,
                    status: ticket.payment_status,
                })
            }
        }
    }

    /// Waits for in-flight confirmation notifications.
    pub async fn drain_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }

    async fn settle_paid(
        &self,
        ticket_id: &str,
        order_id: &str,
        payment_id: &str,
    ) -> Result<Settlement> {
        let qr = match qr_service::encode_ticket_qr(ticket_id) {
            Ok(qr) => Some(qr),
            Err(e) => {
                warn!(ticket_id = %ticket_id, "QR generation error: {}", e);
                None
            }
        };

        let transition = TicketTransition::settle_paid(payment_id, qr);
        match self.store.transition_ticket(ticket_id, &transition).await? {
            Some(ticket) => {
                self.store
                    .transition_transaction(
                        order_id,
                        TransactionStatus::Completed,
                        Some(payment_id.to_string()),
                    )
                    .await?;
                info!(ticket_id = %ticket_id, payment_id = %payment_id, "Ticket paid");

                let ticket = self.complete_confirmation(ticket).await?;
                Ok(Settlement::Applied(ticket))
            }
            None => {
                let ticket = self
                    .store
                    .find_ticket(ticket_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Ticket"))?;
                self.sync_transaction(&ticket).await?;

                // Picks up follow-ups a winner never got to.
                let ticket = self.complete_confirmation(ticket).await?;
                Ok(Settlement::AlreadySettled(ticket))
            }
        }
    }

    // Booking count and confirmation for a paid ticket, claimed at most once
    // through the ticket's `confirmation_applied` flag.
    async fn complete_confirmation(&self, mut ticket: Ticket) -> Result<Ticket> {
        if ticket.payment_status != PaymentStatus::Paid || ticket.confirmation_applied {
            return Ok(ticket);
        }
        if !self
            .store
            .mark_confirmation_applied(&ticket.ticket_id, true)
            .await?
        {
            return Ok(ticket);
        }

        if let Some(user_id) = &ticket.user_id {
            if let Err(e) = self.store.increment_user_bookings(user_id).await {
                // Hand the claim back so the next confirmation retries.
                if let Err(release) = self
                    .store
                    .mark_confirmation_applied(&ticket.ticket_id, false)
                    .await
                {
                    error!(
                        ticket_id = %ticket.ticket_id,
                        "Could not release confirmation claim: {}", release
                    );
                }
                return Err(e);
            }
        }

        ticket.confirmation_applied = true;
        self.dispatch_notification(ticket.clone());
        Ok(ticket)
    }

    async fn settle_failed(&self, ticket: &Ticket) -> Result<()> {
        match self
            .store
            .transition_ticket(&ticket.ticket_id, &TicketTransition::settle_failed())
            .await?
        {
            Some(_) => {
                self.store
                    .transition_transaction(
                        &ticket.gateway_order_id,
                        TransactionStatus::Failed,
                        None,
                    )
                    .await?;
                info!(ticket_id = %ticket.ticket_id, "Ticket failed");
            }
            None => {
                if let Some(current) = self.store.find_ticket(&ticket.ticket_id).await? {
                    self.sync_transaction(&current).await?;
                }
            }
        }
        Ok(())
    }

    // Brings a transaction still pending in line with its already-terminal ticket.
    async fn sync_transaction(&self, ticket: &Ticket) -> Result<()> {
        let Some(status) = ticket.payment_status.mirrored_transaction_status() else {
            return Ok(());
        };

        let repaired = self
            .store
            .transition_transaction(
                &ticket.gateway_order_id,
                status,
                ticket.gateway_payment_id.clone(),
            )
            .await?;
        if repaired {
            warn!(
                ticket_id = %ticket.ticket_id,
                status = status.as_str(),
                "Repaired transaction left pending"
            );
        }
        Ok(())
    }

    fn dispatch_notification(&self, ticket: Ticket) {
        let notifier = Arc::clone(&self.notifier);
        self.notifications.spawn(async move {
            if let Err(e) = notifier.ticket_confirmed(&ticket).await {
                error!(ticket_id = %ticket.ticket_id, "Ticket notification failed: {}", e);
            }
        });
    }
}

fn ignored(reason: impl Into<String>) -> WebhookDisposition {
    WebhookDisposition::Ignored {
        reason: reason.into(),
    }
}
