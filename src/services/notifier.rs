// services/notifier.rs
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::SmtpConfig;
use crate::errors::{AppError, Result};
use crate::models::ticket::Ticket;
use crate::services::receipt;

/// Delivers a ticket confirmation once payment settles.
///
/// Callers run this off the response path; an error here never affects the
/// payment outcome.
#[async_trait]
pub trait TicketNotifier: Send + Sync {
    async fn ticket_confirmed(&self, ticket: &Ticket) -> Result<()>;
}

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::configuration(format!("invalid EMAIL_FROM: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::configuration(format!("SMTP relay error: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(EmailNotifier { transport, from })
    }
}

#[async_trait]
impl TicketNotifier for EmailNotifier {
    async fn ticket_confirmed(&self, ticket: &Ticket) -> Result<()> {
        if ticket.user_email.is_empty() {
            debug!(ticket_id = %ticket.ticket_id, "No email on ticket, skipping confirmation");
            return Ok(());
        }

        let to: Mailbox = ticket
            .user_email
            .parse()
            .map_err(|e| AppError::notification(format!("invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!(
                "🎫 Bengaluru Bus Ticket Confirmation - {}",
                ticket.ticket_id
            ))
            .header(ContentType::TEXT_HTML)
            .body(receipt::render_confirmation_email(ticket))
            .map_err(|e| AppError::notification(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::notification(format!("SMTP send failed: {}", e)))?;

        info!(ticket_id = %ticket.ticket_id, "Ticket email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured.
pub struct LogNotifier;

#[async_trait]
impl TicketNotifier for LogNotifier {
    async fn ticket_confirmed(&self, ticket: &Ticket) -> Result<()> {
        info!(
            ticket_id = %ticket.ticket_id,
            has_email = !ticket.user_email.is_empty(),
            "Ticket confirmed (email delivery disabled)"
        );
        Ok(())
    }
}
