//! HTML rendering for downloadable receipts and confirmation emails.

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::ticket::{PaymentStatus, Ticket};
use crate::services::qr_service;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn format_booking_time(time: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(ist) => time
            .with_timezone(&ist)
            .format("%d/%m/%Y, %I:%M:%S %p IST")
            .to_string(),
        None => time.format("%d/%m/%Y, %I:%M:%S %p UTC").to_string(),
    }
}

pub fn status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Paid => "✅ Confirmed",
        PaymentStatus::Pending => "⏳ Pending",
        PaymentStatus::Failed => "❌ Payment failed",
        PaymentStatus::Refunded => "↩️ Refunded",
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn details_block(ticket: &Ticket) -> String {
    format!(
        r#"<p><strong>Ticket ID:</strong> {id}</p>
            <p><strong>From:</strong> {from}</p>
            <p><strong>To:</strong> {to}</p>
            <p><strong>Passengers:</strong> {passengers}</p>
            <p><strong>Fare:</strong> ₹{fare}</p>
            <p><strong>Booking Time:</strong> {time}</p>
            <p><strong>Status:</strong> {status}</p>"#,
        id = escape_html(&ticket.ticket_id),
        from = escape_html(&ticket.from_stop),
        to = escape_html(&ticket.to_stop),
        passengers = ticket.passengers,
        fare = ticket.fare,
        time = format_booking_time(ticket.booking_time),
        status = status_label(ticket.payment_status),
    )
}

fn qr_block(ticket: &Ticket, caption: &str) -> String {
    match &ticket.qr_code_data {
        Some(payload) => format!(
            r#"<div class="qr-code" style="text-align: center; margin: 20px 0;">
                <p><strong>{caption}</strong></p>
                <img src="{src}" alt="QR Code" width="150" height="150"/>
            </div>"#,
            caption = caption,
            src = qr_service::data_uri(payload),
        ),
        None => String::new(),
    }
}

/// Standalone receipt page served by the download endpoint.
pub fn render_receipt(ticket: &Ticket) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Ticket {id}</title>
    <style>
        body {{ font-family: Arial, sans-serif; padding: 20px; }}
        .ticket {{ border: 2px dashed #3498db; padding: 20px; border-radius: 10px; max-width: 400px; }}
        .header {{ text-align: center; color: #2c3e50; }}
        .details {{ margin: 15px 0; }}
        .footer {{ font-size: 12px; color: #666; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="ticket">
        <h2 class="header">🚍 Bengaluru Bus System</h2>
        <div class="details">
            {details}
        </div>
        {qr}
        <div class="footer">
            <p>Bengaluru Bus Management System</p>
        </div>
    </div>
</body>
</html>"#,
        id = escape_html(&ticket.ticket_id),
        details = details_block(ticket),
        qr = qr_block(ticket, "Scan QR Code:"),
    )
}

pub fn render_confirmation_email(ticket: &Ticket) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; border: 1px solid #ddd; border-radius: 10px; padding: 20px;">
    <h2 style="color: #2c3e50; text-align: center;">🚍 Bengaluru Bus System</h2>
    <h3 style="color: #27ae60;">Ticket Confirmed! 🎉</h3>
    <div style="background: #f8f9fa; padding: 15px; border-radius: 8px; margin: 15px 0;">
        {details}
    </div>
    {qr}
    <div style="margin-top: 20px; padding-top: 20px; border-top: 1px solid #ddd; font-size: 12px; color: #666;">
        <p>Bengaluru Bus Management System</p>
    </div>
</div>"#,
        details = details_block(ticket),
        qr = qr_block(ticket, "Scan QR Code at bus entry:"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pending_ticket;
    use chrono::TimeZone;

    #[test]
    fn booking_time_is_shown_in_ist() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 4, 30, 0).unwrap();
        assert_eq!(format_booking_time(time), "01/03/2024, 10:00:00 AM IST");
    }

    #[test]
    fn pending_receipt_has_no_qr_image() {
        let ticket = pending_ticket("TKT1", "order_1", None);
        let html = render_receipt(&ticket);
        assert!(html.contains("⏳ Pending"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn paid_receipt_embeds_qr() {
        let mut ticket = pending_ticket("TKT1", "order_1", None);
        ticket.payment_status = PaymentStatus::Paid;
        ticket.qr_code_data = Some("QUJD".to_string());
        let html = render_receipt(&ticket);
        assert!(html.contains("✅ Confirmed"));
        assert!(html.contains("data:image/svg+xml;base64,QUJD"));
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let mut ticket = pending_ticket("TKT1", "order_1", None);
        ticket.from_stop = "<script>alert(1)</script>".to_string();
        let html = render_receipt(&ticket);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
