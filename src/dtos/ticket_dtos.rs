use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::ticket_workflow::{NewOrder, OrderCreated, PaymentConfirmation};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(range(min = 1, message = "At least one passenger is required"))]
    pub passengers: i64,

    #[validate(length(min = 1, message = "fromStop is required"))]
    pub from_stop: String,

    #[validate(length(min = 1, message = "toStop is required"))]
    pub to_stop: String,

    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_phone: Option<String>,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        NewOrder {
            passengers: req.passengers,
            from_stop: req.from_stop,
            to_stop: req.to_stop,
            user_id: req.user_id,
            user_name: req.user_name,
            user_email: req.user_email,
            user_phone: req.user_phone,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareDetails {
    pub base_fare: i64,
    pub passengers: i64,
    pub total_fare: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: String,
    /// Currency subunits.
    pub amount: i64,
    pub currency: String,
    pub ticket_id: String,
    pub transaction_id: String,
    pub key: String,
    pub user_details: UserDetails,
    pub fare_details: FareDetails,
}

impl From<OrderCreated> for CreateOrderResponse {
    fn from(created: OrderCreated) -> Self {
        CreateOrderResponse {
            success: true,
            order_id: created.order.id,
            amount: created.order.amount,
            currency: created.order.currency,
            ticket_id: created.ticket.ticket_id,
            transaction_id: created.transaction_id,
            key: created.key_id,
            user_details: UserDetails {
                name: created.ticket.user_name,
                email: created.ticket.user_email,
                phone: created.ticket.user_phone,
            },
            fare_details: FareDetails {
                base_fare: created.quote.base_fare,
                passengers: created.quote.passengers,
                total_fare: created.quote.fare,
            },
        }
    }
}

/// Accepts both our camelCase names and the checkout widget's native ones.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    #[validate(length(min = 1, message = "orderId is required"))]
    pub order_id: String,

    #[serde(alias = "razorpay_payment_id")]
    #[validate(length(min = 1, message = "paymentId is required"))]
    pub payment_id: String,

    #[serde(alias = "razorpay_signature")]
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,

    #[validate(length(min = 1, message = "ticketId is required"))]
    pub ticket_id: String,
}

impl From<VerifyPaymentRequest> for PaymentConfirmation {
    fn from(req: VerifyPaymentRequest) -> Self {
        PaymentConfirmation {
            order_id: req.order_id,
            payment_id: req.payment_id,
            signature: req.signature,
            ticket_id: req.ticket_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub ticket_id: String,
    pub qr_code: Option<String>,
    pub payment_id: Option<String>,
    pub download_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_request_accepts_gateway_field_names() {
        let req: VerifyPaymentRequest = serde_json::from_str(
            r#"{"razorpay_order_id":"order_1","razorpay_payment_id":"pay_1",
                "razorpay_signature":"abc","ticketId":"TKT1"}"#,
        )
        .unwrap();
        assert_eq!(req.order_id, "order_1");
        assert_eq!(req.payment_id, "pay_1");
        assert_eq!(req.signature, "abc");
    }

    #[test]
    fn create_order_rejects_zero_passengers() {
        let req: CreateOrderRequest = serde_json::from_str(
            r#"{"passengers":0,"fromStop":"Majestic Bus Stand","toStop":"Whitefield"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
