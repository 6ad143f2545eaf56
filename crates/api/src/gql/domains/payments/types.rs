use async_graphql::{Enum, InputObject, SimpleObject, ID};
use chrono::{DateTime, Utc};

use infra::models::OrderRow;
use infra::repos::OrderStatus as StoredStatus;

use super::service::{FailureAck, OrderCheckout as Checkout};
use crate::services::payment_gateway::GatewayConfirmation;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    Failed,
}

impl From<StoredStatus> for OrderStatus {
    fn from(status: StoredStatus) -> Self {
        match status {
            StoredStatus::Pending => OrderStatus::Pending,
            StoredStatus::Processing => OrderStatus::Processing,
            StoredStatus::Paid => OrderStatus::Paid,
            StoredStatus::Failed => OrderStatus::Failed,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Order {
    pub id: ID,
    pub order_id: String,
    pub order_name: String,
    pub amount: i64,
    pub status: OrderStatus,
    pub payment_key: Option<String>,
    pub payment_method: Option<String>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id.into(),
            order_id: row.order_id,
            order_name: row.order_name,
            amount: row.amount,
            status: row.status.into(),
            payment_key: row.payment_key,
            payment_method: row.payment_method,
            failure_code: row.failure_code,
            failure_message: row.failure_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(InputObject)]
pub struct CreateOrderInput {
    pub order_name: String,
    pub amount: i64,
}

/// Values the checkout widget is opened with.
#[derive(SimpleObject, Clone)]
pub struct OrderCheckout {
    pub order_id: String,
    pub order_name: String,
    pub amount: i64,
    pub customer_name: String,
}

impl From<Checkout> for OrderCheckout {
    fn from(checkout: Checkout) -> Self {
        Self {
            order_id: checkout.order_id,
            order_name: checkout.order_name,
            amount: checkout.amount,
            customer_name: checkout.customer_name,
        }
    }
}

#[derive(InputObject)]
pub struct ConfirmPaymentInput {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

#[derive(SimpleObject, Clone)]
pub struct PaymentConfirmation {
    pub payment_key: String,
    pub order_id: String,
    pub method: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<i64>,
}

impl From<GatewayConfirmation> for PaymentConfirmation {
    fn from(confirmation: GatewayConfirmation) -> Self {
        Self {
            payment_key: confirmation.payment_key,
            order_id: confirmation.order_id,
            method: confirmation.method,
            status: confirmation.status,
            total_amount: confirmation.total_amount,
        }
    }
}

#[derive(InputObject)]
pub struct ReportPaymentFailureInput {
    pub order_id: String,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(SimpleObject, Clone)]
pub struct PaymentFailureAck {
    pub order_id: String,
    /// False when the order was unknown, already paid, or could not be written.
    pub updated: bool,
}

impl From<FailureAck> for PaymentFailureAck {
    fn from(ack: FailureAck) -> Self {
        Self {
            order_id: ack.order_id,
            updated: ack.updated,
        }
    }
}
