use std::fmt;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use infra::models::OrderRow;
use infra::repos::{orders, users, CreateOrder, OrderStatus};

use crate::services::payment_gateway::{
    ConfirmRequest, GatewayCancellation, GatewayConfirmation, GatewayError, PaymentGateway,
};

const MAX_ORDER_NAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Order {order_id} was already processed (status {status})")]
    DuplicatePayment {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Payment amount does not match order {order_id}")]
    AmountMismatch {
        order_id: String,
        expected: i64,
        reported: i64,
    },

    #[error("Payment was declined: {}", .0.failure_message())]
    Gateway(#[from] GatewayError),

    #[error("Payment for order {order_id} could not be recorded; {outcome}")]
    SettlementFailure {
        order_id: String,
        payment_key: String,
        outcome: SettlementOutcome,
    },

    #[error("database error")]
    Storage(#[from] sqlx::Error),
}

impl PaymentError {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "VALIDATION_ERROR",
            PaymentError::UserNotFound(_) | PaymentError::OrderNotFound(_) => "NOT_FOUND",
            PaymentError::DuplicatePayment { .. } => "DUPLICATE_PAYMENT",
            PaymentError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            PaymentError::Gateway(_) => "GATEWAY_ERROR",
            PaymentError::SettlementFailure { .. } => "SETTLEMENT_FAILURE",
            PaymentError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// What happened to the charge after the order could not be marked paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Cancelled,
    ManualReconciliation,
}

impl SettlementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementOutcome::Cancelled => "CANCELLED",
            SettlementOutcome::ManualReconciliation => "MANUAL_RECONCILIATION",
        }
    }
}

impl fmt::Display for SettlementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementOutcome::Cancelled => f.write_str("the charge was cancelled"),
            SettlementOutcome::ManualReconciliation => {
                f.write_str("manual reconciliation required")
            }
        }
    }
}

/// Why phase C could not record a confirmed payment. Operator-facing only.
#[derive(Debug, Error)]
enum SettlementError {
    #[error("order no longer exists")]
    Missing,

    #[error("order is {0}, expected PROCESSING")]
    UnexpectedStatus(OrderStatus),

    #[error("order status changed while recording payment")]
    StatusChanged,

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// What the client needs to open the provider's checkout widget.
#[derive(Debug, Clone)]
pub struct OrderCheckout {
    pub order_id: String,
    pub order_name: String,
    pub amount: i64,
    pub customer_name: String,
}

#[derive(Debug, Clone)]
pub struct FailureAck {
    pub order_id: String,
    pub updated: bool,
}

pub async fn create_order(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    order_name: &str,
    amount: i64,
) -> Result<OrderCheckout, PaymentError> {
    if amount <= 0 {
        return Err(PaymentError::Validation(
            "Amount must be greater than 0".to_string(),
        ));
    }
    let order_name = order_name.trim();
    if order_name.is_empty() || order_name.chars().count() > MAX_ORDER_NAME_LEN {
        return Err(PaymentError::Validation(format!(
            "Order name must be 1 to {MAX_ORDER_NAME_LEN} characters"
        )));
    }

    let user = users::get_by_id(pool, user_id)
        .await?
        .ok_or(PaymentError::UserNotFound(user_id))?;

    let order = orders::create(
        pool,
        CreateOrder {
            order_id: Uuid::new_v4().to_string(),
            user_id,
            order_name: order_name.to_string(),
            amount,
        },
    )
    .await?;

    info!(order_id = %order.order_id, user_id = %user_id, amount, "Order created");

    Ok(OrderCheckout {
        order_id: order.order_id,
        order_name: order.order_name,
        amount: order.amount,
        customer_name: user.name,
    })
}

/// Settle a payment the customer approved in the provider's widget.
///
/// The order row is locked only while its status is read and written. The
/// gateway call happens between two short transactions with the order parked
/// in `PROCESSING`, which is what keeps a retried or concurrent confirmation
/// from charging twice.
pub async fn confirm_payment(
    pool: &sqlx::PgPool,
    gateway: &dyn PaymentGateway,
    payment_key: &str,
    order_id: &str,
    reported_amount: i64,
) -> Result<GatewayConfirmation, PaymentError> {
    if payment_key.trim().is_empty() || order_id.trim().is_empty() {
        return Err(PaymentError::Validation(
            "paymentKey and orderId are required".to_string(),
        ));
    }

    let amount = claim_order(pool, order_id, reported_amount).await?;

    let request = ConfirmRequest {
        payment_key: payment_key.to_string(),
        order_id: order_id.to_string(),
        amount,
    };

    let confirmation = match gateway.confirm(&request).await {
        Ok(confirmation) => confirmation,
        Err(err) => {
            warn!(order_id = %order_id, "Gateway refused confirmation: {}", err);
            release_failed(pool, order_id, &err).await;
            return Err(PaymentError::Gateway(err));
        }
    };

    if let Err(err) = finalize(pool, order_id, &confirmation).await {
        error!(
            critical = true,
            order_id = %order_id,
            payment_key = %confirmation.payment_key,
            "Payment confirmed by gateway but not recorded: {}",
            err
        );
        // A commit can fail on the client side after the server applied it.
        if recorded_anyway(pool, order_id, &confirmation.payment_key).await {
            warn!(
                order_id = %order_id,
                payment_key = %confirmation.payment_key,
                "Order is PAID despite the settlement error, keeping the charge"
            );
            return Ok(confirmation);
        }
        return Err(compensate(pool, gateway, order_id, &confirmation.payment_key).await);
    }

    info!(
        order_id = %order_id,
        payment_key = %confirmation.payment_key,
        amount,
        "Payment settled"
    );
    Ok(confirmation)
}

/// Lock the order, check it is payable and move it to `PROCESSING`.
/// Returns the stored amount.
async fn claim_order(
    pool: &sqlx::PgPool,
    order_id: &str,
    reported_amount: i64,
) -> Result<i64, PaymentError> {
    let mut tx = pool.begin().await?;

    let order = orders::get_by_order_id_for_update(&mut *tx, order_id)
        .await?
        .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;

    if order.status != OrderStatus::Pending {
        return Err(PaymentError::DuplicatePayment {
            order_id: order.order_id,
            status: order.status,
        });
    }

    if order.amount != reported_amount {
        warn!(
            order_id = %order_id,
            expected = order.amount,
            reported = reported_amount,
            "Reported payment amount does not match order"
        );
        return Err(PaymentError::AmountMismatch {
            order_id: order.order_id,
            expected: order.amount,
            reported: reported_amount,
        });
    }

    let claimed = orders::transition_status(
        &mut *tx,
        order_id,
        OrderStatus::Pending,
        OrderStatus::Processing,
    )
    .await?;
    if !claimed {
        return Err(PaymentError::DuplicatePayment {
            order_id: order.order_id,
            status: OrderStatus::Processing,
        });
    }

    tx.commit().await?;
    Ok(order.amount)
}

/// `PROCESSING -> FAILED` after the gateway refused. Never fails the caller.
async fn release_failed(pool: &sqlx::PgPool, order_id: &str, err: &GatewayError) {
    let message = err.failure_message();
    match orders::mark_failed(
        pool,
        order_id,
        Some(OrderStatus::Processing),
        Some(err.failure_code()),
        Some(message.as_str()),
    )
    .await
    {
        Ok(true) => {}
        Ok(false) => warn!(order_id = %order_id, "Order left PROCESSING before it could be failed"),
        Err(e) => error!(
            critical = true,
            order_id = %order_id,
            "Could not mark order FAILED after gateway error, order is stuck in PROCESSING: {}",
            e
        ),
    }
}

/// Record the settlement under the order row lock.
async fn finalize(
    pool: &sqlx::PgPool,
    order_id: &str,
    confirmation: &GatewayConfirmation,
) -> Result<(), SettlementError> {
    let mut tx = pool.begin().await?;

    let order = orders::get_by_order_id_for_update(&mut *tx, order_id)
        .await?
        .ok_or(SettlementError::Missing)?;

    if order.status != OrderStatus::Processing {
        return Err(SettlementError::UnexpectedStatus(order.status));
    }

    let paid = orders::mark_paid(
        &mut *tx,
        order_id,
        &confirmation.payment_key,
        confirmation.method.as_deref(),
    )
    .await?;
    if !paid {
        return Err(SettlementError::StatusChanged);
    }

    tx.commit().await?;
    Ok(())
}

/// Whether the order ended up `PAID` with this payment key even though
/// `finalize` reported an error.
async fn recorded_anyway(pool: &sqlx::PgPool, order_id: &str, payment_key: &str) -> bool {
    match orders::get_by_order_id(pool, order_id).await {
        Ok(Some(order)) => {
            order.status == OrderStatus::Paid && order.payment_key.as_deref() == Some(payment_key)
        }
        Ok(None) => false,
        Err(e) => {
            warn!(order_id = %order_id, "Could not re-read order after settlement error: {}", e);
            false
        }
    }
}

/// The customer was charged but the order could not be marked paid: refund.
async fn compensate(
    pool: &sqlx::PgPool,
    gateway: &dyn PaymentGateway,
    order_id: &str,
    payment_key: &str,
) -> PaymentError {
    let outcome = match cancel_payment(gateway, payment_key, "Order settlement failed").await {
        Ok(_) => {
            let failed = orders::mark_failed(
                pool,
                order_id,
                Some(OrderStatus::Processing),
                Some("SETTLEMENT_FAILED"),
                Some("Payment could not be recorded and was cancelled"),
            )
            .await;
            if let Err(e) = failed {
                warn!(order_id = %order_id, "Could not mark cancelled order FAILED: {}", e);
            }
            SettlementOutcome::Cancelled
        }
        Err(e) => {
            error!(
                critical = true,
                order_id = %order_id,
                payment_key = %payment_key,
                "Compensating cancellation failed, manual reconciliation required: {}",
                e
            );
            SettlementOutcome::ManualReconciliation
        }
    };

    PaymentError::SettlementFailure {
        order_id: order_id.to_string(),
        payment_key: payment_key.to_string(),
        outcome,
    }
}

/// The provider reported that the customer abandoned or failed the payment.
/// Storage errors are logged and reported as `updated = false`.
pub async fn handle_payment_failure(
    pool: &sqlx::PgPool,
    order_id: &str,
    error_code: Option<&str>,
    error_message: Option<&str>,
) -> FailureAck {
    warn!(
        order_id = %order_id,
        code = error_code.unwrap_or("-"),
        "Payment failure reported: {}",
        error_message.unwrap_or("-")
    );

    let updated = match orders::mark_failed(pool, order_id, None, error_code, error_message).await
    {
        Ok(updated) => updated,
        Err(e) => {
            error!(order_id = %order_id, "Failed to record payment failure: {}", e);
            false
        }
    };

    FailureAck {
        order_id: order_id.to_string(),
        updated,
    }
}

pub async fn cancel_payment(
    gateway: &dyn PaymentGateway,
    payment_key: &str,
    reason: &str,
) -> Result<GatewayCancellation, PaymentError> {
    if payment_key.trim().is_empty() {
        return Err(PaymentError::Validation(
            "paymentKey is required".to_string(),
        ));
    }
    Ok(gateway.cancel(payment_key, reason).await?)
}

pub async fn get_order(pool: &sqlx::PgPool, order_id: &str) -> Result<OrderRow, PaymentError> {
    orders::get_by_order_id(pool, order_id)
        .await?
        .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let duplicate = PaymentError::DuplicatePayment {
            order_id: "o-1".to_string(),
            status: OrderStatus::Paid,
        };
        assert_eq!(duplicate.code(), "DUPLICATE_PAYMENT");
        assert_eq!(
            duplicate.to_string(),
            "Order o-1 was already processed (status PAID)"
        );

        let mismatch = PaymentError::AmountMismatch {
            order_id: "o-1".to_string(),
            expected: 5000,
            reported: 100,
        };
        assert_eq!(mismatch.code(), "AMOUNT_MISMATCH");
        assert_eq!(
            PaymentError::OrderNotFound("o-1".to_string()).code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn gateway_error_message_hides_transport_detail() {
        let err = PaymentError::from(GatewayError::Rejected {
            status: 400,
            code: "REJECT_CARD_COMPANY".to_string(),
            message: "카드사에서 거절했습니다.".to_string(),
        });
        assert_eq!(err.code(), "GATEWAY_ERROR");
        assert_eq!(err.to_string(), "Payment was declined: 카드사에서 거절했습니다.");
    }

    #[test]
    fn storage_error_does_not_leak_driver_text() {
        let err = PaymentError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert_eq!(err.to_string(), "database error");
    }

    #[test]
    fn settlement_failure_message_only_states_the_outcome() {
        let cause = SettlementError::from(sqlx::Error::Protocol(
            "duplicate key value violates unique constraint \"orders_payment_key_key\"".to_string(),
        ));
        assert!(cause.to_string().contains("duplicate key"));

        let err = PaymentError::SettlementFailure {
            order_id: "o-1".to_string(),
            payment_key: "pk_1".to_string(),
            outcome: SettlementOutcome::Cancelled,
        };
        assert_eq!(err.code(), "SETTLEMENT_FAILURE");
        assert_eq!(
            err.to_string(),
            "Payment for order o-1 could not be recorded; the charge was cancelled"
        );

        let stuck = PaymentError::SettlementFailure {
            order_id: "o-1".to_string(),
            payment_key: "pk_1".to_string(),
            outcome: SettlementOutcome::ManualReconciliation,
        };
        assert_eq!(
            stuck.to_string(),
            "Payment for order o-1 could not be recorded; manual reconciliation required"
        );
    }
}
